#![forbid(unsafe_code)]

pub mod error;
pub mod evaluator;
pub mod model;
pub mod time;

pub use error::Error;
pub use evaluator::{is_correct, normalize_answer};
pub use time::Clock;
