mod commands;
mod controller;
mod progress;
mod state;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use commands::{SessionCommand, SessionEvent};
pub use controller::SessionController;
pub use progress::{SessionProgress, SessionSnapshot};
pub use state::{
    AnswerOutcome, BATCH_SIZE, BatchPhase, CompletionNotice, RefillMode, RefillOutcome,
    RefillRequest, Session, SessionKey,
};
