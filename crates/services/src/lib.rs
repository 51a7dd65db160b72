#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod notifier;
pub mod sessions;
pub mod telemetry;

pub use drill_core::Clock;

pub use app_services::DrillServices;
pub use config::{DrillConfig, NotifierConfig};
pub use error::{NotifierError, ServicesError, SessionError};
pub use notifier::{CompletionNotifier, HttpCompletionNotifier, NotificationDispatcher};
pub use sessions::{
    BatchPhase, RefillMode, Session, SessionCommand, SessionController, SessionEvent,
    SessionSnapshot,
};
