//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::model::{FilterError, ItemId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by session transitions and the session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no batch is loaded")]
    NotLoaded,
    #[error("batch already completed")]
    BatchComplete,
    #[error("answer was for item {got}, current item is {expected}")]
    StaleAnswer { expected: ItemId, got: ItemId },
    #[error("response belongs to a superseded request")]
    StaleResponse,
    #[error("the answer can only be shown after an incorrect attempt")]
    RevealNotAllowed,
    #[error("topic has no filters")]
    NotFilterable,
    #[error("failed to fetch items: {0}")]
    Fetch(#[from] StorageError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl SessionError {
    /// Whether the view should offer a retry of the same action.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Fetch(_))
    }
}

/// Errors emitted by completion notifiers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotifierError {
    #[error("completion notifier is not configured")]
    Disabled,
    #[error("completion notifier returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
