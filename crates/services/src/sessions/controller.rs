use std::fmt;
use std::sync::Arc;

use tracing::debug;

use drill_core::evaluator::is_correct;
use drill_core::model::{FilterCriteria, FilterOption, Topic};
use storage::repository::ItemSource;

use super::commands::{SessionCommand, SessionEvent};
use super::progress::SessionSnapshot;
use super::state::{AnswerOutcome, BatchPhase, RefillMode, RefillOutcome, Session};
use crate::error::SessionError;
use crate::notifier::NotificationDispatcher;

/// Drives a [`Session`] against an item source.
///
/// The only mutator of its session: every operation takes `&mut self`, and
/// exclusions are captured when a fetch is issued.
pub struct SessionController {
    session: Session,
    items: Arc<dyn ItemSource>,
    notifications: NotificationDispatcher,
}

impl SessionController {
    /// Create a controller for `topic`. No items are loaded until [`Self::refill`].
    #[must_use]
    pub fn new(
        topic: Topic,
        items: Arc<dyn ItemSource>,
        notifications: NotificationDispatcher,
    ) -> Self {
        Self {
            session: Session::new(topic),
            items,
            notifications,
        }
    }

    /// Replace the initial filters (e.g. from a shared link) before loading.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterCriteria) -> Self {
        self.session = Session::with_filters(self.session.topic().clone(), filters);
        self
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&self.session)
    }

    /// Start a fresh session on `topic` and load its first batch.
    ///
    /// Reopening the current topic keeps its applied filters (e.g. from a shared
    /// link); any other topic starts from the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Fetch` if the first batch cannot be loaded; the
    /// new session stays in the loading phase and `refill` may be retried.
    pub async fn open(&mut self, topic: Topic) -> Result<RefillOutcome, SessionError> {
        let kept = if &topic == self.session.topic() {
            self.session.applied_filters().cloned()
        } else {
            None
        };
        debug!(%topic, keeps_filters = kept.is_some(), "opening session");
        self.session = match kept {
            Some(filters) => Session::with_filters(topic, filters),
            None => Session::new(topic),
        };
        self.refill(RefillMode::KeepPracticing).await
    }

    /// Check `input` against the current item and apply the result.
    ///
    /// # Errors
    ///
    /// See [`Session::apply_answer`].
    pub fn submit_answer(&mut self, input: &str) -> Result<AnswerOutcome, SessionError> {
        let item = self
            .session
            .current_item()
            .ok_or_else(|| match self.session.phase() {
                BatchPhase::BatchComplete => SessionError::BatchComplete,
                _ => SessionError::NotLoaded,
            })?;
        let item_id = item.id();
        let correct = is_correct(input, item.accepted_answer());
        self.session.apply_answer(item_id, correct)
    }

    /// Show the accepted answer after a miss.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RevealNotAllowed` before any incorrect attempt.
    pub fn reveal_answer(&mut self) -> Result<String, SessionError> {
        self.session.reveal_answer().map(str::to_owned)
    }

    /// Load the next batch.
    ///
    /// On a fetch error nothing changes and the call can simply be repeated.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Fetch` if the item source fails and
    /// `SessionError::StaleResponse` if the session moved on meanwhile.
    pub async fn refill(&mut self, mode: RefillMode) -> Result<RefillOutcome, SessionError> {
        let request = self.session.prepare_refill(mode);
        let fetched = if request.needed > 0 {
            self.items.fetch(&request.query).await?
        } else {
            Vec::new()
        };
        let outcome = self.session.complete_refill(request, fetched)?;
        if let Some(notice) = &outcome.notice {
            self.notifications.dispatch(notice.clone());
        }
        Ok(outcome)
    }

    /// Edit the pending filters; nothing reaches the live batch until confirmed.
    ///
    /// # Errors
    ///
    /// See [`Session::edit_filter`].
    pub fn edit_filter(&mut self, option: FilterOption, selected: bool) -> Result<(), SessionError> {
        self.session.edit_filter(option, selected)
    }

    /// Apply pending filter edits and, if they changed anything, load a fresh batch.
    ///
    /// Returns `None` when the pending selection equals the applied one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFilterable` for topics without filters, or a
    /// fetch error from the refill (the reset has already happened; retry with
    /// [`Self::refill`]).
    pub async fn confirm_filters(&mut self) -> Result<Option<RefillOutcome>, SessionError> {
        if !self.session.confirm_filters()? {
            return Ok(None);
        }
        self.refill(RefillMode::KeepPracticing).await.map(Some)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotFilterable` for topics without filters.
    pub fn discard_filter_edits(&mut self) -> Result<(), SessionError> {
        self.session.discard_filter_edits()
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotFilterable` for topics without filters.
    pub fn reset_filters_to_defaults(&mut self) -> Result<(), SessionError> {
        self.session.reset_filters_to_defaults()
    }

    /// Run one command from the view layer.
    ///
    /// # Errors
    ///
    /// Propagates the error of the underlying operation.
    pub async fn handle(&mut self, command: SessionCommand) -> Result<SessionEvent, SessionError> {
        match command {
            SessionCommand::Open(topic) => self.open(topic).await.map(SessionEvent::Refilled),
            SessionCommand::Submit(input) => {
                self.submit_answer(&input).map(SessionEvent::Answered)
            }
            SessionCommand::RevealAnswer => self.reveal_answer().map(SessionEvent::AnswerRevealed),
            SessionCommand::Refill(mode) => self.refill(mode).await.map(SessionEvent::Refilled),
            SessionCommand::EditFilter { option, selected } => self
                .edit_filter(option, selected)
                .map(|()| SessionEvent::FiltersEdited),
            SessionCommand::ConfirmFilters => self
                .confirm_filters()
                .await
                .map(SessionEvent::FiltersConfirmed),
            SessionCommand::DiscardFilterEdits => self
                .discard_filter_edits()
                .map(|()| SessionEvent::FiltersEdited),
            SessionCommand::ResetFiltersToDefaults => self
                .reset_filters_to_defaults()
                .map(|()| SessionEvent::FiltersEdited),
        }
    }

    /// Wait for outstanding completion notices, e.g. before tearing down.
    pub async fn flush_notifications(&mut self) {
        self.notifications.flush().await;
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
