use drill_core::model::{ExerciseItem, FilterCriteria, Topic};

use super::state::{BatchPhase, Session};

/// Aggregated view of batch progress, useful for a progress bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Share of the batch answered, 0..=100.
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.answered.min(self.total) * 100) / self.total;
        u8::try_from(pct).unwrap_or(100)
    }
}

/// Read-only copy of everything a view needs to render the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub topic: Topic,
    pub phase: BatchPhase,
    pub current: Option<ExerciseItem>,
    pub hint: Option<String>,
    pub cursor: usize,
    pub progress: SessionProgress,
    pub mastered: usize,
    pub retry: usize,
    pub has_incorrect_attempt: bool,
    pub revealed_answer: Option<String>,
    pub pool_exhausted: bool,
    pub applied_filters: Option<FilterCriteria>,
    pub pending_filters: Option<FilterCriteria>,
    pub filters_dirty: bool,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        let current = session.current_item().cloned();
        let revealed_answer = if session.answer_revealed() {
            current.as_ref().map(|item| item.accepted_answer().to_owned())
        } else {
            None
        };
        let total = session.working_queue().len();
        let filters = session.filters();

        Self {
            topic: session.topic().clone(),
            phase: session.phase(),
            hint: current.as_ref().and_then(ExerciseItem::hint),
            current,
            cursor: session.cursor(),
            progress: SessionProgress {
                total,
                answered: session.answered_count(),
                remaining: total.saturating_sub(session.answered_count()),
                is_complete: session.phase() == BatchPhase::BatchComplete,
            },
            mastered: session.mastered_ids().len(),
            retry: session.retry_len(),
            has_incorrect_attempt: session.has_incorrect_attempt(),
            revealed_answer,
            pool_exhausted: session.pool_exhausted(),
            applied_filters: filters.map(|f| f.applied().clone()),
            pending_filters: filters.map(|f| f.pending().clone()),
            filters_dirty: filters.is_some_and(|f| f.is_dirty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_handles_empty_and_partial_batches() {
        let empty = SessionProgress {
            total: 0,
            answered: 0,
            remaining: 0,
            is_complete: false,
        };
        assert_eq!(empty.percent(), 0);

        let half = SessionProgress {
            total: 6,
            answered: 3,
            remaining: 3,
            is_complete: false,
        };
        assert_eq!(half.percent(), 50);
    }

    #[test]
    fn fresh_session_snapshot_is_loading_with_default_filters() {
        let session = Session::new(Topic::new("Nouns", "Cases"));
        let snapshot = SessionSnapshot::from(&session);
        assert_eq!(snapshot.phase, BatchPhase::Loading);
        assert!(snapshot.current.is_none());
        assert_eq!(snapshot.applied_filters, Some(FilterCriteria::default()));
        assert!(!snapshot.filters_dirty);
    }
}
