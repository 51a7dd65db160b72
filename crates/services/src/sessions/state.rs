use indexmap::IndexMap;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use drill_core::model::{
    ExerciseItem, FilterCriteria, FilterDraft, FilterOption, ItemId, Topic,
};
use storage::repository::ItemQuery;

use crate::error::SessionError;

/// Number of items shown before the summary screen.
pub const BATCH_SIZE: usize = 6;

//
// ─── PHASES & OUTCOMES ─────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    /// No batch yet, or a reset is waiting for the next refill.
    Loading,
    Active,
    BatchComplete,
    /// The last refill produced nothing to practice.
    Exhausted,
}

/// Whether a refill keeps or forgets what was mastered so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefillMode {
    #[default]
    KeepPracticing,
    StartFresh,
}

/// Identifies the session state a fetch was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub topic: Topic,
    pub filters: Option<FilterCriteria>,
    pub epoch: u64,
}

/// Result of applying one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub item_id: ItemId,
    pub correct: bool,
    /// No incorrect attempt preceded this answer.
    pub first_attempt: bool,
    pub batch_complete: bool,
}

/// Signal that a topic and filter combination has run out of unseen items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionNotice {
    pub topic: Topic,
    pub filters: Option<FilterCriteria>,
}

/// A fetch prepared from the session, carrying everything needed to apply it later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefillRequest {
    pub key: SessionKey,
    pub mode: RefillMode,
    pub query: ItemQuery,
    /// Fresh items needed to fill the batch after retry carry-over.
    pub needed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefillOutcome {
    pub carried_retry: usize,
    pub fetched: usize,
    pub pool_exhausted: bool,
    /// Present only the first time this topic and filter combination runs dry.
    pub notice: Option<CompletionNotice>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory drill session for one topic.
///
/// All transitions are synchronous; fetching is split into
/// [`Session::prepare_refill`] and [`Session::complete_refill`] so the caller
/// can await the item source in between.
#[derive(Clone)]
pub struct Session {
    topic: Topic,
    filters: Option<FilterDraft>,
    working_queue: Vec<ExerciseItem>,
    cursor: usize,
    answered_count: usize,
    mastered_ids: BTreeSet<ItemId>,
    retry_items: IndexMap<ItemId, ExerciseItem>,
    has_incorrect_attempt: bool,
    answer_revealed: bool,
    phase: BatchPhase,
    pool_exhausted: bool,
    epoch: u64,
    notified: HashSet<(Topic, Option<FilterCriteria>)>,
}

impl Session {
    /// Start a session; filterable topics begin with the default filters.
    #[must_use]
    pub fn new(topic: Topic) -> Self {
        let filters = topic.is_filterable().then(FilterDraft::default);
        Self::with_draft(topic, filters)
    }

    /// Start a session with explicit initial filters (e.g. parsed from a link).
    ///
    /// Ignored for topics without filters.
    #[must_use]
    pub fn with_filters(topic: Topic, filters: FilterCriteria) -> Self {
        let draft = topic.is_filterable().then(|| FilterDraft::new(filters));
        Self::with_draft(topic, draft)
    }

    fn with_draft(topic: Topic, filters: Option<FilterDraft>) -> Self {
        Self {
            topic,
            filters,
            working_queue: Vec::new(),
            cursor: 0,
            answered_count: 0,
            mastered_ids: BTreeSet::new(),
            retry_items: IndexMap::new(),
            has_incorrect_attempt: false,
            answer_revealed: false,
            phase: BatchPhase::Loading,
            pool_exhausted: false,
            epoch: 0,
            notified: HashSet::new(),
        }
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    #[must_use]
    pub fn filters(&self) -> Option<&FilterDraft> {
        self.filters.as_ref()
    }

    #[must_use]
    pub fn applied_filters(&self) -> Option<&FilterCriteria> {
        self.filters.as_ref().map(FilterDraft::applied)
    }

    #[must_use]
    pub fn working_queue(&self) -> &[ExerciseItem] {
        &self.working_queue
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answered_count
    }

    #[must_use]
    pub fn mastered_ids(&self) -> &BTreeSet<ItemId> {
        &self.mastered_ids
    }

    /// Retry items in the order they were first missed.
    pub fn retry_items(&self) -> impl Iterator<Item = &ExerciseItem> {
        self.retry_items.values()
    }

    #[must_use]
    pub fn retry_len(&self) -> usize {
        self.retry_items.len()
    }

    #[must_use]
    pub fn has_incorrect_attempt(&self) -> bool {
        self.has_incorrect_attempt
    }

    #[must_use]
    pub fn answer_revealed(&self) -> bool {
        self.answer_revealed
    }

    #[must_use]
    pub fn pool_exhausted(&self) -> bool {
        self.pool_exhausted
    }

    #[must_use]
    pub fn key(&self) -> SessionKey {
        SessionKey {
            topic: self.topic.clone(),
            filters: self.applied_filters().cloned(),
            epoch: self.epoch,
        }
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&ExerciseItem> {
        if self.phase == BatchPhase::Active {
            self.working_queue.get(self.cursor)
        } else {
            None
        }
    }

    /// Apply an evaluated answer for `item_id`, which must be the current item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotLoaded` without an active batch,
    /// `SessionError::BatchComplete` once the batch is done, and
    /// `SessionError::StaleAnswer` if `item_id` is not the current item.
    pub fn apply_answer(
        &mut self,
        item_id: ItemId,
        correct: bool,
    ) -> Result<AnswerOutcome, SessionError> {
        match self.phase {
            BatchPhase::Active => {}
            BatchPhase::BatchComplete => return Err(SessionError::BatchComplete),
            BatchPhase::Loading | BatchPhase::Exhausted => return Err(SessionError::NotLoaded),
        }
        let current = self
            .working_queue
            .get(self.cursor)
            .ok_or(SessionError::NotLoaded)?;
        if current.id() != item_id {
            return Err(SessionError::StaleAnswer {
                expected: current.id(),
                got: item_id,
            });
        }

        let first_attempt = !self.has_incorrect_attempt;

        if !correct {
            if first_attempt && !self.retry_items.contains_key(&item_id) {
                self.retry_items.insert(item_id, current.clone());
                debug!(item = %item_id, retry = self.retry_items.len(), "item queued for retry");
            }
            self.has_incorrect_attempt = true;
            return Ok(AnswerOutcome {
                item_id,
                correct: false,
                first_attempt,
                batch_complete: false,
            });
        }

        // Retried items are mastered too; they never re-enter the retry set.
        self.retry_items.shift_remove(&item_id);
        self.mastered_ids.insert(item_id);
        self.answered_count += 1;
        self.cursor += 1;
        self.has_incorrect_attempt = false;
        self.answer_revealed = false;

        let batch_complete = self.cursor >= self.working_queue.len();
        if batch_complete {
            self.phase = BatchPhase::BatchComplete;
            debug!(
                topic = %self.topic,
                answered = self.answered_count,
                mastered = self.mastered_ids.len(),
                "batch complete"
            );
        }

        Ok(AnswerOutcome {
            item_id,
            correct: true,
            first_attempt,
            batch_complete,
        })
    }

    /// Reveal the accepted answer of the current item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RevealNotAllowed` unless the current item has
    /// received an incorrect attempt.
    pub fn reveal_answer(&mut self) -> Result<&str, SessionError> {
        if self.phase != BatchPhase::Active || !self.has_incorrect_attempt {
            return Err(SessionError::RevealNotAllowed);
        }
        let item = self
            .working_queue
            .get(self.cursor)
            .ok_or(SessionError::RevealNotAllowed)?;
        self.answer_revealed = true;
        Ok(item.accepted_answer())
    }

    /// Build the fetch for the next batch. The session itself is not modified.
    #[must_use]
    pub fn prepare_refill(&self, mode: RefillMode) -> RefillRequest {
        let carried = self.retry_items.len().min(BATCH_SIZE);
        let needed = BATCH_SIZE - carried;
        let exclude_mastered = match mode {
            RefillMode::KeepPracticing => self.mastered_ids.clone(),
            RefillMode::StartFresh => BTreeSet::new(),
        };
        let key = self.key();
        RefillRequest {
            query: ItemQuery {
                topic: key.topic.clone(),
                filters: key.filters.clone(),
                exclude_mastered,
                exclude_retry: self.retry_items.keys().copied().collect(),
                count: needed,
            },
            key,
            mode,
            needed,
        }
    }

    /// Install the items fetched for `request` as the new batch.
    ///
    /// Items that are already mastered, queued for retry, or repeated within
    /// the response are dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::StaleResponse` if the topic, filters, or epoch
    /// changed since the request was prepared; the session is left untouched.
    pub fn complete_refill(
        &mut self,
        request: RefillRequest,
        fetched: Vec<ExerciseItem>,
    ) -> Result<RefillOutcome, SessionError> {
        if request.key != self.key() {
            warn!(topic = %request.key.topic, "discarding response for a superseded request");
            return Err(SessionError::StaleResponse);
        }

        if request.mode == RefillMode::StartFresh {
            self.mastered_ids.clear();
        }

        let mut queue: Vec<ExerciseItem> =
            self.retry_items.values().take(BATCH_SIZE).cloned().collect();
        let carried_retry = queue.len();
        let mut seen: HashSet<ItemId> = queue.iter().map(ExerciseItem::id).collect();

        let mut accepted = 0;
        for item in fetched {
            let id = item.id();
            if self.mastered_ids.contains(&id) || !seen.insert(id) {
                warn!(item = %id, "item source returned an excluded or duplicate item");
                continue;
            }
            if accepted == request.needed {
                warn!(item = %id, "item source returned more items than requested");
                continue;
            }
            queue.push(item);
            accepted += 1;
        }

        let pool_exhausted = accepted < request.needed;
        let notice = if pool_exhausted {
            let filters = self.applied_filters().cloned();
            let first = self.notified.insert((self.topic.clone(), filters.clone()));
            info!(
                topic = %self.topic,
                requested = request.needed,
                fetched = accepted,
                first,
                "item pool exhausted"
            );
            first.then(|| CompletionNotice {
                topic: self.topic.clone(),
                filters,
            })
        } else {
            None
        };

        self.phase = if queue.is_empty() {
            BatchPhase::Exhausted
        } else {
            BatchPhase::Active
        };
        self.working_queue = queue;
        self.cursor = 0;
        self.answered_count = 0;
        self.has_incorrect_attempt = false;
        self.answer_revealed = false;
        self.pool_exhausted = pool_exhausted;

        Ok(RefillOutcome {
            carried_retry,
            fetched: accepted,
            pool_exhausted,
            notice,
        })
    }

    /// Edit the pending filter selection.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFilterable` for topics without filters and
    /// `SessionError::Filter` for rejected edits.
    pub fn edit_filter(&mut self, option: FilterOption, selected: bool) -> Result<(), SessionError> {
        let draft = self.filters.as_mut().ok_or(SessionError::NotFilterable)?;
        draft.set(option, selected)?;
        Ok(())
    }

    /// Apply pending filter edits. A change resets the whole session so the
    /// next refill starts from scratch; returns whether that happened.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFilterable` for topics without filters.
    pub fn confirm_filters(&mut self) -> Result<bool, SessionError> {
        let draft = self.filters.as_mut().ok_or(SessionError::NotFilterable)?;
        if !draft.confirm() {
            return Ok(false);
        }
        self.reset();
        Ok(true)
    }

    /// Drop pending edits.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFilterable` for topics without filters.
    pub fn discard_filter_edits(&mut self) -> Result<(), SessionError> {
        self.filters
            .as_mut()
            .ok_or(SessionError::NotFilterable)?
            .discard();
        Ok(())
    }

    /// Set the pending selection back to defaults; still needs confirmation.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFilterable` for topics without filters.
    pub fn reset_filters_to_defaults(&mut self) -> Result<(), SessionError> {
        self.filters
            .as_mut()
            .ok_or(SessionError::NotFilterable)?
            .reset_to_defaults();
        Ok(())
    }

    fn reset(&mut self) {
        self.working_queue.clear();
        self.cursor = 0;
        self.answered_count = 0;
        self.mastered_ids.clear();
        self.retry_items.clear();
        self.has_incorrect_attempt = false;
        self.answer_revealed = false;
        self.pool_exhausted = false;
        self.phase = BatchPhase::Loading;
        self.epoch += 1;
        debug!(topic = %self.topic, epoch = self.epoch, "session reset");
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("topic", &self.topic)
            .field("phase", &self.phase)
            .field("queue_len", &self.working_queue.len())
            .field("cursor", &self.cursor)
            .field("answered_count", &self.answered_count)
            .field("mastered", &self.mastered_ids.len())
            .field("retry", &self.retry_items.len())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
