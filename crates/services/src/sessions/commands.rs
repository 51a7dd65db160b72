use drill_core::model::{FilterOption, Topic};

use super::state::{AnswerOutcome, RefillMode, RefillOutcome};

/// User intents a view can send to a [`super::SessionController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Open(Topic),
    Submit(String),
    RevealAnswer,
    Refill(RefillMode),
    EditFilter { option: FilterOption, selected: bool },
    ConfirmFilters,
    DiscardFilterEdits,
    ResetFiltersToDefaults,
}

/// What a handled command produced; re-read the snapshot to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Answered(AnswerOutcome),
    AnswerRevealed(String),
    Refilled(RefillOutcome),
    FiltersEdited,
    /// `None` when the confirmed selection was unchanged.
    FiltersConfirmed(Option<RefillOutcome>),
}
