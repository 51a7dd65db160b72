pub mod catalog;
pub mod filters;
mod ids;
mod item;
mod topic;

pub use catalog::{Exemplar, TopicInfo, TopicStatus};
pub use filters::{FilterAxis, FilterCriteria, FilterDraft, FilterError, FilterOption};
pub use ids::{ExemplarId, ItemId, ParseIdError};
pub use item::{ExerciseItem, GrammarTags, ItemError, PromptFragments};
pub use topic::Topic;
