use serde::{Deserialize, Serialize};
use std::fmt;

/// Subcategory whose sentences carry case/number/definiteness filters.
pub const FILTERABLE_SUBCATEGORY: &str = "Cases";

/// A drill set, identified by word category and subcategory (e.g. `Nouns / Cases`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Topic {
    word_category: String,
    subcategory: String,
}

impl Topic {
    #[must_use]
    pub fn new(word_category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self {
            word_category: word_category.into(),
            subcategory: subcategory.into(),
        }
    }

    #[must_use]
    pub fn word_category(&self) -> &str {
        &self.word_category
    }

    #[must_use]
    pub fn subcategory(&self) -> &str {
        &self.subcategory
    }

    /// Whether sessions on this topic carry grammar filters.
    #[must_use]
    pub fn is_filterable(&self) -> bool {
        self.subcategory == FILTERABLE_SUBCATEGORY
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.word_category, self.subcategory)
    }
}
