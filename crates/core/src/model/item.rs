use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ExemplarId, ItemId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ItemError {
    #[error("accepted answer cannot be empty")]
    EmptyAnswer,
}

//
// ─── GRAMMAR TAGS ──────────────────────────────────────────────────────────────
//

/// Grammatical metadata attached to a sentence.
///
/// Only used to match filter criteria and to render a hint; it never affects
/// answer checking.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrammarTags {
    pub case: Option<String>,
    pub number: Option<String>,
    pub definiteness: Option<String>,
    pub exemplar: Option<ExemplarId>,
}

impl GrammarTags {
    #[must_use]
    pub fn new(
        case: impl Into<String>,
        number: impl Into<String>,
        definiteness: impl Into<String>,
    ) -> Self {
        Self {
            case: Some(case.into()),
            number: Some(number.into()),
            definiteness: Some(definiteness.into()),
            exemplar: None,
        }
    }

    #[must_use]
    pub fn with_exemplar(mut self, exemplar: ExemplarId) -> Self {
        self.exemplar = Some(exemplar);
        self
    }
}

/// Text on either side of the blank the learner fills in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromptFragments {
    pub left: String,
    pub right: String,
}

impl PromptFragments {
    #[must_use]
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// A single fill-in-the-blank sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseItem {
    id: ItemId,
    prompt: PromptFragments,
    english_gloss: String,
    accepted_answer: String,
    base_form: String,
    grammar: Option<GrammarTags>,
}

impl ExerciseItem {
    /// Build an item.
    ///
    /// # Errors
    ///
    /// Returns `ItemError::EmptyAnswer` if the accepted answer is blank.
    pub fn new(
        id: ItemId,
        prompt: PromptFragments,
        english_gloss: impl Into<String>,
        accepted_answer: impl Into<String>,
        base_form: impl Into<String>,
    ) -> Result<Self, ItemError> {
        let accepted_answer = accepted_answer.into();
        if accepted_answer.trim().is_empty() {
            return Err(ItemError::EmptyAnswer);
        }
        Ok(Self {
            id,
            prompt,
            english_gloss: english_gloss.into(),
            accepted_answer,
            base_form: base_form.into(),
            grammar: None,
        })
    }

    #[must_use]
    pub fn with_grammar(mut self, grammar: GrammarTags) -> Self {
        self.grammar = Some(grammar);
        self
    }

    #[must_use]
    pub fn id(&self) -> ItemId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &PromptFragments {
        &self.prompt
    }

    #[must_use]
    pub fn english_gloss(&self) -> &str {
        &self.english_gloss
    }

    #[must_use]
    pub fn accepted_answer(&self) -> &str {
        &self.accepted_answer
    }

    /// Dictionary form shown as the input placeholder.
    #[must_use]
    pub fn base_form(&self) -> &str {
        &self.base_form
    }

    #[must_use]
    pub fn grammar(&self) -> Option<&GrammarTags> {
        self.grammar.as_ref()
    }

    /// Hint text built from the grammar tags, e.g. `Dative · Plural · Definite`.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        let grammar = self.grammar.as_ref()?;
        let parts: Vec<&str> = [&grammar.case, &grammar.number, &grammar.definiteness]
            .into_iter()
            .filter_map(|tag| tag.as_deref())
            .filter(|tag| !tag.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" · "))
        }
    }
}
