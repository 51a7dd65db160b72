//! Grammar filters for filterable topics.
//!
//! A `FilterCriteria` always has at least one value selected on every axis. The
//! `FilterDraft` keeps the criteria that govern the live session (`applied`) apart
//! from the selection the learner is still editing (`pending`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use url::form_urlencoded;

use crate::model::ids::ExemplarId;
use crate::model::item::GrammarTags;

pub const CASE_OPTIONS: [&str; 3] = ["Accusative", "Dative", "Genitive"];
pub const NUMBER_OPTIONS: [&str; 2] = ["Singular", "Plural"];
pub const DEFINITENESS_OPTIONS: [&str; 2] = ["Indefinite", "Definite"];

const DEFAULT_CASE: &str = "Accusative";
const DEFAULT_NUMBER: &str = "Singular";
const DEFAULT_DEFINITENESS: &str = "Indefinite";
const DEFAULT_EXEMPLARS: [u64; 5] = [5, 7, 1, 2, 11];

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterError {
    #[error("at least one {0} option must stay selected")]
    EmptyAxis(FilterAxis),

    #[error("unknown {axis} option: {value}")]
    UnknownOption { axis: FilterAxis, value: String },
}

//
// ─── AXES ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterAxis {
    Case,
    Number,
    Definiteness,
    Exemplar,
}

impl FilterAxis {
    /// Key used for this axis in a query string.
    #[must_use]
    pub fn query_key(self) -> &'static str {
        match self {
            FilterAxis::Case => "case",
            FilterAxis::Number => "number",
            FilterAxis::Definiteness => "def",
            FilterAxis::Exemplar => "ex",
        }
    }

    /// Known values for the string axes; exemplars are open-ended.
    #[must_use]
    pub fn options(self) -> &'static [&'static str] {
        match self {
            FilterAxis::Case => &CASE_OPTIONS,
            FilterAxis::Number => &NUMBER_OPTIONS,
            FilterAxis::Definiteness => &DEFINITENESS_OPTIONS,
            FilterAxis::Exemplar => &[],
        }
    }

    fn is_known(self, value: &str) -> bool {
        self.options().iter().any(|option| *option == value)
    }
}

impl fmt::Display for FilterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterAxis::Case => "case",
            FilterAxis::Number => "number",
            FilterAxis::Definiteness => "definiteness",
            FilterAxis::Exemplar => "exemplar",
        };
        f.write_str(name)
    }
}

/// One selectable value on one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOption {
    Case(String),
    Number(String),
    Definiteness(String),
    Exemplar(ExemplarId),
}

impl FilterOption {
    #[must_use]
    pub fn axis(&self) -> FilterAxis {
        match self {
            FilterOption::Case(_) => FilterAxis::Case,
            FilterOption::Number(_) => FilterAxis::Number,
            FilterOption::Definiteness(_) => FilterAxis::Definiteness,
            FilterOption::Exemplar(_) => FilterAxis::Exemplar,
        }
    }
}

//
// ─── CRITERIA ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterCriteria {
    case: BTreeSet<String>,
    number: BTreeSet<String>,
    definiteness: BTreeSet<String>,
    exemplar: BTreeSet<ExemplarId>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            case: BTreeSet::from([DEFAULT_CASE.to_owned()]),
            number: BTreeSet::from([DEFAULT_NUMBER.to_owned()]),
            definiteness: BTreeSet::from([DEFAULT_DEFINITENESS.to_owned()]),
            exemplar: DEFAULT_EXEMPLARS.into_iter().map(ExemplarId::new).collect(),
        }
    }
}

impl FilterCriteria {
    /// Build criteria from explicit selections.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::EmptyAxis` if any axis has no values and
    /// `FilterError::UnknownOption` for values outside the known options.
    pub fn new<S: Into<String>>(
        case: impl IntoIterator<Item = S>,
        number: impl IntoIterator<Item = S>,
        definiteness: impl IntoIterator<Item = S>,
        exemplar: impl IntoIterator<Item = ExemplarId>,
    ) -> Result<Self, FilterError> {
        let case = known_values(FilterAxis::Case, case)?;
        let number = known_values(FilterAxis::Number, number)?;
        let definiteness = known_values(FilterAxis::Definiteness, definiteness)?;
        let exemplar: BTreeSet<ExemplarId> = exemplar.into_iter().collect();
        if exemplar.is_empty() {
            return Err(FilterError::EmptyAxis(FilterAxis::Exemplar));
        }
        Ok(Self {
            case,
            number,
            definiteness,
            exemplar,
        })
    }

    #[must_use]
    pub fn cases(&self) -> &BTreeSet<String> {
        &self.case
    }

    #[must_use]
    pub fn numbers(&self) -> &BTreeSet<String> {
        &self.number
    }

    #[must_use]
    pub fn definiteness(&self) -> &BTreeSet<String> {
        &self.definiteness
    }

    #[must_use]
    pub fn exemplars(&self) -> &BTreeSet<ExemplarId> {
        &self.exemplar
    }

    #[must_use]
    pub fn is_selected(&self, option: &FilterOption) -> bool {
        match option {
            FilterOption::Case(v) => self.case.contains(v),
            FilterOption::Number(v) => self.number.contains(v),
            FilterOption::Definiteness(v) => self.definiteness.contains(v),
            FilterOption::Exemplar(id) => self.exemplar.contains(id),
        }
    }

    /// Select or deselect one option.
    ///
    /// The criteria are left untouched when the edit is rejected.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::EmptyAxis` when deselecting the last value of an axis,
    /// and `FilterError::UnknownOption` when selecting an unknown string value.
    pub fn set(&mut self, option: FilterOption, selected: bool) -> Result<(), FilterError> {
        let axis = option.axis();
        match option {
            FilterOption::Case(v) => set_value(&mut self.case, axis, v, selected),
            FilterOption::Number(v) => set_value(&mut self.number, axis, v, selected),
            FilterOption::Definiteness(v) => {
                set_value(&mut self.definiteness, axis, v, selected)
            }
            FilterOption::Exemplar(id) => {
                if selected {
                    self.exemplar.insert(id);
                } else {
                    if self.exemplar.len() == 1 && self.exemplar.contains(&id) {
                        return Err(FilterError::EmptyAxis(axis));
                    }
                    self.exemplar.remove(&id);
                }
                Ok(())
            }
        }
    }

    /// Whether a sentence with these tags belongs to the filtered pool.
    ///
    /// Exemplars only constrain sentences that carry one.
    #[must_use]
    pub fn matches(&self, tags: &GrammarTags) -> bool {
        let in_set = |set: &BTreeSet<String>, tag: &Option<String>| {
            tag.as_ref().is_some_and(|t| set.contains(t))
        };
        in_set(&self.case, &tags.case)
            && in_set(&self.number, &tags.number)
            && in_set(&self.definiteness, &tags.definiteness)
            && tags.exemplar.is_none_or(|ex| self.exemplar.contains(&ex))
    }

    /// Values of one axis joined with commas.
    #[must_use]
    pub fn joined(&self, axis: FilterAxis) -> String {
        match axis {
            FilterAxis::Case => join(self.case.iter()),
            FilterAxis::Number => join(self.number.iter()),
            FilterAxis::Definiteness => join(self.definiteness.iter()),
            FilterAxis::Exemplar => join(self.exemplar.iter()),
        }
    }

    /// Parse criteria from a query string such as `case=Dative,Genitive&ex=1,2`.
    ///
    /// Missing, empty, or entirely unrecognized axes fall back to their defaults;
    /// unrecognized individual values are skipped.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut out = Self::default();
        let query = query.trim_start_matches('?');
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let parts = value.split(',').map(str::trim).filter(|p| !p.is_empty());
            match key.as_ref() {
                "case" => replace_if_any(&mut out.case, filter_known(FilterAxis::Case, parts)),
                "number" => {
                    replace_if_any(&mut out.number, filter_known(FilterAxis::Number, parts));
                }
                "def" => replace_if_any(
                    &mut out.definiteness,
                    filter_known(FilterAxis::Definiteness, parts),
                ),
                "ex" => replace_if_any(
                    &mut out.exemplar,
                    parts.filter_map(|p| p.parse::<ExemplarId>().ok()).collect(),
                ),
                _ => {}
            }
        }
        out
    }

    /// Serialize to the query-string form read by [`FilterCriteria::from_query`].
    #[must_use]
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for axis in [
            FilterAxis::Case,
            FilterAxis::Number,
            FilterAxis::Definiteness,
            FilterAxis::Exemplar,
        ] {
            serializer.append_pair(axis.query_key(), &self.joined(axis));
        }
        serializer.finish()
    }
}

fn known_values<S: Into<String>>(
    axis: FilterAxis,
    values: impl IntoIterator<Item = S>,
) -> Result<BTreeSet<String>, FilterError> {
    let mut out = BTreeSet::new();
    for value in values {
        let value = value.into();
        if !axis.is_known(&value) {
            return Err(FilterError::UnknownOption { axis, value });
        }
        out.insert(value);
    }
    if out.is_empty() {
        return Err(FilterError::EmptyAxis(axis));
    }
    Ok(out)
}

fn set_value(
    set: &mut BTreeSet<String>,
    axis: FilterAxis,
    value: String,
    selected: bool,
) -> Result<(), FilterError> {
    if selected {
        if !axis.is_known(&value) {
            return Err(FilterError::UnknownOption { axis, value });
        }
        set.insert(value);
        return Ok(());
    }
    if set.len() == 1 && set.contains(&value) {
        return Err(FilterError::EmptyAxis(axis));
    }
    set.remove(&value);
    Ok(())
}

fn filter_known<'a>(
    axis: FilterAxis,
    parts: impl Iterator<Item = &'a str>,
) -> BTreeSet<String> {
    parts
        .filter(|p| axis.is_known(p))
        .map(str::to_owned)
        .collect()
}

fn replace_if_any<T: Ord>(target: &mut BTreeSet<T>, parsed: BTreeSet<T>) {
    if !parsed.is_empty() {
        *target = parsed;
    }
}

fn join<T: fmt::Display>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(",")
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Applied criteria plus the learner's unconfirmed edits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterDraft {
    applied: FilterCriteria,
    pending: FilterCriteria,
}

impl FilterDraft {
    #[must_use]
    pub fn new(applied: FilterCriteria) -> Self {
        Self {
            pending: applied.clone(),
            applied,
        }
    }

    #[must_use]
    pub fn applied(&self) -> &FilterCriteria {
        &self.applied
    }

    #[must_use]
    pub fn pending(&self) -> &FilterCriteria {
        &self.pending
    }

    /// True when there are edits waiting for confirmation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.applied != self.pending
    }

    /// Edit the pending selection only.
    ///
    /// # Errors
    ///
    /// Propagates `FilterError` from [`FilterCriteria::set`]; the pending
    /// selection is unchanged on error.
    pub fn set(&mut self, option: FilterOption, selected: bool) -> Result<(), FilterError> {
        self.pending.set(option, selected)
    }

    /// Promote pending edits. Returns `true` if the applied criteria changed.
    pub fn confirm(&mut self) -> bool {
        if !self.is_dirty() {
            return false;
        }
        self.applied = self.pending.clone();
        true
    }

    pub fn discard(&mut self) {
        self.pending = self.applied.clone();
    }

    /// Reset the pending selection to defaults; still needs `confirm`.
    pub fn reset_to_defaults(&mut self) {
        self.pending = FilterCriteria::default();
    }
}
