use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::ExemplarId;
use super::topic::Topic;

/// Publication state of a topic; only online topics are offered for practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Online,
    #[default]
    Offline,
}

impl TopicStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TopicStatus::Online => "online",
            TopicStatus::Offline => "offline",
        }
    }

    /// Stored status text; anything but `online` (including none) is offline.
    #[must_use]
    pub fn from_stored(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("online") => TopicStatus::Online,
            _ => TopicStatus::Offline,
        }
    }
}

impl fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog entry for one practicable topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub topic: Topic,
    pub status: TopicStatus,
    pub difficulty: Option<String>,
    /// HTML shown below the exercise.
    pub further_reading: Option<String>,
}

impl TopicInfo {
    #[must_use]
    pub fn online(topic: Topic) -> Self {
        Self {
            topic,
            status: TopicStatus::Online,
            difficulty: None,
            further_reading: None,
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    #[must_use]
    pub fn with_further_reading(mut self, html: impl Into<String>) -> Self {
        self.further_reading = Some(html.into());
        self
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.status == TopicStatus::Online
    }
}

/// Online topics grouped under their word category, both levels sorted.
#[must_use]
pub fn group_by_category(topics: &[TopicInfo]) -> BTreeMap<String, Vec<TopicInfo>> {
    let mut grouped: BTreeMap<String, Vec<TopicInfo>> = BTreeMap::new();
    for info in topics.iter().filter(|info| info.is_online()) {
        grouped
            .entry(info.topic.word_category().to_owned())
            .or_default()
            .push(info.clone());
    }
    for group in grouped.values_mut() {
        group.sort_by(|a, b| a.topic.cmp(&b.topic));
    }
    grouped
}

/// A model noun whose declension pattern sentences can be filtered by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exemplar {
    pub id: ExemplarId,
    pub name: String,
    pub gender: Option<String>,
    /// `Strong` or `Weak` declension.
    pub declension: Option<String>,
    pub is_default: bool,
}

impl Exemplar {
    #[must_use]
    pub fn new(id: ExemplarId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gender: None,
            declension: None,
            is_default: false,
        }
    }

    #[must_use]
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    #[must_use]
    pub fn with_declension(mut self, declension: impl Into<String>) -> Self {
        self.declension = Some(declension.into());
        self
    }

    #[must_use]
    pub fn marked_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

const GENDER_ORDER: [&str; 3] = ["Masculine", "Feminine", "Neuter"];

fn gender_rank(gender: Option<&str>) -> usize {
    gender
        .and_then(|g| GENDER_ORDER.iter().position(|known| *known == g))
        .unwrap_or(GENDER_ORDER.len())
}

/// Order exemplars for a picker: by gender, defaults first, then by id.
pub fn sort_exemplars(exemplars: &mut [Exemplar]) {
    exemplars.sort_by(|a, b| {
        gender_rank(a.gender.as_deref())
            .cmp(&gender_rank(b.gender.as_deref()))
            .then(b.is_default.cmp(&a.is_default))
            .then(a.id.cmp(&b.id))
    });
}
