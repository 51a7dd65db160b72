use async_trait::async_trait;
use drill_core::model::{
    Exemplar, ExemplarId, ExerciseItem, FilterCriteria, GrammarTags, ItemId, PromptFragments,
    Topic, TopicInfo,
};
use rand::rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by item source adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("item source unavailable: {0}")]
    Unavailable(String),

    #[error("invalid stored data: {0}")]
    Invalid(#[from] drill_core::Error),
}

//
// ─── QUERY ─────────────────────────────────────────────────────────────────────
//

/// Parameters of one fetch, captured when the request is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub topic: Topic,
    pub filters: Option<FilterCriteria>,
    pub exclude_mastered: BTreeSet<ItemId>,
    pub exclude_retry: BTreeSet<ItemId>,
    pub count: usize,
}

impl ItemQuery {
    #[must_use]
    pub fn is_excluded(&self, id: ItemId) -> bool {
        self.exclude_mastered.contains(&id) || self.exclude_retry.contains(&id)
    }

    /// Whether an item satisfies the query's filters.
    ///
    /// With filters present, untagged items are outside the pool.
    #[must_use]
    pub fn admits(&self, item: &ExerciseItem) -> bool {
        match (&self.filters, item.grammar()) {
            (None, _) => true,
            (Some(filters), Some(tags)) => filters.matches(tags),
            (Some(_), None) => false,
        }
    }
}

/// Source of fresh exercise items for a topic.
///
/// Implementations return at most `query.count` items, none of them excluded by
/// the query and no id twice. Returning fewer than requested means the pool for
/// this topic and filter combination is exhausted.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Fetch up to `query.count` unseen items.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be queried.
    async fn fetch(&self, query: &ItemQuery) -> Result<Vec<ExerciseItem>, StorageError>;
}

/// Read-only listing of what can be practiced.
#[async_trait]
pub trait TopicCatalog: Send + Sync {
    /// Online topics, ordered by category then subcategory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be queried.
    async fn topics(&self) -> Result<Vec<TopicInfo>, StorageError>;

    /// Catalog entry for one topic, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown topics.
    async fn topic(&self, topic: &Topic) -> Result<TopicInfo, StorageError>;

    /// Every exemplar, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be queried.
    async fn exemplars(&self) -> Result<Vec<Exemplar>, StorageError>;
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Persisted shape of a sentence row.
///
/// Mirrors `ExerciseItem` plus its topic so adapters can map rows without
/// leaking storage concerns into the domain layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub word_category: String,
    pub subcategory: String,
    pub left: String,
    pub right: String,
    pub english_gloss: String,
    pub accepted_answer: String,
    pub base_form: String,
    pub case: Option<String>,
    pub number: Option<String>,
    pub definiteness: Option<String>,
    pub exemplar: Option<ExemplarId>,
}

impl ItemRecord {
    #[must_use]
    pub fn from_item(topic: &Topic, item: &ExerciseItem) -> Self {
        let grammar = item.grammar().cloned().unwrap_or_default();
        Self {
            id: item.id(),
            word_category: topic.word_category().to_owned(),
            subcategory: topic.subcategory().to_owned(),
            left: item.prompt().left.clone(),
            right: item.prompt().right.clone(),
            english_gloss: item.english_gloss().to_owned(),
            accepted_answer: item.accepted_answer().to_owned(),
            base_form: item.base_form().to_owned(),
            case: grammar.case,
            number: grammar.number,
            definiteness: grammar.definiteness,
            exemplar: grammar.exemplar,
        }
    }

    /// Convert the record back into a domain `ExerciseItem`.
    ///
    /// # Errors
    ///
    /// Returns `drill_core::Error::Item` if the stored answer is blank.
    pub fn into_item(self) -> Result<ExerciseItem, drill_core::Error> {
        let grammar = GrammarTags {
            case: self.case,
            number: self.number,
            definiteness: self.definiteness,
            exemplar: self.exemplar,
        };
        let item = ExerciseItem::new(
            self.id,
            PromptFragments::new(self.left, self.right),
            self.english_gloss,
            self.accepted_answer,
            self.base_form,
        )?;
        // Untagged rows stay untagged.
        if grammar == GrammarTags::default() {
            Ok(item)
        } else {
            Ok(item.with_grammar(grammar))
        }
    }
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// In-memory item source for tests and prototyping.
///
/// Items are served in id order unless shuffling is enabled. Every query is
/// recorded so callers can inspect what was asked for.
#[derive(Clone, Default)]
pub struct InMemoryItemSource {
    items: Arc<Mutex<BTreeMap<Topic, BTreeMap<ItemId, ExerciseItem>>>>,
    topics: Arc<Mutex<BTreeMap<Topic, TopicInfo>>>,
    exemplars: Arc<Mutex<BTreeMap<ExemplarId, Exemplar>>>,
    queries: Arc<Mutex<Vec<ItemQuery>>>,
    failing: Arc<AtomicBool>,
    shuffle: bool,
}

impl InMemoryItemSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Insert or replace an item under a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn upsert_item(&self, topic: &Topic, item: ExerciseItem) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.entry(topic.clone()).or_default().insert(item.id(), item);
        Ok(())
    }

    /// Insert or replace a catalog entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn upsert_topic(&self, info: TopicInfo) -> Result<(), StorageError> {
        self.topics
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .insert(info.topic.clone(), info);
        Ok(())
    }

    /// Insert or replace an exemplar.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn upsert_exemplar(&self, exemplar: Exemplar) -> Result<(), StorageError> {
        self.exemplars
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .insert(exemplar.id, exemplar);
        Ok(())
    }

    /// Make subsequent fetches fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Queries served so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn queries(&self) -> Result<Vec<ItemQuery>, StorageError> {
        let guard = self
            .queries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl ItemSource for InMemoryItemSource {
    async fn fetch(&self, query: &ItemQuery) -> Result<Vec<ExerciseItem>, StorageError> {
        self.queries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .push(query.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("in-memory source set to fail".into()));
        }

        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let Some(pool) = guard.get(&query.topic) else {
            return Ok(Vec::new());
        };

        let mut candidates: Vec<ExerciseItem> = pool
            .values()
            .filter(|item| !query.is_excluded(item.id()) && query.admits(item))
            .cloned()
            .collect();

        if self.shuffle {
            let mut rng = rng();
            candidates.as_mut_slice().shuffle(&mut rng);
        }
        candidates.truncate(query.count);
        Ok(candidates)
    }
}

#[async_trait]
impl TopicCatalog for InMemoryItemSource {
    async fn topics(&self) -> Result<Vec<TopicInfo>, StorageError> {
        let guard = self
            .topics
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().filter(|info| info.is_online()).cloned().collect())
    }

    async fn topic(&self, topic: &Topic) -> Result<TopicInfo, StorageError> {
        let guard = self
            .topics
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(topic).cloned().ok_or(StorageError::NotFound)
    }

    async fn exemplars(&self) -> Result<Vec<Exemplar>, StorageError> {
        let guard = self
            .exemplars
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

/// Item source and catalog behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub items: Arc<dyn ItemSource>,
    pub catalog: Arc<dyn TopicCatalog>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_source(InMemoryItemSource::new())
    }

    /// Share one backend between the item and catalog handles.
    #[must_use]
    pub fn from_source<S>(source: S) -> Self
    where
        S: ItemSource + TopicCatalog + 'static,
    {
        let source = Arc::new(source);
        let items: Arc<dyn ItemSource> = source.clone();
        let catalog: Arc<dyn TopicCatalog> = source;
        Self { items, catalog }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic() -> Topic {
        Topic::new("Nouns", "Cases")
    }

    fn item(id: u64, case: &str) -> ExerciseItem {
        ExerciseItem::new(
            ItemId::new(id),
            PromptFragments::new("Ég sé", "."),
            "I see it.",
            format!("answer{id}"),
            "base",
        )
        .unwrap()
        .with_grammar(GrammarTags::new(case, "Singular", "Indefinite"))
    }

    fn query(count: usize) -> ItemQuery {
        ItemQuery {
            topic: topic(),
            filters: Some(FilterCriteria::default()),
            exclude_mastered: BTreeSet::new(),
            exclude_retry: BTreeSet::new(),
            count,
        }
    }

    #[tokio::test]
    async fn fetch_honors_exclusions_filters_and_count() {
        let source = InMemoryItemSource::new();
        for id in 1..=5 {
            source.upsert_item(&topic(), item(id, "Accusative")).unwrap();
        }
        source.upsert_item(&topic(), item(6, "Dative")).unwrap();

        let mut q = query(3);
        q.exclude_mastered.insert(ItemId::new(1));
        q.exclude_retry.insert(ItemId::new(2));
        let got = source.fetch(&q).await.unwrap();
        let ids: Vec<u64> = got.iter().map(|i| i.id().value()).collect();
        assert_eq!(ids, vec![3, 4, 5]);

        let rest = source.fetch(&query(10)).await.unwrap();
        assert_eq!(rest.len(), 5, "Dative item is filtered out");
        assert_eq!(source.queries().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failing_source_reports_unavailable() {
        let source = InMemoryItemSource::new();
        source.set_failing(true);
        let err = source.fetch(&query(6)).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }

    #[tokio::test]
    async fn catalog_lists_online_topics_and_exemplars() {
        let source = InMemoryItemSource::new();
        source
            .upsert_topic(TopicInfo::online(topic()).with_further_reading("<p>Föll</p>"))
            .unwrap();
        let mut draft = TopicInfo::online(Topic::new("Verbs", "Supine"));
        draft.status = drill_core::model::TopicStatus::Offline;
        source.upsert_topic(draft).unwrap();
        source
            .upsert_exemplar(Exemplar::new(ExemplarId::new(7), "hestur").marked_default())
            .unwrap();
        source
            .upsert_exemplar(Exemplar::new(ExemplarId::new(2), "saga"))
            .unwrap();

        let topics = source.topics().await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(topics[0].further_reading.as_deref(), Some("<p>Föll</p>"));

        let supine = source.topic(&Topic::new("Verbs", "Supine")).await.unwrap();
        assert!(!supine.is_online());
        let missing = source.topic(&Topic::new("Verbs", "Mood")).await.unwrap_err();
        assert!(matches!(missing, StorageError::NotFound));

        let ids: Vec<u64> = source
            .exemplars()
            .await
            .unwrap()
            .iter()
            .map(|e| e.id.value())
            .collect();
        assert_eq!(ids, vec![2, 7]);
    }

    #[test]
    fn blank_stored_answer_is_rejected_as_invalid_data() {
        let mut record = ItemRecord::from_item(&topic(), &item(3, "Dative"));
        record.accepted_answer = "   ".into();
        let err = StorageError::from(record.into_item().unwrap_err());
        assert!(matches!(
            err,
            StorageError::Invalid(drill_core::Error::Item(_))
        ));
    }

    #[test]
    fn record_round_trips_item_and_keeps_untagged_items_untagged() {
        let tagged = item(9, "Genitive");
        let back = ItemRecord::from_item(&topic(), &tagged).into_item().unwrap();
        assert_eq!(back, tagged);

        let plain = ExerciseItem::new(
            ItemId::new(10),
            PromptFragments::new("Hún er", "."),
            "She is tall.",
            "há",
            "hár",
        )
        .unwrap();
        let back = ItemRecord::from_item(&topic(), &plain).into_item().unwrap();
        assert!(back.grammar().is_none());
    }
}
