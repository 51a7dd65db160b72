use std::sync::Arc;

use drill_core::model::catalog::sort_exemplars;
use drill_core::model::{Exemplar, FilterCriteria, Topic, TopicInfo};
use storage::repository::{ItemSource, Storage, StorageError, TopicCatalog};

use crate::config::DrillConfig;
use crate::error::ServicesError;
use crate::notifier::{CompletionNotifier, HttpCompletionNotifier, NotificationDispatcher};
use crate::sessions::SessionController;
use crate::Clock;

/// Assembles storage and the notifier, lists topics, and hands out session controllers.
#[derive(Clone)]
pub struct DrillServices {
    items: Arc<dyn ItemSource>,
    catalog: Arc<dyn TopicCatalog>,
    notifier: Option<Arc<dyn CompletionNotifier>>,
}

impl DrillServices {
    /// Build services backed by `SQLite` storage, notifying over HTTP when configured.
    ///
    /// # Errors
    ///
    /// Returns `ServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: &DrillConfig, clock: Clock) -> Result<Self, ServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        let notifier = config.notifier.clone().map(|notifier_config| {
            let http = HttpCompletionNotifier::new(Some(notifier_config)).with_clock(clock);
            Arc::new(http) as Arc<dyn CompletionNotifier>
        });
        Ok(Self::from_parts(storage, notifier))
    }

    /// Services over an empty in-memory source without notifications.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_parts(Storage::in_memory(), None)
    }

    #[must_use]
    pub fn from_parts(storage: Storage, notifier: Option<Arc<dyn CompletionNotifier>>) -> Self {
        Self {
            items: storage.items,
            catalog: storage.catalog,
            notifier,
        }
    }

    #[must_use]
    pub fn items(&self) -> Arc<dyn ItemSource> {
        Arc::clone(&self.items)
    }

    /// Online topics to offer, ordered by category then subcategory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    pub async fn topics(&self) -> Result<Vec<TopicInfo>, StorageError> {
        self.catalog.topics().await
    }

    /// Catalog entry for `topic`, e.g. for its further-reading text.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown topics.
    pub async fn topic_info(&self, topic: &Topic) -> Result<TopicInfo, StorageError> {
        self.catalog.topic(topic).await
    }

    /// Exemplars in picker order: grouped by gender, defaults first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    pub async fn exemplars(&self) -> Result<Vec<Exemplar>, StorageError> {
        let mut exemplars = self.catalog.exemplars().await?;
        sort_exemplars(&mut exemplars);
        Ok(exemplars)
    }

    /// A controller for `topic` with default filters; call `refill` to load it.
    #[must_use]
    pub fn session_controller(&self, topic: Topic) -> SessionController {
        SessionController::new(topic, self.items(), self.dispatcher())
    }

    /// A controller for `topic` starting from `filters`, e.g. parsed with
    /// [`FilterCriteria::from_query`].
    #[must_use]
    pub fn session_controller_with_filters(
        &self,
        topic: Topic,
        filters: FilterCriteria,
    ) -> SessionController {
        self.session_controller(topic).with_filters(filters)
    }

    fn dispatcher(&self) -> NotificationDispatcher {
        match &self.notifier {
            Some(notifier) => NotificationDispatcher::new(Arc::clone(notifier)),
            None => NotificationDispatcher::disabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::BatchPhase;

    #[tokio::test]
    async fn catalog_is_served_from_the_shared_backend() {
        use drill_core::model::{ExemplarId, TopicStatus};
        use storage::repository::InMemoryItemSource;

        let source = InMemoryItemSource::new();
        source
            .upsert_topic(TopicInfo::online(Topic::new("Nouns", "Cases")))
            .unwrap();
        let mut offline = TopicInfo::online(Topic::new("Nouns", "Gender"));
        offline.status = TopicStatus::Offline;
        source.upsert_topic(offline).unwrap();
        source
            .upsert_exemplar(Exemplar::new(ExemplarId::new(1), "saga").with_gender("Feminine"))
            .unwrap();
        source
            .upsert_exemplar(Exemplar::new(ExemplarId::new(5), "hestur").with_gender("Masculine"))
            .unwrap();
        let services = DrillServices::from_parts(Storage::from_source(source), None);

        let topics = services.topics().await.unwrap();
        assert_eq!(topics.len(), 1);
        assert!(topics[0].topic.is_filterable());
        let gender = services
            .topic_info(&Topic::new("Nouns", "Gender"))
            .await
            .unwrap();
        assert_eq!(gender.status, TopicStatus::Offline);

        let ids: Vec<u64> = services
            .exemplars()
            .await
            .unwrap()
            .iter()
            .map(|e| e.id.value())
            .collect();
        assert_eq!(ids, vec![5, 1], "masculine before feminine");
    }

    #[tokio::test]
    async fn in_memory_services_open_an_exhausted_session() {
        let services = DrillServices::in_memory();
        let mut controller = services.session_controller(Topic::new("Nouns", "Gender"));
        let outcome = controller.refill(Default::default()).await.unwrap();
        assert!(outcome.pool_exhausted);
        assert_eq!(controller.session().phase(), BatchPhase::Exhausted);
    }
}
