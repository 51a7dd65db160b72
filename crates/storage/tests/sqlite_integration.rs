use std::collections::BTreeSet;

use drill_core::model::{
    Exemplar, ExemplarId, ExerciseItem, FilterCriteria, GrammarTags, ItemId, PromptFragments,
    Topic, TopicInfo, TopicStatus,
};
use storage::repository::{ItemQuery, ItemSource, StorageError, TopicCatalog};
use storage::sqlite::SqliteItemSource;

fn build_item(id: u64, case: &str, exemplar: Option<u64>) -> ExerciseItem {
    let mut tags = GrammarTags::new(case, "Singular", "Indefinite");
    if let Some(ex) = exemplar {
        tags = tags.with_exemplar(ExemplarId::new(ex));
    }
    ExerciseItem::new(
        ItemId::new(id),
        PromptFragments::new("Ég sé", "í dag."),
        "I see it today.",
        format!("orð{id}"),
        "orð",
    )
    .unwrap()
    .with_grammar(tags)
}

fn query(topic: &Topic, filters: Option<FilterCriteria>, count: usize) -> ItemQuery {
    ItemQuery {
        topic: topic.clone(),
        filters,
        exclude_mastered: BTreeSet::new(),
        exclude_retry: BTreeSet::new(),
        count,
    }
}

async fn connect(name: &str) -> SqliteItemSource {
    let source = SqliteItemSource::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    source.migrate().await.expect("migrate");
    source
}

#[tokio::test]
async fn sqlite_fetch_respects_exclusions_and_count() {
    let source = connect("memdb_exclusions").await;
    let topic = Topic::new("Nouns", "Gender");
    for id in 1..=8 {
        let plain = ExerciseItem::new(
            ItemId::new(id),
            PromptFragments::new("Þetta er", "."),
            "This is a word.",
            format!("orð{id}"),
            "orð",
        )
        .unwrap();
        source.upsert_item(&topic, &plain).await.unwrap();
    }

    let mut q = query(&topic, None, 6);
    q.exclude_mastered = (1..=3).map(ItemId::new).collect();
    q.exclude_retry = BTreeSet::from([ItemId::new(4)]);

    let got = source.fetch(&q).await.unwrap();
    assert_eq!(got.len(), 4, "only ids 5..=8 remain");
    let ids: BTreeSet<u64> = got.iter().map(|i| i.id().value()).collect();
    assert_eq!(ids, (5..=8).collect());
    assert!(got.iter().all(|i| i.grammar().is_none()));
}

#[tokio::test]
async fn sqlite_fetch_applies_grammar_filters() {
    let source = connect("memdb_filters").await;
    let topic = Topic::new("Nouns", "Cases");
    source.upsert_item(&topic, &build_item(1, "Accusative", Some(5))).await.unwrap();
    source.upsert_item(&topic, &build_item(2, "Accusative", Some(99))).await.unwrap();
    source.upsert_item(&topic, &build_item(3, "Dative", None)).await.unwrap();
    source.upsert_item(&topic, &build_item(4, "Accusative", None)).await.unwrap();

    let got = source
        .fetch(&query(&topic, Some(FilterCriteria::default()), 6))
        .await
        .unwrap();
    let ids: BTreeSet<u64> = got.iter().map(|i| i.id().value()).collect();
    assert_eq!(ids, BTreeSet::from([1, 4]));

    let first = got.iter().find(|i| i.id() == ItemId::new(1)).unwrap();
    assert_eq!(first, &build_item(1, "Accusative", Some(5)));
}

#[tokio::test]
async fn sqlite_upsert_replaces_existing_row() {
    let source = connect("memdb_upsert").await;
    let topic = Topic::new("Nouns", "Cases");
    source.upsert_item(&topic, &build_item(1, "Dative", None)).await.unwrap();
    source.upsert_item(&topic, &build_item(1, "Accusative", None)).await.unwrap();

    let got = source
        .fetch(&query(&topic, Some(FilterCriteria::default()), 6))
        .await
        .unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(
        got[0].grammar().and_then(|g| g.case.as_deref()),
        Some("Accusative")
    );
}

#[tokio::test]
async fn sqlite_fetch_of_unknown_topic_is_empty() {
    let source = connect("memdb_unknown_topic").await;
    let got = source
        .fetch(&query(&Topic::new("Verbs", "Supine"), None, 6))
        .await
        .unwrap();
    assert!(got.is_empty());
}

#[tokio::test]
async fn sqlite_catalog_lists_online_topics_in_order() {
    let source = connect("memdb_catalog_topics").await;
    let cases = TopicInfo::online(Topic::new("Nouns", "Cases"))
        .with_difficulty("Intermediate")
        .with_further_reading("<h3>Föll</h3>");
    source.upsert_topic(&cases).await.unwrap();
    source
        .upsert_topic(&TopicInfo::online(Topic::new("Adjectives", "Comparison")))
        .await
        .unwrap();
    let mut hidden = TopicInfo::online(Topic::new("Verbs", "Supine"));
    hidden.status = TopicStatus::Offline;
    source.upsert_topic(&hidden).await.unwrap();

    let topics = source.topics().await.unwrap();
    let names: Vec<String> = topics.iter().map(|t| t.topic.to_string()).collect();
    assert_eq!(names, vec!["Adjectives / Comparison", "Nouns / Cases"]);
    assert_eq!(topics[1], cases);

    // Re-publishing an entry replaces it.
    source
        .upsert_topic(&TopicInfo::online(Topic::new("Verbs", "Supine")))
        .await
        .unwrap();
    assert_eq!(source.topics().await.unwrap().len(), 3);

    let err = source
        .topic(&Topic::new("Verbs", "Mood"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_catalog_lists_exemplars_by_id() {
    let source = connect("memdb_catalog_exemplars").await;
    source
        .upsert_exemplar(
            &Exemplar::new(ExemplarId::new(7), "hestur")
                .with_gender("Masculine")
                .with_declension("Strong")
                .marked_default(),
        )
        .await
        .unwrap();
    source
        .upsert_exemplar(&Exemplar::new(ExemplarId::new(3), "saga").with_gender("Feminine"))
        .await
        .unwrap();

    let exemplars = source.exemplars().await.unwrap();
    let ids: Vec<u64> = exemplars.iter().map(|e| e.id.value()).collect();
    assert_eq!(ids, vec![3, 7]);
    assert!(exemplars[1].is_default);
    assert_eq!(exemplars[1].declension.as_deref(), Some("Strong"));
    assert!(!exemplars[0].is_default);
}
