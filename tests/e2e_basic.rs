//! End-to-end tests for registration, the write path, and lookups.
//!
//! Each test drives `Indexer` against the in-memory store and cache.

use attrindex::{
    Document, Error, Indexer, MemoryCache, MemoryIndexStore, ObjectId, Predicate,
};
use pretty_assertions::assert_eq;

const PERSON: &str = "crm:person";

fn person(id: u64, city: &str, age: i64) -> Document {
    Document::new(PERSON, id)
        .with_property("city", city)
        .with_property("age", age)
}

async fn setup_people() -> Indexer<MemoryIndexStore, MemoryCache> {
    let indexer = Indexer::open_memory();
    indexer.register(PERSON, "city").unwrap();
    indexer.register(PERSON, "age").unwrap();

    for doc in [person(1, "NYC", 30), person(2, "NYC", 40), person(3, "LA", 30)] {
        indexer.on_object_saved(PERSON, &doc, true).await.unwrap();
    }
    indexer
}

async fn lookup_ids(
    indexer: &Indexer<MemoryIndexStore, MemoryCache>,
    predicates: Vec<Predicate>,
) -> Vec<ObjectId> {
    indexer.lookup(PERSON, predicates).unwrap().into_ids().await.unwrap()
}

// ============================================================================
// 1. Registration is idempotent
// ============================================================================

#[tokio::test]
async fn test_register_twice_is_one_registration() {
    let indexer = Indexer::open_memory();

    let first = indexer.register(PERSON, "name").unwrap();
    let second = indexer.register(PERSON, "name").unwrap();

    assert!(first.newly_added);
    assert!(!second.newly_added);
    assert_eq!(indexer.registry().columns(PERSON).len(), 1);
    assert_eq!(indexer.registry().subscription_count(), 1);
    assert!(indexer.is_registered(PERSON, "name"));
}

#[tokio::test]
async fn test_register_rejects_empty_identifiers() {
    let indexer = Indexer::open_memory();
    assert!(matches!(indexer.register("", "name"), Err(Error::Usage(_))));
    assert!(matches!(indexer.register(PERSON, ""), Err(Error::Usage(_))));
}

// ============================================================================
// 2. Save → lookup → delete
// ============================================================================

#[tokio::test]
async fn test_save_then_lookup_then_delete() {
    let indexer = setup_people().await;

    assert_eq!(
        lookup_ids(&indexer, vec![Predicate::new("city", "LA")]).await,
        vec![ObjectId::Int(3)]
    );

    let removed = indexer.on_object_deleted(PERSON, &ObjectId::Int(3)).await.unwrap();
    assert_eq!(removed, 2);
    assert!(lookup_ids(&indexer, vec![Predicate::new("city", "LA")]).await.is_empty());
    assert_eq!(indexer.row_count(PERSON).await.unwrap(), 4);
}

#[tokio::test]
async fn test_rows_for_object() {
    let indexer = setup_people().await;
    let rows = indexer.rows_for_object(PERSON, &ObjectId::Int(2)).await.unwrap();
    let rendered: Vec<String> = rows.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "age=40 in crm:person where id is 2".to_string(),
            "city=NYC in crm:person where id is 2".to_string(),
        ]
    );
}

// ============================================================================
// 3. Multi-predicate lookups intersect
// ============================================================================

#[tokio::test]
async fn test_two_predicates_intersect() {
    let indexer = setup_people().await;

    let ids = lookup_ids(
        &indexer,
        vec![Predicate::new("city", "NYC"), Predicate::new("age", 30)],
    )
    .await;
    assert_eq!(ids, vec![ObjectId::Int(1)]);

    // Order of predicates does not matter.
    let ids = lookup_ids(
        &indexer,
        vec![Predicate::new("age", 30), Predicate::new("city", "NYC")],
    )
    .await;
    assert_eq!(ids, vec![ObjectId::Int(1)]);
}

#[tokio::test]
async fn test_disjoint_predicates_are_empty() {
    let indexer = setup_people().await;
    let ids = lookup_ids(
        &indexer,
        vec![Predicate::new("city", "LA"), Predicate::new("age", 40)],
    )
    .await;
    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_tuple_predicates() {
    let indexer = setup_people().await;
    let ids = indexer
        .lookup(PERSON, [("city", "NYC")])
        .unwrap()
        .into_ids()
        .await
        .unwrap();
    assert_eq!(ids, vec![ObjectId::Int(1), ObjectId::Int(2)]);
}

// ============================================================================
// 4. Usage errors are raised eagerly
// ============================================================================

#[tokio::test]
async fn test_lookup_usage_errors() {
    let indexer = setup_people().await;

    let empty: Vec<Predicate> = Vec::new();
    assert!(matches!(indexer.lookup(PERSON, empty), Err(Error::Usage(_))));
    assert!(matches!(
        indexer.lookup(PERSON, [Predicate::new("name", "Ada")]),
        Err(Error::Usage(_))
    ));
    assert!(matches!(
        indexer.lookup(PERSON, [Predicate::new("city", "")]),
        Err(Error::Usage(_))
    ));
    assert!(matches!(
        indexer.lookup("", [Predicate::new("city", "NYC")]),
        Err(Error::Usage(_))
    ));
}

// ============================================================================
// 5. Nested column paths
// ============================================================================

#[tokio::test]
async fn test_nested_column() {
    let indexer = Indexer::open_memory();
    indexer.register(PERSON, "address__city").unwrap();

    let ada = Document::from_json(
        PERSON,
        "ada",
        serde_json::json!({"address": {"city": "London", "street": "St James's Sq"}}),
    );
    let grace = Document::from_json(PERSON, "grace", serde_json::json!({"address": "unknown"}));
    indexer.on_object_saved(PERSON, &ada, true).await.unwrap();
    indexer.on_object_saved(PERSON, &grace, true).await.unwrap();

    let ids = indexer
        .lookup(PERSON, [("address__city", "London")])
        .unwrap()
        .into_ids()
        .await
        .unwrap();
    assert_eq!(ids, vec![ObjectId::from("ada")]);
    assert_eq!(indexer.row_count(PERSON).await.unwrap(), 1);
}

// ============================================================================
// 6. Empty values remove the row
// ============================================================================

#[tokio::test]
async fn test_value_becoming_empty_removes_row() {
    let indexer = setup_people().await;

    let mut doc = person(1, "NYC", 30);
    doc.set("city", "");
    let summary = indexer.on_object_saved(PERSON, &doc, false).await.unwrap();

    assert_eq!(summary.removed, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(
        lookup_ids(&indexer, vec![Predicate::new("city", "NYC")]).await,
        vec![ObjectId::Int(2)]
    );
}

// ============================================================================
// 7. Backfill
// ============================================================================

#[tokio::test]
async fn test_backfill_indexes_exactly_existing_objects() {
    let indexer = Indexer::open_memory();
    let docs: Vec<Document> = (1..=10u64)
        .map(|i| Document::new(PERSON, i).with_property("name", format!("user{i}")))
        .chain([Document::new(PERSON, 11u64), Document::new(PERSON, 12u64).with_property("name", "")])
        .collect();

    let report = indexer.backfill(PERSON, "name", &docs).await.unwrap();
    assert_eq!(report.scanned, 12);
    assert_eq!(report.indexed, 10);
    assert_eq!(report.skipped, 2);
    assert_eq!(indexer.row_count(PERSON).await.unwrap(), 10);

    let again = indexer.backfill(PERSON, "name", &docs).await.unwrap();
    assert_eq!(again, report);
    assert_eq!(indexer.row_count(PERSON).await.unwrap(), 10);
    assert_eq!(indexer.store().dump().len(), 10);
}

#[tokio::test]
async fn test_register_alone_does_not_backfill() {
    let indexer = Indexer::open_memory();
    let existing = Document::new(PERSON, 1u64).with_property("name", "foo");

    indexer.register(PERSON, "name").unwrap();
    assert_eq!(indexer.row_count(PERSON).await.unwrap(), 0);

    let mut before = indexer.lookup(PERSON, [("name", "foo")]).unwrap();
    assert!(before.is_empty().await.unwrap());

    indexer.backfill(PERSON, "name", [&existing]).await.unwrap();
    assert_eq!(indexer.row_count(PERSON).await.unwrap(), 1);

    let after = indexer.lookup(PERSON, [("name", "foo")]).unwrap().into_ids().await.unwrap();
    assert_eq!(after, vec![ObjectId::Int(1)]);

    indexer.on_object_deleted(PERSON, &ObjectId::Int(1)).await.unwrap();
    assert_eq!(indexer.row_count(PERSON).await.unwrap(), 0);
    let gone = indexer.lookup(PERSON, [("name", "foo")]).unwrap().into_ids().await.unwrap();
    assert!(gone.is_empty());
}

// ============================================================================
// 8. Dropping a column
// ============================================================================

#[tokio::test]
async fn test_drop_column() {
    let indexer = setup_people().await;

    let values = indexer.drop_column(PERSON, "age").await.unwrap();
    assert_eq!(values, 2);
    assert!(!indexer.is_registered(PERSON, "age"));
    assert_eq!(indexer.row_count(PERSON).await.unwrap(), 3);
    assert!(matches!(indexer.lookup(PERSON, [("age", 30)]), Err(Error::Usage(_))));
}

// ============================================================================
// 9. Floats and integers index apart
// ============================================================================

#[tokio::test]
async fn test_float_and_int_values_do_not_match_each_other() {
    let indexer = Indexer::open_memory();
    indexer.register(PERSON, "score").unwrap();
    indexer
        .on_object_saved(PERSON, &Document::new(PERSON, 1u64).with_property("score", 30), true)
        .await
        .unwrap();
    indexer
        .on_object_saved(PERSON, &Document::new(PERSON, 2u64).with_property("score", 30.0), true)
        .await
        .unwrap();

    let ints = indexer.lookup(PERSON, [("score", 30)]).unwrap().into_ids().await.unwrap();
    let floats = indexer.lookup(PERSON, [("score", 30.0)]).unwrap().into_ids().await.unwrap();
    assert_eq!(ints, vec![ObjectId::Int(1)]);
    assert_eq!(floats, vec![ObjectId::Int(2)]);
}
