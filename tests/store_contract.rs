use std::fs;

use epigram_core::model::{Category, CategoryId, ItemId};
use epigram_core::store::{EpigramStore, SCHEMA_VERSION};
use epigram_core::types::{EpigramError, ImpressionId, NotFoundError, StoreError, ValidationError};
use tempfile::tempdir;

fn open_store() -> EpigramStore {
    EpigramStore::open_in_memory().unwrap()
}

#[test]
fn put_category_is_idempotent_by_name() {
    let store = open_store();

    let first = store.put_category("fishes", 3).unwrap();
    let second = store.put_category("fishes", 7).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.weight, 3, "existing category must be returned unchanged");
    assert_eq!(store.list_categories().unwrap().len(), 1);
}

#[test]
fn put_category_rejects_bad_input() {
    let store = open_store();

    assert!(matches!(
        store.put_category("fishes", 0),
        Err(EpigramError::Validation(ValidationError::NonPositiveWeight(0)))
    ));
    assert!(matches!(
        store.put_category("  ", 1),
        Err(EpigramError::Validation(ValidationError::EmptyCategoryName))
    ));
    assert!(store.list_categories().unwrap().is_empty());
}

#[test]
fn list_categories_is_ordered_by_name() {
    let store = open_store();
    for name in ["zeta", "alpha", "mid"] {
        store.put_category(name, 1).unwrap();
    }

    let names: Vec<String> = store.list_categories().unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn put_item_always_creates_a_fresh_identity() {
    let store = open_store();
    let fishes = store.put_category("fishes", 1).unwrap();

    let a = store.put_item("redfish", &fishes).unwrap();
    let b = store.put_item("redfish", &fishes).unwrap();

    assert_ne!(a.id, b.id);
    assert!(!a.id.is_nil());
    assert_eq!(a.category_id, fishes.id);
    assert_eq!(a.last_shown_at, None);
    assert_eq!(store.items_in_category("fishes").unwrap().len(), 2);
    assert_eq!(store.get_item(a.id).unwrap(), Some(a));
}

#[test]
fn put_item_rejects_empty_content() {
    let store = open_store();
    let fishes = store.put_category("fishes", 1).unwrap();

    for content in ["", "   \n\t"] {
        assert!(matches!(
            store.put_item(content, &fishes),
            Err(EpigramError::Validation(ValidationError::EmptyContent))
        ));
    }
    assert!(store.items_in_category("fishes").unwrap().is_empty());
}

#[test]
fn put_item_rejects_unknown_category() {
    let store = open_store();
    let ghost = Category {
        id: CategoryId::new(999),
        name: "ghost".to_string(),
        weight: 1,
    };

    let result = store.put_item("boo", &ghost);
    assert!(matches!(
        result,
        Err(EpigramError::NotFound(NotFoundError::Category(ref name))) if name == "ghost"
    ));
}

#[test]
fn update_category_weight_contract() {
    let store = open_store();
    store.put_category("fishes", 1).unwrap();

    store.update_category_weight("fishes", 5).unwrap();
    assert_eq!(store.get_category("fishes").unwrap().unwrap().weight, 5);

    assert!(matches!(
        store.update_category_weight("ghost", 2),
        Err(EpigramError::NotFound(NotFoundError::Category(_)))
    ));
    for weight in [0, -3] {
        assert!(matches!(
            store.update_category_weight("fishes", weight),
            Err(EpigramError::Validation(ValidationError::NonPositiveWeight(w))) if w == weight
        ));
    }
    assert_eq!(store.get_category("fishes").unwrap().unwrap().weight, 5);
}

#[test]
fn oversized_weight_is_rejected_as_too_large() {
    let store = open_store();
    store.put_category("fishes", 1).unwrap();

    let result = store.update_category_weight("fishes", 5_000_000_000);
    assert!(matches!(
        result,
        Err(EpigramError::Validation(ValidationError::WeightTooLarge(5_000_000_000)))
    ));
    assert!(result.unwrap_err().to_string().contains("must not exceed"));

    assert!(matches!(
        store.put_category("meta", i64::from(u32::MAX) + 1),
        Err(EpigramError::Validation(ValidationError::WeightTooLarge(_)))
    ));
    let max = store.put_category("meta", i64::from(u32::MAX)).unwrap();
    assert_eq!(max.weight, u32::MAX);
}

#[test]
fn bootstrap_indexes_last_shown_at() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fim.db");
    drop(EpigramStore::open(&path).unwrap());

    let conn = rusqlite::Connection::open(&path).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_index_info(?1)")
        .unwrap();
    let columns: Vec<String> = stmt
        .query_map(["idx_item_shown"], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(columns, vec!["last_shown_at".to_string()]);
}

#[test]
fn record_impression_stamps_item_and_counts() {
    let store = open_store();
    let item = store.insert("redfish", "fishes").unwrap();
    store.insert("meta", "meta").unwrap();

    let impression = store.record_impression(item.id).unwrap();

    assert_eq!(impression.item_id, item.id);
    assert_eq!(impression.category_id, item.category_id);
    assert!(!impression.saved);
    assert_eq!(impression.annotation, None);

    let stored = store.get_item(item.id).unwrap().unwrap();
    assert_eq!(stored.last_shown_at, Some(impression.shown_at));

    assert_eq!(store.count_impressions(None).unwrap(), 1);
    assert_eq!(store.count_impressions(Some("fishes")).unwrap(), 1);
    assert_eq!(store.count_impressions(Some("meta")).unwrap(), 0);
    assert_eq!(store.count_impressions(Some("ghost")).unwrap(), 0);
}

#[test]
fn record_impression_unknown_item_is_not_found() {
    let store = open_store();
    let id = ItemId::generate();

    assert!(matches!(
        store.record_impression(id),
        Err(EpigramError::NotFound(NotFoundError::Item(missing))) if missing == id
    ));
    assert_eq!(store.count_impressions(None).unwrap(), 0);
}

#[test]
fn shown_markers_strictly_increase() {
    let store = open_store();
    let item = store.insert("redfish", "fishes").unwrap();

    let first = store.record_impression(item.id).unwrap();
    let second = store.record_impression(item.id).unwrap();

    assert!(second.shown_at > first.shown_at);
    assert!(second.id > first.id);
    assert_eq!(store.last_impression().unwrap(), Some(second));
}

#[test]
fn recategorize_keeps_historical_impressions() {
    let store = open_store();
    let item = store.insert("redfish", "fishes").unwrap();
    let meta = store.put_category("meta", 1).unwrap();
    let original = store.record_impression(item.id).unwrap();

    let moved = store.recategorize_item(item.id, "meta").unwrap();

    assert_eq!(moved.category_id, meta.id);
    assert_eq!(moved.last_shown_at, Some(original.shown_at));
    assert_eq!(store.count_impressions(Some("fishes")).unwrap(), 1);
    assert_eq!(store.count_impressions(Some("meta")).unwrap(), 0);
    assert_eq!(
        store.get_impression(original.id).unwrap().unwrap().category_id,
        item.category_id
    );

    assert!(matches!(
        store.recategorize_item(item.id, "ghost"),
        Err(EpigramError::NotFound(NotFoundError::Category(_)))
    ));
    assert!(matches!(
        store.recategorize_item(ItemId::generate(), "meta"),
        Err(EpigramError::NotFound(NotFoundError::Item(_)))
    ));
}

#[test]
fn save_and_annotate_impression() {
    let store = open_store();
    let item = store.insert("redfish", "fishes").unwrap();
    let impression = store.record_impression(item.id).unwrap();

    let saved = store.mark_saved(impression.id).unwrap();
    assert!(saved.saved);

    let annotated = store.annotate_impression(impression.id, "a children's book").unwrap();
    assert!(annotated.saved);
    assert_eq!(annotated.annotation.as_deref(), Some("a children's book"));
    assert_eq!(annotated.shown_at, impression.shown_at);

    let missing = ImpressionId::new(4242);
    assert!(matches!(
        store.mark_saved(missing),
        Err(EpigramError::NotFound(NotFoundError::Impression(id))) if id == missing
    ));
    assert!(matches!(
        store.annotate_impression(missing, "x"),
        Err(EpigramError::NotFound(NotFoundError::Impression(_)))
    ));
}

#[test]
fn last_impression_is_none_on_fresh_store() {
    let store = open_store();
    assert_eq!(store.last_impression().unwrap(), None);
}

#[test]
fn reopen_is_idempotent_and_durable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("fim").join("fim.db");

    let item = {
        let store = EpigramStore::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        let item = store.insert("redfish", "fishes").unwrap();
        store.record_impression(item.id).unwrap();
        item
    };

    for _ in 0..2 {
        let store = EpigramStore::open(&path).unwrap();
        assert_eq!(store.list_categories().unwrap().len(), 1);
        assert_eq!(store.count_impressions(None).unwrap(), 1);
        assert!(store.get_item(item.id).unwrap().unwrap().last_shown_at.is_some());
    }
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("future.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 99").unwrap();
    }

    let result = EpigramStore::open(&path);
    assert!(matches!(
        result,
        Err(EpigramError::Store(StoreError::UnsupportedSchema { found: 99, supported })) if supported == SCHEMA_VERSION
    ));
}

#[test]
fn garbage_file_is_a_store_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.db");
    fs::write(&path, "this is certainly not a database file ".repeat(200)).unwrap();

    assert!(matches!(EpigramStore::open(&path), Err(EpigramError::Store(_))));
}
