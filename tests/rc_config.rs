use std::fs;

use epigram_core::config::{ConfigError, RcFile, SelectionConfig};
use epigram_core::store::EpigramStore;
use tempfile::tempdir;

const FULL_RC: &str = r#"
[main]
openai_token = "sk-test"

[buckets]
fishes = 3
meta = 1

[selection]
content_length_cap = 120
internal_fetch_ratio = 0.25
"#;

fn seeded_store() -> EpigramStore {
    let store = EpigramStore::open_in_memory().unwrap();
    store.insert("redfish", "fishes").unwrap();
    store.insert("the medium is the message", "meta").unwrap();
    store
}

#[test]
fn parses_every_section() {
    let rc = RcFile::from_toml_str(FULL_RC).unwrap();

    assert_eq!(rc.main.openai_token.as_deref(), Some("sk-test"));
    assert_eq!(rc.buckets.get("fishes"), Some(&3));
    assert_eq!(rc.buckets.get("meta"), Some(&1));
    assert_eq!(
        rc.selection,
        SelectionConfig {
            content_length_cap: 120,
            internal_fetch_ratio: 0.25
        }
    );
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let rc = RcFile::from_toml_str("").unwrap();

    assert_eq!(rc.main.openai_token, None);
    assert!(rc.buckets.is_empty());
    assert_eq!(rc.selection, SelectionConfig::v0());
    assert_eq!(rc.selection.content_length_cap, 300);
    assert!((rc.selection.internal_fetch_ratio - 0.1).abs() < f64::EPSILON);
}

#[test]
fn rejects_out_of_range_selection_settings() {
    let zero_ratio = "[selection]\ninternal_fetch_ratio = 0.0\n";
    assert!(matches!(RcFile::from_toml_str(zero_ratio), Err(ConfigError::Invalid(_))));

    let zero_cap = "[selection]\ncontent_length_cap = 0\n";
    assert!(matches!(RcFile::from_toml_str(zero_cap), Err(ConfigError::Invalid(_))));
}

#[test]
fn rejects_malformed_toml() {
    assert!(matches!(
        RcFile::from_toml_str("[buckets\nfishes = 3"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn apply_weights_updates_known_and_reports_the_rest() {
    let store = seeded_store();
    let rc = RcFile::from_toml_str("[buckets]\nfishes = 3\nghost = 2\nmeta = 0\n").unwrap();

    let applied = rc.apply_weights(&store);

    assert_eq!(applied.updated, vec!["fishes".to_string()]);
    let skipped: Vec<&str> = applied.skipped.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(skipped, vec!["ghost", "meta"]);

    assert_eq!(store.get_category("fishes").unwrap().unwrap().weight, 3);
    assert_eq!(store.get_category("meta").unwrap().unwrap().weight, 1);
    assert!(store.get_category("ghost").unwrap().is_none());
}

#[test]
fn rendered_rc_file_round_trips() {
    let store = seeded_store();
    store.update_category_weight("fishes", 3).unwrap();

    let rc = RcFile::from_store(&store, Some("sk-test".to_string())).unwrap();
    let text = rc.render().unwrap();

    assert!(text.contains("[buckets]"));
    assert!(text.contains("fishes = 3"));
    assert!(text.contains("meta = 1"));
    assert!(text.find("fishes = 3").unwrap() < text.find("meta = 1").unwrap());

    let parsed = RcFile::from_toml_str(&text).unwrap();
    assert_eq!(parsed, rc);
}

#[test]
fn load_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(".fimrc");
    fs::write(&path, FULL_RC).unwrap();

    let rc = RcFile::load(&path).unwrap();
    assert_eq!(rc.buckets.len(), 2);

    assert!(matches!(
        RcFile::load(dir.path().join("missing")),
        Err(ConfigError::Io { .. })
    ));
}
