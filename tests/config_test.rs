//! Tests for configuration loading

use sitewatch::config::Config;
use sitewatch::entities::{DictionaryTagger, EntityReference};
use sitewatch::scheduler::load_sites;
use std::path::{Path, PathBuf};

#[test]
fn test_example_config_is_valid() {
    let config = Config::load(Some(Path::new("sitewatch.example.toml")))
        .expect("example config should load");

    assert_eq!(config.monitor.check_interval_minutes, 30);
    assert_eq!(config.reports.output_dir, PathBuf::from("reports"));
    assert!(config.reports.weekly_enabled);
    assert_eq!(config.server.port, 8000);
}

#[test]
fn test_explicit_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(format!("{err:#}").contains("absent.toml"));
}

#[test]
fn test_invalid_toml_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[monitor\ncheck_interval_minutes = ").unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_invalid_values_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zero.toml");
    std::fs::write(&path, "[monitor]\ncheck_interval_minutes = 0\n").unwrap();

    assert!(Config::load(Some(&path)).is_err());
}

#[test]
fn test_example_reference_data_loads() {
    let reference = EntityReference::from_file(Path::new("data/fed_entities.example.json"))
        .expect("example reference data should parse");
    assert_eq!(reference.people.len(), 2);

    let tagger = DictionaryTagger::new(&reference);
    assert!(tagger.pattern_count() > reference.len());
}

#[test]
fn test_example_sites_load() {
    let sites = load_sites(Path::new("data/tracked_sites.example.json")).unwrap();
    assert_eq!(sites.len(), 4);
}
