use deployrisk::config::{load_config, write_default_config, DEFAULT_CONFIG_YAML};
use deployrisk::{Error, ModelType};
use indoc::indoc;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

fn write(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    fs::write(&path, yaml).unwrap();
    path
}

#[test]
fn test_minimal_config_fills_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        indoc! {"
            paths:
              data: d.csv
              model: m.bin
              predictions: p.csv
              metrics: m.json
              importance_plot: i.svg
            target: deploy_failed
            seed: 7
            test_size: 0.25
            model:
              type: alt-boosted-tree
        "},
    );
    let config = load_config(&path).unwrap();
    assert_eq!(config.model.kind, ModelType::AltBoostedTree);
    assert!(config.model.params.is_empty());
    assert_eq!(config.insights.n_repeats, 5);
    assert_eq!(config.insights.plot_top, 15);
}

#[test]
fn test_missing_required_key_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        indoc! {"
            paths:
              data: d.csv
              model: m.bin
              predictions: p.csv
              metrics: m.json
              importance_plot: i.svg
            seed: 7
            test_size: 0.25
            model:
              type: linear
        "},
    );
    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.to_string().contains("target"), "{err}");
}

#[test]
fn test_out_of_range_test_size_names_key() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, &DEFAULT_CONFIG_YAML.replace("test_size: 0.2", "test_size: 1.5"));
    match load_config(&path).unwrap_err() {
        Error::Configuration { key, .. } => assert_eq!(key.as_deref(), Some("test_size")),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = load_config(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, Error::ArtifactNotFound { .. }));
}

#[test]
fn test_default_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("configs").join("config.yaml");
    write_default_config(&path, false).unwrap();
    assert!(write_default_config(&path, false).is_err());
    let config = load_config(&path).unwrap();
    assert_eq!(config.model.kind, ModelType::BoostedTree);
    assert_eq!(config.seed, 42);
}
