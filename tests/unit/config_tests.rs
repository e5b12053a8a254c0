// Configuration loading tests

use kura::config::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_from_file_loads_and_validates() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
maximum_prune_attempts: 10
storages:
  - name: thumbnails
    backend: memory
caches:
  - storage: thumbnails
    maximum_size: 2048
"#
    )
    .unwrap();

    let config = KuraConfig::from_file(file.path()).unwrap();
    assert_eq!(config.maximum_prune_attempts, 10);
    assert_eq!(config.caches[0].maximum_size, 2048);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_file_reports_missing_file() {
    let err = KuraConfig::from_file("/nonexistent/kura.yaml").unwrap_err();
    assert!(err.contains("Failed to read config file"));
}

#[test]
fn test_rejects_unknown_backend() {
    let yaml = r#"
storages:
  - name: thumbnails
    backend: s3
"#;
    assert!(KuraConfig::from_yaml_with_env(yaml).is_err());
}

#[test]
fn test_rejects_duplicate_cache_definitions() {
    let yaml = r#"
storages:
  - name: thumbnails
    backend: memory
caches:
  - storage: thumbnails
    maximum_size: 10
  - storage: thumbnails
    maximum_size: 20
"#;
    let config = KuraConfig::from_yaml_with_env(yaml).unwrap();
    assert!(config.validate().unwrap_err().contains("Duplicate cache"));
}

#[test]
fn test_config_round_trips_through_yaml() {
    let config = KuraConfig {
        storages: vec![StorageConfig {
            name: "scratch".to_string(),
            label: None,
            backend: StorageKind::Memory,
            path: None,
        }],
        ..Default::default()
    };
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert!(!yaml.contains("label"));

    let parsed = KuraConfig::from_yaml_with_env(&yaml).unwrap();
    assert_eq!(parsed.storages[0].name, "scratch");
    assert_eq!(parsed.lock.timeout_ms, config.lock.timeout_ms);
}
