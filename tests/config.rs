use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;
use tempfile::tempdir;

use ega_metadata::config::{Config, ConfigLoader, MappingConfig, ResourcesConfig};
use ega_metadata::error::EgaError;
use ega_metadata::fetch::{DEFAULT_API_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT};
use ega_metadata::mapping::Delimiter;

#[test]
fn empty_config_uses_defaults() {
    let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
    assert_eq!(resolved.api_url, DEFAULT_API_URL);
    assert_eq!(resolved.retry.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert_eq!(resolved.timeout, DEFAULT_TIMEOUT);
    assert!(resolved.mapping.strict);
    assert_eq!(resolved.mapping.delimiter, Delimiter::Auto);
    assert!(resolved.daco_url.is_none());
    assert!(resolved.resource_version.is_none());
}

#[test]
fn explicit_settings_are_applied() {
    let config = Config {
        api_url: Some("http://mirror.test/v2".to_string()),
        max_attempts: Some(3),
        timeout_secs: Some(10),
        backoff_ms: Some(0),
        mapping: Some(MappingConfig {
            delimiter: Some(Delimiter::Comma),
            strict: Some(false),
            columns: [("Run_File".to_string(), vec!["RUN".to_string(), "FILE".to_string()])]
                .into_iter()
                .collect(),
        }),
        daco_url: Some("http://daco.test".to_string()),
        resources: Some(ResourcesConfig {
            base_url: None,
            version: Some("0.11c".to_string()),
        }),
    };

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.api_url, "http://mirror.test/v2");
    assert_eq!(resolved.retry.max_attempts, 3);
    assert_eq!(resolved.retry.backoff, Duration::ZERO);
    assert_eq!(resolved.timeout, Duration::from_secs(10));
    assert!(!resolved.mapping.strict);
    assert_eq!(resolved.mapping.delimiter, Delimiter::Comma);
    assert_eq!(resolved.mapping.columns["Run_File"], ["RUN", "FILE"]);
    assert_eq!(resolved.daco_url.as_deref(), Some("http://daco.test"));
    assert_eq!(resolved.resource_version.as_deref(), Some("0.11c"));
}

#[test]
fn zero_attempts_is_rejected() {
    let config = Config {
        max_attempts: Some(0),
        ..Config::default()
    };
    let err = ConfigLoader::resolve_config(config).unwrap_err();
    assert_matches!(err, EgaError::ConfigParse(_));
}

#[test]
fn loads_json_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ega-meta.json");
    fs::write(
        &path,
        r#"{ "max_attempts": 5, "mapping": { "delimiter": "tab" } }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.retry.max_attempts, 5);
    assert_eq!(resolved.mapping.delimiter, Delimiter::Tab);
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, EgaError::MissingConfig(_));
}

#[test]
fn invalid_json_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ega-meta.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, EgaError::ConfigParse(_));
}
