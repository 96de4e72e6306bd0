use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EgaError;
use crate::fetch::{DEFAULT_API_URL, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT, RetryPolicy};
use crate::mapping::{Delimiter, MappingOptions};
use crate::resolver::DEFAULT_RESOURCE_BASE_URL;

pub const DEFAULT_CONFIG_FILE: &str = "ega-meta.json";
pub const API_URL_ENV: &str = "EGA_API_URL";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub backoff_ms: Option<u64>,
    #[serde(default)]
    pub mapping: Option<MappingConfig>,
    #[serde(default)]
    pub daco_url: Option<String>,
    #[serde(default)]
    pub resources: Option<ResourcesConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub delimiter: Option<Delimiter>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub columns: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub api_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub mapping: MappingOptions,
    pub daco_url: Option<String>,
    pub resource_base_url: String,
    pub resource_version: Option<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            mapping: MappingOptions::default(),
            daco_url: None,
            resource_base_url: DEFAULT_RESOURCE_BASE_URL.to_string(),
            resource_version: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `ega-meta.json` in the working directory when it
    /// exists, then applies the `EGA_API_URL` override.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, EgaError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else if !config_path.exists() {
            return Err(EgaError::MissingConfig(config_path));
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| EgaError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| EgaError::ConfigParse(err.to_string()))?
        };

        let mut resolved = Self::resolve_config(config)?;
        if let Ok(api_url) = std::env::var(API_URL_ENV) {
            if !api_url.trim().is_empty() {
                resolved.api_url = api_url.trim().to_string();
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, EgaError> {
        let max_attempts = config.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(EgaError::ConfigParse(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        let timeout = match config.timeout_secs {
            Some(0) => {
                return Err(EgaError::ConfigParse(
                    "timeout_secs must be at least 1".to_string(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };
        let backoff = config
            .backoff_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BACKOFF);

        let mapping = config.mapping.unwrap_or_default();
        let resources = config.resources.unwrap_or_default();

        Ok(ResolvedConfig {
            api_url: config
                .api_url
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout,
            retry: RetryPolicy {
                max_attempts,
                backoff,
            },
            mapping: MappingOptions {
                delimiter: mapping.delimiter.unwrap_or_default(),
                strict: mapping.strict.unwrap_or(true),
                columns: mapping.columns,
            },
            daco_url: config.daco_url,
            resource_base_url: resources
                .base_url
                .unwrap_or_else(|| DEFAULT_RESOURCE_BASE_URL.to_string()),
            resource_version: resources.version,
        })
    }
}
