use std::io::Cursor;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::EgaError;

pub const DEFAULT_RESOURCE_BASE_URL: &str = "https://artifacts.oicr.on.ca/artifactory";
pub const RESOURCE_PREFIX: &str = "org/icgc/dcc/resources/";

/// Reads JSON resources (dictionaries, code lists) out of a versioned
/// `dcc-resources` jar.
#[derive(Clone)]
pub struct ResourceResolver {
    client: Client,
    base_url: String,
    default_version: Option<String>,
}

impl ResourceResolver {
    pub fn new(
        base_url: impl Into<String>,
        default_version: Option<String>,
    ) -> Result<Self, EgaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ega-meta/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EgaError::ResourceHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| EgaError::ResourceHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_version,
        })
    }

    pub fn package_url(&self, version: &str) -> String {
        format!(
            "{base}/simple/dcc-dependencies/org/icgc/dcc/dcc-resources/{version}/dcc-resources-{version}.jar",
            base = self.base_url
        )
    }

    pub fn resolve<T: DeserializeOwned>(
        &self,
        file_name: &str,
        version: Option<&str>,
    ) -> Result<T, EgaError> {
        let version = version
            .or(self.default_version.as_deref())
            .ok_or(EgaError::MissingResourceVersion)?;
        let url = self.package_url(version);
        tracing::debug!(url = %url, resource = file_name, "resolving resource");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| EgaError::ResourceHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "resource request failed".to_string());
            return Err(EgaError::ResourceStatus { status, message });
        }
        let package = response
            .bytes()
            .map_err(|err| EgaError::ResourceHttp(err.to_string()))?;

        read_resource(&package, file_name)
    }
}

/// Deserializes `org/icgc/dcc/resources/{file_name}` from a resources jar.
pub fn read_resource<T: DeserializeOwned>(package: &[u8], file_name: &str) -> Result<T, EgaError> {
    let parse_error = |message: String| EgaError::ResourceParse {
        name: file_name.to_string(),
        message,
    };

    let mut archive =
        ZipArchive::new(Cursor::new(package)).map_err(|err| parse_error(err.to_string()))?;
    let entry_name = format!("{RESOURCE_PREFIX}{file_name}");
    let entry = match archive.by_name(&entry_name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Err(EgaError::NotFound(entry_name)),
        Err(err) => return Err(parse_error(err.to_string())),
    };

    serde_json::from_reader(entry).map_err(|err| parse_error(err.to_string()))
}
