use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::domain::FilterType;
use crate::error::EgaError;

/// An approved DACO user. Several accounts may share one OpenID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub openid: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

pub trait DacoClient: Send + Sync {
    /// Every approved user.
    fn users(&self) -> Result<Vec<User>, EgaError>;

    /// Approved users matching `value`; fails with `NotFound` when none do.
    fn filtered_users(&self, filter: FilterType, value: &str) -> Result<Vec<User>, EgaError>;

    fn user(&self, openid: &str) -> Result<Vec<User>, EgaError> {
        self.filtered_users(FilterType::OpenId, openid)
    }

    fn has_access(&self, id: &str, filter: FilterType) -> Result<bool, EgaError> {
        match self.filtered_users(filter, id) {
            Ok(users) => Ok(!users.is_empty()),
            Err(EgaError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

#[derive(Clone)]
pub struct DacoHttpClient {
    client: Client,
    base_url: String,
}

impl DacoHttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EgaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ega-meta/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EgaError::DacoHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| EgaError::DacoHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn all_url(&self) -> String {
        format!("{}/search/all", self.base_url)
    }

    fn search_url(&self) -> String {
        format!("{}/search/one", self.base_url)
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, EgaError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match make_req().send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && (err.is_timeout() || err.is_connect()) {
                        thread::sleep(Duration::from_millis(BASE_DELAY_MS * (attempt as u64 + 1)));
                        attempt += 1;
                        continue;
                    }
                    return Err(EgaError::DacoHttp(err.to_string()));
                }
            }
        }
    }

    fn read_users(
        response: reqwest::blocking::Response,
        lookup: &str,
    ) -> Result<Vec<User>, EgaError> {
        let status = response.status().as_u16();
        if status == 404 {
            return Err(EgaError::NotFound(lookup.to_string()));
        }
        if !response.status().is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "DACO request failed".to_string());
            return Err(EgaError::DacoStatus { status, message });
        }
        response
            .json()
            .map_err(|err| EgaError::DacoHttp(err.to_string()))
    }
}

impl DacoClient for DacoHttpClient {
    fn users(&self) -> Result<Vec<User>, EgaError> {
        let url = self.all_url();
        let response = self.send_with_retries(|| self.client.get(&url))?;
        Self::read_users(response, "approved users")
    }

    fn filtered_users(&self, filter: FilterType, value: &str) -> Result<Vec<User>, EgaError> {
        let url = self.search_url();
        let lookup = format!("{filter}={value}");
        let response =
            self.send_with_retries(|| self.client.get(&url).query(&[(filter.as_str(), value)]))?;
        let users = Self::read_users(response, &lookup)?;
        if users.is_empty() {
            return Err(EgaError::NotFound(lookup));
        }
        Ok(users)
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}
