use std::io::Read;
use std::thread;
use std::time::Duration;

use flate2::read::MultiGzDecoder;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;

use crate::domain::DatasetId;
use crate::error::EgaError;

pub const DEFAULT_API_URL: &str = "http://ega.ebi.ac.uk/ega/rest/download/v2";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Io(String),

    #[error("{0}")]
    Fatal(String),
}

impl TransportError {
    /// Timeouts and I/O failures share one retry budget.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Fatal(_))
    }
}

pub type Body = Box<dyn Read + Send>;

pub trait Transport: Send + Sync {
    fn open(&self, url: &str) -> Result<Body, TransportError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// `timeout` bounds connecting and every read of the response body.
    pub fn new(timeout: Duration) -> Result<Self, EgaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ega-meta/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EgaError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|err| EgaError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Body, TransportError> {
        let response = self.client.get(url).send().map_err(classify_error)?;
        if !response.status().is_success() {
            return Err(TransportError::Io(format!(
                "server returned status {}",
                response.status().as_u16()
            )));
        }
        Ok(Box::new(response))
    }
}

fn classify_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_builder() {
        TransportError::Fatal(err.to_string())
    } else {
        TransportError::Io(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep before attempt `n + 1` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

#[derive(Debug)]
pub enum RetryError<E> {
    Exhausted { attempts: u32, last: E },
    Aborted { attempt: u32, error: E },
}

impl RetryPolicy {
    pub fn run<T, E, F, P>(&self, mut op: F, is_retryable: P) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1u32;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if !is_retryable(&error) => {
                    return Err(RetryError::Aborted { attempt, error });
                }
                Err(last) if attempt >= max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last,
                    });
                }
                Err(_) => {
                    if !self.backoff.is_zero() {
                        thread::sleep(self.backoff * attempt);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// An opened archive: the gzip-decoded tar stream and where it came from.
pub struct FetchedArchive {
    pub url: String,
    pub body: MultiGzDecoder<Body>,
}

#[derive(Clone)]
pub struct ArchiveFetcher<T: Transport> {
    transport: T,
    api_url: String,
    policy: RetryPolicy,
}

impl<T: Transport> ArchiveFetcher<T> {
    pub fn new(transport: T, api_url: impl Into<String>, policy: RetryPolicy) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            api_url,
            policy,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn archive_url(&self, dataset_id: &DatasetId) -> String {
        format!("{}/metadata/{}", self.api_url, dataset_id.as_str())
    }

    pub fn fetch(&self, dataset_id: &DatasetId) -> Result<FetchedArchive, EgaError> {
        let url = self.archive_url(dataset_id);
        let max_attempts = self.policy.max_attempts.max(1);

        let opened = self.policy.run(
            |attempt| {
                self.transport.open(&url).inspect_err(|err| match err {
                    TransportError::Timeout(_) => tracing::warn!(
                        attempt,
                        max_attempts,
                        dataset = %dataset_id,
                        "socket timeout while opening metadata tarball"
                    ),
                    TransportError::Io(detail) => tracing::warn!(
                        attempt,
                        max_attempts,
                        dataset = %dataset_id,
                        url = %url,
                        "error reading metadata tarball: {detail}"
                    ),
                    TransportError::Fatal(_) => {}
                })
            },
            TransportError::is_retryable,
        );

        match opened {
            Ok(body) => Ok(FetchedArchive {
                url,
                body: MultiGzDecoder::new(body),
            }),
            Err(RetryError::Exhausted { attempts, last }) => Err(EgaError::FetchExhausted {
                dataset_id: dataset_id.to_string(),
                url,
                attempts,
                last_error: last.to_string(),
            }),
            Err(RetryError::Aborted { error, .. }) => Err(EgaError::FetchFailed {
                url,
                message: error.to_string(),
            }),
        }
    }
}
