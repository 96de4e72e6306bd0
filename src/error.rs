use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum EgaError {
    #[error("invalid dataset id: {0}")]
    InvalidDatasetId(String),

    #[error("missing config file at {0}")]
    MissingConfig(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("{0} is not configured")]
    MissingSetting(String),

    #[error("HTTP client setup failed: {0}")]
    Http(String),

    #[error("could not read {dataset_id} from {url} after {attempts} attempt(s): {last_error}")]
    FetchExhausted {
        dataset_id: String,
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("could not request {url}: {message}")]
    FetchFailed { url: String, message: String },

    #[error("malformed markup: {0}")]
    MalformedMarkup(String),

    #[error("malformed mapping {mapping_id} at line {line}: {message}")]
    MalformedMapping {
        mapping_id: String,
        line: u64,
        message: String,
    },

    #[error("failed to read entry content: {0}")]
    EntryRead(String),

    #[error("error processing entry {entry} from {url} after reading {bytes_read} bytes")]
    EntryProcessing {
        entry: String,
        url: String,
        bytes_read: String,
        #[source]
        source: Box<EgaError>,
    },

    #[error("error reading archive from {url} after reading {bytes_read} bytes: {message}")]
    ArchiveRead {
        url: String,
        bytes_read: String,
        message: String,
    },

    #[error("no matching record: {0}")]
    NotFound(String),

    #[error("DACO request failed: {0}")]
    DacoHttp(String),

    #[error("DACO returned status {status}: {message}")]
    DacoStatus { status: u16, message: String },

    #[error("resource request failed: {0}")]
    ResourceHttp(String),

    #[error("resource server returned status {status}: {message}")]
    ResourceStatus { status: u16, message: String },

    #[error("failed to parse resource {name}: {message}")]
    ResourceParse { name: String, message: String },

    #[error("no resource version given and none configured")]
    MissingResourceVersion,
}

impl EgaError {
    /// The innermost error, following `EntryProcessing` wrappers.
    pub fn root_cause(&self) -> &EgaError {
        match self {
            EgaError::EntryProcessing { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
