//! Error taxonomy for the ETL run.
//!
//! Only [`FetchError`], [`CredentialError`] and [`ConfigError`] are fatal to a
//! run; they surface through [`RunError`]. [`ArchiveError`] stays inside the
//! archive task that produced it, and a [`StorageError`] from the report
//! upload is logged by the pipeline and swallowed.

use thiserror::Error;

/// Failure while paging through the article source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}: {body}")]
    UnexpectedStatus { status: u16, url: String, body: String },

    #[error("JSON deserialization error for page {page}: {source}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid source URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failure while resolving the API bearer token.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("secret lookup for {secret_name} failed: {message}")]
    Lookup { secret_name: String, message: String },

    #[error("secret {secret_name} has no string value")]
    MissingSecretString { secret_name: String },

    #[error("secret {secret_name} does not contain an api_token")]
    MissingToken { secret_name: String },
}

/// Failure writing to the blob store or the article table.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{backend} write failed for {key}: {message}")]
    Backend {
        backend: &'static str,
        key: String,
        message: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid storage key \"{0}\"")]
    InvalidKey(String),
}

/// Failure archiving a single article.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("article has an empty id")]
    MissingId,

    #[error("raw blob write failed: {0}")]
    Blob(#[source] StorageError),

    /// The blob at `blob_key` exists; only the table row is missing.
    #[error("table write failed after blob {blob_key} was stored: {source}")]
    Table {
        blob_key: String,
        #[source]
        source: StorageError,
    },
}

/// Failure resolving the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("credential lookup failed: {0}")]
    Credential(#[from] CredentialError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
