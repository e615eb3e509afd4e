use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur while refreshing trust anchors from the metadata service.
///
/// A refresh that fails with any of these leaves the stored trust anchors untouched.
#[derive(Debug, Error)]
pub enum MdsError {
    /// Missing or invalid MDS configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redirect chain longer than the configured limit
    #[error("Too many redirects: {0}")]
    TooManyRedirects(String),

    /// Transport failure or a 4xx/5xx response
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// BLOB that is not a three-segment JWT with JSON header and payload
    #[error("Malformed BLOB: {0}")]
    MalformedBlob(String),

    #[error("Certificate chain invalid: {0}")]
    CertChainInvalid(String),

    /// Signing certificate is not valid for the configured MDS host
    #[error("Host mismatch: {0}")]
    HostMismatch(String),

    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// Payload `nextUpdate` is in the past
    #[error("Stale feed: {0}")]
    StaleFeed(String),

    /// No feed entry survived the allow-list
    #[error("Empty whitelist: {0}")]
    EmptyWhitelist(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for MdsError {
    fn from(err: reqwest::Error) -> Self {
        Self::DownloadFailed(err.to_string())
    }
}
