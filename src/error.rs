//! Error types for nav-query
//!
//! This module provides the error taxonomy for the lookup workflow:
//! - Capacity errors raised before any network traffic
//! - Discovery errors (start page, iframe, form scan) wrapping their cause
//! - Upload/download errors carrying the HTTP status line
//! - Markup errors when an expected element is missing from a page
//! - Cancellation errors observed at call-context checkpoints

use crate::types::TaxRecord;
use thiserror::Error;

/// Result type alias for nav-query operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for nav-query
///
/// Each variant includes enough context (URL, status, counts) to diagnose
/// which step of the start page → iframe → form → upload → download chain broke.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "start_url")
        key: Option<String>,
    },

    /// More identifiers were requested than one upload can carry
    #[error("too many records: {count} requested, max {max}")]
    TooManyRecords {
        /// Number of identifiers left after local validation
        count: usize,
        /// Maximum number of identifiers per upload
        max: usize,
    },

    /// Session discovery (start page, iframe, form) failed
    #[error("session discovery failed for {url}: {source}")]
    Discovery {
        /// The URL being fetched or scanned when discovery failed
        url: String,
        /// The underlying cause
        #[source]
        source: Box<Error>,
    },

    /// The start page contained no iframe with a `src` attribute
    #[error("no iframe found on {page}")]
    IframeNotFound {
        /// The start page URL
        page: String,
    },

    /// The form page contained no file input
    #[error("no file upload field found on {page}")]
    UploadFieldMissing {
        /// The form page URL
        page: String,
    },

    /// The upload response contained no download button
    #[error("no download URL found on {page}")]
    DownloadUrlNotFound {
        /// The final URL of the upload response
        page: String,
    },

    /// The service answered with a non-success status
    #[error("{method} {url}: {status}")]
    HttpStatus {
        /// HTTP method of the failed request
        method: &'static str,
        /// Request URL
        url: String,
        /// Status line (e.g., "503 Service Unavailable")
        status: String,
    },

    /// Building the multipart upload body failed
    #[error("multipart encoding failed: {0}")]
    Multipart(String),

    /// A URL or relative reference could not be parsed
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// The offending URL text
        url: String,
        /// The parse error
        #[source]
        source: url::ParseError,
    },

    /// Discovery produced parameters that cannot be used for an upload.
    ///
    /// This indicates a broken scan result rather than bad input.
    #[error("invalid session parameters: {0}")]
    InvalidSession(String),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error (reading the input stream)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The call was cancelled by its caller
    #[error("operation cancelled")]
    Cancelled,

    /// The call's deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The consumer dropped the result receiver before the stream finished
    #[error("result receiver closed")]
    ResultChannelClosed,

    /// A worker task panicked or was aborted
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl Error {
    /// Returns true for errors caused by cancellation or an expired deadline
    pub fn is_cancellation(&self) -> bool {
        match self {
            Error::Cancelled | Error::DeadlineExceeded => true,
            Error::Discovery { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }

    pub(crate) fn discovery(url: impl Into<String>, source: Error) -> Self {
        Error::Discovery {
            url: url.into(),
            source: Box::new(source),
        }
    }
}

/// Failure of a bulk lookup
///
/// Carries the records that were already produced (locally invalid
/// identifiers) together with the error that stopped the call.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct LookupFailure {
    /// Records collected before the failure
    pub partial: Vec<TaxRecord>,
    /// The error that stopped the lookup
    #[source]
    pub error: Error,
}

impl LookupFailure {
    pub(crate) fn new(partial: Vec<TaxRecord>, error: Error) -> Self {
        Self { partial, error }
    }
}

impl From<LookupFailure> for Error {
    fn from(failure: LookupFailure) -> Self {
        failure.error
    }
}
