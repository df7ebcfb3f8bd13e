//! Error taxonomy shared by the gateway, the views and the refresh controller.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for engine operations.
pub type AdminResult<T> = Result<T, AdminError>;

/// Failures surfaced by any engine boundary. None of them are fatal.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The request never reached the backend or no response came back.
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint label (`METHOD /path`).
        endpoint: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("{message} (status {status})")]
    Status {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Backend-supplied detail or a generic fallback.
        message: String,
    },
    /// The entry being created already exists.
    #[error("{message}")]
    DuplicateEntry {
        /// Backend-supplied detail or a generic fallback.
        message: String,
    },
    /// Input rejected locally; no request was issued.
    #[error("{0}")]
    Validation(String),
    /// A success response carried a body that could not be decoded.
    #[error("failed to decode {what}: {source}")]
    Decode {
        /// Payload being decoded.
        what: &'static str,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },
    /// A local file could not be read; no request was issued.
    #[error("failed to read {path}: {source}")]
    LocalFile {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configured base URL cannot address the endpoint.
    #[error("invalid base URL: {0}")]
    BaseUrl(String),
}

impl AdminError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the failure was detected locally, before any request.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Text for the transient notice shown to the operator.
    #[must_use]
    pub fn notice_text(&self) -> String {
        match self {
            Self::Transport { .. } => "request failed; the backend could not be reached".to_string(),
            Self::Status { message, .. } if message.is_empty() => {
                "request failed".to_string()
            }
            Self::Status { message, .. } => message.clone(),
            Self::DuplicateEntry { message } => format!("already exists: {message}"),
            Self::Validation(message) => message.clone(),
            Self::Decode { what, .. } => format!("backend returned an unreadable {what}"),
            Self::LocalFile { path, .. } => format!("failed to read {path}"),
            Self::BaseUrl(message) => format!("invalid base URL: {message}"),
        }
    }
}
