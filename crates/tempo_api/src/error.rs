//! Error model used by worklog synchronization operations.

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Represents the failures a synchronization read can raise: HTTP errors carrying the full request URL, schema violations in remote payloads, authentication failures, timeouts, network issues and deadline expiry.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("url: {url} status {status}, error {body}")]
    Http {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("schema violation: {0}")]
    Schema(String),
    #[error("authentication error: {0}")]
    Authentication(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("deadline exceeded while waiting for {0}")]
    DeadlineExceeded(String),
    #[error("unexpected error: {0}")]
    Other(String),
}

impl SyncError {
    /// Constructs an HTTP error variant for a failed request.
    pub fn http(url: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        SyncError::Http {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Returns the HTTP status for errors raised from a remote response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SyncError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    /// Converts reqwest errors into semantic SyncError variants.
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(err.to_string())
        } else if err.is_status() {
            let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let url = err.url().map(|url| url.to_string()).unwrap_or_default();
            SyncError::Http {
                url,
                status,
                body: err.to_string(),
            }
        } else if err.is_connect() {
            SyncError::Network(err.to_string())
        } else if err.is_decode() {
            SyncError::Serialization(err.to_string())
        } else {
            SyncError::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    /// Converts serde_json decode/encode failures into serialization errors.
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::SyncError;
    use reqwest::StatusCode;

    #[test]
    fn http_error_message_carries_url_status_and_body() {
        let err = SyncError::http(
            "https://api.tempo.io/4/worklogs?offset=50",
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        );
        let message = err.to_string();
        assert!(message.contains("offset=50"));
        assert!(message.contains("500"));
        assert!(message.contains("boom"));
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn non_http_errors_have_no_status() {
        assert!(SyncError::Schema("count".into()).status().is_none());
    }
}
