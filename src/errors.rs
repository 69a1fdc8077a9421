//! Error taxonomy shared by the readers, the comparator and the executors.
//!
//! Run-level failures (`Auth`, `FolderCycle`, `UnknownScope`) abort the run.
//! Everything else is scoped to a single asset, entry or folder and is
//! tallied in the report without stopping the batch.

use reqwest::StatusCode;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("transient network error: {0}")]
    TransientNetwork(String),
    #[error("invalid inventory entry `{id}`: {reason}")]
    Validation { id: String, reason: String },
    #[error("conflict on {target}: {reason}")]
    Conflict { target: String, reason: String },
    #[error("folder tree contains a cycle through folder {0}")]
    FolderCycle(i64),
    #[error("{0} not found")]
    NotFound(String),
    #[error("unexpected response ({status}) from {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },
    #[error("scope `{0}` matches no CDN folder or asset")]
    UnknownScope(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Shortcut for a validation failure on a single inventory item.
    pub fn validation(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Shortcut for a mutation-time conflict.
    pub fn conflict(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Whether a network call failing with this error may be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::TransientNetwork(_))
    }

    /// Whether this error aborts the whole run instead of a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Auth(_) | SyncError::FolderCycle(_) | SyncError::UnknownScope(_)
        )
    }

    /// Map a non-success HTTP status to the taxonomy.
    pub fn from_status(status: StatusCode, url: &str, body: &str) -> Self {
        let message = truncate(body, 300);
        match status.as_u16() {
            401 | 403 => SyncError::Auth(format!("{} returned {}: {}", url, status, message)),
            404 => SyncError::NotFound(url.to_string()),
            409 => SyncError::conflict(url, message),
            408 | 429 => SyncError::TransientNetwork(format!("{} returned {}", url, status)),
            code if status.is_server_error() => {
                SyncError::TransientNetwork(format!("{} returned {}: {}", url, code, message))
            }
            code => SyncError::Api {
                status: code,
                url: url.to_string(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return SyncError::TransientNetwork(err.to_string());
        }
        if let Some(status) = err.status() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            return SyncError::from_status(status, &url, &err.to_string());
        }
        if err.is_decode() {
            return SyncError::Api {
                status: 0,
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                message: format!("could not decode response: {}", err),
            };
        }
        SyncError::TransientNetwork(err.to_string())
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_are_fatal_and_not_retried() {
        for code in [401u16, 403] {
            let err = SyncError::from_status(
                StatusCode::from_u16(code).unwrap(),
                "https://cms.test/api/upload/files",
                "forbidden",
            );
            assert!(matches!(err, SyncError::Auth(_)));
            assert!(err.is_fatal());
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        for code in [500u16, 502, 503, 429, 408] {
            let err = SyncError::from_status(StatusCode::from_u16(code).unwrap(), "u", "");
            assert!(err.is_retryable(), "status {} should be retryable", code);
            assert!(!err.is_fatal());
        }
    }

    #[test]
    fn other_client_errors_surface_as_api_errors() {
        let err = SyncError::from_status(StatusCode::BAD_REQUEST, "u", "bad payload");
        match err {
            SyncError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad payload");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            SyncError::from_status(StatusCode::NOT_FOUND, "u", ""),
            SyncError::NotFound(_)
        ));
        assert!(matches!(
            SyncError::from_status(StatusCode::CONFLICT, "u", ""),
            SyncError::Conflict { .. }
        ));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1000);
        let err = SyncError::from_status(StatusCode::BAD_REQUEST, "u", &body);
        let SyncError::Api { message, .. } = err else {
            panic!("expected api error");
        };
        assert_eq!(message.len(), 303);
    }
}
