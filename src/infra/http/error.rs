use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::schema::ValidationError;

/// Failure talking to the users service.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: u64 },
    #[error("failed to {context}: server responded with {status}")]
    Status {
        status: StatusCode,
        context: &'static str,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to {context}: response body is not JSON: {source}")]
    Decode {
        context: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to {context}: {source}")]
    InvalidPayload {
        context: &'static str,
        source: ValidationError,
    },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// HTTP status carried by the error, if the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }
}
