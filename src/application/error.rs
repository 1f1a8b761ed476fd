use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{loaders::LoaderError, repos::RepoError},
    cache::QueryError,
    domain::{form::FormParseError, schema::ValidationError},
    infra::{error::InfraError, http::ApiError},
};

/// An error flattened into its source chain for logging.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid form input: {0}")]
    Form(#[from] FormParseError),
    #[error("{path} is not valid JSON: {source}")]
    InvalidJson {
        path: String,
        source: serde_json::Error,
    },
    #[error("{action} was rejected with {fields} field error(s)")]
    Rejected { action: &'static str, fields: usize },
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
