//! Repository traits describing the remote users service.

use async_trait::async_trait;
use roster_api_types::{CreateUser, Post, User};
use thiserror::Error;

use crate::domain::schema::ValidationError;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: u64 },
    #[error("failed to {context}: remote service responded with status {status}")]
    Status { status: u16, context: &'static str },
    #[error("remote service unavailable: {0}")]
    Transport(String),
    #[error("failed to {context}: {source}")]
    InvalidPayload {
        context: &'static str,
        source: ValidationError,
    },
}

impl RepoError {
    pub fn from_transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, RepoError>;

    async fn get_user(&self, id: u64) -> Result<User, RepoError>;

    /// Returns the record echoed by the service, including its assigned id.
    async fn create_user(&self, input: &CreateUser) -> Result<User, RepoError>;

    async fn update_user(&self, id: u64, input: &CreateUser) -> Result<User, RepoError>;

    async fn delete_user(&self, id: u64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_posts_by_user(&self, user_id: u64) -> Result<Vec<Post>, RepoError>;
}
