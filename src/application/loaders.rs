//! Route pre-fetch: make sure a page's data is cached before it renders.

use std::sync::Arc;

use roster_api_types::{Post, User};
use thiserror::Error;
use tracing::info;

use crate::cache::{QueryClient, QueryError, UserKeys};

use super::queries::{get_user, list_user_posts, list_users};
use super::repos::{PostsRepo, RepoError, UsersRepo};

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("invalid user id `{0}`: expected a positive integer")]
    InvalidUserId(String),
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl LoaderError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Query(err) => err
                .downcast_ref::<RepoError>()
                .is_some_and(RepoError::is_not_found),
            Self::InvalidUserId(_) => false,
        }
    }
}

/// Parse a route parameter into a user id.
pub fn parse_user_id(param: &str) -> Result<u64, LoaderError> {
    match param.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(LoaderError::InvalidUserId(param.to_string())),
    }
}

#[derive(Clone)]
pub struct Loaders {
    client: QueryClient,
    users: Arc<dyn UsersRepo>,
    posts: Arc<dyn PostsRepo>,
}

impl Loaders {
    pub fn new(client: QueryClient, users: Arc<dyn UsersRepo>, posts: Arc<dyn PostsRepo>) -> Self {
        Self {
            client,
            users,
            posts,
        }
    }

    pub async fn users(&self) -> Result<Arc<Vec<User>>, LoaderError> {
        let users = self
            .client
            .ensure_data(
                UserKeys::lists(),
                self.client.config().primary(),
                list_users(&self.users),
            )
            .await?;
        info!(count = users.len(), "users loaded");
        Ok(users)
    }

    pub async fn user(&self, param: &str) -> Result<Arc<User>, LoaderError> {
        let id = parse_user_id(param)?;
        let user = self
            .client
            .ensure_data(
                UserKeys::detail(id),
                self.client.config().primary(),
                get_user(&self.users, id),
            )
            .await?;
        info!(user_id = id, name = %user.name, "user loaded");
        Ok(user)
    }

    pub async fn user_posts(&self, param: &str) -> Result<Arc<Vec<Post>>, LoaderError> {
        let id = parse_user_id(param)?;
        let posts = self
            .client
            .ensure_data(
                UserKeys::posts(id),
                self.client.config().secondary(),
                list_user_posts(&self.posts, id),
            )
            .await?;
        info!(user_id = id, count = posts.len(), "user posts loaded");
        Ok(posts)
    }
}
