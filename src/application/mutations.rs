use std::sync::Arc;

use roster_api_types::{CreateUser, User};
use tracing::info;

use crate::cache::{QueryClient, UserKeys};

use super::repos::{RepoError, UsersRepo};

/// Lowest id handed out locally; the demo service seeds ids 1 through 10.
const SEEDED_MAX_ID: u64 = 10;

/// Writes that patch the cache directly instead of waiting for a refetch.
#[derive(Clone)]
pub struct Mutations {
    client: QueryClient,
    users: Arc<dyn UsersRepo>,
}

impl Mutations {
    pub fn new(client: QueryClient, users: Arc<dyn UsersRepo>) -> Self {
        Self { client, users }
    }

    /// Create a user and prepend it to the cached list.
    ///
    /// The demo service echoes the same id for every creation, so the cached
    /// copy gets a provisional id one above the largest id already listed.
    /// Returns the user as cached.
    pub async fn create_user(&self, input: CreateUser) -> Result<User, RepoError> {
        let created = self.users.create_user(&input).await?;

        let mut cached = None;
        self.client
            .update_query_data(UserKeys::lists(), |current: Option<&Vec<User>>| {
                let current = current.map(Vec::as_slice).unwrap_or_default();
                let provisional = current
                    .iter()
                    .map(|user| user.id)
                    .fold(SEEDED_MAX_ID, u64::max)
                    + 1;
                let mut user = created.clone();
                user.id = provisional;
                cached = Some(user.clone());

                let mut next = Vec::with_capacity(current.len() + 1);
                next.push(user);
                next.extend_from_slice(current);
                next
            });

        let user = cached.unwrap_or(created);
        info!(user_id = user.id, "user created and prepended to cached list");
        Ok(user)
    }

    /// Update a user, store the result as its detail and mark lists stale.
    pub async fn update_user(&self, id: u64, input: CreateUser) -> Result<User, RepoError> {
        let updated = self
            .client
            .write(self.users.update_user(id, &input), &[UserKeys::lists()])
            .await?;
        self.client.set_query_data(UserKeys::detail(id), updated.clone());
        info!(user_id = id, "user updated in cache");
        Ok(updated)
    }

    /// Delete a user, drop its cached detail subtree and mark lists stale.
    pub async fn delete_user(&self, id: u64) -> Result<(), RepoError> {
        self.client
            .write(self.users.delete_user(id), &[UserKeys::lists()])
            .await?;
        let removed = self.client.remove(&UserKeys::detail(id));
        info!(user_id = id, removed, "user deleted from cache");
        Ok(())
    }
}
