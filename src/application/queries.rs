//! Cached reads for user pages.
//!
//! [`UserQueries`] hands out live observers for the users list, a user's
//! detail and a user's posts, all addressed through [`UserKeys`].

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use roster_api_types::{Post, User};
use tracing::{debug, warn};

use crate::cache::{QueryClient, QueryObserver, UserKeys};

use super::repos::{PostsRepo, RepoError, UsersRepo};

type Load<T> = BoxFuture<'static, Result<T, RepoError>>;

pub(crate) fn list_users(repo: &Arc<dyn UsersRepo>) -> impl Fn() -> Load<Vec<User>> + Send + Sync + 'static {
    let repo = Arc::clone(repo);
    move || {
        let repo = Arc::clone(&repo);
        async move { repo.list_users().await }.boxed()
    }
}

pub(crate) fn get_user(repo: &Arc<dyn UsersRepo>, id: u64) -> impl Fn() -> Load<User> + Send + Sync + 'static {
    let repo = Arc::clone(repo);
    move || {
        let repo = Arc::clone(&repo);
        async move { repo.get_user(id).await }.boxed()
    }
}

pub(crate) fn list_user_posts(
    repo: &Arc<dyn PostsRepo>,
    user_id: u64,
) -> impl Fn() -> Load<Vec<Post>> + Send + Sync + 'static {
    let repo = Arc::clone(repo);
    move || {
        let repo = Arc::clone(&repo);
        async move { repo.list_posts_by_user(user_id).await }.boxed()
    }
}

#[derive(Clone)]
pub struct UserQueries {
    client: QueryClient,
    users: Arc<dyn UsersRepo>,
    posts: Arc<dyn PostsRepo>,
}

impl UserQueries {
    pub fn new(client: QueryClient, users: Arc<dyn UsersRepo>, posts: Arc<dyn PostsRepo>) -> Self {
        Self {
            client,
            users,
            posts,
        }
    }

    pub fn users(&self) -> QueryObserver<Vec<User>> {
        self.client.observe(
            UserKeys::lists(),
            self.client.config().primary(),
            list_users(&self.users),
        )
    }

    pub fn user(&self, id: u64) -> QueryObserver<User> {
        self.client.observe(
            UserKeys::detail(id),
            self.client.config().primary(),
            get_user(&self.users, id),
        )
    }

    pub fn user_posts(&self, id: u64) -> QueryObserver<Vec<Post>> {
        self.client.observe(
            UserKeys::posts(id),
            self.client.config().secondary(),
            list_user_posts(&self.posts, id),
        )
    }

    /// Warm the detail entry for `id`. Failures are logged and dropped.
    pub async fn prefetch_user(&self, id: u64) {
        let result = self
            .client
            .ensure_data(
                UserKeys::detail(id),
                self.client.config().primary(),
                get_user(&self.users, id),
            )
            .await;
        match result {
            Ok(_) => debug!(user_id = id, "user prefetched"),
            Err(err) => warn!(user_id = id, error = %err, "user prefetch failed"),
        }
    }

    pub fn invalidate_all(&self) -> usize {
        self.client.invalidate(&UserKeys::all())
    }

    pub fn invalidate_lists(&self) -> usize {
        self.client.invalidate(&UserKeys::lists())
    }

    pub fn invalidate_detail(&self, id: u64) -> usize {
        self.client.invalidate(&UserKeys::detail(id))
    }
}
