//! In-memory users service for application tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use roster_api_types::{Address, Company, CreateUser, Geo, Post, User};

use super::repos::{PostsRepo, RepoError, UsersRepo};

/// Id echoed for every creation, as the demo service does.
pub(crate) const ECHOED_ID: u64 = 11;

#[derive(Default)]
pub(crate) struct FakeDirectory {
    users: Mutex<Vec<User>>,
    posts: Mutex<Vec<Post>>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub posts_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl FakeDirectory {
    pub fn with_users(users: Vec<User>) -> Self {
        let directory = Self::default();
        *directory.users.lock().unwrap() = users;
        directory
    }

    pub fn add_post(&self, post: Post) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn user_ids(&self) -> Vec<u64> {
        self.users.lock().unwrap().iter().map(|user| user.id).collect()
    }

    fn check_write(&self) -> Result<(), RepoError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::from_transport("connection reset by peer"));
        }
        Ok(())
    }
}

#[async_trait]
impl UsersRepo for FakeDirectory {
    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().clone())
    }

    async fn get_user(&self, id: u64) -> Result<User, RepoError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|user| user.id == id)
            .cloned()
            .ok_or(RepoError::NotFound {
                resource: "user",
                id,
            })
    }

    async fn create_user(&self, input: &CreateUser) -> Result<User, RepoError> {
        self.check_write()?;
        let created = input.clone().with_id(ECHOED_ID);
        self.users.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: u64, input: &CreateUser) -> Result<User, RepoError> {
        self.check_write()?;
        let mut users = self.users.lock().unwrap();
        let slot = users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(RepoError::NotFound {
                resource: "user",
                id,
            })?;
        *slot = input.clone().with_id(id);
        Ok(slot.clone())
    }

    async fn delete_user(&self, id: u64) -> Result<(), RepoError> {
        self.check_write()?;
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|user| user.id != id);
        if users.len() == before {
            return Err(RepoError::NotFound {
                resource: "user",
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for FakeDirectory {
    async fn list_posts_by_user(&self, user_id: u64) -> Result<Vec<Post>, RepoError> {
        self.posts_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| post.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub(crate) fn sample_user(id: u64, name: &str) -> User {
    sample_create(name).with_id(id)
}

pub(crate) fn sample_create(name: &str) -> CreateUser {
    let handle = name.to_lowercase().replace(' ', ".");
    CreateUser {
        name: name.to_string(),
        username: handle.clone(),
        email: format!("{handle}@example.com"),
        address: Address {
            street: "Sukhumvit Rd".to_string(),
            suite: "Suite 12".to_string(),
            city: "Bangkok".to_string(),
            zipcode: "10110".to_string(),
            geo: Geo {
                lat: "13.7563".to_string(),
                lng: "100.5018".to_string(),
            },
        },
        phone: None,
        website: None,
        company: Some(Company {
            name: "Siam Tech".to_string(),
            catch_phrase: "Build fast".to_string(),
            bs: "deliver solutions".to_string(),
        }),
    }
}

pub(crate) fn sample_post(user_id: u64, id: u64) -> Post {
    Post {
        user_id,
        id,
        title: format!("post {id}"),
        body: "body".to_string(),
    }
}
