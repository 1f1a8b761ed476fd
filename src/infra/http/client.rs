use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use roster_api_types::{CreateUser, Post, User};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

use crate::application::repos::{PostsRepo, RepoError, UsersRepo};
use crate::config::ApiSettings;
use crate::domain::schema::ValidationError;
use crate::domain::{posts, users};

use super::error::ApiError;

/// HTTP client for the users service.
///
/// Reads (`GET`) are retried on transport failures and 5xx responses with a
/// fixed backoff; writes are sent exactly once.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut base = settings.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            base,
            retry_attempts: settings.retry_attempts,
            retry_backoff: settings.retry_backoff,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("roster/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(ApiError::Url)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        const CONTEXT: &str = "fetch users";
        let response = self.get(self.url("users")?).await?;
        let body = read_json(response, CONTEXT).await?;
        users::validate_users(&body).map_err(invalid(CONTEXT))
    }

    pub async fn get_user(&self, id: u64) -> Result<User, ApiError> {
        const CONTEXT: &str = "fetch user";
        let response = self.get(self.url(&format!("users/{id}"))?).await?;
        let body = read_json(not_found(response, id)?, CONTEXT).await?;
        users::validate_user(&body).map_err(invalid(CONTEXT))
    }

    pub async fn create_user(&self, input: &CreateUser) -> Result<User, ApiError> {
        const CONTEXT: &str = "create user";
        let response = self
            .send(Method::POST, self.url("users")?, Some(input))
            .await?;
        let body = read_json(response, CONTEXT).await?;
        users::validate_user(&body).map_err(invalid(CONTEXT))
    }

    pub async fn update_user(&self, id: u64, input: &CreateUser) -> Result<User, ApiError> {
        const CONTEXT: &str = "update user";
        let response = self
            .send(Method::PUT, self.url(&format!("users/{id}"))?, Some(input))
            .await?;
        let body = read_json(not_found(response, id)?, CONTEXT).await?;
        users::validate_user(&body).map_err(invalid(CONTEXT))
    }

    pub async fn delete_user(&self, id: u64) -> Result<(), ApiError> {
        let response = self
            .send(Method::DELETE, self.url(&format!("users/{id}"))?, None)
            .await?;
        let response = not_found(response, id)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status,
                context: "delete user",
            });
        }
        Ok(())
    }

    pub async fn list_posts_by_user(&self, user_id: u64) -> Result<Vec<Post>, ApiError> {
        const CONTEXT: &str = "fetch posts";
        let mut url = self.url("posts")?;
        url.query_pairs_mut()
            .append_pair("userId", &user_id.to_string());
        let response = self.get(url).await?;
        let body = read_json(response, CONTEXT).await?;
        posts::validate_posts(&body).map_err(invalid(CONTEXT))
    }

    async fn get(&self, url: Url) -> Result<Response, ApiError> {
        let mut attempt = 0;
        loop {
            let started = Instant::now();
            let outcome = self.client.get(url.clone()).send().await;
            let retryable = match &outcome {
                Ok(response) => {
                    debug!(
                        method = "GET",
                        %url,
                        status = response.status().as_u16(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "request completed"
                    );
                    response.status().is_server_error()
                }
                Err(err) => !err.is_builder(),
            };

            if !retryable || attempt >= self.retry_attempts {
                return outcome.map_err(ApiError::Transport);
            }

            attempt += 1;
            match &outcome {
                Ok(response) => warn!(
                    %url,
                    attempt,
                    status = response.status().as_u16(),
                    "retrying read after server error"
                ),
                Err(err) => warn!(%url, attempt, error = %err, "retrying read after transport error"),
            }
            sleep(self.retry_backoff).await;
        }
    }

    async fn send(&self, method: Method, url: Url, body: Option<&CreateUser>) -> Result<Response, ApiError> {
        let started = Instant::now();
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        debug!(
            method = %method,
            %url,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        Ok(response)
    }
}

fn not_found(response: Response, id: u64) -> Result<Response, ApiError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound {
            resource: "user",
            id,
        });
    }
    Ok(response)
}

async fn read_json(response: Response, context: &'static str) -> Result<Value, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status { status, context });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { context, source })
}

fn invalid(context: &'static str) -> impl FnOnce(ValidationError) -> ApiError {
    move |source| ApiError::InvalidPayload { context, source }
}

impl From<ApiError> for RepoError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound { resource, id } => Self::NotFound { resource, id },
            ApiError::Status { status, context } => Self::Status {
                status: status.as_u16(),
                context,
            },
            ApiError::InvalidPayload { context, source } => Self::InvalidPayload { context, source },
            other => Self::from_transport(other),
        }
    }
}

#[async_trait]
impl UsersRepo for ApiClient {
    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        Ok(ApiClient::list_users(self).await?)
    }

    async fn get_user(&self, id: u64) -> Result<User, RepoError> {
        Ok(ApiClient::get_user(self, id).await?)
    }

    async fn create_user(&self, input: &CreateUser) -> Result<User, RepoError> {
        Ok(ApiClient::create_user(self, input).await?)
    }

    async fn update_user(&self, id: u64, input: &CreateUser) -> Result<User, RepoError> {
        Ok(ApiClient::update_user(self, id, input).await?)
    }

    async fn delete_user(&self, id: u64) -> Result<(), RepoError> {
        Ok(ApiClient::delete_user(self, id).await?)
    }
}

#[async_trait]
impl PostsRepo for ApiClient {
    async fn list_posts_by_user(&self, user_id: u64) -> Result<Vec<Post>, RepoError> {
        Ok(ApiClient::list_posts_by_user(self, user_id).await?)
    }
}
