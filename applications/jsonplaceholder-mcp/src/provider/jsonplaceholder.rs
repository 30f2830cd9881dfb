use crate::error::{AppError, ProviderError};
use crate::provider::ContentProvider;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

/// HTTP client for the JSONPlaceholder API.
#[derive(Clone)]
pub struct JsonPlaceholderClient {
    base_url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl JsonPlaceholderClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        info!("JSONPlaceholderClient initialized with base_url={}", base_url);

        Ok(Self {
            base_url,
            timeout,
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `endpoint`, mapping 404 to `None` and every other failure to a
    /// `ProviderError`.
    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, i64)],
    ) -> Result<Option<Value>, ProviderError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Making GET request to {} with params={:?}", url, query);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.classify(&url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("Resource not found: {}", url);
            return Ok(None);
        }

        if status.is_client_error() || status.is_server_error() {
            error!("HTTP error {} for {}", status.as_u16(), url);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let data = response
            .json::<Value>()
            .await
            .map_err(|e| self.classify(&url, e))?;
        debug!("Successfully retrieved data from {}", url);
        Ok(Some(data))
    }

    async fn get_list(
        &self,
        endpoint: &str,
        query: &[(&str, i64)],
    ) -> Result<Vec<Value>, ProviderError> {
        match self.get_json(endpoint, query).await? {
            Some(Value::Array(items)) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            error!("Request timeout after {:?} for {}", self.timeout, url);
            ProviderError::Timeout(self.timeout.as_secs())
        } else if err.is_connect() {
            error!("Connection error for {}: {}", url, err);
            ProviderError::Connection(err.to_string())
        } else if err.is_decode() {
            error!("JSON parsing error for {}: {}", url, err);
            ProviderError::Decode(err.to_string())
        } else {
            error!("Request failed for {}: {}", url, err);
            ProviderError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl ContentProvider for JsonPlaceholderClient {
    async fn get_post(&self, post_id: i64) -> Result<Option<Value>, ProviderError> {
        self.get_json(&format!("/posts/{}", post_id), &[]).await
    }

    async fn list_posts(&self, user_id: Option<i64>) -> Result<Vec<Value>, ProviderError> {
        match user_id {
            Some(user_id) => self.get_list("/posts", &[("userId", user_id)]).await,
            None => self.get_list("/posts", &[]).await,
        }
    }

    async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Value>, ProviderError> {
        self.get_list("/comments", &[("postId", post_id)]).await
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<Value>, ProviderError> {
        self.get_json(&format!("/users/{}", user_id), &[]).await
    }

    async fn list_users(&self) -> Result<Vec<Value>, ProviderError> {
        self.get_list("/users", &[]).await
    }
}
