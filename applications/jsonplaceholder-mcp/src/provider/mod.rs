mod jsonplaceholder;

#[cfg(test)]
pub(crate) mod fake;

pub use jsonplaceholder::{JsonPlaceholderClient, DEFAULT_BASE_URL};

use crate::error::ProviderError;
use async_trait::async_trait;
use serde_json::Value;

/// Read-only source of posts, comments and users.
///
/// Single lookups return `Ok(None)` when the resource does not exist;
/// listings return an empty vector when nothing matches.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn get_post(&self, post_id: i64) -> Result<Option<Value>, ProviderError>;

    async fn list_posts(&self, user_id: Option<i64>) -> Result<Vec<Value>, ProviderError>;

    async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Value>, ProviderError>;

    async fn get_user(&self, user_id: i64) -> Result<Option<Value>, ProviderError>;

    async fn list_users(&self) -> Result<Vec<Value>, ProviderError>;
}
