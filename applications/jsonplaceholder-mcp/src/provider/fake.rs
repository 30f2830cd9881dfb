use crate::error::ProviderError;
use crate::provider::ContentProvider;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

/// In-memory provider: posts 1..=3 (user 1), users 1..=2, two comments on
/// post 1 and none elsewhere. Every call is recorded.
#[derive(Default)]
pub struct FakeProvider {
    pub failure: Option<ProviderError>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn failing(err: ProviderError) -> Self {
        Self {
            failure: Some(err),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(call);
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub fn post(id: i64) -> Value {
    json!({ "id": id, "userId": 1, "title": format!("post {}", id), "body": "lorem" })
}

pub fn user(id: i64) -> Value {
    json!({ "id": id, "name": format!("user {}", id), "email": format!("u{}@example.com", id) })
}

#[async_trait]
impl ContentProvider for FakeProvider {
    async fn get_post(&self, post_id: i64) -> Result<Option<Value>, ProviderError> {
        self.record(format!("get_post({})", post_id))?;
        Ok((1..=3).contains(&post_id).then(|| post(post_id)))
    }

    async fn list_posts(&self, user_id: Option<i64>) -> Result<Vec<Value>, ProviderError> {
        self.record(format!("list_posts({:?})", user_id))?;
        match user_id {
            None | Some(1) => Ok((1..=3).map(post).collect()),
            Some(_) => Ok(Vec::new()),
        }
    }

    async fn get_comments_for_post(&self, post_id: i64) -> Result<Vec<Value>, ProviderError> {
        self.record(format!("get_comments_for_post({})", post_id))?;
        if post_id == 1 {
            Ok(vec![
                json!({ "postId": 1, "id": 1, "body": "first" }),
                json!({ "postId": 1, "id": 2, "body": "second" }),
            ])
        } else {
            Ok(Vec::new())
        }
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<Value>, ProviderError> {
        self.record(format!("get_user({})", user_id))?;
        Ok((1..=2).contains(&user_id).then(|| user(user_id)))
    }

    async fn list_users(&self) -> Result<Vec<Value>, ProviderError> {
        self.record("list_users".to_string())?;
        Ok((1..=2).map(user).collect())
    }
}
