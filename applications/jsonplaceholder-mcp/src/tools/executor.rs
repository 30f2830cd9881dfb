use crate::error::ProviderError;
use crate::provider::ContentProvider;
use crate::tools::catalogue::{
    COMMENTS_POST_ID, GET_COMMENTS_FOR_POST, GET_POST, GET_USER, LIST_POSTS, LIST_USERS, POST_ID,
    USER_FILTER, USER_ID,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Uniform result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// What happened when a tool ran, before it is flattened into a `ToolResult`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Found(Value),
    /// The lookup succeeded but the resource does not exist.
    NotFound(String),
    Listed(Vec<Value>),
    /// A listing matched nothing; carries the note shown to the caller.
    Empty(String),
    Invalid(String),
    UnknownTool(String),
    Failed(ProviderError),
}

impl From<ToolOutcome> for ToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        match outcome {
            ToolOutcome::Found(data) => ToolResult::ok(data),
            ToolOutcome::NotFound(message) => {
                ToolResult::ok(json!({ "error": message, "status": 404 }))
            }
            ToolOutcome::Listed(items) => {
                let count = items.len();
                ToolResult::ok(json!({ "data": items, "count": count }))
            }
            ToolOutcome::Empty(message) => ToolResult::ok(json!({ "data": [], "message": message })),
            ToolOutcome::Invalid(message) => ToolResult::failed(message),
            ToolOutcome::UnknownTool(name) => ToolResult::failed(format!("Unknown tool: {}", name)),
            ToolOutcome::Failed(err) => ToolResult::failed(err.to_string()),
        }
    }
}

/// A tool invocation whose arguments passed the catalogue contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolRequest {
    GetPost { post_id: i64 },
    ListPosts { user_id: Option<i64> },
    GetCommentsForPost { post_id: i64 },
    GetUser { user_id: i64 },
    ListUsers,
}

impl ToolRequest {
    fn parse(name: &str, args: &Value) -> Result<Self, ToolOutcome> {
        let request = match name {
            GET_POST => ToolRequest::GetPost {
                post_id: POST_ID.require(args).map_err(ToolOutcome::Invalid)?,
            },
            LIST_POSTS => ToolRequest::ListPosts {
                user_id: USER_FILTER.optional(args).map_err(ToolOutcome::Invalid)?,
            },
            GET_COMMENTS_FOR_POST => ToolRequest::GetCommentsForPost {
                post_id: COMMENTS_POST_ID.require(args).map_err(ToolOutcome::Invalid)?,
            },
            GET_USER => ToolRequest::GetUser {
                user_id: USER_ID.require(args).map_err(ToolOutcome::Invalid)?,
            },
            LIST_USERS => ToolRequest::ListUsers,
            _ => return Err(ToolOutcome::UnknownTool(name.to_string())),
        };
        Ok(request)
    }
}

/// Validates tool arguments and runs them against the content provider.
#[derive(Clone)]
pub struct ToolExecutor {
    provider: Arc<dyn ContentProvider>,
}

impl ToolExecutor {
    pub fn new(provider: Arc<dyn ContentProvider>) -> Self {
        Self { provider }
    }

    /// Run a tool. Never fails: every outcome is folded into the envelope.
    pub async fn execute(&self, name: &str, arguments: &Value) -> ToolResult {
        info!("Calling tool: {} with args: {}", name, arguments);

        let outcome = match ToolRequest::parse(name, arguments) {
            Ok(request) => self.run(request).await,
            Err(outcome) => outcome,
        };

        match &outcome {
            ToolOutcome::Found(_) | ToolOutcome::Listed(_) => {
                info!(tool = %name, "Tool executed successfully")
            }
            ToolOutcome::NotFound(message) | ToolOutcome::Empty(message) => {
                info!(tool = %name, "{}", message)
            }
            ToolOutcome::Invalid(message) => warn!(tool = %name, "Invalid arguments: {}", message),
            ToolOutcome::UnknownTool(_) => warn!(tool = %name, "Unknown tool requested"),
            ToolOutcome::Failed(err) => error!(tool = %name, "Tool error: {}", err),
        }

        outcome.into()
    }

    async fn run(&self, request: ToolRequest) -> ToolOutcome {
        match request {
            ToolRequest::GetPost { post_id } => lookup(
                self.provider.get_post(post_id).await,
                format!("Post {} not found", post_id),
            ),
            ToolRequest::ListPosts { user_id } => {
                let filter = user_id
                    .map(|id| format!(" for user {}", id))
                    .unwrap_or_default();
                listing(
                    self.provider.list_posts(user_id).await,
                    format!("No posts found{}", filter),
                )
            }
            ToolRequest::GetCommentsForPost { post_id } => listing(
                self.provider.get_comments_for_post(post_id).await,
                format!("No comments found for post {}", post_id),
            ),
            ToolRequest::GetUser { user_id } => lookup(
                self.provider.get_user(user_id).await,
                format!("User {} not found", user_id),
            ),
            ToolRequest::ListUsers => listing(
                self.provider.list_users().await,
                "No users found".to_string(),
            ),
        }
    }
}

fn lookup(result: Result<Option<Value>, ProviderError>, absent: String) -> ToolOutcome {
    match result {
        Ok(Some(data)) => ToolOutcome::Found(data),
        Ok(None) => ToolOutcome::NotFound(absent),
        Err(err) => ToolOutcome::Failed(err),
    }
}

fn listing(result: Result<Vec<Value>, ProviderError>, empty: String) -> ToolOutcome {
    match result {
        Ok(items) if items.is_empty() => ToolOutcome::Empty(empty),
        Ok(items) => ToolOutcome::Listed(items),
        Err(err) => ToolOutcome::Failed(err),
    }
}
