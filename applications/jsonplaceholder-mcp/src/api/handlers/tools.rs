use crate::api::routes::AppState;
use crate::mcp::types::{ToolCall, ToolDefinition};
use crate::tools::{catalogue, ToolResult};
use axum::{extract::State, Json};

pub async fn list_tools() -> Json<Vec<ToolDefinition>> {
    Json(catalogue::definitions())
}

/// Direct invocation without JSON-RPC framing; replies with the bare envelope.
pub async fn call_tool(
    State(state): State<AppState>,
    Json(call): Json<ToolCall>,
) -> Json<ToolResult> {
    let executor = state.dispatcher.executor();
    Json(executor.execute(&call.name, &call.arguments).await)
}
