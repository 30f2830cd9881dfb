use crate::api::routes::AppState;
use crate::mcp::types::JsonRpcResponse;
use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;
use tracing::warn;

/// JSON-RPC entry point. The body is parsed by hand so that malformed JSON
/// still gets a JSON-RPC error instead of an axum rejection.
pub async fn rpc_handler(State(state): State<AppState>, body: Bytes) -> Json<JsonRpcResponse> {
    let payload = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
        warn!("Unparseable JSON-RPC body: {}", e);
        Value::Null
    });

    Json(state.dispatcher.handle(payload).await)
}
