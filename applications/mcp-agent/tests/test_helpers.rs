#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use mcp_agent::McpClient;
use serde_json::{json, Value};
use std::time::Duration;

/// Stand-in MCP server. `slow_tool` sleeps past the client timeout and
/// `broken_tool` answers 500.
fn mcp_router(healthy: bool) -> Router {
    let health_status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Router::new()
        .route(
            "/health",
            get(move || async move { (health_status, Json(json!({ "status": "ok" }))) }),
        )
        .route("/tools", get(list_tools))
        .route("/call_tool", post(call_tool))
}

async fn list_tools() -> Json<Value> {
    Json(json!([
        {
            "name": "get_post",
            "description": "Fetch a single post",
            "inputSchema": {
                "type": "object",
                "properties": { "post_id": { "type": "integer", "minimum": 1, "maximum": 100 } },
                "required": ["post_id"]
            }
        },
        {
            "name": "list_users",
            "description": "Fetch all users",
            "inputSchema": { "type": "object", "properties": {}, "required": [] }
        }
    ]))
}

async fn call_tool(Json(body): Json<Value>) -> impl IntoResponse {
    match body["name"].as_str() {
        Some("slow_tool") => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            (StatusCode::OK, Json(json!({ "success": true, "data": null })))
        }
        Some("broken_tool") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "boom" })),
        ),
        Some("get_post") => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "id": body["arguments"]["post_id"], "title": "hello" }
            })),
        ),
        Some(other) => (
            StatusCode::OK,
            Json(json!({ "success": false, "error": format!("Unknown tool: {}", other) })),
        ),
        None => (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({}))),
    }
}

/// Serve the stand-in on an ephemeral port and return its base url.
pub async fn spawn_mcp_server(healthy: bool) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, mcp_router(healthy)).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn client_for(url: &str) -> McpClient {
    McpClient::new(url, Duration::from_secs(1), Duration::from_secs(1)).unwrap()
}
