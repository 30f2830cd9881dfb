use crate::api::handlers::{health, tools};
use crate::mcp::{handlers::rpc_handler, McpDispatcher};
use crate::tools::ToolExecutor;
use axum::{
    extract::Request,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: McpDispatcher,
}

pub fn create_router(executor: ToolExecutor) -> Router {
    let state = AppState {
        dispatcher: McpDispatcher::new(executor),
    };

    let rest_routes = Router::new()
        .route("/health", get(health::health))
        .route("/tools", get(tools::list_tools))
        .route("/call_tool", post(tools::call_tool));

    // POST / and POST /mcp are the same endpoint; hosted clients expect the latter
    let rpc_routes = Router::new()
        .route("/", get(tools::list_tools).post(rpc_handler))
        .route("/mcp", post(rpc_handler));

    Router::new()
        .merge(rest_routes)
        .merge(rpc_routes)
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::span!(
                        Level::INFO,
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_request(|_request: &Request, _span: &tracing::Span| {
                    tracing::event!(Level::DEBUG, "received request");
                })
                .on_response(
                    |response: &axum::response::Response,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::event!(
                            Level::INFO,
                            status = %response.status(),
                            latency = ?latency,
                            "request completed"
                        );
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::event!(Level::ERROR, error = %error, latency = ?latency, "request failed");
                    },
                ),
        )
}
