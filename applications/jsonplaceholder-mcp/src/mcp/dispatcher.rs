use crate::mcp::types::{
    JsonRpcRequest, JsonRpcResponse, RpcError, ToolCall, INTERNAL_ERROR, JSONRPC_VERSION,
    METHOD_NOT_FOUND, SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::tools::{catalogue, ToolExecutor, ToolResult};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

pub const SERVER_NAME: &str = "jsonplaceholder-mcp-server";

/// Stateless JSON-RPC router over the tool executor.
#[derive(Clone)]
pub struct McpDispatcher {
    executor: ToolExecutor,
}

impl McpDispatcher {
    pub fn new(executor: ToolExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    /// Answer one JSON-RPC payload. Protocol faults come back as error
    /// responses; this never fails.
    pub async fn handle(&self, payload: Value) -> JsonRpcResponse {
        let request = match parse_request(payload) {
            Ok(request) => request,
            Err((id, err)) => {
                warn!("Rejected JSON-RPC payload: {}", err.message);
                return JsonRpcResponse::error(id, err);
            }
        };

        debug!(method = %request.method, "Dispatching JSON-RPC request");

        let id = request.id;
        let outcome = match request.method.as_str() {
            "initialize" => Ok(initialize_result(request.params.as_ref())),
            "notifications/initialized" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": catalogue::definitions() })),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::ok(id, result),
            Err(err) => JsonRpcResponse::error(id, err),
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, RpcError> {
        let call = parse_tool_call(params)?;

        let executor = self.executor.clone();
        let name = call.name.clone();
        let result = tokio::spawn(async move { executor.execute(&call.name, &call.arguments).await })
            .await
            .map_err(|e| {
                error!(tool = %name, "Tool task aborted: {}", e);
                let detail = if e.is_panic() { "internal error" } else { "cancelled" };
                RpcError::new(INTERNAL_ERROR, "Tool execution failed")
                    .with_data(json!({ "detail": detail }))
            })?;

        Ok(call_result(result))
    }
}

/// Pick the client's requested version when we support it, else our preferred one.
pub fn negotiate_version(requested: Option<&str>) -> &'static str {
    requested
        .and_then(|wanted| {
            SUPPORTED_PROTOCOL_VERSIONS
                .iter()
                .copied()
                .find(|supported| *supported == wanted)
        })
        .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0])
}

fn initialize_result(params: Option<&Value>) -> Value {
    let requested = params
        .and_then(|params| params.get("protocolVersion"))
        .and_then(Value::as_str);

    json!({
        "protocolVersion": negotiate_version(requested),
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn parse_request(payload: Value) -> Result<JsonRpcRequest, (Value, RpcError)> {
    let Value::Object(mut fields) = payload else {
        return Err((Value::Null, RpcError::invalid_request("Invalid Request")));
    };

    let id = fields.remove("id").unwrap_or(Value::Null);

    if fields.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err((
            id,
            RpcError::invalid_request("Invalid Request")
                .with_data(json!({ "detail": "jsonrpc must be 2.0" })),
        ));
    }

    let method = match fields.remove("method") {
        Some(Value::String(method)) => method,
        _ => {
            return Err((
                id,
                RpcError::invalid_request("Invalid Request")
                    .with_data(json!({ "detail": "method must be a string" })),
            ))
        }
    };

    Ok(JsonRpcRequest {
        id,
        method,
        params: fields.remove("params"),
    })
}

fn parse_tool_call(params: Option<Value>) -> Result<ToolCall, RpcError> {
    let params = params.unwrap_or(Value::Null);

    let name = params
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RpcError::invalid_params("Missing tool name"))?
        .to_string();

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => json!({}),
        Some(arguments @ Value::Object(_)) => arguments.clone(),
        Some(_) => {
            return Err(RpcError::invalid_params("Invalid params")
                .with_data(json!({ "detail": "arguments must be an object" })))
        }
    };

    Ok(ToolCall { name, arguments })
}

fn call_result(result: ToolResult) -> Value {
    match result {
        ToolResult {
            success: true,
            data,
            ..
        } => {
            let text = data.unwrap_or(Value::Null).to_string();
            json!({
                "content": [{ "type": "text", "text": text }],
                "isError": false
            })
        }
        ToolResult { error, .. } => json!({
            "content": [],
            "isError": true,
            "error": error.unwrap_or_default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::mcp::types::{INVALID_PARAMS, INVALID_REQUEST};
    use crate::provider::fake::{self, FakeProvider};
    use crate::provider::ContentProvider;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct PanickingProvider;

    #[async_trait]
    impl ContentProvider for PanickingProvider {
        async fn get_post(&self, _post_id: i64) -> Result<Option<Value>, ProviderError> {
            panic!("index out of bounds in /srv/provider.rs: db_password=hunter2")
        }

        async fn list_posts(&self, _user_id: Option<i64>) -> Result<Vec<Value>, ProviderError> {
            Ok(Vec::new())
        }

        async fn get_comments_for_post(&self, _post_id: i64) -> Result<Vec<Value>, ProviderError> {
            Ok(Vec::new())
        }

        async fn get_user(&self, _user_id: i64) -> Result<Option<Value>, ProviderError> {
            Ok(None)
        }

        async fn list_users(&self) -> Result<Vec<Value>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn dispatcher() -> McpDispatcher {
        McpDispatcher::new(ToolExecutor::new(Arc::new(FakeProvider::default())))
    }

    fn request(id: Value, method: &str, params: Value) -> Value {
        json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
    }

    fn error_code(response: &JsonRpcResponse) -> i64 {
        response.rpc_error().map(|e| e.code).unwrap()
    }

    #[test]
    fn negotiate_echoes_every_supported_version() {
        for version in SUPPORTED_PROTOCOL_VERSIONS {
            assert_eq!(negotiate_version(Some(version)), version);
        }
    }

    #[test]
    fn negotiate_falls_back_to_most_preferred() {
        assert_eq!(negotiate_version(Some("2099-01-01")), "2025-11-05");
        assert_eq!(negotiate_version(None), "2025-11-05");
    }

    #[tokio::test]
    async fn initialize_reports_identity_and_negotiated_version() {
        let response = dispatcher()
            .handle(request(json!(1), "initialize", json!({ "protocolVersion": "2025-06-18" })))
            .await;

        let result = response.result().unwrap();
        assert_eq!(response.id, json!(1));
        assert_eq!(result["protocolVersion"], "2025-06-18");
        assert_eq!(result["capabilities"], json!({ "tools": {} }));
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }

    #[tokio::test]
    async fn initialize_with_unknown_version_picks_first_supported() {
        let response = dispatcher()
            .handle(request(json!("a"), "initialize", json!({ "protocolVersion": "2099-01-01" })))
            .await;
        assert_eq!(response.result().unwrap()["protocolVersion"], "2025-11-05");
    }

    #[tokio::test]
    async fn initialized_notification_returns_empty_result() {
        let response = dispatcher()
            .handle(request(json!(2), "notifications/initialized", Value::Null))
            .await;
        assert_eq!(response.result(), Some(&json!({})));
        assert_eq!(response.id, json!(2));
    }

    #[tokio::test]
    async fn tools_list_returns_the_five_tools() {
        let response = dispatcher()
            .handle(request(json!(3), "tools/list", Value::Null))
            .await;
        let names: Vec<String> = response.result().unwrap()["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["get_post", "list_posts", "get_comments_for_post", "get_user", "list_users"]
        );
    }

    #[tokio::test]
    async fn unknown_method_names_the_method() {
        let response = dispatcher()
            .handle(request(json!(4), "resources/list", Value::Null))
            .await;
        let err = response.rpc_error().unwrap();
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert!(err.message.contains("resources/list"));
        assert_eq!(response.id, json!(4));
    }

    #[tokio::test]
    async fn wrong_version_is_invalid_request_with_id_echoed() {
        let response = dispatcher()
            .handle(json!({ "jsonrpc": "1.0", "id": 9, "method": "tools/list" }))
            .await;
        assert_eq!(error_code(&response), INVALID_REQUEST);
        assert_eq!(response.id, json!(9));
    }

    #[tokio::test]
    async fn missing_version_is_invalid_request() {
        let response = dispatcher()
            .handle(json!({ "id": 9, "method": "tools/list" }))
            .await;
        assert_eq!(error_code(&response), INVALID_REQUEST);
    }

    #[tokio::test]
    async fn non_object_payload_is_invalid_request_with_null_id() {
        for payload in [json!([1, 2]), json!("hello"), Value::Null] {
            let response = dispatcher().handle(payload).await;
            assert_eq!(error_code(&response), INVALID_REQUEST);
            assert_eq!(response.id, Value::Null);
        }
    }

    #[tokio::test]
    async fn non_string_method_is_invalid_request() {
        let response = dispatcher()
            .handle(json!({ "jsonrpc": "2.0", "id": 5, "method": 17 }))
            .await;
        assert_eq!(error_code(&response), INVALID_REQUEST);
        assert_eq!(response.id, json!(5));
    }

    #[tokio::test]
    async fn tools_call_without_name_is_invalid_params() {
        for params in [json!({}), json!({ "name": "   " }), Value::Null] {
            let response = dispatcher()
                .handle(request(json!(6), "tools/call", params))
                .await;
            let err = response.rpc_error().unwrap();
            assert_eq!(err.code, INVALID_PARAMS);
            assert_eq!(err.message, "Missing tool name");
        }
    }

    #[tokio::test]
    async fn tools_call_with_non_object_arguments_is_invalid_params() {
        let response = dispatcher()
            .handle(request(json!(7), "tools/call", json!({ "name": "get_post", "arguments": [1] })))
            .await;
        assert_eq!(error_code(&response), INVALID_PARAMS);
    }

    #[tokio::test]
    async fn successful_call_wraps_stringified_data_in_one_text_block() {
        let response = dispatcher()
            .handle(request(json!(8), "tools/call", json!({ "name": "get_post", "arguments": { "post_id": 1 } })))
            .await;
        assert_eq!(
            response.result(),
            Some(&json!({
                "content": [{ "type": "text", "text": fake::post(1).to_string() }],
                "isError": false
            }))
        );
    }

    #[tokio::test]
    async fn out_of_range_user_is_a_failed_call() {
        let response = dispatcher()
            .handle(request(json!(10), "tools/call", json!({ "name": "get_user", "arguments": { "user_id": 11 } })))
            .await;
        let result = response.result().unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"], json!([]));
        assert!(result["error"].as_str().unwrap().contains("between 1 and 10"));
    }

    #[tokio::test]
    async fn absent_post_is_a_successful_call_tagged_404() {
        let response = dispatcher()
            .handle(request(json!(11), "tools/call", json!({ "name": "get_post", "arguments": { "post_id": 42 } })))
            .await;
        let result = response.result().unwrap();
        assert_eq!(result["isError"], false);
        let text = result["content"][0]["text"].as_str().unwrap();
        let data: Value = serde_json::from_str(text).unwrap();
        assert_eq!(data["status"], 404);
    }

    #[tokio::test]
    async fn post_id_beyond_catalogue_bound_is_rejected_before_lookup() {
        let response = dispatcher()
            .handle(request(json!(14), "tools/call", json!({ "name": "get_post", "arguments": { "post_id": 999 } })))
            .await;
        let result = response.result().unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"], json!([]));
        assert_eq!(result["error"], "post_id must be an integer between 1 and 100");
    }

    #[tokio::test]
    async fn unknown_tool_is_delegated_to_the_executor() {
        let response = dispatcher()
            .handle(request(json!(12), "tools/call", json!({ "name": "drop_tables" })))
            .await;
        let result = response.result().unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["error"], "Unknown tool: drop_tables");
    }

    #[tokio::test]
    async fn provider_outage_is_a_failed_call_not_a_protocol_error() {
        let dispatcher = McpDispatcher::new(ToolExecutor::new(Arc::new(FakeProvider::failing(
            ProviderError::Connection("refused".to_string()),
        ))));
        let response = dispatcher
            .handle(request(json!(13), "tools/call", json!({ "name": "list_users" })))
            .await;
        assert_eq!(response.result().unwrap()["isError"], true);
    }

    #[tokio::test]
    async fn panicking_tool_is_internal_error_without_panic_text() {
        let dispatcher = McpDispatcher::new(ToolExecutor::new(Arc::new(PanickingProvider)));
        let response = dispatcher
            .handle(request(json!(15), "tools/call", json!({ "name": "get_post", "arguments": { "post_id": 1 } })))
            .await;

        let err = response.rpc_error().unwrap();
        assert_eq!(err.code, INTERNAL_ERROR);
        assert_eq!(err.message, "Tool execution failed");
        assert_eq!(err.data, Some(json!({ "detail": "internal error" })));
        let encoded = serde_json::to_string(&response).unwrap();
        assert!(!encoded.contains("hunter2"));
        assert!(!encoded.contains("/srv/provider.rs"));
        assert_eq!(response.id, json!(15));
    }
}
