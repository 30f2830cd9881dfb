use crate::error::{AppError, ClientError};
use crate::message::{ToolEnvelope, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote side of the tool protocol, as seen by the orchestrator.
#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ClientError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ToolEnvelope, ClientError>;

    /// Bounded liveness probe. Never fails.
    async fn health_check(&self) -> bool;
}

/// HTTP client for the MCP server's REST surface.
#[derive(Clone)]
pub struct McpClient {
    server_url: String,
    timeout: Duration,
    health_timeout: Duration,
    http_client: reqwest::Client,
}

impl McpClient {
    pub fn new(
        server_url: impl Into<String>,
        timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, AppError> {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        info!("MCP client initialized with server_url={}", server_url);

        Ok(Self {
            server_url,
            timeout,
            health_timeout,
            http_client,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    async fn read_json(&self, response: reqwest::Response) -> Result<Value, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout(self.timeout.as_secs())
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ToolClient for McpClient {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ClientError> {
        let response = self
            .http_client
            .get(self.url("/tools"))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let body = self.read_json(response).await?;
        let tools: Vec<ToolSpec> =
            serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))?;
        debug!("Fetched {} tools from MCP server", tools.len());
        Ok(tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<ToolEnvelope, ClientError> {
        info!(tool = %name, "Calling MCP tool");

        let response = self
            .http_client
            .post(self.url("/call_tool"))
            .json(&json!({ "name": name, "arguments": arguments }))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let body = self.read_json(response).await?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn health_check(&self) -> bool {
        let result = self
            .http_client
            .get(self.url("/health"))
            .timeout(self.health_timeout)
            .send()
            .await;

        match result {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                warn!("MCP health check failed: {}", e);
                false
            }
        }
    }
}
