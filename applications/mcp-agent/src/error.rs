use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failure talking to the MCP server.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Tool call timed out after {0} seconds")]
    Timeout(u64),

    #[error("Cannot reach MCP server: {0}")]
    Connection(String),

    /// Any other transport failure: body reads, redirects, malformed requests.
    #[error("MCP request failed: {0}")]
    Transport(String),

    #[error("MCP server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response from MCP server: {0}")]
    Decode(String),
}

/// Failure from a language-model backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("LLM request failed: {0}")]
    Transport(String),

    #[error("LLM returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode LLM response: {0}")]
    Decode(String),

    #[error("LLM stream failed: {0}")]
    Stream(String),

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CompletionError::Decode(err.to_string())
        } else {
            CompletionError::Transport(err.to_string())
        }
    }
}

/// The single failure kind a turn reports to its caller.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent orchestration failed: {0}")]
    Orchestration(String),
}

impl From<CompletionError> for AgentError {
    fn from(err: CompletionError) -> Self {
        AgentError::Orchestration(err.to_string())
    }
}
