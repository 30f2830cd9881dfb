use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure reaching or decoding the upstream content API.
///
/// A missing resource is not an error: lookups report it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Request timeout after {0} seconds")]
    Timeout(u64),
    #[error("Failed to connect to content API: {0}")]
    Connection(String),
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("Invalid JSON response from API: {0}")]
    Decode(String),
    #[error("API request failed: {0}")]
    Request(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
