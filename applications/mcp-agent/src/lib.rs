pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod message;

pub use agent::AgentOrchestrator;
pub use client::{McpClient, ToolClient};
pub use config::Config;
pub use error::{AgentError, AppError, ClientError, CompletionError, Result};
pub use message::{AgentReply, Message, ToolCall, ToolEnvelope, ToolSpec};
