pub mod api;
pub mod config;
pub mod error;
pub mod mcp;
pub mod provider;
pub mod tools;

pub use config::Config;
pub use error::{AppError, Result};
pub use mcp::McpDispatcher;
pub use tools::{ToolExecutor, ToolResult};
