pub mod dispatcher;
pub mod handlers;
pub mod types;

pub use dispatcher::McpDispatcher;
