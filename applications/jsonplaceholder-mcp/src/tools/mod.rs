pub mod catalogue;
pub mod executor;

pub use catalogue::ToolDescriptor;
pub use executor::{ToolExecutor, ToolOutcome, ToolResult};
