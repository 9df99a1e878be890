pub mod calculator;
pub mod clock;
pub mod executor;
pub mod registry;
pub mod schema;
pub mod search;
pub mod weather;

pub use executor::ToolExecutor;
pub use registry::{BuiltinTool, ToolDefinition, ToolRegistry};
pub use schema::parameters_schema;
