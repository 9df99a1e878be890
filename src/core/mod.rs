//! 核心编排层：错误、回合编排循环、优雅关闭

pub mod error;
pub mod orchestrator;
pub mod shutdown;

pub use error::AgentError;
pub use orchestrator::{AgentTurnResult, Orchestrator, DEFAULT_MAX_ITERATIONS};
pub use shutdown::{shutdown_signal, ShutdownReason};
