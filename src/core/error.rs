//! Agent 错误类型
//!
//! 工具层错误（未注册、执行失败、超时）在编排循环内被转成 tool 结果回喂模型；
//! 模型错误与步数超限会终止当前回合，由 HTTP 层映射为错误响应。

use thiserror::Error;

use crate::llm::ModelError;

/// Agent 回合中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Tool not registered: {0}")]
    ToolNotRegistered(String),

    #[error("Tool {tool} failed: {cause}")]
    ToolExecutionFailed { tool: String, cause: String },

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Max iterations exceeded ({0}) without a final answer")]
    MaxIterationsExceeded(usize),

    /// 启动时未配置模型凭据
    #[error("Agent not available: model credential is not configured")]
    AgentUnavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}
