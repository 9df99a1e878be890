//! 模型客户端抽象
//!
//! complete 接收完整历史与可用工具，返回二选一的 ModelResponse：最终回复或一组工具调用。
//! 网络、超时、错误状态码与无法解析的响应统一报告为 ModelError。

use async_trait::async_trait;
use thiserror::Error;

use crate::memory::{Message, ToolCallRequest};
use crate::tools::ToolDefinition;

/// 模型一次调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// 模型给出结论性的自然语言回复
    FinalAnswer(String),
    /// 模型需要先执行这些工具；同一响应内的调用互相独立
    ToolCalls(Vec<ToolCallRequest>),
}

/// 远端模型服务错误（对当前回合是终止性的，不自动重试）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("http error: {0}")]
    Http(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// 客户端生命周期内累计的 token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenTotals {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// 模型客户端 trait
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, ModelError>;

    /// 当前使用的模型标识
    fn model_id(&self) -> &str;

    /// 累计用量；不上报用量的实现返回全 0
    fn token_usage(&self) -> TokenTotals {
        TokenTotals::default()
    }
}
