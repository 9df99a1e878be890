//! Mock 模型客户端（用于测试，无需 API）
//!
//! 三种模式：按脚本依次返回、永远返回同一响应、按历史动态决定。每次调用的历史都会被记录，
//! 便于断言「下一次模型调用看到了什么」。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{ModelClient, ModelError, ModelResponse};
use crate::memory::Message;
use crate::tools::ToolDefinition;

type Responder = Box<dyn Fn(&[Message]) -> Result<ModelResponse, ModelError> + Send + Sync>;

enum Mode {
    Script(Mutex<VecDeque<Result<ModelResponse, ModelError>>>),
    Repeat(ModelResponse),
    Func(Responder),
}

/// Mock 客户端
pub struct MockModelClient {
    mode: Mode,
    delay: Option<Duration>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockModelClient {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 依次返回给定响应；用完后返回 Malformed 错误
    pub fn scripted(responses: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok))
    }

    /// 依次返回给定结果（可包含错误）
    pub fn with_results(results: impl IntoIterator<Item = Result<ModelResponse, ModelError>>) -> Self {
        Self::with_mode(Mode::Script(Mutex::new(results.into_iter().collect())))
    }

    /// 每次都返回同一响应
    pub fn always(response: ModelResponse) -> Self {
        Self::with_mode(Mode::Repeat(response))
    }

    /// 由历史决定响应
    pub fn from_fn(
        f: impl Fn(&[Message]) -> Result<ModelResponse, ModelError> + Send + Sync + 'static,
    ) -> Self {
        Self::with_mode(Mode::Func(Box::new(f)))
    }

    /// 每次调用前等待，模拟网络延迟
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 每次调用时看到的历史
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(
        &self,
        history: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ModelResponse, ModelError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(history.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.mode {
            Mode::Script(queue) => queue
                .lock()
                .ok()
                .and_then(|mut q| q.pop_front())
                .unwrap_or_else(|| Err(ModelError::Malformed("mock script exhausted".to_string()))),
            Mode::Repeat(response) => Ok(response.clone()),
            Mode::Func(f) => f(history),
        }
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}
