//! Agent 编排器：单线程会话的有界工具调用循环
//!
//! AWAIT_MODEL -> (ToolCalls) -> RUN_TOOLS -> AWAIT_MODEL -> ... -> (FinalAnswer) -> DONE
//!
//! 整个回合持有该线程的锁：同一线程的回合串行，不同线程并行。
//! 工具全部执行完后，assistant(tool_calls) 与所有 tool 结果一次性写入，不暴露半截的工具交换。
//! 模型错误与步数超限终止回合，已写入的消息保留（不回滚）。

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::Instrument;

use crate::core::AgentError;
use crate::llm::{ModelClient, ModelError, ModelResponse};
use crate::memory::{Message, ThreadStore, ToolCallRequest};
use crate::tools::ToolExecutor;

/// 默认单回合模型调用上限
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// 回合结果：最终回复与线程 id（线程尾部的视图）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTurnResult {
    pub final_text: String,
    pub thread_id: String,
    /// 本回合的模型调用次数
    pub iterations: usize,
}

/// 编排器：注入线程存储、模型客户端与工具执行器
pub struct Orchestrator {
    threads: Arc<ThreadStore>,
    llm: Arc<dyn ModelClient>,
    executor: Arc<ToolExecutor>,
    max_iterations: usize,
}

impl Orchestrator {
    pub fn new(
        threads: Arc<ThreadStore>,
        llm: Arc<dyn ModelClient>,
        executor: Arc<ToolExecutor>,
    ) -> Self {
        Self {
            threads,
            llm,
            executor,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// 设置单回合模型调用上限（至少为 1）
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn threads(&self) -> &Arc<ThreadStore> {
        &self.threads
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// 在独立任务中运行回合：调用方断开（future 被丢弃）时回合仍会跑完，不会留下半截写入
    pub async fn spawn_handle(
        self: &Arc<Self>,
        thread_id: String,
        user_message: String,
    ) -> Result<AgentTurnResult, AgentError> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.handle(&thread_id, &user_message).await })
            .await
            .map_err(|e| AgentError::Internal(format!("turn task failed: {e}")))?
    }

    /// 处理一条用户消息，返回最终回复
    pub async fn handle(
        &self,
        thread_id: &str,
        user_message: &str,
    ) -> Result<AgentTurnResult, AgentError> {
        let span = tracing::info_span!("turn", thread_id = %thread_id);
        self.run_turn(thread_id, user_message).instrument(span).await
    }

    async fn run_turn(
        &self,
        thread_id: &str,
        user_message: &str,
    ) -> Result<AgentTurnResult, AgentError> {
        let handle = self.threads.get_or_create(thread_id).await;
        let mut thread = handle.lock().await;
        thread.push(Message::user(user_message));

        let tools = self.executor.definitions();
        let mut iterations = 0;

        loop {
            if iterations >= self.max_iterations {
                tracing::warn!(max_iterations = self.max_iterations, "turn did not converge");
                return Err(AgentError::MaxIterationsExceeded(self.max_iterations));
            }
            iterations += 1;

            let response = self
                .llm
                .complete(thread.messages(), tools)
                .await
                .map_err(|e| {
                    tracing::warn!(error = %e, iteration = iterations, "model call failed");
                    AgentError::Model(e)
                })?;

            match response {
                ModelResponse::FinalAnswer(text) => {
                    thread.push(Message::assistant(text.clone()));
                    let usage = self.llm.token_usage();
                    tracing::info!(
                        iterations,
                        history_len = thread.len(),
                        prompt_tokens = usage.prompt_tokens,
                        completion_tokens = usage.completion_tokens,
                        "turn completed"
                    );
                    return Ok(AgentTurnResult {
                        final_text: text,
                        thread_id: thread.id().to_string(),
                        iterations,
                    });
                }
                ModelResponse::ToolCalls(calls) if calls.is_empty() => {
                    return Err(AgentError::Model(ModelError::Malformed(
                        "tool call response without calls".to_string(),
                    )));
                }
                ModelResponse::ToolCalls(calls) => {
                    tracing::debug!(
                        iteration = iterations,
                        tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                        "model requested tools"
                    );
                    let outputs = self.run_tools(&calls).await;
                    thread.push_tool_exchange(calls, outputs);
                }
            }
        }
    }

    /// 并发执行同一响应中的全部工具调用，输出与调用同序；失败转为 "Error: ..." 文本交给模型
    async fn run_tools(&self, calls: &[ToolCallRequest]) -> Vec<String> {
        let futures = calls.iter().map(|call| async move {
            match self
                .executor
                .execute(&call.name, call.arguments.clone())
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "tool failed");
                    format!("Error: {e}")
                }
            }
        });
        join_all(futures).await
    }
}
