//! Agent 组装
//!
//! 按配置构建编排器：OpenAI 兼容客户端 + 内置工具注册表 + 注入的线程存储。
//! 未配置模型凭据时返回 None，服务照常启动，/chat 返回 503 直到配置完成。

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::core::{AgentError, Orchestrator};
use crate::llm::OpenAiClient;
use crate::memory::ThreadStore;
use crate::tools::{ToolExecutor, ToolRegistry};

pub fn create_agent(
    cfg: &AppConfig,
    threads: Arc<ThreadStore>,
) -> Result<Option<Orchestrator>, AgentError> {
    let Some(api_key) = cfg.llm.api_key() else {
        return Ok(None);
    };

    let llm = OpenAiClient::new(&cfg.llm, api_key, &cfg.app.instructions)?;
    let registry =
        ToolRegistry::builtin().with_latency(Duration::from_millis(cfg.tools.simulated_latency_ms));
    let executor = ToolExecutor::new(registry, cfg.tools.timeout_secs);

    tracing::info!(
        name = %cfg.app.name,
        model = %cfg.llm.model,
        tools = ?executor.tool_names(),
        max_iterations = cfg.agent.max_iterations,
        "agent created"
    );

    Ok(Some(
        Orchestrator::new(threads, Arc::new(llm), Arc::new(executor))
            .with_max_iterations(cfg.agent.max_iterations),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_credential_no_agent() {
        let cfg = AppConfig::default();
        let agent = create_agent(&cfg, Arc::new(ThreadStore::new())).unwrap();
        assert!(agent.is_none());
    }

    #[test]
    fn test_agent_uses_configured_model_and_bound() {
        let mut cfg = AppConfig::default();
        cfg.llm.api_key = Some("sk-test".to_string());
        cfg.llm.model = "gpt-4o".to_string();
        cfg.agent.max_iterations = 4;
        let agent = create_agent(&cfg, Arc::new(ThreadStore::new()))
            .unwrap()
            .unwrap();
        assert_eq!(agent.model_id(), "gpt-4o");
        assert_eq!(agent.max_iterations(), 4);
        assert_eq!(agent.executor().definitions().len(), 4);
    }
}
