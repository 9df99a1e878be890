//! MAF Agent 服务入口
//!
//! 初始化日志、加载配置、组装编排器并启动 HTTP 服务；收到 Ctrl+C / SIGTERM 时优雅关闭。

use std::sync::Arc;

use anyhow::Context;
use maf_agent::agent::create_agent;
use maf_agent::config::load_config;
use maf_agent::core::shutdown_signal;
use maf_agent::memory::ThreadStore;
use maf_agent::observability;
use maf_agent::web::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;

    let threads = Arc::new(ThreadStore::new());
    // 凭据缺失或客户端构建失败时服务仍启动，/chat 返回 503
    let agent = match create_agent(&cfg, Arc::clone(&threads)) {
        Ok(Some(agent)) => Some(Arc::new(agent)),
        Ok(None) => {
            tracing::warn!("OPENAI_API_KEY is not configured; /chat will return 503 until it is set");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to initialize agent; /chat will return 503");
            None
        }
    };

    let app = router(Arc::new(AppState::new(agent, threads)));

    let listener = tokio::net::TcpListener::bind((cfg.server.host.as_str(), cfg.server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", cfg.server.host, cfg.server.port))?;
    tracing::info!("MAF agent listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let reason = shutdown_signal().await;
            tracing::info!(?reason, "shutdown requested, draining in-flight requests");
        })
        .await
        .context("Server error")?;

    tracing::info!("server stopped");
    Ok(())
}
