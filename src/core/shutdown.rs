//! 优雅关闭：等待 Ctrl+C 或 SIGTERM，交给 `axum::serve(...).with_graceful_shutdown` 使用。
//! 收到信号后服务停止接收新连接，进行中的回合跑完再退出。

use std::future::{pending, Future};

/// 关闭原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C
    UserInitiated,
    /// SIGTERM
    Signal,
}

/// 等待第一个关闭信号
pub async fn shutdown_signal() -> ShutdownReason {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<()>();

    first_of(ctrl_c, terminate).await
}

/// 两路信号先到者决定关闭原因
async fn first_of(
    ctrl_c: impl Future<Output = ()>,
    terminate: impl Future<Output = ()>,
) -> ShutdownReason {
    tokio::select! {
        _ = ctrl_c => ShutdownReason::UserInitiated,
        _ = terminate => ShutdownReason::Signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::ready;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ctrl_c_wins() {
        let reason = first_of(ready(()), pending()).await;
        assert_eq!(reason, ShutdownReason::UserInitiated);
    }

    #[tokio::test]
    async fn test_sigterm_wins() {
        let reason = first_of(pending(), tokio::time::sleep(Duration::from_millis(5))).await;
        assert_eq!(reason, ShutdownReason::Signal);
    }
}
