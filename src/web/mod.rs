//! HTTP 接口
//!
//! - `GET /`、`GET /health`：存活 / 就绪检查
//! - `POST /chat`：`{message, thread_id?}` -> `{response, thread_id}`，缺省 thread_id 时生成 UUID
//! - `DELETE /threads/:thread_id`：删除线程，未知 id 不是错误
//! - `GET /threads/:thread_id`：读取线程历史（不创建）
//!
//! 错误响应统一为 JSON `{error}`。

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::core::{AgentError, Orchestrator};
use crate::memory::{Message, ThreadStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 共享状态：agent 为 None 表示未配置模型凭据（服务降级）
pub struct AppState {
    pub agent: Option<Arc<Orchestrator>>,
    pub threads: Arc<ThreadStore>,
}

impl AppState {
    pub fn new(agent: Option<Arc<Orchestrator>>, threads: Arc<ThreadStore>) -> Self {
        Self { agent, threads }
    }

    /// 以编排器自带的线程存储构建
    pub fn with_agent(agent: Arc<Orchestrator>) -> Self {
        let threads = Arc::clone(agent.threads());
        Self::new(Some(agent), threads)
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub thread_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteThreadResponse {
    pub thread_id: String,
    pub deleted: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadHistoryResponse {
    pub thread_id: String,
    pub messages: Vec<Message>,
}

/// JSON 错误响应
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        let status = match &e {
            AgentError::AgentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AgentError::Model(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/threads/:thread_id", get(get_thread).delete(delete_thread))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
    })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = if state.agent.is_some() { "healthy" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        version: VERSION.to_string(),
    })
}

async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) =
        payload.map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.body_text()))?;

    let agent = state.agent.as_ref().ok_or(AgentError::AgentUnavailable)?;

    if req.message.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "message is required"));
    }

    let thread_id = req
        .thread_id
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let result = agent
        .spawn_handle(thread_id, req.message)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "chat turn failed");
            ApiError::from(e)
        })?;

    Ok(Json(ChatResponse {
        response: result.final_text,
        thread_id: result.thread_id,
    }))
}

async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Json<DeleteThreadResponse> {
    let deleted = state.threads.delete(&thread_id).await;
    let active_threads = state.threads.len().await;
    tracing::info!(
        thread_id = %thread_id,
        deleted,
        active_threads,
        "thread delete"
    );
    let message = if deleted {
        format!("Thread {thread_id} eliminado")
    } else {
        format!("Thread {thread_id} no existe")
    };
    Json(DeleteThreadResponse {
        thread_id,
        deleted,
        message,
    })
}

async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Result<Json<ThreadHistoryResponse>, ApiError> {
    let messages = state
        .threads
        .snapshot(&thread_id)
        .await
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Thread no encontrado"))?;
    Ok(Json(ThreadHistoryResponse {
        thread_id,
        messages,
    }))
}
