//! MAF Agent - 对话式智能体 HTTP 服务
//!
//! 模块划分：
//! - **agent**: 按配置组装编排器
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、回合编排循环、优雅关闭
//! - **llm**: 模型客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 消息、线程与进程内线程存储
//! - **observability**: 日志初始化
//! - **tools**: 内置工具（天气、搜索、计算器、时钟）、注册表与执行器
//! - **web**: axum HTTP 接口

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod tools;
pub mod web;

pub use crate::core::{AgentError, AgentTurnResult, Orchestrator};
