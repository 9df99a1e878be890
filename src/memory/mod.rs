//! 记忆层：对话消息、线程与进程内线程存储

pub mod conversation;
pub mod thread_store;

pub use conversation::{Message, Role, Thread, ToolCallRequest};
pub use thread_store::{ThreadHandle, ThreadStore};
