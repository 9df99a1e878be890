//! 线程存储
//!
//! 进程级的 thread_id -> Thread 映射。每个 Thread 自带一把异步锁：持锁者独占该线程的写入，
//! 同一线程的多个回合因此串行，不同线程互不影响。外层 map 的读写锁只在查找/插入时短暂持有。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::conversation::{Message, Thread};

/// 线程句柄：锁住即获得该线程的写权限
pub type ThreadHandle = Arc<Mutex<Thread>>;

/// 内存线程存储（生命周期同进程，不做持久化与淘汰）
#[derive(Default)]
pub struct ThreadStore {
    threads: RwLock<HashMap<String, ThreadHandle>>,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取线程，首次引用时创建空线程；重复调用返回同一个句柄
    pub async fn get_or_create(&self, thread_id: &str) -> ThreadHandle {
        if let Some(handle) = self.threads.read().await.get(thread_id) {
            return Arc::clone(handle);
        }
        let mut threads = self.threads.write().await;
        let handle = threads.entry(thread_id.to_string()).or_insert_with(|| {
            tracing::debug!(thread_id, "thread created");
            Arc::new(Mutex::new(Thread::new(thread_id)))
        });
        Arc::clone(handle)
    }

    /// 追加一条消息到线程末尾（线程不存在时先创建）
    pub async fn append(&self, thread_id: &str, message: Message) {
        let handle = self.get_or_create(thread_id).await;
        handle.lock().await.push(message);
    }

    /// 删除线程；存在并被删除返回 true，不存在返回 false。
    /// 正在进行的回合持有旧句柄，会在脱离存储的线程上完成，之后同 id 的引用从空历史开始。
    pub async fn delete(&self, thread_id: &str) -> bool {
        let removed = self.threads.write().await.remove(thread_id).is_some();
        if removed {
            tracing::info!(thread_id, "thread deleted");
        }
        removed
    }

    /// 读取线程历史的副本；不会创建线程。若有回合正在进行则等待其完成，不暴露半截状态
    pub async fn snapshot(&self, thread_id: &str) -> Option<Vec<Message>> {
        let handle = self.threads.read().await.get(thread_id).cloned()?;
        let thread = handle.lock().await;
        Some(thread.messages().to_vec())
    }

    pub async fn len(&self) -> usize {
        self.threads.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.threads.read().await.is_empty()
    }
}
