//! 对话消息与线程
//!
//! Thread 是按插入顺序排列的消息序列，只追加不修改；工具调用意图与工具结果成组写入，
//! 保证不会出现没有对应调用请求的 tool 消息。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 消息角色（与 Chat Completions API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 仅用于线上请求的指令前缀，不写入 Thread
    System,
    User,
    Assistant,
    Tool,
}

/// 模型发起的一次工具调用
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// 同一轮内唯一
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// assistant 的工具调用意图；为空表示普通回复
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    /// role = tool 时指向对应的 ToolCallRequest.id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_calls: calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn is_tool_call_intent(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// 一个会话线程：id + 有序历史
#[derive(Clone, Debug)]
pub struct Thread {
    id: String,
    messages: Vec<Message>,
}

impl Thread {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 追加单条消息。tool 结果应经 push_tool_exchange 与调用意图成组写入
    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// 追加一次完整的工具交换：assistant(tool_calls) + 每个调用一条 tool 结果。
    /// outputs 与 calls 按位置一一对应；多出的输出被丢弃，缺少输出的调用补一条错误结果。
    pub fn push_tool_exchange(&mut self, calls: Vec<ToolCallRequest>, outputs: Vec<String>) {
        let mut outputs = outputs.into_iter();
        let tool_messages: Vec<Message> = calls
            .iter()
            .map(|call| {
                let content = outputs
                    .next()
                    .unwrap_or_else(|| format!("Error: no result recorded for tool call {}", call.id));
                Message::tool_result(call.id.clone(), content)
            })
            .collect();
        self.messages.push(Message::assistant_tool_calls(calls));
        self.messages.extend(tool_messages);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_exchange_pairs_outputs_by_position() {
        let mut thread = Thread::new("t1");
        thread.push(Message::user("hola"));
        let calls = vec![
            ToolCallRequest::new("a", "calculator", json!({"expression": "1+1"})),
            ToolCallRequest::new("b", "get_current_time", json!({})),
        ];
        thread.push_tool_exchange(calls, vec!["2".to_string(), "now".to_string()]);

        let msgs = thread.messages();
        assert_eq!(msgs.len(), 4);
        assert!(msgs[1].is_tool_call_intent());
        assert_eq!(msgs[2].tool_call_id.as_deref(), Some("a"));
        assert_eq!(msgs[2].content, "2");
        assert_eq!(msgs[3].tool_call_id.as_deref(), Some("b"));
        assert_eq!(msgs[3].content, "now");
    }

    #[test]
    fn test_repeated_call_ids_keep_their_own_outputs() {
        let mut thread = Thread::new("t1");
        let calls = vec![
            ToolCallRequest::new("dup", "calculator", json!({"expression": "1"})),
            ToolCallRequest::new("dup", "calculator", json!({"expression": "2"})),
            ToolCallRequest::new("dup", "calculator", json!({"expression": "3"})),
        ];
        thread.push_tool_exchange(calls, vec!["uno".into(), "dos".into(), "tres".into()]);

        let contents: Vec<&str> = thread.messages()[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["uno", "dos", "tres"]);
    }

    #[test]
    fn test_tool_exchange_never_leaves_call_unanswered() {
        let mut thread = Thread::new("t1");
        thread.push_tool_exchange(
            vec![
                ToolCallRequest::new("x", "search_web", json!({"query": "rust"})),
                ToolCallRequest::new("y", "search_web", json!({"query": "tokio"})),
            ],
            vec!["ok".to_string()],
        );
        assert_eq!(thread.len(), 3);
        assert_eq!(thread.messages()[1].content, "ok");
        assert!(thread.messages()[2].content.starts_with("Error:"));
    }

    #[test]
    fn test_message_serialization_omits_empty_fields() {
        let v = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(v, json!({"role": "user", "content": "hi"}));
        let v = serde_json::to_value(Message::tool_result("id1", "4")).unwrap();
        assert_eq!(v["role"], "tool");
        assert_eq!(v["tool_call_id"], "id1");
    }
}
