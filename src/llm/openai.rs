//! OpenAI 兼容 Chat Completions 客户端（function calling）
//!
//! 直接用 reqwest 调用 `{base_url}/chat/completions`：请求前插入 system 指令，附带工具 schema，
//! `tool_choice = "auto"`。工具调用意图以 assistant.tool_calls 回传，工具结果以 role=tool + tool_call_id 回传。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmSection;
use crate::llm::{ModelClient, ModelError, ModelResponse, TokenTotals};
use crate::memory::{Message, Role, ToolCallRequest};
use crate::tools::ToolDefinition;

/// 按响应中的 usage 字段累加
#[derive(Debug, Default)]
struct UsageCounter {
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl UsageCounter {
    fn record(&self, usage: &Usage) {
        self.prompt_tokens.fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);
    }

    fn totals(&self) -> TokenTotals {
        TokenTotals {
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    /// JSON 编码的参数字符串
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// OpenAI 兼容客户端
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    instructions: String,
    timeout_secs: u64,
    usage: UsageCounter,
}

impl OpenAiClient {
    pub fn new(
        settings: &LlmSection,
        api_key: &str,
        instructions: &str,
    ) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ModelError::Http(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            instructions: instructions.to_string(),
            timeout_secs: settings.timeout_secs,
            usage: UsageCounter::default(),
        })
    }

    fn request_body<'a>(&'a self, history: &[Message], tools: &'a [ToolDefinition]) -> ChatRequest<'a> {
        build_request(&self.model, &self.instructions, history, tools)
    }
}

fn to_wire_message(m: &Message) -> WireMessage {
    let tool_calls: Vec<WireToolCall> = m
        .tool_calls
        .iter()
        .map(|c| WireToolCall {
            id: c.id.clone(),
            kind: function_kind(),
            function: WireFunctionCall {
                name: c.name.clone(),
                arguments: c.arguments.to_string(),
            },
        })
        .collect();
    // 带 tool_calls 的 assistant 消息内容可为空（null）
    let content = if !tool_calls.is_empty() && m.content.is_empty() {
        None
    } else {
        Some(m.content.clone())
    };
    WireMessage {
        role: m.role,
        content,
        tool_calls,
        tool_call_id: m.tool_call_id.clone(),
    }
}

fn build_request<'a>(
    model: &'a str,
    instructions: &str,
    history: &[Message],
    tools: &'a [ToolDefinition],
) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if !instructions.trim().is_empty() {
        messages.push(to_wire_message(&Message::system(instructions)));
    }
    messages.extend(history.iter().map(to_wire_message));

    let tools: Vec<WireTool<'a>> = tools
        .iter()
        .map(|d| WireTool {
            kind: "function",
            function: WireFunction {
                name: d.name,
                description: d.description,
                parameters: &d.parameters,
            },
        })
        .collect();
    let tool_choice = if tools.is_empty() { None } else { Some("auto") };

    ChatRequest {
        model,
        messages,
        tools,
        tool_choice,
    }
}

/// 解析首个 choice：有 tool_calls 则为 ToolCalls，否则取 content 作为 FinalAnswer
fn parse_response(response: ChatResponse) -> Result<ModelResponse, ModelError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| ModelError::Malformed("response has no choices".to_string()))?;

    let calls = message.tool_calls.unwrap_or_default();
    if !calls.is_empty() {
        let requests = calls
            .into_iter()
            .map(|c| {
                let raw = c.function.arguments.trim();
                let arguments = if raw.is_empty() {
                    Value::Object(Default::default())
                } else {
                    serde_json::from_str(raw).map_err(|e| {
                        ModelError::Malformed(format!(
                            "arguments for {} are not valid JSON: {e}",
                            c.function.name
                        ))
                    })?
                };
                Ok(ToolCallRequest::new(c.id, c.function.name, arguments))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        return Ok(ModelResponse::ToolCalls(requests));
    }

    match message.content {
        Some(text) => Ok(ModelResponse::FinalAnswer(text)),
        None => Err(ModelError::Malformed(
            "response has neither content nor tool calls".to_string(),
        )),
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(
        &self,
        history: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, ModelError> {
        let body = self.request_body(history, tools);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.timeout_secs)
                } else {
                    ModelError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(self.timeout_secs)
            } else {
                ModelError::Malformed(e.to_string())
            }
        })?;

        if let Some(usage) = &parsed.usage {
            self.usage.record(usage);
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "model usage"
            );
        }

        parse_response(parsed)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn token_usage(&self) -> TokenTotals {
        self.usage.totals()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use serde_json::json;

    #[test]
    fn test_request_prepends_instructions_and_lists_tools() {
        let registry = ToolRegistry::builtin();
        let history = vec![Message::user("¿Qué hora es?")];
        let body = build_request("gpt-4o-mini", "Responde en español.", &history, registry.definitions());
        let v = serde_json::to_value(&body).unwrap();

        assert_eq!(v["model"], "gpt-4o-mini");
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["tool_choice"], "auto");
        assert_eq!(v["tools"].as_array().unwrap().len(), 4);
        assert_eq!(v["tools"][2]["type"], "function");
        assert_eq!(v["tools"][2]["function"]["name"], "calculator");
    }

    #[test]
    fn test_tool_exchange_round_trips_on_the_wire() {
        let mut thread = crate::memory::Thread::new("t");
        thread.push(Message::user("2+2?"));
        thread.push_tool_exchange(
            vec![ToolCallRequest::new("call_1", "calculator", json!({"expression": "2+2"}))],
            vec!["El resultado de 2+2 es: 4".to_string()],
        );
        let body = build_request("m", "", thread.messages(), &[]);
        let v = serde_json::to_value(&body).unwrap();

        let intent = &v["messages"][1];
        assert_eq!(intent["role"], "assistant");
        assert!(intent.get("content").is_none());
        assert_eq!(intent["tool_calls"][0]["id"], "call_1");
        assert_eq!(intent["tool_calls"][0]["type"], "function");
        let args: Value =
            serde_json::from_str(intent["tool_calls"][0]["function"]["arguments"].as_str().unwrap())
                .unwrap();
        assert_eq!(args, json!({"expression": "2+2"}));

        let result = &v["messages"][2];
        assert_eq!(result["role"], "tool");
        assert_eq!(result["tool_call_id"], "call_1");
        assert!(v.get("tools").is_none());
    }

    #[test]
    fn test_parse_final_answer() {
        let raw = json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 1, "total_tokens": 11}
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(
            parse_response(parsed).unwrap(),
            ModelResponse::FinalAnswer("4".to_string())
        );
    }

    #[test]
    fn test_parse_tool_calls() {
        let raw = json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [
                    {"id": "a", "type": "function", "function": {"name": "calculator", "arguments": "{\"expression\":\"2+2\"}"}},
                    {"id": "b", "type": "function", "function": {"name": "get_current_time", "arguments": ""}}
                ]
            }}]
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        match parse_response(parsed).unwrap() {
            ModelResponse::ToolCalls(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].arguments, json!({"expression": "2+2"}));
                assert_eq!(calls[1].arguments, json!({}));
            }
            other => panic!("Expected ToolCalls, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_arguments_and_empty_choices() {
        let raw = json!({
            "choices": [{"message": {"tool_calls": [
                {"id": "a", "function": {"name": "calculator", "arguments": "{not json"}}
            ]}}]
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        assert!(matches!(parse_response(parsed), Err(ModelError::Malformed(_))));

        let parsed: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(parse_response(parsed), Err(ModelError::Malformed(_))));
    }

    #[test]
    fn test_usage_accumulates_across_responses() {
        let client = OpenAiClient::new(&LlmSection::default(), "sk-test", "").unwrap();
        assert_eq!(client.token_usage(), TokenTotals::default());

        for raw in [
            json!({"choices": [], "usage": {"prompt_tokens": 10, "completion_tokens": 2}}),
            json!({"choices": [], "usage": {"prompt_tokens": 5, "completion_tokens": 1}}),
        ] {
            let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
            client.usage.record(parsed.usage.as_ref().unwrap());
        }
        let totals = client.token_usage();
        assert_eq!(totals.prompt_tokens, 15);
        assert_eq!(totals.completion_tokens, 3);
        assert_eq!(totals.total(), 18);
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let settings = LlmSection {
            base_url: "https://example.test/v1/".to_string(),
            ..LlmSection::default()
        };
        let client = OpenAiClient::new(&settings, "sk-test", "").unwrap();
        assert_eq!(client.endpoint, "https://example.test/v1/chat/completions");
        assert_eq!(client.model_id(), settings.model);
    }
}
