//! 工具注册表
//!
//! 工具集合是封闭的：BuiltinTool 每个变体对应一个工具，启动时按名字建成静态映射，之后只读。
//! 按名查找失败返回 ToolNotRegistered，工具自身失败返回 ToolExecutionFailed（带工具名与原因）。

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::AgentError;
use crate::tools::{calculator, clock, schema::parameters_schema, search, weather};

/// 内置工具
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    Weather,
    Search,
    Calculator,
    Clock,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 4] = [
        BuiltinTool::Weather,
        BuiltinTool::Search,
        BuiltinTool::Calculator,
        BuiltinTool::Clock,
    ];

    /// 工具名称（function calling 中的 name）
    pub fn name(self) -> &'static str {
        match self {
            BuiltinTool::Weather => "get_weather",
            BuiltinTool::Search => "search_web",
            BuiltinTool::Calculator => "calculator",
            BuiltinTool::Clock => "get_current_time",
        }
    }

    /// 工具描述（供模型理解功能）
    pub fn description(self) -> &'static str {
        match self {
            BuiltinTool::Weather => "Obtiene el clima para una ubicación dada.",
            BuiltinTool::Search => "Busca información en la web.",
            BuiltinTool::Calculator => "Calcula una expresión matemática.",
            BuiltinTool::Clock => "Obtiene la fecha y hora actual.",
        }
    }

    pub fn parameters_schema(self) -> Value {
        match self {
            BuiltinTool::Weather => parameters_schema::<weather::WeatherArgs>(),
            BuiltinTool::Search => parameters_schema::<search::SearchArgs>(),
            BuiltinTool::Calculator => parameters_schema::<calculator::CalculatorArgs>(),
            BuiltinTool::Clock => parameters_schema::<clock::ClockArgs>(),
        }
    }

    /// 模拟外部服务的工具（天气、搜索）；计算器与时钟在本地完成
    pub fn is_remote(self) -> bool {
        matches!(self, BuiltinTool::Weather | BuiltinTool::Search)
    }

    /// 执行工具；参数解析失败与工具失败都以 Err(原因) 返回
    pub async fn execute(self, args: Value) -> Result<String, String> {
        match self {
            BuiltinTool::Weather => weather::get_weather(parse_args(args)?),
            BuiltinTool::Search => search::search_web(parse_args(args)?),
            BuiltinTool::Calculator => calculator::calculate(parse_args(args)?),
            BuiltinTool::Clock => clock::get_current_time(parse_args(args)?),
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, String> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| format!("invalid arguments: {e}"))
}

/// 工具定义：名称、描述、参数 schema 与对应的内置实现；注册后不再修改
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
    tool: BuiltinTool,
}

impl ToolDefinition {
    pub fn new(tool: BuiltinTool) -> Self {
        Self {
            name: tool.name(),
            description: tool.description(),
            parameters: tool.parameters_schema(),
            tool,
        }
    }

    pub fn tool(&self) -> BuiltinTool {
        self.tool
    }
}

/// 工具注册表：保持注册顺序（发给模型的工具列表稳定），按名索引
#[derive(Debug, Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    index: HashMap<&'static str, usize>,
    /// 远端类工具每次调用前的模拟延迟
    latency: Duration,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部内置工具
    pub fn builtin() -> Self {
        Self::with_tools(BuiltinTool::ALL)
    }

    pub fn with_tools(tools: impl IntoIterator<Item = BuiltinTool>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// 为远端类工具加上固定的响应延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 同名重复注册保持首次注册的位置
    fn register(&mut self, tool: BuiltinTool) {
        if self.index.contains_key(tool.name()) {
            return;
        }
        self.index.insert(tool.name(), self.definitions.len());
        self.definitions.push(ToolDefinition::new(tool));
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolDefinition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String, AgentError> {
        let definition = self
            .lookup(name)
            .ok_or_else(|| AgentError::ToolNotRegistered(name.to_string()))?;
        if definition.tool().is_remote() && !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        definition
            .tool()
            .execute(args)
            .await
            .map_err(|cause| AgentError::ToolExecutionFailed {
                tool: name.to_string(),
                cause,
            })
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.name.to_string()).collect()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_names_resolve() {
        let registry = ToolRegistry::builtin();
        assert_eq!(
            registry.tool_names(),
            vec!["get_weather", "search_web", "calculator", "get_current_time"]
        );
        for tool in BuiltinTool::ALL {
            assert_eq!(registry.lookup(tool.name()).unwrap().tool(), tool);
        }
        assert!(registry.lookup("rm_rf").is_none());
    }

    #[test]
    fn test_duplicate_registration_ignored() {
        let registry = ToolRegistry::with_tools([BuiltinTool::Clock, BuiltinTool::Clock]);
        assert_eq!(registry.definitions().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_calculator() {
        let registry = ToolRegistry::builtin();
        let out = registry
            .execute("calculator", json!({"expression": "2+2"}))
            .await
            .unwrap();
        assert!(out.ends_with(": 4"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_defined_error() {
        let registry = ToolRegistry::builtin();
        let err = registry.execute("teleport", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotRegistered(ref n) if n == "teleport"));
    }

    #[tokio::test]
    async fn test_bad_arguments_carry_tool_name() {
        let registry = ToolRegistry::builtin();
        let err = registry
            .execute("get_weather", json!({"city": "Lima"}))
            .await
            .unwrap_err();
        match err {
            AgentError::ToolExecutionFailed { tool, cause } => {
                assert_eq!(tool, "get_weather");
                assert!(cause.contains("location"));
            }
            other => panic!("Expected ToolExecutionFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_latency_applies_to_remote_tools_only() {
        let registry = ToolRegistry::builtin().with_latency(Duration::from_millis(150));

        let start = std::time::Instant::now();
        registry
            .execute("calculator", json!({"expression": "1+1"}))
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(100));

        let start = std::time::Instant::now();
        registry
            .execute("search_web", json!({"query": "tokio"}))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_clock_accepts_null_arguments() {
        let registry = ToolRegistry::builtin();
        assert!(registry.execute("get_current_time", Value::Null).await.is_ok());
    }

    #[test]
    fn test_schemas_are_objects() {
        for def in ToolRegistry::builtin().definitions() {
            assert_eq!(def.parameters["type"], "object", "{}", def.name);
        }
        let calc = ToolRegistry::builtin();
        let calc = calc.lookup("calculator").unwrap();
        assert_eq!(calc.parameters["required"][0], "expression");
    }
}
