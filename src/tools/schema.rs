//! 工具参数 JSON Schema 生成（schemars 从参数结构体派生）
//!
//! 生成结果直接作为 function calling 的 `parameters` 字段发给模型。

use schemars::{schema_for, JsonSchema};
use serde_json::{json, Value};

/// 为参数类型 T 生成 function calling 可用的 schema：去掉 `$schema` / `title`，保证有 properties
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("type").or_insert_with(|| json!("object"));
        obj.entry("properties").or_insert_with(|| json!({}));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Sample {
        /// 查询内容
        query: String,
    }

    #[allow(dead_code)]
    #[derive(JsonSchema)]
    struct Empty {}

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = parameters_schema::<Sample>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"][0], "query");
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
    }

    #[test]
    fn test_empty_args_still_object() {
        let schema = parameters_schema::<Empty>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"].is_object());
    }
}
