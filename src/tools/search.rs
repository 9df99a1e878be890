//! 网页搜索工具（模拟结果）

use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchArgs {
    /// La consulta de búsqueda.
    pub query: String,
}

pub fn search_web(args: SearchArgs) -> Result<String, String> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err("query is required".to_string());
    }
    Ok(format!(
        "Resultados de búsqueda para '{query}': Se encontraron varios artículos relevantes sobre el tema."
    ))
}
