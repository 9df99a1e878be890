//! 时钟工具：当前本地日期与时间

use schemars::JsonSchema;
use serde::Deserialize;

/// 无参数
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ClockArgs {}

pub fn get_current_time(_args: ClockArgs) -> Result<String, String> {
    let now = chrono::Local::now();
    Ok(format!(
        "La fecha y hora actual es: {}",
        now.format("%d/%m/%Y %H:%M:%S")
    ))
}
