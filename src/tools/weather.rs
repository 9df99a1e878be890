//! 天气工具（模拟数据）

use rand::Rng;
use schemars::JsonSchema;
use serde::Deserialize;

const CONDITIONS: [&str; 4] = ["soleado", "nublado", "lluvioso", "tormentoso"];

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WeatherArgs {
    /// La ubicación para obtener el clima.
    pub location: String,
}

pub fn get_weather(args: WeatherArgs) -> Result<String, String> {
    let location = args.location.trim();
    if location.is_empty() {
        return Err("location is required".to_string());
    }
    let mut rng = rand::thread_rng();
    let condition = CONDITIONS[rng.gen_range(0..CONDITIONS.len())];
    let max_temp: u8 = rng.gen_range(15..=35);
    Ok(format!(
        "El clima en {location} es {condition} con una temperatura máxima de {max_temp}°C."
    ))
}
