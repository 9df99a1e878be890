//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MAF__*` 覆盖（双下划线表示嵌套，如 `MAF__AGENT__MAX_ITERATIONS=5`），
//! 最后叠加部署环境常用变量：OPENAI_API_KEY、MODEL_ID、OPENAI_BASE_URL、HOST、PORT。

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_INSTRUCTIONS: &str = "Eres un asistente inteligente y amigable desplegado en producción.

Tus capacidades:
- Consultar el clima de cualquier ubicación
- Buscar información en la web
- Realizar cálculos matemáticos
- Dar la fecha y hora actual

Responde siempre en español de manera clara y útil.
Si no puedes ayudar con algo, explícalo amablemente.";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub server: ServerSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
}

/// [app] 段：助手名称与系统指令
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    pub instructions: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "AsistenteMAF".to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

/// [server] 段：监听地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// [llm] 段：远端模型与凭据
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// 单次模型请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl LlmSection {
    /// 非空的 API Key
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// [agent] 段：编排循环
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 单个回合内模型调用次数上限
    pub max_iterations: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self { max_iterations: 10 }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub timeout_secs: u64,
    /// 天气、搜索工具的模拟响应延迟（毫秒），0 表示立即返回
    pub simulated_latency_ms: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            simulated_latency_ms: 0,
        }
    }
}

/// 部署环境变量 -> 配置键
const ENV_OVERRIDES: [(&str, &str); 5] = [
    ("OPENAI_API_KEY", "llm.api_key"),
    ("MODEL_ID", "llm.model"),
    ("OPENAI_BASE_URL", "llm.base_url"),
    ("HOST", "server.host"),
    ("PORT", "server.port"),
];

/// 从 config 目录加载配置，环境变量可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 MAF__*（双下划线表示嵌套键）
/// 4. 叠加 OPENAI_API_KEY / MODEL_ID / OPENAI_BASE_URL / HOST / PORT
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    load_config_with_env(config_path, |key| std::env::var(key).ok())
}

/// 同 load_config，但第 4 步的变量由 lookup 提供
pub fn load_config_with_env(
    config_path: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MAF")
            .separator("__")
            .try_parsing(true),
    );

    for (var, key) in ENV_OVERRIDES {
        let value = lookup(var).filter(|v| !v.trim().is_empty());
        builder = builder.set_override_option(key, value)?;
    }

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert_eq!(cfg.agent.max_iterations, 10);
        assert!(cfg.llm.api_key().is_none());
        assert!(cfg.app.instructions.contains("español"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[agent]\nmax_iterations = 3\n\n[llm]\nmodel = \"gpt-4o\"\ntimeout_secs = 5"
        )
        .unwrap();

        let cfg = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(cfg.agent.max_iterations, 3);
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert_eq!(cfg.llm.timeout_secs, 5);
        assert_eq!(cfg.tools.timeout_secs, 30);
        assert_eq!(cfg.tools.simulated_latency_ms, 0);
    }

    #[test]
    fn test_deployment_env_overrides() {
        let cfg = load_config_with_env(None, |key| match key {
            "OPENAI_API_KEY" => Some("sk-abc".to_string()),
            "MODEL_ID" => Some("gpt-4.1-mini".to_string()),
            "PORT" => Some("9090".to_string()),
            "HOST" => Some("   ".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.llm.api_key(), Some("sk-abc"));
        assert_eq!(cfg.llm.model, "gpt-4.1-mini");
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "0.0.0.0");
    }

    #[test]
    fn test_blank_api_key_is_none() {
        let llm = LlmSection {
            api_key: Some("  ".to_string()),
            ..LlmSection::default()
        };
        assert!(llm.api_key().is_none());
    }
}
