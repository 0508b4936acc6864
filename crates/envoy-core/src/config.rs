use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 18789;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";
pub const MAX_STEPS: usize = 10;
pub const SANDBOX_TIMEOUT_SECS: u64 = 30;

/// Top-level config (envoy.toml + ENVOY_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvoyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

impl Default for EnvoyConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            llm: LlmConfig {
                api_key: String::new(),
                base_url: default_base_url(),
                model: default_model(),
            },
            database: DatabaseConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
        }
    }
}

/// The one configured LLM endpoint. No provider routing table: a single
/// Anthropic-compatible Messages API endpoint is all the agent loop needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Bounds for the built-in filesystem tools and the sandboxed executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_fs_root")]
    pub fs_root: String,
    #[serde(default)]
    pub shell_enabled: bool,
    #[serde(default = "default_env_file")]
    pub env_file: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            fs_root: default_fs_root(),
            shell_enabled: false,
            env_file: default_env_file(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.envoy/envoy.db")
}
fn default_fs_root() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.envoy/workspace")
}
fn default_env_file() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.envoy/env")
}

impl EnvoyConfig {
    /// Load config from a TOML file with ENVOY_* env var overrides.
    ///
    /// Checks in order: explicit path argument, then `~/.envoy/envoy.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let mut config: EnvoyConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("ENVOY_").split("_"))
            .extract()
            .map_err(|e| crate::error::EnvoyError::Config(e.to_string()))?;

        config.apply_bare_env_overrides();
        Ok(config)
    }

    /// Overlays the handful of bare (unprefixed) env vars the server
    /// surface is documented to accept directly — `LLM_API_KEY` rather
    /// than `ENVOY_LLM_API_KEY` — on top of whatever the file/`ENVOY_*`
    /// layer produced. Applied last so these always win.
    fn apply_bare_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            self.llm.api_key = v;
        }
        if let Ok(v) = std::env::var("LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("DATABASE_PATH") {
            self.database.path = v;
        }
        if let Ok(v) = std::env::var("TOOLS_FS_ROOT") {
            self.tools.fs_root = v;
        }
        if let Ok(v) = std::env::var("TOOLS_SHELL_ENABLED") {
            self.tools.shell_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(port) = v.parse() {
                self.server.port = port;
            }
        }
        if let Ok(v) = std::env::var("ENVOY_ENV_FILE") {
            self.tools.env_file = v;
        }
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{home}/.envoy/envoy.toml")
}
