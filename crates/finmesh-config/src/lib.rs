//! Environment-variable configuration for every finmesh service.
//!
//! Each service reads the sections it needs via `from_env`; unset variables
//! fall back to development defaults so a bare `cargo run` starts a working
//! local topology.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value}")]
    Invalid { var: String, value: String },
}

fn env_string(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_opt(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var: var.to_string(),
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn env_bool(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

/// HTTP server settings shared by all services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl ServerConfig {
    pub fn from_env(default_port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            host: env_string("SERVER_HOST", "0.0.0.0"),
            port: env_parse("SERVER_PORT", default_port)?,
            read_timeout_secs: env_parse("SERVER_READ_TIMEOUT", 30)?,
            write_timeout_secs: env_parse("SERVER_WRITE_TIMEOUT", 30)?,
            idle_timeout_secs: env_parse("SERVER_IDLE_TIMEOUT", 120)?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// API-key auth and rate-limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Header carrying the shared secret.
    pub api_key_header: String,
    /// Expected key value. When unset, only header presence is enforced.
    pub api_key: Option<String>,
    pub jwt_secret: Option<String>,
    pub rate_limit_rps: u32,
}

impl SecurityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key_header: env_string("SECURITY_API_KEY_HEADER", "X-API-Key"),
            api_key: env_opt("SECURITY_API_KEY"),
            jwt_secret: env_opt("SECURITY_JWT_SECRET"),
            rate_limit_rps: env_parse("SECURITY_RATE_LIMIT_RPS", 50)?,
        })
    }
}

/// LLM provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    Openai,
}

/// LLM completion and embedding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub provider: LlmProvider,
    pub base_url: String,
    pub model: String,
    pub embed_model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match env_string("LLM_PROVIDER", "ollama").to_ascii_lowercase().as_str() {
            "openai" => LlmProvider::Openai,
            "ollama" => LlmProvider::Ollama,
            other => {
                return Err(ConfigError::Invalid {
                    var: "LLM_PROVIDER".to_string(),
                    value: other.to_string(),
                })
            }
        };
        Ok(Self {
            enabled: env_bool("LLM_ENABLED", false),
            provider,
            base_url: env_string("LLM_BASE_URL", "http://localhost:11434"),
            model: env_string("LLM_MODEL", "llama3"),
            embed_model: env_string("LLM_EMBED_MODEL", "nomic-embed-text"),
            api_key: env_opt("LLM_API_KEY"),
            temperature: env_parse("LLM_TEMPERATURE", 0.2)?,
            max_tokens: env_parse("LLM_MAX_TOKENS", 1024)?,
        })
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(120)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}

/// ML prediction service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
}

impl MlConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: env_bool("ML_MODELS_ENABLED", false),
            base_url: env_string("ML_MODELS_URL", "http://localhost:9000"),
            api_key: env_opt("ML_MODELS_API_KEY"),
        })
    }
}

/// Banking-integrations service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankingConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
}

impl BankingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: env_bool("BANKING_INTEGRATIONS_ENABLED", false),
            base_url: env_string("BANKING_INTEGRATIONS_URL", "http://localhost:7000"),
            api_key: env_opt("BANKING_INTEGRATIONS_API_KEY"),
        })
    }
}

/// Task controller client settings (used by the gateway and by agents for
/// self-registration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_string("MCP_SERVER_URL", "http://localhost:8080"),
            api_key: env_string("MCP_SERVER_API_KEY", "dev-key"),
            timeout_secs: env_parse("MCP_SERVER_TIMEOUT", 30)?,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Agent process identity, selected at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentityConfig {
    pub agent_type: String,
    pub name: String,
    pub endpoint: String,
    pub auto_register: bool,
}

impl AgentIdentityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let agent_type = env_string("AGENT_TYPE", "BANKING").to_ascii_uppercase();
        let default_name = format!("{}-agent", agent_type.to_ascii_lowercase());
        Ok(Self {
            name: env_string("AGENT_NAME", &default_name),
            endpoint: env_string("AGENT_ENDPOINT", "http://localhost:8001"),
            auto_register: env_bool("AGENT_AUTO_REGISTER", true),
            agent_type,
        })
    }
}

/// Result-polling budget used by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    pub retries: u32,
    pub interval_ms: u64,
}

impl PollConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            retries: env_parse("ORCHESTRATOR_POLL_RETRIES", 10)?,
            interval_ms: env_parse("ORCHESTRATOR_POLL_INTERVAL_MS", 500)?,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Logging settings; binaries feed these into tracing-subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            level: env_string("LOGGING_LEVEL", "info"),
            json: env_string("LOGGING_FORMAT", "text").eq_ignore_ascii_case("json"),
        }
    }
}
