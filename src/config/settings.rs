//! Application configuration settings
//!
//! Process settings loaded from environment variables (and an optional `.env` file)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub tokenizer: TokenizerConfig,
    pub orchestrator: OrchestratorConfig,
    pub providers: ProviderCredentials,
    pub request: RequestConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// BPE encoding loaded by the local backend
    pub encoding: String,
    /// Remote tokenizer endpoint; when set it replaces the local backend
    pub remote_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Delay between the last edit and tokenization, in milliseconds
    pub debounce_ms: u64,
}

/// Credentials and base URLs of the hosted providers
///
/// Every field is optional on purpose: a missing credential fails the calls
/// that need it and nothing else.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub replicate_api_token: Option<String>,
    pub replicate_base_url: String,
    /// Interval between prediction status polls, in milliseconds
    pub replicate_poll_interval_ms: u64,
    pub openai_api_key: Option<String>,
    pub deepseek_api_base: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Body size limit in bytes
    pub max_request_size: usize,
}

/// CORS policy; an empty or `*` origin list allows any origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub cors_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `info,promptprint=debug`
    pub level: String,
    /// `text` or `json`
    pub format: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("replicate_api_token", &self.replicate_api_token.as_ref().map(|_| "***"))
            .field("replicate_base_url", &self.replicate_base_url)
            .field("replicate_poll_interval_ms", &self.replicate_poll_interval_ms)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("deepseek_api_base", &self.deepseek_api_base)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            tokenizer: TokenizerConfig {
                encoding: "gpt2".to_string(),
                remote_url: None,
            },
            orchestrator: OrchestratorConfig { debounce_ms: 500 },
            providers: ProviderCredentials {
                replicate_api_token: None,
                replicate_base_url: "https://api.replicate.com/v1".to_string(),
                replicate_poll_interval_ms: 1000,
                openai_api_key: None,
                deepseek_api_base: None,
            },
            request: RequestConfig {
                max_request_size: 1024 * 1024,
            },
            security: SecurityConfig {
                allowed_origins: vec!["*".to_string()],
                cors_enabled: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

impl Settings {
    /// Read settings from the environment, after merging `.env` when present
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let settings = Self {
            server: ServerConfig {
                host: get_env_or_default("SERVER_HOST", &defaults.server.host),
                port: parse_env("SERVER_PORT", defaults.server.port, "Invalid port number")?,
            },
            tokenizer: TokenizerConfig {
                encoding: get_env_or_default("TOKENIZER_ENCODING", &defaults.tokenizer.encoding),
                remote_url: get_env_opt("TOKENIZER_URL"),
            },
            orchestrator: OrchestratorConfig {
                debounce_ms: parse_env(
                    "DEBOUNCE_MS",
                    defaults.orchestrator.debounce_ms,
                    "Invalid debounce delay",
                )?,
            },
            providers: ProviderCredentials {
                replicate_api_token: get_env_opt("REPLICATE_API_TOKEN"),
                replicate_base_url: get_env_or_default(
                    "REPLICATE_BASE_URL",
                    &defaults.providers.replicate_base_url,
                ),
                replicate_poll_interval_ms: parse_env(
                    "REPLICATE_POLL_INTERVAL_MS",
                    defaults.providers.replicate_poll_interval_ms,
                    "Invalid Replicate poll interval",
                )?,
                openai_api_key: get_env_opt("OPENAI_API_KEY"),
                deepseek_api_base: get_env_opt("DEEPSEEK_API_BASE"),
            },
            request: RequestConfig {
                max_request_size: parse_env(
                    "MAX_REQUEST_SIZE",
                    defaults.request.max_request_size,
                    "Invalid maximum request size",
                )?,
            },
            security: SecurityConfig {
                allowed_origins: get_env_or_default("ALLOWED_ORIGINS", "*")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                cors_enabled: parse_env("CORS_ENABLED", true, "Invalid CORS enabled flag")?,
            },
            logging: LoggingConfig {
                level: get_env_or_default("RUST_LOG", "info"),
                format: get_env_or_default("LOG_FORMAT", "text"),
            },
        };

        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Port number cannot be 0");
        }

        if self.orchestrator.debounce_ms == 0 {
            anyhow::bail!("Debounce delay cannot be 0");
        }

        if self.providers.replicate_poll_interval_ms == 0 {
            anyhow::bail!("Replicate poll interval cannot be 0");
        }

        require_http("Replicate base URL", Some(&self.providers.replicate_base_url))?;
        require_http("DeepSeek API base", self.providers.deepseek_api_base.as_ref())?;
        require_http("tokenizer URL", self.tokenizer.remote_url.as_ref())?;

        if self.request.max_request_size == 0 {
            anyhow::bail!("Maximum request size cannot be 0");
        }

        EnvFilter::try_new(&self.logging.level)
            .map_err(|e| anyhow::anyhow!("Invalid log level: {} ({})", self.logging.level, e))?;

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        Ok(())
    }

    /// Debounce delay as a duration
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.orchestrator.debounce_ms)
    }
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T, message: &'static str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().context(message),
        Err(_) => Ok(default),
    }
}

fn require_http(label: &str, url: Option<&String>) -> Result<()> {
    match url {
        Some(url) if !url.starts_with("http") => {
            anyhow::bail!("Invalid {} format, should start with 'http'", label)
        }
        _ => Ok(()),
    }
}

/// Get a non-empty environment variable
fn get_env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
