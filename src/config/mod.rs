use std::env;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub generation: GenerationConfig,
    pub request: RequestConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Sampling parameters for the two call shapes (conversational and JSON)
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub chat_max_output_tokens: u32,
    pub chat_temperature: f64,
    pub json_temperature: f64,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    /// Longest silence tolerated between two chunks of a streamed reply
    pub stream_idle_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gemini = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| AppError::Config {
                    message: "GEMINI_API_KEY is required".to_string(),
                })?,
            base_url: env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
        };

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            chat_max_output_tokens: parse_var("CHAT_MAX_OUTPUT_TOKENS")
                .unwrap_or(defaults.chat_max_output_tokens),
            chat_temperature: parse_var("CHAT_TEMPERATURE").unwrap_or(defaults.chat_temperature),
            json_temperature: parse_var("JSON_TEMPERATURE").unwrap_or(defaults.json_temperature),
        };

        let defaults = RequestConfig::default();
        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS").unwrap_or(defaults.timeout_ms),
            stream_idle_timeout_ms: parse_var("STREAM_IDLE_TIMEOUT_MS")
                .unwrap_or(defaults.stream_idle_timeout_ms),
            max_retries: parse_var("MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_delay_ms: parse_var("RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
        };

        let server = ServerConfig {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| ServerConfig::default().bind_addr),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            gemini,
            generation,
            request,
            server,
            logging,
        })
    }
}

/// Read and parse an environment variable, `None` when unset or malformed
fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            chat_max_output_tokens: 2000,
            chat_temperature: 0.7,
            json_temperature: 0.2,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            stream_idle_timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
