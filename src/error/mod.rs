use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Model service error: {0}")]
    Llm(#[from] LlmError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors talking to the generative model service
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Model service unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Request cancelled")]
    Cancelled,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures decoding a one-shot model reply into a domain type
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to parse {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Session protocol violations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Session has not been started")]
    NotStarted,

    #[error("Session is complete; restart to validate another idea")]
    Complete,

    #[error("Model returned an empty response")]
    EmptyResponse,
}

impl AppError {
    /// HTTP-equivalent status: input errors are 400, everything else 500
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Session(SessionError::Validation { .. }) => 400,
            _ => 500,
        }
    }

    /// Whether the failure originated from caller input
    pub fn is_input_error(&self) -> bool {
        self.status_code() == 400
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for model service operations
pub type LlmResult<T> = Result<T, LlmError>;
