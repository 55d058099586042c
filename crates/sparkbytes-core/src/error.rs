use thiserror::Error;

/// Message shown for any failure the visitor cannot act on.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again.";

#[derive(Debug, Error)]
pub enum SparkError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,

    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for SparkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl SparkError {
    /// Text to show the visitor. Server-provided messages are surfaced
    /// verbatim; `fallback` covers HTTP errors that carried no message.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                message: Some(m), ..
            } => m.clone(),
            Self::Status { message: None, .. } => fallback.to_string(),
            Self::Rejected(m) | Self::Validation(m) => m.clone(),
            Self::Transport(_)
            | Self::Timeout
            | Self::Cancelled
            | Self::Serialization(_)
            | Self::Config(_) => UNEXPECTED_ERROR.to_string(),
        }
    }

    /// HTTP status of a backend error response, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure happened below HTTP (no response was read).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout | Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, SparkError>;
