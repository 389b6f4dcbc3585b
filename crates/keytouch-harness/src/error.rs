use std::path::PathBuf;

use keytouch_core::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid scenario: {message}")]
    InvalidScenario { message: String },

    #[error("golden mismatch for {path}: expected {expected}, got {actual}")]
    GoldenMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl HarnessError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::GoldenMismatch { .. } => 2,
            Self::InvalidScenario { .. } | Self::Config(_) => 3,
            _ => 1,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidScenario {
            message: message.into(),
        }
    }
}
