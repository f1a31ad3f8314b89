//! Error taxonomy for calibration runs.
//!
//! Every failure is structural (bad configuration or bad data), never transient,
//! so nothing here is retried. The binary maps each variant to an exit code.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PhotoCalError {
    /// Invalid or ambiguous configuration. Raised before any fit work begins.
    #[error("configuration error: {0}")]
    Config(String),

    /// Too few sources survived a stage of the calibration.
    #[error("insufficient data at {stage}: found {found}, need at least {required}")]
    InsufficientData {
        stage: &'static str,
        found: usize,
        required: usize,
    },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl PhotoCalError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn insufficient(stage: &'static str, found: usize, required: usize) -> Self {
        Self::InsufficientData {
            stage,
            found,
            required,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Io(_) | Self::Parse(_) => 2,
            Self::InsufficientData { .. } => 3,
        }
    }
}
