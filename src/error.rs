use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("cannot open {}: {reason}", .path.display())]
    InputUnavailable { path: PathBuf, reason: String },

    #[error("video duration {duration_secs:.2}s exceeds the {limit_secs:.2}s limit")]
    DurationExceeded { duration_secs: f64, limit_secs: f64 },

    #[error("invalid mode `{0}`, expected `image` or `video`")]
    InvalidMode(String),

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("malformed detection recording: {0}")]
    Recording(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn input_unavailable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InputUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Short machine-readable name for the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputUnavailable { .. } => "input_unavailable",
            Self::DurationExceeded { .. } => "duration_exceeded",
            Self::InvalidMode(_) => "invalid_mode",
            Self::Configuration { .. } => "configuration",
            Self::Recording(_) => "recording",
            Self::Io(_) => "io",
        }
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
