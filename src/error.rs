//! Error types for layergen

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// layergen errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed parameters or override document. Fatal to the run.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid service definition. Fatal to the run.
    #[error("Definition error: {0}")]
    Definition(String),

    #[error("Render error in {template}: {message}")]
    Render { template: String, message: String },

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("Duplicate target path: {0}")]
    DuplicatePath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Merge failures raised by the regeneration policy engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("anchor not found in existing file: {anchor:?}")]
    AnchorNotFound { anchor: String },

    #[error("no import block or import anchor found in existing file")]
    ImportBlockNotFound,
}

impl Error {
    /// Errors that abort the whole run instead of a single artifact
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Definition(_))
    }

    pub(crate) fn render(template: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Render {
            template: template.into(),
            message: err.to_string(),
        }
    }
}
