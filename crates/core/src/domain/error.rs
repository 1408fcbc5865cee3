// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Unknown job status: {0}")]
    UnknownStatus(String),

    #[error("Unknown locale: {0}")]
    UnknownLocale(String),

    #[error("Invalid delay policy: {0}")]
    InvalidDelayPolicy(String),

    #[error("Invalid source capabilities for '{provider}': {reason}")]
    InvalidCapabilities { provider: String, reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
