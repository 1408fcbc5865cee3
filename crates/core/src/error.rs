// Central Error Type for the Application

use std::path::PathBuf;
use thiserror::Error;

/// Run-scoped error: anything that stops the whole run.
///
/// Record-scoped failures are `FetchFieldError` and never become an `AppError`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error in {path}: {message}")]
    Storage { path: PathBuf, message: String },

    #[error("No scrape cache for {date} at {path}")]
    CacheMissing { date: chrono::NaiveDate, path: PathBuf },

    #[error("Nothing to reconcile: no records were fetched and no master file exists")]
    NothingToReconcile,

    #[error("Source error: {0}")]
    Source(#[from] crate::port::FetchError),
}

impl AppError {
    pub fn storage(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        AppError::Storage {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
