//! Error types for multiaccounts.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while building a password from a policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("At least one character group must be enabled")]
    EmptyPool,
}

/// Main error type for store and generator operations.
#[derive(Error, Debug)]
pub enum AccountsError {
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    #[error("Password policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to replace data file: {0}")]
    Persist(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AccountsError>;
