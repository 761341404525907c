//! multiaccounts: a local manager for per-service account credentials.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod passwords;
pub mod store;
pub mod strength;
pub mod tabular;
pub mod utils;

// Re-export commonly used types
pub use config::StoreConfig;
pub use error::{AccountsError, PolicyError, Result};
pub use models::{Account, AccountUpdate, ServiceData};
pub use passwords::{generate_password, PasswordPolicy};
pub use store::{CredentialStore, ImportSummary, LoadOutcome};
pub use strength::{estimate_strength, StrengthReport};
