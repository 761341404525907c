//! Data file location and built-in service names.

use std::path::{Path, PathBuf};

/// File name used in the home directory when nothing else is configured.
pub const DEFAULT_DATA_FILE_NAME: &str = ".multi_accounts_manager.json";

/// Environment variable that overrides the data file location.
pub const DATA_FILE_ENV: &str = "ACCOUNTS_FILE";

/// Services offered out of the box, in display order.
pub const DEFAULT_SERVICES: &[&str] = &[
    "Facebook",
    "Instagram",
    "Telegram",
    "Snapchat",
    "Gmail",
    "Rambler",
    "Twitter",
    "Yandex Mail",
    "Threads",
];

/// Default data file: `~/.multi_accounts_manager.json`, or the current directory
/// when no home directory is known.
pub fn default_data_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DATA_FILE_NAME)
}

/// Where the credential store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_file: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

impl StoreConfig {
    /// Use an explicit data file.
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
        }
    }

    /// Resolve the data file: explicit path, then `ACCOUNTS_FILE`, then the default.
    pub fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::new(path);
        }
        match std::env::var_os(DATA_FILE_ENV) {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::default(),
        }
    }
}
