//! Data models for stored accounts.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Current UTC time with second precision, e.g. `2024-05-01T09:30:00Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Trim every tag, drop empty ones and keep the first occurrence of each value.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.to_string()) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

/// Split a comma separated tag string into normalized tags.
pub fn split_tags(joined: &str) -> Vec<String> {
    normalize_tags(joined.split(','))
}

/// Join tags the way they are displayed and exported.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => {
            normalize_tags(items.iter().filter_map(|item| item.as_str()))
        }
        serde_json::Value::String(joined) => split_tags(&joined),
        _ => Vec::new(),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => s,
        _ => now_timestamp(),
    })
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Uuid, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_str()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(Uuid::new_v4))
}

/// One stored credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Stable identifier, independent of the account's position
    #[serde(default = "Uuid::new_v4", deserialize_with = "lenient_id")]
    pub id: Uuid,
    /// Username or e-mail address
    pub username: String,
    /// Password, kept in clear text
    pub password: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notes: String,
    /// Normalized tag list
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Vec<String>,
    #[serde(default = "now_timestamp", deserialize_with = "lenient_timestamp")]
    pub last_updated: String,
}

/// Partial changes applied by [`Account::updated`].
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl Account {
    /// Create an account with empty notes and tags, stamped with the current time.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password: password.into(),
            notes: String::new(),
            tags: Vec::new(),
            last_updated: now_timestamp(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Return a copy with the given fields replaced and the timestamp refreshed.
    /// The identifier is kept.
    pub fn updated(&self, update: AccountUpdate) -> Self {
        let mut next = self.clone();
        if let Some(username) = update.username {
            next.username = username;
        }
        if let Some(password) = update.password {
            next.password = password;
        }
        if let Some(notes) = update.notes {
            next.notes = notes;
        }
        if let Some(tags) = update.tags {
            next.tags = normalize_tags(tags);
        }
        next.last_updated = now_timestamp();
        next
    }

    /// Lowercased text matched by searches: username, notes and tags.
    pub fn search_haystack(&self) -> String {
        format!("{} {} {}", self.username, self.notes, self.tags.join(" ")).to_lowercase()
    }
}

/// Accounts stored under one service name, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceData {
    pub name: String,
    pub accounts: Vec<Account>,
}

impl ServiceData {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accounts: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Position of the account with the given id.
    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.accounts.iter().position(|account| account.id == id)
    }
}
