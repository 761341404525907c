//! CSV interchange format used for bulk export and import.
//!
//! Columns are fixed: `username,password,notes,tags,last_updated`. The `tags`
//! column holds the tags joined with `", "`.

use crate::error::Result;
use crate::models::{join_tags, normalize_tags, split_tags, Account};
use serde::Deserialize;
use std::io;
use std::path::Path;

/// Header row, in column order.
pub const HEADER: [&str; 5] = ["username", "password", "notes", "tags", "last_updated"];

/// Tags as they arrive from an import source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagsField {
    /// Comma separated, e.g. `"work, 2fa"`
    Joined(String),
    List(Vec<String>),
}

impl Default for TagsField {
    fn default() -> Self {
        TagsField::List(Vec::new())
    }
}

impl TagsField {
    /// Normalized tag list.
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagsField::Joined(joined) => split_tags(&joined),
            TagsField::List(tags) => normalize_tags(tags),
        }
    }
}

/// One imported row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct TabularRecord {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: TagsField,
    /// Kept for newly added accounts; refreshed when the row updates an existing one
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl TabularRecord {
    /// Turn the row into a fresh account.
    pub fn into_account(self) -> Account {
        let mut account = Account::new(self.username, self.password)
            .with_notes(self.notes)
            .with_tags(self.tags.into_tags());
        if let Some(stamp) = self.last_updated.filter(|s| !s.trim().is_empty()) {
            account.last_updated = stamp;
        }
        account
    }
}

/// Row shape on disk. Every column is read as raw text.
#[derive(Debug, Deserialize)]
struct CsvRow {
    username: String,
    password: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    last_updated: String,
}

impl From<CsvRow> for TabularRecord {
    fn from(row: CsvRow) -> Self {
        Self {
            username: row.username,
            password: row.password,
            notes: row.notes,
            tags: TagsField::Joined(row.tags),
            last_updated: Some(row.last_updated),
        }
    }
}

/// Write the header and one row per account. Returns the number of rows written.
pub fn write_accounts<W: io::Write>(writer: W, accounts: &[Account]) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;
    for account in accounts {
        let tags = join_tags(&account.tags);
        csv_writer.write_record([
            account.username.as_str(),
            account.password.as_str(),
            account.notes.as_str(),
            tags.as_str(),
            account.last_updated.as_str(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(accounts.len())
}

/// Write accounts to a file, replacing it.
pub fn write_accounts_to_path(path: &Path, accounts: &[Account]) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    write_accounts(file, accounts)
}

/// Parse every row. A malformed row fails the whole read.
pub fn read_records<R: io::Read>(reader: R) -> Result<Vec<TabularRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in csv_reader.deserialize::<CsvRow>() {
        records.push(row?.into());
    }
    Ok(records)
}

/// Parse every row of a file.
pub fn read_records_from_path(path: &Path) -> Result<Vec<TabularRecord>> {
    let file = std::fs::File::open(path)?;
    read_records(file)
}
