//! Credential store: per-service account collections backed by a JSON file.
//!
//! Every mutating call writes the whole store back to disk before returning, so the
//! file never lags the in-memory state by more than one operation. Writes go to a
//! temporary file in the same directory which then replaces the data file.
//!
//! There is no cross-process coordination. Two stores pointed at the same file
//! overwrite each other, and the last save wins.

use crate::config::StoreConfig;
use crate::error::{AccountsError, Result};
use crate::models::{now_timestamp, Account, ServiceData};
use crate::tabular::{self, TabularRecord};
use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What happened when the data file was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was parsed; holds the number of services read.
    Loaded { services: usize },
    /// No file yet; the store starts empty.
    Missing,
    /// The file could not be read or parsed. The store was reset to empty and the
    /// previous contents will be overwritten by the next save.
    Recovered { reason: String },
}

impl LoadOutcome {
    pub fn is_recovered(&self) -> bool {
        matches!(self, LoadOutcome::Recovered { .. })
    }
}

/// Counts reported by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
}

#[derive(Serialize)]
struct PersistedService<'a> {
    accounts: &'a [Account],
}

/// In-memory accounts grouped by service, written through to a JSON file.
#[derive(Debug)]
pub struct CredentialStore {
    data_file: PathBuf,
    services: BTreeMap<String, ServiceData>,
}

impl CredentialStore {
    /// Create an empty store for `data_file` without touching the filesystem.
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            services: BTreeMap::new(),
        }
    }

    /// Create the data file's directory if needed and load whatever is there.
    pub fn open(config: &StoreConfig) -> Result<(Self, LoadOutcome)> {
        if let Some(parent) = config.data_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut store = Self::new(&config.data_file);
        let outcome = store.load();
        Ok((store, outcome))
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Replace the in-memory state with the data file's contents.
    ///
    /// Never fails. A missing file gives an empty store. An unreadable or unparsable
    /// file also gives an empty store, reported as [`LoadOutcome::Recovered`]; saving
    /// afterwards discards the old contents.
    pub fn load(&mut self) -> LoadOutcome {
        self.services.clear();

        if !self.data_file.exists() {
            debug!("No data file at {}", self.data_file.display());
            return LoadOutcome::Missing;
        }

        let outcome = match std::fs::read_to_string(&self.data_file) {
            Ok(content) => match self.parse_content(&content) {
                Ok(count) => LoadOutcome::Loaded { services: count },
                Err(reason) => LoadOutcome::Recovered { reason },
            },
            Err(e) => LoadOutcome::Recovered {
                reason: e.to_string(),
            },
        };

        match &outcome {
            LoadOutcome::Recovered { reason } => {
                self.services.clear();
                warn!(
                    "Could not load {} ({}); starting with an empty store",
                    self.data_file.display(),
                    reason
                );
            }
            LoadOutcome::Loaded { services } => {
                debug!(
                    "Loaded {} service(s) from {}",
                    services,
                    self.data_file.display()
                );
            }
            LoadOutcome::Missing => {}
        }
        outcome
    }

    fn parse_content(&mut self, content: &str) -> std::result::Result<usize, String> {
        let payload: serde_json::Value =
            serde_json::from_str(content).map_err(|e| e.to_string())?;
        let entries = payload
            .as_object()
            .ok_or_else(|| "top-level value is not an object".to_string())?;

        let mut seen_ids = HashSet::new();
        for (name, raw) in entries {
            let Some(raw) = raw.as_object() else {
                debug!("Skipping non-object entry {name:?}");
                continue;
            };
            let mut service = ServiceData::new(name.clone());
            if let Some(accounts) = raw.get("accounts").and_then(|a| a.as_array()) {
                for item in accounts {
                    match serde_json::from_value::<Account>(item.clone()) {
                        Ok(mut account) => {
                            if !seen_ids.insert(account.id) {
                                debug!("Reassigning repeated id {} in {name:?}", account.id);
                                account.id = Uuid::new_v4();
                                seen_ids.insert(account.id);
                            }
                            service.accounts.push(account);
                        }
                        Err(e) => debug!("Skipping unreadable account in {name:?}: {e}"),
                    }
                }
            }
            self.services.insert(name.clone(), service);
        }
        Ok(self.services.len())
    }

    /// Write the whole store to the data file, replacing it atomically.
    pub fn save(&self) -> Result<()> {
        let payload: BTreeMap<&str, PersistedService<'_>> = self
            .services
            .iter()
            .map(|(name, service)| {
                (
                    name.as_str(),
                    PersistedService {
                        accounts: &service.accounts,
                    },
                )
            })
            .collect();
        let content = serde_json::to_string_pretty(&payload)?;

        let dir = match self.data_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o600))?;
        }

        temp.persist(&self.data_file)
            .map_err(|e| AccountsError::Persist(e.to_string()))?;
        debug!("Saved {} service(s) to {}", self.services.len(), self.data_file.display());
        Ok(())
    }

    fn service_mut(&mut self, service: &str) -> &mut ServiceData {
        self.services
            .entry(service.to_string())
            .or_insert_with(|| ServiceData::new(service))
    }

    /// Copy of the accounts stored under `service`, in order.
    pub fn list_accounts(&self, service: &str) -> Vec<Account> {
        self.services
            .get(service)
            .map(|s| s.accounts.clone())
            .unwrap_or_default()
    }

    /// Snapshot of every service collection.
    pub fn services(&self) -> BTreeMap<String, ServiceData> {
        self.services.clone()
    }

    /// Names of all known services, sorted.
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    /// Append an account and save.
    pub fn add_account(&mut self, service: &str, account: Account) -> Result<()> {
        self.service_mut(service).accounts.push(account);
        self.save()
    }

    /// Replace the account at `index` and save.
    ///
    /// An index outside the collection is ignored: nothing changes and nothing is saved.
    pub fn update_account(&mut self, service: &str, index: usize, account: Account) -> Result<()> {
        let collection = self.service_mut(service);
        if index >= collection.accounts.len() {
            debug!("Ignoring update of {service:?} at out-of-range index {index}");
            return Ok(());
        }
        collection.accounts[index] = account;
        self.save()
    }

    /// Remove the account at `index` and save. Later positions shift down by one.
    ///
    /// An index outside the collection is ignored: nothing changes and nothing is saved.
    pub fn delete_account(&mut self, service: &str, index: usize) -> Result<()> {
        let collection = self.service_mut(service);
        if index >= collection.accounts.len() {
            debug!("Ignoring delete of {service:?} at out-of-range index {index}");
            return Ok(());
        }
        collection.accounts.remove(index);
        self.save()
    }

    /// Look up an account by id, returning its current position and a copy.
    pub fn find_account(&self, service: &str, id: Uuid) -> Option<(usize, Account)> {
        let collection = self.services.get(service)?;
        let index = collection.position_of(id)?;
        Some((index, collection.accounts[index].clone()))
    }

    /// Replace the account with the given id, keeping that id, and save.
    pub fn update_account_by_id(
        &mut self,
        service: &str,
        id: Uuid,
        mut account: Account,
    ) -> Result<()> {
        let collection = self.service_mut(service);
        let index = collection
            .position_of(id)
            .ok_or(AccountsError::AccountNotFound(id))?;
        account.id = id;
        collection.accounts[index] = account;
        self.save()
    }

    /// Remove the account with the given id, save, and return it.
    pub fn delete_account_by_id(&mut self, service: &str, id: Uuid) -> Result<Account> {
        let collection = self.service_mut(service);
        let index = collection
            .position_of(id)
            .ok_or(AccountsError::AccountNotFound(id))?;
        let removed = collection.accounts.remove(index);
        self.save()?;
        Ok(removed)
    }

    /// Replace the whole collection for `service` and save.
    pub fn set_accounts(&mut self, service: &str, accounts: Vec<Account>) -> Result<()> {
        self.service_mut(service).accounts = accounts;
        self.save()
    }

    /// Accounts whose username, notes or tags contain `query`, ignoring case.
    /// Each match is paired with its position in the collection. A blank query
    /// matches everything.
    pub fn search(&self, service: &str, query: &str) -> Vec<(usize, Account)> {
        let query = query.trim().to_lowercase();
        let Some(collection) = self.services.get(service) else {
            return Vec::new();
        };
        collection
            .accounts
            .iter()
            .enumerate()
            .filter(|(_, account)| query.is_empty() || account.search_haystack().contains(&query))
            .map(|(index, account)| (index, account.clone()))
            .collect()
    }

    /// Write the accounts of `service` as CSV. Returns the number of rows written.
    pub fn export_to_tabular(&self, service: &str, destination: &Path) -> Result<usize> {
        let accounts = self
            .services
            .get(service)
            .map(|s| s.accounts.as_slice())
            .unwrap_or_default();
        let count = tabular::write_accounts_to_path(destination, accounts)?;
        debug!("Exported {count} account(s) of {service:?} to {}", destination.display());
        Ok(count)
    }

    /// Read a CSV file and merge its rows into `service`.
    ///
    /// The whole file is parsed before anything is merged, so a malformed row leaves
    /// the store untouched.
    pub fn import_from_tabular(&mut self, service: &str, source: &Path) -> Result<ImportSummary> {
        let records = tabular::read_records_from_path(source)?;
        debug!("Read {} row(s) from {}", records.len(), source.display());
        self.import_records(service, records)
    }

    /// Merge records into `service` by username, then save once.
    ///
    /// A record whose username already exists replaces that account's password, notes
    /// and tags and refreshes its timestamp; username, position and id stay. Any other
    /// record is appended, and later records with the same username update it.
    pub fn import_records<I>(&mut self, service: &str, records: I) -> Result<ImportSummary>
    where
        I: IntoIterator<Item = TabularRecord>,
    {
        let collection = self.service_mut(service);
        let mut by_username: HashMap<String, usize> = collection
            .accounts
            .iter()
            .enumerate()
            .map(|(index, account)| (account.username.clone(), index))
            .collect();

        let mut summary = ImportSummary::default();
        for record in records {
            let existing_index = by_username.get(&record.username).copied();
            match existing_index {
                Some(index) => {
                    let existing = &mut collection.accounts[index];
                    existing.password = record.password;
                    existing.notes = record.notes;
                    existing.tags = record.tags.into_tags();
                    existing.last_updated = now_timestamp();
                    summary.updated += 1;
                }
                None => {
                    let account = record.into_account();
                    by_username.insert(account.username.clone(), collection.accounts.len());
                    collection.accounts.push(account);
                    summary.added += 1;
                }
            }
        }

        self.save()?;
        debug!(
            "Imported into {service:?}: {} added, {} updated",
            summary.added, summary.updated
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::TagsField;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, CredentialStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::new(temp_dir.path().join("accounts.json"));
        (temp_dir, store)
    }

    fn record(username: &str, password: &str, tags: TagsField) -> TabularRecord {
        TabularRecord {
            username: username.to_string(),
            password: password.to_string(),
            notes: String::new(),
            tags,
            last_updated: None,
        }
    }

    #[test]
    fn test_list_is_a_copy() {
        let (_dir, mut store) = temp_store();
        store.add_account("Gmail", Account::new("a", "1")).unwrap();

        let mut listed = store.list_accounts("Gmail");
        listed[0].password = "changed".to_string();
        listed.push(Account::new("b", "2"));

        let again = store.list_accounts("Gmail");
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].password, "1");
    }

    #[test]
    fn test_unknown_service_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.list_accounts("Nowhere").is_empty());
        assert!(store.search("Nowhere", "").is_empty());
        assert!(store.service_names().is_empty());
    }

    #[test]
    fn test_delete_shifts_positions() {
        let (_dir, mut store) = temp_store();
        for name in ["a", "b", "c"] {
            store.add_account("Gmail", Account::new(name, "pw")).unwrap();
        }
        store.delete_account("Gmail", 0).unwrap();

        let names: Vec<_> = store
            .list_accounts("Gmail")
            .into_iter()
            .map(|a| a.username)
            .collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_out_of_range_index_is_ignored() {
        let (_dir, mut store) = temp_store();
        store
            .update_account("Gmail", 0, Account::new("x", "y"))
            .unwrap();
        store.delete_account("Gmail", 3).unwrap();

        assert!(store.list_accounts("Gmail").is_empty());
        assert!(!store.data_file().exists());
    }

    #[test]
    fn test_id_operations() {
        let (_dir, mut store) = temp_store();
        let first = Account::new("a", "1");
        let second = Account::new("b", "2");
        let second_id = second.id;
        store.add_account("Gmail", first).unwrap();
        store.add_account("Gmail", second).unwrap();

        store
            .update_account_by_id("Gmail", second_id, Account::new("b", "22"))
            .unwrap();
        let (index, found) = store.find_account("Gmail", second_id).unwrap();
        assert_eq!(index, 1);
        assert_eq!(found.password, "22");
        assert_eq!(found.id, second_id);

        store.delete_account("Gmail", 0).unwrap();
        assert_eq!(store.find_account("Gmail", second_id).unwrap().0, 0);

        let removed = store.delete_account_by_id("Gmail", second_id).unwrap();
        assert_eq!(removed.username, "b");
        assert!(matches!(
            store.delete_account_by_id("Gmail", second_id),
            Err(AccountsError::AccountNotFound(id)) if id == second_id
        ));
    }

    #[test]
    fn test_search() {
        let (_dir, mut store) = temp_store();
        store
            .add_account("Gmail", Account::new("alice", "1").with_tags(["Work"]))
            .unwrap();
        store
            .add_account("Gmail", Account::new("bob", "2").with_notes("backup phone"))
            .unwrap();

        let hits = store.search("Gmail", "  WORK ");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 0);

        let hits = store.search("Gmail", "phone");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 1);

        assert_eq!(store.search("Gmail", "").len(), 2);
    }

    #[test]
    fn test_import_records_merge() {
        let (_dir, mut store) = temp_store();
        store
            .add_account("Gmail", Account::new("alice", "old").with_tags(["keep"]))
            .unwrap();
        let alice_id = store.list_accounts("Gmail")[0].id;

        let summary = store
            .import_records(
                "Gmail",
                vec![
                    record("alice", "new", TagsField::Joined("x, y , x".to_string())),
                    record("carol", "c1", TagsField::List(vec!["t".to_string()])),
                    record("carol", "c2", TagsField::default()),
                ],
            )
            .unwrap();

        assert_eq!(summary, ImportSummary { added: 1, updated: 2 });
        let accounts = store.list_accounts("Gmail");
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, alice_id);
        assert_eq!(accounts[0].password, "new");
        assert_eq!(accounts[0].tags, vec!["x", "y"]);
        assert_eq!(accounts[1].username, "carol");
        assert_eq!(accounts[1].password, "c2");
        assert!(accounts[1].tags.is_empty());
    }

    #[test]
    fn test_load_skips_non_object_entries() {
        let (_dir, mut store) = temp_store();
        std::fs::write(
            store.data_file(),
            r#"{"version": 3, "Gmail": {"accounts": [
                {"username": "a", "password": "1"},
                {"username": "broken"},
                "not an account"
            ]}, "Telegram": {}}"#,
        )
        .unwrap();

        let outcome = store.load();
        assert_eq!(outcome, LoadOutcome::Loaded { services: 2 });
        assert_eq!(store.list_accounts("Gmail").len(), 1);
        assert!(store.list_accounts("Telegram").is_empty());
        assert_eq!(store.service_names(), vec!["Gmail", "Telegram"]);
    }

    #[test]
    fn test_load_keeps_accounts_with_unusable_ids() {
        let (_dir, mut store) = temp_store();
        std::fs::write(
            store.data_file(),
            r#"{"Gmail": {"accounts": [
                {"id": 7, "username": "a", "password": "1"},
                {"id": null, "username": "b", "password": "2"},
                {"id": "garbage", "username": "c", "password": "3"},
                {"username": "d", "password": "4"}
            ]}}"#,
        )
        .unwrap();

        assert_eq!(store.load(), LoadOutcome::Loaded { services: 1 });
        let accounts = store.list_accounts("Gmail");
        let names: Vec<_> = accounts.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);

        // Replacement ids are persisted, so they stay stable from here on.
        store.save().unwrap();
        let mut reloaded = CredentialStore::new(store.data_file());
        reloaded.load();
        assert_eq!(reloaded.list_accounts("Gmail"), accounts);
    }

    #[test]
    fn test_load_reassigns_repeated_ids() {
        let (_dir, mut store) = temp_store();
        let shared = Uuid::new_v4();
        std::fs::write(
            store.data_file(),
            format!(
                r#"{{"Gmail": {{"accounts": [
                    {{"id": "{shared}", "username": "a", "password": "1"}},
                    {{"id": "{shared}", "username": "copy", "password": "2"}}
                ]}},
                "Twitter": {{"accounts": [
                    {{"id": "{shared}", "username": "elsewhere", "password": "3"}}
                ]}}}}"#
            ),
        )
        .unwrap();
        store.load();

        let gmail = store.list_accounts("Gmail");
        let twitter = store.list_accounts("Twitter");
        assert_eq!(gmail[0].id, shared);
        assert_ne!(gmail[1].id, shared);
        assert_ne!(twitter[0].id, shared);
        assert_ne!(twitter[0].id, gmail[1].id);

        let copy_id = gmail[1].id;
        store
            .update_account_by_id("Gmail", copy_id, Account::new("copy", "22"))
            .unwrap();
        assert_eq!(store.list_accounts("Gmail")[1].password, "22");
        assert_eq!(store.list_accounts("Gmail")[0].password, "1");
    }

    #[test]
    fn test_load_corrupt_file_recovers() {
        let (_dir, mut store) = temp_store();
        store.add_account("Gmail", Account::new("a", "1")).unwrap();
        std::fs::write(store.data_file(), "{ not json").unwrap();

        let outcome = store.load();
        assert!(outcome.is_recovered());
        assert!(store.services().is_empty());
    }

    #[test]
    fn test_load_non_object_top_level_recovers() {
        let (_dir, mut store) = temp_store();
        std::fs::write(store.data_file(), "[1, 2, 3]").unwrap();
        assert!(store.load().is_recovered());
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, mut store) = temp_store();
        store.add_account("Gmail", Account::new("a", "1")).unwrap();
        let mode = std::fs::metadata(store.data_file())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
