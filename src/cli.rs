//! Command-line interface implementation.

use crate::config::{StoreConfig, DEFAULT_SERVICES};
use crate::error::{AccountsError, Result};
use crate::models::{Account, AccountUpdate};
use crate::passwords::{generate_password, PasswordPolicy, DEFAULT_LENGTH};
use crate::store::CredentialStore;
use crate::strength::{estimate_strength, StrengthReport};
use crate::utils::{self, success, warning};
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use zeroize::Zeroize;

/// Manage account credentials for many services from one local file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the data file
    #[arg(
        short = 'f',
        long,
        global = true,
        env = "ACCOUNTS_FILE",
        help = "Path to data file (default: ~/.multi_accounts_manager.json)"
    )]
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'o',
        long,
        global = true,
        value_enum,
        default_value = "text",
        help = "Output format"
    )]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Character class switches for generated passwords.
#[derive(Args, Debug, Clone)]
pub struct PolicyArgs {
    /// Number of characters
    #[arg(short, long, default_value_t = DEFAULT_LENGTH)]
    pub length: usize,

    /// Leave out lowercase letters
    #[arg(long)]
    pub no_lowercase: bool,

    /// Leave out uppercase letters
    #[arg(long)]
    pub no_uppercase: bool,

    /// Leave out digits
    #[arg(long)]
    pub no_digits: bool,

    /// Leave out symbols
    #[arg(long)]
    pub no_symbols: bool,
}

impl PolicyArgs {
    pub fn policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            length: self.length,
            use_lowercase: !self.no_lowercase,
            use_uppercase: !self.no_uppercase,
            use_digits: !self.no_digits,
            use_symbols: !self.no_symbols,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List services and how many accounts each holds
    Services,

    /// List the accounts of a service
    List {
        /// Service name (e.g., Gmail)
        service: String,

        /// Only show accounts whose username, notes or tags contain this text
        #[arg(short, long)]
        search: Option<String>,

        /// Show passwords instead of masking them
        #[arg(short = 'p', long)]
        show_passwords: bool,
    },

    /// Add an account to a service
    Add {
        service: String,

        /// Username or e-mail address
        username: String,

        /// Password (prompted when omitted)
        #[arg(short, long, conflicts_with = "generate")]
        password: Option<String>,

        /// Generate the password
        #[arg(short, long)]
        generate: bool,

        #[command(flatten)]
        policy: PolicyArgs,

        #[arg(short, long, default_value = "")]
        notes: String,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Change fields of the account at a position
    Update {
        service: String,

        /// Position as shown by `list`
        index: usize,

        #[arg(short, long)]
        username: Option<String>,

        #[arg(short, long)]
        password: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,

        /// Replace the tags (repeatable)
        #[arg(short, long = "tag")]
        tags: Option<Vec<String>>,
    },

    /// Set a new password for the account at a position
    Passwd {
        service: String,

        index: usize,

        /// Generate the new password instead of prompting
        #[arg(short, long)]
        generate: bool,

        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Delete the account at a position
    Delete {
        service: String,

        index: usize,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Export a service's accounts to CSV
    Export { service: String, path: PathBuf },

    /// Import accounts from CSV, updating existing usernames
    Import { service: String, path: PathBuf },

    /// Generate a random password
    Generate {
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Rate a password (prompted when omitted)
    Strength { password: Option<String> },
}

impl Cli {
    /// Data file location for this invocation.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::resolve(self.file.as_deref())
    }

    /// Execute the CLI command.
    pub fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Services => self.list_services(),
            Commands::List {
                service,
                search,
                show_passwords,
            } => self.list_accounts(service, search.as_deref(), *show_passwords),
            Commands::Add {
                service,
                username,
                password,
                generate,
                policy,
                notes,
                tags,
            } => {
                let password = match (password, generate) {
                    (Some(password), _) => password.clone(),
                    (None, true) => generate_password(&policy.policy())?,
                    (None, false) => prompt_password("Password", true)?,
                };
                let account = Account::new(username.clone(), password)
                    .with_notes(notes.clone())
                    .with_tags(tags);
                let mut store = self.open_store()?;
                store.add_account(service, account)?;
                success(&format!("Added {} to {}", username, service));
                Ok(())
            }
            Commands::Update {
                service,
                index,
                username,
                password,
                notes,
                tags,
            } => self.update_account(
                service,
                *index,
                AccountUpdate {
                    username: username.clone(),
                    password: password.clone(),
                    notes: notes.clone(),
                    tags: tags.clone(),
                },
            ),
            Commands::Passwd {
                service,
                index,
                generate,
                policy,
            } => {
                let password = if *generate {
                    generate_password(&policy.policy())?
                } else {
                    prompt_password("New password", true)?
                };
                self.update_account(
                    service,
                    *index,
                    AccountUpdate {
                        password: Some(password),
                        ..Default::default()
                    },
                )
            }
            Commands::Delete { service, index, yes } => self.delete_account(service, *index, *yes),
            Commands::Export { service, path } => {
                let store = self.open_store()?;
                let count = store.export_to_tabular(service, path)?;
                success(&format!(
                    "Exported {} account(s) for {} to {}",
                    count,
                    service,
                    path.display()
                ));
                Ok(())
            }
            Commands::Import { service, path } => {
                let mut store = self.open_store()?;
                let summary = store.import_from_tabular(service, path)?;
                success(&format!(
                    "Added {} new account(s) and updated {} existing ones.",
                    summary.added, summary.updated
                ));
                Ok(())
            }
            Commands::Generate { policy } => {
                let mut password = generate_password(&policy.policy())?;
                let report = estimate_strength(&password);
                match self.output {
                    OutputFormat::Text => {
                        println!("{}", password);
                        print_report(&report);
                    }
                    OutputFormat::Json => {
                        let json = serde_json::json!({
                            "password": password,
                            "strength": report,
                        });
                        println!("{}", serde_json::to_string_pretty(&json)?);
                    }
                }
                password.zeroize();
                Ok(())
            }
            Commands::Strength { password } => {
                let report = rate_password(password.as_deref())?;
                match self.output {
                    OutputFormat::Text => print_report(&report),
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&report)?)
                    }
                }
                Ok(())
            }
        }
    }

    /// Open the store, warning when an unreadable data file was discarded.
    fn open_store(&self) -> Result<CredentialStore> {
        let (store, outcome) = CredentialStore::open(&self.store_config())?;
        if let crate::store::LoadOutcome::Recovered { reason } = outcome {
            warning(&format!(
                "Could not read {} ({}); continuing with an empty store. \
                 The old contents will be overwritten on the next change.",
                store.data_file().display(),
                reason
            ));
        }
        Ok(store)
    }

    fn list_services(&self) -> Result<()> {
        let store = self.open_store()?;
        let mut names: Vec<String> = DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect();
        for name in store.service_names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        let counts: Vec<(String, usize)> = names
            .into_iter()
            .map(|name| {
                let count = store.list_accounts(&name).len();
                (name, count)
            })
            .collect();

        match self.output {
            OutputFormat::Text => {
                for (name, count) in counts {
                    println!("{:<16} {}", name, count);
                }
            }
            OutputFormat::Json => {
                let json: Vec<_> = counts
                    .into_iter()
                    .map(|(name, count)| serde_json::json!({ "service": name, "accounts": count }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        Ok(())
    }

    fn list_accounts(&self, service: &str, search: Option<&str>, show_passwords: bool) -> Result<()> {
        let store = self.open_store()?;
        let total = store.list_accounts(service).len();
        let query = search.unwrap_or("");
        let matches = store.search(service, query);

        match self.output {
            OutputFormat::Text => {
                for (index, account) in &matches {
                    let password = if show_passwords {
                        account.password.clone()
                    } else {
                        utils::mask_password(&account.password)
                    };
                    println!(
                        "[{}] {}  {}  {}  {}",
                        index,
                        account.username.cyan(),
                        password,
                        utils::notes_preview(&account.notes),
                        account.last_updated.dimmed()
                    );
                    println!("     Tags: {}", utils::format_tags(&account.tags));
                }
                if query.trim().is_empty() {
                    println!("{} account(s) saved", total);
                } else {
                    println!(
                        "Showing {} of {} account(s) (filter: '{}')",
                        matches.len(),
                        total,
                        query.trim().to_lowercase()
                    );
                }
            }
            OutputFormat::Json => {
                let json: Vec<_> = matches
                    .iter()
                    .map(|(index, account)| {
                        let password = if show_passwords {
                            account.password.clone()
                        } else {
                            utils::mask_password(&account.password)
                        };
                        serde_json::json!({
                            "index": index,
                            "id": account.id,
                            "username": account.username,
                            "password": password,
                            "notes": account.notes,
                            "tags": account.tags,
                            "last_updated": account.last_updated,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
        }
        Ok(())
    }

    fn update_account(&self, service: &str, index: usize, update: AccountUpdate) -> Result<()> {
        let mut store = self.open_store()?;
        let Some(current) = store.list_accounts(service).get(index).cloned() else {
            warning(&format!("No account at position {} in {}", index, service));
            return Ok(());
        };
        store.update_account(service, index, current.updated(update))?;
        success(&format!("Updated account {} in {}", index, service));
        Ok(())
    }

    fn delete_account(&self, service: &str, index: usize, yes: bool) -> Result<()> {
        let mut store = self.open_store()?;
        let Some(account) = store.list_accounts(service).get(index).cloned() else {
            warning(&format!("No account at position {} in {}", index, service));
            return Ok(());
        };

        if !yes {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("Delete {} from {}?", account.username, service))
                .default(false)
                .interact()
                .map_err(|e| AccountsError::Other(e.to_string()))?;
            if !confirmed {
                println!("Cancelled");
                return Ok(());
            }
        }

        store.delete_account(service, index)?;
        success(&format!("Deleted {} from {}", account.username, service));
        Ok(())
    }
}

/// Read a password with masked input. Fails when stdin is not a terminal.
fn prompt_password(prompt: &str, confirm: bool) -> Result<String> {
    if !atty::is(atty::Stream::Stdin) {
        return Err(AccountsError::Other(
            "No terminal to prompt for a password; pass it as an argument".to_string(),
        ));
    }

    let mut input = dialoguer::Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Confirm password", "Passwords do not match");
    }
    let password = input
        .interact()
        .map_err(|e| AccountsError::Other(e.to_string()))?;

    if password.is_empty() {
        return Err(AccountsError::Other("Password must not be empty".to_string()));
    }
    Ok(password)
}

/// Score a password given on the command line, or prompt for one.
/// Only a prompted password is owned here, so only that one is wiped.
fn rate_password(supplied: Option<&str>) -> Result<StrengthReport> {
    if let Some(password) = supplied {
        return Ok(estimate_strength(password));
    }
    let mut prompted = prompt_password("Password to rate", false)?;
    let report = estimate_strength(&prompted);
    prompted.zeroize();
    Ok(report)
}

fn print_report(report: &StrengthReport) {
    let label = match report.score {
        0 => report.label.dimmed(),
        1 => report.label.red(),
        2 => report.label.yellow(),
        3 => report.label.blue(),
        _ => report.label.green(),
    };
    println!("{}: {} ({}/4)", "Strength".bold(), label, report.score);
    for suggestion in &report.suggestions {
        println!("  - {}", suggestion);
    }
}
