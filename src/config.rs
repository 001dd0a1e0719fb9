use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{SyncError, SyncResult};

/// Local directories holding template and include sources.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory that `--filename` is relative to for templates.
    pub templates_path: PathBuf,

    /// Directory that `--filename` is relative to for includes.
    pub includes_path: PathBuf,
}

impl Config {
    /// Load the config file.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&source)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// A single account entry from the credentials file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Account {
    /// API key.
    pub key: String,

    /// API secret.
    pub secret: String,

    /// Placeholder values used when generating a local template.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Account {
    /// The `account_name` entry of [`Account::data`], if it's a string.
    pub fn account_name(&self) -> Option<&str> {
        self.data.get("account_name").and_then(Value::as_str)
    }
}

/// Accounts keyed by identifier, in the order they appear in the file.
///
/// Entries are validated when looked up. A bad entry only fails lookups of
/// that account.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    entries: Map<String, Value>,
}

impl Credentials {
    /// Load the credentials file.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        Self::parse(&source)
            .with_context(|| format!("Failed to parse credentials file {}", path.display()))
    }

    /// Parse the contents of a credentials file.
    pub fn parse(source: &str) -> anyhow::Result<Self> {
        let entries = serde_json::from_str(source)?;
        Ok(Self { entries })
    }

    /// All account identifiers in file order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Look up an account by identifier.
    pub fn get(&self, id: &str) -> SyncResult<Account> {
        let value = self
            .entries
            .get(id)
            .ok_or_else(|| SyncError::AccountNotFound {
                account: id.to_string(),
            })?;
        Account::deserialize(value).map_err(|error| SyncError::MalformedAccount {
            account: id.to_string(),
            reason: error.to_string(),
        })
    }
}

/// Everything loaded from disk at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    pub config: Config,
    pub credentials: Credentials,
}
