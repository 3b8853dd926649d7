// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted account configuration: who may run admin commands, how old an
//! inbound event may be, and which accounts to resume at startup.
//!
//! The store heals itself: a missing or malformed file is replaced by the
//! defaults and written back immediately.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::Mutex;
use tracing::{info, warn};
use wxbridge_core::BridgeError;

/// Minimum caller role required to run administrative commands.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Master,
    Admin,
    All,
}

/// Role of a user invoking a command, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Master,
    Admin,
    Member,
}

impl Permission {
    /// Whether a caller with `role` satisfies this permission level.
    pub fn permits(self, role: Role) -> bool {
        match self {
            Self::All => true,
            Self::Admin => matches!(role, Role::Master | Role::Admin),
            Self::Master => role == Role::Master,
        }
    }
}

/// Contents of the account store file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSettings {
    #[serde(default)]
    pub permission: Permission,
    /// Inbound events older than this many seconds are dropped.
    #[serde(default = "default_expire_time")]
    pub expire_time: i64,
    /// Canonical account ids to resume at startup, in order.
    #[serde(default)]
    pub id: Vec<String>,
}

impl Default for AccountSettings {
    fn default() -> Self {
        Self {
            permission: Permission::default(),
            expire_time: default_expire_time(),
            id: Vec::new(),
        }
    }
}

fn default_expire_time() -> i64 {
    10
}

/// The account store, with all mutations serialized through one lock.
#[derive(Debug)]
pub struct AccountStore {
    path: PathBuf,
    settings: Mutex<AccountSettings>,
}

impl AccountStore {
    /// Loads the store at `path`, healing it if it is missing or unreadable.
    ///
    /// Never fails: a file that cannot be written back is logged and the
    /// in-memory defaults are used.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match read_settings(&path).await {
            Ok(mut settings) if settings.expire_time < 0 => {
                warn!(
                    path = %path.display(),
                    expire_time = settings.expire_time,
                    "negative expire_time, restoring default"
                );
                settings.expire_time = default_expire_time();
                if let Err(e) = write_settings(&path, &settings).await {
                    warn!(error = %e, "failed to persist healed account store");
                }
                settings
            }
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "account store unreadable, restoring defaults");
                let settings = AccountSettings::default();
                if let Err(e) = write_settings(&path, &settings).await {
                    warn!(error = %e, "failed to persist default account store");
                }
                settings
            }
        };
        Self {
            path,
            settings: Mutex::new(settings),
        }
    }

    /// An in-memory store that never touches disk until a mutation is saved.
    pub fn with_settings(path: impl Into<PathBuf>, settings: AccountSettings) -> Self {
        Self {
            path: path.into(),
            settings: Mutex::new(settings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A copy of the current settings.
    pub async fn snapshot(&self) -> AccountSettings {
        self.settings.lock().await.clone()
    }

    pub async fn ids(&self) -> Vec<String> {
        self.settings.lock().await.id.clone()
    }

    pub async fn permission(&self) -> Permission {
        self.settings.lock().await.permission
    }

    pub async fn expire_time(&self) -> i64 {
        self.settings.lock().await.expire_time
    }

    /// Appends `id` if absent and saves. Returns whether the list changed.
    pub async fn add_id(&self, id: &str) -> Result<bool, BridgeError> {
        let mut settings = self.settings.lock().await;
        if settings.id.iter().any(|existing| existing == id) {
            return Ok(false);
        }
        let mut next = settings.clone();
        next.id.push(id.to_string());
        write_settings(&self.path, &next).await?;
        *settings = next;
        info!(id, "account added to store");
        Ok(true)
    }

    /// Removes `id` if present and saves. Returns whether the list changed.
    ///
    /// The in-memory list only changes once the save has succeeded.
    pub async fn remove_id(&self, id: &str) -> Result<bool, BridgeError> {
        let mut settings = self.settings.lock().await;
        if !settings.id.iter().any(|existing| existing == id) {
            return Ok(false);
        }
        let mut next = settings.clone();
        next.id.retain(|existing| existing != id);
        write_settings(&self.path, &next).await?;
        *settings = next;
        info!(id, "account removed from store");
        Ok(true)
    }
}

async fn read_settings(path: &Path) -> Result<AccountSettings, BridgeError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BridgeError::persistence(path, e))?;
    toml::from_str(&text).map_err(|e| BridgeError::persistence(path, e))
}

async fn write_settings(path: &Path, settings: &AccountSettings) -> Result<(), BridgeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| BridgeError::persistence(parent, e))?;
    }
    let text = toml::to_string_pretty(settings).map_err(|e| BridgeError::persistence(path, e))?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| BridgeError::persistence(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn permission_levels() {
        assert!(Permission::All.permits(Role::Member));
        assert!(Permission::Admin.permits(Role::Admin));
        assert!(!Permission::Admin.permits(Role::Member));
        assert!(Permission::Master.permits(Role::Master));
        assert!(!Permission::Master.permits(Role::Admin));
    }

    #[tokio::test]
    async fn missing_file_is_healed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("accounts.toml");
        let store = AccountStore::open(&path).await;
        assert_eq!(store.snapshot().await, AccountSettings::default());
        let written = std::fs::read_to_string(&path).unwrap();
        let reread: AccountSettings = toml::from_str(&written).unwrap();
        assert_eq!(reread, AccountSettings::default());
    }

    #[tokio::test]
    #[traced_test]
    async fn malformed_file_is_replaced_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        std::fs::write(&path, "id = [unterminated").unwrap();
        let store = AccountStore::open(&path).await;
        assert_eq!(store.expire_time().await, 10);
        assert!(logs_contain("account store unreadable"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(toml::from_str::<AccountSettings>(&written).is_ok());
    }

    #[tokio::test]
    async fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        std::fs::write(&path, "id = [\"wx_1\"]\n").unwrap();
        let store = AccountStore::open(&path).await;
        let settings = store.snapshot().await;
        assert_eq!(settings.id, vec!["wx_1"]);
        assert_eq!(settings.permission, Permission::Master);
        assert_eq!(settings.expire_time, 10);
    }

    #[tokio::test]
    async fn add_and_remove_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        let store = AccountStore::open(&path).await;
        assert!(store.add_id("wx_1").await.unwrap());
        assert!(!store.add_id("wx_1").await.unwrap());
        assert!(store.add_id("wx_2").await.unwrap());

        let reopened = AccountStore::open(&path).await;
        assert_eq!(reopened.ids().await, vec!["wx_1", "wx_2"]);

        assert!(reopened.remove_id("wx_1").await.unwrap());
        assert!(!reopened.remove_id("wx_9").await.unwrap());
        assert_eq!(AccountStore::open(&path).await.ids().await, vec!["wx_2"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn negative_expiry_is_healed_and_ids_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        std::fs::write(&path, "expire_time = -5\nid = [\"wx_1\"]\n").unwrap();
        let store = AccountStore::open(&path).await;
        assert_eq!(store.expire_time().await, 10);
        assert_eq!(store.ids().await, vec!["wx_1"]);
        assert!(logs_contain("negative expire_time"));
        let reread: AccountSettings =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread.expire_time, 10);
    }

    #[tokio::test]
    async fn failed_save_leaves_ids_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.toml");
        std::fs::write(&path, "id = [\"wx_1\", \"wx_2\"]\n").unwrap();
        let store = AccountStore::open(&path).await;

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(store.remove_id("wx_1").await.is_err());
        assert_eq!(store.ids().await, vec!["wx_1", "wx_2"]);
        assert!(store.add_id("wx_3").await.is_err());
        assert_eq!(store.ids().await, vec!["wx_1", "wx_2"]);
    }
}
