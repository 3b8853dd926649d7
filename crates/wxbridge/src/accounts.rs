// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wxbridge accounts` command implementation.
//!
//! Reads and edits the persisted account store offline. Removing an account
//! only edits the id list; its credential file is left in place.

use serde::Serialize;
use wxbridge_config::AccountStore;
use wxbridge_config::model::WeChatConfig;
use wxbridge_core::BridgeError;
use wxbridge_wechat::credentials::CredentialStore;

/// One stored account.
#[derive(Debug, Serialize, PartialEq)]
pub struct AccountEntry {
    pub id: String,
    /// Whether a credential file exists, i.e. whether a resume can be tried.
    pub credentials: bool,
}

/// Structured output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct AccountsReport {
    pub account_store: String,
    pub data_dir: String,
    pub permission: String,
    pub expire_time: i64,
    pub accounts: Vec<AccountEntry>,
}

pub async fn collect(config: &WeChatConfig) -> AccountsReport {
    let store = AccountStore::open(&config.account_store).await;
    let credentials = CredentialStore::new(&config.data_dir);
    let settings = store.snapshot().await;
    let accounts = settings
        .id
        .iter()
        .map(|id| AccountEntry {
            id: id.clone(),
            credentials: credentials.path_for(id).exists(),
        })
        .collect();
    AccountsReport {
        account_store: config.account_store.clone(),
        data_dir: config.data_dir.clone(),
        permission: settings.permission.to_string(),
        expire_time: settings.expire_time,
        accounts,
    }
}

/// Human-readable rendering of a report.
pub fn render(report: &AccountsReport) -> String {
    let mut out = format!("{} accounts:\n", report.accounts.len());
    for entry in &report.accounts {
        let state = if entry.credentials {
            "credentials saved"
        } else {
            "no credentials"
        };
        out.push_str(&format!("  {} ({state})\n", entry.id));
    }
    out.push_str(&format!(
        "store: {}\ndata: {}\npermission: {}, expire_time: {}s\n",
        report.account_store, report.data_dir, report.permission, report.expire_time
    ));
    out
}

/// Run `wxbridge accounts list`.
pub async fn run_list(config: &WeChatConfig, json: bool) -> Result<(), BridgeError> {
    let report = collect(config).await;
    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| BridgeError::Internal(format!("failed to serialize report: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", render(&report));
    }
    Ok(())
}

/// Run `wxbridge accounts remove <id>`. Returns whether the id was stored.
pub async fn run_remove(config: &WeChatConfig, id: &str) -> Result<bool, BridgeError> {
    let store = AccountStore::open(&config.account_store).await;
    let removed = store.remove_id(id).await?;
    let total = store.ids().await.len();
    if removed {
        println!("Account removed, takes effect after restart, {total} accounts total");
    } else {
        println!("Account not found: {id}");
    }
    Ok(removed)
}
