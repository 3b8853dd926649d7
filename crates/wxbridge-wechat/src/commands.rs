// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative text commands: list, login and remove accounts.
//!
//! Commands are `#微信<verb>` or `#WeChat<verb>` with verb `账号` (list),
//! `登录` (QR login) or `删除<id>` (remove). Every command needs the
//! permission level configured in the account store.

use std::sync::Arc;

use tracing::{info, warn};
use wxbridge_config::Role;

use crate::lifecycle::{LoginMode, QrSink, SessionManager};

const PREFIXES: [&str; 2] = ["#微信", "#WeChat"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    List,
    Login,
    Remove(String),
}

impl AdminCommand {
    /// Parses a whole message; anything else is `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let verb = PREFIXES.iter().find_map(|p| text.strip_prefix(p))?;
        match verb {
            "账号" => Some(Self::List),
            "登录" => Some(Self::Login),
            _ => {
                let id = verb.strip_prefix("删除")?.trim();
                (!id.is_empty()).then(|| Self::Remove(id.to_string()))
            }
        }
    }
}

/// What the host should do with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Not an admin command.
    Ignored,
    /// The caller's role is below the configured permission.
    Denied,
    Reply(String),
}

/// Runs admin commands against one session manager.
#[derive(Clone)]
pub struct AdminCommands {
    manager: Arc<SessionManager>,
}

impl AdminCommands {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Handles `text` sent by a caller with `role`.
    ///
    /// A login streams its QR prompt to `sink` before the final reply.
    pub async fn handle(&self, text: &str, role: Role, sink: QrSink) -> CommandOutcome {
        let Some(command) = AdminCommand::parse(text.trim()) else {
            return CommandOutcome::Ignored;
        };
        let permission = self.manager.store().permission().await;
        if !permission.permits(role) {
            warn!(?command, %role, %permission, "admin command denied");
            return CommandOutcome::Denied;
        }
        info!(?command, "running admin command");
        CommandOutcome::Reply(self.run(command, sink).await)
    }

    async fn run(&self, command: AdminCommand, sink: QrSink) -> String {
        let store = self.manager.store();
        match command {
            AdminCommand::List => {
                let ids = store.ids().await;
                format!("{} accounts:\n{}", ids.len(), ids.join("\n"))
            }
            AdminCommand::Login => match self.manager.connect(LoginMode::Qr(sink)).await {
                Some(_) => format!(
                    "Account connected, {} accounts total",
                    store.ids().await.len()
                ),
                None => "Account connection failed".to_string(),
            },
            AdminCommand::Remove(id) => match store.remove_id(&id).await {
                Ok(true) => format!(
                    "Account removed, takes effect after restart, {} accounts total",
                    store.ids().await.len()
                ),
                Ok(false) => format!("Account not found: {id}"),
                Err(e) => {
                    warn!(id = %id, error = %e, "failed to save account store");
                    format!("Failed to remove account {id}: {e}")
                }
            },
        }
    }
}
