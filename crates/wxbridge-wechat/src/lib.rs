// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WeChat Web gateway for the wxbridge bot bus.
//!
//! Bridges WeChat Web session clients to a topic bus: inbound session events
//! are normalized into canonical messages and published, outbound canonical
//! segments are dispatched through the session's typed sends, and any number
//! of accounts are logged in, persisted and reconnected at startup.
//!
//! [`WeChatAdapter`] is the entry point; it owns a [`SessionManager`] and the
//! [`AdminCommands`] that drive it.

pub mod commands;
pub mod credentials;
pub mod dispatch;
pub mod errlog;
pub mod identity;
pub mod lifecycle;
pub mod media;
pub mod normalize;
pub mod pick;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use wxbridge_config::AccountStore;
use wxbridge_config::model::WeChatConfig;
use wxbridge_core::protocol::SendAck;
use wxbridge_core::types::{HealthStatus, Segment, SendOutcome};
use wxbridge_core::{BridgeError, EventBus, PluginAdapter, SessionFactory};

pub use commands::{AdminCommand, AdminCommands, CommandOutcome};
pub use lifecycle::{LoginMode, QrSink, SessionManager};
pub use registry::{AccountHandle, AccountRegistry};

/// The WeChat gateway as one adapter.
pub struct WeChatAdapter {
    manager: Arc<SessionManager>,
    commands: AdminCommands,
}

impl WeChatAdapter {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        let commands = AdminCommands::new(manager.clone());
        Self { manager, commands }
    }

    /// Opens the account store named by `config` and builds the adapter.
    pub async fn from_config(
        factory: Arc<dyn SessionFactory>,
        bus: Arc<dyn EventBus>,
        config: &WeChatConfig,
    ) -> Self {
        let store = Arc::new(AccountStore::open(&config.account_store).await);
        Self::new(Arc::new(SessionManager::new(factory, bus, store, config)))
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn commands(&self) -> &AdminCommands {
        &self.commands
    }

    /// Reconnects every persisted account. Returns how many came online.
    pub async fn load(&self) -> usize {
        self.manager.load().await
    }

    /// The live handle of account `self_id`.
    pub fn account(&self, self_id: &str) -> Result<Arc<AccountHandle>, BridgeError> {
        self.manager
            .registry()
            .get(self_id)
            .ok_or_else(|| BridgeError::UnknownAccount(self_id.to_string()))
    }

    pub async fn send_msg(
        &self,
        self_id: &str,
        target: &str,
        segments: &[Segment],
    ) -> Result<SendOutcome, BridgeError> {
        self.account(self_id)?.send_msg(target, segments).await
    }

    pub async fn recall_msg(
        &self,
        self_id: &str,
        target: &str,
        message_ids: &[String],
    ) -> Result<Vec<SendAck>, BridgeError> {
        self.account(self_id)?.recall_msg(target, message_ids).await
    }
}

#[async_trait]
impl PluginAdapter for WeChatAdapter {
    fn name(&self) -> &str {
        "WeChat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION"))
            .unwrap_or_else(|_| semver::Version::new(0, 1, 0))
    }

    async fn health_check(&self) -> Result<HealthStatus, BridgeError> {
        let stored = self.manager.store().ids().await.len();
        let connected = self.manager.registry().len();
        if stored > 0 && connected == 0 {
            return Ok(HealthStatus::Degraded(format!(
                "none of {stored} stored accounts is connected"
            )));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), BridgeError> {
        debug!("WeChat adapter shutting down");
        self.manager.shutdown().await;
        Ok(())
    }
}
