// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contract for the WeChat Web session client.
//!
//! The session client owns the transport, QR rendering and encryption. The
//! gateway only drives it through this trait, which keeps every component
//! testable against an in-memory double.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::BridgeError;
use crate::protocol::{
    ContactTable, OutboundPayload, ProtocolConstants, RawUser, SendAck, SessionEvent,
    SessionProps,
};

/// One live (or logging-in) WeChat Web session.
#[async_trait]
pub trait SessionClient: Send + Sync + 'static {
    /// Begins a fresh login; progress arrives as [`SessionEvent`]s.
    async fn start(&self) -> Result<(), BridgeError>;

    /// Resumes a session restored from a credential blob.
    async fn restart(&self) -> Result<(), BridgeError>;

    /// Subscribes to the session's event stream.
    ///
    /// Events emitted before the call are not replayed, so subscribe before
    /// calling [`start`](Self::start) or [`restart`](Self::restart).
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// Sends one payload to a raw target id.
    async fn send_msg(&self, payload: OutboundPayload, to: &str) -> Result<SendAck, BridgeError>;

    /// Revokes a previously sent message.
    async fn revoke_msg(&self, msg_id: &str, to: &str) -> Result<SendAck, BridgeError>;

    /// Snapshot of the live contact table.
    fn contacts(&self) -> ContactTable;

    /// Message-type enums and URL templates.
    fn constants(&self) -> ProtocolConstants;

    /// Current session tokens.
    fn props(&self) -> SessionProps;

    /// The authenticated user, once logged in.
    fn user(&self) -> Option<RawUser>;

    /// Serializable blob sufficient to restore this session later.
    fn credentials(&self) -> serde_json::Value;
}

/// Creates session clients, either fresh or from persisted credentials.
pub trait SessionFactory: Send + Sync + 'static {
    /// A new, unauthenticated session.
    fn create(&self) -> Arc<dyn SessionClient>;

    /// A session rebuilt from a credential blob; [`SessionClient::restart`]
    /// must still be called to bring it online.
    fn restore(&self, blob: serde_json::Value) -> Result<Arc<dyn SessionClient>, BridgeError>;
}
