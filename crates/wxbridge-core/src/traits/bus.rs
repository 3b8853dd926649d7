// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publishing seam between the gateway and the host bot bus.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{Account, CanonicalMessage};

/// Payload carried by a bus topic.
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// A normalized inbound message.
    Message(Arc<CanonicalMessage>),
    /// An account finished logging in.
    Connect(Arc<Account>),
}

impl BusEvent {
    /// The message payload, if this is a message event.
    pub fn as_message(&self) -> Option<&CanonicalMessage> {
        match self {
            Self::Message(msg) => Some(msg),
            Self::Connect(_) => None,
        }
    }

    /// The account payload, if this is a connect event.
    pub fn as_account(&self) -> Option<&Account> {
        match self {
            Self::Connect(account) => Some(account),
            Self::Message(_) => None,
        }
    }
}

/// Topic-addressed event sink provided by the host.
#[async_trait]
pub trait EventBus: Send + Sync + 'static {
    /// Publishes one event on `topic`.
    async fn publish(&self, topic: &str, event: BusEvent);
}

/// Publishes on `<base>.<scope>` and then on `<base>`.
pub async fn publish_scoped(bus: &dyn EventBus, base: &str, scope: &str, event: BusEvent) {
    bus.publish(&format!("{base}.{scope}"), event.clone()).await;
    bus.publish(base, event).await;
}
