// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process topic bus.
//!
//! Every published event is wrapped in an [`Envelope`] and fanned out over a
//! tokio broadcast channel. Subscribers pick the topics they care about with a
//! [`TopicFilter`]; non-matching envelopes are skipped on receive.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;
use wxbridge_core::{BusEvent, EventBus};

/// Default broadcast capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// One published event with routing metadata.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: Uuid,
    pub topic: String,
    pub at: DateTime<Utc>,
    pub event: BusEvent,
}

/// Which topics a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicFilter {
    All,
    /// Exactly this topic.
    Exact(String),
    /// This topic and every `<topic>.<suffix>` below it.
    Prefix(String),
}

impl TopicFilter {
    /// Parses `*`, `base.*` or an exact topic.
    pub fn parse(pattern: &str) -> Self {
        if pattern == "*" {
            Self::All
        } else if let Some(base) = pattern.strip_suffix(".*") {
            Self::Prefix(base.to_string())
        } else {
            Self::Exact(pattern.to_string())
        }
    }

    pub fn matches(&self, topic: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(t) => t == topic,
            Self::Prefix(base) => {
                topic == base
                    || topic
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            }
        }
    }
}

/// Broadcast-backed [`EventBus`].
#[derive(Debug, Clone)]
pub struct TopicBus {
    tx: broadcast::Sender<Arc<Envelope>>,
}

impl Default for TopicBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TopicBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to envelopes whose topic matches `filter`.
    pub fn subscribe(&self, filter: TopicFilter) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl EventBus for TopicBus {
    async fn publish(&self, topic: &str, event: BusEvent) {
        let envelope = Arc::new(Envelope {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            at: Utc::now(),
            event,
        });
        // Publishing with no subscribers is not an error.
        if self.tx.send(envelope).is_err() {
            debug!(topic, "no subscribers for topic");
        }
    }
}

/// A filtered receiver handle.
pub struct Subscription {
    rx: broadcast::Receiver<Arc<Envelope>>,
    filter: TopicFilter,
}

impl Subscription {
    /// Next matching envelope, or `None` once the bus is dropped.
    ///
    /// A lagging subscriber loses the overwritten envelopes and keeps going.
    pub async fn recv(&mut self) -> Option<Arc<Envelope>> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if self.filter.matches(&envelope.topic) => return Some(envelope),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "bus subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxbridge_core::types::{
        Account, CanonicalMessage, MessageType, PostType, Segment, Sender,
    };
    use wxbridge_core::publish_scoped;

    fn message() -> BusEvent {
        BusEvent::Message(Arc::new(CanonicalMessage {
            post_type: PostType::Message,
            message_type: MessageType::Private,
            self_id: "wx_1".into(),
            user_id: "wx_@a".into(),
            group_id: None,
            group_name: None,
            group: None,
            sender: Sender::default(),
            message: vec![Segment::text("hi")],
            raw_message: "hi".into(),
            message_id: "m1".into(),
            time: 0,
        }))
    }

    #[test]
    fn filter_parsing_and_matching() {
        assert_eq!(TopicFilter::parse("*"), TopicFilter::All);
        let prefix = TopicFilter::parse("message.*");
        assert!(prefix.matches("message"));
        assert!(prefix.matches("message.group"));
        assert!(!prefix.matches("messages"));
        assert!(!prefix.matches("connect"));
        let exact = TopicFilter::parse("connect");
        assert!(exact.matches("connect"));
        assert!(!exact.matches("connect.wx_1"));
    }

    #[tokio::test]
    async fn subscriber_sees_only_matching_topics_in_order() {
        let bus = TopicBus::default();
        let mut sub = bus.subscribe(TopicFilter::Exact("message".into()));
        bus.publish("connect", BusEvent::Connect(Arc::new(account()))).await;
        publish_scoped(&bus, "message", "private", message()).await;

        let envelope = sub.recv().await.unwrap();
        assert_eq!(envelope.topic, "message");
        assert_eq!(envelope.event.as_message().unwrap().raw_message, "hi");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let bus = TopicBus::new(4);
        bus.publish("message", message()).await;
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn lagged_subscriber_recovers() {
        let bus = TopicBus::new(2);
        let mut sub = bus.subscribe(TopicFilter::All);
        for _ in 0..5 {
            bus.publish("message", message()).await;
        }
        assert!(sub.recv().await.is_some());
    }

    #[tokio::test]
    async fn recv_ends_when_bus_dropped() {
        let bus = TopicBus::default();
        let mut sub = bus.subscribe(TopicFilter::All);
        drop(bus);
        assert!(sub.recv().await.is_none());
    }

    fn account() -> Account {
        Account {
            id: "wx_1".into(),
            user_name: "@me".into(),
            nickname: "me".into(),
            avatar: String::new(),
            start_time: Utc::now(),
            credentials: serde_json::Value::Null,
        }
    }
}
