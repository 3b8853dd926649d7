// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event bus double that records every publication.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use wxbridge_core::{BusEvent, EventBus};

/// Keeps `(topic, event)` pairs in publication order.
#[derive(Default)]
pub struct RecordingBus {
    events: Mutex<Vec<(String, BusEvent)>>,
    notify: Notify,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topics(&self) -> Vec<String> {
        self.lock().iter().map(|(t, _)| t.clone()).collect()
    }

    /// Events published on exactly `topic`.
    pub fn events_on(&self, topic: &str) -> Vec<BusEvent> {
        self.lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Waits until at least `count` events were published, or `timeout` passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, BusEvent)>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl EventBus for RecordingBus {
    async fn publish(&self, topic: &str, event: BusEvent) {
        self.lock().push((topic.to_string(), event));
        self.notify.notify_waiters();
    }
}
