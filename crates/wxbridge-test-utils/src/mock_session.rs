// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted session client for deterministic tests.
//!
//! `MockSession` implements `SessionClient` entirely in memory: `start()` and
//! `restart()` replay a configured list of events, sends and revokes are
//! captured for assertions, and inbound events can be injected at any time.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use wxbridge_core::protocol::{
    ContactTable, OutboundPayload, ProtocolConstants, RawContact, RawUser, SendAck, SessionEvent,
    SessionProps,
};
use wxbridge_core::{BridgeError, SessionClient, SessionFactory};

/// One captured outbound payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SentItem {
    pub to: String,
    pub payload: OutboundPayload,
}

impl SentItem {
    /// The text, for text payloads.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            OutboundPayload::Text(text) => Some(text),
            OutboundPayload::File { .. } => None,
        }
    }
}

#[derive(Default)]
struct State {
    contacts: ContactTable,
    user: Option<RawUser>,
    props: SessionProps,
    credentials: serde_json::Value,
    login_events: Vec<SessionEvent>,
    queued_acks: VecDeque<Result<SendAck, String>>,
    sent: Vec<SentItem>,
    revoked: Vec<(String, String)>,
}

/// In-memory [`SessionClient`].
pub struct MockSession {
    events: broadcast::Sender<SessionEvent>,
    state: Mutex<State>,
    constants: ProtocolConstants,
    send_delay: Mutex<Option<Duration>>,
    panic_on_login: AtomicBool,
    start_calls: AtomicUsize,
    restart_calls: AtomicUsize,
    next_msg_id: AtomicU64,
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSession {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            events,
            state: Mutex::new(State::default()),
            constants: ProtocolConstants::default(),
            send_delay: Mutex::new(None),
            panic_on_login: AtomicBool::new(false),
            start_calls: AtomicUsize::new(0),
            restart_calls: AtomicUsize::new(0),
            next_msg_id: AtomicU64::new(1),
        }
    }

    /// A session that logs in as `user` as soon as it is started.
    pub fn logging_in_as(user: RawUser) -> Self {
        let session = Self::new();
        session.set_user(user);
        session.on_login(vec![SessionEvent::Login]);
        session
    }

    /// A session whose login attempt is rejected.
    pub fn rejecting_login() -> Self {
        let session = Self::new();
        session.on_login(vec![SessionEvent::Logout]);
        session
    }

    /// Events replayed by every `start()` / `restart()`.
    pub fn on_login(&self, events: Vec<SessionEvent>) {
        self.lock().login_events = events;
    }

    /// Makes `start()` / `restart()` panic.
    pub fn panic_on_login(&self) {
        self.panic_on_login.store(true, Ordering::SeqCst);
    }

    pub fn set_user(&self, user: RawUser) {
        self.lock().user = Some(user);
    }

    pub fn set_props(&self, props: SessionProps) {
        self.lock().props = props;
    }

    pub fn set_credentials(&self, credentials: serde_json::Value) {
        self.lock().credentials = credentials;
    }

    pub fn add_contact(&self, contact: RawContact) {
        self.lock()
            .contacts
            .insert(contact.user_name.clone(), contact);
    }

    pub fn remove_contact(&self, user_name: &str) {
        self.lock().contacts.remove(user_name);
    }

    /// Delays every send, to widen interleaving windows in concurrency tests.
    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }

    /// Acknowledgment returned by the next send instead of a generated one.
    pub fn queue_ack(&self, ack: SendAck) {
        self.lock().queued_acks.push_back(Ok(ack));
    }

    /// Makes the next send fail with `message`.
    pub fn queue_send_failure(&self, message: &str) {
        self.lock().queued_acks.push_back(Err(message.to_string()));
    }

    /// Emits an event to current subscribers.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn sent(&self) -> Vec<SentItem> {
        self.lock().sent.clone()
    }

    /// Texts of all text payloads, in send order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .filter_map(|item| item.text().map(str::to_string))
            .collect()
    }

    /// `(msg_id, target)` pairs passed to `revoke_msg`.
    pub fn revoked(&self) -> Vec<(String, String)> {
        self.lock().revoked.clone()
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn restart_calls(&self) -> usize {
        self.restart_calls.load(Ordering::SeqCst)
    }

    fn replay_login(&self) {
        if self.panic_on_login.load(Ordering::SeqCst) {
            panic!("mock session login panicked");
        }
        let events = self.lock().login_events.clone();
        for event in events {
            self.emit(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SessionClient for MockSession {
    async fn start(&self) -> Result<(), BridgeError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.replay_login();
        Ok(())
    }

    async fn restart(&self) -> Result<(), BridgeError> {
        self.restart_calls.fetch_add(1, Ordering::SeqCst);
        self.replay_login();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn send_msg(&self, payload: OutboundPayload, to: &str) -> Result<SendAck, BridgeError> {
        let delay = *self.send_delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.lock();
        state.sent.push(SentItem {
            to: to.to_string(),
            payload,
        });
        match state.queued_acks.pop_front() {
            Some(Ok(ack)) => Ok(ack),
            Some(Err(message)) => Err(BridgeError::session(message)),
            None => {
                let id = self.next_msg_id.fetch_add(1, Ordering::SeqCst);
                Ok(SendAck::with_id(id.to_string()))
            }
        }
    }

    async fn revoke_msg(&self, msg_id: &str, to: &str) -> Result<SendAck, BridgeError> {
        self.lock()
            .revoked
            .push((msg_id.to_string(), to.to_string()));
        Ok(SendAck::default())
    }

    fn contacts(&self) -> ContactTable {
        self.lock().contacts.clone()
    }

    fn constants(&self) -> ProtocolConstants {
        self.constants.clone()
    }

    fn props(&self) -> SessionProps {
        self.lock().props.clone()
    }

    fn user(&self) -> Option<RawUser> {
        self.lock().user.clone()
    }

    fn credentials(&self) -> serde_json::Value {
        self.lock().credentials.clone()
    }
}

/// Hands out pre-built sessions and records restore blobs.
#[derive(Default)]
pub struct MockSessionFactory {
    fresh: Mutex<VecDeque<Arc<MockSession>>>,
    restored: Mutex<VecDeque<Arc<MockSession>>>,
    blobs: Mutex<Vec<serde_json::Value>>,
    created: Mutex<Vec<Arc<MockSession>>>,
}

impl MockSessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session returned by the next `create()`.
    pub fn push_fresh(&self, session: Arc<MockSession>) {
        lock(&self.fresh).push_back(session);
    }

    /// Session returned by the next `restore()`.
    pub fn push_restored(&self, session: Arc<MockSession>) {
        lock(&self.restored).push_back(session);
    }

    /// Blobs passed to `restore()`, in call order.
    pub fn restore_blobs(&self) -> Vec<serde_json::Value> {
        lock(&self.blobs).clone()
    }

    /// Every session handed out so far.
    pub fn sessions(&self) -> Vec<Arc<MockSession>> {
        lock(&self.created).clone()
    }

    fn hand_out(&self, session: Arc<MockSession>) -> Arc<dyn SessionClient> {
        lock(&self.created).push(session.clone());
        session
    }
}

impl SessionFactory for MockSessionFactory {
    fn create(&self) -> Arc<dyn SessionClient> {
        let session = lock(&self.fresh)
            .pop_front()
            .unwrap_or_else(|| Arc::new(MockSession::rejecting_login()));
        self.hand_out(session)
    }

    fn restore(&self, blob: serde_json::Value) -> Result<Arc<dyn SessionClient>, BridgeError> {
        lock(&self.blobs).push(blob.clone());
        let session = lock(&self.restored)
            .pop_front()
            .unwrap_or_else(|| Arc::new(MockSession::rejecting_login()));
        session.set_credentials(blob);
        Ok(self.hand_out(session))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn start_replays_login_events() {
        let session = MockSession::logging_in_as(fixtures::user(7, "@me", "Me"));
        let mut rx = session.subscribe();
        session.start().await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::Login);
        assert_eq!(session.start_calls(), 1);
        assert_eq!(session.restart_calls(), 0);
    }

    #[tokio::test]
    async fn sends_are_captured_with_generated_ids() {
        let session = MockSession::new();
        let a = session
            .send_msg(OutboundPayload::Text("a".into()), "@x")
            .await
            .unwrap();
        session.queue_ack(SendAck::default());
        let b = session
            .send_msg(OutboundPayload::Text("b".into()), "@x")
            .await
            .unwrap();
        assert_eq!(a.msg_id.as_deref(), Some("1"));
        assert_eq!(b.msg_id, None);
        assert_eq!(session.sent_texts(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn queued_failure_surfaces_as_error() {
        let session = MockSession::new();
        session.queue_send_failure("rate limited");
        let err = session
            .send_msg(OutboundPayload::Text("a".into()), "@x")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn factory_records_restore_blobs() {
        let factory = MockSessionFactory::new();
        let blob = serde_json::json!({"PROP": {"uin": 1}});
        let session = factory.restore(blob.clone()).unwrap();
        assert_eq!(session.credentials(), blob);
        assert_eq!(factory.restore_blobs(), vec![blob]);
        assert_eq!(factory.sessions().len(), 1);
    }
}
