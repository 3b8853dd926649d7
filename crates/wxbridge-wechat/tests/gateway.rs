// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end flows through the session manager with mock sessions.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wxbridge_config::model::WeChatConfig;
use wxbridge_config::{AccountSettings, AccountStore};
use wxbridge_core::protocol::SessionEvent;
use wxbridge_core::types::{MessageType, Segment};
use wxbridge_test_utils::{MockSession, MockSessionFactory, RecordingBus, fixtures};
use wxbridge_wechat::{LoginMode, SessionManager};

struct Gateway {
    factory: Arc<MockSessionFactory>,
    bus: Arc<RecordingBus>,
    manager: SessionManager,
    config: WeChatConfig,
    _dir: tempfile::TempDir,
}

fn gateway(ids: &[&str], grace_ms: u64) -> Gateway {
    let dir = tempfile::tempdir().unwrap();
    let config = WeChatConfig {
        data_dir: dir.path().join("data").to_string_lossy().into_owned(),
        account_store: dir.path().join("accounts.toml").to_string_lossy().into_owned(),
        error_suppression_secs: 15,
        message_grace_ms: grace_ms,
    };
    let store = Arc::new(AccountStore::with_settings(
        &config.account_store,
        AccountSettings {
            id: ids.iter().map(|s| s.to_string()).collect(),
            ..AccountSettings::default()
        },
    ));
    let factory = Arc::new(MockSessionFactory::new());
    let bus = Arc::new(RecordingBus::new());
    let manager = SessionManager::new(factory.clone(), bus.clone(), store, &config);
    Gateway {
        factory,
        bus,
        manager,
        config,
        _dir: dir,
    }
}

fn write_credentials(config: &WeChatConfig, id: &str, blob: serde_json::Value) {
    std::fs::create_dir_all(&config.data_dir).unwrap();
    let path = std::path::Path::new(&config.data_dir).join(format!("{id}.json"));
    std::fs::write(path, blob.to_string()).unwrap();
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

async fn connected(gw: &Gateway, uin: u64) -> Arc<MockSession> {
    let session = Arc::new(MockSession::logging_in_as(fixtures::user(uin, "@me", "Me")));
    session.add_contact(fixtures::friend("@alice", "Alice"));
    session.add_contact(fixtures::group("@@room", "Room", vec![]));
    gw.factory.push_fresh(session.clone());
    let id = gw.manager.connect(LoginMode::Qr(Arc::new(|_| {}))).await;
    assert_eq!(id, Some(format!("wx_{uin}")));
    session
}

#[tokio::test]
async fn private_text_is_published_fine_then_coarse() {
    let gw = gateway(&[], 0);
    let session = connected(&gw, 42).await;

    session.emit(SessionEvent::Message(fixtures::text_message(
        "@alice",
        "@me",
        "hi",
        now(),
    )));
    assert!(gw.bus.wait_for(4, Duration::from_secs(5)).await);
    assert_eq!(
        gw.bus.topics(),
        vec!["connect.wx_42", "connect", "message.private", "message"]
    );

    let events = gw.bus.events_on("message.private");
    let msg = events[0].as_message().unwrap();
    assert_eq!(msg.message, vec![Segment::text("hi")]);
    assert_eq!(msg.raw_message, "hi");
    assert_eq!(msg.self_id, "wx_42");
    assert_eq!(msg.sender.nickname, "Alice");
    gw.manager.shutdown().await;
}

#[tokio::test]
async fn self_private_message_carries_account_profile() {
    let gw = gateway(&[], 0);
    let session = connected(&gw, 42).await;

    let mut raw = fixtures::text_message("@me", "@me", "memo", now());
    raw.is_send_by_self = true;
    session.emit(SessionEvent::Message(raw));
    assert!(gw.bus.wait_for(4, Duration::from_secs(5)).await);

    let events = gw.bus.events_on("message");
    let msg = events[0].as_message().unwrap();
    assert_eq!(msg.message_type, MessageType::Private);
    let account = gw.manager.registry().get("wx_42").unwrap();
    assert_eq!(msg.sender, account.account().profile());
    gw.manager.shutdown().await;
}

#[tokio::test]
async fn group_message_is_published_on_group_topic() {
    let gw = gateway(&[], 0);
    let session = connected(&gw, 42).await;

    session.emit(SessionEvent::Message(fixtures::group_message(
        "@@room", "@alice", "Ally", "@me", "Hello:World", now(),
    )));
    assert!(gw.bus.wait_for(4, Duration::from_secs(5)).await);
    let events = gw.bus.events_on("message.group");
    let msg = events[0].as_message().unwrap();
    assert_eq!(msg.group_name.as_deref(), Some("Room"));
    assert_eq!(msg.message, vec![Segment::text("Hello:World")]);
    gw.manager.shutdown().await;
}

#[tokio::test]
async fn stale_message_is_not_published() {
    let gw = gateway(&[], 0);
    let session = connected(&gw, 42).await;

    session.emit(SessionEvent::Message(fixtures::text_message(
        "@alice",
        "@me",
        "old",
        now() - 3600,
    )));
    session.emit(SessionEvent::Message(fixtures::text_message(
        "@alice",
        "@me",
        "fresh",
        now(),
    )));
    assert!(gw.bus.wait_for(4, Duration::from_secs(5)).await);
    let events = gw.bus.events_on("message");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_message().unwrap().raw_message, "fresh");
    gw.manager.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn messages_within_grace_period_are_dropped() {
    let gw = gateway(&[], 5_000);
    let session = connected(&gw, 42).await;

    session.emit(SessionEvent::Message(fixtures::text_message(
        "@alice", "@me", "early", now(),
    )));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(gw.bus.len(), 2);

    tokio::time::sleep(Duration::from_secs(5)).await;
    session.emit(SessionEvent::Message(fixtures::text_message(
        "@alice", "@me", "late", now(),
    )));
    assert!(gw.bus.wait_for(4, Duration::from_secs(1)).await);
    let events = gw.bus.events_on("message");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_message().unwrap().raw_message, "late");
    gw.manager.shutdown().await;
}

#[tokio::test]
async fn resume_restores_from_persisted_blob() {
    let gw = gateway(&["wx_7"], 0);
    let blob = json!({"skey": "k", "cookies": {"a": "b"}});
    write_credentials(&gw.config, "wx_7", blob.clone());
    let session = Arc::new(MockSession::logging_in_as(fixtures::user(7, "@me", "Me")));
    gw.factory.push_restored(session.clone());

    assert_eq!(gw.manager.load().await, 1);
    assert_eq!(gw.factory.restore_blobs(), vec![blob.clone()]);
    assert_eq!(session.restart_calls(), 1);
    assert_eq!(session.start_calls(), 0);
    assert_eq!(gw.bus.topics(), vec!["connect.wx_7", "connect"]);

    let saved = gw.manager.credentials().load("wx_7").await.unwrap();
    assert_eq!(saved, Some(blob));
    gw.manager.shutdown().await;
}

#[tokio::test]
async fn startup_continues_past_failures_and_panics() {
    let gw = gateway(&["wx_1", "wx_2", "wx_3"], 0);
    write_credentials(&gw.config, "wx_2", json!({"n": 2}));
    write_credentials(&gw.config, "wx_3", json!({"n": 3}));

    let panicking = Arc::new(MockSession::logging_in_as(fixtures::user(2, "@two", "Two")));
    panicking.panic_on_login();
    gw.factory.push_restored(panicking);
    gw.factory
        .push_restored(Arc::new(MockSession::logging_in_as(fixtures::user(3, "@three", "Three"))));

    assert_eq!(gw.manager.load().await, 1);
    assert_eq!(gw.manager.registry().ids(), vec!["wx_3"]);
    // wx_1 has no credential file and never reaches the factory.
    assert_eq!(gw.factory.restore_blobs(), vec![json!({"n": 2}), json!({"n": 3})]);
    assert_eq!(
        gw.manager.store().ids().await,
        vec!["wx_1", "wx_2", "wx_3"]
    );
    gw.manager.shutdown().await;
}

#[tokio::test]
async fn repeated_session_errors_are_suppressed() {
    let gw = gateway(&[], 0);
    let session = connected(&gw, 42).await;
    let err = wxbridge_core::protocol::SessionErrorInfo {
        name: "Error".into(),
        message: "sync check failed".into(),
        code: Some("1101".into()),
        tips: None,
    };
    session.emit(SessionEvent::Error(err.clone()));
    session.emit(SessionEvent::Message(fixtures::text_message(
        "@alice", "@me", "after", now(),
    )));
    assert!(gw.bus.wait_for(4, Duration::from_secs(5)).await);
    assert!(!gw.manager.errors().report(&err, Some("wx_42")));
    gw.manager.shutdown().await;
}
