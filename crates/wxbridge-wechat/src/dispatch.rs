// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound canonical segments to session client sends.
//!
//! Segments of one message go out strictly in order. Each top-level
//! [`Dispatcher::send`] and [`Dispatcher::recall`] holds the account's send
//! lane for its whole duration, so two sends on one account never interleave.
//! Forward bundles recurse inside the same hold.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use wxbridge_core::ids::raw_id;
use wxbridge_core::protocol::{OutboundPayload, SendAck};
use wxbridge_core::types::{FileSource, Media, Segment, SendOutcome};
use wxbridge_core::{BridgeError, SessionClient};

use crate::media::MediaFetcher;

/// Sends and recalls messages for one account.
pub struct Dispatcher {
    session: Arc<dyn SessionClient>,
    fetcher: MediaFetcher,
    self_id: String,
    lane: Mutex<()>,
}

impl Dispatcher {
    pub fn new(
        session: Arc<dyn SessionClient>,
        fetcher: MediaFetcher,
        self_id: impl Into<String>,
    ) -> Self {
        Self {
            session,
            fetcher,
            self_id: self_id.into(),
            lane: Mutex::new(()),
        }
    }

    /// Sends `segments` to `target` (raw or canonical id).
    ///
    /// Stops at the first failing segment; acknowledgments collected before
    /// the failure are discarded with the error.
    pub async fn send(
        &self,
        target: &str,
        segments: &[Segment],
    ) -> Result<SendOutcome, BridgeError> {
        let _lane = self.lane.lock().await;
        let to = raw_id(target);
        debug!(self_id = %self.self_id, to, count = segments.len(), "sending message");
        self.send_segments(to, segments).await
    }

    /// Revokes `message_ids` in order, one acknowledgment per id.
    pub async fn recall(
        &self,
        target: &str,
        message_ids: &[String],
    ) -> Result<Vec<SendAck>, BridgeError> {
        let _lane = self.lane.lock().await;
        let to = raw_id(target);
        let mut acks = Vec::with_capacity(message_ids.len());
        for id in message_ids {
            info!(self_id = %self.self_id, to, msg_id = %id, "recalling message");
            acks.push(self.session.revoke_msg(id, to).await?);
        }
        Ok(acks)
    }

    fn send_segments<'a>(
        &'a self,
        to: &'a str,
        segments: &'a [Segment],
    ) -> BoxFuture<'a, Result<SendOutcome, BridgeError>> {
        async move {
            let mut outcome = SendOutcome::default();
            for segment in segments {
                match segment {
                    Segment::Text { text } => {
                        info!(self_id = %self.self_id, to, "send text: {text}");
                        let ack = self
                            .session
                            .send_msg(OutboundPayload::Text(text.clone()), to)
                            .await?;
                        outcome.push(ack);
                    }
                    Segment::Image(media)
                    | Segment::Record(media)
                    | Segment::Video(media)
                    | Segment::File(media) => {
                        if let Some(ack) = self.upload(to, segment.kind(), media).await? {
                            outcome.push(ack);
                        }
                    }
                    Segment::Reply { .. } | Segment::At { .. } | Segment::Button { .. } => {
                        debug!(kind = segment.kind(), "segment not supported, dropped");
                    }
                    Segment::Node { data } => {
                        for node in data {
                            outcome.extend(self.send_segments(to, &node.message).await?);
                        }
                    }
                    Segment::Unknown(value) => {
                        let text = value.to_string();
                        info!(self_id = %self.self_id, to, "send unknown segment as text: {text}");
                        let ack = self.session.send_msg(OutboundPayload::Text(text), to).await?;
                        outcome.push(ack);
                    }
                }
            }
            Ok(outcome)
        }
        .boxed()
    }

    /// Resolves and uploads a media payload. `None` when it has no source.
    async fn upload(
        &self,
        to: &str,
        kind: &str,
        media: &Media,
    ) -> Result<Option<SendAck>, BridgeError> {
        let source = match (&media.file, &media.url) {
            (Some(file), _) => file.clone(),
            (None, Some(url)) => FileSource::from(url.clone()),
            (None, None) => {
                warn!(self_id = %self.self_id, kind, "media segment without file, skipped");
                return Ok(None);
            }
        };
        let file = self.fetcher.resolve(&source, media.name.as_deref()).await?;
        info!(
            self_id = %self.self_id,
            to,
            kind,
            name = %file.name,
            source = %file.source,
            "send {kind}: {:.2} KiB",
            file.size_kib()
        );
        let ack = self
            .session
            .send_msg(
                OutboundPayload::File {
                    bytes: file.bytes,
                    filename: file.name,
                },
                to,
            )
            .await?;
        Ok(Some(ack))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use serde_json::json;
    use wxbridge_core::types::ForwardNode;
    use wxbridge_test_utils::MockSession;

    fn dispatcher() -> (Arc<MockSession>, Arc<Dispatcher>) {
        let session = Arc::new(MockSession::new());
        let dispatcher = Dispatcher::new(session.clone(), MediaFetcher::default(), "wx_42");
        (session, Arc::new(dispatcher))
    }

    fn node(texts: &[&str]) -> ForwardNode {
        ForwardNode {
            user_id: None,
            nickname: None,
            message: texts.iter().map(|t| Segment::text(*t)).collect(),
        }
    }

    #[tokio::test]
    async fn segments_go_out_in_order_to_raw_target() {
        let (session, d) = dispatcher();
        let outcome = d
            .send("wx_@alice", &[Segment::text("one"), Segment::text("two")])
            .await
            .unwrap();
        assert_eq!(session.sent_texts(), vec!["one", "two"]);
        assert!(session.sent().iter().all(|item| item.to == "@alice"));
        assert_eq!(outcome.message_ids, vec!["1", "2"]);
        assert_eq!(outcome.sent_raw.len(), 2);
    }

    #[tokio::test]
    async fn node_expands_in_nested_order() {
        let (session, d) = dispatcher();
        let segments = vec![
            Segment::text("before"),
            Segment::Node {
                data: vec![node(&["n1", "n2"]), node(&["n3"])],
            },
            Segment::text("after"),
        ];
        let outcome = d.send("@alice", &segments).await.unwrap();
        assert_eq!(session.sent_texts(), vec!["before", "n1", "n2", "n3", "after"]);
        assert_eq!(outcome.message_ids, vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn ids_only_collected_when_present() {
        let (session, d) = dispatcher();
        session.queue_ack(SendAck::default());
        let outcome = d
            .send("@alice", &[Segment::text("a"), Segment::text("b")])
            .await
            .unwrap();
        assert_eq!(outcome.sent_raw.len(), 2);
        assert_eq!(outcome.message_ids, vec!["1"]);
    }

    #[tokio::test]
    async fn unsupported_segments_are_dropped() {
        let (session, d) = dispatcher();
        let segments = vec![
            Segment::Reply { id: "9".into() },
            Segment::At {
                user_id: "wx_@bob".into(),
            },
            Segment::Button { data: json!({}) },
            Segment::text("kept"),
        ];
        let outcome = d.send("@alice", &segments).await.unwrap();
        assert_eq!(session.sent_texts(), vec!["kept"]);
        assert_eq!(outcome.sent_raw.len(), 1);
    }

    #[tokio::test]
    async fn unknown_segment_sent_as_json_text() {
        let (session, d) = dispatcher();
        let raw = json!({"type": "poke", "id": 3});
        d.send("@alice", &[Segment::Unknown(raw.clone())])
            .await
            .unwrap();
        assert_eq!(session.sent_texts(), vec![raw.to_string()]);
    }

    #[tokio::test]
    async fn media_is_uploaded_as_file() {
        let (session, d) = dispatcher();
        let image = Segment::Image(Media {
            file: Some(FileSource::Base64("iVBORw0KGgo=".into())),
            ..Media::default()
        });
        let outcome = d.send("@alice", &[image]).await.unwrap();
        let sent = session.sent();
        assert_eq!(sent.len(), 1);
        let OutboundPayload::File { bytes, filename } = &sent[0].payload else {
            panic!("expected file payload");
        };
        assert_eq!(bytes.len(), 8);
        assert!(filename.ends_with(".png"));
        assert_eq!(outcome.message_ids, vec!["1"]);
    }

    #[tokio::test]
    async fn media_without_source_is_skipped() {
        let (session, d) = dispatcher();
        let outcome = d
            .send("@alice", &[Segment::File(Media::default()), Segment::text("x")])
            .await
            .unwrap();
        assert_eq!(session.sent().len(), 1);
        assert_eq!(outcome.sent_raw.len(), 1);
    }

    #[tokio::test]
    async fn failure_stops_remaining_segments() {
        let (session, d) = dispatcher();
        session.queue_send_failure("rate limited");
        let err = d
            .send("@alice", &[Segment::text("a"), Segment::text("b")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate limited"));
        assert_eq!(session.sent_texts(), vec!["a"]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sends_do_not_interleave() {
        let (session, d) = dispatcher();
        session.set_send_delay(Duration::from_millis(50));
        let first = {
            let d = d.clone();
            tokio::spawn(async move {
                d.send("@alice", &[Segment::text("a1"), Segment::text("a2")])
                    .await
            })
        };
        let second = {
            let d = d.clone();
            tokio::spawn(async move {
                d.send("@alice", &[Segment::text("b1"), Segment::text("b2")])
                    .await
            })
        };
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        let texts = session.sent_texts();
        assert!(
            texts == ["a1", "a2", "b1", "b2"] || texts == ["b1", "b2", "a1", "a2"],
            "interleaved: {texts:?}"
        );
    }

    #[tokio::test]
    async fn recall_revokes_in_order() {
        let (session, d) = dispatcher();
        let ids = vec!["3".to_string(), "1".to_string(), "2".to_string()];
        let acks = d.recall("wx_@@room", &ids).await.unwrap();
        assert_eq!(acks.len(), 3);
        assert_eq!(
            session.revoked(),
            vec![
                ("3".to_string(), "@@room".to_string()),
                ("1".to_string(), "@@room".to_string()),
                ("2".to_string(), "@@room".to_string()),
            ]
        );
    }
}
