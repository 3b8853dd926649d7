// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw session events to canonical messages.
//!
//! Normalization is a pure function of the raw event, the account, the live
//! contact table and the clock. Events older than the configured expiry are
//! dropped so a reconnect does not replay the provider's backlog.
//!
//! The raw message type is mapped to a segment through [`BUILDERS`], a static
//! table from [`RawKind`] to a builder function. Types without an entry fall
//! back to a text segment carrying the literal content, so every message has
//! at least one segment.

use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info};
use wxbridge_core::ids::{canonical_id, is_group_id};
use wxbridge_core::protocol::{ProtocolConstants, RawMessage, SessionProps};
use wxbridge_core::types::{
    Account, CanonicalMessage, Media, MessageType, PostType, Segment, Sender,
};
use wxbridge_core::SessionClient;

use crate::identity::IdentityCache;

/// Provider message kinds the gateway distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawKind {
    Text,
    Image,
    Voice,
    Emoticon,
    MicroVideo,
    Video,
    /// App message carrying a file attachment.
    Attachment,
    /// Any other app subtype, or an unknown message type.
    Other,
}

impl RawKind {
    pub fn classify(msg_type: u32, app_msg_type: u32, c: &ProtocolConstants) -> Self {
        match msg_type {
            t if t == c.msgtype_text => Self::Text,
            t if t == c.msgtype_image => Self::Image,
            t if t == c.msgtype_voice => Self::Voice,
            t if t == c.msgtype_emoticon => Self::Emoticon,
            t if t == c.msgtype_microvideo => Self::MicroVideo,
            t if t == c.msgtype_video => Self::Video,
            t if t == c.msgtype_app && app_msg_type == c.appmsgtype_attach => Self::Attachment,
            _ => Self::Other,
        }
    }
}

/// Everything a segment builder may read.
pub struct BuildInput<'a> {
    pub msg: &'a RawMessage,
    /// Content after group prefix stripping.
    pub content: &'a str,
    pub constants: &'a ProtocolConstants,
    pub props: &'a SessionProps,
    /// Raw user name of the receiving account.
    pub self_user_name: &'a str,
}

/// Builds the segment and the `raw_message` preview for one kind.
pub type SegmentBuilder = fn(&BuildInput<'_>) -> (Segment, String);

pub struct BuilderEntry {
    pub kind: RawKind,
    pub build: SegmentBuilder,
}

/// Raw kind to segment builder. [`RawKind::Other`] has no entry and falls
/// back to [`build_text`].
pub static BUILDERS: &[BuilderEntry] = &[
    BuilderEntry {
        kind: RawKind::Text,
        build: build_text,
    },
    BuilderEntry {
        kind: RawKind::Image,
        build: build_image,
    },
    BuilderEntry {
        kind: RawKind::Voice,
        build: build_voice,
    },
    BuilderEntry {
        kind: RawKind::Emoticon,
        build: build_emoticon,
    },
    BuilderEntry {
        kind: RawKind::MicroVideo,
        build: build_micro_video,
    },
    BuilderEntry {
        kind: RawKind::Video,
        build: build_video,
    },
    BuilderEntry {
        kind: RawKind::Attachment,
        build: build_attachment,
    },
];

/// Looks up and runs the builder for `kind`.
pub fn build_segment(kind: RawKind, input: &BuildInput<'_>) -> (Segment, String) {
    let build = BUILDERS
        .iter()
        .find(|entry| entry.kind == kind)
        .map(|entry| entry.build)
        .unwrap_or(build_text);
    build(input)
}

/// Characters left verbatim in a URI component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Appends percent-encoded query parameters to a template URL.
pub fn with_params(base: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, COMPONENT),
                utf8_percent_encode(value, COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

fn media(url: String) -> Media {
    Media {
        url: Some(url),
        ..Media::default()
    }
}

pub fn build_text(input: &BuildInput<'_>) -> (Segment, String) {
    (Segment::text(input.content), input.content.to_string())
}

fn image_url(input: &BuildInput<'_>) -> String {
    with_params(
        &input.constants.api_webwxgetmsgimg,
        &[
            ("MsgID", &input.msg.msg_id),
            ("skey", &input.props.skey),
            ("type", "big"),
        ],
    )
}

fn image_preview(input: &BuildInput<'_>, label: &str) -> (Segment, String) {
    let url = image_url(input);
    let preview = format!("[{label}: {url}]");
    (Segment::Image(media(url)), preview)
}

fn build_image(input: &BuildInput<'_>) -> (Segment, String) {
    image_preview(input, "image")
}

fn build_emoticon(input: &BuildInput<'_>) -> (Segment, String) {
    image_preview(input, "emoticon")
}

fn build_voice(input: &BuildInput<'_>) -> (Segment, String) {
    let url = with_params(
        &input.constants.api_webwxgetvoice,
        &[("MsgID", &input.msg.msg_id), ("skey", &input.props.skey)],
    );
    let preview = format!("[record: {url}]");
    (Segment::Record(media(url)), preview)
}

fn video_preview(input: &BuildInput<'_>, label: &str) -> (Segment, String) {
    let url = with_params(
        &input.constants.api_webwxgetvideo,
        &[("MsgID", &input.msg.msg_id), ("skey", &input.props.skey)],
    );
    let preview = format!("[{label}: {url}]");
    (Segment::Video(media(url)), preview)
}

fn build_micro_video(input: &BuildInput<'_>) -> (Segment, String) {
    video_preview(input, "micro-video")
}

fn build_video(input: &BuildInput<'_>) -> (Segment, String) {
    video_preview(input, "video")
}

fn build_attachment(input: &BuildInput<'_>) -> (Segment, String) {
    let msg = input.msg;
    let url = with_params(
        &input.constants.api_webwxdownloadmedia,
        &[
            ("sender", &msg.from_user_name),
            ("mediaid", &msg.media_id),
            ("filename", &msg.file_name),
            ("fromuser", input.self_user_name),
            ("pass_ticket", &input.props.pass_ticket),
            ("webwx_data_ticket", &input.props.webwx_data_ticket),
        ],
    );
    let preview = format!("[file: {url}]");
    let file = Media {
        url: Some(url),
        file: None,
        name: (!msg.file_name.is_empty()).then(|| msg.file_name.clone()),
    };
    (Segment::File(file), preview)
}

/// Whether an event created at `create_time` is past its expiry at `now`.
pub fn is_stale(create_time: i64, expire_time: i64, now: i64) -> bool {
    create_time.saturating_add(expire_time) < now
}

/// A group message split into its sender prefix and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSplit<'a> {
    /// Sender raw id, from the undecorated content.
    pub sender_raw: &'a str,
    /// Sender nickname as rendered in the display content.
    pub nickname: &'a str,
    pub content: &'a str,
    pub raw_content: &'a str,
}

/// Splits `"<sender>:<payload>"` on the first colon of each field.
///
/// The display payload loses one leading `\n` and the raw payload one leading
/// `<br/>`. Content without a colon is all payload with an empty sender.
pub fn split_group_content<'a>(content: &'a str, original: &'a str) -> GroupSplit<'a> {
    let (nickname, content) = match content.split_once(':') {
        Some((nick, rest)) => (nick, rest.strip_prefix('\n').unwrap_or(rest)),
        None => ("", content),
    };
    let (sender_raw, raw_content) = match original.split_once(':') {
        Some((sender, rest)) => (sender, rest.strip_prefix("<br/>").unwrap_or(rest)),
        None => ("", original),
    };
    GroupSplit {
        sender_raw,
        nickname,
        content,
        raw_content,
    }
}

/// Converts raw events for one account.
#[derive(Clone)]
pub struct Normalizer {
    account: Arc<Account>,
    session: Arc<dyn SessionClient>,
    identity: IdentityCache,
}

struct Origin {
    message_type: MessageType,
    group_id: Option<String>,
    user_id: String,
    sender: Sender,
    content: String,
}

impl Normalizer {
    pub fn new(
        account: Arc<Account>,
        session: Arc<dyn SessionClient>,
        identity: IdentityCache,
    ) -> Self {
        Self {
            account,
            session,
            identity,
        }
    }

    /// Normalizes one raw event, or `None` if it is stale.
    ///
    /// `now` is seconds since the epoch.
    pub fn normalize(
        &self,
        raw: &RawMessage,
        expire_time: i64,
        now: i64,
    ) -> Option<CanonicalMessage> {
        if is_stale(raw.create_time, expire_time, now) {
            debug!(
                self_id = %self.account.id,
                msg_id = %raw.msg_id,
                create_time = raw.create_time,
                "dropping stale message"
            );
            return None;
        }

        let origin = self.origin(raw);
        let constants = self.session.constants();
        let props = self.session.props();
        let kind = RawKind::classify(raw.msg_type, raw.app_msg_type, &constants);
        let (segment, raw_message) = build_segment(
            kind,
            &BuildInput {
                msg: raw,
                content: &origin.content,
                constants: &constants,
                props: &props,
                self_user_name: &self.account.user_name,
            },
        );

        let group = origin
            .group_id
            .as_deref()
            .and_then(|id| self.identity.resolve_group(id));
        let group_name = origin
            .group_id
            .as_ref()
            .map(|_| group.as_ref().map(|g| g.display_name.clone()).unwrap_or_default());

        let message = CanonicalMessage {
            post_type: PostType::Message,
            message_type: origin.message_type,
            self_id: self.account.id.clone(),
            user_id: origin.user_id,
            group_id: origin.group_id,
            group_name,
            group,
            sender: origin.sender,
            message: vec![segment],
            raw_message,
            message_id: raw.msg_id.clone(),
            time: raw.create_time,
        };
        log_message(&message);
        Some(message)
    }

    fn origin(&self, raw: &RawMessage) -> Origin {
        if raw.is_send_by_self {
            let (message_type, group_id) = if raw.from_user_name == raw.to_user_name {
                (MessageType::Private, None)
            } else {
                (MessageType::Group, Some(canonical_id(&raw.to_user_name)))
            };
            return Origin {
                message_type,
                group_id,
                user_id: canonical_id(&raw.from_user_name),
                sender: self.account.profile(),
                content: raw.content.clone(),
            };
        }

        if is_group_id(&raw.from_user_name) {
            let group_id = canonical_id(&raw.from_user_name);
            let split = split_group_content(&raw.content, &raw.original_content);
            let user_id = if split.sender_raw.is_empty() {
                group_id.clone()
            } else {
                canonical_id(split.sender_raw)
            };
            let sender = self.group_sender(&group_id, &user_id, split.nickname);
            return Origin {
                message_type: MessageType::Group,
                group_id: Some(group_id),
                user_id,
                sender,
                content: split.content.to_string(),
            };
        }

        let user_id = canonical_id(&raw.from_user_name);
        let sender = self
            .identity
            .resolve_friend(&user_id)
            .map(|friend| Sender::from(&friend))
            .unwrap_or_else(|| Sender {
                user_id: user_id.clone(),
                ..Sender::default()
            });
        Origin {
            message_type: MessageType::Private,
            group_id: None,
            user_id,
            sender,
            content: raw.content.clone(),
        }
    }

    /// Friend profile, then group member entry, then the literal prefix.
    fn group_sender(&self, group_id: &str, user_id: &str, literal_nickname: &str) -> Sender {
        if let Some(friend) = self.identity.resolve_friend(user_id) {
            return Sender::from(&friend);
        }
        let member = self.identity.resolve_member(group_id, user_id);
        Sender {
            user_id: user_id.to_string(),
            nickname: member
                .as_ref()
                .map(|m| m.nickname.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| literal_nickname.to_string()),
            avatar: member.and_then(|m| m.avatar_url),
        }
    }
}

fn log_message(msg: &CanonicalMessage) {
    match &msg.group_id {
        Some(group_id) => info!(
            self_id = %msg.self_id,
            "group message: [{}({}), {}({})] {}",
            msg.group_name.as_deref().unwrap_or(""),
            group_id,
            msg.sender.nickname,
            msg.user_id,
            msg.raw_message
        ),
        None => info!(
            self_id = %msg.self_id,
            "friend message: [{}({})] {}",
            msg.sender.nickname,
            msg.user_id,
            msg.raw_message
        ),
    }
}
