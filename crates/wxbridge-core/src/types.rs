// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical, protocol-agnostic types shared by the gateway and the bus.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

use crate::protocol::{RawContact, RawMember};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Top-level event family on the bus.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Message,
}

/// Whether a message belongs to a one-to-one chat or a group chat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Private,
    Group,
}

/// Where the bytes of an outbound file segment come from.
///
/// Parsed from the conventional string forms: `base64://<data>`,
/// `http(s)://<url>`, `file://<path>` or a bare local path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileSource {
    Base64(String),
    Url(String),
    Path(PathBuf),
}

impl From<String> for FileSource {
    fn from(value: String) -> Self {
        if let Some(data) = value.strip_prefix("base64://") {
            Self::Base64(data.to_string())
        } else if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value)
        } else if let Some(path) = value.strip_prefix("file://") {
            Self::Path(PathBuf::from(path))
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

impl From<FileSource> for String {
    fn from(value: FileSource) -> Self {
        match value {
            FileSource::Base64(data) => format!("base64://{data}"),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64(_) => write!(f, "base64://..."),
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Payload of an image, record, video or file segment.
///
/// Outbound segments carry `file`; inbound segments carry `url`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One message inside a forward bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(deserialize_with = "deserialize_segments")]
    pub message: Vec<Segment>,
}

/// One typed unit of message content.
///
/// Deserialization is lenient: plain strings become [`Segment::Text`] and
/// objects whose shape matches no known segment are kept verbatim as
/// [`Segment::Unknown`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text { text: String },
    Image(Media),
    Record(Media),
    Video(Media),
    File(Media),
    Reply { id: String },
    At { user_id: String },
    Button { data: serde_json::Value },
    /// A forward bundle; each node is sent as its own message.
    Node { data: Vec<ForwardNode> },
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

/// Wire mirror of [`Segment`] used for strict tagged decoding.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedSegment {
    Text { text: String },
    Image(Media),
    Record(Media),
    Video(Media),
    File(Media),
    Reply { id: String },
    At {
        #[serde(alias = "qq")]
        user_id: String,
    },
    Button {
        #[serde(default)]
        data: serde_json::Value,
    },
    Node { data: Vec<ForwardNode> },
}

impl From<TaggedSegment> for Segment {
    fn from(value: TaggedSegment) -> Self {
        match value {
            TaggedSegment::Text { text } => Self::Text { text },
            TaggedSegment::Image(m) => Self::Image(m),
            TaggedSegment::Record(m) => Self::Record(m),
            TaggedSegment::Video(m) => Self::Video(m),
            TaggedSegment::File(m) => Self::File(m),
            TaggedSegment::Reply { id } => Self::Reply { id },
            TaggedSegment::At { user_id } => Self::At { user_id },
            TaggedSegment::Button { data } => Self::Button { data },
            TaggedSegment::Node { data } => Self::Node { data },
        }
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Segment::from_value(value))
    }
}

fn deserialize_segments<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Segment>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(Segment::list_from_value(value))
}

impl Segment {
    /// Builds a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Builds an inbound image segment pointing at `url`.
    pub fn image_url(url: impl Into<String>) -> Self {
        Self::Image(Media {
            url: Some(url.into()),
            ..Media::default()
        })
    }

    /// Decodes one segment from loosely-typed JSON.
    pub fn from_value(value: serde_json::Value) -> Self {
        if let serde_json::Value::String(text) = value {
            return Self::Text { text };
        }
        match TaggedSegment::deserialize(&value) {
            Ok(tagged) => tagged.into(),
            Err(_) => Self::Unknown(value),
        }
    }

    /// Decodes a message that may be a single segment or an array of them.
    pub fn list_from_value(value: serde_json::Value) -> Vec<Self> {
        match value {
            serde_json::Value::Array(items) => items.into_iter().map(Self::from_value).collect(),
            other => vec![Self::from_value(other)],
        }
    }

    /// The file payload to upload before the typed send, if any.
    pub fn file_source(&self) -> Option<&FileSource> {
        match self {
            Self::Image(m) | Self::Record(m) | Self::Video(m) | Self::File(m) => m.file.as_ref(),
            _ => None,
        }
    }

    /// Short type name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image(_) => "image",
            Self::Record(_) => "record",
            Self::Video(_) => "video",
            Self::File(_) => "file",
            Self::Reply { .. } => "reply",
            Self::At { .. } => "at",
            Self::Button { .. } => "button",
            Self::Node { .. } => "node",
            Self::Unknown(_) => "unknown",
        }
    }
}

/// A contact record with derived canonical fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    /// Namespaced id (`wx_<raw>`).
    pub canonical_id: String,
    /// Provider nickname (group name for groups).
    pub display_name: String,
    /// Absolute avatar URL.
    pub avatar_url: String,
    /// The provider record this view was derived from.
    pub raw: RawContact,
}

impl Contact {
    /// The un-namespaced provider id.
    pub fn raw_id(&self) -> &str {
        &self.raw.user_name
    }
}

/// A group member merged with the member's friend-level contact, if known.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub canonical_id: String,
    /// Nickname as seen inside the group.
    pub nickname: String,
    /// Group-scoped display name, falling back to the nickname.
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub friend: Option<Contact>,
    pub raw: RawMember,
}

/// Profile of the user who sent a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    pub user_id: String,
    pub nickname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl From<&Contact> for Sender {
    fn from(contact: &Contact) -> Self {
        Self {
            user_id: contact.canonical_id.clone(),
            nickname: contact.display_name.clone(),
            avatar: Some(contact.avatar_url.clone()),
        }
    }
}

/// The normalized representation of one inbound chat event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalMessage {
    pub post_type: PostType,
    pub message_type: MessageType,
    pub self_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Contact>,
    pub sender: Sender,
    /// Never empty.
    pub message: Vec<Segment>,
    /// Human-readable preview; not the structured content.
    pub raw_message: String,
    pub message_id: String,
    /// Provider timestamp, seconds since the epoch.
    pub time: i64,
}

impl CanonicalMessage {
    /// The fine-grained bus topic, e.g. `message.group`.
    pub fn topic(&self) -> String {
        format!("{}.{}", self.post_type, self.message_type)
    }
}

/// One authenticated session bound to a canonical id.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: String,
    /// Raw provider user name of the logged-in user.
    pub user_name: String,
    pub nickname: String,
    pub avatar: String,
    pub start_time: DateTime<Utc>,
    /// Opaque session blob, persisted verbatim.
    #[serde(skip_serializing)]
    pub credentials: serde_json::Value,
}

impl Account {
    /// The account's own profile, used as sender for self-sent messages.
    pub fn profile(&self) -> Sender {
        Sender {
            user_id: self.id.clone(),
            nickname: self.nickname.clone(),
            avatar: Some(self.avatar.clone()),
        }
    }
}

/// Result of one outbound send call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SendOutcome {
    /// Raw acknowledgments, in send order.
    pub sent_raw: Vec<crate::protocol::SendAck>,
    /// Provider message ids, in send order.
    pub message_ids: Vec<String>,
}

impl SendOutcome {
    /// Records one acknowledgment.
    pub fn push(&mut self, ack: crate::protocol::SendAck) {
        if let Some(id) = ack.msg_id.clone() {
            self.message_ids.push(id);
        }
        self.sent_raw.push(ack);
    }

    /// Appends another outcome, preserving its internal order.
    pub fn extend(&mut self, other: SendOutcome) {
        self.sent_raw.extend(other.sent_raw);
        self.message_ids.extend(other.message_ids);
    }
}
