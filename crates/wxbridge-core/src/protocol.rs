// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw shapes exchanged with the WeChat Web session client.
//!
//! Field names follow the provider's PascalCase JSON so records can be
//! decoded straight from the session client's payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw contact table keyed by provider user name.
pub type ContactTable = HashMap<String, RawContact>;

/// A friend or group record as held by the session client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawContact {
    pub user_name: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub head_img_url: String,
    #[serde(default)]
    pub remark_name: String,
    /// Populated for groups only.
    #[serde(default)]
    pub member_list: Vec<RawMember>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of a group's member list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawMember {
    pub user_name: String,
    #[serde(default)]
    pub nick_name: String,
    /// Group card; empty when the member has not set one.
    #[serde(default)]
    pub display_name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The authenticated user of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawUser {
    #[serde(default)]
    pub uin: u64,
    pub user_name: String,
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub head_img_url: String,
}

/// A raw inbound message event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawMessage {
    pub msg_id: String,
    pub from_user_name: String,
    pub to_user_name: String,
    pub msg_type: u32,
    #[serde(default)]
    pub app_msg_type: u32,
    /// Display content; in groups prefixed with `<sender nickname>:`.
    #[serde(default)]
    pub content: String,
    /// Undecorated content; in groups prefixed with `<sender raw id>:`.
    #[serde(default)]
    pub original_content: String,
    /// Seconds since the epoch.
    pub create_time: i64,
    #[serde(default, rename = "isSendBySelf")]
    pub is_send_by_self: bool,
    #[serde(default)]
    pub media_id: String,
    #[serde(default)]
    pub file_name: String,
}

/// Per-session tokens embedded in media download URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProps {
    pub skey: String,
    pub pass_ticket: String,
    pub webwx_data_ticket: String,
}

/// Raw message-type enums and URL templates exposed by the session client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConstants {
    /// Base URL prepended to relative avatar paths.
    pub origin: String,
    pub msgtype_text: u32,
    pub msgtype_image: u32,
    pub msgtype_voice: u32,
    pub msgtype_emoticon: u32,
    pub msgtype_microvideo: u32,
    pub msgtype_video: u32,
    pub msgtype_app: u32,
    pub appmsgtype_attach: u32,
    pub api_webwxgetmsgimg: String,
    pub api_webwxgetvoice: String,
    pub api_webwxgetvideo: String,
    pub api_webwxdownloadmedia: String,
}

impl Default for ProtocolConstants {
    fn default() -> Self {
        Self {
            origin: "https://wx.qq.com".to_string(),
            msgtype_text: 1,
            msgtype_image: 3,
            msgtype_voice: 34,
            msgtype_emoticon: 47,
            msgtype_microvideo: 62,
            msgtype_video: 43,
            msgtype_app: 49,
            appmsgtype_attach: 6,
            api_webwxgetmsgimg: "https://wx.qq.com/cgi-bin/mmwebwx-bin/webwxgetmsgimg".to_string(),
            api_webwxgetvoice: "https://wx.qq.com/cgi-bin/mmwebwx-bin/webwxgetvoice".to_string(),
            api_webwxgetvideo: "https://wx.qq.com/cgi-bin/mmwebwx-bin/webwxgetvideo".to_string(),
            api_webwxdownloadmedia: "https://file.wx.qq.com/cgi-bin/mmwebwx-bin/webwxgetmedia"
                .to_string(),
        }
    }
}

/// An error reported by the session client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionErrorInfo {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    /// Adapter-supplied context tag.
    #[serde(default)]
    pub tips: Option<String>,
}

impl SessionErrorInfo {
    /// Literal composite key identifying "the same" error.
    pub fn signature(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.name,
            self.message,
            self.code.as_deref().unwrap_or(""),
            self.tips.as_deref().unwrap_or("")
        )
    }
}

/// Events emitted by a session client.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Error(SessionErrorInfo),
    /// A login uuid was issued; the QR code encodes it.
    Uuid(String),
    Login,
    Logout,
    Message(RawMessage),
}

/// Payload accepted by the session client's send operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundPayload {
    Text(String),
    /// Binary upload followed by the matching media message.
    File { bytes: Vec<u8>, filename: String },
}

/// Raw acknowledgment of a send.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendAck {
    /// Provider message id, when the provider returned one.
    #[serde(rename = "MsgID", default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<String>,
    #[serde(rename = "LocalID", default, skip_serializing_if = "Option::is_none")]
    pub local_id: Option<String>,
    #[serde(flatten)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl SendAck {
    /// An acknowledgment carrying only a provider message id.
    pub fn with_id(msg_id: impl Into<String>) -> Self {
        Self {
            msg_id: Some(msg_id.into()),
            ..Self::default()
        }
    }
}
