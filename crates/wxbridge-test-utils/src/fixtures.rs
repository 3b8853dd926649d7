// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw protocol records for tests.

use wxbridge_core::protocol::{RawContact, RawMember, RawMessage, RawUser};

pub fn user(uin: u64, user_name: &str, nick_name: &str) -> RawUser {
    RawUser {
        uin,
        user_name: user_name.to_string(),
        nick_name: nick_name.to_string(),
        head_img_url: format!("/cgi-bin/mmwebwx-bin/webwxgeticon?username={user_name}"),
    }
}

pub fn friend(user_name: &str, nick_name: &str) -> RawContact {
    RawContact {
        user_name: user_name.to_string(),
        nick_name: nick_name.to_string(),
        head_img_url: format!("/icon/{user_name}"),
        ..RawContact::default()
    }
}

pub fn group(user_name: &str, nick_name: &str, members: Vec<RawMember>) -> RawContact {
    RawContact {
        user_name: user_name.to_string(),
        nick_name: nick_name.to_string(),
        head_img_url: format!("/icon/{user_name}"),
        member_list: members,
        ..RawContact::default()
    }
}

pub fn member(user_name: &str, nick_name: &str, display_name: &str) -> RawMember {
    RawMember {
        user_name: user_name.to_string(),
        nick_name: nick_name.to_string(),
        display_name: display_name.to_string(),
        ..RawMember::default()
    }
}

/// A text message from `from` to `to`, created at `create_time`.
pub fn text_message(from: &str, to: &str, content: &str, create_time: i64) -> RawMessage {
    RawMessage {
        msg_id: format!("msg-{create_time}-{from}"),
        from_user_name: from.to_string(),
        to_user_name: to.to_string(),
        msg_type: 1,
        content: content.to_string(),
        original_content: content.to_string(),
        create_time,
        ..RawMessage::default()
    }
}

/// A group message with the provider's `<sender>:` prefixes applied.
pub fn group_message(
    group: &str,
    sender_raw: &str,
    sender_nick: &str,
    to: &str,
    body: &str,
    create_time: i64,
) -> RawMessage {
    RawMessage {
        content: format!("{sender_nick}:\n{body}"),
        original_content: format!("{sender_raw}:<br/>{body}"),
        ..text_message(group, to, body, create_time)
    }
}
