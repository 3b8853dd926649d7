// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Friend, group and member handles bound to one account.

use std::collections::HashMap;
use std::sync::Arc;

use wxbridge_core::ids::{canonical_id, raw_id};
use wxbridge_core::protocol::SendAck;
use wxbridge_core::types::{Contact, Member, Segment, SendOutcome};
use wxbridge_core::BridgeError;

use crate::registry::AccountHandle;

fn canonical(id: &str) -> String {
    canonical_id(raw_id(id))
}

/// A friend of one account.
#[derive(Clone)]
pub struct FriendHandle {
    account: Arc<AccountHandle>,
    user_id: String,
}

impl FriendHandle {
    pub(crate) fn new(account: Arc<AccountHandle>, user_id: &str) -> Self {
        Self {
            account,
            user_id: canonical(user_id),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn self_id(&self) -> &str {
        self.account.id()
    }

    pub fn info(&self) -> Option<Contact> {
        self.account.identity().resolve_friend(&self.user_id)
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.info().map(|c| c.avatar_url)
    }

    pub async fn send_msg(&self, segments: &[Segment]) -> Result<SendOutcome, BridgeError> {
        self.account.send_msg(&self.user_id, segments).await
    }

    pub async fn recall_msg(&self, message_ids: &[String]) -> Result<Vec<SendAck>, BridgeError> {
        self.account.recall_msg(&self.user_id, message_ids).await
    }
}

/// A group chat of one account.
#[derive(Clone)]
pub struct GroupHandle {
    account: Arc<AccountHandle>,
    group_id: String,
}

impl GroupHandle {
    pub(crate) fn new(account: Arc<AccountHandle>, group_id: &str) -> Self {
        Self {
            account,
            group_id: canonical(group_id),
        }
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn info(&self) -> Option<Contact> {
        self.account.identity().resolve_group(&self.group_id)
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.info().map(|c| c.avatar_url)
    }

    pub fn members(&self) -> Vec<Member> {
        self.account.identity().resolve_members(&self.group_id)
    }

    pub fn member_list(&self) -> Vec<String> {
        self.account.identity().member_list(&self.group_id)
    }

    pub fn member_map(&self) -> HashMap<String, Member> {
        self.account.identity().member_map(&self.group_id)
    }

    pub fn pick_member(&self, user_id: &str) -> MemberHandle {
        MemberHandle::new(self.account.clone(), &self.group_id, user_id)
    }

    pub async fn send_msg(&self, segments: &[Segment]) -> Result<SendOutcome, BridgeError> {
        self.account.send_msg(&self.group_id, segments).await
    }

    pub async fn recall_msg(&self, message_ids: &[String]) -> Result<Vec<SendAck>, BridgeError> {
        self.account.recall_msg(&self.group_id, message_ids).await
    }
}

/// A member of a group. Sends go to the member privately.
#[derive(Clone)]
pub struct MemberHandle {
    friend: FriendHandle,
    group_id: String,
}

impl MemberHandle {
    pub(crate) fn new(account: Arc<AccountHandle>, group_id: &str, user_id: &str) -> Self {
        Self {
            friend: FriendHandle::new(account, user_id),
            group_id: canonical(group_id),
        }
    }

    pub fn user_id(&self) -> &str {
        self.friend.user_id()
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// The member entry of this group, merged with the friend profile.
    pub fn info(&self) -> Option<Member> {
        self.friend
            .account
            .identity()
            .resolve_member(&self.group_id, self.friend.user_id())
    }

    pub fn avatar_url(&self) -> Option<String> {
        self.info().and_then(|m| m.avatar_url)
    }

    pub fn as_friend(&self) -> &FriendHandle {
        &self.friend
    }

    pub async fn send_msg(&self, segments: &[Segment]) -> Result<SendOutcome, BridgeError> {
        self.friend.send_msg(segments).await
    }

    pub async fn recall_msg(&self, message_ids: &[String]) -> Result<Vec<SendAck>, BridgeError> {
        self.friend.recall_msg(message_ids).await
    }
}
