// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live accounts, keyed by canonical account id.
//!
//! The registry is only written by the session manager; everything else gets
//! shared [`AccountHandle`]s out of it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use wxbridge_core::protocol::SendAck;
use wxbridge_core::types::{Account, Contact, Member, Segment, SendOutcome};
use wxbridge_core::{BridgeError, SessionClient};

use crate::dispatch::Dispatcher;
use crate::identity::IdentityCache;
use crate::media::MediaFetcher;
use crate::normalize::Normalizer;
use crate::pick::{FriendHandle, GroupHandle, MemberHandle};

/// One connected account with its bound accessors.
pub struct AccountHandle {
    account: Arc<Account>,
    session: Arc<dyn SessionClient>,
    identity: IdentityCache,
    dispatcher: Dispatcher,
    normalizer: Normalizer,
}

impl AccountHandle {
    pub fn new(account: Account, session: Arc<dyn SessionClient>, fetcher: MediaFetcher) -> Self {
        let account = Arc::new(account);
        let identity = IdentityCache::new(session.clone());
        let dispatcher = Dispatcher::new(session.clone(), fetcher, account.id.clone());
        let normalizer = Normalizer::new(account.clone(), session.clone(), identity.clone());
        Self {
            account,
            session,
            identity,
            dispatcher,
            normalizer,
        }
    }

    pub fn id(&self) -> &str {
        &self.account.id
    }

    pub fn account(&self) -> &Arc<Account> {
        &self.account
    }

    pub fn session(&self) -> &Arc<dyn SessionClient> {
        &self.session
    }

    pub fn identity(&self) -> &IdentityCache {
        &self.identity
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn friend_list(&self) -> Vec<String> {
        self.identity.friend_list()
    }

    pub fn friend_map(&self) -> HashMap<String, Contact> {
        self.identity.friend_map()
    }

    pub fn group_list(&self) -> Vec<String> {
        self.identity.group_list()
    }

    pub fn group_map(&self) -> HashMap<String, Contact> {
        self.identity.group_map()
    }

    pub fn group_member_map(&self) -> HashMap<String, HashMap<String, Member>> {
        self.identity.group_member_map()
    }

    pub async fn send_msg(
        &self,
        target: &str,
        segments: &[Segment],
    ) -> Result<SendOutcome, BridgeError> {
        self.dispatcher.send(target, segments).await
    }

    pub async fn recall_msg(
        &self,
        target: &str,
        message_ids: &[String],
    ) -> Result<Vec<SendAck>, BridgeError> {
        self.dispatcher.recall(target, message_ids).await
    }

    pub fn pick_friend(self: &Arc<Self>, user_id: &str) -> FriendHandle {
        FriendHandle::new(self.clone(), user_id)
    }

    pub fn pick_group(self: &Arc<Self>, group_id: &str) -> GroupHandle {
        GroupHandle::new(self.clone(), group_id)
    }

    pub fn pick_member(self: &Arc<Self>, group_id: &str, user_id: &str) -> MemberHandle {
        MemberHandle::new(self.clone(), group_id, user_id)
    }
}

/// Canonical account id to live handle.
#[derive(Default)]
pub struct AccountRegistry {
    accounts: RwLock<HashMap<String, Arc<AccountHandle>>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle`, replacing any previous handle with the same id.
    pub fn insert(&self, handle: Arc<AccountHandle>) -> Option<Arc<AccountHandle>> {
        self.write().insert(handle.id().to_string(), handle)
    }

    pub fn get(&self, id: &str) -> Option<Arc<AccountHandle>> {
        self.read().get(id).cloned()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<AccountHandle>>> {
        self.accounts.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<AccountHandle>>> {
        self.accounts.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxbridge_test_utils::{MockSession, fixtures};

    fn handle(id: &str) -> (Arc<MockSession>, Arc<AccountHandle>) {
        let session = Arc::new(MockSession::new());
        session.add_contact(fixtures::friend("@alice", "Alice"));
        session.add_contact(fixtures::group(
            "@@room",
            "Room",
            vec![fixtures::member("@alice", "", "Al"), fixtures::member("@zed", "Zed", "")],
        ));
        let account = Account {
            id: id.to_string(),
            user_name: "@me".into(),
            nickname: "Me".into(),
            avatar: String::new(),
            start_time: chrono::Utc::now(),
            credentials: serde_json::Value::Null,
        };
        let handle = AccountHandle::new(account, session.clone(), MediaFetcher::default());
        (session, Arc::new(handle))
    }

    #[test]
    fn registry_replaces_same_id() {
        let registry = AccountRegistry::new();
        let (_, first) = handle("wx_1");
        let (_, second) = handle("wx_1");
        assert!(registry.insert(first).is_none());
        assert!(registry.insert(second).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn ids_are_sorted() {
        let registry = AccountRegistry::new();
        registry.insert(handle("wx_2").1);
        registry.insert(handle("wx_1").1);
        assert_eq!(registry.ids(), vec!["wx_1", "wx_2"]);
        assert!(registry.get("wx_3").is_none());
    }

    #[test]
    fn bound_accessors_follow_live_table() {
        let (session, h) = handle("wx_1");
        assert_eq!(h.friend_list(), vec!["wx_@alice"]);
        assert_eq!(h.group_list(), vec!["wx_@@room"]);
        session.add_contact(fixtures::friend("@bob", "Bob"));
        assert_eq!(h.friend_map().len(), 2);
        assert!(h.group_member_map()["wx_@@room"].is_empty());
    }

    #[tokio::test]
    async fn pick_helpers_send_to_raw_targets() {
        let (session, h) = handle("wx_1");
        h.pick_friend("wx_@alice")
            .send_msg(&[Segment::text("hi")])
            .await
            .unwrap();
        h.pick_group("wx_@@room")
            .send_msg(&[Segment::text("all")])
            .await
            .unwrap();
        h.pick_member("wx_@@room", "wx_@zed")
            .send_msg(&[Segment::text("psst")])
            .await
            .unwrap();
        let targets: Vec<String> = session.sent().into_iter().map(|s| s.to).collect();
        assert_eq!(targets, vec!["@alice", "@@room", "@zed"]);
    }
}
