// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Friend, group and member views over the session's raw contact table.
//!
//! Nothing here is cached: every accessor takes a fresh snapshot of the
//! session's contact table, so views are never staler than the table itself.
//! Lookups accept raw or canonical ids and return `None` when absent.

use std::collections::HashMap;
use std::sync::Arc;

use wxbridge_core::ids::{GROUP_PREFIX, canonical_id, raw_id};
use wxbridge_core::protocol::{ContactTable, RawContact};
use wxbridge_core::types::{Contact, Member};
use wxbridge_core::SessionClient;

/// Derives the canonical view of one raw contact.
pub fn contact_view(raw: &RawContact, origin: &str) -> Contact {
    Contact {
        canonical_id: canonical_id(&raw.user_name),
        display_name: raw.nick_name.clone(),
        avatar_url: format!("{origin}{}", raw.head_img_url),
        raw: raw.clone(),
    }
}

fn is_group_key(raw: &str) -> bool {
    raw.starts_with(GROUP_PREFIX)
}

/// Friend lookup in `table`. Group ids never resolve as friends.
pub fn friend_in(table: &ContactTable, origin: &str, id: &str) -> Option<Contact> {
    let raw = raw_id(id);
    if is_group_key(raw) {
        return None;
    }
    table.get(raw).map(|c| contact_view(c, origin))
}

/// Group lookup in `table`. Only `@@` ids resolve as groups.
pub fn group_in(table: &ContactTable, origin: &str, id: &str) -> Option<Contact> {
    let raw = raw_id(id);
    if !is_group_key(raw) {
        return None;
    }
    table.get(raw).map(|c| contact_view(c, origin))
}

/// Merges each member entry of `group` with its friend-level contact.
///
/// Member-scoped fields win whenever they are set.
pub fn members_in(table: &ContactTable, origin: &str, group: &RawContact) -> Vec<Member> {
    group
        .member_list
        .iter()
        .map(|m| {
            let friend = friend_in(table, origin, &m.user_name);
            let nickname = if m.nick_name.is_empty() {
                friend
                    .as_ref()
                    .map(|f| f.display_name.clone())
                    .unwrap_or_default()
            } else {
                m.nick_name.clone()
            };
            let display_name = if m.display_name.is_empty() {
                nickname.clone()
            } else {
                m.display_name.clone()
            };
            Member {
                canonical_id: canonical_id(&m.user_name),
                nickname,
                display_name,
                avatar_url: friend.as_ref().map(|f| f.avatar_url.clone()),
                friend,
                raw: m.clone(),
            }
        })
        .collect()
}

/// Contacts of one kind, sorted by canonical id for stable output.
fn list_in(table: &ContactTable, origin: &str, groups: bool) -> Vec<Contact> {
    let mut list: Vec<Contact> = table
        .iter()
        .filter(|(key, _)| is_group_key(key) == groups)
        .map(|(_, c)| contact_view(c, origin))
        .collect();
    list.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));
    list
}

/// Identity resolution bound to one live session.
#[derive(Clone)]
pub struct IdentityCache {
    session: Arc<dyn SessionClient>,
}

impl IdentityCache {
    pub fn new(session: Arc<dyn SessionClient>) -> Self {
        Self { session }
    }

    fn snapshot(&self) -> (ContactTable, String) {
        (self.session.contacts(), self.session.constants().origin)
    }

    pub fn resolve_friend(&self, id: &str) -> Option<Contact> {
        let (table, origin) = self.snapshot();
        friend_in(&table, &origin, id)
    }

    pub fn list_friends(&self) -> Vec<Contact> {
        let (table, origin) = self.snapshot();
        list_in(&table, &origin, false)
    }

    /// Canonical ids of all friends.
    pub fn friend_list(&self) -> Vec<String> {
        self.list_friends()
            .into_iter()
            .map(|c| c.canonical_id)
            .collect()
    }

    pub fn friend_map(&self) -> HashMap<String, Contact> {
        self.list_friends()
            .into_iter()
            .map(|c| (c.canonical_id.clone(), c))
            .collect()
    }

    pub fn resolve_group(&self, id: &str) -> Option<Contact> {
        let (table, origin) = self.snapshot();
        group_in(&table, &origin, id)
    }

    pub fn list_groups(&self) -> Vec<Contact> {
        let (table, origin) = self.snapshot();
        list_in(&table, &origin, true)
    }

    pub fn group_list(&self) -> Vec<String> {
        self.list_groups()
            .into_iter()
            .map(|c| c.canonical_id)
            .collect()
    }

    pub fn group_map(&self) -> HashMap<String, Contact> {
        self.list_groups()
            .into_iter()
            .map(|c| (c.canonical_id.clone(), c))
            .collect()
    }

    /// Group id to an empty member map, one entry per known group.
    ///
    /// Member maps are populated per group through [`member_map`](Self::member_map).
    pub fn group_member_map(&self) -> HashMap<String, HashMap<String, Member>> {
        self.group_list()
            .into_iter()
            .map(|id| (id, HashMap::new()))
            .collect()
    }

    /// Members of a group; empty when the group is unknown.
    pub fn resolve_members(&self, group_id: &str) -> Vec<Member> {
        let (table, origin) = self.snapshot();
        let raw = raw_id(group_id);
        match table.get(raw).filter(|_| is_group_key(raw)) {
            Some(group) => members_in(&table, &origin, group),
            None => Vec::new(),
        }
    }

    pub fn member_list(&self, group_id: &str) -> Vec<String> {
        self.resolve_members(group_id)
            .into_iter()
            .map(|m| m.canonical_id)
            .collect()
    }

    pub fn member_map(&self, group_id: &str) -> HashMap<String, Member> {
        self.resolve_members(group_id)
            .into_iter()
            .map(|m| (m.canonical_id.clone(), m))
            .collect()
    }

    /// One member of one group.
    pub fn resolve_member(&self, group_id: &str, user_id: &str) -> Option<Member> {
        let raw_user = raw_id(user_id);
        self.resolve_members(group_id)
            .into_iter()
            .find(|m| m.raw.user_name == raw_user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxbridge_test_utils::{MockSession, fixtures};

    fn cache() -> (Arc<MockSession>, IdentityCache) {
        let session = Arc::new(MockSession::new());
        session.add_contact(fixtures::friend("@alice", "Alice"));
        session.add_contact(fixtures::friend("@bob", "Bob"));
        session.add_contact(fixtures::group(
            "@@room",
            "Room",
            vec![
                fixtures::member("@alice", "Alice in room", "Al"),
                fixtures::member("@stranger", "Stranger", ""),
            ],
        ));
        let cache = IdentityCache::new(session.clone());
        (session, cache)
    }

    #[test]
    fn friend_lookup_accepts_raw_and_canonical() {
        let (_, cache) = cache();
        let raw = cache.resolve_friend("@alice").unwrap();
        let canonical = cache.resolve_friend("wx_@alice").unwrap();
        assert_eq!(raw, canonical);
        assert_eq!(raw.canonical_id, "wx_@alice");
        assert_eq!(raw.display_name, "Alice");
        assert_eq!(raw.avatar_url, "https://wx.qq.com/icon/@alice");
    }

    #[test]
    fn friends_and_groups_are_disjoint() {
        let (_, cache) = cache();
        assert_eq!(cache.friend_list(), vec!["wx_@alice", "wx_@bob"]);
        assert_eq!(cache.group_list(), vec!["wx_@@room"]);
        assert!(cache.resolve_friend("@@room").is_none());
        assert!(cache.resolve_group("@alice").is_none());
        assert_eq!(cache.resolve_group("wx_@@room").unwrap().display_name, "Room");
    }

    #[test]
    fn absent_lookups_are_none() {
        let (_, cache) = cache();
        assert!(cache.resolve_friend("@nobody").is_none());
        assert!(cache.resolve_group("@@nowhere").is_none());
        assert!(cache.resolve_members("@@nowhere").is_empty());
        assert!(cache.resolve_member("@@room", "@nobody").is_none());
    }

    #[test]
    fn resolution_is_idempotent() {
        let (_, cache) = cache();
        assert_eq!(cache.resolve_friend("@bob"), cache.resolve_friend("@bob"));
        assert_eq!(cache.resolve_group("@@room"), cache.resolve_group("@@room"));
        assert_eq!(cache.resolve_members("@@room"), cache.resolve_members("@@room"));
    }

    #[test]
    fn members_merge_friend_profile_with_member_fields_winning() {
        let (_, cache) = cache();
        let members = cache.member_map("wx_@@room");
        let alice = &members["wx_@alice"];
        assert_eq!(alice.nickname, "Alice in room");
        assert_eq!(alice.display_name, "Al");
        assert_eq!(
            alice.avatar_url.as_deref(),
            Some("https://wx.qq.com/icon/@alice")
        );
        assert!(alice.friend.is_some());

        let stranger = &members["wx_@stranger"];
        assert_eq!(stranger.display_name, "Stranger");
        assert!(stranger.friend.is_none());
        assert!(stranger.avatar_url.is_none());
    }

    #[test]
    fn views_follow_the_live_table() {
        let (session, cache) = cache();
        assert!(cache.resolve_friend("@bob").is_some());
        session.remove_contact("@bob");
        assert!(cache.resolve_friend("@bob").is_none());
        session.add_contact(fixtures::friend("@carol", "Carol"));
        assert!(cache.friend_map().contains_key("wx_@carol"));
    }

    #[test]
    fn group_member_map_has_empty_entry_per_group() {
        let (_, cache) = cache();
        let map = cache.group_member_map();
        assert_eq!(map.len(), 1);
        assert!(map["wx_@@room"].is_empty());
    }
}
