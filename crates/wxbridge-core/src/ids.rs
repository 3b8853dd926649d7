// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifier namespacing between provider ids and bus-facing ids.
//!
//! Every id that leaves the gateway carries the [`ID_PREFIX`] namespace tag so
//! it cannot collide with ids produced by other adapters on the same bus.
//! Group contacts are distinguished from friends purely by the provider's
//! reserved [`GROUP_PREFIX`].

/// Namespace tag prepended to every provider id exposed on the bus.
pub const ID_PREFIX: &str = "wx_";

/// Provider prefix marking a raw contact id as a group chat.
pub const GROUP_PREFIX: &str = "@@";

/// Converts a raw provider id into its bus-facing canonical form.
pub fn canonical_id(raw: &str) -> String {
    format!("{ID_PREFIX}{raw}")
}

/// Strips one leading namespace tag, returning the raw provider id.
///
/// Ids without the tag are returned unchanged, so callers may pass either form.
pub fn raw_id(id: &str) -> &str {
    id.strip_prefix(ID_PREFIX).unwrap_or(id)
}

/// Returns true if the raw (or canonical) id names a group chat.
pub fn is_group_id(id: &str) -> bool {
    raw_id(id).starts_with(GROUP_PREFIX)
}

/// Canonical account id for a provider numeric user identifier.
pub fn account_id(uin: u64) -> String {
    canonical_id(&uin.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_prefixes_once() {
        assert_eq!(canonical_id("@abc"), "wx_@abc");
        assert_eq!(canonical_id("@@room"), "wx_@@room");
    }

    #[test]
    fn raw_id_accepts_both_forms() {
        assert_eq!(raw_id("wx_@abc"), "@abc");
        assert_eq!(raw_id("@abc"), "@abc");
    }

    #[test]
    fn group_detection_ignores_namespace() {
        assert!(is_group_id("@@room"));
        assert!(is_group_id("wx_@@room"));
        assert!(!is_group_id("@friend"));
        assert!(!is_group_id("wx_@friend"));
    }

    #[test]
    fn account_id_from_uin() {
        assert_eq!(account_id(123456), "wx_123456");
    }

    proptest! {
        #[test]
        fn canonical_round_trip(raw in ".*") {
            let id = canonical_id(&raw);
            prop_assert_eq!(raw_id(&id), raw.as_str());
        }
    }
}
