//! Friends and the resolved roster

use crate::digest::Digest;
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable snapshot of one social connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRef {
    /// Friend's user id (also the owner id of their records)
    pub id: UserId,
    /// Unique handle
    pub username: String,
    /// Name shown on cards; may be blank
    pub display_name: String,
    /// Avatar storage reference
    pub avatar_ref: Option<String>,
    /// How active this friend is; used to rank the friend picker
    pub activity_score: u32,
}

impl FriendRef {
    /// Create a friend with the display name defaulting to the username
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id,
            display_name: username.clone(),
            username,
            avatar_ref: None,
            activity_score: 0,
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// With activity score
    #[inline]
    #[must_use]
    pub fn with_activity_score(mut self, score: u32) -> Self {
        self.activity_score = score;
        self
    }

    /// Name to render and to sort by: display name, else username
    #[must_use]
    pub fn label(&self) -> &str {
        let display = self.display_name.trim();
        if display.is_empty() {
            &self.username
        } else {
            display
        }
    }
}

/// The caller's resolved set of friends
///
/// Keyed by id so lookups during owner enrichment are cheap. The fingerprint
/// covers owner ids only: a renamed friend does not invalidate counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    friends: BTreeMap<UserId, FriendRef>,
    fingerprint: Digest,
}

impl Roster {
    /// Build a roster; duplicate ids keep the last entry
    #[must_use]
    pub fn new(friends: impl IntoIterator<Item = FriendRef>) -> Self {
        let friends: BTreeMap<UserId, FriendRef> =
            friends.into_iter().map(|f| (f.id, f)).collect();
        let fingerprint = friends
            .keys()
            .fold(Digest::builder("roster"), |b, id| b.bytes(id.as_bytes()))
            .finish();
        Self {
            friends,
            fingerprint,
        }
    }

    /// Roster with no friends
    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// Digest of the owner id set
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> Digest {
        self.fingerprint
    }

    /// Number of friends
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.friends.len()
    }

    /// Whether the caller has no friends
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.friends.is_empty()
    }

    /// Look up a friend
    #[inline]
    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<&FriendRef> {
        self.friends.get(id)
    }

    /// All owner ids, ascending
    #[must_use]
    pub fn owner_ids(&self) -> Vec<UserId> {
        self.friends.keys().copied().collect()
    }

    /// Iterate friends in id order
    pub fn iter(&self) -> impl Iterator<Item = &FriendRef> {
        self.friends.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_order_and_names() {
        let a = UserId::new();
        let b = UserId::new();
        let r1 = Roster::new([FriendRef::new(a, "ana"), FriendRef::new(b, "bo")]);
        let r2 = Roster::new([
            FriendRef::new(b, "bo").with_display_name("Bo B."),
            FriendRef::new(a, "ana"),
        ]);
        assert_eq!(r1.fingerprint(), r2.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_membership() {
        let a = UserId::new();
        let r1 = Roster::new([FriendRef::new(a, "ana")]);
        let r2 = Roster::new([FriendRef::new(a, "ana"), FriendRef::new(UserId::new(), "cy")]);
        assert_ne!(r1.fingerprint(), r2.fingerprint());
        assert_ne!(Roster::empty().fingerprint(), r1.fingerprint());
    }

    #[test]
    fn label_falls_back_to_username() {
        let f = FriendRef::new(UserId::new(), "ana").with_display_name("  ");
        assert_eq!(f.label(), "ana");
    }
}
