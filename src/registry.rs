//! Room membership registry.
//!
//! Rooms exist only as map entries: the first join creates one, the last
//! leave removes it. Every mutation of a room happens under that room's
//! shard lock, so insert, remove and drop-when-empty never interleave.

use std::collections::HashMap;
use std::fmt;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::peer::{PeerHandle, PeerId};

/// Room key, taken verbatim from the request path.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, HashMap<PeerId, PeerHandle>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `peer` to `room`, creating the room if needed.
    ///
    /// Returns `false` if the peer was already a member; the set is left unchanged.
    pub fn join(&self, room: &RoomId, peer: PeerHandle) -> bool {
        let mut members = self.rooms.entry(room.clone()).or_default();
        match members.entry(peer.id()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(peer);
                true
            }
        }
    }

    /// Remove `peer` from `room`, dropping the room once it is empty.
    ///
    /// Returns `false` when there was nothing to remove. Safe to call repeatedly.
    pub fn leave(&self, room: &RoomId, peer: &PeerId) -> bool {
        match self.rooms.entry(room.clone()) {
            Entry::Occupied(mut entry) => {
                let removed = entry.get_mut().remove(peer).is_some();
                if entry.get().is_empty() {
                    entry.remove();
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Copy of the room's current members.
    ///
    /// The copy is taken under the shard lock and released before returning,
    /// so callers may iterate it while joins and leaves continue.
    pub fn members_of(&self, room: &RoomId) -> Vec<PeerHandle> {
        self.rooms
            .get(room)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, room: &RoomId) -> usize {
        self.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_member(&self, room: &RoomId, peer: &PeerId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|members| members.contains_key(peer))
    }

    pub fn contains_room(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn peer() -> PeerHandle {
        // receiver is dropped; the registry never looks at liveness
        PeerHandle::channel(PeerId::new(), 1).0
    }

    #[test]
    fn first_join_creates_room() {
        let registry = RoomRegistry::new();
        let room = RoomId::from("alpha");
        assert!(!registry.contains_room(&room));
        assert!(registry.join(&room, peer()));
        assert!(registry.contains_room(&room));
        assert_eq!(registry.member_count(&room), 1);
    }

    #[test]
    fn join_is_idempotent() {
        let registry = RoomRegistry::new();
        let room = RoomId::from("alpha");
        let a = peer();
        assert!(registry.join(&room, a.clone()));
        assert!(!registry.join(&room, a));
        assert_eq!(registry.member_count(&room), 1);
    }

    #[test]
    fn last_leave_removes_room() {
        let registry = RoomRegistry::new();
        let room = RoomId::from("alpha");
        let (a, b) = (peer(), peer());
        registry.join(&room, a.clone());
        registry.join(&room, b.clone());

        assert!(registry.leave(&room, &a.id()));
        assert!(registry.contains_room(&room));
        assert!(registry.leave(&room, &b.id()));
        assert!(!registry.contains_room(&room));
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn double_leave_is_noop() {
        let registry = RoomRegistry::new();
        let room = RoomId::from("alpha");
        let (a, b) = (peer(), peer());
        registry.join(&room, a.clone());
        registry.join(&room, b.clone());

        assert!(registry.leave(&room, &a.id()));
        assert!(!registry.leave(&room, &a.id()));
        assert_eq!(registry.member_count(&room), 1);
        assert!(registry.is_member(&room, &b.id()));
    }

    #[test]
    fn leave_unknown_room_is_noop() {
        let registry = RoomRegistry::new();
        assert!(!registry.leave(&RoomId::from("ghost"), &PeerId::new()));
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn rooms_are_isolated_and_case_sensitive() {
        let registry = RoomRegistry::new();
        let a = peer();
        registry.join(&RoomId::from("alpha"), a.clone());
        registry.join(&RoomId::from("Alpha"), peer());

        assert_eq!(registry.room_count(), 2);
        assert!(!registry.is_member(&RoomId::from("Alpha"), &a.id()));
    }

    #[test]
    fn snapshot_survives_mutation() {
        let registry = RoomRegistry::new();
        let room = RoomId::from("alpha");
        let (a, b) = (peer(), peer());
        registry.join(&room, a.clone());
        registry.join(&room, b.clone());

        let snapshot = registry.members_of(&room);
        registry.leave(&room, &a.id());
        registry.leave(&room, &b.id());

        assert_eq!(snapshot.len(), 2);
        assert!(registry.members_of(&room).is_empty());
    }

    #[test]
    fn join_leave_sequence_leaves_exact_membership() {
        let registry = RoomRegistry::new();
        let room = RoomId::from("alpha");
        let peers: Vec<_> = (0..6).map(|_| peer()).collect();
        for p in &peers {
            registry.join(&room, p.clone());
        }
        for p in peers.iter().step_by(2) {
            registry.leave(&room, &p.id());
        }

        let mut remaining: Vec<_> = registry.members_of(&room).iter().map(|p| p.id()).collect();
        remaining.sort();
        let mut expected: Vec<_> = peers.iter().skip(1).step_by(2).map(|p| p.id()).collect();
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_are_not_lost() {
        let registry = Arc::new(RoomRegistry::new());
        let room = RoomId::from("alpha");

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let registry = registry.clone();
                let room = room.clone();
                tokio::spawn(async move { registry.join(&room, peer()) })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap());
        }

        assert_eq!(registry.member_count(&room), 64);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_leaves_remove_room() {
        let registry = Arc::new(RoomRegistry::new());
        let room = RoomId::from("alpha");
        let peers: Vec<_> = (0..64).map(|_| peer()).collect();
        for p in &peers {
            registry.join(&room, p.clone());
        }

        let tasks: Vec<_> = peers
            .into_iter()
            .map(|p| {
                let registry = registry.clone();
                let room = room.clone();
                tokio::spawn(async move {
                    // close and error both fire
                    registry.leave(&room, &p.id());
                    registry.leave(&room, &p.id());
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(!registry.contains_room(&room));
    }
}
