//! Authoritative local cache of peer state.
//!
//! Owned exclusively by the connection actor's receive path. Merge rules are
//! deliberately forgiving: `move` for an unseen peer self-heals a missed
//! `join`, and a snapshot replaces everything, so the store converges even
//! when individual broadcasts were lost.

use std::collections::HashMap;

use crate::protocol::{PeerSession, WireMessage};

/// Mapping from peer id to last-known session state.
#[derive(Debug, Default)]
pub struct SessionStore {
    peers: HashMap<String, PeerSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly joined peer with unknown position. Re-joining an
    /// already-known peer is a no-op, not a position reset.
    pub fn apply_join(&mut self, id: &str) {
        self.peers
            .entry(id.to_string())
            .or_insert_with(|| PeerSession::joined(id));
    }

    /// Update a peer's position in place, inserting the full session if the
    /// peer is unknown (a missed `join` must not lose the peer).
    pub fn apply_move(&mut self, id: &str, x: f64, y: f64) {
        match self.peers.get_mut(id) {
            Some(session) => {
                session.x = x;
                session.y = y;
            }
            None => {
                self.peers.insert(
                    id.to_string(),
                    PeerSession {
                        id: id.to_string(),
                        x,
                        y,
                    },
                );
            }
        }
    }

    /// Remove a departed peer. Absent ids are a no-op.
    pub fn apply_quit(&mut self, id: &str) {
        self.peers.remove(id);
    }

    /// Atomically replace the whole map with a broker snapshot. Peers not in
    /// the snapshot are dropped, even without an explicit `quit`.
    pub fn apply_snapshot(&mut self, sessions: Vec<PeerSession>) {
        self.peers = sessions
            .into_iter()
            .map(|session| (session.id.clone(), session))
            .collect();
    }

    /// Empty the map. Used on disconnect: no peers are known while offline.
    pub fn clear(&mut self) {
        self.peers.clear();
    }

    /// Dispatch one inbound message to the matching merge rule. Returns true
    /// when the store may have changed. `get-cursors`, `message` and unknown
    /// kinds are no-ops here.
    pub fn apply(&mut self, msg: WireMessage) -> bool {
        match msg {
            WireMessage::Join { id } => {
                self.apply_join(&id);
                true
            }
            WireMessage::Quit { id } => {
                self.apply_quit(&id);
                true
            }
            WireMessage::Move { id, x, y } => {
                self.apply_move(&id, x, y);
                true
            }
            WireMessage::GetCursorsResponse { sessions } => {
                self.apply_snapshot(sessions);
                true
            }
            WireMessage::GetCursors
            | WireMessage::Message { .. }
            | WireMessage::Unknown { .. } => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&PeerSession> {
        self.peers.get(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Clone of the current peer map, for consumers that must not observe
    /// in-place mutation.
    pub fn snapshot(&self) -> HashMap<String, PeerSession> {
        self.peers.clone()
    }
}
