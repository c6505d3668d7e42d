//! Room table for the relay.
//!
//! The table maps room codes to rooms. The table lock is only held to look up, insert or
//! remove an entry; every change to a room's slots happens under that room's own lock, so
//! unrelated rooms never wait on each other. Lock order is room before table, and the table
//! lock is never held while waiting for a room. Outbound traffic goes through unbounded
//! per-peer channels, so sending while a room is locked never waits on a slow socket.

use crate::game::Side;
use crate::messages::{encode_line, Message};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// Identifies one relay connection
pub type PeerId = usize;

/// Encoded lines queued for a peer's socket
pub type PeerSender = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    pub fn other(&self) -> Slot {
        match self {
            Slot::First => Slot::Second,
            Slot::Second => Slot::First,
        }
    }
}

#[derive(Debug)]
struct Peer {
    id: PeerId,
    name: String,
    outbound: PeerSender,
}

impl Peer {
    fn send(&self, message: &Message) {
        match encode_line(message) {
            Ok(line) => self.send_line(line),
            Err(e) => warn!(peer = self.id, "Failed to encode {}: {}", message.message_type(), e),
        }
    }

    fn send_line(&self, line: String) {
        if self.outbound.send(line).is_err() {
            debug!(peer = self.id, "Peer writer already gone, dropping message");
        }
    }
}

#[derive(Debug)]
struct Room {
    code: String,
    first: Option<Peer>,
    second: Option<Peer>,
    /// Set once the room has emptied and left the table
    closed: bool,
}

impl Room {
    fn new(code: String) -> Self {
        Self {
            code,
            first: None,
            second: None,
            closed: false,
        }
    }

    fn slot(&self, slot: Slot) -> &Option<Peer> {
        match slot {
            Slot::First => &self.first,
            Slot::Second => &self.second,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Peer> {
        match slot {
            Slot::First => &mut self.first,
            Slot::Second => &mut self.second,
        }
    }

    fn occupants(&self) -> impl Iterator<Item = &Peer> {
        self.first.iter().chain(self.second.iter())
    }

    fn roster(&self) -> Vec<String> {
        self.occupants().map(|peer| peer.name.clone()).collect()
    }

    fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }

    fn broadcast(&self, message: &Message) {
        for peer in self.occupants() {
            peer.send(message);
        }
    }
}

/// A connection's place in a room, handed out by [`RoomRegistry::join`]
#[derive(Debug)]
pub struct Membership {
    room: Arc<Mutex<Room>>,
    code: String,
    peer: PeerId,
    slot: Slot,
}

impl Membership {
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

#[derive(Debug)]
pub enum JoinOutcome {
    Joined(Membership),
    /// Both slots were taken; nothing changed
    Full,
}

/// Process-wide room table
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<String, Arc<Mutex<Room>>>>,
    opening_side: Side,
}

impl RoomRegistry {
    /// `opening_side` is announced as `current_player` in every `start`
    pub fn new(opening_side: Side) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            opening_side,
        }
    }

    /// Occupy the first free slot of room `code`, creating the room if needed.
    ///
    /// Every occupant is sent the updated `waiting` roster and a `joined` notice. When
    /// this join completes the pair, sides are shuffled and each occupant receives its
    /// `start` message.
    pub async fn join(
        &self,
        code: &str,
        peer: PeerId,
        name: &str,
        outbound: PeerSender,
    ) -> JoinOutcome {
        loop {
            let room = self.room_entry(code).await;
            let mut guard = room.lock().await;

            // Emptied and removed between lookup and lock: fetch a fresh entry
            if guard.closed {
                continue;
            }

            let slot = if guard.first.is_none() {
                Slot::First
            } else if guard.second.is_none() {
                Slot::Second
            } else {
                info!(room = code, name, "Room is full");
                return JoinOutcome::Full;
            };

            *guard.slot_mut(slot) = Some(Peer {
                id: peer,
                name: name.to_string(),
                outbound,
            });
            info!(room = code, name, ?slot, "Player joined room");

            guard.broadcast(&Message::Waiting {
                players: guard.roster(),
            });
            guard.broadcast(&Message::Joined {
                name: name.to_string(),
            });

            if let (Some(first), Some(second)) = (&guard.first, &guard.second) {
                self.start_match(&guard.code, first, second);
            }

            drop(guard);
            return JoinOutcome::Joined(Membership {
                room,
                code: code.to_string(),
                peer,
                slot,
            });
        }
    }

    /// Queue a raw line for the other occupant, if there is one
    pub async fn forward(&self, membership: &Membership, line: String) {
        let room = membership.room.lock().await;
        match room.slot(membership.slot.other()) {
            Some(other) => other.send_line(line),
            None => debug!(room = %membership.code, "No opponent to forward to"),
        }
    }

    /// Vacate this connection's slot. A remaining occupant is told who left and gets a
    /// fresh roster; an emptied room is removed from the table.
    pub async fn leave(&self, membership: Membership) {
        let mut room = membership.room.lock().await;

        let owns_slot = room
            .slot(membership.slot)
            .as_ref()
            .is_some_and(|peer| peer.id == membership.peer);
        if !owns_slot {
            return;
        }
        let Some(leaving) = room.slot_mut(membership.slot).take() else {
            return;
        };
        info!(room = %membership.code, name = %leaving.name, "Player left room");

        if room.is_empty() {
            // Still holding the room lock, so no join can slip into the dying room
            room.closed = true;
            let mut rooms = self.rooms.lock().await;
            if rooms
                .get(&membership.code)
                .is_some_and(|entry| Arc::ptr_eq(entry, &membership.room))
            {
                rooms.remove(&membership.code);
                debug!(room = %membership.code, "Room destroyed");
            }
            return;
        }

        room.broadcast(&Message::OpponentLeft {
            name: leaving.name,
        });
        room.broadcast(&Message::Waiting {
            players: room.roster(),
        });
    }

    /// Number of live rooms
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Display names in room `code`, first slot first
    pub async fn roster(&self, code: &str) -> Option<Vec<String>> {
        let room = self.rooms.lock().await.get(code).cloned()?;
        let guard = room.lock().await;
        Some(guard.roster())
    }

    async fn room_entry(&self, code: &str) -> Arc<Mutex<Room>> {
        let mut rooms = self.rooms.lock().await;
        rooms
            .entry(code.to_string())
            .or_insert_with(|| {
                debug!(room = code, "Room created");
                Arc::new(Mutex::new(Room::new(code.to_string())))
            })
            .clone()
    }

    fn start_match(&self, code: &str, first: &Peer, second: &Peer) {
        let mut sides = [Side::Defender, Side::Attacker];
        sides.shuffle(&mut rand::thread_rng());

        first.send(&Message::Start {
            your_side: sides[0],
            current_player: self.opening_side,
            opponent_name: second.name.clone(),
        });
        second.send(&Message::Start {
            your_side: sides[1],
            current_player: self.opening_side,
            opponent_name: first.name.clone(),
        });
        info!(
            room = code,
            first = %first.name,
            second = %second.name,
            "Match started"
        );
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(Side::Defender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(line) = rx.try_recv() {
            messages.push(crate::messages::decode_message(&line).unwrap());
        }
        messages
    }

    #[tokio::test]
    async fn test_pairing_sends_one_start_each() {
        let registry = RoomRegistry::default();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let JoinOutcome::Joined(a) = registry.join("7", 1, "Astrid", tx_a).await else {
            panic!("first join should succeed");
        };
        assert_eq!(a.slot(), Slot::First);
        assert_eq!(
            drain(&mut rx_a),
            vec![
                Message::Waiting {
                    players: vec!["Astrid".to_string()]
                },
                Message::Joined {
                    name: "Astrid".to_string()
                },
            ]
        );

        let JoinOutcome::Joined(b) = registry.join("7", 2, "Bjorn", tx_b).await else {
            panic!("second join should succeed");
        };
        assert_eq!(b.slot(), Slot::Second);

        let for_a = drain(&mut rx_a);
        let for_b = drain(&mut rx_b);
        let side = |messages: &[Message]| {
            messages
                .iter()
                .filter_map(|m| match m {
                    Message::Start { your_side, .. } => Some(*your_side),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(side(&for_a).len(), 1);
        assert_eq!(side(&for_b).len(), 1);
        assert_ne!(side(&for_a)[0], side(&for_b)[0]);
    }

    #[tokio::test]
    async fn test_third_join_is_full() {
        let registry = RoomRegistry::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let _a = registry.join("x", 1, "A", tx.clone()).await;
        let _b = registry.join("x", 2, "B", tx.clone()).await;
        assert!(matches!(
            registry.join("x", 3, "C", tx).await,
            JoinOutcome::Full
        ));
        assert_eq!(
            registry.roster("x").await,
            Some(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[tokio::test]
    async fn test_last_leave_destroys_room_and_code_is_reusable() {
        let registry = RoomRegistry::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let JoinOutcome::Joined(a) = registry.join("r", 1, "A", tx.clone()).await else {
            panic!("join should succeed");
        };
        assert_eq!(registry.room_count().await, 1);
        registry.leave(a).await;
        assert_eq!(registry.room_count().await, 0);
        assert!(registry.roster("r").await.is_none());

        assert!(matches!(
            registry.join("r", 2, "B", tx).await,
            JoinOutcome::Joined(_)
        ));
        assert_eq!(registry.room_count().await, 1);
    }
}
