//! Room registry and first-come-first-served matchmaker.

use crate::config::ServerConfig;
use crate::error::RoomError;
use crate::room::{Room, RoomEvent, RoomId};
use crate::state::PlayerId;
use pong_shared::protocol::{GameStateMsg, Side};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// What a session gets back from a successful join.
pub struct RoomHandle {
    pub room: Arc<Room>,
    pub side: Side,
    pub events: broadcast::Receiver<RoomEvent>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room.id()
    }
}

struct RegistryInner {
    rooms: HashMap<RoomId, Arc<Room>>,
    /// Which room each seated player is in.
    seats: HashMap<PlayerId, RoomId>,
    /// Rooms holding exactly one player, oldest first.
    waiting: VecDeque<RoomId>,
    next_room_id: u64,
    /// Seeds each new room's generator.
    rng: ChaCha8Rng,
}

/// Owns every room. Lock order is registry, then room.
pub struct Registry {
    inner: Mutex<RegistryInner>,
    next_player_id: AtomicU32,
    tick_rate_hz: u32,
}

impl Registry {
    pub fn new(config: &ServerConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            inner: Mutex::new(RegistryInner {
                rooms: HashMap::new(),
                seats: HashMap::new(),
                waiting: VecDeque::new(),
                next_room_id: 1,
                rng,
            }),
            next_player_id: AtomicU32::new(1),
            tick_rate_hz: config.tick_rate_hz,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocate a fresh player id for a new session.
    pub fn next_player_id(&self) -> PlayerId {
        self.next_player_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Seat a player in the oldest waiting room, or in a new room if none waits.
    /// Must be called from within a tokio runtime: a full room starts ticking.
    pub fn join(&self, player_id: PlayerId, name: String) -> Result<RoomHandle, RoomError> {
        let mut inner = self.lock();
        if inner.seats.contains_key(&player_id) {
            return Err(RoomError::AlreadyInRoom);
        }

        let room = match Self::take_waiting_room(&mut inner) {
            Some(room) => room,
            None => {
                let id = RoomId(inner.next_room_id);
                inner.next_room_id += 1;
                let rng = ChaCha8Rng::seed_from_u64(inner.rng.gen());
                let room = Room::new(id, rng, self.tick_rate_hz);
                inner.rooms.insert(id, Arc::clone(&room));
                tracing::info!("Created {}", id);
                room
            }
        };

        let (side, events) = match room.join(player_id, name) {
            Ok(joined) => joined,
            Err(e) => {
                if room.player_count() == 0 {
                    inner.rooms.remove(&room.id());
                }
                return Err(e);
            }
        };

        inner.seats.insert(player_id, room.id());
        if room.player_count() == 1 {
            inner.waiting.push_back(room.id());
        }
        tracing::info!("Player {} joined {} on the {:?}", player_id, room.id(), side);

        Ok(RoomHandle { room, side, events })
    }

    /// Pop waiting rooms until one still holds exactly one player.
    fn take_waiting_room(inner: &mut RegistryInner) -> Option<Arc<Room>> {
        while let Some(id) = inner.waiting.pop_front() {
            if let Some(room) = inner.rooms.get(&id) {
                if room.player_count() == 1 {
                    return Some(Arc::clone(room));
                }
            }
        }
        None
    }

    /// Unseat a player. The last player out removes the room; otherwise the
    /// room goes back to waiting for an opponent.
    pub fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        let mut inner = self.lock();
        let room_id = inner
            .seats
            .remove(&player_id)
            .ok_or(RoomError::UnknownPlayer)?;
        let room = inner
            .rooms
            .get(&room_id)
            .cloned()
            .ok_or(RoomError::UnknownPlayer)?;

        let remaining = room.leave(player_id)?;
        tracing::info!("Player {} left {}", player_id, room_id);

        if remaining == 0 {
            room.stop();
            inner.rooms.remove(&room_id);
            inner.waiting.retain(|&id| id != room_id);
            tracing::info!("Removed empty {}", room_id);
        } else if !inner.waiting.contains(&room_id) {
            inner.waiting.push_back(room_id);
        }
        Ok(())
    }

    /// Route paddle input to the player's room.
    pub fn set_paddle_offset(&self, player_id: PlayerId, y: f64) -> Result<(), RoomError> {
        let room = {
            let inner = self.lock();
            let room_id = inner
                .seats
                .get(&player_id)
                .ok_or(RoomError::UnknownPlayer)?;
            inner
                .rooms
                .get(room_id)
                .cloned()
                .ok_or(RoomError::UnknownPlayer)?
        };
        room.set_paddle_offset(player_id, y)
    }

    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }

    pub fn room_of(&self, player_id: PlayerId) -> Option<RoomId> {
        self.lock().seats.get(&player_id).copied()
    }

    pub fn snapshot(&self, room_id: RoomId) -> Option<GameStateMsg> {
        let room = self.lock().rooms.get(&room_id).cloned()?;
        Some(room.snapshot())
    }

    /// Stop every tick driver and forget all rooms.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        for (_, room) in inner.rooms.drain() {
            room.stop();
        }
        inner.seats.clear();
        inner.waiting.clear();
        tracing::info!("Registry shut down");
    }
}
