//! A single match: its state behind a lock, its event fan-out and its tick driver.

use crate::error::RoomError;
use crate::state::{PlayerId, RoomState, TickOutcome};
use pong_shared::protocol::{GameStateMsg, Side};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Buffered events per subscriber before it starts lagging.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Registry-issued room identifier, independent of any connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

/// Notifications fanned out to every session seated in a room.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    State(GameStateMsg),
    Waiting,
    GameOver { winner_name: String },
}

struct RoomInner {
    state: RoomState,
    driver: Option<JoinHandle<()>>,
    /// Bumped on every driver start; a driver only ticks while it matches.
    generation: u64,
}

pub struct Room {
    id: RoomId,
    inner: Mutex<RoomInner>,
    events: broadcast::Sender<RoomEvent>,
    tick_period: Duration,
}

impl Room {
    pub fn new(id: RoomId, rng: ChaCha8Rng, tick_rate_hz: u32) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            id,
            inner: Mutex::new(RoomInner {
                state: RoomState::new(rng),
                driver: None,
                generation: 0,
            }),
            events,
            tick_period: Duration::from_secs_f64(1.0 / tick_rate_hz as f64),
        })
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    // A panic mid-tick must not wedge the room for its other player.
    fn lock(&self) -> MutexGuard<'_, RoomInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn player_count(&self) -> usize {
        self.lock().state.player_count()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().state.is_playing()
    }

    pub fn is_ticking(&self) -> bool {
        self.lock().driver.is_some()
    }

    pub fn snapshot(&self) -> GameStateMsg {
        self.lock().state.get_game_state()
    }

    /// Seat a player. The returned receiver is subscribed before this join's
    /// own `Waiting`/`State` notifications go out, so the joiner sees them.
    pub fn join(
        self: &Arc<Self>,
        player_id: PlayerId,
        name: String,
    ) -> Result<(Side, broadcast::Receiver<RoomEvent>), RoomError> {
        let mut inner = self.lock();
        let side = inner.state.add_player(player_id, name)?;
        let events = self.events.subscribe();

        if inner.state.is_playing() {
            self.start_driver(&mut inner);
            tracing::info!("{} started with {} players", self.id, inner.state.player_count());
        } else {
            self.emit(RoomEvent::Waiting);
        }
        self.emit(RoomEvent::State(inner.state.get_game_state()));
        Ok((side, events))
    }

    /// Unseat a player and stop the simulation. Returns how many players remain;
    /// a remaining player is told the room is waiting again.
    pub fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        let mut inner = self.lock();
        let remaining = inner.state.remove_player(player_id)?;
        Self::stop_driver(&mut inner);
        if remaining > 0 {
            self.emit(RoomEvent::Waiting);
            self.emit(RoomEvent::State(inner.state.get_game_state()));
        }
        Ok(remaining)
    }

    /// Apply paddle input. Takes the same lock as the tick, so it lands
    /// either before or after a tick, never during one.
    pub fn set_paddle_offset(&self, player_id: PlayerId, y: f64) -> Result<(), RoomError> {
        self.lock().state.set_paddle_offset(player_id, y)
    }

    /// Stop the tick driver. Stopping a stopped room is a no-op.
    pub fn stop(&self) {
        Self::stop_driver(&mut self.lock());
    }

    fn emit(&self, event: RoomEvent) {
        // No subscribers is fine: everyone may have just left.
        let _ = self.events.send(event);
    }

    fn start_driver(self: &Arc<Self>, inner: &mut RoomInner) {
        Self::stop_driver(inner);
        inner.generation += 1;
        let handle = tokio::spawn(run_tick_driver(
            Arc::downgrade(self),
            inner.generation,
            self.tick_period,
        ));
        inner.driver = Some(handle);
    }

    fn stop_driver(inner: &mut RoomInner) {
        if let Some(handle) = inner.driver.take() {
            handle.abort();
        }
    }

    /// One scheduled tick. Returns false once this driver should exit.
    fn tick(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.driver.is_none() || inner.generation != generation {
            return false;
        }

        match inner.state.tick() {
            TickOutcome::Idle => {
                inner.driver = None;
                false
            }
            TickOutcome::Continue => {
                self.emit(RoomEvent::State(inner.state.get_game_state()));
                true
            }
            TickOutcome::GameOver {
                winner,
                winner_name,
            } => {
                // Dropping our own handle detaches it; the loop exits below.
                inner.driver = None;
                tracing::info!("{} won by player {} ({})", self.id, winner, winner_name);
                self.emit(RoomEvent::GameOver { winner_name });
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut RoomState) -> R) -> R {
        f(&mut self.lock().state)
    }
}

/// Drive a room at its tick rate until it stops playing, is stopped, or is dropped.
async fn run_tick_driver(room: Weak<Room>, generation: u64, period: Duration) {
    let mut tick_interval = tokio::time::interval(period);
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately; the first step happens one period in.
    tick_interval.tick().await;

    loop {
        tick_interval.tick().await;
        let Some(room) = room.upgrade() else {
            break;
        };
        if !room.tick(generation) {
            break;
        }
    }
}
