use crate::error::RoomError;
use crate::physics::{self, Ball, Paddle};
use pong_shared::config::WIN_SCORE;
use pong_shared::protocol::{BallWire, GameStateMsg, PlayerWire, Side};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Opaque per-session player identifier.
pub type PlayerId = u32;

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Y of the paddle's top edge.
    pub paddle_offset: f64,
    pub score: u32,
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub players: HashMap<PlayerId, Player>,
    pub ball: Ball,
    pub is_playing: bool,
    pub winner: Option<PlayerId>,
}

/// What a single simulation step produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The room is not playing; nothing moved.
    Idle,
    /// The match goes on; broadcast the new state.
    Continue,
    /// A player reached the win score. The match is over.
    GameOver {
        winner: PlayerId,
        winner_name: String,
    },
}

/// Everything one room simulates: seating order, game state and the room's
/// random source. Purely synchronous; the owning `Room` serialises access.
pub struct RoomState {
    /// Index 0 plays on the left, index 1 on the right.
    ordered_player_ids: Vec<PlayerId>,
    game: GameState,
    rng: ChaCha8Rng,
}

impl RoomState {
    pub fn new(mut rng: ChaCha8Rng) -> Self {
        let ball = physics::serve(&mut rng);
        Self {
            ordered_player_ids: Vec::with_capacity(2),
            game: GameState {
                players: HashMap::new(),
                ball,
                is_playing: false,
                winner: None,
            },
            rng,
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn player_count(&self) -> usize {
        self.ordered_player_ids.len()
    }

    pub fn is_playing(&self) -> bool {
        self.game.is_playing
    }

    pub fn player_on(&self, side: Side) -> Option<&Player> {
        let index = match side {
            Side::Left => 0,
            Side::Right => 1,
        };
        self.ordered_player_ids
            .get(index)
            .and_then(|id| self.game.players.get(id))
    }

    /// Seat a player in the next free slot. Seating the second player starts
    /// a fresh match.
    pub fn add_player(&mut self, id: PlayerId, name: String) -> Result<Side, RoomError> {
        if self.game.players.contains_key(&id) {
            return Err(RoomError::AlreadyInRoom);
        }
        if self.ordered_player_ids.len() >= 2 {
            return Err(RoomError::RoomFull);
        }

        let side = if self.ordered_player_ids.is_empty() {
            Side::Left
        } else {
            Side::Right
        };
        self.ordered_player_ids.push(id);
        self.game.players.insert(
            id,
            Player {
                id,
                name,
                paddle_offset: physics::initial_paddle_offset(),
                score: 0,
            },
        );

        if self.ordered_player_ids.len() == 2 {
            self.start_match();
        }
        Ok(side)
    }

    /// Remove a player and pause the room. Returns how many players remain.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<usize, RoomError> {
        if self.game.players.remove(&id).is_none() {
            return Err(RoomError::UnknownPlayer);
        }
        self.ordered_player_ids.retain(|&p| p != id);
        self.game.is_playing = false;
        Ok(self.ordered_player_ids.len())
    }

    /// Store a clamped paddle offset. Non-finite input leaves the paddle where it is.
    pub fn set_paddle_offset(&mut self, id: PlayerId, y: f64) -> Result<(), RoomError> {
        let player = self
            .game
            .players
            .get_mut(&id)
            .ok_or(RoomError::UnknownPlayer)?;
        if let Some(offset) = physics::clamp_paddle_offset(y) {
            player.paddle_offset = offset;
        }
        Ok(())
    }

    fn start_match(&mut self) {
        for player in self.game.players.values_mut() {
            player.score = 0;
        }
        self.game.winner = None;
        self.game.ball = physics::serve(&mut self.rng);
        self.game.is_playing = true;
    }

    fn paddle(&self, side: Side) -> Option<Paddle> {
        self.player_on(side).map(|p| Paddle {
            side,
            offset: p.paddle_offset,
        })
    }

    fn credit(&mut self, side: Side) {
        let index = match side {
            Side::Left => 0,
            Side::Right => 1,
        };
        if let Some(id) = self.ordered_player_ids.get(index) {
            if let Some(player) = self.game.players.get_mut(id) {
                player.score += 1;
            }
        }
    }

    /// Run one simulation step.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.game.is_playing {
            return TickOutcome::Idle;
        }

        let mut ball = physics::reflect_off_walls(physics::advance(self.game.ball));
        for side in [Side::Left, Side::Right] {
            if let Some(paddle) = self.paddle(side) {
                ball = physics::bounce_off_paddle(ball, &paddle);
            }
        }

        match physics::court_exit(&ball) {
            Some(Side::Left) => {
                self.credit(Side::Right);
                ball = physics::reset_ball(Side::Right, &mut self.rng);
            }
            Some(Side::Right) => {
                self.credit(Side::Left);
                ball = physics::reset_ball(Side::Left, &mut self.rng);
            }
            None => {}
        }
        self.game.ball = ball;

        for side in [Side::Left, Side::Right] {
            let Some(player) = self.player_on(side) else {
                continue;
            };
            if player.score >= WIN_SCORE {
                let winner = player.id;
                let winner_name = player.name.clone();
                self.game.is_playing = false;
                self.game.winner = Some(winner);
                return TickOutcome::GameOver {
                    winner,
                    winner_name,
                };
            }
        }
        TickOutcome::Continue
    }

    /// Snapshot for broadcasting, left player first.
    pub fn get_game_state(&self) -> GameStateMsg {
        let players = [Side::Left, Side::Right]
            .into_iter()
            .filter_map(|side| {
                self.player_on(side).map(|p| PlayerWire {
                    id: p.id,
                    name: p.name.clone(),
                    side,
                    paddle_y: p.paddle_offset,
                    score: p.score,
                })
            })
            .collect();
        let ball = self.game.ball;
        GameStateMsg {
            players,
            ball: BallWire {
                x: ball.x,
                y: ball.y,
                vx: ball.vx,
                vy: ball.vy,
            },
            is_playing: self.game.is_playing,
            winner: self.game.winner,
        }
    }

    #[cfg(test)]
    pub(crate) fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn test_state() -> RoomState {
        RoomState::new(ChaCha8Rng::seed_from_u64(12345))
    }

    fn playing_state() -> RoomState {
        let mut state = test_state();
        state.add_player(1, "ada".to_string()).unwrap();
        state.add_player(2, "bob".to_string()).unwrap();
        state
    }

    #[test]
    fn first_player_waits_second_starts_match() {
        let mut state = test_state();
        assert_eq!(state.add_player(1, "ada".to_string()), Ok(Side::Left));
        assert!(!state.is_playing());
        assert_eq!(state.tick(), TickOutcome::Idle);

        assert_eq!(state.add_player(2, "bob".to_string()), Ok(Side::Right));
        assert!(state.is_playing());
        assert!(state.game().winner.is_none());
        let p = &state.game().players[&1];
        assert_eq!((p.paddle_offset, p.score), (160.0, 0));
    }

    #[test]
    fn third_player_is_refused_without_state_change() {
        let mut state = playing_state();
        assert_eq!(
            state.add_player(3, "cy".to_string()),
            Err(RoomError::RoomFull)
        );
        assert_eq!(state.player_count(), 2);
        assert!(!state.game().players.contains_key(&3));
        assert_eq!(
            state.add_player(1, "ada".to_string()),
            Err(RoomError::AlreadyInRoom)
        );
    }

    #[test]
    fn paddle_input_is_clamped() {
        let mut state = playing_state();
        state.set_paddle_offset(1, -40.0).unwrap();
        assert_eq!(state.game().players[&1].paddle_offset, 0.0);
        state.set_paddle_offset(2, 9999.0).unwrap();
        assert_eq!(state.game().players[&2].paddle_offset, 320.0);
        state.set_paddle_offset(2, f64::NAN).unwrap();
        assert_eq!(state.game().players[&2].paddle_offset, 320.0);
        assert_eq!(
            state.set_paddle_offset(42, 10.0),
            Err(RoomError::UnknownPlayer)
        );
    }

    #[test]
    fn right_edge_exit_scores_for_left() {
        let mut state = playing_state();
        state.game_mut().ball = Ball {
            x: 605.0,
            y: 200.0,
            vx: 4.0,
            vy: 0.0,
        };

        assert_eq!(state.tick(), TickOutcome::Continue);
        assert_eq!(state.game().players[&1].score, 1);
        assert_eq!(state.game().players[&2].score, 0);
        let ball = state.game().ball;
        assert_eq!((ball.x, ball.y, ball.vx), (300.0, 200.0, -4.0));
    }

    #[test]
    fn left_edge_exit_scores_for_right() {
        let mut state = playing_state();
        // Left paddle parked at the top, well away from the ball.
        state.set_paddle_offset(1, 0.0).unwrap();
        state.game_mut().ball = Ball {
            x: 2.0,
            y: 300.0,
            vx: -4.0,
            vy: 0.0,
        };

        assert_eq!(state.tick(), TickOutcome::Continue);
        assert_eq!(state.game().players[&2].score, 1);
        assert_eq!(state.game().players[&1].score, 0);
        let ball = state.game().ball;
        assert_eq!((ball.x, ball.y, ball.vx), (300.0, 200.0, 4.0));
    }

    #[test]
    fn paddle_returns_ball_without_scoring() {
        let mut state = playing_state();
        state.game_mut().ball = Ball {
            x: 12.0,
            y: 195.0,
            vx: -4.0,
            vy: 0.0,
        };

        assert_eq!(state.tick(), TickOutcome::Continue);
        let ball = state.game().ball;
        assert_eq!((ball.x, ball.vx), (10.0, 4.0));
        assert_eq!(state.game().players[&2].score, 0);
    }

    #[test]
    fn fifth_point_ends_the_match() {
        let mut state = playing_state();
        state.game_mut().players.get_mut(&1).unwrap().score = 4;
        state.game_mut().ball = Ball {
            x: 605.0,
            y: 200.0,
            vx: 4.0,
            vy: 0.0,
        };

        assert_eq!(
            state.tick(),
            TickOutcome::GameOver {
                winner: 1,
                winner_name: "ada".to_string()
            }
        );
        assert!(!state.is_playing());
        assert_eq!(state.game().winner, Some(1));
        assert_eq!(state.game().players[&1].score, 5);
        assert_eq!(state.tick(), TickOutcome::Idle);
    }

    #[test]
    fn score_never_passes_win_score() {
        let mut state = playing_state();
        // Keep both paddles out of the ball's way so every rally scores.
        let mut ticks = 0;
        loop {
            state.set_paddle_offset(1, 0.0).unwrap();
            state.set_paddle_offset(2, 0.0).unwrap();
            if state.game().ball.y < 100.0 {
                state.game_mut().ball.y = 300.0;
            }
            ticks += 1;
            assert!(ticks < 100_000, "match never ended");
            match state.tick() {
                TickOutcome::Continue => {
                    for p in state.game().players.values() {
                        assert!(p.score < WIN_SCORE);
                    }
                }
                TickOutcome::GameOver { winner, .. } => {
                    let scores: Vec<u32> =
                        state.game().players.values().map(|p| p.score).collect();
                    assert!(scores.contains(&WIN_SCORE));
                    assert_eq!(state.game().players[&winner].score, WIN_SCORE);
                    break;
                }
                TickOutcome::Idle => panic!("room stopped without a winner"),
            }
        }
    }

    #[test]
    fn leaving_pauses_and_promotes_remaining_player() {
        let mut state = playing_state();
        assert_eq!(state.remove_player(1), Ok(1));
        assert!(!state.is_playing());
        assert_eq!(state.player_on(Side::Left).map(|p| p.id), Some(2));
        assert_eq!(state.remove_player(1), Err(RoomError::UnknownPlayer));
        assert_eq!(state.remove_player(2), Ok(0));
    }

    #[test]
    fn rematch_resets_scores_and_winner() {
        let mut state = playing_state();
        state.game_mut().players.get_mut(&1).unwrap().score = 5;
        state.game_mut().winner = Some(1);
        state.game_mut().is_playing = false;

        state.remove_player(2).unwrap();
        state.add_player(3, "cy".to_string()).unwrap();
        assert!(state.is_playing());
        assert!(state.game().winner.is_none());
        assert_eq!(state.game().players[&1].score, 0);
    }

    #[test]
    fn snapshot_lists_left_player_first() {
        let state = playing_state();
        let msg = state.get_game_state();
        assert_eq!(msg.players.len(), 2);
        assert_eq!(msg.players[0].id, 1);
        assert_eq!(msg.players[0].side, Side::Left);
        assert_eq!(msg.players[1].name, "bob");
        assert!(msg.is_playing);
    }
}
