use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::CourtConfig;

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Server -> Client ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "gameState")]
    GameState(GameStateMsg),
    #[serde(rename = "waiting")]
    Waiting,
    #[serde(rename = "gameOver")]
    GameOver(GameOverMsg),
    #[serde(rename = "error")]
    Error(ErrorMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: u32,
    pub court: CourtConfig,
}

/// Which half of the court a player defends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Full room snapshot. Players are listed left side first.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct GameStateMsg {
    pub players: Vec<PlayerWire>,
    pub ball: BallWire,
    pub is_playing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub winner: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(rename_all = "camelCase")]
pub struct PlayerWire {
    pub id: u32,
    pub name: String,
    pub side: Side,
    pub paddle_y: f64,
    pub score: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct BallWire {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct GameOverMsg {
    /// Display name of the winning player.
    pub winner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
pub struct ErrorMsg {
    pub message: String,
}

// === Client -> Server ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export, export_to = "../../client/src/shared/generated/")]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "join")]
    Join { name: String },
    #[serde(rename = "movePaddle")]
    MovePaddle { y: f64 },
    #[serde(rename = "leave")]
    Leave,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_state_serializes_camel_case_and_omits_missing_winner() {
        let msg = ServerMsg::GameState(GameStateMsg {
            players: vec![PlayerWire {
                id: 3,
                name: "ada".to_string(),
                side: Side::Left,
                paddle_y: 160.0,
                score: 2,
            }],
            ball: BallWire {
                x: 300.0,
                y: 200.0,
                vx: -4.0,
                vy: 1.5,
            },
            is_playing: true,
            winner: None,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"gameState\""));
        assert!(json.contains("\"isPlaying\":true"));
        assert!(json.contains("\"paddleY\":160.0"));
        assert!(json.contains("\"side\":\"left\""));
        assert!(!json.contains("winner"));

        let parsed: ServerMsg = serde_json::from_str(&json).unwrap();
        match parsed {
            ServerMsg::GameState(s) => {
                assert_eq!(s.players.len(), 1);
                assert_eq!(s.players[0].score, 2);
                assert!(s.winner.is_none());
            }
            _ => panic!("Expected GameState"),
        }
    }

    #[test]
    fn unit_and_payload_notifications_are_tagged() {
        let waiting = serde_json::to_string(&ServerMsg::Waiting).unwrap();
        assert_eq!(waiting, r#"{"type":"waiting"}"#);

        let over = serde_json::to_string(&ServerMsg::GameOver(GameOverMsg {
            winner: "bob".to_string(),
        }))
        .unwrap();
        assert_eq!(over, r#"{"type":"gameOver","winner":"bob"}"#);

        let err = serde_json::to_string(&ServerMsg::Error(ErrorMsg {
            message: "Room is full".to_string(),
        }))
        .unwrap();
        assert_eq!(err, r#"{"type":"error","message":"Room is full"}"#);
    }

    #[test]
    fn client_intents_parse_from_json() {
        let join: ClientMsg = serde_json::from_str(r#"{"type":"join","name":"ada"}"#).unwrap();
        assert!(matches!(join, ClientMsg::Join { ref name } if name == "ada"));

        let mv: ClientMsg = serde_json::from_str(r#"{"type":"movePaddle","y":123.5}"#).unwrap();
        match mv {
            ClientMsg::MovePaddle { y } => assert!((y - 123.5).abs() < 1e-9),
            _ => panic!("Expected MovePaddle"),
        }

        let leave: ClientMsg = serde_json::from_str(r#"{"type":"leave"}"#).unwrap();
        assert!(matches!(leave, ClientMsg::Leave));
    }

    #[test]
    fn unknown_intent_is_rejected() {
        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"teleport"}"#).is_err());
    }
}
