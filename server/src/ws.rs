use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use pong_shared::config::CourtConfig;
use pong_shared::protocol::{
    ClientMsg, ErrorMsg, GameOverMsg, ServerMsg, WelcomeMsg, PROTOCOL_VERSION,
};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::registry::{Registry, RoomHandle};
use crate::room::RoomEvent;
use crate::state::PlayerId;

/// Longest accepted display name, in characters.
pub const MAX_NAME_CHARS: usize = 24;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub max_message_bytes: usize,
    pub max_parse_errors: u32,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

/// Plain-text liveness probe.
pub async fn health() -> &'static str {
    "Pong server is running!"
}

/// Trim a requested display name and check it is usable.
pub fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name must not be empty".to_string());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("Name must be at most {} characters", MAX_NAME_CHARS));
    }
    Ok(name.to_string())
}

type Sink = SplitSink<WebSocket, Message>;

async fn send_msg(sink: &mut Sink, msg: &ServerMsg) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", msg, e);
            true
        }
    }
}

fn error_msg(message: impl Into<String>) -> ServerMsg {
    ServerMsg::Error(ErrorMsg {
        message: message.into(),
    })
}

fn event_to_msg(event: RoomEvent) -> ServerMsg {
    match event {
        RoomEvent::State(state) => ServerMsg::GameState(state),
        RoomEvent::Waiting => ServerMsg::Waiting,
        RoomEvent::GameOver { winner_name } => ServerMsg::GameOver(GameOverMsg {
            winner: winner_name,
        }),
    }
}

/// Next event of the seated room; never resolves while not seated.
async fn next_room_event(
    seat: &mut Option<RoomHandle>,
) -> Result<RoomEvent, broadcast::error::RecvError> {
    match seat {
        Some(handle) => handle.events.recv().await,
        None => std::future::pending().await,
    }
}

/// Apply one intent. Returns a reply for this client only, if any.
fn handle_intent(
    registry: &Registry,
    my_id: PlayerId,
    seat: &mut Option<RoomHandle>,
    msg: ClientMsg,
) -> Option<ServerMsg> {
    match msg {
        ClientMsg::Join { name } => {
            if seat.is_some() {
                return Some(error_msg("Already in a room"));
            }
            let name = match validate_name(&name) {
                Ok(name) => name,
                Err(reason) => return Some(error_msg(reason)),
            };
            match registry.join(my_id, name) {
                Ok(handle) => {
                    *seat = Some(handle);
                    None
                }
                Err(e) => Some(error_msg(e.to_string())),
            }
        }
        ClientMsg::MovePaddle { y } => {
            let Some(handle) = seat else {
                return None;
            };
            if let Err(e) = handle.room.set_paddle_offset(my_id, y) {
                tracing::debug!("Ignoring paddle input from player {}: {}", my_id, e);
            }
            None
        }
        ClientMsg::Leave => {
            if seat.take().is_some() {
                if let Err(e) = registry.leave(my_id) {
                    tracing::debug!("Ignoring leave from player {}: {}", my_id, e);
                }
            }
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let registry = &app_state.registry;
    let my_id = registry.next_player_id();

    tracing::info!("Player {} connected", my_id);

    let welcome = ServerMsg::Welcome(WelcomeMsg {
        protocol_version: PROTOCOL_VERSION,
        server_version: env!("CARGO_PKG_VERSION").to_string(),
        self_id: my_id,
        court: CourtConfig::default(),
    });
    if !send_msg(&mut sink, &welcome).await {
        return;
    }

    let mut seat: Option<RoomHandle> = None;
    let mut parse_errors: u32 = 0;

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > app_state.max_message_bytes {
                            tracing::warn!(
                                "Player {} sent {} bytes, closing",
                                my_id,
                                text.len()
                            );
                            break;
                        }
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(client_msg) => {
                                if let Some(reply) =
                                    handle_intent(registry, my_id, &mut seat, client_msg)
                                {
                                    if !send_msg(&mut sink, &reply).await {
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                parse_errors += 1;
                                tracing::debug!("Player {} sent bad message: {}", my_id, e);
                                if parse_errors > app_state.max_parse_errors {
                                    tracing::warn!(
                                        "Player {} exceeded {} parse errors, closing",
                                        my_id,
                                        app_state.max_parse_errors
                                    );
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Player {} socket error: {}", my_id, e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client (room events)
            result = next_room_event(&mut seat) => {
                match result {
                    Ok(event) => {
                        if !send_msg(&mut sink, &event_to_msg(event)).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Every state is a full snapshot, skipping stale ones is fine
                        tracing::warn!("Player {} lagged by {} messages", my_id, n);
                    }
                    Err(broadcast::error::RecvError::Closed) => seat = None,
                }
            }
        }
    }

    // Disconnect is handled exactly like an explicit leave
    handle_intent(registry, my_id, &mut seat, ClientMsg::Leave);
    tracing::info!("Player {} disconnected", my_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed() {
        assert_eq!(validate_name("  ada \n"), Ok("ada".to_string()));
    }

    #[test]
    fn blank_and_long_names_are_rejected() {
        assert!(validate_name("").is_err());
        assert!(validate_name("   \t").is_err());
        assert!(validate_name(&"x".repeat(MAX_NAME_CHARS)).is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_CHARS + 1)).is_err());
    }

    #[test]
    fn room_events_map_to_wire_messages() {
        assert!(matches!(event_to_msg(RoomEvent::Waiting), ServerMsg::Waiting));
        match event_to_msg(RoomEvent::GameOver {
            winner_name: "ada".to_string(),
        }) {
            ServerMsg::GameOver(msg) => assert_eq!(msg.winner, "ada"),
            other => panic!("Expected GameOver, got {:?}", other),
        }
    }
}
