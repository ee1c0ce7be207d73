/// Reasons a room operation can be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// The room already seats two players.
    #[error("Room is full")]
    RoomFull,
    #[error("Already in a room")]
    AlreadyInRoom,
    /// Input or leave for a player no room knows about, usually a late
    /// message racing a disconnect.
    #[error("Unknown player")]
    UnknownPlayer,
}
