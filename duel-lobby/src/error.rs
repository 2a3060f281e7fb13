use duel_core::{MissingIdentity, RoomId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LobbyError>;

#[derive(Error, Debug)]
pub enum LobbyError {
    #[error("Duel core error: {0}")]
    Core(#[from] duel_core::DuelError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(#[from] MissingIdentity),

    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Room {0} is already full")]
    RoomFull(RoomId),
}

impl LobbyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Errors the user can fix by retrying differently; nothing is broken.
    pub fn is_user_recoverable(&self) -> bool {
        !matches!(self, Self::Core(_))
    }
}
