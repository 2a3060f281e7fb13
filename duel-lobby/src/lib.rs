//! Two-player coin flip duel lobby
//!
//! A player opens a room with a minimum bid, a second player joins, a coin
//! picks the winner, and the room is deleted. The second seat is claimed
//! with a conditional store update, so at most one joiner wins a room.

pub mod coin;
pub mod error;
pub mod lobby;

pub use coin::{Coin, FairCoin, FixedCoin, SeededCoin};
pub use error::{LobbyError, Result};
pub use lobby::{DuelOutcome, Lobby, Seat};

use duel_core::{LobbyConfig, SqliteRoomStore};
use std::path::Path;
use std::sync::Arc;

/// Opens a lobby over the SQLite room store in `data_dir`.
pub async fn open_lobby(data_dir: &Path, config: LobbyConfig) -> Result<Lobby> {
    let store: SqliteRoomStore = duel_core::open_room_store(data_dir).await?;
    Lobby::new(Arc::new(store), config)
}
