//! Core types for coin flip duels: the room model, caller identity, lobby
//! configuration, and the stores rooms live in.

pub mod config;
pub mod error;
pub mod identity;
pub mod storage;
pub mod types;

pub use config::LobbyConfig;
pub use error::{DuelError, Result};
pub use identity::{Caller, MissingIdentity, ResolvedIdentity, UserProfile, WalletAccount};
pub use storage::{ClaimOutcome, MemoryRoomStore, RoomStore, SqliteRoomStore, Storage};
pub use types::{NewRoom, Room, RoomId, RoomPhase};

use std::path::Path;
use std::sync::Arc;

/// Opens (or creates) the room database under `data_dir`.
pub async fn open_room_store(data_dir: &Path) -> Result<SqliteRoomStore> {
    let db_path = data_dir.join("duel.db");
    let storage = Arc::new(Storage::new(&db_path).await?);
    tracing::debug!("Opened room store at {}", db_path.display());
    Ok(SqliteRoomStore::new(storage))
}
