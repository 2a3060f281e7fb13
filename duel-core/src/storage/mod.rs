pub mod memory;
pub mod room_store;

pub use memory::MemoryRoomStore;
pub use room_store::SqliteRoomStore;

use crate::error::{DuelError, Result};
use crate::types::{NewRoom, Room, RoomId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

/// Result of trying to take the second seat of a room.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome {
    /// The seat was empty and now belongs to the claimant.
    Claimed(Room),
    AlreadyClaimed,
    NotFound,
}

/// Document-style store holding duel rooms.
///
/// Implementations must make [`claim_player2`](RoomStore::claim_player2) a
/// single conditional update: when several callers race for the same room,
/// exactly one of them observes `Claimed`.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Inserts a room with an empty second seat and returns its new id.
    async fn insert(&self, room: NewRoom) -> Result<RoomId>;

    async fn get(&self, id: RoomId) -> Result<Option<Room>>;

    /// Rooms with `created_at >= cutoff`.
    async fn created_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Room>>;

    async fn claim_player2(&self, id: RoomId, address: &str, username: &str)
        -> Result<ClaimOutcome>;

    /// Returns `false` when the room was already gone.
    async fn delete(&self, id: RoomId) -> Result<bool>;

    /// Removes rooms with `created_at < cutoff`, returning how many went.
    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub async fn new(db_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DuelError::internal(format!("Failed to create directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)?;
        // other processes may hold the write lock while claiming a room
        conn.busy_timeout(Duration::from_secs(5))?;

        let storage = Self {
            conn: Mutex::new(conn),
        };

        storage.init_schema().await?;
        Ok(storage)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().await;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                creator_username TEXT NOT NULL,
                min_bid REAL NOT NULL CHECK (min_bid > 0),
                created_at INTEGER NOT NULL,
                player1_address TEXT NOT NULL,
                player2_address TEXT NOT NULL DEFAULT '',
                player2_username TEXT NOT NULL DEFAULT ''
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_rooms_created_at ON rooms (created_at)",
            [],
        )?;

        Ok(())
    }

    pub async fn get_connection(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }
}
