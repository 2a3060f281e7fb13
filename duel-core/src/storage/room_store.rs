use crate::error::Result;
use crate::storage::{ClaimOutcome, RoomStore, Storage};
use crate::types::{NewRoom, Room, RoomId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

const ROOM_COLUMNS: &str =
    "id, creator_username, min_bid, created_at, player1_address, player2_address, player2_username";

/// [`RoomStore`] backed by the SQLite `rooms` table.
pub struct SqliteRoomStore {
    storage: Arc<Storage>,
}

impl SqliteRoomStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    let id: String = row.get(0)?;
    let id = id
        .parse::<RoomId>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

    let created_ms: i64 = row.get(3)?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, created_ms))?;

    Ok(Room {
        id,
        creator_username: row.get(1)?,
        min_bid: row.get(2)?,
        created_at,
        player1_address: row.get(4)?,
        player2_address: row.get(5)?,
        player2_username: row.get(6)?,
    })
}

#[async_trait]
impl RoomStore for SqliteRoomStore {
    async fn insert(&self, room: NewRoom) -> Result<RoomId> {
        let conn = self.storage.get_connection().await;
        let id = RoomId::new();

        conn.execute(
            "INSERT INTO rooms (id, creator_username, min_bid, created_at, player1_address,
                                player2_address, player2_username)
             VALUES (?1, ?2, ?3, ?4, ?5, '', '')",
            params![
                id.to_string(),
                room.creator_username,
                room.min_bid,
                room.created_at.timestamp_millis(),
                room.player1_address,
            ],
        )?;

        Ok(id)
    }

    async fn get(&self, id: RoomId) -> Result<Option<Room>> {
        let conn = self.storage.get_connection().await;

        let room = conn
            .query_row(
                &format!("SELECT {} FROM rooms WHERE id = ?1", ROOM_COLUMNS),
                params![id.to_string()],
                room_from_row,
            )
            .optional()?;

        Ok(room)
    }

    async fn created_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Room>> {
        let conn = self.storage.get_connection().await;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rooms WHERE created_at >= ?1 ORDER BY created_at ASC",
            ROOM_COLUMNS
        ))?;

        let room_iter = stmt.query_map(params![cutoff.timestamp_millis()], room_from_row)?;

        let mut rooms = Vec::new();
        for room in room_iter {
            rooms.push(room?);
        }

        Ok(rooms)
    }

    async fn claim_player2(
        &self,
        id: RoomId,
        address: &str,
        username: &str,
    ) -> Result<ClaimOutcome> {
        let conn = self.storage.get_connection().await;

        // single statement, so the seat check and the write cannot interleave
        // with another connection's claim
        let claimed = conn
            .query_row(
                &format!(
                    "UPDATE rooms SET player2_address = ?2, player2_username = ?3
                     WHERE id = ?1 AND player2_address = ''
                     RETURNING {}",
                    ROOM_COLUMNS
                ),
                params![id.to_string(), address, username],
                room_from_row,
            )
            .optional()?;

        if let Some(room) = claimed {
            return Ok(ClaimOutcome::Claimed(room));
        }

        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM rooms WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;

        Ok(if exists > 0 {
            ClaimOutcome::AlreadyClaimed
        } else {
            ClaimOutcome::NotFound
        })
    }

    async fn delete(&self, id: RoomId) -> Result<bool> {
        let conn = self.storage.get_connection().await;
        let removed = conn.execute("DELETE FROM rooms WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    async fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.storage.get_connection().await;
        let removed = conn.execute(
            "DELETE FROM rooms WHERE created_at < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(removed)
    }
}
