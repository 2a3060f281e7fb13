use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Store-assigned room identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(Uuid);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RoomId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Where a room sits in its lifecycle. There is no resolved phase: a
/// resolved room no longer exists in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomPhase {
    Open,
    Matched,
}

/// A duel room as persisted by a [`RoomStore`](crate::storage::RoomStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub creator_username: String,
    pub min_bid: f64,
    pub created_at: DateTime<Utc>,
    pub player1_address: String,
    pub player2_address: String, // empty until claimed
    pub player2_username: String,
}

impl Room {
    pub fn is_full(&self) -> bool {
        !self.player2_address.is_empty()
    }

    pub fn phase(&self) -> RoomPhase {
        if self.is_full() {
            RoomPhase::Matched
        } else {
            RoomPhase::Open
        }
    }

    /// `None` when the expiry lies past the representable date range.
    pub fn expires_at(&self, window: Duration) -> Option<DateTime<Utc>> {
        self.created_at.checked_add_signed(window)
    }

    /// Whether the room is still inside the listing window at `now`.
    /// Inclusive at the cutoff, matching the store's `created_at >= cutoff` scan.
    pub fn is_active(&self, now: DateTime<Utc>, window: Duration) -> bool {
        now.checked_sub_signed(window)
            .map_or(true, |cutoff| self.created_at >= cutoff)
    }
}

/// Fields supplied by the caller when inserting a room; the store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    pub creator_username: String,
    pub min_bid: f64,
    pub created_at: DateTime<Utc>,
    pub player1_address: String,
}

impl NewRoom {
    pub fn into_room(self, id: RoomId) -> Room {
        Room {
            id,
            creator_username: self.creator_username,
            min_bid: self.min_bid,
            created_at: self.created_at,
            player1_address: self.player1_address,
            player2_address: String::new(),
            player2_username: String::new(),
        }
    }
}
