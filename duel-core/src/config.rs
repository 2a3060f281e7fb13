use crate::error::{DuelError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rooms stay listable for this long after creation.
pub const DEFAULT_LISTING_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Longest accepted listing window, one year.
pub const MAX_LISTING_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyConfig {
    pub listing_window: Duration,
    /// Lets a creator join (and so resolve) their own room.
    pub allow_self_join: bool,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            listing_window: DEFAULT_LISTING_WINDOW,
            allow_self_join: true,
        }
    }
}

impl LobbyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.listing_window.is_zero() {
            return Err(DuelError::config("Listing window must be greater than 0"));
        }

        if self.listing_window > MAX_LISTING_WINDOW {
            return Err(DuelError::config(format!(
                "Listing window must be at most {} seconds",
                MAX_LISTING_WINDOW.as_secs()
            )));
        }

        Ok(())
    }

    /// Oldest `created_at` still inside the listing window at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_sub_signed(self.window())
            .ok_or_else(|| DuelError::config("Listing window is out of range"))
    }

    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.listing_window)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_LISTING_WINDOW.as_secs() as i64))
    }
}
