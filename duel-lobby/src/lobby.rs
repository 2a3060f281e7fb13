use crate::coin::{Coin, FairCoin};
use crate::{LobbyError, Result};
use chrono::Utc;
use duel_core::{
    Caller, ClaimOutcome, LobbyConfig, NewRoom, ResolvedIdentity, Room, RoomId, RoomStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which side of the room took the pot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seat {
    Creator,
    Joiner,
}

/// Result of a resolved duel, handed back to the joiner for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelOutcome {
    pub room_id: RoomId,
    pub winner: Seat,
    pub winner_address: String,
    pub winner_username: String,
    pub min_bid: f64,
    /// Both stakes. Settlement is not performed here.
    pub payout: f64,
}

/// Room lifecycle engine: `Open --join--> Matched --resolve--> deleted`.
///
/// Holds no per-room state of its own; every room lives in the store and
/// caller identity comes in with each call.
pub struct Lobby {
    store: Arc<dyn RoomStore>,
    config: LobbyConfig,
    coin: Arc<dyn Coin>,
}

impl Lobby {
    pub fn new(store: Arc<dyn RoomStore>, config: LobbyConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            config,
            coin: Arc::new(FairCoin),
        })
    }

    pub fn with_coin(mut self, coin: Arc<dyn Coin>) -> Self {
        self.coin = coin;
        self
    }

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Rooms created within the listing window, oldest first.
    pub async fn list_active_rooms(&self) -> Result<Vec<Room>> {
        let cutoff = self.config.cutoff(Utc::now())?;
        let rooms = self.store.created_since(cutoff).await?;
        tracing::debug!("Listed {} active rooms since {}", rooms.len(), cutoff);
        Ok(rooms)
    }

    pub async fn create_room(&self, min_bid: Option<f64>, caller: &Caller) -> Result<RoomId> {
        let min_bid = validate_bid(min_bid)?;
        let creator = caller.resolve()?;

        let room_id = self
            .store
            .insert(NewRoom {
                creator_username: creator.username.clone(),
                min_bid,
                created_at: Utc::now(),
                player1_address: creator.address,
            })
            .await?;

        tracing::info!(
            "Room {} created by {} with min bid {}",
            room_id,
            creator.username,
            min_bid
        );
        Ok(room_id)
    }

    /// Takes the second seat of a room and settles the duel straight away.
    ///
    /// The caller's whole identity, wallet included, is resolved before the
    /// room is read, so a caller without a wallet gets `IdentityUnavailable`
    /// even for a room that is already full.
    pub async fn join_room(&self, room_id: RoomId, caller: &Caller) -> Result<DuelOutcome> {
        let joiner = caller.resolve()?;

        if !self.config.allow_self_join {
            let room = self.get_room(room_id).await?;
            if room.player1_address == joiner.address {
                return Err(LobbyError::validation("Cannot join a room you created"));
            }
        }

        match self
            .store
            .claim_player2(room_id, &joiner.address, &joiner.username)
            .await?
        {
            ClaimOutcome::Claimed(_) => {
                tracing::info!("Player {} joined room {}", joiner.username, room_id);
            }
            ClaimOutcome::AlreadyClaimed => {
                tracing::debug!("Player {} lost the race for room {}", joiner.username, room_id);
                return Err(LobbyError::RoomFull(room_id));
            }
            ClaimOutcome::NotFound => return Err(LobbyError::RoomNotFound(room_id)),
        }

        match self.resolve_room(room_id, &joiner).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::warn!("Resolution of room {} aborted: {}", room_id, e);
                Err(e)
            }
        }
    }

    /// Flips the coin for a matched room and deletes it.
    async fn resolve_room(
        &self,
        room_id: RoomId,
        claimant: &ResolvedIdentity,
    ) -> Result<DuelOutcome> {
        let room = self
            .store
            .get(room_id)
            .await?
            .filter(|room| room.player2_address == claimant.address)
            .ok_or(LobbyError::RoomNotFound(room_id))?;

        let creator_wins = self.coin.flip();
        let (winner, winner_address, winner_username) = if creator_wins {
            (Seat::Creator, room.player1_address, room.creator_username)
        } else {
            (Seat::Joiner, room.player2_address, room.player2_username)
        };

        if !self.store.delete(room_id).await? {
            tracing::debug!("Room {} was already deleted", room_id);
        }

        let outcome = DuelOutcome {
            room_id,
            winner,
            winner_address,
            winner_username,
            min_bid: room.min_bid,
            payout: room.min_bid * 2.0,
        };

        tracing::info!(
            "Room {} resolved. Winner: {} ({})",
            room_id,
            outcome.winner_username,
            outcome.winner_address
        );
        tracing::info!(
            "Room {} payout: {} to {} awaiting settlement",
            room_id,
            outcome.payout,
            outcome.winner_address
        );

        Ok(outcome)
    }

    pub async fn get_room(&self, room_id: RoomId) -> Result<Room> {
        self.store
            .get(room_id)
            .await?
            .ok_or(LobbyError::RoomNotFound(room_id))
    }

    /// Deletes rooms that have dropped out of the listing window.
    pub async fn prune_expired_rooms(&self) -> Result<usize> {
        let cutoff = self.config.cutoff(Utc::now())?;
        let removed = self.store.delete_created_before(cutoff).await?;
        tracing::info!("Pruned {} rooms created before {}", removed, cutoff);
        Ok(removed)
    }
}

fn validate_bid(min_bid: Option<f64>) -> Result<f64> {
    let bid = min_bid.ok_or_else(|| LobbyError::validation("Please enter a minimum bid"))?;
    if !bid.is_finite() || bid <= 0.0 {
        return Err(LobbyError::validation(format!(
            "Minimum bid must be a positive number, got {}",
            bid
        )));
    }
    Ok(bid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::{FixedCoin, SeededCoin};
    use duel_core::{MemoryRoomStore, MissingIdentity, UserProfile};
    use std::collections::HashSet;

    fn alice() -> Caller {
        Caller::connected("0xA", 1, "alice")
    }

    fn bob() -> Caller {
        Caller::connected("0xB", 2, "bob")
    }

    fn lobby(store: Arc<MemoryRoomStore>, coin: impl Coin + 'static) -> Lobby {
        Lobby::new(store, LobbyConfig::default())
            .unwrap()
            .with_coin(Arc::new(coin))
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store, FairCoin);

        let room_id = lobby.create_room(Some(5.0), &alice()).await.unwrap();
        let rooms = lobby.list_active_rooms().await.unwrap();

        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, room_id);
        assert_eq!(rooms[0].min_bid, 5.0);
        assert_eq!(rooms[0].creator_username, "alice");
        assert_eq!(rooms[0].player1_address, "0xA");
        assert_eq!(rooms[0].player2_address, "");
    }

    #[tokio::test]
    async fn test_creator_may_open_many_rooms() {
        let lobby = lobby(Arc::new(MemoryRoomStore::new()), FairCoin);

        let first = lobby.create_room(Some(1.0), &alice()).await.unwrap();
        let second = lobby.create_room(Some(1.0), &alice()).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(lobby.list_active_rooms().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_bids() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);

        for bid in [None, Some(0.0), Some(-3.0), Some(f64::NAN), Some(f64::INFINITY)] {
            let err = lobby.create_room(bid, &alice()).await.unwrap_err();
            assert!(matches!(err, LobbyError::Validation(_)), "bid {:?}: {}", bid, err);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_requires_identity() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);

        let no_wallet = Caller::new(
            None,
            Some(UserProfile {
                id: 1,
                username: "alice".to_string(),
            }),
        );
        let err = lobby.create_room(Some(5.0), &no_wallet).await.unwrap_err();
        assert!(matches!(
            err,
            LobbyError::IdentityUnavailable(MissingIdentity::Wallet)
        ));

        let err = lobby
            .create_room(Some(5.0), &Caller::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LobbyError::IdentityUnavailable(MissingIdentity::Profile)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_bid_checked_before_identity() {
        let lobby = lobby(Arc::new(MemoryRoomStore::new()), FairCoin);
        let err = lobby.create_room(None, &Caller::default()).await.unwrap_err();
        assert!(matches!(err, LobbyError::Validation(_)));
    }

    #[tokio::test]
    async fn test_join_resolves_and_deletes() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);

        let room_id = lobby.create_room(Some(5.0), &alice()).await.unwrap();
        let outcome = lobby.join_room(room_id, &bob()).await.unwrap();

        assert_eq!(outcome.room_id, room_id);
        assert!(["alice", "bob"].contains(&outcome.winner_username.as_str()));
        assert_eq!(outcome.payout, 10.0);
        assert!(store.is_empty());
        assert!(matches!(
            lobby.get_room(room_id).await,
            Err(LobbyError::RoomNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_coin_maps_to_seats() {
        let store = Arc::new(MemoryRoomStore::new());

        let heads = lobby(store.clone(), FixedCoin(true));
        let room_id = heads.create_room(Some(5.0), &alice()).await.unwrap();
        let outcome = heads.join_room(room_id, &bob()).await.unwrap();
        assert_eq!(outcome.winner, Seat::Creator);
        assert_eq!(outcome.winner_address, "0xA");
        assert_eq!(outcome.winner_username, "alice");

        let tails = lobby(store, FixedCoin(false));
        let room_id = tails.create_room(Some(5.0), &alice()).await.unwrap();
        let outcome = tails.join_room(room_id, &bob()).await.unwrap();
        assert_eq!(outcome.winner, Seat::Joiner);
        assert_eq!(outcome.winner_address, "0xB");
        assert_eq!(outcome.winner_username, "bob");
    }

    #[tokio::test]
    async fn test_join_missing_room() {
        let lobby = lobby(Arc::new(MemoryRoomStore::new()), FairCoin);
        let missing = RoomId::new();

        let err = lobby.join_room(missing, &bob()).await.unwrap_err();
        assert!(matches!(err, LobbyError::RoomNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_join_requires_identity() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);
        let room_id = lobby.create_room(Some(5.0), &alice()).await.unwrap();

        let no_wallet = Caller::new(
            None,
            Some(UserProfile {
                id: 2,
                username: "bob".to_string(),
            }),
        );
        let err = lobby.join_room(room_id, &no_wallet).await.unwrap_err();
        assert!(matches!(err, LobbyError::IdentityUnavailable(_)));

        let room = lobby.get_room(room_id).await.unwrap();
        assert!(room.player2_address.is_empty());
    }

    #[tokio::test]
    async fn test_join_full_room() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);
        let room_id = lobby.create_room(Some(5.0), &alice()).await.unwrap();

        // a joiner whose claim landed but who has not resolved yet
        store.claim_player2(room_id, "0xC", "carol").await.unwrap();

        let err = lobby.join_room(room_id, &bob()).await.unwrap_err();
        assert!(matches!(err, LobbyError::RoomFull(id) if id == room_id));
        assert_eq!(lobby.get_room(room_id).await.unwrap().player2_address, "0xC");
    }

    #[tokio::test]
    async fn test_identity_checked_before_room_state() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);
        let room_id = lobby.create_room(Some(5.0), &alice()).await.unwrap();
        store.claim_player2(room_id, "0xC", "carol").await.unwrap();

        let no_wallet = Caller::new(
            None,
            Some(UserProfile {
                id: 2,
                username: "bob".to_string(),
            }),
        );
        let err = lobby.join_room(room_id, &no_wallet).await.unwrap_err();
        assert!(matches!(
            err,
            LobbyError::IdentityUnavailable(MissingIdentity::Wallet)
        ));

        let err = lobby.join_room(RoomId::new(), &no_wallet).await.unwrap_err();
        assert!(matches!(err, LobbyError::IdentityUnavailable(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_have_one_winner() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = Arc::new(lobby(store.clone(), FairCoin));
        let room_id = lobby.create_room(Some(5.0), &alice()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let lobby = lobby.clone();
            handles.push(tokio::spawn(async move {
                let caller = Caller::connected(format!("0x{}", i), i, format!("player{}", i));
                lobby.join_room(room_id, &caller).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                // late joiners may find the room already resolved and gone
                Err(LobbyError::RoomFull(_)) | Err(LobbyError::RoomNotFound(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(winners, 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_stale_room_hidden_but_joinable() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);

        let stale = store
            .insert(NewRoom {
                creator_username: "alice".to_string(),
                min_bid: 3.0,
                created_at: Utc::now() - chrono::Duration::minutes(31),
                player1_address: "0xA".to_string(),
            })
            .await
            .unwrap();

        assert!(lobby.list_active_rooms().await.unwrap().is_empty());
        assert!(lobby.join_room(stale, &bob()).await.is_ok());
    }

    #[tokio::test]
    async fn test_prune_expired_rooms() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);

        let fresh = lobby.create_room(Some(1.0), &alice()).await.unwrap();
        store
            .insert(NewRoom {
                creator_username: "carol".to_string(),
                min_bid: 1.0,
                created_at: Utc::now() - chrono::Duration::hours(1),
                player1_address: "0xC".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(lobby.prune_expired_rooms().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert!(lobby.get_room(fresh).await.is_ok());
    }

    #[tokio::test]
    async fn test_self_join_policy() {
        let store = Arc::new(MemoryRoomStore::new());
        let strict = Lobby::new(
            store.clone(),
            LobbyConfig {
                allow_self_join: false,
                ..Default::default()
            },
        )
        .unwrap();

        let room_id = strict.create_room(Some(5.0), &alice()).await.unwrap();
        let err = strict.join_room(room_id, &alice()).await.unwrap_err();
        assert!(matches!(err, LobbyError::Validation(_)));
        assert!(strict.get_room(room_id).await.unwrap().player2_address.is_empty());

        let lenient = lobby(store, FixedCoin(true));
        let outcome = lenient.join_room(room_id, &alice()).await.unwrap();
        assert_eq!(outcome.winner_address, "0xA");
    }

    #[tokio::test]
    async fn test_resolve_aborts_on_vanished_room() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);
        let joiner = bob().resolve().unwrap();

        let err = lobby.resolve_room(RoomId::new(), &joiner).await.unwrap_err();
        assert!(matches!(err, LobbyError::RoomNotFound(_)));
    }

    #[tokio::test]
    async fn test_resolve_aborts_when_seat_changed_hands() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), FairCoin);
        let room_id = lobby.create_room(Some(5.0), &alice()).await.unwrap();
        store.claim_player2(room_id, "0xC", "carol").await.unwrap();

        let joiner = bob().resolve().unwrap();
        let err = lobby.resolve_room(room_id, &joiner).await.unwrap_err();
        assert!(matches!(err, LobbyError::RoomNotFound(_)));
        // untouched for its rightful claimant
        assert!(lobby.get_room(room_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_winner_distribution_is_fair() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = lobby(store.clone(), SeededCoin::new(2024));
        let trials = 2_000;

        let mut creator_wins = 0u32;
        let mut winners = HashSet::new();
        for _ in 0..trials {
            let room_id = lobby.create_room(Some(1.0), &alice()).await.unwrap();
            let outcome = lobby.join_room(room_id, &bob()).await.unwrap();
            if outcome.winner == Seat::Creator {
                creator_wins += 1;
            }
            winners.insert(outcome.winner_username);
        }

        let expected = trials as f64 / 2.0;
        let joiner_wins = trials - creator_wins;
        let chi_square = (creator_wins as f64 - expected).powi(2) / expected
            + (joiner_wins as f64 - expected).powi(2) / expected;

        assert!(chi_square < 10.828, "chi-square {}", chi_square);
        assert_eq!(winners.len(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_oversized_window_rejected() {
        let config = LobbyConfig {
            listing_window: std::time::Duration::from_secs(100_000_000_000_000),
            ..Default::default()
        };
        let err = Lobby::new(Arc::new(MemoryRoomStore::new()), config).err().unwrap();
        assert!(matches!(err, LobbyError::Core(_)));
    }

    #[tokio::test]
    async fn test_one_year_window_lists_and_prunes() {
        let store = Arc::new(MemoryRoomStore::new());
        let lobby = Lobby::new(
            store,
            LobbyConfig {
                listing_window: duel_core::config::MAX_LISTING_WINDOW,
                ..Default::default()
            },
        )
        .unwrap();

        lobby.create_room(Some(1.0), &alice()).await.unwrap();
        assert_eq!(lobby.list_active_rooms().await.unwrap().len(), 1);
        assert_eq!(lobby.prune_expired_rooms().await.unwrap(), 0);
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = LobbyConfig {
            listing_window: std::time::Duration::ZERO,
            ..Default::default()
        };
        let err = Lobby::new(Arc::new(MemoryRoomStore::new()), config).err().unwrap();
        assert!(matches!(err, LobbyError::Core(_)));
    }
}
