use anyhow::Context;
use chrono::{Duration, Local};
use comfy_table::{presets::UTF8_FULL, Table};
use duel_core::{Caller, Room, RoomId, RoomPhase, UserProfile, WalletAccount};
use duel_lobby::{Lobby, Seat};

/// Builds the caller from whatever the wallet connector and identity
/// provider handed us; missing pieces are reported by the lobby.
pub fn build_caller(
    wallet: Option<String>,
    username: Option<String>,
    user_id: Option<i64>,
) -> Caller {
    Caller::new(
        wallet.map(|address| WalletAccount { address }),
        username.map(|username| UserProfile {
            id: user_id.unwrap_or_default(),
            username,
        }),
    )
}

fn parse_room_id(room_id: &str) -> anyhow::Result<RoomId> {
    room_id
        .parse()
        .with_context(|| format!("'{}' is not a valid room id", room_id))
}

fn format_expiry(room: &Room, window: Duration, fmt: &str) -> String {
    room.expires_at(window)
        .map(|at| at.with_timezone(&Local).format(fmt).to_string())
        .unwrap_or_else(|| "never".to_string())
}

pub fn rooms_table(rooms: &[Room], window: Duration) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Room ID", "Creator", "Minimum Bid", "Expires At", "Join"]);

    for room in rooms {
        let expires = format_expiry(room, window, "%H:%M:%S");
        let join = if room.is_full() {
            "Room Full".to_string()
        } else {
            format!("duel join {}", room.id)
        };

        table.add_row(vec![
            room.id.to_string(),
            room.creator_username.clone(),
            room.min_bid.to_string(),
            expires,
            join,
        ]);
    }

    table
}

pub async fn list_rooms(lobby: &Lobby) -> anyhow::Result<()> {
    let rooms = lobby.list_active_rooms().await?;

    if rooms.is_empty() {
        println!("No active rooms.");
        return Ok(());
    }

    println!("Available Rooms:");
    println!("{}", rooms_table(&rooms, lobby.config().window()));

    Ok(())
}

pub async fn create_room(
    lobby: &Lobby,
    caller: &Caller,
    min_bid: Option<f64>,
) -> anyhow::Result<()> {
    let room_id = lobby.create_room(min_bid, caller).await?;
    let minutes = lobby.config().window().num_minutes();

    println!("Room created!");
    println!("Room ID: {}", room_id);
    println!("Listed for the next {} minutes.", minutes);
    println!();
    println!("Share this command with your opponent:");
    println!("duel join {}", room_id);

    Ok(())
}

pub async fn join_room(lobby: &Lobby, caller: &Caller, room_id: &str) -> anyhow::Result<()> {
    let room_id = parse_room_id(room_id)?;
    let outcome = lobby.join_room(room_id, caller).await?;

    let seat = match outcome.winner {
        Seat::Creator => "room creator",
        Seat::Joiner => "you",
    };

    println!("Joined room {} successfully!", room_id);
    println!(
        "Coin flip complete! The winner is {} ({})",
        outcome.winner_username, seat
    );
    println!(
        "Payout of {} to {} awaits settlement.",
        outcome.payout, outcome.winner_address
    );
    println!("Room closed.");

    Ok(())
}

pub async fn show_room_status(lobby: &Lobby, room_id: &str) -> anyhow::Result<()> {
    let room = lobby.get_room(parse_room_id(room_id)?).await?;
    let window = lobby.config().window();
    let listed = room.is_active(chrono::Utc::now(), window);

    println!("Room Status: {}", room.id);
    println!("═══════════════════════════════════");
    println!(
        "State: {}",
        match room.phase() {
            RoomPhase::Open => "Open",
            RoomPhase::Matched => "Matched",
        }
    );
    println!("Creator: {} ({})", room.creator_username, room.player1_address);
    println!("Minimum Bid: {}", room.min_bid);
    println!(
        "Created: {}",
        room.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "Listed Until: {}{}",
        format_expiry(&room, window, "%Y-%m-%d %H:%M:%S"),
        if listed { "" } else { " (expired)" }
    );
    if room.is_full() {
        println!("Opponent: {} ({})", room.player2_username, room.player2_address);
    }

    Ok(())
}

fn confirm_prune(minutes: i64) -> duel_core::Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!("Delete every room older than {} minutes?", minutes))
        .default(false)
        .interact()?;
    Ok(confirmed)
}

pub async fn prune_rooms(lobby: &Lobby, yes: bool) -> anyhow::Result<()> {
    let minutes = lobby.config().window().num_minutes();
    if !yes && !confirm_prune(minutes)? {
        println!("Nothing deleted.");
        return Ok(());
    }

    let removed = lobby.prune_expired_rooms().await?;
    println!("Deleted {} expired rooms.", removed);

    Ok(())
}
