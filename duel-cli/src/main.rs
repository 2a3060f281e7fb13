mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::CliConfig;
use duel_lobby::LobbyError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "duel")]
#[command(about = "Coin flip duels: open a room, let someone join, flip for the pot")]
#[command(version)]
struct Cli {
    /// Data directory for the room database and duel.json
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Connected wallet address
    #[arg(long, global = true, env = "DUEL_WALLET")]
    wallet: Option<String>,

    /// Username reported by the identity provider
    #[arg(long, global = true, env = "DUEL_USERNAME")]
    username: Option<String>,

    /// User id reported by the identity provider
    #[arg(long, global = true, env = "DUEL_USER_ID")]
    user_id: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List rooms that are still open for joining
    List,
    /// Open a new room
    Create {
        /// Minimum bid both players stake
        min_bid: Option<f64>,
    },
    /// Join a room and flip the coin
    Join {
        /// Room ID to join
        room_id: String,
    },
    /// Show a single room
    Status {
        /// Room ID
        room_id: String,
    },
    /// Delete rooms that fell out of the listing window
    Prune {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Get data directory
    let data_dir = cli.data_dir.unwrap_or_else(config::default_data_dir);

    // Ensure data directory exists
    tokio::fs::create_dir_all(&data_dir).await?;

    let config = CliConfig::load(&data_dir).await?;

    // Initialize logging
    let log_level = if cli.verbose || config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "duel={},duel_lobby={},duel_core={}",
            log_level, log_level, log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::debug!("Using data directory {}", config.data_dir.display());

    let lobby = duel_lobby::open_lobby(&config.data_dir, config.lobby.clone()).await?;
    let caller = commands::build_caller(cli.wallet, cli.username, cli.user_id);

    // Execute command
    let result = match cli.command {
        Commands::List => commands::list_rooms(&lobby).await,
        Commands::Create { min_bid } => commands::create_room(&lobby, &caller, min_bid).await,
        Commands::Join { room_id } => commands::join_room(&lobby, &caller, &room_id).await,
        Commands::Status { room_id } => commands::show_room_status(&lobby, &room_id).await,
        Commands::Prune { yes } => commands::prune_rooms(&lobby, yes).await,
    };

    if let Err(e) = result {
        match e.downcast_ref::<LobbyError>() {
            Some(LobbyError::RoomFull(room_id)) => {
                eprintln!("Error: Room {} is already full", room_id);
                eprintln!("Use 'duel list' to find an open room");
            }
            Some(LobbyError::RoomNotFound(room_id)) => {
                eprintln!("Error: Room {} not found", room_id);
                eprintln!("It may have been resolved already");
            }
            Some(LobbyError::IdentityUnavailable(missing)) => {
                eprintln!("Error: {}", missing);
                eprintln!("Pass --wallet and --username, or set DUEL_WALLET and DUEL_USERNAME");
            }
            Some(LobbyError::Validation(msg)) => {
                eprintln!("Error: {}", msg);
            }
            _ => {
                eprintln!("Error: {:#}", e);
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
