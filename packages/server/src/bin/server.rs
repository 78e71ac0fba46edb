//! Pinchat relay server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin pinchat-server
//! cargo run --bin pinchat-server -- --host 0.0.0.0 --port 3000 --snapshot-file rooms.json
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use pinchat_server::{
    config::{ServerConfig, SnapshotTarget},
    domain::ChatRooms,
    infrastructure::{message_pusher::WebSocketMessagePusher, store::open_store},
    ui::Server,
    usecase::{PersistenceStrategy, PersistenceSync, RoomCoordinator, SharedRooms},
};
use pinchat_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PersistenceMode {
    /// Save once mutations have been quiet for the save delay
    Debounced,
    /// Save every save delay regardless of activity
    Interval,
}

#[derive(Parser, Debug)]
#[command(name = "pinchat-server")]
#[command(about = "Real-time chat relay with PIN-identified rooms", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Messages kept per room
    #[arg(long, env = "PINCHAT_HISTORY_CAPACITY", default_value = "100")]
    history_capacity: usize,

    /// Seconds an empty room is kept before deletion
    #[arg(long, env = "PINCHAT_GRACE_PERIOD_SECS", default_value = "30")]
    grace_period_secs: u64,

    /// When snapshots are written
    #[arg(long, env = "PINCHAT_PERSISTENCE", value_enum, default_value = "debounced")]
    persistence: PersistenceMode,

    /// Debounce delay or save interval in milliseconds
    #[arg(long, env = "PINCHAT_SAVE_DELAY_MS", default_value = "2000")]
    save_delay_ms: u64,

    /// Keep snapshots in this JSON file
    #[arg(long, env = "PINCHAT_SNAPSHOT_FILE", conflicts_with = "snapshot_url")]
    snapshot_file: Option<PathBuf>,

    /// Keep snapshots in a document store at this URL (GET / PUT)
    #[arg(long, env = "PINCHAT_SNAPSHOT_URL")]
    snapshot_url: Option<String>,

    /// Bearer token for the snapshot URL
    #[arg(long, env = "PINCHAT_SNAPSHOT_TOKEN", requires = "snapshot_url")]
    snapshot_token: Option<String>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        let save_delay = Duration::from_millis(args.save_delay_ms);
        let persistence = match args.persistence {
            PersistenceMode::Debounced => PersistenceStrategy::Debounced(save_delay),
            PersistenceMode::Interval => PersistenceStrategy::Interval(save_delay),
        };
        let snapshot = match (args.snapshot_file, args.snapshot_url) {
            (Some(path), _) => SnapshotTarget::File(path),
            (None, Some(url)) => SnapshotTarget::Http {
                url,
                token: args.snapshot_token,
            },
            (None, None) => SnapshotTarget::Memory,
        };
        Self {
            host: args.host,
            port: args.port,
            history_capacity: args.history_capacity,
            grace_period: Duration::from_secs(args.grace_period_secs),
            persistence,
            snapshot,
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let config = ServerConfig::from(Args::parse());

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize dependencies in order:
    // 1. Room tables and snapshot store
    // 2. PersistenceSync
    // 3. MessagePusher and RoomCoordinator (restore before serving)
    // 4. Server

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 1. Create room tables and the snapshot store
    let rooms: SharedRooms = Arc::new(Mutex::new(ChatRooms::with_history_capacity(
        config.history_capacity,
    )));
    let store = open_store(&config.snapshot)?;
    tracing::info!("Snapshot store: {}", config.snapshot);

    // 2. Create PersistenceSync and start periodic saves if configured
    let persistence = Arc::new(PersistenceSync::new(
        rooms.clone(),
        store,
        clock.clone(),
        config.persistence,
    ));
    let periodic = persistence.spawn_periodic();

    // 3. Create MessagePusher and RoomCoordinator, then restore the previous snapshot
    let message_pusher = Arc::new(WebSocketMessagePusher::new());
    let coordinator = Arc::new(
        RoomCoordinator::new(rooms, message_pusher, clock)
            .with_grace_period(config.grace_period)
            .with_persistence(persistence.clone()),
    );
    coordinator.restore_from(&persistence).await;

    // 4. Run the server until shutdown, then save the final state
    let result = Server::new(coordinator).run(config.bind_addr()).await;

    if let Some(periodic) = periodic {
        periodic.abort();
    }
    match persistence.flush().await {
        Ok(()) => tracing::info!("Final snapshot saved"),
        Err(e) => tracing::error!("Failed to save final snapshot: {}", e),
    }

    result
}
