//! Rookery session server.
//!
//! Hosts the WebSocket hub (`/ws`) and the game HTTP API (`/api/...`).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin rookery-server
//! cargo run --bin rookery-server -- --host 0.0.0.0 --port 3000
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use rookery_server::{
    infrastructure::{
        cache::InMemoryGameCache,
        hub::{Hub, HubConfig},
        repository::InMemoryGameRepository,
        rule_engine::ChessRuleEngine,
    },
    ui::Server,
    usecase::{GameSessionConfig, GameSessionService},
};
use rookery_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "rookery-server")]
#[command(about = "Multiplayer chess session server (WebSocket hub + game API)", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Outbound queue size per connection; a client whose queue fills up is dropped
    #[arg(long, default_value = "256")]
    client_queue_capacity: usize,

    /// Lifetime of cached game sessions, in seconds
    #[arg(long, default_value = "3600")]
    cache_ttl_secs: u64,

    /// Time control of new games, in seconds per side
    #[arg(long, default_value = "600")]
    time_control_secs: u32,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    // Initialize dependencies in order:
    // 1. Store, cache and rule engine
    // 2. Game Session Service
    // 3. Hub
    // 4. Server

    // 1. Collaborators (in-memory store and cache)
    // Player profiles belong to the upstream identity service; until one is
    // wired into `GameRepository::get_player`, game views show each player's
    // user id as the username (`PlayerProfile::anonymous`).
    let repository = Arc::new(InMemoryGameRepository::new());
    let cache = Arc::new(InMemoryGameCache::new());
    let rule_engine = Arc::new(ChessRuleEngine::new());

    // 2. Game Session Service
    let game_service = Arc::new(GameSessionService::new(
        repository,
        cache.clone(),
        rule_engine,
        Arc::new(SystemClock),
        GameSessionConfig {
            cache_ttl: Duration::from_secs(args.cache_ttl_secs),
            default_time_control_secs: args.time_control_secs,
        },
    ));

    // 3. Hub
    let (hub, _hub_task) = Hub::start(HubConfig {
        client_queue_capacity: args.client_queue_capacity,
    });

    // 4. Create and run the server
    let server = Server::new(hub, game_service).with_game_events(cache.subscribe());
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
