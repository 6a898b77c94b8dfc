//! Server execution logic.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::trace::TraceLayer;

use crate::{
    infrastructure::{cache::CachePublication, hub::Hub},
    usecase::GameSessionService,
};

use super::{
    handler::{
        create_game, get_game, health_check, join_game, list_games, list_moves, make_move,
        websocket_handler,
    },
    relay::spawn_game_event_relay,
    signal::shutdown_signal,
    state::AppState,
};

/// Session layer server: WebSocket hub endpoint plus the game HTTP API
///
/// # Example
///
/// ```ignore
/// let server = Server::new(hub, game_service).with_game_events(cache.subscribe());
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// Connection Hub（接続とルームの管理）
    hub: Hub,
    /// Game Session Service（対局のユースケース）
    game_service: Arc<GameSessionService>,
    /// 対局イベントの購読（あれば game:{id} ルームへ中継する）
    game_events: Option<broadcast::Receiver<CachePublication>>,
}

impl Server {
    pub fn new(hub: Hub, game_service: Arc<GameSessionService>) -> Self {
        Self {
            hub,
            game_service,
            game_events: None,
        }
    }

    /// Relay published game events into the hub rooms of the same name.
    pub fn with_game_events(mut self, events: broadcast::Receiver<CachePublication>) -> Self {
        self.game_events = Some(events);
        self
    }

    fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            hub: self.hub.clone(),
            game_service: self.game_service.clone(),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route(
                "/api/arenas/{arena_id}/games",
                get(list_games).post(create_game),
            )
            .route("/api/games/{game_id}", get(get_game))
            .route("/api/games/{game_id}/join", post(join_game))
            .route(
                "/api/games/{game_id}/moves",
                get(list_moves).post(make_move),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Rookery server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener).await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Serve on an already bound listener until a shutdown signal arrives.
    pub async fn serve(mut self, listener: TcpListener) -> std::io::Result<()> {
        let relay = self
            .game_events
            .take()
            .map(|events| spawn_game_event_relay(self.hub.clone(), events));
        let app = self.router();

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(relay) = relay {
            relay.abort();
        }
        result
    }
}
