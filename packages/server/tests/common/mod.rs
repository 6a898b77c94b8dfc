//! In-process test server shared by the integration tests.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::StreamExt;
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
use rookery_shared::time::SystemClock;
use serde_json::Value;
use tokio::{net::TcpStream, time::timeout};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Helper struct for a server running on an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    /// Start a test server with in-memory collaborators
    pub async fn start() -> Self {
        let repository = Arc::new(InMemoryGameRepository::new());
        let cache = Arc::new(InMemoryGameCache::new());
        let game_service = Arc::new(GameSessionService::new(
            repository,
            cache.clone(),
            Arc::new(ChessRuleEngine::new()),
            Arc::new(SystemClock),
            GameSessionConfig::default(),
        ));
        let (hub, _hub_task) = Hub::start(HubConfig::default());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::new(hub, game_service).with_game_events(cache.subscribe());
        let task = tokio::spawn(server.serve(listener));

        TestServer { addr, task }
    }

    pub fn ws_url(&self, user_id: &str, username: &str) -> String {
        format!(
            "ws://{}/ws?user_id={}&username={}",
            self.addr, user_id, username
        )
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("http://{}/api{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Stop the server when the test ends
        self.task.abort();
    }
}

/// Connect and consume the `connection_established` greeting
pub async fn connect(server: &TestServer, user_id: &str, username: &str) -> (WsStream, Value) {
    let (mut ws, _) = connect_async(server.ws_url(user_id, username))
        .await
        .expect("Failed to connect");
    let greeting = recv_json(&mut ws).await.expect("No greeting");
    (ws, greeting)
}

/// Next text frame as JSON, or `None` on timeout / close
pub async fn recv_json(ws: &mut WsStream) -> Option<Value> {
    loop {
        let message = timeout(RECV_TIMEOUT, ws.next()).await.ok()??.ok()?;
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            Message::Close(_) => return None,
            _ => continue,
        }
    }
}

/// Wait briefly and assert that nothing arrives
pub async fn assert_silent(ws: &mut WsStream) {
    let next = timeout(Duration::from_millis(200), ws.next()).await;
    assert!(next.is_err(), "unexpected message: {:?}", next);
}
