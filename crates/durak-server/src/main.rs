//! Combined Axum server: serves the lobby website + Durak WebSocket game.
//!
//! # Routes
//!
//! | Method | Path   | Description                              |
//! |--------|--------|-------------------------------------------|
//! | `GET`  | `/ws`  | WebSocket upgrade for game connections     |
//! | `GET`  | `/*`   | Static site files (fallback: index.html)   |
//!
//! Set `STATIC_DIR` to point at the static site output (default: `./dist`).

mod config;
mod error;
mod lobby;
mod room;
mod ws_handler;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use durak_core::logger::{FileGameLogger, GameLogger, HandleGameLogger};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::ServerError;
use lobby::{Lobby, LobbyHandle};

#[derive(Clone)]
struct AppState {
    lobby: LobbyHandle,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let logger: Arc<dyn GameLogger> = Arc::new(HandleGameLogger::new(FileGameLogger::new(
        config.log_dir.clone(),
        |e| tracing::warn!(error = %e, "failed to write game log"),
    )));

    let lobby = Lobby::spawn(logger, config.max_players_per_room, config.afk_timeout());
    let state = AppState { lobby };

    let site = ServeDir::new(&config.static_dir)
        .not_found_service(ServeFile::new(format!("{}/index.html", config.static_dir)));

    let app = Router::new()
        .route("/ws", get(ws_route))
        .layer(CorsLayer::permissive())
        .with_state(state)
        .fallback_service(site);

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port)
        .parse()
        .map_err(|e: std::net::AddrParseError| ServerError::Bind {
            addr: format!("{}:{}", config.bind_addr, config.port),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
        })?;

    tracing::info!(%addr, static_dir = %config.static_dir, "durak server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    axum::serve(listener, app).await.map_err(ServerError::Serve)
}

/// `GET /ws` — upgrade to WebSocket and hand off to [`ws_handler::handle_socket`].
async fn ws_route(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_handler::handle_socket(socket, state.lobby))
}
