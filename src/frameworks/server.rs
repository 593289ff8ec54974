// Framework bootstrap for the match server runtime.

use crate::domain::MatchSettings;
use crate::frameworks::config;
use crate::interface_adapters::net::{
    create_lobby_handler, get_lobby_handler, spawn_lobby_serializer, ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{LobbyRegistry, LobbySettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/lobbies", post(create_lobby_handler))
        .route("/lobbies/{lobby_id}", get(get_lobby_handler))
        .with_state(state)
}

/// Serves the match server on an already bound listener with default match tuning.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    serve(listener, MatchSettings::default()).await
}

async fn serve(listener: tokio::net::TcpListener, match_settings: MatchSettings) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state(match_settings).await?;

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app(state)).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let match_settings = config::match_settings()
        .inspect_err(|e| tracing::error!(error = %e, "failed to load match config"))
        .map_err(std::io::Error::other)?;

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    serve(listener, match_settings).await
}

async fn build_state(match_settings: MatchSettings) -> Result<Arc<AppState>> {
    let tick_interval = config::tick_interval();
    tracing::debug!(
        tick_interval_ms = tick_interval.as_secs_f64() * 1000.0,
        difficulties = match_settings.difficulties.len(),
        "match settings loaded"
    );

    // Setup Lobby Registry
    // This owns the set of active lobby world tasks.
    let lobby_registry = Arc::new(LobbyRegistry::new(LobbySettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        tick_interval,
        lobby_linger: config::lobby_linger(),
        idle_timeout: config::lobby_idle_timeout(),
        match_settings,
    }));

    // The default lobby is pinned so it never gets deleted; it waits Idle for a Configure.
    let default_lobby = lobby_registry
        .create_lobby(config::DEFAULT_LOBBY_ID.to_string(), None, true)
        .await
        .map_err(|e| std::io::Error::other(format!("failed to create default lobby: {e}")))?;
    spawn_lobby_serializer(&default_lobby);
    lobby_registry.clone().spawn_lobby_reaper(
        default_lobby.lobby_id.clone(),
        default_lobby.phase_tx.subscribe(),
    );

    Ok(Arc::new(AppState {
        lobby_registry,
        default_lobby_id: default_lobby.lobby_id.clone(),
    }))
}
