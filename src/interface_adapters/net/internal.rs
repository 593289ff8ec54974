use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_lobby_serializer;
use crate::interface_adapters::state::AppState;
use crate::use_cases::LobbyError;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, serde::Deserialize)]
pub struct LobbyInitRequest {
    // Lobby id chosen by the caller.
    lobby_id: String,
    // Difficulty row to start the match with; omitted leaves the lobby Idle.
    #[serde(default)]
    difficulty_index: Option<i64>,
}

#[derive(Debug, serde::Serialize)]
struct LobbyInitResponse {
    // The lobby id that was created.
    lobby_id: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

pub async fn create_lobby_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LobbyInitRequest>,
) -> impl IntoResponse {
    // Ensure we have a lobby id to create.
    let lobby_id = payload.lobby_id.trim().to_string();
    if lobby_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "lobby_id is required");
    }

    // Created lobbies are not pinned and are removed after their match ends or when left idle.
    match state
        .lobby_registry
        .create_lobby(lobby_id.clone(), payload.difficulty_index, false)
        .await
    {
        Ok(lobby) => {
            // Create serializers so clients can subscribe immediately.
            spawn_lobby_serializer(&lobby);
            state
                .lobby_registry
                .clone()
                .spawn_lobby_reaper(lobby.lobby_id.clone(), lobby.phase_tx.subscribe());
            (StatusCode::CREATED, Json(LobbyInitResponse { lobby_id })).into_response()
        }
        Err(LobbyError::AlreadyExists) => {
            error_response(StatusCode::CONFLICT, "lobby already exists")
        }
        Err(LobbyError::InvalidConfig(err)) => {
            warn!(%lobby_id, error = %err, "lobby configuration rejected");
            error_response(StatusCode::BAD_REQUEST, err.to_string())
        }
    }
}

pub async fn get_lobby_handler(
    State(state): State<Arc<AppState>>,
    Path(lobby_id): Path<String>,
) -> impl IntoResponse {
    match state.lobby_registry.get_lobby(&lobby_id).await {
        Some(lobby) => (StatusCode::OK, Json(lobby.snapshot())).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "lobby not found"),
    }
}
