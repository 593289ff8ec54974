use crate::use_cases::LobbyRegistry;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    // Registry of active lobbies, each with its own world task.
    pub lobby_registry: Arc<LobbyRegistry>,
    // Lobby used when a client connects without a lobby_id.
    pub default_lobby_id: Arc<str>,
}
