// Lobby orchestration for spawning and managing match worlds.

use crate::domain::{ConfigError, MatchSettings, SessionPhase, SessionSnapshot};
use crate::use_cases::game::world_task;
use crate::use_cases::session::GameSession;
use crate::use_cases::{GameEvent, WorldUpdate};
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Notify, RwLock, broadcast, mpsc, watch};
use tracing::info;

/// Shared configuration for spawning lobby worlds.
#[derive(Debug, Clone)]
pub struct LobbySettings {
    /// Capacity for inbound player intents.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates.
    pub world_broadcast_capacity: usize,
    /// Fixed tick interval for the world loop.
    pub tick_interval: Duration,
    /// How long a finished match stays reachable before its lobby is removed.
    pub lobby_linger: Duration,
    /// How long a lobby may wait unconfigured before it is removed.
    pub idle_timeout: Duration,
    /// Match tuning applied to every new session.
    pub match_settings: MatchSettings,
}

/// Errors returned by lobby registry operations.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// Lobby already exists and cannot be re-created.
    #[error("lobby already exists")]
    AlreadyExists,
    /// The requested difficulty could not configure the new match.
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// Per-lobby channels. Cloning shares the same underlying world.
#[derive(Clone)]
pub struct LobbyHandle {
    /// Identifier clients use to target this lobby.
    pub lobby_id: Arc<str>,
    /// Sender for intents into the lobby world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw world updates.
    pub world_tx: broadcast::Sender<WorldUpdate>,
    /// Broadcast sender for serialized world updates.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    /// Latest authoritative snapshot for joins and lag recovery.
    pub snapshot_tx: watch::Sender<SessionSnapshot>,
    /// Match phase, used by watchers that only care about lifecycle.
    pub phase_tx: watch::Sender<SessionPhase>,
    /// Pinned lobbies are never removed when their match ends.
    pub pinned: bool,
    shutdown: Arc<Notify>,
}

impl LobbyHandle {
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }
}

/// Thread-safe registry for active lobbies.
#[derive(Debug)]
pub struct LobbyRegistry {
    /// Global settings applied to newly created lobbies.
    settings: LobbySettings,
    /// Map of lobby id to active handle.
    lobbies: RwLock<HashMap<String, LobbyHandle>>,
}

impl LobbyRegistry {
    /// Creates a new registry with the provided settings.
    pub fn new(settings: LobbySettings) -> Self {
        Self {
            settings,
            lobbies: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &LobbySettings {
        &self.settings
    }

    /// Creates a new lobby, optionally configures its match, and spawns its world task.
    ///
    /// Configuration happens before the lobby becomes visible, so a rejected
    /// difficulty leaves no lobby behind.
    pub async fn create_lobby(
        &self,
        lobby_id: String,
        difficulty_index: Option<i64>,
        pinned: bool,
    ) -> Result<LobbyHandle, LobbyError> {
        let mut lobbies = self.lobbies.write().await;
        if lobbies.contains_key(&lobby_id) {
            return Err(LobbyError::AlreadyExists);
        }

        let mut session = GameSession::new(self.settings.match_settings.clone());
        if let Some(index) = difficulty_index {
            session.configure(index)?;
        }

        // Channel wiring for the lobby world loop.
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(self.settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<WorldUpdate>(self.settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<Utf8Bytes>(self.settings.world_broadcast_capacity);
        let (snapshot_tx, _snapshot_rx) = watch::channel(session.snapshot());
        let (phase_tx, _phase_rx) = watch::channel(session.phase());
        let shutdown = Arc::new(Notify::new());

        // Spawn the authoritative world loop for this lobby.
        tokio::spawn(world_task(
            session,
            input_rx,
            world_tx.clone(),
            snapshot_tx.clone(),
            phase_tx.clone(),
            self.settings.tick_interval,
            shutdown.clone(),
        ));

        let lobby = LobbyHandle {
            lobby_id: Arc::from(lobby_id.clone()),
            input_tx,
            world_tx,
            world_bytes_tx,
            snapshot_tx,
            phase_tx,
            pinned,
            shutdown,
        };

        info!(%lobby_id, ?difficulty_index, pinned, "lobby created");
        lobbies.insert(lobby_id, lobby.clone());
        Ok(lobby)
    }

    /// Returns a lobby handle for the provided id, if it exists.
    pub async fn get_lobby(&self, lobby_id: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(lobby_id).cloned()
    }

    /// Removes a lobby and stops its world task.
    pub async fn remove_lobby(&self, lobby_id: &str) -> bool {
        let removed = self.lobbies.write().await.remove(lobby_id);
        match removed {
            Some(lobby) => {
                lobby.shutdown.notify_one();
                info!(lobby_id, "lobby removed");
                true
            }
            None => false,
        }
    }

    /// Removes the lobby once its match has ended and the linger period passed,
    /// or once it stayed Idle for the idle timeout.
    ///
    /// Pinned lobbies are left alone.
    pub fn spawn_lobby_reaper(
        self: Arc<Self>,
        lobby_id: Arc<str>,
        mut phase_rx: watch::Receiver<SessionPhase>,
    ) {
        tokio::spawn(async move {
            let configured = tokio::time::timeout(
                self.settings.idle_timeout,
                phase_rx.wait_for(|phase| *phase != SessionPhase::Idle),
            )
            .await
            // Release the watch guard before awaiting anything else.
            .map(|changed| changed.map(|_| ()));
            match configured {
                Ok(Ok(())) => {}
                // The world task is gone; the lobby was removed elsewhere.
                Ok(Err(_)) => return,
                Err(_) => {
                    info!(%lobby_id, "lobby idle too long");
                    self.remove_unpinned(&lobby_id).await;
                    return;
                }
            }

            if phase_rx
                .wait_for(|phase| *phase == SessionPhase::Ended)
                .await
                .is_err()
            {
                return;
            }
            tokio::time::sleep(self.settings.lobby_linger).await;
            self.remove_unpinned(&lobby_id).await;
        });
    }

    async fn remove_unpinned(&self, lobby_id: &str) {
        let pinned = match self.get_lobby(lobby_id).await {
            Some(lobby) => lobby.pinned,
            None => return,
        };
        if !pinned {
            self.remove_lobby(lobby_id).await;
        }
    }
}

impl std::fmt::Debug for LobbyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LobbyHandle")
            .field("lobby_id", &self.lobby_id)
            .field("pinned", &self.pinned)
            .finish()
    }
}
