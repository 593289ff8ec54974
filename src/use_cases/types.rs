// Use-case level inputs/outputs for the world loop.

use crate::domain::{CollectOutcome, ConfigError, EntityId, ServerEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Commands observers may ask the authoritative side to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientIntent {
    Configure { difficulty_index: i64 },
    RequestCollect { entity_id: EntityId },
}

/// Authoritative answer to a single intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntentOutcome {
    Configured,
    ConfigRejected(ConfigError),
    Collect {
        entity_id: EntityId,
        outcome: CollectOutcome,
    },
}

#[derive(Debug)]
pub enum GameEvent {
    // The reply is optional so fire-and-forget callers need no receiver.
    Intent {
        player_id: u64,
        intent: ClientIntent,
        reply: Option<oneshot::Sender<IntentOutcome>>,
    },
}

/// Every change committed during one world step.
#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub events: Vec<ServerEvent>,
}
