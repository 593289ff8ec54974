// Wire protocol DTOs and conversions for public match server messages.

use crate::domain::{CollectOutcome, EntityId, RejectReason, ServerEvent, SessionSnapshot};
use crate::use_cases::{ClientIntent, IntentOutcome, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Assigned identity for the connection after Join is accepted.
    Identity { player_id: String },
    // Full authoritative state, sent on join and after lag.
    Snapshot(SessionSnapshot),
    // Changes committed during one world tick.
    WorldUpdate(WorldUpdateDto),
    // Answer to this client's Configure.
    ConfigureResult(ConfigureResultDto),
    // Answer to this client's Collect.
    CollectResult(CollectResultDto),
    // Request could not be delivered to the world loop.
    Error { message: String },
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Initial handshake message.
    Join(JoinPayload),
    // Pick a difficulty row and start the match.
    Configure(ConfigurePayload),
    // Attempt to collect an entity the client touched.
    Collect(CollectPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurePayload {
    pub difficulty_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectPayload {
    pub entity_id: EntityId,
}

impl From<ConfigurePayload> for ClientIntent {
    fn from(payload: ConfigurePayload) -> Self {
        ClientIntent::Configure {
            difficulty_index: payload.difficulty_index,
        }
    }
}

impl From<CollectPayload> for ClientIntent {
    fn from(payload: CollectPayload) -> Self {
        ClientIntent::RequestCollect {
            entity_id: payload.entity_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldUpdateDto {
    pub tick: u64,
    pub events: Vec<ServerEvent>,
}

impl From<WorldUpdate> for WorldUpdateDto {
    fn from(update: WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            events: update.events,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigureResultDto {
    pub accepted: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectResultDto {
    pub entity_id: EntityId,
    pub accepted: bool,
    #[serde(default)]
    pub reason: Option<RejectReason>,
}

impl ServerMessage {
    /// Builds the reply a client gets for one of its intents.
    pub fn from_outcome(outcome: IntentOutcome) -> Self {
        match outcome {
            IntentOutcome::Configured => ServerMessage::ConfigureResult(ConfigureResultDto {
                accepted: true,
                error: None,
            }),
            IntentOutcome::ConfigRejected(err) => {
                ServerMessage::ConfigureResult(ConfigureResultDto {
                    accepted: false,
                    error: Some(err.to_string()),
                })
            }
            IntentOutcome::Collect { entity_id, outcome } => {
                let (accepted, reason) = match outcome {
                    CollectOutcome::Accepted => (true, None),
                    CollectOutcome::Rejected(reason) => (false, Some(reason)),
                };
                ServerMessage::CollectResult(CollectResultDto {
                    entity_id,
                    accepted,
                    reason,
                })
            }
        }
    }
}
