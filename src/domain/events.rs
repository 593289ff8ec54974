// Change notifications emitted by the authoritative side and the feed that fans them out.

use super::state::{EntityId, MatchResult, Position, SessionPhase};
use serde::{Deserialize, Serialize};

/// A single replicated field update. Only emitted when the value actually changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field")]
pub enum FieldChange {
    RemainingTime { old: f32, new: f32 },
    TotalDuration { old: f32, new: f32 },
    TotalItemCount { old: u32, new: u32 },
    CollectedCount { old: u32, new: u32 },
}

/// Authoritative state change, broadcast to every observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    FieldChanged(FieldChange),
    PhaseChanged {
        phase: SessionPhase,
    },
    EntitySpawned {
        id: EntityId,
        position: Position,
        variant: u32,
    },
    EntityDestroyed {
        id: EntityId,
    },
    MatchEnded {
        result: MatchResult,
    },
}

/// Receiver of committed changes. Invoked synchronously on the authoritative side.
pub trait EventSink: Send {
    fn on_event(&mut self, event: &ServerEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&ServerEvent) + Send,
{
    fn on_event(&mut self, event: &ServerEvent) {
        self(event)
    }
}

/// Ordered fan-out of change notifications plus a journal the world loop drains.
#[derive(Default)]
pub struct ChangeFeed {
    subscribers: Vec<Box<dyn EventSink>>,
    journal: Vec<ServerEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink; sinks are called in subscription order.
    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.subscribers.push(Box::new(sink));
    }

    pub fn publish(&mut self, event: ServerEvent) {
        for sink in &mut self.subscribers {
            sink.on_event(&event);
        }
        self.journal.push(event);
    }

    /// Takes every event published since the previous drain.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        std::mem::take(&mut self.journal)
    }
}

impl std::fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("subscribers", &self.subscribers.len())
            .field("journal", &self.journal.len())
            .finish()
    }
}
