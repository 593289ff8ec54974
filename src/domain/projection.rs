// Observer-side replica of a session, rebuilt purely from replicated changes.

use super::events::{FieldChange, ServerEvent};
use super::state::{EntityId, EntitySnapshot, MatchResult, SessionPhase, SessionSnapshot};
use std::collections::BTreeMap;

/// Read-only projection an observer keeps up to date from `ServerEvent`s.
///
/// Every event carries the new value, so applying the same event twice or
/// replaying events already covered by a snapshot leaves the projection unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionProjection {
    pub phase: Option<SessionPhase>,
    pub difficulty_index: Option<usize>,
    pub total_duration: f32,
    pub remaining_time: f32,
    pub total_item_count: u32,
    pub collected_count: u32,
    pub result: Option<MatchResult>,
    entities: BTreeMap<EntityId, EntitySnapshot>,
    // Newest world tick already reflected here, from a snapshot or an update.
    last_tick: Option<u64>,
}

impl SessionProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one change. Returns false when the change referred to an entity
    /// this observer never saw or already removed; that case is not an error.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::FieldChanged(change) => {
                match *change {
                    FieldChange::RemainingTime { new, .. } => self.remaining_time = new,
                    FieldChange::TotalDuration { new, .. } => self.total_duration = new,
                    FieldChange::TotalItemCount { new, .. } => self.total_item_count = new,
                    FieldChange::CollectedCount { new, .. } => self.collected_count = new,
                }
                true
            }
            ServerEvent::PhaseChanged { phase } => {
                self.phase = Some(*phase);
                true
            }
            ServerEvent::EntitySpawned {
                id,
                position,
                variant,
            } => {
                self.entities.insert(
                    *id,
                    EntitySnapshot {
                        id: *id,
                        position: *position,
                        variant: *variant,
                    },
                );
                true
            }
            ServerEvent::EntityDestroyed { id } => self.entities.remove(id).is_some(),
            ServerEvent::MatchEnded { result } => {
                // The authoritative side ends a match once; keep the first result seen.
                if self.result.is_none() {
                    self.result = Some(*result);
                }
                self.phase = Some(SessionPhase::Ended);
                true
            }
        }
    }

    /// Applies every change of one world update.
    ///
    /// Updates at or before the newest tick already seen are skipped, so updates
    /// queued before a snapshot cannot roll state back. Returns false when skipped.
    pub fn apply_update(&mut self, tick: u64, events: &[ServerEvent]) -> bool {
        if self.last_tick.is_some_and(|last| tick <= last) {
            return false;
        }
        for event in events {
            self.apply(event);
        }
        self.last_tick = Some(tick);
        true
    }

    /// Replaces local state with an authoritative snapshot.
    pub fn apply_snapshot(&mut self, snapshot: &SessionSnapshot) {
        self.last_tick = Some(snapshot.tick);
        self.phase = Some(snapshot.phase);
        self.difficulty_index = snapshot.difficulty_index;
        self.total_duration = snapshot.total_duration;
        self.remaining_time = snapshot.remaining_time;
        self.total_item_count = snapshot.total_item_count;
        self.collected_count = snapshot.collected_count;
        self.result = snapshot.result;
        self.entities = snapshot
            .entities
            .iter()
            .map(|e| (e.id, e.clone()))
            .collect();
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Fraction of the match time left, for radial timers.
    pub fn timer_fill(&self) -> f32 {
        if self.total_duration > 0.0 {
            (self.remaining_time / self.total_duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Remaining time formatted as `MM:SS`.
    pub fn timer_label(&self) -> String {
        let secs = self.remaining_time.max(0.0);
        let minutes = (secs / 60.0).floor() as u32;
        let seconds = (secs % 60.0).floor() as u32;
        format!("{minutes:02}:{seconds:02}")
    }
}
