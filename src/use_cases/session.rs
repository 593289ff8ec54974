// The authoritative session aggregate owned by a single world task.

use super::types::{ClientIntent, IntentOutcome};
use crate::domain::{
    ChangeFeed, CollectOutcome, ConfigError, EntityId, EntityRegistry, EventSink,
    MatchResult, MatchSettings, MatchStateMachine, ServerEvent, SessionPhase, SessionSnapshot,
    request_collect,
};

/// Match state, entity registry and change feed for one match.
///
/// Every mutating method takes `&mut self`; whoever owns the session is the single
/// authoritative decision point and serializes concurrent requests simply by
/// processing them one at a time.
#[derive(Debug)]
pub struct GameSession {
    machine: MatchStateMachine,
    registry: EntityRegistry,
    feed: ChangeFeed,
}

impl GameSession {
    pub fn new(settings: MatchSettings) -> Self {
        let registry = EntityRegistry::new(settings.item_variants);
        Self::from_parts(settings, registry)
    }

    /// Session with a deterministic spawn sequence.
    pub fn with_seed(settings: MatchSettings, seed: u64) -> Self {
        let registry = EntityRegistry::with_seed(settings.item_variants, seed);
        Self::from_parts(settings, registry)
    }

    fn from_parts(settings: MatchSettings, registry: EntityRegistry) -> Self {
        Self {
            machine: MatchStateMachine::new(settings),
            registry,
            feed: ChangeFeed::new(),
        }
    }

    /// Registers an observer invoked synchronously on every committed change.
    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.feed.subscribe(sink);
    }

    pub fn configure(&mut self, difficulty_index: i64) -> Result<(), ConfigError> {
        self.machine
            .configure(difficulty_index, &mut self.registry, &mut self.feed)
    }

    pub fn request_collect(&mut self, entity_id: EntityId) -> CollectOutcome {
        request_collect(
            &mut self.machine,
            &mut self.registry,
            &mut self.feed,
            entity_id,
        )
    }

    pub fn tick(&mut self, dt: f32) {
        self.machine.tick(dt, &mut self.feed);
    }

    pub fn apply(&mut self, intent: &ClientIntent) -> IntentOutcome {
        match *intent {
            ClientIntent::Configure { difficulty_index } => match self.configure(difficulty_index)
            {
                Ok(()) => IntentOutcome::Configured,
                Err(err) => IntentOutcome::ConfigRejected(err),
            },
            ClientIntent::RequestCollect { entity_id } => IntentOutcome::Collect {
                entity_id,
                outcome: self.request_collect(entity_id),
            },
        }
    }

    /// Takes the changes committed since the last drain, in commit order.
    pub fn drain_events(&mut self) -> Vec<ServerEvent> {
        self.feed.drain()
    }

    /// Full state. The tick is left at 0; the world loop stamps it on publish.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tick: 0,
            phase: self.machine.phase(),
            difficulty_index: self.machine.difficulty_index(),
            total_duration: self.machine.total_duration(),
            remaining_time: self.machine.remaining_time(),
            total_item_count: self.machine.total_item_count(),
            collected_count: self.machine.collected_count(),
            result: self.machine.result(),
            starts_in: self.machine.starts_in(),
            entities: self.registry.snapshot(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.machine.result()
    }

    pub fn machine(&self) -> &MatchStateMachine {
        &self.machine
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldChange, RejectReason, SessionProjection};
    use std::sync::{Arc, Mutex};

    #[test]
    fn when_observer_subscribes_then_it_receives_each_field_change() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut session = GameSession::with_seed(MatchSettings::default(), 3);
        let sink = seen.clone();
        session.subscribe(move |event: &ServerEvent| {
            if let ServerEvent::FieldChanged(change) = event {
                sink.lock().expect("seen mutex poisoned").push(change.clone());
            }
        });

        session.configure(0).expect("configure");
        session.tick(0.5);

        let seen = seen.lock().expect("seen mutex poisoned");
        assert_eq!(
            seen.as_slice(),
            &[
                FieldChange::TotalDuration {
                    old: 0.0,
                    new: 120.0
                },
                FieldChange::RemainingTime {
                    old: 0.0,
                    new: 120.0
                },
                FieldChange::TotalItemCount { old: 0, new: 10 },
                FieldChange::RemainingTime {
                    old: 120.0,
                    new: 119.5
                },
            ]
        );
    }

    #[test]
    fn when_invalid_configure_intent_is_applied_then_outcome_is_rejected() {
        let mut session = GameSession::with_seed(MatchSettings::default(), 3);

        let outcome = session.apply(&ClientIntent::Configure {
            difficulty_index: 3,
        });

        assert_eq!(
            outcome,
            IntentOutcome::ConfigRejected(ConfigError::InvalidDifficulty {
                index: 3,
                available: 3
            })
        );
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.snapshot().entities.is_empty());
    }

    #[test]
    fn when_collect_intents_race_then_only_one_is_accepted() {
        let mut session = GameSession::with_seed(MatchSettings::default(), 3);
        session.configure(0).expect("configure");
        let id = session.snapshot().entities[0].id;
        let intent = ClientIntent::RequestCollect { entity_id: id };

        let outcomes = [session.apply(&intent), session.apply(&intent)];

        assert_eq!(
            outcomes,
            [
                IntentOutcome::Collect {
                    entity_id: id,
                    outcome: CollectOutcome::Accepted,
                },
                IntentOutcome::Collect {
                    entity_id: id,
                    outcome: CollectOutcome::Rejected(RejectReason::AlreadyCollected),
                },
            ]
        );
        assert_eq!(session.machine().collected_count(), 1);
        assert_eq!(session.registry().live_count(), 9);
    }

    #[test]
    fn when_events_are_replayed_onto_snapshot_then_projection_converges() {
        let mut session = GameSession::with_seed(MatchSettings::default(), 8);
        session.configure(2).expect("configure");
        let mut projection = SessionProjection::new();
        projection.apply_snapshot(&session.snapshot());

        // Overlapping replay: the drained events are already in the snapshot.
        for event in session.drain_events() {
            projection.apply(&event);
        }
        let ids: Vec<_> = session.snapshot().entities.iter().map(|e| e.id).take(3).collect();
        for id in ids {
            session.request_collect(id);
        }
        session.tick(1.0);
        for event in session.drain_events() {
            projection.apply(&event);
        }

        let snapshot = session.snapshot();
        assert_eq!(projection.collected_count, snapshot.collected_count);
        assert_eq!(projection.remaining_time, snapshot.remaining_time);
        assert_eq!(projection.entity_count(), snapshot.entities.len());
        assert_eq!(projection.phase, Some(snapshot.phase));
    }
}
