// At-most-once resolution of collect requests.

use super::events::ChangeFeed;
use super::machine::MatchStateMachine;
use super::registry::EntityRegistry;
use super::state::EntityId;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    NotFound,
    AlreadyCollected,
    /// The match is not accepting collections (not started yet or already over).
    MatchNotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl CollectOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CollectOutcome::Accepted)
    }
}

/// Resolves one collect request against the registry and the match.
///
/// Exclusive borrows make claim, destroy and count a single indivisible step; the
/// caller serializes concurrent requests by funnelling them through one owner.
/// Rejections are final and never retried here.
pub fn request_collect(
    machine: &mut MatchStateMachine,
    registry: &mut EntityRegistry,
    feed: &mut ChangeFeed,
    entity_id: EntityId,
) -> CollectOutcome {
    if !machine.is_running() {
        debug!(entity_id, phase = ?machine.phase(), "collect rejected: match not running");
        return CollectOutcome::Rejected(RejectReason::MatchNotRunning);
    }

    if let Err(reason) = registry.claim(entity_id) {
        debug!(entity_id, ?reason, "collect rejected");
        return CollectOutcome::Rejected(reason);
    }

    registry.destroy(entity_id, feed);
    machine.on_entity_collected(feed);
    debug!(entity_id, "collect accepted");
    CollectOutcome::Accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::ServerEvent;
    use crate::domain::state::{MatchResult, MatchSettings, SessionPhase};

    fn running(index: i64) -> (MatchStateMachine, EntityRegistry, ChangeFeed) {
        let mut machine = MatchStateMachine::new(MatchSettings::default());
        let mut registry = EntityRegistry::with_seed(3, 11);
        let mut feed = ChangeFeed::new();
        machine
            .configure(index, &mut registry, &mut feed)
            .expect("configure");
        feed.drain();
        (machine, registry, feed)
    }

    #[test]
    fn when_same_entity_is_requested_twice_in_one_batch_then_exactly_one_is_accepted() {
        let (mut machine, mut registry, mut feed) = running(0);
        let id = registry.snapshot()[0].id;

        let first = request_collect(&mut machine, &mut registry, &mut feed, id);
        let second = request_collect(&mut machine, &mut registry, &mut feed, id);

        assert_eq!(first, CollectOutcome::Accepted);
        assert_eq!(
            second,
            CollectOutcome::Rejected(RejectReason::AlreadyCollected)
        );
        assert_eq!(registry.live_count(), 9);
        assert_eq!(machine.collected_count(), 1);
    }

    #[test]
    fn when_entity_is_collected_then_destroy_precedes_count_change() {
        let (mut machine, mut registry, mut feed) = running(0);
        let id = registry.snapshot()[0].id;

        request_collect(&mut machine, &mut registry, &mut feed, id);

        let events = feed.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ServerEvent::EntityDestroyed { id });
        assert!(matches!(events[1], ServerEvent::FieldChanged(_)));
    }

    #[test]
    fn when_id_is_unknown_then_request_is_not_found() {
        let (mut machine, mut registry, mut feed) = running(0);

        let outcome = request_collect(&mut machine, &mut registry, &mut feed, 10_000);

        assert_eq!(outcome, CollectOutcome::Rejected(RejectReason::NotFound));
        assert_eq!(machine.collected_count(), 0);
        assert!(feed.drain().is_empty());
    }

    #[test]
    fn when_every_item_is_collected_then_next_tick_is_a_win() {
        let (mut machine, mut registry, mut feed) = running(0);
        let ids: Vec<_> = registry.snapshot().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 10);

        for id in ids {
            assert!(request_collect(&mut machine, &mut registry, &mut feed, id).is_accepted());
        }
        assert_eq!(machine.collected_count(), 10);
        assert_eq!(machine.total_item_count(), 10);

        machine.tick(1.0, &mut feed);

        assert_eq!(machine.phase(), SessionPhase::Ended);
        assert_eq!(machine.result(), Some(MatchResult::Win));
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn when_match_has_ended_then_requests_do_not_mutate() {
        let (mut machine, mut registry, mut feed) = running(2);
        let id = registry.snapshot()[0].id;
        machine.tick(60.0, &mut feed);
        feed.drain();

        let outcome = request_collect(&mut machine, &mut registry, &mut feed, id);

        assert_eq!(
            outcome,
            CollectOutcome::Rejected(RejectReason::MatchNotRunning)
        );
        assert_eq!(registry.live_count(), 30);
        assert_eq!(machine.collected_count(), 0);
        assert!(feed.drain().is_empty());
    }

    #[test]
    fn when_match_is_idle_then_requests_are_rejected() {
        let mut machine = MatchStateMachine::new(MatchSettings::default());
        let mut registry = EntityRegistry::with_seed(3, 1);
        let mut feed = ChangeFeed::new();

        let outcome = request_collect(&mut machine, &mut registry, &mut feed, 1);

        assert_eq!(
            outcome,
            CollectOutcome::Rejected(RejectReason::MatchNotRunning)
        );
    }
}
