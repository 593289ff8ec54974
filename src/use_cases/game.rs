use super::session::GameSession;
use super::types::{GameEvent, WorldUpdate};
use crate::domain::{SessionPhase, SessionSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::{debug, info};

/// Authoritative loop for one match.
///
/// Owns the session outright. Each fixed tick drains queued intents in arrival
/// order, advances the clock, then publishes whatever changed as one update.
pub async fn world_task(
    mut session: GameSession,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    phase_tx: watch::Sender<SessionPhase>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    let mut tick: u64 = 0;
    let dt = tick_interval.as_secs_f32();

    // Changes committed before the loop started (e.g. configure at lobby creation).
    snapshot_tx.send_replace(session.snapshot());
    publish_step(&mut session, tick, &world_tx, &snapshot_tx, &phase_tx);

    let mut interval = tokio::time::interval(tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                // Exit cleanly when the lobby is removed.
                break;
            }
            _ = interval.tick() => {}
        }

        let mut disconnected = false;
        loop {
            match input_rx.try_recv() {
                Ok(GameEvent::Intent {
                    player_id,
                    intent,
                    reply,
                }) => {
                    let outcome = session.apply(&intent);
                    debug!(player_id, ?intent, ?outcome, "intent processed");
                    if let Some(reply) = reply {
                        // The requester may have gone away; the outcome stands regardless.
                        let _ = reply.send(outcome);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        session.tick(dt);
        tick += 1;
        publish_step(&mut session, tick, &world_tx, &snapshot_tx, &phase_tx);

        if disconnected {
            info!(tick, "input channel closed; world task exiting");
            break;
        }
    }
}

fn publish_step(
    session: &mut GameSession,
    tick: u64,
    world_tx: &broadcast::Sender<WorldUpdate>,
    snapshot_tx: &watch::Sender<SessionSnapshot>,
    phase_tx: &watch::Sender<SessionPhase>,
) {
    let events = session.drain_events();
    if events.is_empty() {
        return;
    }

    // Snapshot first so a lagging subscriber never resyncs to an older state.
    let mut snapshot = session.snapshot();
    snapshot.tick = tick;
    snapshot_tx.send_replace(snapshot);
    let phase = session.phase();
    phase_tx.send_if_modified(|current| {
        if *current == phase {
            false
        } else {
            *current = phase;
            true
        }
    });
    // No subscribers is fine; observers resync from the snapshot when they join.
    let _ = world_tx.send(WorldUpdate { tick, events });
}
