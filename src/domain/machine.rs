// Match lifecycle: Idle -> Configuring -> Running -> Ended.

use super::clock::SessionClock;
use super::events::{ChangeFeed, FieldChange, ServerEvent};
use super::registry::EntityRegistry;
use super::state::{EndCheckOrder, MatchResult, MatchSettings, SessionPhase};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reasons a Configure command is rejected. State is left untouched in every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid difficulty index {index} (table has {available} rows)")]
    InvalidDifficulty { index: i64, available: usize },
    #[error("match already started (phase {phase:?})")]
    AlreadyStarted { phase: SessionPhase },
}

#[derive(Debug)]
pub struct MatchStateMachine {
    settings: MatchSettings,
    phase: SessionPhase,
    difficulty_index: Option<usize>,
    clock: SessionClock,
    total_item_count: u32,
    collected_count: u32,
    result: Option<MatchResult>,
    // Remaining start delay while Configuring.
    starts_in: Option<f32>,
}

impl MatchStateMachine {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            phase: SessionPhase::Idle,
            difficulty_index: None,
            clock: SessionClock::default(),
            total_item_count: 0,
            collected_count: 0,
            result: None,
            starts_in: None,
        }
    }

    /// Selects a difficulty row, spawns its items and starts the match.
    ///
    /// With a zero start delay the machine passes through Configuring and lands in
    /// Running within this call; otherwise it stays Configuring until ticks consume
    /// the delay.
    pub fn configure(
        &mut self,
        index: i64,
        registry: &mut EntityRegistry,
        feed: &mut ChangeFeed,
    ) -> Result<(), ConfigError> {
        if self.phase != SessionPhase::Idle {
            let err = ConfigError::AlreadyStarted { phase: self.phase };
            warn!(index, error = %err, "configure rejected");
            return Err(err);
        }

        let available = self.settings.difficulties.len();
        let row = usize::try_from(index)
            .ok()
            .and_then(|i| self.settings.difficulties.get(i).map(|row| (i, *row)));
        let Some((row_index, row)) = row else {
            let err = ConfigError::InvalidDifficulty { index, available };
            warn!(index, error = %err, "configure rejected");
            return Err(err);
        };

        info!(
            difficulty = row_index,
            time_limit_secs = row.time_limit_secs,
            item_count = row.item_count,
            "configuring match"
        );
        self.difficulty_index = Some(row_index);
        self.set_phase(SessionPhase::Configuring, feed);

        let old_total = self.clock.total();
        let old_remaining = self.clock.remaining();
        self.clock.reset(row.time_limit_secs);
        if old_total != self.clock.total() {
            feed.publish(ServerEvent::FieldChanged(FieldChange::TotalDuration {
                old: old_total,
                new: self.clock.total(),
            }));
        }
        if old_remaining != self.clock.remaining() {
            feed.publish(ServerEvent::FieldChanged(FieldChange::RemainingTime {
                old: old_remaining,
                new: self.clock.remaining(),
            }));
        }

        let old_items = self.total_item_count;
        self.total_item_count = row.item_count;
        if old_items != self.total_item_count {
            feed.publish(ServerEvent::FieldChanged(FieldChange::TotalItemCount {
                old: old_items,
                new: self.total_item_count,
            }));
        }

        registry.spawn_batch(row.item_count, self.settings.spawn_area, feed);
        self.set_collected(0, feed);

        if self.settings.start_delay_secs > 0.0 {
            self.starts_in = Some(self.settings.start_delay_secs);
            info!(
                starts_in = self.settings.start_delay_secs,
                "match start scheduled"
            );
        } else {
            self.set_phase(SessionPhase::Running, feed);
        }
        Ok(())
    }

    /// Advances the match by one fixed step.
    ///
    /// Configuring consumes the start delay; Running counts down and resolves the
    /// match. Every other phase ignores ticks.
    pub fn tick(&mut self, dt: f32, feed: &mut ChangeFeed) {
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "ignoring invalid tick delta");
            return;
        }

        match self.phase {
            SessionPhase::Configuring => {
                let Some(starts_in) = self.starts_in else {
                    return;
                };
                let left = starts_in - dt;
                if left <= 0.0 {
                    self.starts_in = None;
                    info!("match running");
                    self.set_phase(SessionPhase::Running, feed);
                } else {
                    self.starts_in = Some(left);
                }
            }
            SessionPhase::Running => {
                let step = self.clock.advance(dt);
                if step.changed() {
                    feed.publish(ServerEvent::FieldChanged(FieldChange::RemainingTime {
                        old: step.old,
                        new: step.new,
                    }));
                }

                let timed_out = self.clock.is_expired();
                let completed =
                    self.total_item_count > 0 && self.collected_count >= self.total_item_count;
                let result = match self.settings.end_check_order {
                    EndCheckOrder::TimeoutFirst if timed_out => Some(MatchResult::Lose),
                    EndCheckOrder::TimeoutFirst if completed => Some(MatchResult::Win),
                    EndCheckOrder::CompletionFirst if completed => Some(MatchResult::Win),
                    EndCheckOrder::CompletionFirst if timed_out => Some(MatchResult::Lose),
                    _ => None,
                };
                if let Some(result) = result {
                    self.end(result, feed);
                }
            }
            SessionPhase::Idle | SessionPhase::Ended => {}
        }
    }

    /// Counts one collected entity. Only the collection arbiter calls this, once per entity.
    pub fn on_entity_collected(&mut self, feed: &mut ChangeFeed) {
        if self.phase != SessionPhase::Running {
            warn!(phase = ?self.phase, "collection outside a running match ignored");
            return;
        }
        if self.collected_count >= self.total_item_count {
            warn!(
                collected = self.collected_count,
                total = self.total_item_count,
                "collected count already at total"
            );
            return;
        }

        self.set_collected(self.collected_count + 1, feed);
        debug!(
            collected = self.collected_count,
            total = self.total_item_count,
            "collectible counted"
        );
    }

    fn end(&mut self, result: MatchResult, feed: &mut ChangeFeed) {
        if self.result.is_some() {
            return;
        }
        self.result = Some(result);
        self.set_phase(SessionPhase::Ended, feed);
        feed.publish(ServerEvent::MatchEnded { result });
        info!(
            ?result,
            collected = self.collected_count,
            total = self.total_item_count,
            remaining = self.clock.remaining(),
            "match ended"
        );
    }

    fn set_phase(&mut self, phase: SessionPhase, feed: &mut ChangeFeed) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        feed.publish(ServerEvent::PhaseChanged { phase });
    }

    fn set_collected(&mut self, value: u32, feed: &mut ChangeFeed) {
        let old = self.collected_count;
        self.collected_count = value;
        if old != value {
            feed.publish(ServerEvent::FieldChanged(FieldChange::CollectedCount {
                old,
                new: value,
            }));
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn difficulty_index(&self) -> Option<usize> {
        self.difficulty_index
    }

    pub fn total_duration(&self) -> f32 {
        self.clock.total()
    }

    pub fn remaining_time(&self) -> f32 {
        self.clock.remaining()
    }

    pub fn total_item_count(&self) -> u32 {
        self.total_item_count
    }

    pub fn collected_count(&self) -> u32 {
        self.collected_count
    }

    pub fn result(&self) -> Option<MatchResult> {
        self.result
    }

    pub fn starts_in(&self) -> Option<f32> {
        self.starts_in
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }
}
