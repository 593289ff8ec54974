// Domain-level match entities, settings and snapshot types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Network-visible identifier of a collectible entity.
pub type EntityId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Rectangle entities are spawned in. Bounds are inclusive on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl AreaBounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    fn is_valid(&self) -> bool {
        [self.min_x, self.max_x, self.min_y, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
            // Bounds near f32::MAX can still have a span that overflows.
            && self.width().is_finite()
            && self.height().is_finite()
    }
}

impl Default for AreaBounds {
    fn default() -> Self {
        Self {
            min_x: -10.0,
            max_x: 10.0,
            min_y: -3.0,
            max_y: 3.0,
        }
    }
}

/// Lifecycle of a single match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    Configuring,
    Running,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    Win,
    Lose,
}

/// Which end condition wins when timeout and completion land on the same tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndCheckOrder {
    #[default]
    TimeoutFirst,
    CompletionFirst,
}

/// One row of the difficulty table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub time_limit_secs: f32,
    pub item_count: u32,
}

/// Match tuning shared by every session a lobby registry creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Difficulty rows indexed by the value clients pass to Configure.
    pub difficulties: Vec<Difficulty>,
    pub spawn_area: AreaBounds,
    /// Countdown spent in Configuring before the clock starts (0 starts immediately).
    pub start_delay_secs: f32,
    /// Number of cosmetic item kinds a spawned entity can be drawn as.
    pub item_variants: u32,
    pub end_check_order: EndCheckOrder,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            difficulties: vec![
                Difficulty {
                    time_limit_secs: 120.0,
                    item_count: 10,
                },
                Difficulty {
                    time_limit_secs: 90.0,
                    item_count: 20,
                },
                Difficulty {
                    time_limit_secs: 60.0,
                    item_count: 30,
                },
            ],
            spawn_area: AreaBounds::default(),
            start_delay_secs: 0.0,
            item_variants: 3,
            end_check_order: EndCheckOrder::TimeoutFirst,
        }
    }
}

/// Errors returned when match settings cannot drive a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("difficulty {index} has an invalid time limit {time_limit_secs}")]
    InvalidTimeLimit { index: usize, time_limit_secs: f32 },
    #[error("spawn area bounds are not finite or inverted")]
    InvalidSpawnArea,
    #[error("start delay {0} must be finite and non-negative")]
    InvalidStartDelay(f32),
}

impl MatchSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (index, row) in self.difficulties.iter().enumerate() {
            if !row.time_limit_secs.is_finite() || row.time_limit_secs <= 0.0 {
                return Err(SettingsError::InvalidTimeLimit {
                    index,
                    time_limit_secs: row.time_limit_secs,
                });
            }
        }
        if !self.spawn_area.is_valid() {
            return Err(SettingsError::InvalidSpawnArea);
        }
        if !self.start_delay_secs.is_finite() || self.start_delay_secs < 0.0 {
            return Err(SettingsError::InvalidStartDelay(self.start_delay_secs));
        }
        Ok(())
    }
}

/// Authoritative record of a collectible item.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectibleEntity {
    pub id: EntityId,
    pub position: Position,
    pub variant: u32,
    // Flips to true exactly once, under the arbiter.
    pub collected: bool,
}

/// Read-only view of an entity handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub position: Position,
    pub variant: u32,
}

impl From<&CollectibleEntity> for EntitySnapshot {
    fn from(e: &CollectibleEntity) -> Self {
        Self {
            id: e.id,
            position: e.position,
            variant: e.variant,
        }
    }
}

/// Full session state used for late joiners and lag recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// World tick of the last committed change this snapshot includes.
    #[serde(default)]
    pub tick: u64,
    pub phase: SessionPhase,
    pub difficulty_index: Option<usize>,
    pub total_duration: f32,
    pub remaining_time: f32,
    pub total_item_count: u32,
    pub collected_count: u32,
    pub result: Option<MatchResult>,
    /// Seconds left before Configuring turns into Running.
    pub starts_in: Option<f32>,
    /// Live entities ordered by id.
    pub entities: Vec<EntitySnapshot>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            phase: SessionPhase::Idle,
            difficulty_index: None,
            total_duration: 0.0,
            remaining_time: 0.0,
            total_item_count: 0,
            collected_count: 0,
            result: None,
            starts_in: None,
            entities: Vec::new(),
        }
    }
}
