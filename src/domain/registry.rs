// Authoritative store of collectible entities.

use super::arbiter::RejectReason;
use super::events::{ChangeFeed, ServerEvent};
use super::state::{AreaBounds, CollectibleEntity, EntityId, EntitySnapshot, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

pub struct EntityRegistry {
    // Live entities keyed by id; ordered so snapshots are stable.
    live: BTreeMap<EntityId, CollectibleEntity>,
    // Ids that were collected and destroyed; lets late requests see AlreadyCollected.
    collected: HashSet<EntityId>,
    next_id: EntityId,
    variant_count: u32,
    rng: StdRng,
}

impl EntityRegistry {
    pub fn new(variant_count: u32) -> Self {
        Self::with_rng(variant_count, StdRng::from_os_rng())
    }

    /// Deterministic registry for tests and replays.
    pub fn with_seed(variant_count: u32, seed: u64) -> Self {
        Self::with_rng(variant_count, StdRng::seed_from_u64(seed))
    }

    fn with_rng(variant_count: u32, rng: StdRng) -> Self {
        Self {
            live: BTreeMap::new(),
            collected: HashSet::new(),
            next_id: 1,
            variant_count,
            rng,
        }
    }

    /// Spawns `count` entities at uniformly random positions inside `area`.
    ///
    /// Each axis is drawn independently and overlaps are allowed. Every spawn is
    /// published before this returns.
    pub fn spawn_batch(
        &mut self,
        count: u32,
        area: AreaBounds,
        feed: &mut ChangeFeed,
    ) -> Vec<EntityId> {
        if count as f32 > area.width() * area.height() * 2.0 {
            warn!(
                count,
                width = area.width(),
                height = area.height(),
                "spawn area may be crowded"
            );
        }

        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = self.next_id;
            self.next_id += 1;

            let position = Position {
                x: self.rng.random_range(area.min_x..=area.max_x),
                y: self.rng.random_range(area.min_y..=area.max_y),
            };
            let variant = if self.variant_count == 0 {
                0
            } else {
                self.rng.random_range(0..self.variant_count)
            };

            self.live.insert(
                id,
                CollectibleEntity {
                    id,
                    position,
                    variant,
                    collected: false,
                },
            );
            feed.publish(ServerEvent::EntitySpawned {
                id,
                position,
                variant,
            });
            ids.push(id);
        }

        info!(count, "spawned collectibles");
        ids
    }

    pub fn get(&self, id: EntityId) -> Option<&CollectibleEntity> {
        self.live.get(&id)
    }

    /// Check-and-mark: flips `collected` on a live entity, or explains why it cannot.
    pub(crate) fn claim(&mut self, id: EntityId) -> Result<(), RejectReason> {
        match self.live.get_mut(&id) {
            Some(entity) if entity.collected => Err(RejectReason::AlreadyCollected),
            Some(entity) => {
                entity.collected = true;
                Ok(())
            }
            None if self.collected.contains(&id) => Err(RejectReason::AlreadyCollected),
            None => Err(RejectReason::NotFound),
        }
    }

    /// Removes an entity and announces it. Unknown ids are logged and ignored.
    pub fn destroy(&mut self, id: EntityId, feed: &mut ChangeFeed) -> bool {
        let Some(entity) = self.live.remove(&id) else {
            warn!(entity_id = id, "destroy for unknown entity ignored");
            return false;
        };
        if entity.collected {
            self.collected.insert(id);
        }
        feed.publish(ServerEvent::EntityDestroyed { id });
        true
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        self.live.values().map(EntitySnapshot::from).collect()
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("live", &self.live.len())
            .field("collected", &self.collected.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
