//! Entity Spawning and Scrolling
//!
//! Each tick every entity class gets an independent Bernoulli roll.
//! Live entities per class are capped so a lucky streak cannot flood
//! the field.

use crate::game::events::GameEvent;
use crate::game::state::{Entity, EntityKind, Lane, WorldState, FIELD_WIDTH};

/// Spawn rule for one entity class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRule {
    /// Chance per tick, in [0, 1]
    pub probability: f64,
    /// Maximum live entities of this class
    pub max_live: usize,
}

/// Configuration for entity spawning.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnConfig {
    /// Obstacle rule
    pub obstacle: SpawnRule,
    /// Coin rule
    pub coin: SpawnRule,
    /// Power-up rule
    pub powerup: SpawnRule,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            obstacle: SpawnRule { probability: 0.02, max_live: 12 },
            coin: SpawnRule { probability: 0.03, max_live: 16 },
            powerup: SpawnRule { probability: 0.005, max_live: 4 },
        }
    }
}

impl SpawnConfig {
    /// Rule for a class.
    pub fn rule(&self, kind: EntityKind) -> SpawnRule {
        match kind {
            EntityKind::Obstacle => self.obstacle,
            EntityKind::Coin => self.coin,
            EntityKind::PowerUp => self.powerup,
        }
    }
}

/// Roll order within a tick.
const SPAWN_ORDER: [EntityKind; 3] = [EntityKind::Obstacle, EntityKind::Coin, EntityKind::PowerUp];

/// Roll for each class and append successful spawns at the far edge.
///
/// Returns the number of entities spawned.
pub fn maybe_spawn(state: &mut WorldState, config: &SpawnConfig) -> usize {
    let mut spawned = 0;

    for kind in SPAWN_ORDER {
        let rule = config.rule(kind);
        if !state.rng.chance(rule.probability) {
            continue;
        }
        if state.entities(kind).len() >= rule.max_live {
            continue;
        }
        spawn_entity(state, kind);
        spawned += 1;
    }

    spawned
}

/// Place one entity of `kind` at the far edge in a random lane.
pub fn spawn_entity(state: &mut WorldState, kind: EntityKind) -> u32 {
    let lane = Lane::ALL[state.rng.next_int(Lane::COUNT as u32) as usize];
    let y = match kind {
        EntityKind::Obstacle => 420.0,
        EntityKind::Coin => 350.0 + state.rng.next_unit() * 100.0,
        EntityKind::PowerUp => 370.0,
    };

    let id = state.alloc_entity_id();
    state
        .entities_mut(kind)
        .push_back(Entity::new(id, kind, lane, FIELD_WIDTH, y));
    state.push_event(GameEvent::entity_spawned(state.ticks, id, kind, lane));
    id
}

/// Scroll every entity toward the player and drop those fully off-field.
///
/// Entities move in lockstep, so the oldest is always the left-most and
/// pruning only inspects the front.
pub fn advance_entities(state: &mut WorldState) -> usize {
    let speed = state.speed;
    let mut pruned = 0;

    for kind in SPAWN_ORDER {
        let entities = state.entities_mut(kind);
        for entity in entities.iter_mut() {
            entity.x -= speed;
        }
        while entities.front().is_some_and(Entity::is_off_field) {
            entities.pop_front();
            pruned += 1;
        }
    }

    pruned
}
