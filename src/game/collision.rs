//! Collision Detection
//!
//! Axis-aligned box tests between the runner and lane entities.
//! Boxes that merely touch at an edge do not overlap.

use serde::{Serialize, Deserialize};
use crate::game::events::GameEvent;
use crate::game::state::{Entity, PlayerState, WorldState};

/// Score bonus per coin.
pub const COIN_BONUS: u64 = 10;

/// Axis-aligned bounding box (top-left origin, y grows downward).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Aabb {
    /// Create a box.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Strict overlap on all four half-planes.
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Check if the player touches an entity in the same lane.
#[inline]
pub fn player_touches(player: &PlayerState, entity: &Entity) -> bool {
    entity.lane == player.lane && player.hitbox().overlaps(&entity.hitbox())
}

/// Find the first obstacle that ends the run.
///
/// Sliding players pass through obstacles.
pub fn find_obstacle_hit(state: &WorldState) -> Option<&Entity> {
    if state.player.is_sliding {
        return None;
    }
    state
        .obstacles
        .iter()
        .find(|obstacle| player_touches(&state.player, obstacle))
}

/// Result of the per-tick collision pass.
#[derive(Debug, Default, PartialEq)]
pub struct CollisionOutcome {
    /// Obstacle that ended the run, if any
    pub hit_obstacle: Option<u32>,
    /// Coins collected this tick
    pub coins_collected: u32,
}

/// Resolve obstacle hits, then coin pickups.
///
/// Both take effect in the same tick: a coin touched on the frame the
/// run ends still counts.
pub fn resolve_collisions(state: &mut WorldState) -> CollisionOutcome {
    let mut outcome = CollisionOutcome::default();

    // 1. Obstacle check
    let hit = find_obstacle_hit(state).map(|obstacle| (obstacle.id, obstacle.lane));
    if let Some((id, lane)) = hit {
        outcome.hit_obstacle = Some(id);
        state.push_event(GameEvent::obstacle_hit(state.ticks, id, lane));
    }

    // 2. Coin check
    let player = state.player.clone();
    let mut collected = Vec::new();
    state.coins.retain(|coin| {
        if player_touches(&player, coin) {
            collected.push((coin.id, coin.lane));
            false
        } else {
            true
        }
    });

    for (id, lane) in collected {
        state.coins_collected += 1;
        state.score = state.score.saturating_add(COIN_BONUS);
        outcome.coins_collected += 1;
        state.push_event(GameEvent::coin_collected(
            state.ticks,
            id,
            lane,
            state.score,
            state.coins_collected,
        ));
    }

    outcome
}
