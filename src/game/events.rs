//! Game Events
//!
//! Events generated during simulation for the host loop and run logs.

use serde::{Serialize, Deserialize};
use crate::game::state::{EntityKind, Lane, RunResult};

/// Priority for event processing order.
///
/// Lower value = processed first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Run-ending hits processed first
    ObstacleHit = 0,
    /// Then pickups
    CoinCollection = 1,
    /// Then player movement
    Movement = 2,
    /// Then spawns
    Spawn = 3,
    /// Lowest priority
    Other = 255,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Run left NotStarted (or Ended) and is now Running
    RunStarted,

    /// Run paused
    RunPaused,

    /// Run resumed
    RunResumed,

    /// World State reset to its initial values
    RunRestarted,

    /// Player moved between lanes
    LaneChanged {
        /// Lane before the move
        from: Lane,
        /// Lane after the move
        to: Lane,
    },

    /// Player left the ground
    Jumped {
        /// Initial vertical velocity
        velocity: f64,
    },

    /// Player touched down
    Landed,

    /// Slide began
    SlideStarted {
        /// Slide length in ticks
        ticks: u32,
    },

    /// Slide timer expired
    SlideEnded,

    /// Spawner placed an entity
    EntitySpawned {
        /// New entity
        entity_id: u32,
        /// Entity class
        kind: EntityKind,
        /// Spawn lane
        lane: Lane,
    },

    /// Player picked up a coin
    CoinCollected {
        /// Collected coin
        entity_id: u32,
        /// Lane of the pickup
        lane: Lane,
        /// Score after the pickup
        new_score: u64,
        /// Coin count after the pickup
        coins_collected: u64,
    },

    /// Player ran into an obstacle while not sliding
    ObstacleHit {
        /// Obstacle that was hit
        entity_id: u32,
        /// Lane of the hit
        lane: Lane,
    },

    /// Run terminated with this result
    RunEnded {
        /// Final run result
        result: RunResult,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Processing priority
    pub priority: EventPriority,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Processing order: tick, then priority.
    pub fn order_key(&self) -> (u64, EventPriority) {
        (self.tick, self.priority)
    }

    /// Create a new event.
    pub fn new(tick: u64, priority: EventPriority, data: GameEventData) -> Self {
        Self { tick, priority, data }
    }

    /// Create a lifecycle event (start, pause, resume, restart).
    pub fn lifecycle(tick: u64, data: GameEventData) -> Self {
        Self::new(tick, EventPriority::Other, data)
    }

    /// Create a movement event (lane change, jump, slide, landing).
    pub fn movement(tick: u64, data: GameEventData) -> Self {
        Self::new(tick, EventPriority::Movement, data)
    }

    /// Create entity spawned event.
    pub fn entity_spawned(tick: u64, entity_id: u32, kind: EntityKind, lane: Lane) -> Self {
        Self::new(
            tick,
            EventPriority::Spawn,
            GameEventData::EntitySpawned { entity_id, kind, lane },
        )
    }

    /// Create coin collected event.
    pub fn coin_collected(
        tick: u64,
        entity_id: u32,
        lane: Lane,
        new_score: u64,
        coins_collected: u64,
    ) -> Self {
        Self::new(
            tick,
            EventPriority::CoinCollection,
            GameEventData::CoinCollected {
                entity_id,
                lane,
                new_score,
                coins_collected,
            },
        )
    }

    /// Create obstacle hit event.
    pub fn obstacle_hit(tick: u64, entity_id: u32, lane: Lane) -> Self {
        Self::new(
            tick,
            EventPriority::ObstacleHit,
            GameEventData::ObstacleHit { entity_id, lane },
        )
    }

    /// Create run ended event.
    pub fn run_ended(tick: u64, result: RunResult) -> Self {
        Self::new(tick, EventPriority::Other, GameEventData::RunEnded { result })
    }
}
