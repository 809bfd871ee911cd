//! Game State Definitions
//!
//! World State for a single run: player, scrolling entities, counters
//! and the run lifecycle (start, pause, resume, restart, end).

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use crate::core::rng::DeterministicRng;
use crate::game::collision::Aabb;
use crate::game::events::{GameEvent, GameEventData};
use crate::TICK_RATE;

// =============================================================================
// FIELD GEOMETRY
// =============================================================================

/// Width of the visible field. Entities spawn at this edge.
pub const FIELD_WIDTH: f64 = 800.0;

/// Top edge of a grounded player's box.
pub const GROUND_Y: f64 = 400.0;

/// Player's fixed position along the track.
pub const PLAYER_X: f64 = 100.0;

/// Player box width.
pub const PLAYER_WIDTH: f64 = 40.0;

/// Player box height.
pub const PLAYER_HEIGHT: f64 = 60.0;

/// Name used when the player leaves theirs blank.
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";

// =============================================================================
// LANE
// =============================================================================

/// One of the three discrete tracks, ordered left to right.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Lane(u8);

impl Lane {
    /// Number of lanes.
    pub const COUNT: u8 = 3;
    /// Lane 0
    pub const LEFT: Lane = Lane(0);
    /// Lane 1 (spawn lane)
    pub const CENTER: Lane = Lane(1);
    /// Lane 2
    pub const RIGHT: Lane = Lane(2);
    /// All lanes in order.
    pub const ALL: [Lane; 3] = [Lane::LEFT, Lane::CENTER, Lane::RIGHT];

    /// Lane from index (0-2).
    pub fn from_index(index: u8) -> Option<Lane> {
        (index < Self::COUNT).then_some(Lane(index))
    }

    /// Raw index.
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Neighbour to the left, if any.
    pub fn left(self) -> Option<Lane> {
        self.0.checked_sub(1).map(Lane)
    }

    /// Neighbour to the right, if any.
    pub fn right(self) -> Option<Lane> {
        Self::from_index(self.0 + 1)
    }
}

impl Default for Lane {
    fn default() -> Self {
        Lane::CENTER
    }
}

impl TryFrom<u8> for Lane {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Lane::from_index(value).ok_or_else(|| format!("lane index {value} out of range"))
    }
}

impl From<Lane> for u8 {
    fn from(lane: Lane) -> u8 {
        lane.0
    }
}

// =============================================================================
// PLAYER STATE
// =============================================================================

/// State of the runner.
///
/// `is_jumping` and `is_sliding` are never both set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current lane
    pub lane: Lane,

    /// Offset from ground level (negative = airborne)
    pub vertical_offset: f64,

    /// Vertical velocity (negative = upward)
    pub vertical_velocity: f64,

    /// Airborne after a jump
    pub is_jumping: bool,

    /// Sliding under obstacles
    pub is_sliding: bool,

    /// Ticks until the slide ends (0 when not sliding)
    pub slide_ticks_remaining: u32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerState {
    /// Create a grounded player in the center lane.
    pub fn new() -> Self {
        Self {
            lane: Lane::CENTER,
            vertical_offset: 0.0,
            vertical_velocity: 0.0,
            is_jumping: false,
            is_sliding: false,
            slide_ticks_remaining: 0,
        }
    }

    /// On the ground (not mid-jump).
    #[inline]
    pub fn is_grounded(&self) -> bool {
        !self.is_jumping
    }

    /// Check if player can jump.
    #[inline]
    pub fn can_jump(&self) -> bool {
        self.is_grounded() && !self.is_sliding
    }

    /// Check if player can slide.
    #[inline]
    pub fn can_slide(&self) -> bool {
        self.is_grounded()
    }

    /// Collision box in field coordinates.
    pub fn hitbox(&self) -> Aabb {
        Aabb::new(
            PLAYER_X,
            GROUND_Y + self.vertical_offset,
            PLAYER_WIDTH,
            PLAYER_HEIGHT,
        )
    }
}

// =============================================================================
// ENTITIES
// =============================================================================

/// Class of a spawned entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Ends the run on contact unless sliding
    Obstacle,
    /// Worth a score bonus
    Coin,
    /// Scrolls past; no effect on contact
    PowerUp,
}

impl EntityKind {
    /// Box size (width, height).
    pub fn size(self) -> (f64, f64) {
        match self {
            EntityKind::Obstacle => (40.0, 80.0),
            EntityKind::Coin => (20.0, 20.0),
            EntityKind::PowerUp => (30.0, 30.0),
        }
    }
}

/// A scrolling obstacle, coin, or power-up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique entity ID within the run (monotonic counter)
    pub id: u32,

    /// Entity class
    pub kind: EntityKind,

    /// Lane the entity occupies
    pub lane: Lane,

    /// Left edge along the track
    pub x: f64,

    /// Top edge
    pub y: f64,

    /// Box width
    pub width: f64,

    /// Box height
    pub height: f64,
}

impl Entity {
    /// Create an entity of `kind` at the given position.
    pub fn new(id: u32, kind: EntityKind, lane: Lane, x: f64, y: f64) -> Self {
        let (width, height) = kind.size();
        Self {
            id,
            kind,
            lane,
            x,
            y,
            width,
            height,
        }
    }

    /// Collision box in field coordinates.
    pub fn hitbox(&self) -> Aabb {
        Aabb::new(self.x, self.y, self.width, self.height)
    }

    /// Fully behind the visible field.
    #[inline]
    pub fn is_off_field(&self) -> bool {
        self.x <= -self.width
    }
}

// =============================================================================
// RUN PHASE
// =============================================================================

/// Current phase of the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// Created or restarted, waiting for start
    #[default]
    NotStarted,
    /// Active gameplay
    Running,
    /// Frozen by the player
    Paused,
    /// Terminated by a collision
    Ended,
}

// =============================================================================
// RUN RESULT
// =============================================================================

/// Immutable summary of a finished run, submitted to the leaderboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Display name
    pub player_name: String,
    /// Final score
    pub score: u64,
    /// Coins picked up
    pub coins_collected: u64,
    /// Distance travelled
    pub distance: f64,
    /// Simulated seconds
    pub duration: f64,
}

// =============================================================================
// WORLD STATE
// =============================================================================

/// Complete state of one run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldState {
    /// Display name, kept across restarts
    pub player_name: String,

    /// Current run phase
    pub phase: RunPhase,

    /// The runner
    pub player: PlayerState,

    /// Obstacles, oldest (front-most) first
    pub obstacles: VecDeque<Entity>,

    /// Coins, oldest first
    pub coins: VecDeque<Entity>,

    /// Power-ups, oldest first
    pub powerups: VecDeque<Entity>,

    /// Scroll speed (never decreases during a run)
    pub speed: f64,

    /// Speed at the start of every run
    pub base_speed: f64,

    /// Accumulated score
    pub score: u64,

    /// Coins picked up this run
    pub coins_collected: u64,

    /// Distance travelled
    pub distance: f64,

    /// Running ticks elapsed this run
    pub ticks: u64,

    /// Next entity ID (monotonic counter)
    pub next_entity_id: u32,

    /// RNG seed (for replay)
    pub rng_seed: u64,

    /// Spawn RNG state
    #[serde(skip)]
    pub rng: DeterministicRng,

    /// Events generated this tick (cleared each tick)
    #[serde(skip)]
    pub pending_events: Vec<GameEvent>,
}

impl WorldState {
    /// Create a fresh World State.
    pub fn new(player_name: impl Into<String>, rng_seed: u64, base_speed: f64) -> Self {
        Self {
            player_name: normalize_player_name(player_name.into()),
            phase: RunPhase::NotStarted,
            player: PlayerState::new(),
            obstacles: VecDeque::new(),
            coins: VecDeque::new(),
            powerups: VecDeque::new(),
            speed: base_speed,
            base_speed,
            score: 0,
            coins_collected: 0,
            distance: 0.0,
            ticks: 0,
            next_entity_id: 0,
            rng_seed,
            rng: DeterministicRng::new(rng_seed),
            pending_events: Vec::new(),
        }
    }

    /// Update the display name (blank falls back to the default).
    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = normalize_player_name(name.into());
    }

    /// Begin the run.
    ///
    /// From Ended the state is reset first. Running/Paused: no-op.
    pub fn start(&mut self) -> bool {
        match self.phase {
            RunPhase::NotStarted => {}
            RunPhase::Ended => self.reset(),
            RunPhase::Running | RunPhase::Paused => return false,
        }
        self.phase = RunPhase::Running;
        self.push_event(GameEvent::lifecycle(self.ticks, GameEventData::RunStarted));
        true
    }

    /// Running -> Paused. Touches nothing else.
    pub fn pause(&mut self) -> bool {
        if self.phase != RunPhase::Running {
            return false;
        }
        self.phase = RunPhase::Paused;
        self.push_event(GameEvent::lifecycle(self.ticks, GameEventData::RunPaused));
        true
    }

    /// Paused -> Running. Touches nothing else.
    pub fn resume(&mut self) -> bool {
        if self.phase != RunPhase::Paused {
            return false;
        }
        self.phase = RunPhase::Running;
        self.push_event(GameEvent::lifecycle(self.ticks, GameEventData::RunResumed));
        true
    }

    /// Pause if running, resume if paused.
    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            RunPhase::Running => self.pause(),
            RunPhase::Paused => self.resume(),
            RunPhase::NotStarted | RunPhase::Ended => false,
        }
    }

    /// Reinitialize everything except the player name; phase -> NotStarted.
    pub fn restart(&mut self) {
        self.reset();
        self.push_event(GameEvent::lifecycle(0, GameEventData::RunRestarted));
    }

    fn reset(&mut self) {
        self.phase = RunPhase::NotStarted;
        self.player = PlayerState::new();
        self.obstacles.clear();
        self.coins.clear();
        self.powerups.clear();
        self.speed = self.base_speed;
        self.score = 0;
        self.coins_collected = 0;
        self.distance = 0.0;
        self.ticks = 0;
        self.next_entity_id = 0;
        self.pending_events.clear();
    }

    /// Freeze the run and emit its result.
    pub fn end(&mut self) -> RunResult {
        self.phase = RunPhase::Ended;
        let result = self.run_result();
        self.push_event(GameEvent::run_ended(self.ticks, result.clone()));
        result
    }

    /// Snapshot the current counters as a Run Result.
    pub fn run_result(&self) -> RunResult {
        RunResult {
            player_name: self.player_name.clone(),
            score: self.score,
            coins_collected: self.coins_collected,
            distance: self.distance,
            duration: self.duration_secs(),
        }
    }

    /// Simulated time of this run in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.ticks as f64 / TICK_RATE as f64
    }

    /// Allocate an entity ID.
    pub fn alloc_entity_id(&mut self) -> u32 {
        let id = self.next_entity_id;
        self.next_entity_id = self.next_entity_id.wrapping_add(1);
        id
    }

    /// Entity sequence for a class.
    pub fn entities(&self, kind: EntityKind) -> &VecDeque<Entity> {
        match kind {
            EntityKind::Obstacle => &self.obstacles,
            EntityKind::Coin => &self.coins,
            EntityKind::PowerUp => &self.powerups,
        }
    }

    /// Entity sequence for a class, mutably.
    pub fn entities_mut(&mut self, kind: EntityKind) -> &mut VecDeque<Entity> {
        match kind {
            EntityKind::Obstacle => &mut self.obstacles,
            EntityKind::Coin => &mut self.coins,
            EntityKind::PowerUp => &mut self.powerups,
        }
    }

    /// Check if the run is running.
    pub fn is_running(&self) -> bool {
        matches!(self.phase, RunPhase::Running)
    }

    /// Check if the run has ended.
    pub fn is_ended(&self) -> bool {
        matches!(self.phase, RunPhase::Ended)
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

fn normalize_player_name(name: String) -> String {
    if name.trim().is_empty() {
        DEFAULT_PLAYER_NAME.to_string()
    } else {
        name
    }
}

// =============================================================================
// TESTS
// =============================================================================
