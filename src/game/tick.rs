//! Simulation Tick
//!
//! Advances one World State by one frame. Exactly one caller owns the
//! state; host callbacks only reach it through the intent queue.

use std::collections::BTreeMap;

use crate::game::collision::resolve_collisions;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::input::{apply_intent, ControlIntent, IntentQueue};
use crate::game::spawn::{advance_entities, maybe_spawn, SpawnConfig};
use crate::game::state::{RunPhase, RunResult, WorldState};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the run ended this tick
    pub run_ended: bool,
    /// Result of the run that just ended
    pub result: Option<RunResult>,
}

/// Configuration for run simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Scroll speed at the start of a run
    pub base_speed: f64,
    /// Speed added every tick
    pub speed_ramp: f64,
    /// Distance per unit of speed per tick
    pub dt_scale: f64,
    /// Added to vertical velocity every airborne tick
    pub gravity: f64,
    /// Initial vertical velocity of a jump (negative = up)
    pub jump_velocity: f64,
    /// Slide length in ticks
    pub slide_ticks: u32,
    /// Entity spawning
    pub spawn: SpawnConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_speed: 5.0,
            speed_ramp: 0.001,
            dt_scale: 0.1,
            gravity: 0.8,
            jump_velocity: -15.0,
            slide_ticks: 30, // 500 ms at 60 Hz
            spawn: SpawnConfig::default(),
        }
    }
}

impl RunConfig {
    /// Fresh World State using this configuration.
    pub fn new_world(&self, player_name: impl Into<String>, rng_seed: u64) -> WorldState {
        WorldState::new(player_name, rng_seed, self.base_speed)
    }
}

/// Run one simulation tick.
///
/// Order: intents, progress and speed, jump physics, spawn and scroll,
/// collisions (obstacles then coins), timers, end of run.
pub fn tick(state: &mut WorldState, intents: &mut IntentQueue, config: &RunConfig) -> TickResult {
    let mut result = TickResult::default();

    // 0. Apply intents queued since the last frame
    for intent in intents.drain() {
        apply_intent(state, intent, config);
    }

    // Phase-specific logic
    match state.phase {
        RunPhase::NotStarted | RunPhase::Paused | RunPhase::Ended => {
            result.events = state.take_events();
            return result;
        }
        RunPhase::Running => {}
    }

    // 1. Advance tick counter
    state.ticks += 1;

    // 2. Distance, passive score, speed ramp
    advance_progress(state, config);

    // 3. Jump physics
    update_physics(state, config);

    // 4. Spawn new entities, scroll and prune
    maybe_spawn(state, &config.spawn);
    advance_entities(state);

    // 5. Obstacles, then coins
    let outcome = resolve_collisions(state);

    // 6. Timed transitions
    update_timers(state);

    #[cfg(feature = "debug-tracing")]
    tracing::trace!(
        tick = state.ticks,
        score = state.score,
        speed = state.speed,
        lane = state.player.lane.index(),
        "tick"
    );

    // 7. End of run
    if outcome.hit_obstacle.is_some() {
        result.result = Some(state.end());
        result.run_ended = true;
    }

    result.events = state.take_events();
    result
}

/// Distance and passive score accrue with speed; speed ramps up.
fn advance_progress(state: &mut WorldState, config: &RunConfig) {
    state.distance += state.speed * config.dt_scale;
    state.score = state.score.saturating_add(state.speed.floor() as u64);
    state.speed += config.speed_ramp;
}

/// Integrate the jump arc and clamp to the ground.
fn update_physics(state: &mut WorldState, config: &RunConfig) {
    let player = &mut state.player;
    if !player.is_jumping {
        return;
    }

    player.vertical_velocity += config.gravity;
    player.vertical_offset += player.vertical_velocity;

    if player.vertical_offset >= 0.0 {
        player.vertical_offset = 0.0;
        player.vertical_velocity = 0.0;
        player.is_jumping = false;
        let tick = state.ticks;
        state.push_event(GameEvent::movement(tick, GameEventData::Landed));
    }
}

/// Count down the slide; it ends on its own regardless of input.
fn update_timers(state: &mut WorldState) {
    let player = &mut state.player;
    if !player.is_sliding {
        return;
    }

    player.slide_ticks_remaining = player.slide_ticks_remaining.saturating_sub(1);
    if player.slide_ticks_remaining == 0 {
        player.is_sliding = false;
        let tick = state.ticks;
        state.push_event(GameEvent::movement(tick, GameEventData::SlideEnded));
    }
}

/// Replay a run from recorded intents.
///
/// `intents` maps the tick index (0-based, before which they were queued)
/// to the intents delivered at that boundary. Stops early if the run ends.
pub fn replay_run(
    initial_state: WorldState,
    intents: &BTreeMap<u64, Vec<ControlIntent>>,
    tick_count: u64,
    config: &RunConfig,
) -> (WorldState, Vec<GameEvent>) {
    let mut state = initial_state;
    let mut queue = IntentQueue::new();
    let mut all_events = Vec::new();

    for t in 0..tick_count {
        if let Some(frame) = intents.get(&t) {
            for intent in frame {
                queue.push(*intent);
            }
        }

        let result = tick(&mut state, &mut queue, config);
        all_events.extend(result.events);

        if result.run_ended {
            break;
        }
    }

    (state, all_events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::spawn::SpawnRule;
    use crate::game::state::{Entity, EntityKind, Lane, GROUND_Y, PLAYER_X};
    use proptest::prelude::*;

    /// Config with no random spawns, so tests place entities by hand.
    fn quiet_config() -> RunConfig {
        let off = SpawnRule { probability: 0.0, max_live: 0 };
        RunConfig {
            spawn: SpawnConfig { obstacle: off, coin: off, powerup: off },
            ..RunConfig::default()
        }
    }

    fn running_state(config: &RunConfig) -> WorldState {
        let mut state = config.new_world("tester", 12345);
        state.start();
        state
    }

    #[test]
    fn test_tick_noop_unless_running() {
        let config = RunConfig::default();
        let mut state = config.new_world("tester", 1);
        let mut queue = IntentQueue::new();

        tick(&mut state, &mut queue, &config);
        assert_eq!(state.ticks, 0);
        assert_eq!(state.score, 0);

        state.start();
        state.pause();
        let before = (state.distance, state.score, state.speed);
        tick(&mut state, &mut queue, &config);
        assert_eq!((state.distance, state.score, state.speed), before);
        assert_eq!(state.ticks, 0);
    }

    #[test]
    fn test_first_tick_progress() {
        let config = quiet_config();
        let mut state = running_state(&config);
        let mut queue = IntentQueue::new();

        tick(&mut state, &mut queue, &config);

        assert_eq!(state.ticks, 1);
        assert!((state.distance - 0.5).abs() < 1e-9);
        assert_eq!(state.score, 5);
        assert!((state.speed - 5.001).abs() < 1e-9);
    }

    #[test]
    fn test_start_intent_runs_same_tick() {
        let config = quiet_config();
        let mut state = config.new_world("tester", 1);
        let mut queue = IntentQueue::new();
        queue.push(ControlIntent::Start);

        let result = tick(&mut state, &mut queue, &config);
        assert_eq!(state.ticks, 1);
        assert!(result
            .events
            .iter()
            .any(|e| e.data == GameEventData::RunStarted));
    }

    #[test]
    fn test_jump_arc_lands_on_ground() {
        let config = quiet_config();
        let mut state = running_state(&config);
        let mut queue = IntentQueue::new();
        queue.push(ControlIntent::Jump);

        let mut peak: f64 = 0.0;
        let mut landed_at = None;
        for t in 1..=100 {
            let result = tick(&mut state, &mut queue, &config);
            peak = peak.min(state.player.vertical_offset);
            assert!(!(state.player.is_jumping && state.player.is_sliding));
            if result.events.iter().any(|e| e.data == GameEventData::Landed) {
                landed_at = Some(t);
                break;
            }
        }

        assert!(landed_at.is_some());
        assert!(peak < -100.0);
        assert_eq!(state.player.vertical_offset, 0.0);
        assert_eq!(state.player.vertical_velocity, 0.0);
        assert!(!state.player.is_jumping);
    }

    #[test]
    fn test_slide_expires_after_duration() {
        let config = quiet_config();
        let mut state = running_state(&config);
        let mut queue = IntentQueue::new();
        queue.push(ControlIntent::Slide);

        for _ in 0..config.slide_ticks - 1 {
            tick(&mut state, &mut queue, &config);
            assert!(state.player.is_sliding);
        }
        tick(&mut state, &mut queue, &config);
        assert!(!state.player.is_sliding);
        assert_eq!(state.player.slide_ticks_remaining, 0);
    }

    #[test]
    fn test_slide_timer_frozen_while_paused() {
        let config = quiet_config();
        let mut state = running_state(&config);
        let mut queue = IntentQueue::new();
        queue.push(ControlIntent::Slide);
        tick(&mut state, &mut queue, &config);
        let remaining = state.player.slide_ticks_remaining;

        queue.push(ControlIntent::Pause);
        for _ in 0..100 {
            tick(&mut state, &mut queue, &config);
        }
        assert!(state.player.is_sliding);
        assert_eq!(state.player.slide_ticks_remaining, remaining);
    }

    #[test]
    fn test_obstacle_ends_run_same_tick() {
        let config = quiet_config();
        let mut state = running_state(&config);
        let mut queue = IntentQueue::new();
        let id = state.alloc_entity_id();
        // Scrolls onto the player this tick
        state.obstacles.push_back(Entity::new(
            id,
            EntityKind::Obstacle,
            Lane::CENTER,
            PLAYER_X + 20.0,
            420.0,
        ));

        let result = tick(&mut state, &mut queue, &config);

        assert!(result.run_ended);
        assert_eq!(state.phase, RunPhase::Ended);
        let run = result.result.unwrap();
        assert_eq!(run.score, 5);
        assert_eq!(run.player_name, "tester");

        // Frozen afterwards
        let score = state.score;
        let next = tick(&mut state, &mut queue, &config);
        assert!(!next.run_ended);
        assert_eq!(state.score, score);
    }

    #[test]
    fn test_sliding_through_obstacle_keeps_running() {
        let config = quiet_config();
        let mut state = running_state(&config);
        state.player.is_sliding = true;
        state.player.slide_ticks_remaining = 10;
        let id = state.alloc_entity_id();
        state.obstacles.push_back(Entity::new(
            id,
            EntityKind::Obstacle,
            Lane::CENTER,
            PLAYER_X,
            420.0,
        ));
        let mut queue = IntentQueue::new();

        let result = tick(&mut state, &mut queue, &config);

        assert!(!result.run_ended);
        assert_eq!(state.phase, RunPhase::Running);
    }

    #[test]
    fn test_coin_and_hit_same_tick() {
        let config = quiet_config();
        let mut state = running_state(&config);
        let obstacle = state.alloc_entity_id();
        state.obstacles.push_back(Entity::new(
            obstacle,
            EntityKind::Obstacle,
            Lane::CENTER,
            PLAYER_X + 5.0,
            420.0,
        ));
        let coin = state.alloc_entity_id();
        state.coins.push_back(Entity::new(
            coin,
            EntityKind::Coin,
            Lane::CENTER,
            PLAYER_X + 5.0,
            GROUND_Y + 10.0,
        ));
        let mut queue = IntentQueue::new();

        let result = tick(&mut state, &mut queue, &config);

        assert!(result.run_ended);
        let run = result.result.unwrap();
        assert_eq!(run.coins_collected, 1);
        assert_eq!(run.score, 5 + 10);
    }

    #[test]
    fn test_lane_change_dodges_obstacle() {
        let config = quiet_config();
        let mut state = running_state(&config);
        let id = state.alloc_entity_id();
        state.obstacles.push_back(Entity::new(
            id,
            EntityKind::Obstacle,
            Lane::CENTER,
            PLAYER_X + 5.0,
            420.0,
        ));
        let mut queue = IntentQueue::new();
        queue.push(ControlIntent::MoveRight);

        let result = tick(&mut state, &mut queue, &config);
        assert!(!result.run_ended);
        assert_eq!(state.player.lane, Lane::RIGHT);
    }

    #[test]
    fn test_restart_after_run() {
        let config = quiet_config();
        let mut state = running_state(&config);
        let mut queue = IntentQueue::new();
        for _ in 0..100 {
            tick(&mut state, &mut queue, &config);
        }
        assert_eq!(state.score, 500);
        state.end();

        queue.push(ControlIntent::Restart);
        tick(&mut state, &mut queue, &config);

        assert_eq!(state.score, 0);
        assert_eq!(state.phase, RunPhase::NotStarted);
        assert_eq!(state.player_name, "tester");
    }

    #[test]
    fn test_replay_determinism() {
        let config = RunConfig::default();
        let mut intents: BTreeMap<u64, Vec<ControlIntent>> = BTreeMap::new();
        intents.insert(0, vec![ControlIntent::Start]);
        intents.insert(40, vec![ControlIntent::Jump]);
        intents.insert(90, vec![ControlIntent::MoveLeft]);
        intents.insert(150, vec![ControlIntent::Slide]);

        let (a, events_a) = replay_run(config.new_world("a", 777), &intents, 2000, &config);
        let (b, events_b) = replay_run(config.new_world("a", 777), &intents, 2000, &config);

        assert_eq!(a.ticks, b.ticks);
        assert_eq!(a.score, b.score);
        assert_eq!(a.obstacles, b.obstacles);
        assert_eq!(events_a.len(), events_b.len());
    }

    proptest! {
        #[test]
        fn prop_counters_never_decrease(
            seed in any::<u64>(),
            moves in proptest::collection::vec(0u8..6, 1..400),
        ) {
            let config = RunConfig::default();
            let mut state = config.new_world("prop", seed);
            state.start();
            let mut queue = IntentQueue::new();

            for m in moves {
                let intent = match m {
                    0 => Some(ControlIntent::MoveLeft),
                    1 => Some(ControlIntent::MoveRight),
                    2 => Some(ControlIntent::Jump),
                    3 => Some(ControlIntent::Slide),
                    _ => None,
                };
                if let Some(intent) = intent {
                    queue.push(intent);
                }

                let before = (state.distance, state.score, state.speed, state.coins_collected);
                tick(&mut state, &mut queue, &config);

                prop_assert!(state.distance >= before.0);
                prop_assert!(state.score >= before.1);
                prop_assert!(state.speed >= before.2);
                prop_assert!(state.coins_collected >= before.3);
                prop_assert!(!(state.player.is_jumping && state.player.is_sliding));

                if state.is_ended() {
                    break;
                }
            }
        }
    }
}
