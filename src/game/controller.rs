//! Run Controller
//!
//! Single owner of a World State. Keyboard and button callbacks enqueue
//! intents; the host's frame loop calls [`RunController::frame`]. When a
//! run ends its result goes to a [`RunSink`] without waiting on it.

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::rng::DeterministicRng;
use crate::game::input::{intent_for_key, Button, ControlIntent, IntentQueue};
use crate::game::state::{EntityKind, Lane, RunPhase, RunResult, WorldState, PLAYER_X};
use crate::game::tick::{tick, RunConfig, TickResult};

/// Receives finished runs. Must not block the frame loop.
pub trait RunSink {
    /// Hand off a finished run.
    fn submit(&self, result: RunResult);
}

impl<T: RunSink + ?Sized> RunSink for Arc<T> {
    fn submit(&self, result: RunResult) {
        (**self).submit(result)
    }
}

/// Drives one player's runs.
pub struct RunController<S: RunSink> {
    /// Identifier for log correlation
    id: Uuid,
    state: WorldState,
    intents: IntentQueue,
    config: RunConfig,
    sink: S,
    runs_completed: u32,
}

impl<S: RunSink> RunController<S> {
    /// Create a controller with a seeded World State.
    pub fn new(player_name: impl Into<String>, rng_seed: u64, config: RunConfig, sink: S) -> Self {
        let state = config.new_world(player_name, rng_seed);
        Self {
            id: Uuid::new_v4(),
            state,
            intents: IntentQueue::new(),
            config,
            sink,
            runs_completed: 0,
        }
    }

    /// Create a controller seeded from fresh entropy.
    pub fn with_random_seed(player_name: impl Into<String>, config: RunConfig, sink: S) -> Self {
        let seed = DeterministicRng::from_entropy().next_u64();
        Self::new(player_name, seed, config, sink)
    }

    /// Queue an intent for the next frame.
    pub fn push_intent(&mut self, intent: ControlIntent) -> bool {
        let queued = self.intents.push(intent);
        if !queued {
            debug!(controller = %self.id, ?intent, "Intent queue full, dropping");
        }
        queued
    }

    /// Keyboard callback. Unmapped keys are ignored.
    pub fn key_down(&mut self, code: &str) -> bool {
        match intent_for_key(code) {
            Some(intent) => self.push_intent(intent),
            None => false,
        }
    }

    /// On-screen button callback.
    pub fn press(&mut self, button: Button) -> bool {
        self.push_intent(button.intent())
    }

    /// Rename the player (takes effect on the next result).
    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.state.set_player_name(name);
    }

    /// Advance one frame.
    pub fn frame(&mut self) -> TickResult {
        let result = tick(&mut self.state, &mut self.intents, &self.config);

        if let Some(run) = &result.result {
            self.complete(run.clone());
        }

        result
    }

    /// End the current run immediately and hand off its result.
    ///
    /// Returns `None` unless a run is Running or Paused.
    pub fn finish(&mut self) -> Option<RunResult> {
        if !matches!(self.state.phase, RunPhase::Running | RunPhase::Paused) {
            return None;
        }
        let run = self.state.end();
        self.complete(run.clone());
        Some(run)
    }

    fn complete(&mut self, run: RunResult) {
        self.runs_completed += 1;
        info!(
            controller = %self.id,
            player = %run.player_name,
            score = run.score,
            coins = run.coins_collected,
            distance = run.distance,
            "Run ended"
        );
        self.sink.submit(run);
    }

    /// Read-only view of the World State.
    pub fn state(&self) -> &WorldState {
        &self.state
    }

    /// Runs finished by this controller.
    pub fn runs_completed(&self) -> u32 {
        self.runs_completed
    }

    /// Controller identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

// =============================================================================
// AUTOPILOT
// =============================================================================

/// Simple dodging bot for headless demo runs.
///
/// Looks ahead in the current lane; switches to a clear neighbour lane,
/// otherwise jumps, otherwise slides.
#[derive(Clone, Copy, Debug)]
pub struct Autopilot {
    /// How far ahead of the player to look
    pub lookahead: f64,
}

impl Default for Autopilot {
    fn default() -> Self {
        Self { lookahead: 120.0 }
    }
}

impl Autopilot {
    /// Pick an intent for the current frame.
    pub fn decide(&self, state: &WorldState) -> Option<ControlIntent> {
        if !state.is_running() {
            return None;
        }

        let player = &state.player;
        if !self.threat_in(state, player.lane) {
            return None;
        }

        let escape = [
            (player.lane.left(), ControlIntent::MoveLeft),
            (player.lane.right(), ControlIntent::MoveRight),
        ];
        for (lane, intent) in escape {
            if lane.is_some_and(|lane| !self.threat_in(state, lane)) {
                return Some(intent);
            }
        }

        if player.can_jump() {
            Some(ControlIntent::Jump)
        } else if player.can_slide() {
            Some(ControlIntent::Slide)
        } else {
            None
        }
    }

    fn threat_in(&self, state: &WorldState, lane: Lane) -> bool {
        state.entities(EntityKind::Obstacle).iter().any(|obstacle| {
            obstacle.lane == lane
                && obstacle.x + obstacle.width > PLAYER_X
                && obstacle.x < PLAYER_X + self.lookahead
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Entity;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectSink {
        runs: Mutex<Vec<RunResult>>,
    }

    impl RunSink for CollectSink {
        fn submit(&self, result: RunResult) {
            self.runs.lock().unwrap().push(result);
        }
    }

    fn controller() -> RunController<Arc<CollectSink>> {
        RunController::new("ctl", 42, RunConfig::default(), Arc::new(CollectSink::default()))
    }

    #[test]
    fn test_intents_apply_on_next_frame() {
        let mut ctl = controller();
        ctl.press(Button::Start);
        assert_eq!(ctl.state().phase, RunPhase::NotStarted);

        ctl.frame();
        assert_eq!(ctl.state().phase, RunPhase::Running);

        ctl.key_down("ArrowLeft");
        assert_eq!(ctl.state().player.lane, Lane::CENTER);
        ctl.frame();
        assert_eq!(ctl.state().player.lane, Lane::LEFT);
    }

    #[test]
    fn test_unmapped_key_ignored() {
        let mut ctl = controller();
        assert!(!ctl.key_down("KeyZ"));
    }

    #[test]
    fn test_pause_button_toggles() {
        let mut ctl = controller();
        ctl.press(Button::Start);
        ctl.frame();
        ctl.press(Button::Pause);
        ctl.frame();
        assert_eq!(ctl.state().phase, RunPhase::Paused);
        let ticks = ctl.state().ticks;

        ctl.frame();
        assert_eq!(ctl.state().ticks, ticks);

        ctl.press(Button::Pause);
        ctl.frame();
        assert_eq!(ctl.state().phase, RunPhase::Running);
    }

    #[test]
    fn test_finished_run_submitted_once() {
        let sink = Arc::new(CollectSink::default());
        let mut ctl = RunController::new("ctl", 42, RunConfig::default(), sink.clone());
        ctl.press(Button::Start);
        ctl.frame();

        // Drop an obstacle right on the player
        let state = &mut ctl.state;
        let id = state.alloc_entity_id();
        state.obstacles.push_back(Entity::new(id, EntityKind::Obstacle, Lane::CENTER, PLAYER_X, 420.0));

        let result = ctl.frame();
        assert!(result.run_ended);
        for _ in 0..10 {
            ctl.frame();
        }

        let runs = sink.runs.lock().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].player_name, "ctl");
        assert_eq!(ctl.runs_completed(), 1);
    }

    #[test]
    fn test_restart_without_waiting_for_sink() {
        let mut ctl = controller();
        ctl.press(Button::Start);
        ctl.frame();
        ctl.state.score = 500;
        ctl.state.end();

        ctl.press(Button::Restart);
        ctl.frame();
        assert_eq!(ctl.state().score, 0);
        assert_eq!(ctl.state().phase, RunPhase::NotStarted);
        assert_eq!(ctl.state().player_name, "ctl");
    }

    #[test]
    fn test_finish_submits_current_run() {
        let sink = Arc::new(CollectSink::default());
        let mut ctl = RunController::new("ctl", 42, RunConfig::default(), sink.clone());
        assert!(ctl.finish().is_none());

        ctl.press(Button::Start);
        for _ in 0..60 {
            ctl.frame();
        }
        let run = ctl.finish().unwrap();
        assert_eq!(run.duration, 1.0);
        assert_eq!(ctl.state().phase, RunPhase::Ended);
        assert!(ctl.finish().is_none());
        assert_eq!(sink.runs.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_autopilot_dodges() {
        let mut state = WorldState::new("bot", 1, 5.0);
        state.start();
        let bot = Autopilot::default();
        assert_eq!(bot.decide(&state), None);

        let id = state.alloc_entity_id();
        state.obstacles.push_back(Entity::new(id, EntityKind::Obstacle, Lane::CENTER, PLAYER_X + 60.0, 420.0));
        assert_eq!(bot.decide(&state), Some(ControlIntent::MoveLeft));

        // Both neighbours blocked: jump
        for lane in [Lane::LEFT, Lane::RIGHT] {
            let id = state.alloc_entity_id();
            state.obstacles.push_back(Entity::new(id, EntityKind::Obstacle, lane, PLAYER_X + 60.0, 420.0));
        }
        assert_eq!(bot.decide(&state), Some(ControlIntent::Jump));
    }
}
