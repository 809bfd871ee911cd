//! Input Capture and Control State
//!
//! Host callbacks never touch the World State directly. They enqueue
//! [`ControlIntent`]s which the tick drains at the next frame boundary.
//! Intents whose guard fails are dropped without an error.

use std::collections::VecDeque;
use serde::{Serialize, Deserialize};

use crate::game::events::{GameEvent, GameEventData};
use crate::game::state::WorldState;
use crate::game::tick::RunConfig;

/// Maximum intents held between two ticks. Extra intents are dropped.
pub const MAX_QUEUED_INTENTS: usize = 64;

// =============================================================================
// INTENTS
// =============================================================================

/// A discrete control request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlIntent {
    /// One lane to the left
    MoveLeft,
    /// One lane to the right
    MoveRight,
    /// Leave the ground
    Jump,
    /// Slide under obstacles for a fixed time
    Slide,
    /// Begin a run (or a fresh one after the last ended)
    Start,
    /// Running -> Paused
    Pause,
    /// Paused -> Running
    Resume,
    /// Pause button: flip between Running and Paused
    TogglePause,
    /// Reset to NotStarted
    Restart,
}

impl ControlIntent {
    /// Lifecycle intents apply in any phase; the rest only while running.
    pub fn is_lifecycle(self) -> bool {
        matches!(
            self,
            ControlIntent::Start
                | ControlIntent::Pause
                | ControlIntent::Resume
                | ControlIntent::TogglePause
                | ControlIntent::Restart
        )
    }
}

/// Map a keyboard `code` (DOM `KeyboardEvent.code`) to an intent.
pub fn intent_for_key(code: &str) -> Option<ControlIntent> {
    match code {
        "ArrowLeft" => Some(ControlIntent::MoveLeft),
        "ArrowRight" => Some(ControlIntent::MoveRight),
        "ArrowUp" | "Space" => Some(ControlIntent::Jump),
        "ArrowDown" => Some(ControlIntent::Slide),
        _ => None,
    }
}

/// On-screen control buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    /// Start Game
    Start,
    /// Pause / unpause
    Pause,
    /// Restart
    Restart,
}

impl Button {
    /// Intent this button enqueues.
    pub fn intent(self) -> ControlIntent {
        match self {
            Button::Start => ControlIntent::Start,
            Button::Pause => ControlIntent::TogglePause,
            Button::Restart => ControlIntent::Restart,
        }
    }
}

// =============================================================================
// INTENT QUEUE
// =============================================================================

/// FIFO of intents collected between ticks.
#[derive(Clone, Debug, Default)]
pub struct IntentQueue {
    intents: VecDeque<ControlIntent>,
}

impl IntentQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an intent. Returns false if the queue is full.
    pub fn push(&mut self, intent: ControlIntent) -> bool {
        if self.intents.len() >= MAX_QUEUED_INTENTS {
            return false;
        }
        self.intents.push_back(intent);
        true
    }

    /// Take every queued intent in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = ControlIntent> + '_ {
        self.intents.drain(..)
    }

    /// Number of queued intents.
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.intents.clear();
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// Apply one intent to the World State.
///
/// Returns whether the transition happened. Guard failures are no-ops.
pub fn apply_intent(state: &mut WorldState, intent: ControlIntent, config: &RunConfig) -> bool {
    match intent {
        ControlIntent::Start => return state.start(),
        ControlIntent::Pause => return state.pause(),
        ControlIntent::Resume => return state.resume(),
        ControlIntent::TogglePause => return state.toggle_pause(),
        ControlIntent::Restart => {
            state.restart();
            return true;
        }
        _ => {}
    }

    if !state.is_running() {
        return false;
    }

    let tick = state.ticks;
    let player = &mut state.player;

    let event = match intent {
        ControlIntent::MoveLeft | ControlIntent::MoveRight => {
            let from = player.lane;
            let target = if intent == ControlIntent::MoveLeft {
                from.left()
            } else {
                from.right()
            };
            let Some(to) = target else {
                return false;
            };
            player.lane = to;
            GameEventData::LaneChanged { from, to }
        }
        ControlIntent::Jump => {
            if !player.can_jump() {
                return false;
            }
            player.is_jumping = true;
            player.vertical_velocity = config.jump_velocity;
            GameEventData::Jumped {
                velocity: config.jump_velocity,
            }
        }
        ControlIntent::Slide => {
            if !player.can_slide() {
                return false;
            }
            player.is_sliding = true;
            player.slide_ticks_remaining = config.slide_ticks;
            GameEventData::SlideStarted {
                ticks: config.slide_ticks,
            }
        }
        _ => return false,
    };

    state.push_event(GameEvent::movement(tick, event));
    true
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{Lane, RunPhase};

    fn running_state() -> WorldState {
        let mut state = WorldState::new("tester", 3, 5.0);
        state.start();
        state
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(intent_for_key("ArrowLeft"), Some(ControlIntent::MoveLeft));
        assert_eq!(intent_for_key("ArrowRight"), Some(ControlIntent::MoveRight));
        assert_eq!(intent_for_key("ArrowUp"), Some(ControlIntent::Jump));
        assert_eq!(intent_for_key("Space"), Some(ControlIntent::Jump));
        assert_eq!(intent_for_key("ArrowDown"), Some(ControlIntent::Slide));
        assert_eq!(intent_for_key("KeyQ"), None);
    }

    #[test]
    fn test_button_mapping() {
        assert_eq!(Button::Start.intent(), ControlIntent::Start);
        assert_eq!(Button::Pause.intent(), ControlIntent::TogglePause);
        assert_eq!(Button::Restart.intent(), ControlIntent::Restart);
    }

    #[test]
    fn test_lane_bounds() {
        let config = RunConfig::default();
        let mut state = running_state();

        assert!(apply_intent(&mut state, ControlIntent::MoveLeft, &config));
        assert_eq!(state.player.lane, Lane::LEFT);
        assert!(!apply_intent(&mut state, ControlIntent::MoveLeft, &config));
        assert_eq!(state.player.lane, Lane::LEFT);

        assert!(apply_intent(&mut state, ControlIntent::MoveRight, &config));
        assert!(apply_intent(&mut state, ControlIntent::MoveRight, &config));
        assert_eq!(state.player.lane, Lane::RIGHT);
        assert!(!apply_intent(&mut state, ControlIntent::MoveRight, &config));
        assert_eq!(state.player.lane, Lane::RIGHT);
    }

    #[test]
    fn test_jump_guards() {
        let config = RunConfig::default();
        let mut state = running_state();

        assert!(apply_intent(&mut state, ControlIntent::Jump, &config));
        assert!(state.player.is_jumping);
        assert_eq!(state.player.vertical_velocity, config.jump_velocity);
        assert!(config.jump_velocity < 0.0);

        // No double jump, no slide mid-air
        assert!(!apply_intent(&mut state, ControlIntent::Jump, &config));
        assert!(!apply_intent(&mut state, ControlIntent::Slide, &config));
        assert!(!state.player.is_sliding);
    }

    #[test]
    fn test_slide_blocks_jump() {
        let config = RunConfig::default();
        let mut state = running_state();

        assert!(apply_intent(&mut state, ControlIntent::Slide, &config));
        assert!(state.player.is_sliding);
        assert_eq!(state.player.slide_ticks_remaining, config.slide_ticks);

        assert!(!apply_intent(&mut state, ControlIntent::Jump, &config));
        assert!(!state.player.is_jumping);
    }

    #[test]
    fn test_controls_ignored_unless_running() {
        let config = RunConfig::default();
        let mut state = WorldState::new("tester", 3, 5.0);

        assert!(!apply_intent(&mut state, ControlIntent::MoveLeft, &config));
        assert!(!apply_intent(&mut state, ControlIntent::Jump, &config));

        state.start();
        state.pause();
        assert!(!apply_intent(&mut state, ControlIntent::MoveLeft, &config));
        assert_eq!(state.player.lane, Lane::CENTER);
    }

    #[test]
    fn test_lifecycle_intents() {
        let config = RunConfig::default();
        let mut state = WorldState::new("tester", 3, 5.0);

        assert!(apply_intent(&mut state, ControlIntent::Start, &config));
        assert!(apply_intent(&mut state, ControlIntent::TogglePause, &config));
        assert_eq!(state.phase, RunPhase::Paused);
        assert!(apply_intent(&mut state, ControlIntent::TogglePause, &config));
        assert_eq!(state.phase, RunPhase::Running);
        assert!(apply_intent(&mut state, ControlIntent::Restart, &config));
        assert_eq!(state.phase, RunPhase::NotStarted);
    }

    #[test]
    fn test_queue_bounded_fifo() {
        let mut queue = IntentQueue::new();
        assert!(queue.push(ControlIntent::Jump));
        assert!(queue.push(ControlIntent::MoveLeft));

        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained, vec![ControlIntent::Jump, ControlIntent::MoveLeft]);
        assert!(queue.is_empty());

        for _ in 0..MAX_QUEUED_INTENTS {
            assert!(queue.push(ControlIntent::Slide));
        }
        assert!(!queue.push(ControlIntent::Jump));
        assert_eq!(queue.len(), MAX_QUEUED_INTENTS);
    }
}
