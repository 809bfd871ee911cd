//! Game Logic Module
//!
//! Lane runner simulation. Reproducible for a given seed and intent
//! sequence.
//!
//! ## Module Structure
//!
//! - `input`: Control intents, key mapping, guarded transitions
//! - `state`: World State, player, entities, run lifecycle
//! - `tick`: Per-frame simulation loop
//! - `spawn`: Entity spawning, scrolling, pruning
//! - `collision`: Box overlap, obstacle hits, coin pickups
//! - `events`: Events emitted per tick
//! - `controller`: Frame-loop owner that hands finished runs to a sink

pub mod input;
pub mod state;
pub mod tick;
pub mod spawn;
pub mod collision;
pub mod events;
pub mod controller;

// Re-export key types
pub use input::{ControlIntent, IntentQueue, Button};
pub use state::{WorldState, PlayerState, Entity, EntityKind, Lane, RunPhase, RunResult};
pub use tick::{TickResult, RunConfig};
pub use events::GameEvent;
pub use controller::{RunController, RunSink, Autopilot};
