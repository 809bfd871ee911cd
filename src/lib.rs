//! # Lane Runner
//!
//! Lane-based endless runner simulation and the leaderboard service that
//! ranks finished runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        LANE RUNNER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/             - Deterministic primitives                │
//! │  └── rng.rs        - Seeded Xorshift128+ PRNG                │
//! │                                                              │
//! │  game/             - Simulation (single-threaded)            │
//! │  ├── input.rs      - Control intents and key mapping         │
//! │  ├── state.rs      - World State and run lifecycle           │
//! │  ├── tick.rs       - Per-frame simulation loop               │
//! │  ├── spawn.rs      - Spawning, scrolling, pruning            │
//! │  ├── collision.rs  - Obstacle hits and coin pickups          │
//! │  ├── events.rs     - Per-tick events                         │
//! │  └── controller.rs - Frame loop owner, run hand-off          │
//! │                                                              │
//! │  leaderboard/      - Ranking (shared, concurrent)            │
//! │  ├── model.rs      - Sessions, entries, stats, validation    │
//! │  ├── store.rs      - Memory and JSON file storage            │
//! │  └── service.rs    - Qualification and submission           │
//! │                                                              │
//! │  network/          - HTTP surface                            │
//! │  ├── server.rs     - axum router and serve loop              │
//! │  ├── protocol.rs   - Request and response bodies             │
//! │  └── submit.rs     - Fire-and-forget run submission          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reproducibility
//!
//! `game/` reads no clock and draws all randomness from the seeded PRNG.
//! The same seed and intent sequence yield the same run, tick for tick.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod leaderboard;
pub mod network;

// Re-export commonly used types
pub use core::rng::DeterministicRng;
pub use game::state::{WorldState, PlayerState, RunResult, RunPhase, Lane};
pub use game::tick::{tick, RunConfig, TickResult};
pub use leaderboard::{RankingService, RunStore, MemoryStore, JsonFileStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;
