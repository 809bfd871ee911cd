//! Leaderboard Module
//!
//! Persistence and ranking of finished runs.
//!
//! - `model`: Sessions, leaderboard entries, aggregates, validation
//! - `store`: Storage trait with memory and JSON file backends
//! - `service`: Qualification, atomic submission, queries

pub mod model;
pub mod store;
pub mod service;

pub use model::{GameSession, GameStats, HighScore, NewHighScore, SubmittedRun, ValidationError};
pub use store::{JsonFileStore, MemoryStore, RunStore, StorageError};
pub use service::{LeaderboardError, RankingService};
