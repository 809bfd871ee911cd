//! Core primitives.
//!
//! Reproducible randomness shared by the simulation.

pub mod rng;

// Re-export core types
pub use rng::DeterministicRng;
