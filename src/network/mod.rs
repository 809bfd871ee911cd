//! Network Module
//!
//! HTTP surface for the leaderboard and the hand-off from the frame loop.
//!
//! - `protocol`: Request and response bodies
//! - `server`: Router, handlers, serve loop
//! - `submit`: Fire-and-forget run submission

pub mod protocol;
pub mod server;
pub mod submit;

pub use server::{router, AppState, GameServer, ServerConfig, ServerError};
pub use submit::RunSubmitter;
