//! Protocol Messages
//!
//! JSON bodies for the HTTP surface. Persisted records
//! ([`GameSession`](crate::leaderboard::GameSession),
//! [`HighScore`](crate::leaderboard::HighScore),
//! [`GameStats`](crate::leaderboard::GameStats)) are returned as-is.

use serde::{Serialize, Deserialize};

use crate::game::state::{RunResult, DEFAULT_PLAYER_NAME};
use crate::leaderboard::model::ValidationError;

// =============================================================================
// CLIENT -> SERVER
// =============================================================================

/// Body of `POST /api/game/session`. Missing fields default to zero.
///
/// Counts are signed so that negative values reach validation instead of
/// failing deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    /// Display name; missing means the default name
    #[serde(default)]
    pub player_name: Option<String>,
    /// Final score
    #[serde(default)]
    pub score: i64,
    /// Coins picked up
    #[serde(default)]
    pub coins_collected: i64,
    /// Distance travelled
    #[serde(default)]
    pub distance: f64,
    /// Run length in seconds
    #[serde(default)]
    pub duration: f64,
}

impl SessionRequest {
    /// Convert to a run result, rejecting negative counts.
    pub fn into_run_result(self) -> Result<RunResult, ValidationError> {
        let score = non_negative("score", self.score)?;
        let coins_collected = non_negative("coins_collected", self.coins_collected)?;

        Ok(RunResult {
            player_name: self
                .player_name
                .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string()),
            score,
            coins_collected,
            distance: self.distance,
            duration: self.duration,
        })
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ValidationError> {
    u64::try_from(value).map_err(|_| ValidationError::Negative { field })
}

/// Query of `GET /api/game/high-scores`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighScoreQuery {
    /// Maximum entries to return
    pub limit: Option<u32>,
}

// =============================================================================
// SERVER -> CLIENT
// =============================================================================

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy"
    pub status: String,
    /// Unix seconds
    pub timestamp: i64,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
}

/// Error body, `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable reason
    pub detail: String,
}

impl ErrorBody {
    /// Error body with the given detail.
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}
