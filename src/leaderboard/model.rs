//! Leaderboard Records
//!
//! Persisted shapes for game sessions (every finished run) and
//! leaderboard entries (runs that qualified), plus run validation.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::state::{RunResult, DEFAULT_PLAYER_NAME};

/// Longest accepted player name, in characters.
pub const MAX_PLAYER_NAME_CHARS: usize = 100;

/// Ranked slots a run must fall within to become a leaderboard entry.
pub const HIGH_SCORE_SLOTS: usize = 10;

/// Run result rejected before persistence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Name over the length limit.
    #[error("player_name must be at most {max} characters (got {len})")]
    NameTooLong {
        /// Length in characters
        len: usize,
        /// Allowed maximum
        max: usize,
    },

    /// Negative count or measure.
    #[error("{field} must be non-negative")]
    Negative {
        /// Offending field
        field: &'static str,
    },

    /// NaN or infinite measure.
    #[error("{field} must be a finite number")]
    NotFinite {
        /// Offending field
        field: &'static str,
    },
}

/// Check a run result and normalize its name.
///
/// Blank names become the default name.
pub fn validate_run(mut run: RunResult) -> Result<RunResult, ValidationError> {
    run.player_name = check_name(run.player_name)?;
    check_measure("distance", run.distance)?;
    check_measure("duration", run.duration)?;
    Ok(run)
}

/// Check a leaderboard entry and normalize its name.
pub fn validate_high_score(mut entry: NewHighScore) -> Result<NewHighScore, ValidationError> {
    entry.player_name = check_name(entry.player_name)?;
    check_measure("distance", entry.distance)?;
    Ok(entry)
}

fn check_name(name: String) -> Result<String, ValidationError> {
    let len = name.chars().count();
    if len > MAX_PLAYER_NAME_CHARS {
        return Err(ValidationError::NameTooLong {
            len,
            max: MAX_PLAYER_NAME_CHARS,
        });
    }
    if name.trim().is_empty() {
        return Ok(DEFAULT_PLAYER_NAME.to_string());
    }
    Ok(name)
}

fn check_measure(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field });
    }
    Ok(())
}

/// A persisted finished run (audit trail, never pruned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    /// Store-assigned ID
    pub id: u64,
    /// Display name
    pub player_name: String,
    /// Final score
    pub score: u64,
    /// Coins picked up
    pub coins_collected: u64,
    /// Distance travelled
    pub distance: f64,
    /// Run length in seconds
    pub duration: f64,
    /// When the store accepted it
    pub created_at: DateTime<Utc>,
}

/// Leaderboard entry before the store assigns an ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHighScore {
    /// Display name
    pub player_name: String,
    /// Ranked score
    pub score: u64,
    /// Coins picked up
    pub coins_collected: u64,
    /// Distance travelled
    pub distance: f64,
}

impl From<&RunResult> for NewHighScore {
    fn from(run: &RunResult) -> Self {
        Self {
            player_name: run.player_name.clone(),
            score: run.score,
            coins_collected: run.coins_collected,
            distance: run.distance,
        }
    }
}

/// A persisted leaderboard entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScore {
    /// Store-assigned ID (insertion order)
    pub id: u64,
    /// Display name
    pub player_name: String,
    /// Ranked score
    pub score: u64,
    /// Coins picked up
    pub coins_collected: u64,
    /// Distance travelled
    pub distance: f64,
    /// When the store accepted it
    pub created_at: DateTime<Utc>,
}

/// Aggregates over every persisted session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    /// Number of sessions
    pub total_games: u64,
    /// Sum of scores
    pub total_score: u64,
    /// Sum of coins
    pub total_coins: u64,
    /// `total_score / total_games`, 0 with no sessions
    pub average_score: f64,
    /// Highest score
    pub best_score: u64,
    /// Sum of distances
    pub total_distance: f64,
}

impl GameStats {
    /// Fold sessions into aggregates.
    pub fn from_sessions<'a>(sessions: impl IntoIterator<Item = &'a GameSession>) -> Self {
        let mut stats = GameStats::default();
        for session in sessions {
            stats.total_games += 1;
            stats.total_score = stats.total_score.saturating_add(session.score);
            stats.total_coins = stats.total_coins.saturating_add(session.coins_collected);
            stats.total_distance += session.distance;
            stats.best_score = stats.best_score.max(session.score);
        }
        stats.average_score = if stats.total_games > 0 {
            stats.total_score as f64 / stats.total_games as f64
        } else {
            0.0
        };
        stats
    }
}

/// Outcome of submitting a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedRun {
    /// The audit record
    pub session: GameSession,
    /// The leaderboard entry, if the run qualified
    pub high_score: Option<HighScore>,
}
