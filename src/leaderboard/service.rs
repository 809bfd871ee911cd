//! Ranking Service
//!
//! Validates finished runs, records them as sessions, and admits the ones
//! that rank within the leaderboard slots.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};

use crate::game::state::RunResult;
use crate::leaderboard::model::{
    validate_high_score, validate_run, GameSession, GameStats, HighScore, NewHighScore, SubmittedRun,
    ValidationError, HIGH_SCORE_SLOTS,
};
use crate::leaderboard::store::{RunStore, StorageError};

/// Ranking service errors.
#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// Run rejected before touching storage
    #[error("invalid run: {0}")]
    Validation(#[from] ValidationError),

    /// Storage failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Leaderboard operations over a shared store.
#[derive(Clone)]
pub struct RankingService {
    store: Arc<dyn RunStore>,
    slots: usize,
}

impl RankingService {
    /// Service with the default number of slots.
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self::with_slots(store, HIGH_SCORE_SLOTS)
    }

    /// Service with a custom number of slots.
    pub fn with_slots(store: Arc<dyn RunStore>, slots: usize) -> Self {
        Self { store, slots }
    }

    /// Leaderboard slots.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Persist a finished run as a session.
    #[instrument(skip(self, run), fields(player = %run.player_name, score = run.score))]
    pub fn record_run(&self, run: RunResult) -> Result<GameSession, LeaderboardError> {
        let run = validate_run(run)?;
        let session = self.store.insert_session(&run)?;
        info!(session_id = session.id, "Session recorded");
        Ok(session)
    }

    /// Whether `score` would currently rank within the slots.
    ///
    /// Ties with existing entries count against the candidate.
    pub fn qualifies_as_high_score(&self, score: u64) -> Result<bool, LeaderboardError> {
        let at_least = self.store.count_high_scores_at_least(score)?;
        Ok(at_least < self.slots)
    }

    /// Persist a leaderboard entry unconditionally.
    pub fn record_high_score(&self, entry: NewHighScore) -> Result<HighScore, LeaderboardError> {
        let entry = validate_high_score(entry)?;
        let entry = self.store.insert_high_score(&entry)?;
        info!(high_score_id = entry.id, score = entry.score, "High score recorded");
        Ok(entry)
    }

    /// Leaderboard entries by score descending, ties by insertion order.
    pub fn top_high_scores(&self, limit: usize) -> Result<Vec<HighScore>, LeaderboardError> {
        Ok(self.store.top_high_scores(limit)?)
    }

    /// Aggregates over all sessions.
    pub fn aggregate_stats(&self) -> Result<GameStats, LeaderboardError> {
        Ok(self.store.session_stats()?)
    }

    /// Record a finished run and admit it to the leaderboard if it ranks.
    ///
    /// The qualification check and the insert run atomically in the
    /// store, so concurrent submissions cannot overfill the slots.
    #[instrument(skip(self, run), fields(player = %run.player_name, score = run.score))]
    pub fn submit_run(&self, run: RunResult) -> Result<SubmittedRun, LeaderboardError> {
        let run = validate_run(run)?;
        let session = self.store.insert_session(&run)?;

        let slots = self.slots;
        let high_score = self
            .store
            .insert_high_score_when(&NewHighScore::from(&run), &|at_least| at_least < slots)?;

        match &high_score {
            Some(entry) => info!(session_id = session.id, high_score_id = entry.id, "Run ranked"),
            None => info!(session_id = session.id, "Run recorded"),
        }

        Ok(SubmittedRun { session, high_score })
    }
}

impl std::fmt::Debug for RankingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingService").field("slots", &self.slots).finish()
    }
}
