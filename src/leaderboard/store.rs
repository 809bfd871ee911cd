//! Run Storage
//!
//! The [`RunStore`] trait is the persistence seam. Two backends:
//!
//! - [`MemoryStore`]: tables behind a mutex, lost on exit
//! - [`JsonFileStore`]: same tables, written to a JSON file after every
//!   mutation (synced temp file, then rename)
//!
//! Leaderboard entries are never pruned. "Top N" is a query-time limit.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::game::state::RunResult;
use crate::leaderboard::model::{GameSession, GameStats, HighScore, NewHighScore};

/// Storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encoding or decoding the data file failed
    #[error("storage encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend cannot serve requests
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for sessions and leaderboard entries.
///
/// Every method is atomic with respect to the others.
pub trait RunStore: Send + Sync {
    /// Persist a finished run as a session.
    fn insert_session(&self, run: &RunResult) -> Result<GameSession, StorageError>;

    /// Persist a leaderboard entry unconditionally.
    fn insert_high_score(&self, entry: &NewHighScore) -> Result<HighScore, StorageError>;

    /// Persist a leaderboard entry if `admit` accepts the number of
    /// existing entries scoring at least `entry.score`.
    ///
    /// The count and the insert happen under one lock.
    fn insert_high_score_when(
        &self,
        entry: &NewHighScore,
        admit: &dyn Fn(usize) -> bool,
    ) -> Result<Option<HighScore>, StorageError>;

    /// Entries with a score of at least `score`.
    fn count_high_scores_at_least(&self, score: u64) -> Result<usize, StorageError>;

    /// Entries by score descending, ties by insertion order.
    fn top_high_scores(&self, limit: usize) -> Result<Vec<HighScore>, StorageError>;

    /// Aggregates over all sessions.
    fn session_stats(&self) -> Result<GameStats, StorageError>;
}

// =============================================================================
// TABLES
// =============================================================================

/// Leaderboard ordering: score descending, then ID ascending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey {
    score: Reverse<u64>,
    id: u64,
}

impl RankKey {
    fn of(entry: &HighScore) -> Self {
        Self {
            score: Reverse(entry.score),
            id: entry.id,
        }
    }
}

/// In-memory tables shared by both backends.
#[derive(Debug)]
struct Tables {
    sessions: BTreeMap<u64, GameSession>,
    ranking: BTreeMap<RankKey, HighScore>,
    next_session_id: u64,
    next_high_score_id: u64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            sessions: BTreeMap::new(),
            ranking: BTreeMap::new(),
            next_session_id: 1,
            next_high_score_id: 1,
        }
    }
}

impl Tables {
    fn insert_session(&mut self, run: &RunResult) -> GameSession {
        let id = self.next_session_id;
        self.next_session_id += 1;

        let session = GameSession {
            id,
            player_name: run.player_name.clone(),
            score: run.score,
            coins_collected: run.coins_collected,
            distance: run.distance,
            duration: run.duration,
            created_at: Utc::now(),
        };
        self.sessions.insert(id, session.clone());
        session
    }

    fn insert_high_score(&mut self, entry: &NewHighScore) -> HighScore {
        let id = self.next_high_score_id;
        self.next_high_score_id += 1;

        let high_score = HighScore {
            id,
            player_name: entry.player_name.clone(),
            score: entry.score,
            coins_collected: entry.coins_collected,
            distance: entry.distance,
            created_at: Utc::now(),
        };
        self.ranking.insert(RankKey::of(&high_score), high_score.clone());
        high_score
    }

    /// Undo the most recent [`Tables::insert_session`].
    fn remove_session(&mut self, id: u64) {
        if self.sessions.remove(&id).is_some() && self.next_session_id == id + 1 {
            self.next_session_id = id;
        }
    }

    /// Undo the most recent [`Tables::insert_high_score`].
    fn remove_high_score(&mut self, entry: &HighScore) {
        let removed = self.ranking.remove(&RankKey::of(entry)).is_some();
        if removed && self.next_high_score_id == entry.id + 1 {
            self.next_high_score_id = entry.id;
        }
    }

    fn count_at_least(&self, score: u64) -> usize {
        // Reverse ordering puts every score >= `score` at or before this key
        let bound = RankKey {
            score: Reverse(score),
            id: u64::MAX,
        };
        self.ranking.range(..=bound).count()
    }

    fn top(&self, limit: usize) -> Vec<HighScore> {
        self.ranking.values().take(limit).cloned().collect()
    }

    fn stats(&self) -> GameStats {
        GameStats::from_sessions(self.sessions.values())
    }
}

/// On-disk layout of [`Tables`].
#[derive(Debug, Deserialize)]
struct Snapshot {
    next_session_id: u64,
    next_high_score_id: u64,
    sessions: Vec<GameSession>,
    high_scores: Vec<HighScore>,
}

/// Borrowed [`Snapshot`] for writing.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    next_session_id: u64,
    next_high_score_id: u64,
    sessions: Vec<&'a GameSession>,
    high_scores: Vec<&'a HighScore>,
}

impl<'a> From<&'a Tables> for SnapshotRef<'a> {
    fn from(tables: &'a Tables) -> Self {
        Self {
            next_session_id: tables.next_session_id,
            next_high_score_id: tables.next_high_score_id,
            sessions: tables.sessions.values().collect(),
            high_scores: tables.ranking.values().collect(),
        }
    }
}

impl From<Snapshot> for Tables {
    fn from(snapshot: Snapshot) -> Self {
        let sessions: BTreeMap<u64, GameSession> = snapshot
            .sessions
            .into_iter()
            .map(|session| (session.id, session))
            .collect();
        let ranking: BTreeMap<RankKey, HighScore> = snapshot
            .high_scores
            .into_iter()
            .map(|entry| (RankKey::of(&entry), entry))
            .collect();

        // Never hand out an ID already on disk
        let next_session_id = sessions
            .keys()
            .next_back()
            .map_or(1, |id| id + 1)
            .max(snapshot.next_session_id);
        let next_high_score_id = ranking
            .keys()
            .map(|key| key.id + 1)
            .max()
            .unwrap_or(1)
            .max(snapshot.next_high_score_id);

        Self {
            sessions,
            ranking,
            next_session_id,
            next_high_score_id,
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Volatile store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunStore for MemoryStore {
    fn insert_session(&self, run: &RunResult) -> Result<GameSession, StorageError> {
        Ok(self.tables.lock().insert_session(run))
    }

    fn insert_high_score(&self, entry: &NewHighScore) -> Result<HighScore, StorageError> {
        Ok(self.tables.lock().insert_high_score(entry))
    }

    fn insert_high_score_when(
        &self,
        entry: &NewHighScore,
        admit: &dyn Fn(usize) -> bool,
    ) -> Result<Option<HighScore>, StorageError> {
        let mut tables = self.tables.lock();
        if !admit(tables.count_at_least(entry.score)) {
            return Ok(None);
        }
        Ok(Some(tables.insert_high_score(entry)))
    }

    fn count_high_scores_at_least(&self, score: u64) -> Result<usize, StorageError> {
        Ok(self.tables.lock().count_at_least(score))
    }

    fn top_high_scores(&self, limit: usize) -> Result<Vec<HighScore>, StorageError> {
        Ok(self.tables.lock().top(limit))
    }

    fn session_stats(&self) -> Result<GameStats, StorageError> {
        Ok(self.tables.lock().stats())
    }
}

// =============================================================================
// JSON FILE STORE
// =============================================================================

/// Durable store backed by one JSON file.
///
/// Mutations apply to the live tables in place and are written out
/// before the lock is released. A failed write undoes the mutation, so
/// memory and disk stay in step.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl JsonFileStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let tables = match fs::read(&path) {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
                Tables::from(snapshot)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let tables = Tables::default();
                persist(&path, &tables)?;
                tables
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            sessions = tables.sessions.len(),
            high_scores = tables.ranking.len(),
            "Opened run store"
        );

        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    /// Data file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Write `tables` to `path`: temp file, fsync, rename, then fsync the
/// directory so the rename itself is durable.
fn persist(path: &Path, tables: &Tables) -> Result<(), StorageError> {
    let json = serde_json::to_vec_pretty(&SnapshotRef::from(tables))?;
    let tmp = temp_file(path);

    let mut file = File::create(&tmp)?;
    file.write_all(&json)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, path)?;
    sync_dir(path)?;
    debug!(path = %path.display(), bytes = json.len(), "Run store persisted");
    Ok(())
}

fn temp_file(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

impl RunStore for JsonFileStore {
    fn insert_session(&self, run: &RunResult) -> Result<GameSession, StorageError> {
        let mut tables = self.tables.lock();
        let session = tables.insert_session(run);
        if let Err(e) = persist(&self.path, &tables) {
            tables.remove_session(session.id);
            return Err(e);
        }
        Ok(session)
    }

    fn insert_high_score(&self, entry: &NewHighScore) -> Result<HighScore, StorageError> {
        let mut tables = self.tables.lock();
        let high_score = tables.insert_high_score(entry);
        if let Err(e) = persist(&self.path, &tables) {
            tables.remove_high_score(&high_score);
            return Err(e);
        }
        Ok(high_score)
    }

    fn insert_high_score_when(
        &self,
        entry: &NewHighScore,
        admit: &dyn Fn(usize) -> bool,
    ) -> Result<Option<HighScore>, StorageError> {
        let mut tables = self.tables.lock();
        if !admit(tables.count_at_least(entry.score)) {
            return Ok(None);
        }
        let high_score = tables.insert_high_score(entry);
        if let Err(e) = persist(&self.path, &tables) {
            tables.remove_high_score(&high_score);
            return Err(e);
        }
        Ok(Some(high_score))
    }

    fn count_high_scores_at_least(&self, score: u64) -> Result<usize, StorageError> {
        Ok(self.tables.lock().count_at_least(score))
    }

    fn top_high_scores(&self, limit: usize) -> Result<Vec<HighScore>, StorageError> {
        Ok(self.tables.lock().top(limit))
    }

    fn session_stats(&self) -> Result<GameStats, StorageError> {
        Ok(self.tables.lock().stats())
    }
}
