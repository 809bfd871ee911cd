//! Fire-and-Forget Run Submission
//!
//! Hands finished runs from the frame loop to a worker task that calls
//! [`RankingService::submit_run`]. The frame loop never waits: a full or
//! closed queue drops the run with a warning, and worker failures are
//! logged without retry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::game::controller::RunSink;
use crate::game::state::RunResult;
use crate::leaderboard::service::RankingService;

/// Default queue capacity.
pub const DEFAULT_SUBMIT_QUEUE: usize = 64;

/// Non-blocking sender of finished runs.
#[derive(Clone, Debug)]
pub struct RunSubmitter {
    tx: mpsc::Sender<RunResult>,
    dropped: Arc<AtomicU64>,
}

impl RunSubmitter {
    /// Start the worker task. The task exits once every submitter clone
    /// has been dropped and the queue is drained.
    pub fn spawn(service: RankingService, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(service, rx));

        let submitter = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (submitter, handle)
    }

    /// Queue a run without waiting. Returns false if it was dropped.
    pub fn try_submit(&self, result: RunResult) -> bool {
        match self.tx.try_send(result) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(run)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(player = %run.player_name, score = run.score, "Submit queue full, dropping run");
                false
            }
            Err(mpsc::error::TrySendError::Closed(run)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(player = %run.player_name, score = run.score, "Submit worker gone, dropping run");
                false
            }
        }
    }

    /// Runs dropped so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl RunSink for RunSubmitter {
    fn submit(&self, result: RunResult) {
        self.try_submit(result);
    }
}

async fn run_worker(service: RankingService, mut rx: mpsc::Receiver<RunResult>) {
    debug!("Submit worker started");

    while let Some(run) = rx.recv().await {
        let service = service.clone();
        let outcome = tokio::task::spawn_blocking(move || service.submit_run(run)).await;

        match outcome {
            Ok(Ok(submitted)) => info!(
                session_id = submitted.session.id,
                ranked = submitted.high_score.is_some(),
                "Run submitted"
            ),
            Ok(Err(e)) => error!(error = %e, "Run submission failed"),
            Err(e) => error!(error = %e, "Run submission task panicked"),
        }
    }

    debug!("Submit worker stopped");
}
