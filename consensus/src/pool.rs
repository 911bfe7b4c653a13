//! Bounded worker pool for asynchronous elections.
//!
//! Every election task holds a semaphore permit while it runs, so at most
//! `workers` elections make progress at once no matter how many demotions
//! fire. Each task comes back as an [`ElectionHandle`] that can be awaited,
//! cancelled, or dropped to let it run detached.

use crate::error::ConsensusError;
use lhraft_types::{NodeId, ZoneId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
pub struct ElectionPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl ElectionPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Schedule `election` for `zone`. Must be called from within a tokio
    /// runtime.
    pub fn spawn<F>(&self, zone: ZoneId, election: F) -> ElectionHandle
    where
        F: Future<Output = Result<NodeId, ConsensusError>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let task_zone = zone.clone();
        let task = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| ConsensusError::Cancelled(task_zone))?;
            election.await
        });
        ElectionHandle { zone, task }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Workers not currently running an election.
    pub fn idle_workers(&self) -> usize {
        self.permits.available_permits()
    }
}

/// Completion handle of a scheduled election.
///
/// Dropping the handle detaches the task; it still runs to completion.
#[derive(Debug)]
pub struct ElectionHandle {
    zone: ZoneId,
    task: JoinHandle<Result<NodeId, ConsensusError>>,
}

impl ElectionHandle {
    pub fn zone(&self) -> &ZoneId {
        &self.zone
    }

    /// Abort the election. If it has not yet taken the zone lock nothing was
    /// applied; once it holds the lock it finishes without yielding, so the
    /// zone is never left half-elected.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the election outcome.
    pub async fn wait(self) -> Result<NodeId, ConsensusError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(ConsensusError::Cancelled(self.zone)),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}
