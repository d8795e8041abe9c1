//! Push use-case service: validate, serialize per project, merge, notify.
//!
//! # Responsibility
//! - Reject malformed snapshots before any store mutation.
//! - Serialize pushes per project name via the injected lock registry.
//! - Broadcast a change event after a successful merge.
//!
//! # Invariants
//! - Re-sending the same snapshot reproduces the same end state, aside
//!   from participation hours, which accumulate by design.
//! - A failed merge leaves the store exactly as it was.

use crate::model::snapshot::{ProjectSnapshot, SnapshotValidationError, SyncSummary};
use crate::repo::merge_repo::{MergeError, MergeRepository};
use crate::service::project_locks::{acquire, ProjectLocks};
use crate::sync::events::{ChangeEvent, ObserverRegistry};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Errors from the push use-case.
#[derive(Debug)]
pub enum PushError {
    /// Snapshot rejected before any store mutation.
    Validation(SnapshotValidationError),
    /// Merge failure; the transaction was rolled back.
    Store(MergeError),
}

impl Display for PushError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PushError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<SnapshotValidationError> for PushError {
    fn from(value: SnapshotValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<MergeError> for PushError {
    fn from(value: MergeError) -> Self {
        Self::Store(value)
    }
}

/// Push service facade.
pub struct PushService<R: MergeRepository> {
    repo: R,
    locks: Arc<ProjectLocks>,
    observers: Arc<ObserverRegistry>,
}

impl<R: MergeRepository> PushService<R> {
    pub fn new(repo: R, locks: Arc<ProjectLocks>, observers: Arc<ObserverRegistry>) -> Self {
        Self {
            repo,
            locks,
            observers,
        }
    }

    /// Applies one full-tree push.
    ///
    /// # Side effects
    /// - Emits `push_apply` logging events with duration and status.
    /// - Broadcasts `ChangeEvent::ProjectSynced` after commit.
    pub fn apply_push(&self, snapshot: &ProjectSnapshot) -> Result<SyncSummary, PushError> {
        let started_at = Instant::now();
        info!(
            "event=push_apply module=service status=start project={} categories={}",
            snapshot.name,
            snapshot.categories.len()
        );

        if let Err(err) = snapshot.validate() {
            error!(
                "event=push_apply module=service status=error project={} error_code=validation_failed error={err}",
                snapshot.name
            );
            return Err(err.into());
        }

        let handle = self.locks.handle(&snapshot.name);
        let _project_guard = acquire(&handle);

        let summary = match self.repo.apply_snapshot(snapshot) {
            Ok(summary) => summary,
            Err(err) => {
                error!(
                    "event=push_apply module=service status=error project={} duration_ms={} step={} error={err}",
                    snapshot.name,
                    started_at.elapsed().as_millis(),
                    err.step
                );
                return Err(err.into());
            }
        };

        info!(
            "event=push_apply module=service status=ok project={} owner={} categories={} duration_ms={}",
            summary.project_name,
            summary.owner_name,
            summary.categories_synced,
            started_at.elapsed().as_millis()
        );

        self.observers.broadcast(&ChangeEvent::ProjectSynced {
            project_name: summary.project_name.clone(),
            owner_name: summary.owner_name.clone(),
            categories_synced: summary.categories_synced,
        });

        Ok(summary)
    }
}
