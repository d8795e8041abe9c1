//! Binding use-case service.
//!
//! # Responsibility
//! - Apply external-id batches and report applied/skipped counts.
//!
//! # Invariants
//! - Misses are soft outcomes; the batch never fails on a vanished row.
//! - Bindings are not audited and produce no change events; the external
//!   platform initiated the ids, so there is nothing new to announce.

use crate::model::entity::{BindingReport, ExternalIdBinding};
use crate::repo::binding_repo::BindingRepository;
use crate::repo::RepoError;
use log::{error, info};

/// Binding service facade.
pub struct BindingService<R: BindingRepository> {
    repo: R,
}

impl<R: BindingRepository> BindingService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Stamps one batch of external ids.
    pub fn bind(&self, batch: &[ExternalIdBinding]) -> Result<BindingReport, RepoError> {
        info!(
            "event=binding_apply module=service status=start requested={}",
            batch.len()
        );

        match self.repo.bind_external_ids(batch) {
            Ok(report) => {
                info!(
                    "event=binding_apply module=service status=ok applied={} skipped={}",
                    report.applied, report.skipped
                );
                Ok(report)
            }
            Err(err) => {
                error!("event=binding_apply module=service status=error error={err}");
                Err(err)
            }
        }
    }
}
