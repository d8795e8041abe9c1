//! Export use-case service: reverse-direction tree serialization.
//!
//! # Responsibility
//! - Produce the persisted tree in the source's nested wire shape.
//!
//! # Invariants
//! - Strictly read-only; exporting never touches external ids or any
//!   other state.

use crate::model::export::ProjectExport;
use crate::repo::export_repo::ExportRepository;
use crate::repo::RepoError;
use log::{error, info};
use std::time::Instant;

/// Export service facade.
pub struct ExportService<R: ExportRepository> {
    repo: R,
}

impl<R: ExportRepository> ExportService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Exports every persisted project with its full subtree.
    pub fn export_all(&self) -> Result<Vec<ProjectExport>, RepoError> {
        self.export(None)
    }

    /// Exports one project by name, or `None` when it does not exist.
    pub fn export_project(&self, project_name: &str) -> Result<Option<ProjectExport>, RepoError> {
        Ok(self.export(Some(project_name))?.into_iter().next())
    }

    fn export(&self, filter: Option<&str>) -> Result<Vec<ProjectExport>, RepoError> {
        let started_at = Instant::now();
        info!("event=tree_export module=service status=start");

        match self.repo.export_projects(filter) {
            Ok(projects) => {
                info!(
                    "event=tree_export module=service status=ok projects={} duration_ms={}",
                    projects.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(projects)
            }
            Err(err) => {
                error!(
                    "event=tree_export module=service status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}
