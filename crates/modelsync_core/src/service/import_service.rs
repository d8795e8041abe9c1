//! Remote catalog import: pull the platform's project list into the store.
//!
//! # Responsibility
//! - Acquire a credential, list the remote catalog, and find-or-create
//!   each project by name.
//! - Enforce single-flight: one import run at a time.
//!
//! # Invariants
//! - Existing projects are never modified by an import, only counted.
//! - Upstream failures are reported with their cause attached, never
//!   swallowed.

use crate::repo::merge_repo::MergeRepository;
use crate::repo::RepoError;
use crate::sync::remote::{CredentialProvider, RemoteCatalog, SingleFlight, UpstreamError};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

const REMOTE_SOURCE_TAG: &str = "remote";

/// Errors from one import run.
#[derive(Debug)]
pub enum ImportError {
    /// A previous run is still in progress; nothing was done.
    AlreadyRunning,
    /// Credential acquisition failed.
    Credential(UpstreamError),
    /// Remote catalog fetch failed.
    Remote(UpstreamError),
    /// Store failure while creating projects.
    Repo(RepoError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "an import run is already in progress"),
            Self::Credential(err) => write!(f, "credential acquisition failed: {err}"),
            Self::Remote(err) => write!(f, "remote catalog fetch failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadyRunning => None,
            Self::Credential(err) | Self::Remote(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Counts for one completed import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub existing: usize,
}

/// Import service facade.
pub struct ImportService<R: MergeRepository> {
    repo: R,
    credentials: Arc<dyn CredentialProvider>,
    catalog: Arc<dyn RemoteCatalog>,
    flight: SingleFlight,
}

impl<R: MergeRepository> ImportService<R> {
    pub fn new(
        repo: R,
        credentials: Arc<dyn CredentialProvider>,
        catalog: Arc<dyn RemoteCatalog>,
    ) -> Self {
        Self {
            repo,
            credentials,
            catalog,
            flight: SingleFlight::new(),
        }
    }

    /// Runs one import pass; refuses to overlap a running pass.
    pub fn run_once(&self) -> Result<ImportSummary, ImportError> {
        let Some(_flight_guard) = self.flight.try_begin() else {
            warn!("event=remote_import module=service status=skipped reason=already_running");
            return Err(ImportError::AlreadyRunning);
        };

        let started_at = Instant::now();
        info!("event=remote_import module=service status=start");

        let token = self.credentials.bearer_token().map_err(|err| {
            error!(
                "event=remote_import module=service status=error stage=credential error={err}"
            );
            ImportError::Credential(err)
        })?;

        let entries = self.catalog.list_projects(&token).map_err(|err| {
            error!("event=remote_import module=service status=error stage=fetch error={err}");
            ImportError::Remote(err)
        })?;

        let mut summary = ImportSummary::default();
        for entry in &entries {
            let created = self
                .repo
                .find_or_create_project(
                    &entry.name,
                    entry.description.as_deref(),
                    entry.external_ref.as_deref(),
                    Some(REMOTE_SOURCE_TAG),
                )
                .map_err(|err| {
                    error!(
                        "event=remote_import module=service status=error stage=store project={} error={err}",
                        entry.name
                    );
                    ImportError::from(err)
                })?;
            if created {
                summary.created += 1;
            } else {
                summary.existing += 1;
            }
        }

        info!(
            "event=remote_import module=service status=ok created={} existing={} duration_ms={}",
            summary.created,
            summary.existing,
            started_at.elapsed().as_millis()
        );
        Ok(summary)
    }
}
