//! Deletion use-case service: external-id-driven removal with audit.
//!
//! # Responsibility
//! - Resolve and delete rows by external id, defaulting the acting owner.
//! - Reject unknown entity-kind tags as a hard caller error.
//! - Broadcast a change event when a row was actually removed.
//!
//! # Invariants
//! - "Already gone" is reported distinctly from "deleted now" and is not
//!   a failure.

use crate::model::entity::{DeletionOutcome, DeletionRequest, EntityKind};
use crate::repo::deletion_repo::DeletionRepository;
use crate::repo::RepoError;
use crate::sync::events::{ChangeEvent, ObserverRegistry};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const UNKNOWN_ACTOR: &str = "unknown";

/// Errors from the deletion use-case.
#[derive(Debug)]
pub enum DeletionError {
    /// Caller supplied a kind tag outside the closed set.
    UnknownKind(String),
    /// Persistence-layer failure; the transaction was rolled back.
    Repo(RepoError),
}

impl Display for DeletionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKind(value) => write!(
                f,
                "unrecognized entity kind `{value}`; expected family|family_type|element"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DeletionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownKind(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for DeletionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Deletion service facade.
pub struct DeletionService<R: DeletionRepository> {
    repo: R,
    observers: Arc<ObserverRegistry>,
}

impl<R: DeletionRepository> DeletionService<R> {
    pub fn new(repo: R, observers: Arc<ObserverRegistry>) -> Self {
        Self { repo, observers }
    }

    /// Deletes by typed request. `actor` defaults to `"unknown"`.
    pub fn delete(
        &self,
        request: DeletionRequest,
        actor: Option<&str>,
    ) -> Result<DeletionOutcome, DeletionError> {
        let actor = actor
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_ACTOR);
        info!(
            "event=deletion_apply module=service status=start kind={} external_id={} actor={actor}",
            request.kind, request.external_id
        );

        let outcome = self
            .repo
            .delete_by_external_id(request.kind, request.external_id, actor)
            .map_err(|err| {
                error!(
                    "event=deletion_apply module=service status=error kind={} external_id={} error={err}",
                    request.kind, request.external_id
                );
                DeletionError::from(err)
            })?;

        match &outcome {
            DeletionOutcome::Deleted {
                kind,
                external_id,
                name,
                project_name,
            } => {
                info!(
                    "event=deletion_apply module=service status=ok outcome=deleted kind={kind} external_id={external_id} name={name}"
                );
                self.observers.broadcast(&ChangeEvent::EntityDeleted {
                    kind: *kind,
                    external_id: *external_id,
                    project_name: project_name.clone(),
                });
            }
            DeletionOutcome::NotFound { kind, external_id } => {
                info!(
                    "event=deletion_apply module=service status=ok outcome=not_found kind={kind} external_id={external_id}"
                );
            }
        }

        Ok(outcome)
    }

    /// Deletes by raw wire tag; unknown tags are a hard caller error.
    pub fn delete_by_tag(
        &self,
        kind_tag: &str,
        external_id: i64,
        actor: Option<&str>,
    ) -> Result<DeletionOutcome, DeletionError> {
        let kind = EntityKind::parse(kind_tag)
            .ok_or_else(|| DeletionError::UnknownKind(kind_tag.to_string()))?;
        self.delete(DeletionRequest { kind, external_id }, actor)
    }
}
