//! Core reconciliation engine for design-model trees pushed by an external
//! CAD authoring tool and persisted in a relational store.
//! This crate is the single source of truth for sync invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{
    AuditAction, AuditRecord, BindingReport, DeletionOutcome, DeletionRequest, EntityKind,
    ExternalIdBinding, OwnerId, ProjectId, RowId,
};
pub use model::export::{
    CategoryExport, ElementExport, FamilyExport, FamilyTypeExport, OwnerSummary, ProjectExport,
};
pub use model::snapshot::{
    CategorySnapshot, ElementSnapshot, FamilySnapshot, FamilyTypeSnapshot, OwnerDescriptor,
    ProjectSnapshot, SnapshotValidationError, SyncSummary,
};
pub use repo::audit_repo::{AuditRepository, SqliteAuditRepository};
pub use repo::binding_repo::{BindingRepository, SqliteBindingRepository};
pub use repo::deletion_repo::{DeletionRepository, SqliteDeletionRepository};
pub use repo::export_repo::{ExportRepository, SqliteExportRepository};
pub use repo::merge_repo::{MergeError, MergeRepository, SqliteMergeRepository, SyncStep};
pub use repo::{RepoError, RepoResult};
pub use service::binding_service::BindingService;
pub use service::deletion_service::{DeletionError, DeletionService};
pub use service::export_service::ExportService;
pub use service::import_service::{ImportError, ImportService, ImportSummary};
pub use service::project_locks::ProjectLocks;
pub use service::push_service::{PushError, PushService};
pub use sync::events::{
    ChangeEvent, ChangeObserver, NotifyError, ObserverRegistry, ObserverRegistryError,
};
pub use sync::remote::{
    CredentialProvider, RemoteCatalog, RemoteProjectEntry, SingleFlight, UpstreamError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
