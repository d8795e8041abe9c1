//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the sync store.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Multi-step write paths run inside one Immediate transaction; partial
//!   cascades or half-applied subtrees are never observable.
//! - Repository APIs return semantic outcomes (not-found, skipped) in
//!   addition to transport errors.

use crate::db::DbError;
use crate::model::entity::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod audit_repo;
pub mod binding_repo;
pub mod deletion_repo;
pub mod export_repo;
pub mod merge_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for sync store operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Table and primary-key column for one externally addressable kind.
pub(crate) fn kind_table(kind: EntityKind) -> (&'static str, &'static str) {
    match kind {
        EntityKind::Family => ("families", "family_uuid"),
        EntityKind::FamilyType => ("family_types", "type_uuid"),
        EntityKind::Element => ("elements", "element_uuid"),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
