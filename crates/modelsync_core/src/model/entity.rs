//! Entity identity, kind dispatch, and audit read models.
//!
//! # Responsibility
//! - Define the closed set of externally addressable entity kinds.
//! - Define binding/deletion wire requests and their result envelopes.
//! - Define the append-only audit record read model.
//!
//! # Invariants
//! - `EntityKind` is exhaustive; unknown kind strings never reach repo code.
//! - Audit records are immutable once written.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for owner rows.
pub type OwnerId = Uuid;

/// Stable identifier for project rows.
pub type ProjectId = Uuid;

/// Stable identifier for any hierarchy row beneath a project
/// (category, family, family type, element).
pub type RowId = Uuid;

/// Closed set of entity kinds addressable by external id.
///
/// Categories and projects are intentionally absent: the authoring platform
/// only assigns external ids to family-level rows and below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Family,
    FamilyType,
    Element,
}

impl EntityKind {
    /// Canonical lowercase tag used on the wire and in audit rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::FamilyType => "family_type",
            Self::Element => "element",
        }
    }

    /// Parses a wire tag. Unknown tags return `None` and must be treated
    /// as a hard caller error by the boundary that received them.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "family" => Some(Self::Family),
            "family_type" => Some(Self::FamilyType),
            "element" => Some(Self::Element),
            _ => None,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit trail action classifier.
///
/// Only `Delete` is written today; `Create`/`Update` keep a symmetric
/// extension representable without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One immutable row of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    /// Monotonic log position.
    pub audit_id: i64,
    /// Acting owner name as supplied by the caller, or `"unknown"`.
    pub actor: String,
    /// Name of the project that owned the mutated row.
    pub project_name: String,
    pub entity_kind: EntityKind,
    pub external_id: Option<i64>,
    pub action: AuditAction,
    /// Epoch ms write time.
    pub recorded_at: i64,
    /// Structured JSON detail payload, stored verbatim.
    pub detail: String,
}

/// One (kind, internal id, external id) stamping instruction.
///
/// Produced by the authoring platform after it has persisted counterpart
/// objects for rows it received in an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdBinding {
    pub kind: EntityKind,
    pub internal_id: RowId,
    pub external_id: i64,
}

/// Batch outcome for a binding request.
///
/// `skipped` counts rows that no longer exist; a later tree replace may
/// have removed them, so a miss is a soft outcome rather than an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BindingReport {
    pub applied: usize,
    pub skipped: usize,
}

/// External-id-driven deletion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionRequest {
    pub kind: EntityKind,
    pub external_id: i64,
}

/// Outcome of a deletion request, distinguishing "deleted now" from
/// "already gone".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeletionOutcome {
    Deleted {
        kind: EntityKind,
        external_id: i64,
        /// Name of the removed row, captured before the cascade.
        name: String,
        project_name: String,
    },
    NotFound {
        kind: EntityKind,
        external_id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::{AuditAction, EntityKind};

    #[test]
    fn entity_kind_tags_round_trip() {
        for kind in [EntityKind::Family, EntityKind::FamilyType, EntityKind::Element] {
            assert_eq!(EntityKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn entity_kind_rejects_unknown_tags() {
        assert_eq!(EntityKind::parse("category"), None);
        assert_eq!(EntityKind::parse("Family"), None);
        assert_eq!(EntityKind::parse(""), None);
    }

    #[test]
    fn audit_action_tags_round_trip() {
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Delete] {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(AuditAction::parse("upsert"), None);
    }
}
