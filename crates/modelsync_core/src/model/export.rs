//! Outbound export shapes: the persisted tree in the wire form the
//! authoring platform consumes for reverse-direction sync.
//!
//! # Responsibility
//! - Mirror the persisted hierarchy depth-first with internal ids attached.
//! - Carry external ids so the source can tell bound from unbound rows.
//!
//! # Invariants
//! - Export types are read models only; producing them never mutates state.

use crate::model::entity::{OwnerId, ProjectId, RowId};
use serde::Serialize;

/// Owner summary nested inside a project export. `None` on the project
/// means the project was created without an owner back-reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerSummary {
    pub owner_uuid: OwnerId,
    pub name: String,
    pub contact_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementExport {
    pub element_uuid: RowId,
    pub name: String,
    pub classification_code: Option<String>,
    pub external_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyTypeExport {
    pub type_uuid: RowId,
    pub name: String,
    pub classification_code: Option<String>,
    pub external_id: Option<i64>,
    pub elements: Vec<ElementExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyExport {
    pub family_uuid: RowId,
    pub name: String,
    pub classification_code: Option<String>,
    pub external_id: Option<i64>,
    pub family_types: Vec<FamilyTypeExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryExport {
    pub category_uuid: RowId,
    pub name: String,
    pub classification_code: Option<String>,
    pub families: Vec<FamilyExport>,
}

/// One project with its full persisted subtree, depth-first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectExport {
    pub project_uuid: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub hours_logged: f64,
    pub source_tag: Option<String>,
    /// Epoch ms creation time.
    pub created_at: i64,
    pub owner: Option<OwnerSummary>,
    pub categories: Vec<CategoryExport>,
}
