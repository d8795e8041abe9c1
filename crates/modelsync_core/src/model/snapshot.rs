//! Inbound push payload: one full design-tree snapshot for one project.
//!
//! # Responsibility
//! - Mirror the authoring platform's push wire shape.
//! - Validate a snapshot completely before any store mutation.
//!
//! # Invariants
//! - Validation failures carry enough context to name the offending node.
//! - A snapshot that validates can be applied without further field checks.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static CONTACT_ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid contact address regex"));

/// Owner descriptor carried inside a push.
///
/// `contact_address` is the sole key for recognizing a returning owner;
/// `name` is only used when the owner is first created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerDescriptor {
    pub name: String,
    pub contact_address: String,
}

/// Leaf node of the pushed tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    pub name: String,
    #[serde(default)]
    pub classification_code: Option<String>,
    /// Opaque key/value bag serialized by the authoring tool.
    #[serde(default)]
    pub parameters: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyTypeSnapshot {
    pub name: String,
    #[serde(default)]
    pub classification_code: Option<String>,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilySnapshot {
    pub name: String,
    #[serde(default)]
    pub classification_code: Option<String>,
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub family_types: Vec<FamilyTypeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub name: String,
    #[serde(default)]
    pub classification_code: Option<String>,
    #[serde(default)]
    pub families: Vec<FamilySnapshot>,
}

/// One full-tree push for one project.
///
/// Sequence order of categories/families/types/elements is meaningful and
/// preserved as insertion order. Duplicate names are not deduplicated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub name: String,
    /// Current total hours as reported by the source; last write wins.
    pub hours: f64,
    pub owner: OwnerDescriptor,
    pub categories: Vec<CategorySnapshot>,
}

/// Pre-mutation validation failures for a pushed snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotValidationError {
    BlankProjectName,
    /// Hours must be finite and non-negative.
    InvalidHours(f64),
    BlankOwnerName,
    InvalidContactAddress(String),
    BlankCategoryName { position: usize },
    BlankFamilyName { category: String },
    BlankFamilyTypeName { family: String },
    BlankElementName { family_type: String },
}

impl Display for SnapshotValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankProjectName => write!(f, "project name must not be blank"),
            Self::InvalidHours(value) => {
                write!(f, "hours must be a finite non-negative number, got {value}")
            }
            Self::BlankOwnerName => write!(f, "owner name must not be blank"),
            Self::InvalidContactAddress(value) => {
                write!(f, "owner contact address is malformed: `{value}`")
            }
            Self::BlankCategoryName { position } => {
                write!(f, "category at position {position} has a blank name")
            }
            Self::BlankFamilyName { category } => {
                write!(f, "family under category `{category}` has a blank name")
            }
            Self::BlankFamilyTypeName { family } => {
                write!(f, "family type under family `{family}` has a blank name")
            }
            Self::BlankElementName { family_type } => {
                write!(f, "element under family type `{family_type}` has a blank name")
            }
        }
    }
}

impl Error for SnapshotValidationError {}

impl ProjectSnapshot {
    /// Validates the whole snapshot without touching the store.
    ///
    /// # Invariants
    /// - Every node name must be non-blank after trim.
    /// - `hours` must be finite and `>= 0`.
    /// - `owner.contact_address` must look like an address.
    pub fn validate(&self) -> Result<(), SnapshotValidationError> {
        if self.name.trim().is_empty() {
            return Err(SnapshotValidationError::BlankProjectName);
        }
        if !self.hours.is_finite() || self.hours < 0.0 {
            return Err(SnapshotValidationError::InvalidHours(self.hours));
        }
        if self.owner.name.trim().is_empty() {
            return Err(SnapshotValidationError::BlankOwnerName);
        }
        if !CONTACT_ADDRESS_RE.is_match(self.owner.contact_address.trim()) {
            return Err(SnapshotValidationError::InvalidContactAddress(
                self.owner.contact_address.clone(),
            ));
        }

        for (position, category) in self.categories.iter().enumerate() {
            if category.name.trim().is_empty() {
                return Err(SnapshotValidationError::BlankCategoryName { position });
            }
            for family in &category.families {
                if family.name.trim().is_empty() {
                    return Err(SnapshotValidationError::BlankFamilyName {
                        category: category.name.clone(),
                    });
                }
                for family_type in &family.family_types {
                    if family_type.name.trim().is_empty() {
                        return Err(SnapshotValidationError::BlankFamilyTypeName {
                            family: family.name.clone(),
                        });
                    }
                    for element in &family_type.elements {
                        if element.name.trim().is_empty() {
                            return Err(SnapshotValidationError::BlankElementName {
                                family_type: family_type.name.clone(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Result envelope returned to the source after a successful push.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    pub project_name: String,
    pub owner_name: String,
    pub categories_synced: usize,
    /// Epoch ms completion time, read from the store clock at commit.
    pub completed_at_ms: i64,
}
