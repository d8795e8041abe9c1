//! Tree merge repository: ingests one full-tree push for one project.
//!
//! # Responsibility
//! - Apply a validated snapshot in a single Immediate transaction.
//! - Find-or-create owner/project rows by natural key, then wholesale
//!   replace the project's category subtree with the incoming one.
//!
//! # Invariants
//! - Owner name is creation-only; a returning contact address never
//!   renames the stored owner.
//! - Project `hours_logged` is last-write-wins; participation hours are
//!   cumulative across pushes.
//! - Input sequence order is preserved via `sort_order`; duplicate names
//!   inside one push produce duplicate rows.
//! - Any failure rolls the whole push back; the category subtree is either
//!   fully replaced or untouched.

use crate::model::snapshot::{CategorySnapshot, OwnerDescriptor, ProjectSnapshot, SyncSummary};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Step labels for structured merge failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    BeginTransaction,
    ResolveOwner,
    ResolveProject,
    RecordParticipation,
    ReplaceCategories,
    InsertTree,
    Commit,
}

impl SyncStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeginTransaction => "begin_transaction",
            Self::ResolveOwner => "resolve_owner",
            Self::ResolveProject => "resolve_project",
            Self::RecordParticipation => "record_participation",
            Self::ReplaceCategories => "replace_categories",
            Self::InsertTree => "insert_tree",
            Self::Commit => "commit",
        }
    }
}

impl Display for SyncStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A merge failure tagged with the step that raised it.
///
/// The enclosing transaction is rolled back before this is returned, so a
/// caller can retry the same snapshot safely.
#[derive(Debug)]
pub struct MergeError {
    pub step: SyncStep,
    source: RepoError,
}

impl MergeError {
    fn at<E: Into<RepoError>>(step: SyncStep) -> impl FnOnce(E) -> Self {
        move |err| Self {
            step,
            source: err.into(),
        }
    }
}

impl Display for MergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tree merge failed at step {}: {}", self.step, self.source)
    }
}

impl Error for MergeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Repository interface for the push-merge and project find-or-create
/// write paths.
pub trait MergeRepository {
    /// Applies one validated snapshot; see module invariants.
    fn apply_snapshot(&self, snapshot: &ProjectSnapshot) -> Result<SyncSummary, MergeError>;

    /// Creates a project by name if absent. Returns `true` when a row was
    /// created, `false` when the name already existed (left untouched).
    fn find_or_create_project(
        &self,
        name: &str,
        description: Option<&str>,
        external_project_id: Option<&str>,
        source_tag: Option<&str>,
    ) -> RepoResult<bool>;
}

/// SQLite-backed merge repository.
pub struct SqliteMergeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMergeRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MergeRepository for SqliteMergeRepository<'_> {
    fn apply_snapshot(&self, snapshot: &ProjectSnapshot) -> Result<SyncSummary, MergeError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(MergeError::at(SyncStep::BeginTransaction))?;

        let owner = resolve_or_create_owner(&tx, &snapshot.owner)
            .map_err(MergeError::at(SyncStep::ResolveOwner))?;
        let project_uuid = resolve_or_create_project(&tx, snapshot, owner.owner_uuid)
            .map_err(MergeError::at(SyncStep::ResolveProject))?;
        record_participation(&tx, project_uuid, owner.owner_uuid, snapshot.hours)
            .map_err(MergeError::at(SyncStep::RecordParticipation))?;

        clear_categories(&tx, project_uuid)
            .map_err(MergeError::at(SyncStep::ReplaceCategories))?;
        insert_category_trees(&tx, project_uuid, &owner.name, &snapshot.categories)
            .map_err(MergeError::at(SyncStep::InsertTree))?;

        let completed_at_ms =
            store_now_ms(&tx).map_err(MergeError::at(SyncStep::Commit))?;
        tx.commit().map_err(MergeError::at(SyncStep::Commit))?;

        Ok(SyncSummary {
            project_name: snapshot.name.clone(),
            owner_name: owner.name,
            categories_synced: snapshot.categories.len(),
            completed_at_ms,
        })
    }

    fn find_or_create_project(
        &self,
        name: &str,
        description: Option<&str>,
        external_project_id: Option<&str>,
        source_tag: Option<&str>,
    ) -> RepoResult<bool> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT project_uuid FROM projects WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT INTO projects (
                project_uuid,
                name,
                description,
                external_project_id,
                source_tag
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                Uuid::new_v4().to_string(),
                name,
                description,
                external_project_id,
                source_tag,
            ],
        )?;
        Ok(true)
    }
}

struct ResolvedOwner {
    owner_uuid: Uuid,
    name: String,
}

fn resolve_or_create_owner(
    conn: &Connection,
    descriptor: &OwnerDescriptor,
) -> RepoResult<ResolvedOwner> {
    let existing = conn
        .query_row(
            "SELECT owner_uuid, name FROM owners WHERE contact_address = ?1;",
            [descriptor.contact_address.as_str()],
            |row| {
                let uuid_text: String = row.get(0)?;
                let name: String = row.get(1)?;
                Ok((uuid_text, name))
            },
        )
        .optional()?;

    if let Some((uuid_text, name)) = existing {
        // Name is creation-only: the stored value stays authoritative even
        // when the push carries a different spelling.
        let owner_uuid = parse_uuid(&uuid_text, "owners.owner_uuid")?;
        return Ok(ResolvedOwner { owner_uuid, name });
    }

    let owner_uuid = Uuid::new_v4();
    conn.execute(
        "INSERT INTO owners (owner_uuid, name, contact_address) VALUES (?1, ?2, ?3);",
        params![
            owner_uuid.to_string(),
            descriptor.name.as_str(),
            descriptor.contact_address.as_str(),
        ],
    )?;
    Ok(ResolvedOwner {
        owner_uuid,
        name: descriptor.name.clone(),
    })
}

fn resolve_or_create_project(
    conn: &Connection,
    snapshot: &ProjectSnapshot,
    owner_uuid: Uuid,
) -> RepoResult<Uuid> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT project_uuid FROM projects WHERE name = ?1;",
            [snapshot.name.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(uuid_text) = existing {
        let project_uuid = parse_uuid(&uuid_text, "projects.project_uuid")?;
        // Only the hours value is refreshed; owner back-reference and
        // description are set at creation and never re-parented by a push.
        conn.execute(
            "UPDATE projects SET hours_logged = ?2 WHERE project_uuid = ?1;",
            params![project_uuid.to_string(), snapshot.hours],
        )?;
        return Ok(project_uuid);
    }

    let project_uuid = Uuid::new_v4();
    conn.execute(
        "INSERT INTO projects (project_uuid, name, hours_logged, owner_uuid)
         VALUES (?1, ?2, ?3, ?4);",
        params![
            project_uuid.to_string(),
            snapshot.name.as_str(),
            snapshot.hours,
            owner_uuid.to_string(),
        ],
    )?;
    Ok(project_uuid)
}

fn record_participation(
    conn: &Connection,
    project_uuid: Uuid,
    owner_uuid: Uuid,
    hours: f64,
) -> Result<(), rusqlite::Error> {
    let changed = conn.execute(
        "UPDATE participations
         SET hours = hours + ?3,
             ended_at = (strftime('%s', 'now') * 1000)
         WHERE project_uuid = ?1
           AND owner_uuid = ?2;",
        params![project_uuid.to_string(), owner_uuid.to_string(), hours],
    )?;

    if changed == 0 {
        conn.execute(
            "INSERT INTO participations (
                participation_uuid,
                project_uuid,
                owner_uuid,
                hours,
                ended_at
            ) VALUES (?1, ?2, ?3, ?4, (strftime('%s', 'now') * 1000));",
            params![
                Uuid::new_v4().to_string(),
                project_uuid.to_string(),
                owner_uuid.to_string(),
                hours,
            ],
        )?;
    }
    Ok(())
}

fn clear_categories(conn: &Connection, project_uuid: Uuid) -> Result<(), rusqlite::Error> {
    // Wholesale replace: descendants go with their categories via FK
    // cascade. External ids bound beneath this project do not survive.
    conn.execute(
        "DELETE FROM categories WHERE project_uuid = ?1;",
        [project_uuid.to_string()],
    )?;
    Ok(())
}

fn insert_category_trees(
    conn: &Connection,
    project_uuid: Uuid,
    recorded_by: &str,
    categories: &[CategorySnapshot],
) -> Result<(), rusqlite::Error> {
    let mut insert_category = conn.prepare(
        "INSERT INTO categories (
            category_uuid, project_uuid, name, classification_code, recorded_by, sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
    )?;
    let mut insert_family = conn.prepare(
        "INSERT INTO families (
            family_uuid, category_uuid, name, classification_code, parameters, sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
    )?;
    let mut insert_type = conn.prepare(
        "INSERT INTO family_types (
            type_uuid, family_uuid, name, classification_code, parameters, sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
    )?;
    let mut insert_element = conn.prepare(
        "INSERT INTO elements (
            element_uuid, type_uuid, name, classification_code, parameters, recorded_by, sort_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
    )?;

    for (category_order, category) in categories.iter().enumerate() {
        let category_uuid = Uuid::new_v4();
        insert_category.execute(params![
            category_uuid.to_string(),
            project_uuid.to_string(),
            category.name.as_str(),
            category.classification_code.as_deref(),
            recorded_by,
            category_order as i64,
        ])?;

        for (family_order, family) in category.families.iter().enumerate() {
            let family_uuid = Uuid::new_v4();
            insert_family.execute(params![
                family_uuid.to_string(),
                category_uuid.to_string(),
                family.name.as_str(),
                family.classification_code.as_deref(),
                family.parameters.as_deref(),
                family_order as i64,
            ])?;

            for (type_order, family_type) in family.family_types.iter().enumerate() {
                let type_uuid = Uuid::new_v4();
                insert_type.execute(params![
                    type_uuid.to_string(),
                    family_uuid.to_string(),
                    family_type.name.as_str(),
                    family_type.classification_code.as_deref(),
                    family_type.parameters.as_deref(),
                    type_order as i64,
                ])?;

                for (element_order, element) in family_type.elements.iter().enumerate() {
                    insert_element.execute(params![
                        Uuid::new_v4().to_string(),
                        type_uuid.to_string(),
                        element.name.as_str(),
                        element.classification_code.as_deref(),
                        element.parameters.as_deref(),
                        recorded_by,
                        element_order as i64,
                    ])?;
                }
            }
        }
    }

    Ok(())
}

fn store_now_ms(conn: &Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("SELECT (strftime('%s', 'now') * 1000);", [], |row| {
        row.get(0)
    })
}
