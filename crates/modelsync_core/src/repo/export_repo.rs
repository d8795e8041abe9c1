//! Export repository: read-only assembly of the persisted tree.
//!
//! # Responsibility
//! - Produce depth-first project exports in the source's wire shape.
//!
//! # Invariants
//! - Strictly read-only; no statement here mutates state.
//! - Child listing is deterministic: `sort_order ASC, <uuid> ASC`.

use crate::model::export::{
    CategoryExport, ElementExport, FamilyExport, FamilyTypeExport, OwnerSummary, ProjectExport,
};
use crate::repo::{parse_uuid, RepoResult};
use rusqlite::{Connection, OptionalExtension};

/// Repository interface for reverse-direction export.
pub trait ExportRepository {
    /// Exports every project, or only the named one when a filter is given.
    fn export_projects(&self, project_filter: Option<&str>) -> RepoResult<Vec<ProjectExport>>;
}

/// SQLite-backed export repository.
pub struct SqliteExportRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteExportRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

struct ProjectRow {
    project_uuid: String,
    name: String,
    description: Option<String>,
    hours_logged: f64,
    source_tag: Option<String>,
    created_at: i64,
    owner_uuid: Option<String>,
}

impl ExportRepository for SqliteExportRepository<'_> {
    fn export_projects(&self, project_filter: Option<&str>) -> RepoResult<Vec<ProjectExport>> {
        const PROJECT_SELECT: &str = "SELECT
            project_uuid,
            name,
            description,
            hours_logged,
            source_tag,
            created_at,
            owner_uuid
         FROM projects";

        let mut project_rows = Vec::new();
        match project_filter {
            Some(name) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{PROJECT_SELECT}
                     WHERE name = ?1
                     ORDER BY created_at ASC, project_uuid ASC;"
                ))?;
                let mut rows = stmt.query([name])?;
                while let Some(row) = rows.next()? {
                    project_rows.push(parse_project_row(row)?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{PROJECT_SELECT}
                     ORDER BY created_at ASC, project_uuid ASC;"
                ))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    project_rows.push(parse_project_row(row)?);
                }
            }
        }

        let mut exports = Vec::with_capacity(project_rows.len());
        for project in project_rows {
            let owner = match project.owner_uuid.as_deref() {
                Some(owner_uuid) => load_owner_summary(self.conn, owner_uuid)?,
                None => None,
            };
            let categories = load_categories(self.conn, &project.project_uuid)?;
            exports.push(ProjectExport {
                project_uuid: parse_uuid(&project.project_uuid, "projects.project_uuid")?,
                name: project.name,
                description: project.description,
                hours_logged: project.hours_logged,
                source_tag: project.source_tag,
                created_at: project.created_at,
                owner,
                categories,
            });
        }
        Ok(exports)
    }
}

fn parse_project_row(row: &rusqlite::Row<'_>) -> RepoResult<ProjectRow> {
    Ok(ProjectRow {
        project_uuid: row.get("project_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        hours_logged: row.get("hours_logged")?,
        source_tag: row.get("source_tag")?,
        created_at: row.get("created_at")?,
        owner_uuid: row.get("owner_uuid")?,
    })
}

fn load_owner_summary(conn: &Connection, owner_uuid: &str) -> RepoResult<Option<OwnerSummary>> {
    let summary = conn
        .query_row(
            "SELECT owner_uuid, name, contact_address
             FROM owners
             WHERE owner_uuid = ?1;",
            [owner_uuid],
            |row| {
                let uuid_text: String = row.get(0)?;
                let name: String = row.get(1)?;
                let contact_address: String = row.get(2)?;
                Ok((uuid_text, name, contact_address))
            },
        )
        .optional()?;

    match summary {
        None => Ok(None),
        Some((uuid_text, name, contact_address)) => Ok(Some(OwnerSummary {
            owner_uuid: parse_uuid(&uuid_text, "owners.owner_uuid")?,
            name,
            contact_address,
        })),
    }
}

fn load_categories(conn: &Connection, project_uuid: &str) -> RepoResult<Vec<CategoryExport>> {
    let mut stmt = conn.prepare(
        "SELECT category_uuid, name, classification_code
         FROM categories
         WHERE project_uuid = ?1
         ORDER BY sort_order ASC, category_uuid ASC;",
    )?;
    let mut rows = stmt.query([project_uuid])?;

    let mut categories = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        categories.push(CategoryExport {
            category_uuid: parse_uuid(&uuid_text, "categories.category_uuid")?,
            name: row.get(1)?,
            classification_code: row.get(2)?,
            families: Vec::new(),
        });
    }

    for category in &mut categories {
        category.families = load_families(conn, &category.category_uuid.to_string())?;
    }
    Ok(categories)
}

fn load_families(conn: &Connection, category_uuid: &str) -> RepoResult<Vec<FamilyExport>> {
    let mut stmt = conn.prepare(
        "SELECT family_uuid, name, classification_code, external_id
         FROM families
         WHERE category_uuid = ?1
         ORDER BY sort_order ASC, family_uuid ASC;",
    )?;
    let mut rows = stmt.query([category_uuid])?;

    let mut families = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        families.push(FamilyExport {
            family_uuid: parse_uuid(&uuid_text, "families.family_uuid")?,
            name: row.get(1)?,
            classification_code: row.get(2)?,
            external_id: row.get(3)?,
            family_types: Vec::new(),
        });
    }

    for family in &mut families {
        family.family_types = load_family_types(conn, &family.family_uuid.to_string())?;
    }
    Ok(families)
}

fn load_family_types(conn: &Connection, family_uuid: &str) -> RepoResult<Vec<FamilyTypeExport>> {
    let mut stmt = conn.prepare(
        "SELECT type_uuid, name, classification_code, external_id
         FROM family_types
         WHERE family_uuid = ?1
         ORDER BY sort_order ASC, type_uuid ASC;",
    )?;
    let mut rows = stmt.query([family_uuid])?;

    let mut family_types = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        family_types.push(FamilyTypeExport {
            type_uuid: parse_uuid(&uuid_text, "family_types.type_uuid")?,
            name: row.get(1)?,
            classification_code: row.get(2)?,
            external_id: row.get(3)?,
            elements: Vec::new(),
        });
    }

    for family_type in &mut family_types {
        family_type.elements = load_elements(conn, &family_type.type_uuid.to_string())?;
    }
    Ok(family_types)
}

fn load_elements(conn: &Connection, type_uuid: &str) -> RepoResult<Vec<ElementExport>> {
    let mut stmt = conn.prepare(
        "SELECT element_uuid, name, classification_code, external_id
         FROM elements
         WHERE type_uuid = ?1
         ORDER BY sort_order ASC, element_uuid ASC;",
    )?;
    let mut rows = stmt.query([type_uuid])?;

    let mut elements = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get(0)?;
        elements.push(ElementExport {
            element_uuid: parse_uuid(&uuid_text, "elements.element_uuid")?,
            name: row.get(1)?,
            classification_code: row.get(2)?,
            external_id: row.get(3)?,
        });
    }
    Ok(elements)
}
