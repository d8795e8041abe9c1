//! Deletion repository: external-id-driven removal with audit capture.
//!
//! # Responsibility
//! - Resolve rows by external id (unlike the binding path, which is
//!   internal-id-driven) and remove them with their descendants.
//! - Append the delete audit record inside the same transaction.
//!
//! # Invariants
//! - Delete and audit append commit together or not at all.
//! - "Already gone" is a distinct soft outcome, never an error.

use crate::model::entity::{AuditAction, DeletionOutcome, EntityKind};
use crate::repo::audit_repo::{append_record, NewAuditRecord};
use crate::repo::{kind_table, RepoError, RepoResult};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Repository interface for external-id deletions.
pub trait DeletionRepository {
    /// Deletes the row of `kind` carrying `external_id`, cascading to
    /// descendants, and records the mutation under `actor`.
    fn delete_by_external_id(
        &self,
        kind: EntityKind,
        external_id: i64,
        actor: &str,
    ) -> RepoResult<DeletionOutcome>;
}

/// SQLite-backed deletion repository.
pub struct SqliteDeletionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDeletionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DeletionRepository for SqliteDeletionRepository<'_> {
    fn delete_by_external_id(
        &self,
        kind: EntityKind,
        external_id: i64,
        actor: &str,
    ) -> RepoResult<DeletionOutcome> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (table, pk_column) = kind_table(kind);

        // External ids carry no uniqueness constraint; take the oldest row
        // deterministically when duplicates exist.
        let target = tx
            .query_row(
                &format!(
                    "SELECT {pk_column}, name
                     FROM {table}
                     WHERE external_id = ?1
                     ORDER BY {pk_column} ASC
                     LIMIT 1;"
                ),
                [external_id],
                |row| {
                    let row_uuid: String = row.get(0)?;
                    let name: String = row.get(1)?;
                    Ok((row_uuid, name))
                },
            )
            .optional()?;

        let Some((row_uuid, name)) = target else {
            return Ok(DeletionOutcome::NotFound { kind, external_id });
        };

        let project_name = owning_project_name(&tx, kind, &row_uuid)?;

        tx.execute(
            &format!("DELETE FROM {table} WHERE {pk_column} = ?1;"),
            [row_uuid.as_str()],
        )?;

        let detail = serde_json::json!({ "name": name }).to_string();
        append_record(
            &tx,
            &NewAuditRecord {
                actor,
                project_name: &project_name,
                entity_kind: kind,
                external_id: Some(external_id),
                action: AuditAction::Delete,
                detail: &detail,
            },
        )?;

        tx.commit()?;
        Ok(DeletionOutcome::Deleted {
            kind,
            external_id,
            name,
            project_name,
        })
    }
}

fn owning_project_name(
    conn: &Connection,
    kind: EntityKind,
    row_uuid: &str,
) -> RepoResult<String> {
    let sql = match kind {
        EntityKind::Family => {
            "SELECT p.name
             FROM projects p
             JOIN categories c ON c.project_uuid = p.project_uuid
             JOIN families f ON f.category_uuid = c.category_uuid
             WHERE f.family_uuid = ?1;"
        }
        EntityKind::FamilyType => {
            "SELECT p.name
             FROM projects p
             JOIN categories c ON c.project_uuid = p.project_uuid
             JOIN families f ON f.category_uuid = c.category_uuid
             JOIN family_types t ON t.family_uuid = f.family_uuid
             WHERE t.type_uuid = ?1;"
        }
        EntityKind::Element => {
            "SELECT p.name
             FROM projects p
             JOIN categories c ON c.project_uuid = p.project_uuid
             JOIN families f ON f.category_uuid = c.category_uuid
             JOIN family_types t ON t.family_uuid = f.family_uuid
             JOIN elements e ON e.type_uuid = t.type_uuid
             WHERE e.element_uuid = ?1;"
        }
    };

    conn.query_row(sql, [row_uuid], |row| row.get(0))
        .optional()?
        .ok_or_else(|| {
            RepoError::InvalidData(format!("{kind} row `{row_uuid}` has no owning project"))
        })
}
