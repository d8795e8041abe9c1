//! Audit log repository: append-only record of external mutations.
//!
//! # Responsibility
//! - Append audit rows from externally attributable write paths.
//! - Expose read access over the log for operators and tests.
//!
//! # Invariants
//! - Rows are never updated or deleted; `audit_id` is a stable total order.
//! - Only the deletion path writes records today; the append API stays
//!   crate-internal so that remains enforceable.

use crate::model::entity::{AuditAction, AuditRecord, EntityKind};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const AUDIT_LIST_LIMIT_MAX: u32 = 500;

const AUDIT_SELECT_SQL: &str = "SELECT
    audit_id,
    actor,
    project_name,
    entity_kind,
    external_id,
    action,
    recorded_at,
    detail
FROM audit_records";

/// One pending audit row. Write access is crate-internal: audit records
/// are produced by the deletion path, not by arbitrary callers.
pub(crate) struct NewAuditRecord<'a> {
    pub actor: &'a str,
    pub project_name: &'a str,
    pub entity_kind: EntityKind,
    pub external_id: Option<i64>,
    pub action: AuditAction,
    /// JSON detail payload, stored verbatim.
    pub detail: &'a str,
}

pub(crate) fn append_record(conn: &Connection, record: &NewAuditRecord<'_>) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO audit_records (
            actor,
            project_name,
            entity_kind,
            external_id,
            action,
            detail
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            record.actor,
            record.project_name,
            record.entity_kind.as_str(),
            record.external_id,
            record.action.as_str(),
            record.detail,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Read interface over the audit log.
pub trait AuditRepository {
    /// Lists the newest records first. `limit` clamps to 1..=500.
    fn list_recent(&self, limit: u32) -> RepoResult<Vec<AuditRecord>>;
    /// Lists the newest records first for one project name.
    fn list_for_project(&self, project_name: &str, limit: u32) -> RepoResult<Vec<AuditRecord>>;
}

/// SQLite-backed audit log repository.
pub struct SqliteAuditRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuditRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AuditRepository for SqliteAuditRepository<'_> {
    fn list_recent(&self, limit: u32) -> RepoResult<Vec<AuditRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AUDIT_SELECT_SQL}
             ORDER BY audit_id DESC
             LIMIT ?1;"
        ))?;
        let mut rows = stmt.query([normalize_limit(limit)])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_audit_row(row)?);
        }
        Ok(records)
    }

    fn list_for_project(&self, project_name: &str, limit: u32) -> RepoResult<Vec<AuditRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{AUDIT_SELECT_SQL}
             WHERE project_name = ?1
             ORDER BY audit_id DESC
             LIMIT ?2;"
        ))?;
        let mut rows = stmt.query(params![project_name, normalize_limit(limit)])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_audit_row(row)?);
        }
        Ok(records)
    }
}

fn normalize_limit(limit: u32) -> u32 {
    limit.clamp(1, AUDIT_LIST_LIMIT_MAX)
}

fn parse_audit_row(row: &Row<'_>) -> RepoResult<AuditRecord> {
    let kind_text: String = row.get("entity_kind")?;
    let entity_kind = EntityKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid entity kind `{kind_text}` in audit_records.entity_kind"
        ))
    })?;

    let action_text: String = row.get("action")?;
    let action = AuditAction::parse(&action_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid action `{action_text}` in audit_records.action"
        ))
    })?;

    Ok(AuditRecord {
        audit_id: row.get("audit_id")?,
        actor: row.get("actor")?,
        project_name: row.get("project_name")?,
        entity_kind,
        external_id: row.get("external_id")?,
        action,
        recorded_at: row.get("recorded_at")?,
        detail: row.get("detail")?,
    })
}
