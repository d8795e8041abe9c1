//! External-id binding repository.
//!
//! # Responsibility
//! - Stamp authoring-platform ids onto persisted rows by internal id.
//!
//! # Invariants
//! - A binding touches exactly one scalar column on one row; no cascades.
//! - A missing row is skipped silently: a later tree replace may have
//!   removed the target, and the source cannot know that yet.
//! - Re-binding the same value is a no-op; a different value overwrites.

use crate::model::entity::{BindingReport, ExternalIdBinding};
use crate::repo::{kind_table, RepoResult};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};

/// Repository interface for external-id stamping.
pub trait BindingRepository {
    /// Applies one batch; returns applied/skipped counts.
    fn bind_external_ids(&self, batch: &[ExternalIdBinding]) -> RepoResult<BindingReport>;
}

/// SQLite-backed binding repository.
pub struct SqliteBindingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBindingRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BindingRepository for SqliteBindingRepository<'_> {
    fn bind_external_ids(&self, batch: &[ExternalIdBinding]) -> RepoResult<BindingReport> {
        let mut report = BindingReport::default();
        if batch.is_empty() {
            return Ok(report);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for binding in batch {
            let (table, pk_column) = kind_table(binding.kind);
            let changed = tx.execute(
                &format!("UPDATE {table} SET external_id = ?1 WHERE {pk_column} = ?2;"),
                params![binding.external_id, binding.internal_id.to_string()],
            )?;
            if changed == 0 {
                report.skipped += 1;
            } else {
                report.applied += 1;
            }
        }
        tx.commit()?;

        Ok(report)
    }
}
