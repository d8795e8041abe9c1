//! Per-project mutual exclusion for tree-replace operations.
//!
//! # Responsibility
//! - Hand out one lock handle per project name so concurrent pushes for
//!   the same project serialize while different projects run freely.
//!
//! # Invariants
//! - The registry is injected state owned by the caller, never a process
//!   global.
//! - Lock handles are stable: repeated lookups for one name return the
//!   same underlying mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Registry of per-project-name locks.
///
/// The replace-then-insert sequence inside a push is not safe to interleave
/// for one project; row-level isolation alone cannot prevent lost or
/// duplicated categories. Callers take the handle for the project name and
/// hold it across the whole push.
#[derive(Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock handle for one project name, creating it on first
    /// sight.
    pub fn handle(&self, project_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(project_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of project names seen so far.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Acquires the guard for one handle, recovering from poisoning: a panic
/// in a previous holder must not wedge every future push for the project.
pub fn acquire(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::ProjectLocks;
    use std::sync::Arc;

    #[test]
    fn same_project_name_returns_same_handle() {
        let locks = ProjectLocks::new();
        let first = locks.handle("Tower A");
        let second = locks.handle("Tower A");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn different_project_names_get_independent_handles() {
        let locks = ProjectLocks::new();
        let first = locks.handle("Tower A");
        let second = locks.handle("Tower B");
        assert!(!Arc::ptr_eq(&first, &second));

        // Holding one project's lock must not block the other's.
        let _guard = first.lock().expect("first lock");
        let other = second.try_lock();
        assert!(other.is_ok());
    }
}
