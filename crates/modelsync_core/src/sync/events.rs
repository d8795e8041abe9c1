//! Change-event fan-out registry for live observers.
//!
//! # Responsibility
//! - Hold registered observers with explicit register/deregister lifecycle.
//! - Broadcast change events best-effort after write paths commit.
//!
//! # Invariants
//! - Zero observers is a valid state; broadcast is then a no-op.
//! - One failing observer never blocks delivery to the others and never
//!   propagates into the write path.
//! - Observers are invoked outside the registry lock.

use crate::model::entity::EntityKind;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Change notification produced after a write path commits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    ProjectSynced {
        project_name: String,
        owner_name: String,
        categories_synced: usize,
    },
    EntityDeleted {
        kind: EntityKind,
        external_id: i64,
        project_name: String,
    },
}

/// Delivery failure reported by one observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError {
    pub message: String,
}

impl NotifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for NotifyError {}

/// One registered consumer of change events.
///
/// Implementations must return quickly; slow or blocking delivery belongs
/// behind the implementation's own queue, not in the core write path.
pub trait ChangeObserver: Send + Sync {
    /// Stable registry key: lowercase ascii, digits, `_`, `-`.
    fn observer_id(&self) -> &str;
    fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError>;
}

/// Registration/lookup errors for the observer registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverRegistryError {
    InvalidObserverId(String),
    DuplicateObserverId(String),
    ObserverNotFound(String),
}

impl Display for ObserverRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidObserverId(value) => write!(f, "observer id is invalid: {value}"),
            Self::DuplicateObserverId(value) => {
                write!(f, "observer id already registered: {value}")
            }
            Self::ObserverNotFound(value) => write!(f, "observer not found: {value}"),
        }
    }
}

impl Error for ObserverRegistryError {}

/// Runtime observer registry with best-effort broadcast.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<BTreeMap<String, Arc<dyn ChangeObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one observer under its id.
    pub fn register(&self, observer: Arc<dyn ChangeObserver>) -> Result<(), ObserverRegistryError> {
        let observer_id = observer.observer_id().trim().to_string();
        if !is_valid_observer_id(&observer_id) {
            return Err(ObserverRegistryError::InvalidObserverId(observer_id));
        }

        let mut observers = self.lock_observers();
        if observers.contains_key(observer_id.as_str()) {
            return Err(ObserverRegistryError::DuplicateObserverId(observer_id));
        }
        observers.insert(observer_id.clone(), observer);
        info!("event=observer_register module=sync status=ok observer={observer_id}");
        Ok(())
    }

    /// Removes one observer by id.
    pub fn deregister(&self, observer_id: &str) -> Result<(), ObserverRegistryError> {
        let normalized = observer_id.trim();
        let mut observers = self.lock_observers();
        if observers.remove(normalized).is_none() {
            return Err(ObserverRegistryError::ObserverNotFound(
                normalized.to_string(),
            ));
        }
        info!("event=observer_deregister module=sync status=ok observer={normalized}");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock_observers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_observers().is_empty()
    }

    /// Returns sorted observer ids.
    pub fn observer_ids(&self) -> Vec<String> {
        self.lock_observers().keys().cloned().collect()
    }

    /// Delivers one event to every observer; returns how many accepted it.
    ///
    /// Failures are logged and swallowed so a misbehaving observer cannot
    /// fail the write path that produced the event.
    pub fn broadcast(&self, event: &ChangeEvent) -> usize {
        let snapshot: Vec<(String, Arc<dyn ChangeObserver>)> = self
            .lock_observers()
            .iter()
            .map(|(id, observer)| (id.clone(), Arc::clone(observer)))
            .collect();

        if snapshot.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        for (observer_id, observer) in snapshot {
            match observer.notify(event) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(
                        "event=observer_notify module=sync status=error observer={observer_id} error={err}"
                    );
                }
            }
        }
        delivered
    }

    fn lock_observers(
        &self,
    ) -> std::sync::MutexGuard<'_, BTreeMap<String, Arc<dyn ChangeObserver>>> {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn is_valid_observer_id(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::{ChangeEvent, ChangeObserver, NotifyError, ObserverRegistry, ObserverRegistryError};
    use std::sync::{Arc, Mutex};

    struct RecordingObserver {
        observer_id: String,
        seen: Mutex<Vec<ChangeEvent>>,
        fail: bool,
    }

    impl RecordingObserver {
        fn new(observer_id: &str, fail: bool) -> Self {
            Self {
                observer_id: observer_id.to_string(),
                seen: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl ChangeObserver for RecordingObserver {
        fn observer_id(&self) -> &str {
            &self.observer_id
        }

        fn notify(&self, event: &ChangeEvent) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::new("observer down"));
            }
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn sample_event() -> ChangeEvent {
        ChangeEvent::ProjectSynced {
            project_name: "Tower A".to_string(),
            owner_name: "Ana".to_string(),
            categories_synced: 1,
        }
    }

    #[test]
    fn broadcast_with_zero_observers_is_noop() {
        let registry = ObserverRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.broadcast(&sample_event()), 0);
    }

    #[test]
    fn broadcast_delivers_to_all_registered_observers() {
        let registry = ObserverRegistry::new();
        let first = Arc::new(RecordingObserver::new("viewer-1", false));
        let second = Arc::new(RecordingObserver::new("viewer-2", false));
        registry.register(first.clone()).expect("first registers");
        registry.register(second.clone()).expect("second registers");

        assert_eq!(registry.broadcast(&sample_event()), 2);
        assert_eq!(first.seen.lock().unwrap().len(), 1);
        assert_eq!(second.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn failing_observer_does_not_block_others() {
        let registry = ObserverRegistry::new();
        let broken = Arc::new(RecordingObserver::new("broken", true));
        let healthy = Arc::new(RecordingObserver::new("healthy", false));
        registry.register(broken).expect("broken registers");
        registry.register(healthy.clone()).expect("healthy registers");

        assert_eq!(registry.broadcast(&sample_event()), 1);
        assert_eq!(healthy.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn rejects_invalid_and_duplicate_observer_ids() {
        let registry = ObserverRegistry::new();
        let invalid = registry.register(Arc::new(RecordingObserver::new("Viewer One", false)));
        assert!(matches!(
            invalid,
            Err(ObserverRegistryError::InvalidObserverId(_))
        ));

        registry
            .register(Arc::new(RecordingObserver::new("viewer-1", false)))
            .expect("first registers");
        let duplicate = registry.register(Arc::new(RecordingObserver::new("viewer-1", false)));
        assert!(matches!(
            duplicate,
            Err(ObserverRegistryError::DuplicateObserverId(_))
        ));
    }

    #[test]
    fn deregister_removes_observer() {
        let registry = ObserverRegistry::new();
        registry
            .register(Arc::new(RecordingObserver::new("viewer-1", false)))
            .expect("registers");
        registry.deregister("viewer-1").expect("deregisters");
        assert!(registry.is_empty());

        let missing = registry.deregister("viewer-1");
        assert!(matches!(
            missing,
            Err(ObserverRegistryError::ObserverNotFound(_))
        ));
    }
}
