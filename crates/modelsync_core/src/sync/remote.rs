//! SPI traits for the remote authoring platform.
//!
//! # Responsibility
//! - Define the credential and catalog capabilities the import path needs.
//! - Provide the single-flight guard that keeps polls from overlapping.
//!
//! # Invariants
//! - Token lifetime/refresh is entirely the provider's concern; core only
//!   consumes one bearer string per run.
//! - At most one `SingleFlight` run is active at a time.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};

/// Failure reported by an upstream collaborator (credential acquisition or
/// remote fetch). The cause is carried verbatim, never swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamError {
    /// Stable machine-readable code, e.g. `token_rejected`.
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl UpstreamError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }
}

impl Display for UpstreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error for UpstreamError {}

/// Capability that yields a bearer credential for outbound platform calls.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Result<String, UpstreamError>;
}

/// One project entry listed by the remote platform catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteProjectEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Platform-side project identifier, stored for later cross-reference.
    #[serde(default)]
    pub external_ref: Option<String>,
}

/// Capability that lists the remote platform's project catalog.
pub trait RemoteCatalog: Send + Sync {
    fn list_projects(&self, bearer_token: &str) -> Result<Vec<RemoteProjectEntry>, UpstreamError>;
}

/// Mutual exclusion for the periodic poll: a run must not start while a
/// previous one is still in progress.
#[derive(Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the flight slot. Returns `None` when a run is already active;
    /// the slot is released when the guard drops.
    pub fn try_begin(&self) -> Option<SingleFlightGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(SingleFlightGuard { busy: &self.busy })
        } else {
            None
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

pub struct SingleFlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for SingleFlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::SingleFlight;

    #[test]
    fn second_begin_is_refused_while_guard_lives() {
        let flight = SingleFlight::new();
        let guard = flight.try_begin().expect("first begin succeeds");
        assert!(flight.is_busy());
        assert!(flight.try_begin().is_none());
        drop(guard);
        assert!(!flight.is_busy());
        assert!(flight.try_begin().is_some());
    }
}
