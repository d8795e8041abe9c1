//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Own cross-cutting concerns the repositories must not know about:
//!   payload validation, per-project serialization, change-event fan-out.

pub mod binding_service;
pub mod deletion_service;
pub mod export_service;
pub mod import_service;
pub mod project_locks;
pub mod push_service;
