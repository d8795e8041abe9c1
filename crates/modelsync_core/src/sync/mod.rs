//! Collaborator seams for the sync core.
//!
//! # Responsibility
//! - Define the change-event fan-out contract for live observers.
//! - Define credential/remote-catalog SPI traits for outbound sync.
//!
//! # Invariants
//! - Nothing in this module performs network or store I/O itself;
//!   collaborators plug in behind the traits.

pub mod events;
pub mod remote;
