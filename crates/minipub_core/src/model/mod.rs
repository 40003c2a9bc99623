//! Domain model for publishable content.
//!
//! # Responsibility
//! - Define the record shape and the status vocabulary used by every
//!   publishing section.
//!
//! # Invariants
//! - Every record is identified by a stable `RecordId`.
//! - Liveness is derived, never persisted.

pub mod record;
pub mod status;
