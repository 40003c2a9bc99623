//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract the publication policy needs.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes run the pre-save lifecycle hook.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod record_repo;
