//! Publication policy: liveness, filtering, lifecycle, access and sitemaps.
//!
//! # Responsibility
//! - Decide whether a record is publicly visible on a given day.
//! - Apply that decision to single records, storage queries, section views
//!   and sitemap feeds consistently.
//!
//! # Invariants
//! - The predicate (`liveness`) and its SQL form (`filter`) never disagree.
//! - "Now" enters through explicit arguments, never through a clock read
//!   inside the policy.

pub mod filter;
pub mod gate;
pub mod lifecycle;
pub mod liveness;
pub mod sitemap;
