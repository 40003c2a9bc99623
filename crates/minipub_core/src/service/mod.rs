//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate gate, filter and repository calls into section views.
//! - Keep the CLI/request layer decoupled from storage details.

pub mod publication_service;
