//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository, index and rendering calls into wiki use-cases.
//! - Keep the CLI decoupled from storage and indexing details.

pub mod wiki_service;
