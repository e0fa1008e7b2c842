//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the note storage contract used by the wiki service.
//! - Isolate file layout and document encoding from linking logic.
//!
//! # Invariants
//! - Repository writes must enforce `Note::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateSlug`) in
//!   addition to I/O errors.

pub mod front_matter;
pub mod note_repo;
