//! Wiki domain model.
//!
//! # Responsibility
//! - Define the note record shared by storage, linking and search.
//! - Own slug derivation so every layer agrees on note identity.
//!
//! # Invariants
//! - Every note is identified by a stable `Slug`.
//! - Derived data (backlinks) never lives on the record itself.

pub mod note;
pub mod slug;
