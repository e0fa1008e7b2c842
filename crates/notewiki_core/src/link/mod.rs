//! Cross-note reference handling.
//!
//! # Responsibility
//! - Extract `[[...]]` markers from note bodies (`extract`).
//! - Resolve marker targets to note slugs (`resolve`).
//!
//! # Invariants
//! - Extraction never looks at the corpus; resolution never looks at bodies.

pub mod extract;
pub mod resolve;
