//! Derived indexes over the note corpus.
//!
//! # See also
//! - `link` for the extraction and resolution steps the index composes.

pub mod backlinks;
