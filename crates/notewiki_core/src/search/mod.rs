//! Search entry points.
//!
//! # Responsibility
//! - Expose substring search over the loaded corpus.
//! - Keep search result shaping inside core.

pub mod text;
