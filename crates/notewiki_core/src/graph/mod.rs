//! Presentation of the backlink graph.

pub mod render;
