//! Core domain logic for the notewiki backlink engine.
//! This crate is the single source of truth for note, link and index
//! invariants; the CLI only formats what it returns.

pub mod config;
pub mod editor;
pub mod graph;
pub mod index;
pub mod link;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::{ConfigError, ConfigOverrides, WikiConfig};
pub use editor::{CommandEditor, Editor, EditorError};
pub use graph::render::render_backlink_tree;
pub use index::backlinks::{
    BacklinkIndex, BacklinkMap, IndexReport, OutboundLink, UnresolvedReference, UpdateMode,
};
pub use link::extract::{extract, RawReference};
pub use link::resolve::{resolve, Ambiguity, MatchTier, Resolution, Resolver};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::note::{Note, NoteValidationError, Slug};
pub use model::slug::slugify;
pub use repo::note_repo::{
    FsNoteRepository, MemoryNoteRepository, NoteRepository, RepoError, RepoResult, SaveStatus,
};
pub use search::text::{search_notes, MatchField, SearchHit, SearchQuery};
pub use service::wiki_service::{
    DeleteOutcome, LinkedNote, NewNote, NoteEdit, NoteView, RenameOutcome, WikiError, WikiService,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
