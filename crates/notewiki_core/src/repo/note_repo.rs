//! Note repository contracts plus file-backed and in-memory implementations.
//!
//! # Responsibility
//! - Load and persist notes as `<slug>.md` documents.
//! - Detect slug collisions at creation time.
//!
//! # Invariants
//! - Repositories never interpret note bodies.
//! - Writes replace one file atomically (temp file + rename); a failed
//!   write leaves the previous version untouched.
//! - Saving byte-identical content is a no-op.
//!
//! # See also
//! - `repo::front_matter` for the document layout.

use crate::model::note::{Note, NoteValidationError, Slug};
use crate::model::slug::is_valid_slug;
use crate::repo::front_matter::{parse_document, render_document, FrontMatterError};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// File extension used for note documents.
pub const NOTE_FILE_EXTENSION: &str = "md";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for note storage operations.
#[derive(Debug)]
pub enum RepoError {
    /// Note record failed validation before write.
    Validation(NoteValidationError),
    /// No note stored under this slug.
    NotFound(Slug),
    /// Another note already owns this slug.
    DuplicateSlug(Slug),
    /// Stored document cannot be decoded.
    InvalidData { slug: Slug, message: String },
    /// Underlying file operation failed.
    Io { path: PathBuf, source: io::Error },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(slug) => write!(f, "note not found: {slug}"),
            Self::DuplicateSlug(slug) => write!(f, "a note with slug `{slug}` already exists"),
            Self::InvalidData { slug, message } => {
                write!(f, "invalid stored note `{slug}`: {message}")
            }
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::NotFound(_) | Self::DuplicateSlug(_) | Self::InvalidData { .. } => None,
        }
    }
}

impl From<NoteValidationError> for RepoError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Outcome of a save call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// Document content changed and was written.
    Written,
    /// Stored document was already identical; nothing touched.
    Unchanged,
}

/// Repository interface for note persistence.
///
/// `cached_backlinks` is written into the document for readers of the raw
/// files; repositories store it verbatim and never derive it.
pub trait NoteRepository {
    /// Loads every readable note, ordered by slug.
    fn list_notes(&self) -> RepoResult<Vec<Note>>;
    /// Loads one note by slug.
    fn load_note(&self, slug: &str) -> RepoResult<Note>;
    /// Persists a new note; fails with `DuplicateSlug` instead of overwriting.
    fn create_note(&mut self, note: &Note, cached_backlinks: &[Slug]) -> RepoResult<()>;
    /// Persists a note, replacing any stored version.
    fn save_note(&mut self, note: &Note, cached_backlinks: &[Slug]) -> RepoResult<SaveStatus>;
    /// Removes a stored note.
    fn delete_note(&mut self, slug: &str) -> RepoResult<()>;
}

/// Directory-backed repository: one `<slug>.md` file per note.
#[derive(Debug, Clone)]
pub struct FsNoteRepository {
    notes_dir: PathBuf,
}

impl FsNoteRepository {
    /// Opens (and creates if missing) the notes directory.
    pub fn open(notes_dir: impl Into<PathBuf>) -> RepoResult<Self> {
        let notes_dir = notes_dir.into();
        fs::create_dir_all(&notes_dir).map_err(|source| RepoError::Io {
            path: notes_dir.clone(),
            source,
        })?;
        info!(
            "event=repo_open module=repo status=ok notes_dir={}",
            notes_dir.display()
        );
        Ok(Self { notes_dir })
    }

    /// Directory holding the note files.
    pub fn notes_dir(&self) -> &Path {
        &self.notes_dir
    }

    /// Path of the document for `slug`, whether or not it exists.
    pub fn note_path(&self, slug: &str) -> PathBuf {
        self.notes_dir
            .join(format!("{slug}.{NOTE_FILE_EXTENSION}"))
    }

    fn read_document(&self, slug: &str) -> RepoResult<String> {
        let path = self.note_path(slug);
        fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                RepoError::NotFound(slug.to_string())
            } else {
                RepoError::Io { path, source }
            }
        })
    }

    fn write_atomic(&self, slug: &str, content: &str, overwrite: bool) -> RepoResult<()> {
        let path = self.note_path(slug);
        let io_err = |source: io::Error| RepoError::Io {
            path: path.clone(),
            source,
        };

        let mut staged = NamedTempFile::new_in(&self.notes_dir).map_err(io_err)?;
        staged.write_all(content.as_bytes()).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;

        if overwrite {
            staged.persist(&path).map_err(|err| io_err(err.error))?;
        } else {
            staged.persist_noclobber(&path).map_err(|err| {
                if err.error.kind() == io::ErrorKind::AlreadyExists {
                    RepoError::DuplicateSlug(slug.to_string())
                } else {
                    io_err(err.error)
                }
            })?;
        }
        Ok(())
    }
}

impl NoteRepository for FsNoteRepository {
    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        let entries = fs::read_dir(&self.notes_dir).map_err(|source| RepoError::Io {
            path: self.notes_dir.clone(),
            source,
        })?;

        let mut notes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RepoError::Io {
                path: self.notes_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(NOTE_FILE_EXTENSION) {
                continue;
            }
            let Some(slug) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if !is_valid_slug(slug) {
                warn!(
                    "event=note_skip module=repo reason=invalid_slug path={}",
                    path.display()
                );
                continue;
            }
            // One unreadable file must not hide the rest of the wiki.
            match self.load_note(slug) {
                Ok(note) => notes.push(note),
                Err(err) => warn!(
                    "event=note_skip module=repo reason=load_failed slug={slug} error={err}"
                ),
            }
        }

        notes.sort_by(|a, b| a.slug.cmp(&b.slug));
        debug!(
            "event=notes_list module=repo status=ok count={}",
            notes.len()
        );
        Ok(notes)
    }

    fn load_note(&self, slug: &str) -> RepoResult<Note> {
        if !is_valid_slug(slug) {
            return Err(RepoError::NotFound(slug.to_string()));
        }
        let content = self.read_document(slug)?;
        decode(slug, &content)
    }

    fn create_note(&mut self, note: &Note, cached_backlinks: &[Slug]) -> RepoResult<()> {
        note.validate()?;
        let content = encode(note, cached_backlinks)?;
        self.write_atomic(&note.slug, &content, false)?;
        info!(
            "event=note_create module=repo status=ok slug={}",
            note.slug
        );
        Ok(())
    }

    fn save_note(&mut self, note: &Note, cached_backlinks: &[Slug]) -> RepoResult<SaveStatus> {
        note.validate()?;
        let content = encode(note, cached_backlinks)?;
        match self.read_document(&note.slug) {
            Ok(existing) if existing == content => {
                debug!(
                    "event=note_save module=repo status=unchanged slug={}",
                    note.slug
                );
                return Ok(SaveStatus::Unchanged);
            }
            Ok(_) | Err(RepoError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        self.write_atomic(&note.slug, &content, true)?;
        info!("event=note_save module=repo status=ok slug={}", note.slug);
        Ok(SaveStatus::Written)
    }

    fn delete_note(&mut self, slug: &str) -> RepoResult<()> {
        if !is_valid_slug(slug) {
            return Err(RepoError::NotFound(slug.to_string()));
        }
        let path = self.note_path(slug);
        fs::remove_file(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                RepoError::NotFound(slug.to_string())
            } else {
                RepoError::Io { path, source }
            }
        })?;
        info!("event=note_delete module=repo status=ok slug={slug}");
        Ok(())
    }
}

/// In-process repository storing rendered documents keyed by slug.
///
/// Goes through the same document codec as `FsNoteRepository`, so what
/// round-trips here round-trips on disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryNoteRepository {
    documents: BTreeMap<Slug, String>,
}

impl MemoryNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored document for `slug`.
    pub fn document(&self, slug: &str) -> Option<&str> {
        self.documents.get(slug).map(String::as_str)
    }

    /// Stores a raw document as if a user had written it by hand.
    pub fn insert_document(&mut self, slug: impl Into<Slug>, content: impl Into<String>) {
        self.documents.insert(slug.into(), content.into());
    }
}

impl NoteRepository for MemoryNoteRepository {
    fn list_notes(&self) -> RepoResult<Vec<Note>> {
        let mut notes = Vec::with_capacity(self.documents.len());
        for (slug, content) in &self.documents {
            match decode(slug, content) {
                Ok(note) => notes.push(note),
                Err(err) => warn!(
                    "event=note_skip module=repo reason=load_failed slug={slug} error={err}"
                ),
            }
        }
        Ok(notes)
    }

    fn load_note(&self, slug: &str) -> RepoResult<Note> {
        let content = self
            .documents
            .get(slug)
            .ok_or_else(|| RepoError::NotFound(slug.to_string()))?;
        decode(slug, content)
    }

    fn create_note(&mut self, note: &Note, cached_backlinks: &[Slug]) -> RepoResult<()> {
        note.validate()?;
        if self.documents.contains_key(&note.slug) {
            return Err(RepoError::DuplicateSlug(note.slug.clone()));
        }
        let content = encode(note, cached_backlinks)?;
        self.documents.insert(note.slug.clone(), content);
        Ok(())
    }

    fn save_note(&mut self, note: &Note, cached_backlinks: &[Slug]) -> RepoResult<SaveStatus> {
        note.validate()?;
        let content = encode(note, cached_backlinks)?;
        if self.documents.get(&note.slug) == Some(&content) {
            return Ok(SaveStatus::Unchanged);
        }
        self.documents.insert(note.slug.clone(), content);
        Ok(SaveStatus::Written)
    }

    fn delete_note(&mut self, slug: &str) -> RepoResult<()> {
        self.documents
            .remove(slug)
            .map(|_| ())
            .ok_or_else(|| RepoError::NotFound(slug.to_string()))
    }
}

fn decode(slug: &str, content: &str) -> RepoResult<Note> {
    parse_document(slug, content)
        .map(|document| document.note)
        .map_err(|err| invalid_data(slug, &err))
}

fn encode(note: &Note, cached_backlinks: &[Slug]) -> RepoResult<String> {
    render_document(note, cached_backlinks).map_err(|err| invalid_data(&note.slug, &err))
}

fn invalid_data(slug: &str, err: &FrontMatterError) -> RepoError {
    RepoError::InvalidData {
        slug: slug.to_string(),
        message: err.message.clone(),
    }
}
