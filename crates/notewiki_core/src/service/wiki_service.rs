//! Wiki use-case service.
//!
//! # Responsibility
//! - Provide `new/view/edit/delete/list/search/rename/check` over a note
//!   repository.
//! - Keep the backlink index equal to a full rebuild after every mutation.
//! - Write refreshed backlink caches into affected note files.
//!
//! # Invariants
//! - The in-memory corpus is sorted by slug.
//! - A mutation is committed to memory only after its primary write
//!   succeeded; a failed write leaves corpus and index untouched.
//! - Backlink cache writes are best-effort: the index is authoritative and
//!   a failed cache refresh is logged, not returned.
//! - Slugs never change except through `rename_note` with `update_slug`.

use crate::editor::{Editor, EditorError};
use crate::graph::render::render_backlink_tree;
use crate::index::backlinks::{BacklinkIndex, IndexReport, OutboundLink, UnresolvedReference};
use crate::link::resolve::{Ambiguity, Resolution};
use crate::model::note::{
    normalize_aliases, normalize_tag, normalize_tags, normalize_title, Note, NoteValidationError,
    Slug,
};
use crate::model::slug::slugify;
use crate::repo::front_matter::{parse_document, render_document};
use crate::repo::note_repo::{NoteRepository, RepoError, SaveStatus};
use crate::search::text::{search_notes, SearchHit, SearchQuery};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};

/// Service error for wiki use-cases.
#[derive(Debug)]
pub enum WikiError {
    /// Title, tag or alias input is invalid.
    Validation(NoteValidationError),
    /// No note matches the given title, alias or slug.
    NotFound(String),
    /// Another note already owns the slug derived from the title.
    DuplicateSlug(Slug),
    /// Alias is already claimed by another note.
    AliasConflict { alias: String, owner: Slug },
    /// Edited document could not be parsed.
    InvalidDocument { slug: Slug, message: String },
    /// External editor failed.
    Editor(EditorError),
    /// Scratch file handling for interactive edits failed.
    Scratch(io::Error),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for WikiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(target) => write!(f, "wiki note not found: {target}"),
            Self::DuplicateSlug(slug) => {
                write!(f, "a wiki note with slug `{slug}` already exists")
            }
            Self::AliasConflict { alias, owner } => {
                write!(f, "alias `{alias}` is already used by `{owner}`")
            }
            Self::InvalidDocument { slug, message } => {
                write!(f, "edited note `{slug}` is not valid: {message}")
            }
            Self::Editor(err) => write!(f, "{err}"),
            Self::Scratch(err) => write!(f, "scratch file error: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WikiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Editor(err) => Some(err),
            Self::Scratch(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for WikiError {
    fn from(value: NoteValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for WikiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(slug) => Self::NotFound(slug),
            RepoError::DuplicateSlug(slug) => Self::DuplicateSlug(slug),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<EditorError> for WikiError {
    fn from(value: EditorError) -> Self {
        Self::Editor(value)
    }
}

/// Input for `create_note`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewNote {
    pub title: String,
    pub tags: Vec<String>,
    pub aliases: Vec<String>,
    /// `None` uses the default outline.
    pub body: Option<String>,
}

impl NewNote {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|alias| alias.to_string()).collect();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|tag| tag.to_string()).collect();
        self
    }
}

/// Field replacements for `edit_note`; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteEdit {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub aliases: Option<Vec<String>>,
    pub body: Option<String>,
}

impl NoteEdit {
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.tags.is_none() && self.aliases.is_none() && self.body.is_none()
    }
}

/// Slug plus display title of a related note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedNote {
    pub slug: Slug,
    pub title: String,
}

/// Read model for one note with its link neighborhood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteView {
    pub note: Note,
    /// Referencing notes, ordered by slug.
    pub backlinks: Vec<LinkedNote>,
    /// Outbound references in body order.
    pub outbound: Vec<OutboundLink>,
    /// Set when the lookup target itself was ambiguous.
    pub lookup_ambiguity: Option<Ambiguity>,
}

impl NoteView {
    /// Outbound references that match no note.
    pub fn unresolved(&self) -> impl Iterator<Item = &OutboundLink> {
        self.outbound
            .iter()
            .filter(|link| link.resolution == Resolution::Unresolved)
    }

    /// Human-readable non-fatal findings for this note.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Some(ambiguity) = &self.lookup_ambiguity {
            warnings.push(ambiguity.to_string());
        }
        for link in &self.outbound {
            if let Some(ambiguity) = link.resolution.ambiguity() {
                warnings.push(ambiguity.to_string());
            }
        }
        warnings
    }
}

/// Result of `delete_note`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub note: Note,
    /// Other notes whose references to the deleted note are now unresolved.
    pub dangling_sources: Vec<Slug>,
    /// Set when the lookup target matched several notes.
    pub lookup_ambiguity: Option<Ambiguity>,
}

/// Result of `rename_note`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub view: NoteView,
    pub previous_slug: Slug,
    /// References that resolved to the note before the rename and no longer do.
    pub broken_references: Vec<UnresolvedReference>,
}

/// Wiki service facade over a note repository.
pub struct WikiService<R: NoteRepository> {
    repo: R,
    notes: Vec<Note>,
    index: BacklinkIndex,
}

impl<R: NoteRepository> WikiService<R> {
    /// Loads the corpus from `repo` and builds the backlink index.
    pub fn open(repo: R) -> Result<Self, WikiError> {
        let mut service = Self {
            repo,
            notes: Vec::new(),
            index: BacklinkIndex::default(),
        };
        service.reload()?;
        Ok(service)
    }

    /// Re-reads every note and rebuilds the index from scratch.
    ///
    /// On failure the previously loaded state is kept.
    pub fn reload(&mut self) -> Result<(), WikiError> {
        let mut notes = self.repo.list_notes()?;
        notes.sort_by(|a, b| a.slug.cmp(&b.slug));
        let index = BacklinkIndex::rebuild(&notes);
        info!(
            "event=wiki_load module=service status=ok notes={} edges={}",
            notes.len(),
            index.edge_count()
        );
        self.notes = notes;
        self.index = index;
        Ok(())
    }

    /// Loaded notes, ordered by slug.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn index(&self) -> &BacklinkIndex {
        &self.index
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates a note; the slug is derived from the title.
    ///
    /// # Errors
    /// - `DuplicateSlug` when another note already owns the derived slug.
    /// - `AliasConflict` when an alias is claimed by another note.
    /// - `Validation` for blank titles, tags or aliases.
    pub fn create_note(&mut self, draft: NewNote) -> Result<NoteView, WikiError> {
        let mut note = Note::new(draft.title)?;
        if self.index.resolver().contains_slug(&note.slug) {
            return Err(WikiError::DuplicateSlug(note.slug));
        }
        note.tags = normalize_tags(&draft.tags)?;
        note.aliases = normalize_aliases(&draft.aliases)?;
        self.ensure_aliases_free(&note.aliases, None)?;
        note.body = draft.body.unwrap_or_else(|| default_body(&note.title));

        let slug = note.slug.clone();
        self.upsert(note, true)?;
        info!("event=note_create module=service status=ok slug={slug}");
        self.view_of(&slug, None)
    }

    /// Looks up a note by title, alias or slug.
    pub fn view_note(&self, target: &str) -> Result<NoteView, WikiError> {
        let (slug, ambiguity) = self.lookup(target)?;
        self.view_of(&slug, ambiguity)
    }

    /// Looks up a note by its exact slug, bypassing title and alias matching.
    pub fn view_by_slug(&self, slug: &str) -> Result<NoteView, WikiError> {
        self.view_of(slug, None)
    }

    /// Renders the backlink tree of the note matching `target`.
    pub fn render_graph(&self, target: &str, depth_limit: Option<usize>) -> Result<String, WikiError> {
        let (slug, _) = self.lookup(target)?;
        self.render_graph_for_slug(&slug, depth_limit)
    }

    /// Renders the backlink tree rooted at an exact slug.
    pub fn render_graph_for_slug(
        &self,
        slug: &str,
        depth_limit: Option<usize>,
    ) -> Result<String, WikiError> {
        render_backlink_tree(&self.index, &self.notes, slug, depth_limit)
            .ok_or_else(|| WikiError::NotFound(slug.to_string()))
    }

    /// Applies field replacements to the note matching `target`.
    pub fn edit_note(&mut self, target: &str, edit: NoteEdit) -> Result<NoteView, WikiError> {
        let (slug, ambiguity) = self.lookup(target)?;
        let mut view = self.edit_by_slug(&slug, edit)?;
        view.lookup_ambiguity = ambiguity;
        Ok(view)
    }

    /// Lets the user edit the note in an external editor.
    ///
    /// The editor works on a scratch copy; the edited front-matter and body
    /// go through the normal edit path, so the slug stays fixed and the
    /// `backlinks` field is ignored.
    pub fn edit_with_editor(&mut self, target: &str, editor: &dyn Editor) -> Result<NoteView, WikiError> {
        let (slug, ambiguity) = self.lookup(target)?;
        let mut view = self.edit_with_editor_by_slug(&slug, editor)?;
        view.lookup_ambiguity = ambiguity;
        Ok(view)
    }

    /// Interactive edit of the note stored under an exact slug.
    pub fn edit_with_editor_by_slug(
        &mut self,
        slug: &str,
        editor: &dyn Editor,
    ) -> Result<NoteView, WikiError> {
        let note = self.note(slug)?.clone();
        let slug = note.slug.clone();
        let original = render_document(&note, &self.backlink_slugs(&slug)).map_err(|err| {
            WikiError::InvalidDocument {
                slug: slug.clone(),
                message: err.message,
            }
        })?;

        let mut scratch = tempfile::Builder::new()
            .prefix(&format!("{slug}-"))
            .suffix(".md")
            .tempfile()
            .map_err(WikiError::Scratch)?;
        scratch
            .write_all(original.as_bytes())
            .and_then(|()| scratch.flush())
            .map_err(WikiError::Scratch)?;

        editor.open(scratch.path())?;

        let edited = std::fs::read_to_string(scratch.path()).map_err(WikiError::Scratch)?;
        if edited == original {
            info!("event=note_edit module=service status=unchanged slug={slug}");
            return self.view_of(&slug, None);
        }
        let document = parse_document(&slug, &edited).map_err(|err| WikiError::InvalidDocument {
            slug: slug.clone(),
            message: err.message,
        })?;
        let changed = document.note;
        self.edit_by_slug(
            &slug,
            NoteEdit {
                title: Some(changed.title),
                tags: Some(changed.tags.into_iter().collect()),
                aliases: Some(changed.aliases),
                body: Some(changed.body),
            },
        )
    }

    /// Deletes the note matching `target` and prunes it from the index.
    pub fn delete_note(&mut self, target: &str) -> Result<DeleteOutcome, WikiError> {
        let (slug, ambiguity) = self.lookup(target)?;
        let mut outcome = self.delete_by_slug(&slug)?;
        outcome.lookup_ambiguity = ambiguity;
        Ok(outcome)
    }

    /// Deletes the note stored under an exact slug.
    pub fn delete_by_slug(&mut self, slug: &str) -> Result<DeleteOutcome, WikiError> {
        let removed = self.note(slug)?.clone();
        let slug = removed.slug.clone();
        let dangling_sources = self
            .backlink_slugs(&slug)
            .into_iter()
            .filter(|source| source != &slug)
            .collect::<Vec<_>>();

        let notes = self
            .notes
            .iter()
            .filter(|note| note.slug != slug)
            .cloned()
            .collect::<Vec<_>>();
        let mut index = self.index.clone();
        index.remove_note(&notes, &slug);

        self.repo.delete_note(&slug)?;
        self.commit(notes, index, &[]);
        info!(
            "event=note_delete module=service status=ok slug={slug} dangling={}",
            dangling_sources.len()
        );
        Ok(DeleteOutcome {
            note: removed,
            dangling_sources,
            lookup_ambiguity: None,
        })
    }

    /// Changes a note's title, optionally moving it to the matching slug.
    ///
    /// Inbound references are never rewritten; the outcome lists those that
    /// stopped resolving to this note.
    pub fn rename_note(
        &mut self,
        target: &str,
        new_title: &str,
        update_slug: bool,
    ) -> Result<RenameOutcome, WikiError> {
        let (slug, ambiguity) = self.lookup(target)?;
        let mut outcome = self.rename_by_slug(&slug, new_title, update_slug)?;
        outcome.view.lookup_ambiguity = ambiguity;
        Ok(outcome)
    }

    /// Renames the note stored under an exact slug.
    pub fn rename_by_slug(
        &mut self,
        slug: &str,
        new_title: &str,
        update_slug: bool,
    ) -> Result<RenameOutcome, WikiError> {
        let mut renamed = self.note(slug)?.clone();
        let previous_slug = renamed.slug.clone();
        renamed.title = normalize_title(new_title.to_string())?;

        if update_slug {
            let new_slug = slugify(&renamed.title);
            if new_slug.is_empty() {
                return Err(NoteValidationError::UnsluggableTitle(renamed.title).into());
            }
            if new_slug != previous_slug && self.index.resolver().contains_slug(&new_slug) {
                return Err(WikiError::DuplicateSlug(new_slug));
            }
            renamed.slug = new_slug;
        }

        let before = self.index.clone();
        if renamed.slug == previous_slug {
            self.upsert(renamed.clone(), false)?;
        } else {
            self.move_note(&previous_slug, renamed.clone())?;
        }

        let broken_references = self
            .index
            .report()
            .unresolved
            .into_iter()
            .filter(|reference| {
                before.resolver().resolve(&reference.target).slug() == Some(previous_slug.as_str())
            })
            .collect::<Vec<_>>();
        info!(
            "event=note_rename module=service status=ok slug={} previous_slug={previous_slug} broken={}",
            renamed.slug,
            broken_references.len()
        );
        Ok(RenameOutcome {
            view: self.view_of(&renamed.slug, None)?,
            previous_slug,
            broken_references,
        })
    }

    /// Notes sorted by title (case-insensitive), optionally filtered by tag.
    pub fn list_notes(&self, tag: Option<&str>) -> Vec<&Note> {
        let tag = tag.and_then(normalize_tag);
        let mut listed = self
            .notes
            .iter()
            .filter(|note| tag.as_ref().map_or(true, |tag| note.tags.contains(tag)))
            .collect::<Vec<_>>();
        listed.sort_by(|a, b| {
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.slug.cmp(&b.slug))
        });
        listed
    }

    /// Substring search over the loaded corpus.
    pub fn search(&self, query: &SearchQuery) -> Vec<SearchHit> {
        search_notes(&self.notes, query)
    }

    /// Unresolved references, ambiguities and alias conflicts.
    pub fn check(&self) -> IndexReport {
        self.index.report()
    }

    /// Reloads from storage and rewrites every stale backlink cache.
    ///
    /// Returns the number of files rewritten.
    pub fn reindex(&mut self) -> Result<usize, WikiError> {
        self.reload()?;
        let mut written = 0;
        for note in &self.notes {
            let backlinks = self.backlink_slugs(&note.slug);
            if self.repo.save_note(note, &backlinks)? == SaveStatus::Written {
                written += 1;
            }
        }
        info!("event=wiki_reindex module=service status=ok written={written}");
        Ok(written)
    }

    fn lookup(&self, target: &str) -> Result<(Slug, Option<Ambiguity>), WikiError> {
        match self.index.resolver().resolve(target) {
            Resolution::Resolved {
                slug, ambiguity, ..
            } => Ok((slug, ambiguity)),
            Resolution::Unresolved => Err(WikiError::NotFound(target.to_string())),
        }
    }

    fn note(&self, slug: &str) -> Result<&Note, WikiError> {
        self.notes
            .binary_search_by(|note| note.slug.as_str().cmp(slug))
            .map(|position| &self.notes[position])
            .map_err(|_| WikiError::NotFound(slug.to_string()))
    }

    fn backlink_slugs(&self, slug: &str) -> Vec<Slug> {
        self.index
            .backlinks(slug)
            .map(|sources| sources.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn view_of(&self, slug: &str, lookup_ambiguity: Option<Ambiguity>) -> Result<NoteView, WikiError> {
        let note = self.note(slug)?.clone();
        let backlinks = self
            .backlink_slugs(slug)
            .into_iter()
            .map(|source| {
                let title = self
                    .note(&source)
                    .map(|linked| linked.title.clone())
                    .unwrap_or_else(|_| source.clone());
                LinkedNote {
                    slug: source,
                    title,
                }
            })
            .collect();
        Ok(NoteView {
            note,
            backlinks,
            outbound: self.index.outbound(slug).to_vec(),
            lookup_ambiguity,
        })
    }

    fn ensure_aliases_free(&self, aliases: &[String], owner: Option<&str>) -> Result<(), WikiError> {
        for alias in aliases {
            if let Some(other) = self.index.resolver().alias_owners(alias, owner).into_iter().next() {
                return Err(WikiError::AliasConflict {
                    alias: alias.clone(),
                    owner: other,
                });
            }
        }
        Ok(())
    }

    /// Applies field replacements to the note stored under an exact slug.
    pub fn edit_by_slug(&mut self, slug: &str, edit: NoteEdit) -> Result<NoteView, WikiError> {
        let mut updated = self.note(slug)?.clone();
        if let Some(title) = edit.title {
            updated.title = normalize_title(title)?;
        }
        if let Some(tags) = edit.tags {
            updated.tags = normalize_tags(&tags)?;
        }
        if let Some(aliases) = edit.aliases {
            updated.aliases = normalize_aliases(&aliases)?;
            self.ensure_aliases_free(&updated.aliases, Some(slug))?;
        }
        if let Some(body) = edit.body {
            updated.body = body;
        }

        self.upsert(updated, false)?;
        info!("event=note_edit module=service status=ok slug={slug}");
        self.view_of(slug, None)
    }

    /// Writes `note` and commits the updated corpus and index.
    fn upsert(&mut self, note: Note, is_new: bool) -> Result<(), WikiError> {
        let mut notes = self.notes.clone();
        match notes.binary_search_by(|existing| existing.slug.cmp(&note.slug)) {
            Ok(position) => notes[position] = note.clone(),
            Err(position) => notes.insert(position, note.clone()),
        }
        let mut index = self.index.clone();
        let mode = index.update_note(&notes, &note.slug);
        let backlinks = index
            .backlinks(&note.slug)
            .map(|sources| sources.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        if is_new {
            self.repo.create_note(&note, &backlinks)?;
        } else {
            self.repo.save_note(&note, &backlinks)?;
        }
        info!(
            "event=index_update module=service status=ok slug={} mode={mode:?}",
            note.slug
        );
        self.commit(notes, index, &[note.slug.as_str()]);
        Ok(())
    }

    /// Moves a note to a new slug: write the new file, then remove the old one.
    fn move_note(&mut self, previous_slug: &str, note: Note) -> Result<(), WikiError> {
        let mut notes = self
            .notes
            .iter()
            .filter(|existing| existing.slug != previous_slug)
            .cloned()
            .collect::<Vec<_>>();
        let position = notes
            .binary_search_by(|existing| existing.slug.cmp(&note.slug))
            .unwrap_or_else(|position| position);
        notes.insert(position, note.clone());

        let mut index = self.index.clone();
        index.update_note(&notes, &note.slug);
        let backlinks = index
            .backlinks(&note.slug)
            .map(|sources| sources.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();

        self.repo.create_note(&note, &backlinks)?;
        if let Err(err) = self.repo.delete_note(previous_slug) {
            // Without the rollback the note would exist under both slugs.
            if let Err(rollback) = self.repo.delete_note(&note.slug) {
                error!(
                    "event=note_move module=service status=error slug={} error_code=rollback_failed error={rollback}",
                    note.slug
                );
            }
            return Err(err.into());
        }
        self.commit(notes, index, &[note.slug.as_str()]);
        Ok(())
    }

    /// Swaps in the new state and refreshes backlink caches that changed.
    ///
    /// `written` lists slugs whose files were just written with fresh caches.
    fn commit(&mut self, notes: Vec<Note>, index: BacklinkIndex, written: &[&str]) {
        let previous = std::mem::replace(&mut self.index, index);
        self.notes = notes;

        for slug in self.index.changed_since(&previous) {
            if written.contains(&slug.as_str()) {
                continue;
            }
            let Ok(note) = self.note(&slug).cloned() else {
                continue;
            };
            let backlinks = self.backlink_slugs(&slug);
            if let Err(err) = self.repo.save_note(&note, &backlinks) {
                warn!(
                    "event=backlink_cache module=service status=error slug={slug} error={err}"
                );
            }
        }
    }
}

/// Outline used when a note is created without a body.
pub fn default_body(title: &str) -> String {
    format!(
        "# {title}\n\n## Overview\n\nBrief description of {title}.\n\n## Key Points\n\n-\n\n## Related Notes\n\n-\n\n## References\n\n-\n"
    )
}
