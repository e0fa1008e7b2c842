//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical wiki note record.
//! - Normalize user-supplied tags and aliases.
//!
//! # Invariants
//! - `slug` is derived once from the title and never changes on edit.
//! - `tags` are trimmed, lowercase and unique.
//! - `aliases` keep insertion order and contain no case-insensitive duplicates.
//! - Backlinks are not part of this record; they live in the derived index.

use crate::model::slug::{is_valid_slug, slugify};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable note identifier, also the file name key.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type Slug = String;

/// Validation failure for note fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// Title is blank after trim.
    EmptyTitle,
    /// Title produces an empty slug.
    UnsluggableTitle(String),
    /// Slug is not in canonical form.
    InvalidSlug(String),
    /// Tag is blank after trim.
    InvalidTag(String),
    /// Alias is blank after trim.
    InvalidAlias(String),
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be blank"),
            Self::UnsluggableTitle(title) => {
                write!(f, "title `{title}` contains no characters usable in a slug")
            }
            Self::InvalidSlug(slug) => write!(f, "invalid slug `{slug}`"),
            Self::InvalidTag(tag) => write!(f, "invalid tag: `{tag}`"),
            Self::InvalidAlias(alias) => write!(f, "invalid alias: `{alias}`"),
        }
    }
}

impl Error for NoteValidationError {}

/// A wiki note: metadata plus freeform body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Stable id; file name is `<slug>.md`.
    pub slug: Slug,
    /// Display title; may contain any characters.
    pub title: String,
    /// Extra names that resolve to this note.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Categorization labels.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Freeform text; the only source of outbound links.
    #[serde(default)]
    pub body: String,
}

impl Note {
    /// Creates a note whose slug is derived from `title`.
    ///
    /// # Errors
    /// - `EmptyTitle` when the title is blank.
    /// - `UnsluggableTitle` when the title slugifies to nothing.
    pub fn new(title: impl Into<String>) -> Result<Self, NoteValidationError> {
        let title = normalize_title(title.into())?;
        let slug = slugify(&title);
        if slug.is_empty() {
            return Err(NoteValidationError::UnsluggableTitle(title));
        }
        Ok(Self::with_slug(slug, title))
    }

    /// Creates a note with a caller-provided slug.
    ///
    /// Used by load paths where the slug comes from the file name.
    /// This constructor does not validate the slug.
    pub fn with_slug(slug: impl Into<Slug>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            aliases: Vec::new(),
            tags: BTreeSet::new(),
            body: String::new(),
        }
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if !is_valid_slug(&self.slug) {
            return Err(NoteValidationError::InvalidSlug(self.slug.clone()));
        }
        if self.title.trim().is_empty() {
            return Err(NoteValidationError::EmptyTitle);
        }
        if let Some(tag) = self
            .tags
            .iter()
            .find(|tag| normalize_tag(tag).as_deref() != Some(tag.as_str()))
        {
            return Err(NoteValidationError::InvalidTag(tag.clone()));
        }
        if let Some(alias) = self.aliases.iter().find(|alias| alias.trim().is_empty()) {
            return Err(NoteValidationError::InvalidAlias(alias.clone()));
        }
        Ok(())
    }
}

/// Trims a title and rejects blank values.
pub fn normalize_title(title: String) -> Result<String, NoteValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(NoteValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Normalizes one tag value: trimmed and lowercase, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates user-supplied tags.
///
/// # Errors
/// Returns `InvalidTag` for any blank value instead of silently dropping it.
pub fn normalize_tags(tags: &[String]) -> Result<BTreeSet<String>, NoteValidationError> {
    let mut unique = BTreeSet::new();
    for tag in tags {
        let value = normalize_tag(tag).ok_or_else(|| NoteValidationError::InvalidTag(tag.clone()))?;
        unique.insert(value);
    }
    Ok(unique)
}

/// Normalizes aliases: trimmed, first spelling kept, case-insensitive dedup.
///
/// # Errors
/// Returns `InvalidAlias` for any blank value.
pub fn normalize_aliases(aliases: &[String]) -> Result<Vec<String>, NoteValidationError> {
    let mut seen = BTreeSet::new();
    let mut ordered = Vec::with_capacity(aliases.len());
    for alias in aliases {
        let trimmed = alias.trim();
        if trimmed.is_empty() {
            return Err(NoteValidationError::InvalidAlias(alias.clone()));
        }
        if seen.insert(trimmed.to_lowercase()) {
            ordered.push(trimmed.to_string());
        }
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::{normalize_aliases, normalize_tags, Note, NoteValidationError};

    #[test]
    fn new_derives_slug_and_trims_title() {
        let note = Note::new("  Project Overview ").unwrap();
        assert_eq!(note.slug, "project-overview");
        assert_eq!(note.title, "Project Overview");
        assert!(note.aliases.is_empty());
        assert!(note.tags.is_empty());
        assert!(note.body.is_empty());
    }

    #[test]
    fn new_rejects_blank_and_unsluggable_titles() {
        assert_eq!(Note::new("   ").unwrap_err(), NoteValidationError::EmptyTitle);
        assert!(matches!(
            Note::new("???").unwrap_err(),
            NoteValidationError::UnsluggableTitle(_)
        ));
    }

    #[test]
    fn aliases_keep_first_spelling_and_order() {
        let aliases = normalize_aliases(&[
            "API Design".to_string(),
            " rest ".to_string(),
            "api design".to_string(),
        ])
        .unwrap();
        assert_eq!(aliases, vec!["API Design".to_string(), "rest".to_string()]);
    }

    #[test]
    fn tags_are_lowercased_and_blank_values_rejected() {
        let tags = normalize_tags(&["Work".to_string(), "work".to_string()]).unwrap();
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["work".to_string()]);

        let err = normalize_tags(&["  ".to_string()]).unwrap_err();
        assert!(matches!(err, NoteValidationError::InvalidTag(_)));
    }

    #[test]
    fn validate_rejects_non_canonical_slug() {
        let note = Note::with_slug("Not A Slug", "Title");
        assert!(matches!(
            note.validate().unwrap_err(),
            NoteValidationError::InvalidSlug(_)
        ));
    }
}
