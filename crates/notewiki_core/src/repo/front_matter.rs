//! Note file codec: YAML front-matter followed by a freeform body.
//!
//! # Responsibility
//! - Parse note documents into `Note` records.
//! - Render `Note` records (plus the cached backlinks list) into documents.
//!
//! # Invariants
//! - The stored `backlinks` field is a cache written from the index; parsing
//!   exposes it separately and never folds it into the note.
//! - Documents without front-matter still load, using a title derived from
//!   the slug and the whole content as body.
//!
//! Layout:
//!
//! ```text
//! ---
//! title: API
//! tags: []
//! aliases:
//! - api-design
//! backlinks:
//! - client
//! ---
//!
//! body text
//! ```

use crate::model::note::{normalize_tag, Note, Slug};
use crate::model::slug::title_from_slug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DELIMITER: &str = "---";

/// Front-matter decode/encode failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatterError {
    pub message: String,
}

impl Display for FrontMatterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed front-matter: {}", self.message)
    }
}

impl Error for FrontMatterError {}

/// Decoded note document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDocument {
    pub note: Note,
    /// Backlinks as last written to disk. Informational only.
    pub cached_backlinks: Vec<Slug>,
}

#[derive(Debug, Default, Deserialize)]
struct FrontMatterIn {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    backlinks: Vec<String>,
}

#[derive(Debug, Serialize)]
struct FrontMatterOut<'a> {
    title: &'a str,
    tags: Vec<&'a str>,
    aliases: &'a [String],
    backlinks: &'a [Slug],
}

/// Parses a note document stored under `slug`.
///
/// # Errors
/// Returns `FrontMatterError` when a delimited front-matter block is present
/// but is not valid YAML for the note schema.
pub fn parse_document(slug: &str, content: &str) -> Result<NoteDocument, FrontMatterError> {
    let Some((yaml, body)) = split_front_matter(content) else {
        let mut note = Note::with_slug(slug, title_from_slug(slug));
        note.body = content.to_string();
        return Ok(NoteDocument {
            note,
            cached_backlinks: Vec::new(),
        });
    };

    let front: FrontMatterIn = if yaml.trim().is_empty() {
        FrontMatterIn::default()
    } else {
        serde_yaml::from_str(yaml).map_err(|err| FrontMatterError {
            message: err.to_string(),
        })?
    };

    let title = front
        .title
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| title_from_slug(slug));

    let mut note = Note::with_slug(slug, title);
    note.tags = front
        .tags
        .iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>();
    note.aliases = dedup_aliases(front.aliases);
    // Only the blank line written after the closing delimiter is layout.
    note.body = body.strip_prefix('\n').unwrap_or(body).to_string();

    Ok(NoteDocument {
        note,
        cached_backlinks: front.backlinks,
    })
}

/// Renders a note document with the given cached backlinks.
pub fn render_document(note: &Note, backlinks: &[Slug]) -> Result<String, FrontMatterError> {
    let front = FrontMatterOut {
        title: note.title.as_str(),
        tags: note.tags.iter().map(String::as_str).collect(),
        aliases: note.aliases.as_slice(),
        backlinks,
    };
    let yaml = serde_yaml::to_string(&front).map_err(|err| FrontMatterError {
        message: err.to_string(),
    })?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n\n{}", note.body))
}

/// Splits `content` into `(yaml, body)` when it opens with a delimited block.
///
/// An opening delimiter without a closing one is not front-matter.
fn split_front_matter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---\n")?;
    if let Some(body) = rest.strip_prefix("---\n") {
        return Some(("", body));
    }
    if rest == DELIMITER {
        return Some(("", ""));
    }
    if let Some(idx) = rest.find("\n---\n") {
        return Some((&rest[..=idx], &rest[idx + 5..]));
    }
    rest.strip_suffix("\n---").map(|yaml| (yaml, ""))
}

/// Hand-edited files may carry blank or repeated aliases; keep the usable ones.
fn dedup_aliases(aliases: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    aliases
        .into_iter()
        .map(|alias| alias.trim().to_string())
        .filter(|alias| !alias.is_empty() && seen.insert(alias.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_document, render_document};
    use crate::model::note::Note;

    fn sample() -> Note {
        let mut note = Note::new("Test Wiki Note").unwrap();
        note.tags.insert("test".to_string());
        note.tags.insert("wiki".to_string());
        note.aliases.push("test-note".to_string());
        note.body = "This is a test wiki note.\n\nSee [[Other]].\n".to_string();
        note
    }

    #[test]
    fn rendered_document_parses_back_to_same_note() {
        let note = sample();
        let text = render_document(&note, &["other".to_string()]).unwrap();
        assert!(text.starts_with("---\ntitle: Test Wiki Note\n"));

        let parsed = parse_document(&note.slug, &text).unwrap();
        assert_eq!(parsed.note, note);
        assert_eq!(parsed.cached_backlinks, vec!["other".to_string()]);
    }

    #[test]
    fn leading_blank_lines_in_body_survive_round_trip() {
        let mut note = Note::new("Spaced").unwrap();
        note.body = "\n\nStarts after two blank lines.\n".to_string();
        let text = render_document(&note, &[]).unwrap();

        let parsed = parse_document(&note.slug, &text).unwrap();
        assert_eq!(parsed.note.body, note.body);
        let again = render_document(&parsed.note, &[]).unwrap();
        assert_eq!(again, text);
    }

    #[test]
    fn document_without_front_matter_uses_slug_title() {
        let body = "This is a simple wiki note without front-matter.";
        let parsed = parse_document("test-note", body).unwrap();
        assert_eq!(parsed.note.title, "Test Note");
        assert_eq!(parsed.note.body, body);
        assert!(parsed.note.tags.is_empty());
        assert!(parsed.note.aliases.is_empty());
        assert!(parsed.cached_backlinks.is_empty());
    }

    #[test]
    fn unterminated_front_matter_is_treated_as_body() {
        let content = "---\ntitle: Dangling\nno closing delimiter";
        let parsed = parse_document("dangling", content).unwrap();
        assert_eq!(parsed.note.title, "Dangling");
        assert_eq!(parsed.note.body, content);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed = parse_document("bare-note", "---\ntags: [Rust, rust]\n---\nbody").unwrap();
        assert_eq!(parsed.note.title, "Bare Note");
        assert_eq!(
            parsed.note.tags.iter().cloned().collect::<Vec<_>>(),
            vec!["rust".to_string()]
        );
        assert_eq!(parsed.note.body, "body");
    }

    #[test]
    fn empty_front_matter_block_is_accepted() {
        let parsed = parse_document("empty", "---\n---\n\nhello").unwrap();
        assert_eq!(parsed.note.title, "Empty");
        assert_eq!(parsed.note.body, "hello");
    }

    #[test]
    fn invalid_yaml_is_reported() {
        let err = parse_document("broken", "---\ntitle: [unclosed\n---\nbody").unwrap_err();
        assert!(err.to_string().contains("malformed front-matter"));
    }
}
