//! Substring search over note metadata and bodies.
//!
//! # Responsibility
//! - Match notes case-insensitively against title, aliases, tags and body.
//! - Return typed hits naming the field that matched.
//!
//! # Invariants
//! - Results are ordered by slug, so repeated searches over unchanged data
//!   return the same order.
//! - Blank queries return no hits.

use crate::model::note::{normalize_tag, Note};

/// Search options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Text matched as a case-insensitive substring.
    pub text: String,
    /// Optional exact tag filter (normalized like stored tags).
    pub tag: Option<String>,
    /// Maximum number of hits; `None` returns all.
    pub limit: Option<usize>,
}

impl SearchQuery {
    /// Creates a query with no tag filter and no limit.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: None,
            limit: None,
        }
    }
}

/// Note field that produced a hit; checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Title,
    Alias,
    Tag,
    Body,
}

/// Single search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub note: Note,
    pub field: MatchField,
}

/// Searches `notes` and returns hits ordered by slug.
pub fn search_notes(notes: &[Note], query: &SearchQuery) -> Vec<SearchHit> {
    let needle = query.text.trim().to_lowercase();
    if needle.is_empty() || query.limit == Some(0) {
        return Vec::new();
    }
    let tag_filter = query.tag.as_deref().and_then(normalize_tag);

    let mut hits = notes
        .iter()
        .filter(|note| {
            tag_filter
                .as_ref()
                .map_or(true, |tag| note.tags.contains(tag))
        })
        .filter_map(|note| {
            match_field(note, &needle).map(|field| SearchHit {
                note: note.clone(),
                field,
            })
        })
        .collect::<Vec<_>>();

    hits.sort_by(|a, b| a.note.slug.cmp(&b.note.slug));
    if let Some(limit) = query.limit {
        hits.truncate(limit);
    }
    hits
}

fn match_field(note: &Note, needle: &str) -> Option<MatchField> {
    if contains_folded(&note.title, needle) {
        return Some(MatchField::Title);
    }
    if note.aliases.iter().any(|alias| contains_folded(alias, needle)) {
        return Some(MatchField::Alias);
    }
    if note.tags.iter().any(|tag| contains_folded(tag, needle)) {
        return Some(MatchField::Tag);
    }
    if contains_folded(&note.body, needle) {
        return Some(MatchField::Body);
    }
    None
}

fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}

#[cfg(test)]
mod tests {
    use super::{search_notes, MatchField, SearchQuery};
    use crate::model::note::Note;

    fn corpus() -> Vec<Note> {
        let mut rust = Note::new("Rust Ownership").unwrap();
        rust.tags.insert("lang".to_string());
        rust.body = "Borrowing rules.".to_string();

        let mut api = Note::new("API").unwrap();
        api.aliases.push("Interface Design".to_string());
        api.body = "Mentions rust once.".to_string();

        let mut misc = Note::new("Misc").unwrap();
        misc.tags.insert("language-notes".to_string());
        vec![rust, api, misc]
    }

    #[test]
    fn matches_every_field_case_insensitively() {
        let notes = corpus();

        let by_title = search_notes(&notes, &SearchQuery::new("OWNERSHIP"));
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].field, MatchField::Title);

        let by_alias = search_notes(&notes, &SearchQuery::new("interface"));
        assert_eq!(by_alias[0].note.slug, "api");
        assert_eq!(by_alias[0].field, MatchField::Alias);

        let by_tag = search_notes(&notes, &SearchQuery::new("LANG"));
        let slugs = by_tag.iter().map(|hit| hit.note.slug.as_str()).collect::<Vec<_>>();
        assert_eq!(slugs, vec!["misc", "rust-ownership"]);
        assert!(by_tag.iter().all(|hit| hit.field == MatchField::Tag));

        let by_body = search_notes(&notes, &SearchQuery::new("borrowing"));
        assert_eq!(by_body[0].field, MatchField::Body);
    }

    #[test]
    fn results_are_ordered_by_slug_and_stable() {
        let notes = corpus();
        let query = SearchQuery::new("rust");
        let first = search_notes(&notes, &query);
        let second = search_notes(&notes, &query);
        assert_eq!(first, second);
        let slugs = first.iter().map(|hit| hit.note.slug.as_str()).collect::<Vec<_>>();
        assert_eq!(slugs, vec!["api", "rust-ownership"]);
    }

    #[test]
    fn tag_filter_and_limit_apply() {
        let notes = corpus();
        let mut query = SearchQuery::new("rust");
        query.tag = Some(" LANG ".to_string());
        let hits = search_notes(&notes, &query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].note.slug, "rust-ownership");

        let mut limited = SearchQuery::new("rust");
        limited.limit = Some(1);
        assert_eq!(search_notes(&notes, &limited).len(), 1);
    }

    #[test]
    fn blank_query_and_zero_limit_return_nothing() {
        let notes = corpus();
        assert!(search_notes(&notes, &SearchQuery::new("   ")).is_empty());
        let mut query = SearchQuery::new("rust");
        query.limit = Some(0);
        assert!(search_notes(&notes, &query).is_empty());
    }
}
