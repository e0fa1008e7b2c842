//! Wiki link extraction from note bodies.
//!
//! # Responsibility
//! - Find `[[target]]` and `[[target|display]]` markers in freeform text.
//!
//! # Invariants
//! - Extraction preserves order and case; resolution decides matching.
//! - Malformed markers (unbalanced brackets, empty targets, line breaks
//!   inside a marker) are skipped, never reported as errors.
//! - Extraction is lazy and side-effect-free; iterating twice over the same
//!   body yields the same references.

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static WIKI_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\[([^\[\]|\n]+)(?:\|([^\[\]\n]*))?\]\]").expect("valid wiki link regex")
});

/// One reference marker found in a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    /// Referenced name as written (trimmed).
    pub target: String,
    /// Optional display text after `|`.
    pub display: Option<String>,
    /// Byte range of the whole marker in the body.
    pub span: Range<usize>,
}

impl RawReference {
    /// Text shown to readers: the display part if present, else the target.
    pub fn label(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.target)
    }
}

/// Lazy iterator over the references in one body.
#[derive(Debug, Clone)]
pub struct References<'a> {
    body: &'a str,
    cursor: usize,
}

impl Iterator for References<'_> {
    type Item = RawReference;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor <= self.body.len() {
            let caps = WIKI_LINK_RE.captures_at(self.body, self.cursor)?;
            let whole = caps.get(0)?;
            self.cursor = whole.end();

            let target = caps.get(1).map_or("", |m| m.as_str()).trim();
            if target.is_empty() {
                continue;
            }
            let display = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|text| !text.is_empty())
                .map(str::to_string);

            return Some(RawReference {
                target: target.to_string(),
                display,
                span: whole.range(),
            });
        }
        None
    }
}

/// Extracts wiki references from `body` in order of appearance.
pub fn extract(body: &str) -> References<'_> {
    References { body, cursor: 0 }
}

#[cfg(test)]
mod tests {
    use super::extract;

    fn targets(body: &str) -> Vec<String> {
        extract(body).map(|reference| reference.target).collect()
    }

    #[test]
    fn extracts_plain_and_display_markers_in_order() {
        let body = "Links to [[Project Overview]] and [[Team Structure|the team]].";
        let refs = extract(body).collect::<Vec<_>>();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].target, "Project Overview");
        assert_eq!(refs[0].display, None);
        assert_eq!(refs[0].label(), "Project Overview");
        assert_eq!(refs[1].target, "Team Structure");
        assert_eq!(refs[1].display.as_deref(), Some("the team"));
        assert_eq!(&body[refs[1].span.clone()], "[[Team Structure|the team]]");
    }

    #[test]
    fn keeps_case_and_duplicates() {
        assert_eq!(
            targets("[[API]] then [[api]] then [[API]]"),
            vec!["API".to_string(), "api".to_string(), "API".to_string()]
        );
    }

    #[test]
    fn skips_malformed_markers() {
        assert_eq!(targets("[[unclosed and [[Closed]]"), vec!["Closed".to_string()]);
        assert!(targets("[[]] [[ ]] [[ |x]] [single] [[line\nbreak]]").is_empty());
        assert_eq!(targets("[[[Nested]]]"), vec!["Nested".to_string()]);
        assert_eq!(targets("]] [[ok]] [["), vec!["ok".to_string()]);
    }

    #[test]
    fn empty_display_falls_back_to_target() {
        let refs = extract("[[Target|  ]]").collect::<Vec<_>>();
        assert_eq!(refs[0].display, None);
        assert_eq!(refs[0].label(), "Target");
    }

    #[test]
    fn iteration_is_restartable() {
        let body = "[[a]] [[b|B]]";
        let first = extract(body);
        let replay = first.clone();
        assert_eq!(first.collect::<Vec<_>>(), replay.collect::<Vec<_>>());
        assert_eq!(extract(body).count(), 2);
    }
}
