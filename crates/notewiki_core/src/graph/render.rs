//! ASCII rendering of a note's backlink neighborhood.
//!
//! # Responsibility
//! - Walk backlink edges depth-first from one note and draw them as a tree.
//!
//! # Invariants
//! - A node already on the current path is drawn once with `(cycle)` and not
//!   expanded, so rendering terminates on any graph.
//! - Children are ordered by slug, so output is deterministic.
//! - With a depth limit, nodes at the limit that still have backlinks are
//!   drawn with `(...)`.
//!
//! Example for `API` referenced by `Client`, which `Server` references:
//!
//! ```text
//! API
//! └── Client
//!     └── Server
//! ```

use crate::index::backlinks::BacklinkIndex;
use crate::model::note::Note;
use std::collections::HashMap;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const BLANK: &str = "    ";
const CYCLE_MARKER: &str = "(cycle)";
const TRUNCATED_MARKER: &str = "(...)";
const EMPTY_MARKER: &str = "(no backlinks)";

/// Renders the backlink tree rooted at `slug`.
///
/// `depth_limit` bounds how many levels below the root are drawn; `None`
/// draws everything reachable (cycles are still cut). Returns `None` when
/// `slug` is not in the index.
pub fn render_backlink_tree(
    index: &BacklinkIndex,
    notes: &[Note],
    slug: &str,
    depth_limit: Option<usize>,
) -> Option<String> {
    if !index.contains(slug) {
        return None;
    }
    let titles = notes
        .iter()
        .map(|note| (note.slug.as_str(), note.title.as_str()))
        .collect::<HashMap<_, _>>();
    let renderer = TreeRenderer {
        index,
        titles,
        depth_limit,
    };

    let mut lines = Vec::new();
    let has_children = index.backlinks(slug).is_some_and(|sources| !sources.is_empty());
    if !has_children {
        lines.push(renderer.label(slug).to_string());
        lines.push(format!("  {EMPTY_MARKER}"));
        return Some(lines.join("\n"));
    }
    if depth_limit == Some(0) {
        lines.push(format!("{} {TRUNCATED_MARKER}", renderer.label(slug)));
        return Some(lines.join("\n"));
    }

    lines.push(renderer.label(slug).to_string());
    let mut path = vec![slug];
    renderer.render_children(slug, "", 1, &mut path, &mut lines);
    Some(lines.join("\n"))
}

struct TreeRenderer<'a> {
    index: &'a BacklinkIndex,
    titles: HashMap<&'a str, &'a str>,
    depth_limit: Option<usize>,
}

impl<'a> TreeRenderer<'a> {
    fn label<'s>(&self, slug: &'s str) -> &'s str
    where
        'a: 's,
    {
        self.titles.get(slug).copied().unwrap_or(slug)
    }

    fn render_children(
        &self,
        slug: &str,
        prefix: &str,
        depth: usize,
        path: &mut Vec<&'a str>,
        lines: &mut Vec<String>,
    ) {
        let Some(sources) = self.index.backlinks(slug) else {
            return;
        };
        let count = sources.len();
        for (position, child) in sources.iter().enumerate() {
            let is_last = position + 1 == count;
            let connector = if is_last { LAST_BRANCH } else { BRANCH };
            let label = self.label(child.as_str());

            if path.contains(&child.as_str()) {
                lines.push(format!("{prefix}{connector}{label} {CYCLE_MARKER}"));
                continue;
            }

            let has_children = self
                .index
                .backlinks(child)
                .is_some_and(|grand| !grand.is_empty());
            let at_limit = self.depth_limit.is_some_and(|limit| depth >= limit);
            if at_limit && has_children {
                lines.push(format!("{prefix}{connector}{label} {TRUNCATED_MARKER}"));
                continue;
            }

            lines.push(format!("{prefix}{connector}{label}"));
            if has_children {
                let child_prefix = format!("{prefix}{}", if is_last { BLANK } else { PIPE });
                path.push(child.as_str());
                self.render_children(child, &child_prefix, depth + 1, path, lines);
                path.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::render_backlink_tree;
    use crate::index::backlinks::BacklinkIndex;
    use crate::model::note::Note;

    fn note(slug: &str, title: &str, body: &str) -> Note {
        let mut note = Note::with_slug(slug, title);
        note.body = body.to_string();
        note
    }

    #[test]
    fn renders_nested_backlinks() {
        let notes = vec![
            note("api", "API", ""),
            note("client", "Client", "uses [[API]]"),
            note("docs", "Docs", "covers [[API]]"),
            note("server", "Server", "talks to [[Client]]"),
        ];
        let index = BacklinkIndex::rebuild(&notes);
        let text = render_backlink_tree(&index, &notes, "api", None).unwrap();
        assert_eq!(text, "API\n├── Client\n│   └── Server\n└── Docs");
    }

    #[test]
    fn note_without_backlinks_says_so() {
        let notes = vec![note("lonely", "Lonely", "")];
        let index = BacklinkIndex::rebuild(&notes);
        let text = render_backlink_tree(&index, &notes, "lonely", None).unwrap();
        assert_eq!(text, "Lonely\n  (no backlinks)");
    }

    #[test]
    fn cycles_terminate_and_are_marked() {
        let notes = vec![note("a", "A", "[[B]]"), note("b", "B", "[[A]]")];
        let index = BacklinkIndex::rebuild(&notes);
        let text = render_backlink_tree(&index, &notes, "a", None).unwrap();
        assert_eq!(text, "A\n└── B\n    └── A (cycle)");
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let notes = vec![note("a", "A", "[[A]]")];
        let index = BacklinkIndex::rebuild(&notes);
        let text = render_backlink_tree(&index, &notes, "a", None).unwrap();
        assert_eq!(text, "A\n└── A (cycle)");
    }

    #[test]
    fn depth_limit_truncates_deeper_levels() {
        let notes = vec![
            note("a", "A", ""),
            note("b", "B", "[[A]]"),
            note("c", "C", "[[B]]"),
        ];
        let index = BacklinkIndex::rebuild(&notes);
        assert_eq!(
            render_backlink_tree(&index, &notes, "a", Some(1)).unwrap(),
            "A\n└── B (...)"
        );
        assert_eq!(
            render_backlink_tree(&index, &notes, "a", Some(0)).unwrap(),
            "A (...)"
        );
        assert_eq!(
            render_backlink_tree(&index, &notes, "a", Some(2)).unwrap(),
            "A\n└── B\n    └── C"
        );
    }

    #[test]
    fn unknown_root_renders_nothing() {
        let index = BacklinkIndex::rebuild(&[]);
        assert!(render_backlink_tree(&index, &[], "missing", None).is_none());
    }
}
