//! Derived backlink index over a note corpus.
//!
//! # Responsibility
//! - Maintain `slug -> set of slugs referencing it` for every note.
//! - Keep each note's outbound references with their resolution status.
//! - Report unresolved references, ambiguities and alias conflicts.
//!
//! # Invariants
//! - Every note in the corpus has a backlink entry, possibly empty.
//! - `backlinks(N) = { M | some reference in M.body resolves to N }`.
//! - Incremental updates produce exactly the index a full rebuild would.
//! - The index is pure derived data: building it never fails and never
//!   touches storage.

use crate::link::extract::{extract, RawReference};
use crate::link::resolve::{AliasConflict, Ambiguity, Resolution, Resolver};
use crate::model::note::{Note, Slug};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Materialized backlink relation.
pub type BacklinkMap = BTreeMap<Slug, BTreeSet<Slug>>;

/// One outbound reference of a note and how it resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundLink {
    pub reference: RawReference,
    pub resolution: Resolution,
}

impl OutboundLink {
    /// Resolved target slug, `None` for unresolved references.
    pub fn target_slug(&self) -> Option<&str> {
        self.resolution.slug()
    }
}

/// A reference whose target matches no note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub source: Slug,
    pub target: String,
}

/// A reference that resolved through a tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousReference {
    pub source: Slug,
    pub ambiguity: Ambiguity,
}

/// Non-fatal findings over the whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub unresolved: Vec<UnresolvedReference>,
    pub ambiguous: Vec<AmbiguousReference>,
    pub alias_conflicts: Vec<AliasConflict>,
}

impl IndexReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty() && self.ambiguous.is_empty() && self.alias_conflicts.is_empty()
    }
}

/// Path taken by an incremental update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Only the changed note's own references were re-resolved.
    Local,
    /// Titles, aliases or the slug set changed; every cached reference was
    /// re-resolved against the new name tables.
    Reresolved,
}

/// Backlink index for one corpus snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacklinkIndex {
    resolver: Resolver,
    references: BTreeMap<Slug, Vec<RawReference>>,
    outbound: BTreeMap<Slug, Vec<OutboundLink>>,
    backlinks: BacklinkMap,
}

impl BacklinkIndex {
    /// Builds the index from scratch.
    pub fn rebuild(notes: &[Note]) -> Self {
        let mut index = Self {
            resolver: Resolver::new(notes),
            references: notes
                .iter()
                .map(|note| (note.slug.clone(), extract(&note.body).collect()))
                .collect(),
            ..Self::default()
        };
        index.reresolve_all();
        debug!(
            "event=index_rebuild module=index status=ok notes={} edges={}",
            index.backlinks.len(),
            index.edge_count()
        );
        index
    }

    /// Updates the index after `slug` was created or edited in `notes`.
    ///
    /// `notes` is the full corpus after the change; only `slug` may differ
    /// from the corpus this index was built from. When `slug` is absent from
    /// `notes` the call behaves like [`BacklinkIndex::remove_note`].
    pub fn update_note(&mut self, notes: &[Note], slug: &str) -> UpdateMode {
        let resolver = Resolver::new(notes);
        let changed = notes.iter().find(|note| note.slug == slug);
        match changed {
            Some(note) => {
                self.references
                    .insert(slug.to_string(), extract(&note.body).collect());
            }
            None => {
                self.references.remove(slug);
            }
        }

        if resolver == self.resolver {
            // Same names and slugs: no other note's targets can move.
            for sources in self.backlinks.values_mut() {
                sources.remove(slug);
            }
            self.outbound.remove(slug);
            if changed.is_some() {
                self.backlinks.entry(slug.to_string()).or_default();
                self.link_source(slug);
            }
            debug!("event=index_update module=index status=ok mode=local slug={slug}");
            return UpdateMode::Local;
        }

        self.resolver = resolver;
        self.references
            .retain(|source, _| notes.iter().any(|note| &note.slug == source));
        for note in notes {
            if !self.references.contains_key(&note.slug) {
                self.references
                    .insert(note.slug.clone(), extract(&note.body).collect());
            }
        }
        self.reresolve_all();
        debug!("event=index_update module=index status=ok mode=reresolved slug={slug}");
        UpdateMode::Reresolved
    }

    /// Updates the index after `slug` was deleted; `notes` no longer holds it.
    ///
    /// References to the deleted note elsewhere stay in their bodies and
    /// show up as unresolved.
    pub fn remove_note(&mut self, notes: &[Note], slug: &str) -> UpdateMode {
        self.update_note(notes, slug)
    }

    /// Notes referencing `slug`; `None` when `slug` is not indexed.
    pub fn backlinks(&self, slug: &str) -> Option<&BTreeSet<Slug>> {
        self.backlinks.get(slug)
    }

    /// Full backlink relation.
    pub fn mapping(&self) -> &BacklinkMap {
        &self.backlinks
    }

    /// Outbound references of `slug` in body order.
    pub fn outbound(&self, slug: &str) -> &[OutboundLink] {
        self.outbound.get(slug).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Name tables the index was resolved against.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.backlinks.contains_key(slug)
    }

    /// Number of distinct `source -> target` edges.
    pub fn edge_count(&self) -> usize {
        self.backlinks.values().map(BTreeSet::len).sum()
    }

    /// Collects non-fatal findings across the corpus.
    pub fn report(&self) -> IndexReport {
        let mut report = IndexReport {
            alias_conflicts: self.resolver.alias_conflicts(),
            ..IndexReport::default()
        };
        for (source, links) in &self.outbound {
            for link in links {
                match &link.resolution {
                    Resolution::Unresolved => report.unresolved.push(UnresolvedReference {
                        source: source.clone(),
                        target: link.reference.target.clone(),
                    }),
                    Resolution::Resolved {
                        ambiguity: Some(ambiguity),
                        ..
                    } => report.ambiguous.push(AmbiguousReference {
                        source: source.clone(),
                        ambiguity: ambiguity.clone(),
                    }),
                    Resolution::Resolved { .. } => {}
                }
            }
        }
        report
    }

    /// Slugs indexed in `self` whose backlink set differs from `before`.
    pub fn changed_since(&self, before: &BacklinkIndex) -> Vec<Slug> {
        self.backlinks
            .iter()
            .filter(|(slug, sources)| before.backlinks.get(*slug) != Some(*sources))
            .map(|(slug, _)| slug.clone())
            .collect()
    }

    fn reresolve_all(&mut self) {
        self.backlinks = self
            .references
            .keys()
            .map(|slug| (slug.clone(), BTreeSet::new()))
            .collect();
        self.outbound.clear();
        let sources = self.references.keys().cloned().collect::<Vec<_>>();
        for source in sources {
            self.link_source(&source);
        }
    }

    fn link_source(&mut self, source: &str) {
        let Some(references) = self.references.get(source) else {
            return;
        };
        let mut links = Vec::with_capacity(references.len());
        for reference in references {
            let resolution = self.resolver.resolve(&reference.target);
            if let Some(target) = resolution.slug() {
                self.backlinks
                    .entry(target.to_string())
                    .or_default()
                    .insert(source.to_string());
            }
            links.push(OutboundLink {
                reference: reference.clone(),
                resolution,
            });
        }
        self.outbound.insert(source.to_string(), links);
    }
}

#[cfg(test)]
mod tests {
    use super::{BacklinkIndex, UpdateMode};
    use crate::model::note::Note;
    use std::collections::BTreeSet;

    fn note(slug: &str, title: &str, body: &str) -> Note {
        let mut note = Note::with_slug(slug, title);
        note.body = body.to_string();
        note
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn rebuild_creates_entry_for_every_note() {
        let notes = vec![note("a", "A", "[[B]]"), note("b", "B", ""), note("c", "C", "")];
        let index = BacklinkIndex::rebuild(&notes);
        assert_eq!(index.backlinks("a"), Some(&set(&[])));
        assert_eq!(index.backlinks("b"), Some(&set(&["a"])));
        assert_eq!(index.backlinks("c"), Some(&set(&[])));
        assert_eq!(index.edge_count(), 1);
    }

    #[test]
    fn repeated_references_count_once_and_self_links_are_kept() {
        let notes = vec![note("a", "A", "[[A]] [[a]] [[A|me]]")];
        let index = BacklinkIndex::rebuild(&notes);
        assert_eq!(index.backlinks("a"), Some(&set(&["a"])));
        assert_eq!(index.outbound("a").len(), 3);
    }

    #[test]
    fn body_edit_takes_local_path() {
        let mut notes = vec![note("a", "A", "[[B]]"), note("b", "B", ""), note("c", "C", "")];
        let mut index = BacklinkIndex::rebuild(&notes);

        notes[0].body = "[[C]]".to_string();
        let mode = index.update_note(&notes, "a");

        assert_eq!(mode, UpdateMode::Local);
        assert_eq!(index, BacklinkIndex::rebuild(&notes));
        assert_eq!(index.backlinks("b"), Some(&set(&[])));
        assert_eq!(index.backlinks("c"), Some(&set(&["a"])));
    }

    #[test]
    fn new_title_resolves_previously_dangling_references() {
        let mut notes = vec![note("a", "A", "See [[Ghost Note]]")];
        let mut index = BacklinkIndex::rebuild(&notes);
        assert_eq!(index.report().unresolved.len(), 1);

        notes.push(note("ghost-note", "Ghost Note", ""));
        let mode = index.update_note(&notes, "ghost-note");

        assert_eq!(mode, UpdateMode::Reresolved);
        assert_eq!(index.backlinks("ghost-note"), Some(&set(&["a"])));
        assert!(index.report().unresolved.is_empty());
        assert_eq!(index, BacklinkIndex::rebuild(&notes));
    }

    #[test]
    fn remove_prunes_entries_and_leaves_unresolved_references() {
        let mut notes = vec![
            note("a", "A", "[[B]] and [[C]]"),
            note("b", "B", "[[A]]"),
            note("c", "C", "[[B]]"),
        ];
        let mut index = BacklinkIndex::rebuild(&notes);
        let before = index.clone();

        notes.retain(|note| note.slug != "b");
        index.remove_note(&notes, "b");

        assert!(!index.contains("b"));
        assert!(index.mapping().values().all(|sources| !sources.contains("b")));
        assert_eq!(index.backlinks("a"), Some(&set(&[])));
        let unresolved = index.report().unresolved;
        assert_eq!(unresolved.len(), 2);
        assert!(unresolved.iter().all(|reference| reference.target == "B"));
        assert_eq!(index.changed_since(&before), vec!["a".to_string()]);
        assert_eq!(index, BacklinkIndex::rebuild(&notes));
    }
}
