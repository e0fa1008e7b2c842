//! Reference resolution: reference string -> note slug.
//!
//! # Responsibility
//! - Map titles, aliases and slugs to notes in a fixed priority order.
//! - Report ties instead of hiding them.
//!
//! # Invariants
//! - Tier order: exact title, exact alias, slug, then case-insensitive
//!   title and alias.
//! - Within a tier the lexicographically smallest slug wins, so resolving
//!   the same target over the same corpus always returns the same note.
//! - Two resolvers built from corpora with the same names compare equal,
//!   which is what the index uses to detect key-space changes.

use crate::model::note::{Note, Slug};
use crate::model::slug::slugify;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

/// Lookup tier that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    Title,
    Alias,
    Slug,
    TitleIgnoreCase,
    AliasIgnoreCase,
}

impl Display for MatchTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Title => "title",
            Self::Alias => "alias",
            Self::Slug => "slug",
            Self::TitleIgnoreCase => "title (case-insensitive)",
            Self::AliasIgnoreCase => "alias (case-insensitive)",
        };
        f.write_str(label)
    }
}

/// Several notes matched a target at the same tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub target: String,
    pub tier: MatchTier,
    /// All tied slugs, sorted.
    pub candidates: Vec<Slug>,
    /// Slug picked by the tie-break (the smallest candidate).
    pub chosen: Slug,
}

impl Display for Ambiguity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ambiguous reference `{}`: {} matches {}; using `{}`",
            self.target,
            self.tier,
            self.candidates.join(", "),
            self.chosen
        )
    }
}

/// Result of resolving one reference target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        slug: Slug,
        tier: MatchTier,
        ambiguity: Option<Ambiguity>,
    },
    Unresolved,
}

impl Resolution {
    /// Resolved slug, if any.
    pub fn slug(&self) -> Option<&str> {
        match self {
            Self::Resolved { slug, .. } => Some(slug.as_str()),
            Self::Unresolved => None,
        }
    }

    pub fn ambiguity(&self) -> Option<&Ambiguity> {
        match self {
            Self::Resolved { ambiguity, .. } => ambiguity.as_ref(),
            Self::Unresolved => None,
        }
    }
}

/// One alias claimed by more than one note (case-insensitive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasConflict {
    /// Alias in lowercase form.
    pub alias: String,
    pub owners: Vec<Slug>,
}

impl Display for AliasConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "alias `{}` is claimed by {}",
            self.alias,
            self.owners.join(", ")
        )
    }
}

type NameTable = BTreeMap<String, BTreeSet<Slug>>;

/// Lookup tables for one corpus snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolver {
    titles: NameTable,
    aliases: NameTable,
    slugs: BTreeSet<Slug>,
    folded_titles: NameTable,
    folded_aliases: NameTable,
}

impl Resolver {
    /// Builds lookup tables from a corpus.
    pub fn new<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        let mut resolver = Self::default();
        for note in notes {
            let slug = &note.slug;
            insert(&mut resolver.titles, note.title.clone(), slug);
            insert(&mut resolver.folded_titles, note.title.to_lowercase(), slug);
            for alias in &note.aliases {
                insert(&mut resolver.aliases, alias.clone(), slug);
                insert(&mut resolver.folded_aliases, alias.to_lowercase(), slug);
            }
            resolver.slugs.insert(slug.clone());
        }
        resolver
    }

    /// Resolves `target` to a note slug.
    pub fn resolve(&self, target: &str) -> Resolution {
        let target = target.trim();
        if let Some(found) = pick(&self.titles, target, target, MatchTier::Title) {
            return found;
        }
        if let Some(found) = pick(&self.aliases, target, target, MatchTier::Alias) {
            return found;
        }
        let slug = slugify(target);
        if self.slugs.contains(&slug) {
            return Resolution::Resolved {
                slug,
                tier: MatchTier::Slug,
                ambiguity: None,
            };
        }
        // Slugs are lowercase already, so the case-insensitive retry only
        // needs the title and alias tiers.
        let folded = target.to_lowercase();
        if let Some(found) = pick(&self.folded_titles, &folded, target, MatchTier::TitleIgnoreCase) {
            return found;
        }
        if let Some(found) = pick(
            &self.folded_aliases,
            &folded,
            target,
            MatchTier::AliasIgnoreCase,
        ) {
            return found;
        }
        Resolution::Unresolved
    }

    /// Returns whether a note with `slug` is part of this snapshot.
    pub fn contains_slug(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }

    /// Slugs of notes, other than `except`, claiming `alias` (case-insensitive).
    pub fn alias_owners(&self, alias: &str, except: Option<&str>) -> Vec<Slug> {
        self.folded_aliases
            .get(&alias.to_lowercase())
            .map(|owners| {
                owners
                    .iter()
                    .filter(|owner| Some(owner.as_str()) != except)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Aliases claimed by more than one note.
    pub fn alias_conflicts(&self) -> Vec<AliasConflict> {
        self.folded_aliases
            .iter()
            .filter(|(_, owners)| owners.len() > 1)
            .map(|(alias, owners)| AliasConflict {
                alias: alias.clone(),
                owners: owners.iter().cloned().collect(),
            })
            .collect()
    }
}

/// Resolves one target against a corpus.
///
/// Builds a throwaway `Resolver`; callers resolving many targets should
/// build one and reuse it.
pub fn resolve(target: &str, notes: &[Note]) -> Resolution {
    Resolver::new(notes).resolve(target)
}

fn insert(table: &mut NameTable, key: String, slug: &Slug) {
    table.entry(key).or_default().insert(slug.clone());
}

fn pick(table: &NameTable, key: &str, target: &str, tier: MatchTier) -> Option<Resolution> {
    let candidates = table.get(key)?;
    let chosen = candidates.iter().next()?.clone();
    let ambiguity = (candidates.len() > 1).then(|| Ambiguity {
        target: target.to_string(),
        tier,
        candidates: candidates.iter().cloned().collect(),
        chosen: chosen.clone(),
    });
    Some(Resolution::Resolved {
        slug: chosen,
        tier,
        ambiguity,
    })
}
