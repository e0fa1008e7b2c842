//! Slug derivation for note identifiers.
//!
//! # Responsibility
//! - Derive filesystem- and reference-safe identifiers from titles.
//! - Validate slugs read back from disk.
//!
//! # Invariants
//! - `slugify` output only contains `[a-z0-9-]`, never starts or ends with
//!   `-`, and never contains `--`.
//! - `slugify(slugify(x)) == slugify(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Separator placed between words of a slug.
pub const SLUG_SEPARATOR: char = '-';

static SEPARATOR_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid separator regex"));
static UNSAFE_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("valid unsafe char regex"));
static REPEATED_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-{2,}").expect("valid repeated separator regex"));
static VALID_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Converts a title into a slug.
///
/// Rules, applied in order:
/// - lower-case the input;
/// - replace every run of whitespace/punctuation with one `-`;
/// - strip characters outside `[a-z0-9-]` (non-ASCII letters and digits);
/// - collapse repeated `-` and trim them from both ends.
///
/// The result may be empty (e.g. `"!!!"`); callers creating notes must
/// reject that case.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let separated = SEPARATOR_RUN_RE.replace_all(&lowered, "-");
    let safe = UNSAFE_CHAR_RE.replace_all(&separated, "");
    let collapsed = REPEATED_SEPARATOR_RE.replace_all(&safe, "-");
    collapsed.trim_matches(SLUG_SEPARATOR).to_string()
}

/// Returns whether `value` is already in canonical slug form.
pub fn is_valid_slug(value: &str) -> bool {
    VALID_SLUG_RE.is_match(value)
}

/// Builds a display title from a slug, e.g. `test-note` -> `Test Note`.
///
/// Used for files that carry no title in their front-matter.
pub fn title_from_slug(slug: &str) -> String {
    slug.split(SLUG_SEPARATOR)
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
