//! Small text helpers shared across the conversion pipeline.

use std::sync::LazyLock;

use regex::Regex;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap_or_else(|_| never_matching_regex())
});
static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\*\*([^*]+)\*\*").unwrap_or_else(|_| never_matching_regex())
});
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\*([^*]+)\*").unwrap_or_else(|_| never_matching_regex())
});
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"`([^`]+)`").unwrap_or_else(|_| never_matching_regex())
});

/// Derive the stable page slug from a notebook filename stem.
///
/// Lowercases and converts underscores to dashes. The slug is the unique
/// key under which the converted document (and its relocated images) are
/// published, so this mapping must stay deterministic.
#[must_use]
pub fn to_page_slug(stem: &str) -> String {
  stem.to_lowercase().replace('_', "-")
}

/// Reduce inline markdown markup to plain text.
///
/// Strips link, bold, italic and inline-code markers while keeping their
/// text content. Used when deriving the frontmatter description.
#[must_use]
pub fn strip_inline_markup(text: &str) -> String {
  let text = LINK_RE.replace_all(text, "$1");
  let text = BOLD_RE.replace_all(&text, "$1");
  let text = ITALIC_RE.replace_all(&text, "$1");
  CODE_RE.replace_all(&text, "$1").into_owned()
}

/// Sanitize an arbitrary name into a safe filename component.
///
/// Keeps alphanumerics, dots, dashes and underscores; everything else
/// becomes a dash. Leading and trailing dashes are trimmed.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
  name
    .replace(
      |c: char| !c.is_alphanumeric() && c != '.' && c != '-' && c != '_',
      "-",
    )
    .trim_matches('-')
    .to_string()
}

/// A regex that is guaranteed to never match anything.
///
/// Used as a fallback when a pattern fails to compile, so text transforms
/// degrade to no-ops instead of aborting a conversion.
#[must_use]
#[allow(clippy::unwrap_used, reason = "Both fallback patterns are known valid")]
pub fn never_matching_regex() -> Regex {
  // Asserts something impossible - this pattern is guaranteed to be valid
  Regex::new(r"[^\s\S]")
    .unwrap_or_else(|_| Regex::new(r"^\b$").unwrap())
}
