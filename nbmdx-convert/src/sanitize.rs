//! MDX sanitization: make free-form text safe to embed as MDX/JSX.
//!
//! The sanitizer is an ordered list of independent text-transform stages.
//! Fenced code blocks are split out before any stage runs and re-spliced
//! verbatim afterwards; every stage below would otherwise corrupt code
//! samples. Stages never fail: a regex that does not match leaves text
//! unchanged, and a pattern that fails to compile degrades to a
//! never-matching regex.

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::never_matching_regex;

/// Container tags that interactive widgets hide behind. Used both for
/// `data-` attribute stripping and for empty-container cleanup.
const CONTAINER_TAGS: &[&str] = &["div", "span", "section", "output", "pre"];

/// HTML void elements that MDX requires in self-closing form.
const VOID_ELEMENTS: &str =
  "img|br|hr|input|meta|link|area|base|col|embed|source|track|wbr";

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>")
    .unwrap_or_else(|_| never_matching_regex())
});
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>")
    .unwrap_or_else(|_| never_matching_regex())
});
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?s)<!--.*?-->").unwrap_or_else(|_| never_matching_regex())
});
static DATA_CONTAINER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
  // The regex crate has no backreferences, so one pattern per tag
  CONTAINER_TAGS
    .iter()
    .map(|tag| {
      Regex::new(&format!(
        r"(?is)<{tag}\b[^>]*\bdata-[a-z0-9_-]+\s*=[^>]*>.*?</{tag}\s*>"
      ))
      .unwrap_or_else(|_| never_matching_regex())
    })
    .collect()
});
static EMPTY_CONTAINER_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
  CONTAINER_TAGS
    .iter()
    .map(|tag| {
      Regex::new(&format!(r"(?is)<{tag}\b[^>]*>\s*</{tag}\s*>"))
        .unwrap_or_else(|_| never_matching_regex())
    })
    .collect()
});
static FLOAT_PROGRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"FloatProgress\([^)]*\)")
    .unwrap_or_else(|_| never_matching_regex())
});
static BOX_WIDGET_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"[HV]Box\([^)]*\)").unwrap_or_else(|_| never_matching_regex())
});
static VOID_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(&format!(r"(?i)<({VOID_ELEMENTS})\b([^>]*?)\s*/?\s*>"))
    .unwrap_or_else(|_| never_matching_regex())
});
static BRACE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\\?[{}]").unwrap_or_else(|_| never_matching_regex())
});
static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\n{4,}").unwrap_or_else(|_| never_matching_regex())
});

/// Toggles for the individual sanitization stages.
///
/// Variant converter deployments disagree on which stages run; each stage
/// is independent, so dropping one never affects the others.
#[derive(Debug, Clone)]
#[allow(
  clippy::struct_excessive_bools,
  reason = "Config struct with related boolean flags"
)]
pub struct SanitizeOptions {
  /// Remove `<script>` and `<style>` blocks.
  pub strip_disallowed_tags:     bool,
  /// Remove HTML comments.
  pub strip_comments:            bool,
  /// Remove containers carrying `data-` attributes, then empty leftovers.
  pub strip_widget_containers:   bool,
  /// Replace textual widget placeholders with short bracketed labels.
  pub label_widget_placeholders: bool,
  /// Convert HTML void elements into self-closing form.
  pub self_close_void_elements:  bool,
  /// Escape literal `{` and `}`.
  pub escape_braces:             bool,
  /// Collapse runs of 3+ blank lines down to one.
  pub collapse_blank_lines:      bool,
}

impl Default for SanitizeOptions {
  fn default() -> Self {
    Self {
      strip_disallowed_tags:     true,
      strip_comments:            true,
      strip_widget_containers:   true,
      label_widget_placeholders: true,
      self_close_void_elements:  true,
      escape_braces:             true,
      collapse_blank_lines:      true,
    }
  }
}

/// One named transform in the sanitization pipeline.
pub struct Stage {
  pub name:  &'static str,
  pub apply: fn(&str) -> String,
}

impl Stage {
  #[must_use]
  pub const fn new(name: &'static str, apply: fn(&str) -> String) -> Self {
    Self { name, apply }
  }
}

/// The sanitization pipeline: ordered stages applied to non-code text.
pub struct Sanitizer {
  stages: Vec<Stage>,
}

impl Sanitizer {
  /// Build the pipeline for the given stage toggles, in the fixed order
  /// the stages depend on (brace escaping must come after the tag-level
  /// stages, which may introduce or rely on unescaped braces).
  #[must_use]
  pub fn new(options: &SanitizeOptions) -> Self {
    let mut stages = Vec::new();
    let mut push = |enabled: bool, name, apply| {
      if enabled {
        stages.push(Stage { name, apply });
      }
    };

    push(
      options.strip_disallowed_tags,
      "strip-disallowed-tags",
      strip_disallowed_tags as fn(&str) -> String,
    );
    push(options.strip_comments, "strip-comments", strip_html_comments);
    push(
      options.strip_widget_containers,
      "strip-widget-containers",
      strip_widget_containers,
    );
    push(
      options.label_widget_placeholders,
      "label-widget-placeholders",
      label_widget_placeholders,
    );
    push(
      options.self_close_void_elements,
      "self-close-void-elements",
      self_close_void_elements,
    );
    push(options.escape_braces, "escape-braces", escape_braces);
    push(
      options.collapse_blank_lines,
      "collapse-blank-lines",
      collapse_blank_lines,
    );

    Self { stages }
  }

  /// Build a pipeline from an explicit stage list, for variant rule sets.
  #[must_use]
  pub const fn from_stages(stages: Vec<Stage>) -> Self {
    Self { stages }
  }

  /// Names of the active stages, in application order.
  pub fn stage_names(&self) -> impl Iterator<Item = &'static str> {
    self.stages.iter().map(|stage| stage.name)
  }

  /// Sanitize text, leaving fenced code blocks byte-for-byte untouched.
  #[must_use]
  pub fn sanitize(&self, text: &str) -> String {
    split_fenced(text)
      .into_iter()
      .map(|segment| match segment {
        Segment::Code(code) => code,
        Segment::Text(prose) => self
          .stages
          .iter()
          .fold(prose, |text, stage| (stage.apply)(&text)),
      })
      .collect()
  }
}

impl Default for Sanitizer {
  fn default() -> Self {
    Self::new(&SanitizeOptions::default())
  }
}

/// A run of lines that is either prose or a fenced code block (fence
/// delimiter lines included).
#[derive(Debug, PartialEq, Eq)]
enum Segment {
  Text(String),
  Code(String),
}

/// Split text at triple-backtick/tilde fences. Concatenating the returned
/// segments reproduces the input exactly; an unclosed fence runs to the
/// end of input as code.
fn split_fenced(text: &str) -> Vec<Segment> {
  let mut segments = Vec::new();
  let mut current = String::new();
  let mut in_code = false;
  let mut fence_char = '`';
  let mut fence_count = 0;

  for line in text.split_inclusive('\n') {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|&c| c == '`' || c == '~');
    let count = marker
      .map(|c| trimmed.chars().take_while(|&ch| ch == c).count())
      .unwrap_or(0);

    if !in_code && count >= 3 {
      if !current.is_empty() {
        segments.push(Segment::Text(std::mem::take(&mut current)));
      }
      in_code = true;
      // Checked above: count >= 3 implies a marker char exists
      fence_char = marker.unwrap_or('`');
      fence_count = count;
      current.push_str(line);
    } else if in_code
      && marker == Some(fence_char)
      && count >= fence_count
      && trimmed.trim_end().chars().all(|c| c == fence_char)
    {
      current.push_str(line);
      segments.push(Segment::Code(std::mem::take(&mut current)));
      in_code = false;
    } else {
      current.push_str(line);
    }
  }

  if !current.is_empty() {
    segments.push(if in_code {
      Segment::Code(current)
    } else {
      Segment::Text(current)
    });
  }

  segments
}

fn strip_disallowed_tags(text: &str) -> String {
  let text = SCRIPT_RE.replace_all(text, "");
  STYLE_RE.replace_all(&text, "").into_owned()
}

fn strip_html_comments(text: &str) -> String {
  COMMENT_RE.replace_all(text, "").into_owned()
}

/// Remove interactive-widget placeholders: containers carrying `data-`
/// attributes together with their content, then any containers the
/// removal left empty (repeated until stable, since emptying one
/// container can empty its parent).
fn strip_widget_containers(text: &str) -> String {
  let mut result = text.to_string();

  for regex in DATA_CONTAINER_RES.iter() {
    result = regex.replace_all(&result, "").into_owned();
  }

  for _ in 0..8 {
    let mut changed = false;
    for regex in EMPTY_CONTAINER_RES.iter() {
      let replaced = regex.replace_all(&result, "");
      if let std::borrow::Cow::Owned(s) = replaced {
        result = s;
        changed = true;
      }
    }
    if !changed {
      break;
    }
  }

  result
}

fn label_widget_placeholders(text: &str) -> String {
  let text = FLOAT_PROGRESS_RE.replace_all(text, "[progress bar]");
  BOX_WIDGET_RE.replace_all(&text, "[widget]").into_owned()
}

/// Self-close HTML void elements. Already self-closed tags are
/// normalized, not doubled, so the stage is idempotent.
fn self_close_void_elements(text: &str) -> String {
  VOID_ELEMENT_RE
    .replace_all(text, |caps: &regex::Captures| {
      let tag = &caps[1];
      let attrs = caps[2].trim();
      if attrs.is_empty() {
        format!("<{tag} />")
      } else {
        format!("<{tag} {attrs} />")
      }
    })
    .into_owned()
}

/// Escape literal braces for JSX. Braces already escaped by an earlier
/// pass are left alone, so applying the stage twice changes nothing.
fn escape_braces(text: &str) -> String {
  BRACE_RE
    .replace_all(text, |caps: &regex::Captures| {
      let matched = &caps[0];
      if matched.starts_with('\\') {
        matched.to_string()
      } else {
        format!("\\{matched}")
      }
    })
    .into_owned()
}

fn collapse_blank_lines(text: &str) -> String {
  BLANK_LINES_RE.replace_all(text, "\n\n").into_owned()
}
