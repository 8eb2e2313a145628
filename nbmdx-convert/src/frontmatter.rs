//! Frontmatter derivation: page title and description from the
//! notebook's leading markdown content.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
  notebook::Notebook,
  utils::{never_matching_regex, strip_inline_markup},
};

/// Descriptions longer than this are truncated with an ellipsis marker.
const DESCRIPTION_LIMIT: usize = 160;

static H1_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?m)^#\s+(.+)$").unwrap_or_else(|_| never_matching_regex())
});

/// Page metadata emitted as the document's `---` delimited header.
///
/// Derived once per notebook and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frontmatter {
  pub title:       String,
  /// First paragraph of plain text after the title; empty when the
  /// notebook has none.
  pub description: String,
  /// Optional icon name, selected by the notebook's category.
  pub icon:        Option<String>,
}

impl Frontmatter {
  /// Derive title and description from the notebook's markdown cells.
  ///
  /// The title is the text of the first level-1 heading found in any
  /// markdown cell, defaulting to "Untitled". The description is the
  /// first non-empty, non-heading, non-HTML line after that heading,
  /// with inline markup stripped and truncated to 160 characters.
  #[must_use]
  pub fn derive(notebook: &Notebook, icon: Option<String>) -> Self {
    Self {
      title: extract_title(notebook),
      description: extract_description(notebook),
      icon,
    }
  }

  /// Serialize as a Mintlify frontmatter block, `---` delimited, with
  /// quotes escaped for the `key: "value"` lines.
  #[must_use]
  pub fn to_mdx(&self) -> String {
    let mut lines = vec!["---".to_string()];
    lines.push(format!("title: \"{}\"", escape_quotes(&self.title)));
    if !self.description.is_empty() {
      lines.push(format!(
        "description: \"{}\"",
        escape_quotes(&self.description)
      ));
    }
    if let Some(icon) = &self.icon {
      lines.push(format!("icon: \"{}\"", escape_quotes(icon)));
    }
    lines.push("---".to_string());
    lines.push(String::new());
    lines.join("\n")
  }
}

fn extract_title(notebook: &Notebook) -> String {
  notebook
    .markdown_cells()
    .find_map(|cell| {
      H1_RE
        .captures(&cell.source)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
    })
    .unwrap_or_else(|| "Untitled".to_string())
}

fn extract_description(notebook: &Notebook) -> String {
  let mut found_title = false;

  for cell in notebook.markdown_cells() {
    for line in cell.source.lines() {
      let line = line.trim();

      if !found_title {
        if line.starts_with("# ") {
          found_title = true;
        }
        continue;
      }

      // Skip blanks, further headings, and raw HTML such as <img> banners
      if line.is_empty() || line.starts_with('#') || line.starts_with('<') {
        continue;
      }

      let description = strip_inline_markup(line);
      let description = description.trim();
      if description.is_empty() || description.starts_with('<') {
        continue;
      }
      return truncate_description(description);
    }
  }

  String::new()
}

fn truncate_description(text: &str) -> String {
  if text.chars().count() > DESCRIPTION_LIMIT {
    let truncated: String = text.chars().take(DESCRIPTION_LIMIT - 3).collect();
    format!("{}...", truncated.trim_end())
  } else {
    text.to_string()
  }
}

fn escape_quotes(text: &str) -> String {
  text.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, reason = "Fine in tests")]

  use super::*;
  use crate::notebook::Notebook;

  fn notebook_from_markdown(sources: &[&str]) -> Notebook {
    let cells: Vec<String> = sources
      .iter()
      .map(|s| {
        format!(
          r#"{{"cell_type": "markdown", "source": {}}}"#,
          serde_json::to_string(s).expect("valid string")
        )
      })
      .collect();
    let json = format!(r#"{{"cells": [{}]}}"#, cells.join(","));
    Notebook::parse(json.as_bytes()).expect("should parse")
  }

  #[test]
  fn test_title_and_first_paragraph() {
    let nb = notebook_from_markdown(&[
      "# My Notebook\n\nThis computes stuff.\n",
    ]);
    let fm = Frontmatter::derive(&nb, None);

    assert_eq!(fm.title, "My Notebook");
    assert_eq!(fm.description, "This computes stuff.");
  }

  #[test]
  fn test_title_defaults_to_untitled() {
    let nb = notebook_from_markdown(&["No heading here, just prose.\n"]);
    let fm = Frontmatter::derive(&nb, None);

    assert_eq!(fm.title, "Untitled");
    assert_eq!(fm.description, "");
  }

  #[test]
  fn test_description_spans_cells_and_skips_html() {
    let nb = notebook_from_markdown(&[
      "# Title\n<img src=\"banner.png\">\n\n## Subsection\n",
      "[Apache Sedona](https://sedona.apache.org) makes **spatial** joins easy.\n",
    ]);
    let fm = Frontmatter::derive(&nb, None);

    assert_eq!(
      fm.description,
      "Apache Sedona makes spatial joins easy."
    );
  }

  #[test]
  fn test_long_description_truncated_with_ellipsis() {
    let long = "word ".repeat(60);
    let nb = notebook_from_markdown(&[&format!("# T\n\n{long}\n")]);
    let fm = Frontmatter::derive(&nb, None);

    assert!(fm.description.len() <= DESCRIPTION_LIMIT);
    assert!(fm.description.ends_with("..."));
  }

  #[test]
  fn test_to_mdx_escapes_quotes_and_orders_keys() {
    let fm = Frontmatter {
      title:       "Reading \"Foreign\" Catalogs".to_string(),
      description: "How to read data.".to_string(),
      icon:        Some("database".to_string()),
    };
    let mdx = fm.to_mdx();

    assert!(mdx.starts_with("---\n"));
    assert!(mdx.contains("title: \"Reading \\\"Foreign\\\" Catalogs\""));
    assert!(mdx.contains("description: \"How to read data.\""));
    assert!(mdx.contains("icon: \"database\""));
    assert!(mdx.ends_with("---\n"));
  }

  #[test]
  fn test_empty_description_omitted_from_block() {
    let fm = Frontmatter {
      title:       "T".to_string(),
      description: String::new(),
      icon:        None,
    };
    assert!(!fm.to_mdx().contains("description"));
    assert!(!fm.to_mdx().contains("icon"));
  }
}
