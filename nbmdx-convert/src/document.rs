//! Document assembly: drives the full per-notebook pipeline.
//!
//! Frontmatter is derived once over the whole cell sequence; each cell is
//! then rendered, sanitized, and has its images relocated, in that order,
//! and the fragments are concatenated beneath the frontmatter block. The
//! first-H1-consumed flag is cross-cell state owned here and threaded
//! through the fold explicitly.

use std::{
  path::{Path, PathBuf},
  sync::LazyLock,
};

use regex::Regex;

use crate::{
  error::Result,
  frontmatter::Frontmatter,
  images::{relocate_images, ImageOptions},
  notebook::{Cell, MarkdownCell, Notebook},
  render::{render_cell, RenderOptions},
  sanitize::{SanitizeOptions, Sanitizer},
  utils::{never_matching_regex, to_page_slug},
};

/// Extension of emitted documents.
pub const OUTPUT_EXTENSION: &str = "mdx";

static H1_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?m)^#\s+.*$\n?").unwrap_or_else(|_| never_matching_regex())
});

/// Options for converting one notebook.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
  /// Whether code cell outputs are rendered.
  pub show_output: bool,
  pub sanitize:    SanitizeOptions,
  pub images:      ImageOptions,
  /// Category-derived icon for the frontmatter, if any.
  pub icon:        Option<String>,
}

impl ConvertOptions {
  #[must_use]
  pub fn new() -> Self {
    Self {
      show_output: true,
      sanitize:    SanitizeOptions::default(),
      images:      ImageOptions::default(),
      icon:        None,
    }
  }
}

impl Default for ConvertOptions {
  fn default() -> Self {
    Self::new()
  }
}

/// One fully converted notebook, ready to be written out.
#[derive(Debug, Clone)]
pub struct ConvertedDocument {
  /// Stable, unique key derived from the notebook filename; other pages
  /// and the navigation layer reference the document by this slug.
  pub slug:        String,
  pub frontmatter: Frontmatter,
  /// Complete output file content: frontmatter block plus body.
  pub content:     String,
  /// Image files materialized into the images directory.
  pub images:      Vec<PathBuf>,
}

impl ConvertedDocument {
  /// Output filename, derived deterministically from the slug.
  #[must_use]
  pub fn output_filename(&self) -> String {
    format!("{}.{OUTPUT_EXTENSION}", self.slug)
  }
}

/// Convert a notebook file into an MDX document.
///
/// # Errors
///
/// Returns [`crate::ConvertError::MalformedInput`] for unparseable input,
/// [`crate::ConvertError::EmptyNotebook`] for a notebook without cells
/// (callers treat this as a skip), or an I/O error if reading the
/// notebook or writing a relocated image fails.
pub fn convert_notebook(
  path: &Path,
  options: &ConvertOptions,
) -> Result<ConvertedDocument> {
  let notebook = Notebook::from_path(path)?;
  let stem = path
    .file_stem()
    .map(|s| s.to_string_lossy().to_string())
    .unwrap_or_else(|| "notebook".to_string());
  let notebook_dir = path.parent().unwrap_or_else(|| Path::new("."));

  convert(&notebook, &stem, notebook_dir, options)
}

/// Convert an already-parsed notebook.
///
/// `stem` is the source filename stem the slug is derived from;
/// `notebook_dir` anchors relative image paths.
///
/// # Errors
///
/// Returns an I/O error if a relocated image cannot be written.
pub fn convert(
  notebook: &Notebook,
  stem: &str,
  notebook_dir: &Path,
  options: &ConvertOptions,
) -> Result<ConvertedDocument> {
  let slug = to_page_slug(stem);
  let frontmatter = Frontmatter::derive(notebook, options.icon.clone());
  let sanitizer = Sanitizer::new(&options.sanitize);
  let render_options = RenderOptions {
    show_output: options.show_output,
    language:    notebook.language.clone(),
  };

  let mut fragments: Vec<String> = Vec::new();
  let mut images: Vec<PathBuf> = Vec::new();
  // The first top-level heading becomes the frontmatter title and is
  // elided from the body exactly once, wherever it appears.
  let mut title_consumed = false;

  for cell in &notebook.cells {
    let elided;
    let cell = match cell {
      Cell::Markdown(md) if !title_consumed && H1_LINE_RE.is_match(&md.source) => {
        title_consumed = true;
        elided = Cell::Markdown(MarkdownCell {
          source:      H1_LINE_RE.replace(&md.source, "").into_owned(),
          attachments: md.attachments.clone(),
        });
        &elided
      },
      other => other,
    };

    let fragment = render_cell(cell, &render_options);
    let sanitized = sanitizer.sanitize(&fragment.text);
    let relocated = relocate_images(
      &sanitized,
      &fragment.images,
      &slug,
      notebook_dir,
      &options.images,
    )?;

    if !relocated.text.trim().is_empty() {
      fragments.push(relocated.text.trim_end().to_string());
    }
    images.extend(relocated.written);
  }

  let content = format!("{}\n{}\n", frontmatter.to_mdx(), fragments.join("\n\n"));

  Ok(ConvertedDocument {
    slug,
    frontmatter,
    content,
    images,
  })
}
