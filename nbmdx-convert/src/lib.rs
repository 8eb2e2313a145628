//! # nbmdx-convert - Jupyter notebook to Mintlify MDX conversion core
//!
//! This crate implements the notebook-to-MDX transformation pipeline:
//! notebook JSON parsing, per-cell rendering into JSX-safe markup,
//! MDX sanitization, image relocation, and frontmatter extraction.
//!
//! ## Quick Start
//!
//! ```rust
//! use nbmdx_convert::{convert, ConvertOptions, Notebook};
//!
//! let json = r##"{"cells": [
//!   {"cell_type": "markdown", "source": "# Hello\n\nA tiny notebook.\n"},
//!   {"cell_type": "code", "source": "print(1)", "outputs": []}
//! ]}"##;
//!
//! let notebook = Notebook::parse(json.as_bytes()).unwrap();
//! let doc = convert(
//!   &notebook,
//!   "Hello_World",
//!   std::path::Path::new("."),
//!   &ConvertOptions::new(),
//! )
//! .unwrap();
//!
//! assert_eq!(doc.slug, "hello-world");
//! assert!(doc.content.starts_with("---\ntitle: \"Hello\""));
//! ```
//!
//! ## Design
//!
//! - **Defensive text transforms**: sanitization stages never fail; a
//!   regex that does not match leaves text unchanged, so one malformed
//!   notebook degrades gracefully instead of aborting a batch.
//! - **Code is never mutated**: fenced code blocks are split out before
//!   sanitization and re-spliced verbatim.
//! - **Deterministic naming**: output slugs and slug-prefixed image
//!   filenames are pure functions of the input filename, which keeps a
//!   shared flat images directory collision-free.

pub mod document;
pub mod error;
pub mod frontmatter;
pub mod images;
pub mod notebook;
pub mod render;
pub mod sanitize;
pub mod utils;

pub use crate::{
  document::{convert, convert_notebook, ConvertOptions, ConvertedDocument, OUTPUT_EXTENSION},
  error::{ConvertError, Result},
  frontmatter::Frontmatter,
  images::{relocate_images, ImageOptions, RelocationOutcome},
  notebook::{Attachment, Cell, CodeCell, MarkdownCell, Notebook, Output},
  render::{
    render_cell,
    ImageReference,
    ImageSource,
    ImageSyntax,
    RenderOptions,
    RenderedFragment,
  },
  sanitize::{SanitizeOptions, Sanitizer, Stage},
};
