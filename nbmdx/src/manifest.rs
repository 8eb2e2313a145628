//! Navigation manifest: the slug-to-title listing consumed by the
//! external navigation tooling.
//!
//! This is the whole of the converter's obligation toward the navigation
//! layer: a stable, unique slug and a title per converted document. The
//! navigation tree itself is owned elsewhere.

use std::{fs, path::Path};

use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use crate::batch::ConvertedPage;

#[derive(Debug, Serialize)]
struct PageEntry<'a> {
  slug:  &'a str,
  title: &'a str,
}

#[derive(Debug, Serialize)]
struct Manifest<'a> {
  pages: Vec<PageEntry<'a>>,
}

/// Write the pages.json manifest for a batch of converted pages.
///
/// Pages are expected pre-sorted by slug, keeping the manifest
/// deterministic across runs.
///
/// # Errors
///
/// Returns an error if serialization or the file write fails.
pub fn write_manifest(path: &Path, pages: &[ConvertedPage]) -> Result<()> {
  let manifest = Manifest {
    pages: pages
      .iter()
      .map(|page| PageEntry {
        slug:  &page.slug,
        title: &page.title,
      })
      .collect(),
  };

  let json = serde_json::to_string_pretty(&manifest)
    .wrap_err("Failed to serialize navigation manifest")?;
  fs::write(path, format!("{json}\n")).wrap_err_with(|| {
    format!("Failed to write navigation manifest: {}", path.display())
  })?;
  Ok(())
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, reason = "Fine in tests")]

  use std::path::PathBuf;

  use tempfile::tempdir;

  use super::*;

  #[test]
  fn test_manifest_lists_slug_and_title() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("pages.json");
    let pages = vec![
      ConvertedPage {
        slug:        "getting-started".to_string(),
        title:       "Getting Started".to_string(),
        output_path: PathBuf::from("docs/getting-started.mdx"),
      },
      ConvertedPage {
        slug:        "spatial-joins".to_string(),
        title:       "Spatial Joins".to_string(),
        output_path: PathBuf::from("docs/spatial-joins.mdx"),
      },
    ];

    write_manifest(&path, &pages).expect("should write");

    let written = fs::read_to_string(&path).expect("should read back");
    let value: serde_json::Value =
      serde_json::from_str(&written).expect("valid json");
    assert_eq!(value["pages"][0]["slug"], "getting-started");
    assert_eq!(value["pages"][1]["title"], "Spatial Joins");
  }
}
