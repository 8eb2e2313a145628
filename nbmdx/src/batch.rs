//! Batch conversion: collect notebooks, convert them in parallel, write
//! the results, and summarize what happened.
//!
//! One malformed notebook never aborts a batch: failures are recorded
//! per notebook and reflected in the summary, and empty notebooks are
//! skips, not errors.

use std::{
  fs,
  path::{Path, PathBuf},
};

use color_eyre::eyre::{Context, Result, bail};
use log::{debug, error, info, warn};
use nbmdx_convert::{ConvertError, convert_notebook};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::Config;

/// One successfully converted page; the slug/title pair is the contract
/// consumed by the navigation tooling.
#[derive(Debug, Clone)]
pub struct ConvertedPage {
  pub slug:        String,
  pub title:       String,
  pub output_path: PathBuf,
}

/// Per-notebook conversion outcome.
#[derive(Debug)]
pub enum Outcome {
  Converted(ConvertedPage),
  Skipped { path: PathBuf, reason: String },
  Failed { path: PathBuf, error: String },
}

/// Aggregate result of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
  /// Successfully converted pages, sorted by slug.
  pub pages:   Vec<ConvertedPage>,
  pub skipped: usize,
  pub failed:  usize,
}

impl BatchSummary {
  #[must_use]
  pub fn converted(&self) -> usize {
    self.pages.len()
  }

  /// True when notebooks were attempted and every one of them failed
  /// outright. Skips alone do not fail a batch.
  #[must_use]
  pub fn is_total_failure(&self) -> bool {
    self.failed > 0 && self.pages.is_empty()
  }
}

/// Collect notebook files from a file or directory tree, dropping those
/// matching the exclusion-prefix blocklist.
///
/// Returns the retained paths (sorted for deterministic output) and the
/// number of excluded notebooks.
#[must_use]
pub fn collect_notebooks(
  input: &Path,
  exclude_prefixes: &[String],
) -> (Vec<PathBuf>, usize) {
  let mut notebooks: Vec<PathBuf> = if input.is_file() {
    vec![input.to_path_buf()]
  } else {
    WalkDir::new(input)
      .into_iter()
      .filter_map(std::result::Result::ok)
      .filter(|entry| entry.file_type().is_file())
      .map(|entry| entry.into_path())
      .filter(|path| {
        path.extension().is_some_and(|ext| ext == "ipynb")
      })
      .collect()
  };
  notebooks.sort();

  let total = notebooks.len();
  notebooks.retain(|path| {
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().to_string())
      .unwrap_or_default();
    let excluded = exclude_prefixes
      .iter()
      .any(|prefix| name.starts_with(prefix.as_str()));
    if excluded {
      debug!("excluding {} (prefix blocklist)", path.display());
    }
    !excluded
  });

  let excluded = total - notebooks.len();
  (notebooks, excluded)
}

/// Category of a notebook: the first path component under the input
/// root, used for frontmatter icon selection.
fn category_of(path: &Path, input: &Path) -> Option<String> {
  let relative = path.strip_prefix(input).ok()?;
  let mut components = relative.components();
  let first = components.next()?;
  // A bare filename directly under the root has no category
  components.next()?;
  Some(first.as_os_str().to_string_lossy().to_string())
}

fn convert_one(path: &Path, input: &Path, config: &Config) -> Outcome {
  let category = category_of(path, input);
  let options = config.convert_options(category.as_deref());

  match convert_notebook(path, &options) {
    Ok(doc) => {
      let output_path = config.output_dir.join(doc.output_filename());
      if let Err(e) = fs::write(&output_path, &doc.content) {
        return Outcome::Failed {
          path:  path.to_path_buf(),
          error: format!("failed to write {}: {e}", output_path.display()),
        };
      }
      debug!("converted {} -> {}", path.display(), output_path.display());
      Outcome::Converted(ConvertedPage {
        slug: doc.slug,
        title: doc.frontmatter.title,
        output_path,
      })
    },
    Err(ConvertError::EmptyNotebook) => Outcome::Skipped {
      path:   path.to_path_buf(),
      reason: "no cells".to_string(),
    },
    Err(e) => Outcome::Failed {
      path:  path.to_path_buf(),
      error: e.to_string(),
    },
  }
}

/// Run a batch conversion for the loaded configuration.
///
/// # Errors
///
/// Returns an error if no input was given, no notebooks are found, or
/// the output directory cannot be created. Per-notebook failures do not
/// error here; they are reported in the returned summary.
pub fn run(config: &Config) -> Result<BatchSummary> {
  let Some(ref input) = config.input else {
    bail!("no input notebook file or directory configured");
  };
  if !input.exists() {
    bail!("input path does not exist: {}", input.display());
  }

  fs::create_dir_all(&config.output_dir).wrap_err_with(|| {
    format!(
      "Failed to create output directory: {}",
      config.output_dir.display()
    )
  })?;

  let (notebooks, excluded) =
    collect_notebooks(input, &config.exclude_prefixes);
  if notebooks.is_empty() && excluded == 0 {
    bail!("no notebooks found under {}", input.display());
  }
  info!(
    "Converting {} notebooks ({excluded} excluded)",
    notebooks.len()
  );

  let outcomes: Vec<Outcome> = notebooks
    .par_iter()
    .map(|path| convert_one(path, input, config))
    .collect();

  let mut summary = BatchSummary {
    skipped: excluded,
    ..BatchSummary::default()
  };
  for outcome in outcomes {
    match outcome {
      Outcome::Converted(page) => summary.pages.push(page),
      Outcome::Skipped { path, reason } => {
        warn!("skipped {}: {reason}", path.display());
        summary.skipped += 1;
      },
      Outcome::Failed { path, error } => {
        error!("failed to convert {}: {error}", path.display());
        summary.failed += 1;
      },
    }
  }
  summary.pages.sort_by(|a, b| a.slug.cmp(&b.slug));

  info!(
    "Conversion complete: {} converted, {} skipped, {} failed",
    summary.converted(),
    summary.skipped,
    summary.failed
  );

  if config.manifest {
    let manifest_path = config.output_dir.join("pages.json");
    crate::manifest::write_manifest(&manifest_path, &summary.pages)?;
    info!("Wrote navigation manifest to {}", manifest_path.display());
  }

  Ok(summary)
}
