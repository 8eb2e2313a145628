use std::{collections::HashMap, fs, path::PathBuf};

use color_eyre::eyre::{Context, Result};
use log::debug;
use nbmdx_convert::{ConvertOptions, ImageOptions, SanitizeOptions};
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, Commands};

// Functions allow for more complex default values that can't be expressed
// as literals.
fn default_output_dir() -> PathBuf {
  PathBuf::from("docs")
}

fn default_images_subdir() -> String {
  "images".to_string()
}

fn default_image_public_prefix() -> String {
  "/images".to_string()
}

fn default_branding_markers() -> Vec<String> {
  vec!["branding/".to_string()]
}

const fn default_true() -> bool {
  true
}

/// Configuration options for nbmdx
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  /// Notebook file or directory to convert
  #[serde(default)]
  pub input: Option<PathBuf>,

  /// Output directory for generated MDX files
  #[serde(default = "default_output_dir")]
  pub output_dir: PathBuf,

  /// Subdirectory of `output_dir` that relocated images are written to
  #[serde(default = "default_images_subdir")]
  pub images_subdir: String,

  /// Path prefix under which the documentation site serves the images
  /// directory
  #[serde(default = "default_image_public_prefix")]
  pub image_public_prefix: String,

  /// Whether code cell outputs are rendered
  #[serde(default = "default_true")]
  pub show_output: bool,

  /// Notebooks whose filename starts with one of these prefixes are
  /// excluded from conversion
  #[serde(default)]
  pub exclude_prefixes: Vec<String>,

  /// Substring markers identifying branding assets whose image
  /// references are dropped
  #[serde(default = "default_branding_markers")]
  pub branding_markers: Vec<String>,

  /// Whether `<img src=...>` tags are rewritten in addition to
  /// markdown-syntax images
  #[serde(default = "default_true")]
  pub rewrite_html_img: bool,

  /// Map of category (first directory component under the input root)
  /// to frontmatter icon name
  #[serde(default)]
  pub icons: HashMap<String, String>,

  /// Whether to write a pages.json manifest after a batch conversion
  #[serde(default)]
  pub manifest: bool,

  /// Number of threads to use for parallel conversion
  #[serde(default)]
  pub jobs: Option<usize>,

  /// Sanitization stage toggles
  #[serde(default)]
  pub sanitize: SanitizeConfig,
}

/// Per-stage sanitization toggles, mirroring
/// [`nbmdx_convert::SanitizeOptions`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(
  clippy::struct_excessive_bools,
  reason = "Config struct with related boolean flags"
)]
pub struct SanitizeConfig {
  #[serde(default = "default_true")]
  pub strip_disallowed_tags: bool,

  #[serde(default = "default_true")]
  pub strip_comments: bool,

  #[serde(default = "default_true")]
  pub strip_widget_containers: bool,

  #[serde(default = "default_true")]
  pub label_widget_placeholders: bool,

  #[serde(default = "default_true")]
  pub self_close_void_elements: bool,

  #[serde(default = "default_true")]
  pub escape_braces: bool,

  #[serde(default = "default_true")]
  pub collapse_blank_lines: bool,
}

impl Default for SanitizeConfig {
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

impl Default for Config {
  fn default() -> Self {
    Self {
      input:               None,
      output_dir:          default_output_dir(),
      images_subdir:       default_images_subdir(),
      image_public_prefix: default_image_public_prefix(),
      show_output:         true,
      exclude_prefixes:    Vec::new(),
      branding_markers:    default_branding_markers(),
      rewrite_html_img:    true,
      icons:               HashMap::new(),
      manifest:            false,
      jobs:                None,
      sanitize:            SanitizeConfig::default(),
    }
  }
}

/// Default configuration template written by `nbmdx init`.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# nbmdx configuration

# Notebook file or directory to convert.
# input = "notebooks"

# Output directory for generated MDX files.
output_dir = "docs"

# Subdirectory of output_dir for relocated images, and the path prefix
# the documentation site serves it under.
images_subdir = "images"
image_public_prefix = "/images"

# Render code cell outputs.
show_output = true

# Notebooks whose filename starts with one of these prefixes are skipped.
exclude_prefixes = []

# Image references containing one of these substrings are dropped.
branding_markers = ["branding/"]

# Rewrite <img src=...> tags in addition to markdown-syntax images.
rewrite_html_img = true

# Write a pages.json manifest (slug to title) after a batch conversion.
manifest = false

# Frontmatter icons by category (first directory component under input).
# [icons]
# Getting_Started = "rocket"
# Analyzing_Data = "chart-line"

# Sanitization stages; disable individual stages if a deployment needs to.
# [sanitize]
# strip_disallowed_tags = true
# strip_comments = true
# strip_widget_containers = true
# label_widget_placeholders = true
# self_close_void_elements = true
# escape_braces = true
# collapse_blank_lines = true
"#;

impl Config {
  /// Load configuration from file (if any) and merge CLI arguments over
  /// it. CLI values win.
  ///
  /// # Errors
  ///
  /// Returns an error if an explicitly requested configuration file
  /// cannot be read or parsed.
  pub fn load(cli: &Cli) -> Result<Self> {
    let mut config = match &cli.config_file {
      Some(path) => {
        let content = fs::read_to_string(path).wrap_err_with(|| {
          format!("Failed to read configuration file: {}", path.display())
        })?;
        toml::from_str(&content).wrap_err_with(|| {
          format!("Failed to parse configuration file: {}", path.display())
        })?
      },
      None => {
        let default_path = PathBuf::from("nbmdx.toml");
        if default_path.is_file() {
          debug!("using configuration from {}", default_path.display());
          let content = fs::read_to_string(&default_path)
            .wrap_err("Failed to read nbmdx.toml")?;
          toml::from_str(&content).wrap_err("Failed to parse nbmdx.toml")?
        } else {
          Self::default()
        }
      },
    };

    config.merge_with_cli(cli);
    Ok(config)
  }

  /// Apply CLI overrides for the `convert` subcommand.
  fn merge_with_cli(&mut self, cli: &Cli) {
    let Commands::Convert {
      input,
      output,
      no_output,
      exclude_prefix,
      jobs,
      manifest,
    } = &cli.command
    else {
      return;
    };

    self.input = Some(input.clone());
    if let Some(output) = output {
      self.output_dir.clone_from(output);
    }
    if *no_output {
      self.show_output = false;
    }
    if !exclude_prefix.is_empty() {
      self.exclude_prefixes.extend(exclude_prefix.iter().cloned());
    }
    if jobs.is_some() {
      self.jobs = *jobs;
    }
    if *manifest {
      self.manifest = true;
    }
  }

  /// Directory all relocated images are written into.
  #[must_use]
  pub fn images_dir(&self) -> PathBuf {
    self.output_dir.join(&self.images_subdir)
  }

  /// Build the per-notebook conversion options, with the frontmatter
  /// icon selected by the notebook's category.
  #[must_use]
  pub fn convert_options(&self, category: Option<&str>) -> ConvertOptions {
    ConvertOptions {
      show_output: self.show_output,
      sanitize:    SanitizeOptions {
        strip_disallowed_tags:     self.sanitize.strip_disallowed_tags,
        strip_comments:            self.sanitize.strip_comments,
        strip_widget_containers:   self.sanitize.strip_widget_containers,
        label_widget_placeholders: self.sanitize.label_widget_placeholders,
        self_close_void_elements:  self.sanitize.self_close_void_elements,
        escape_braces:             self.sanitize.escape_braces,
        collapse_blank_lines:      self.sanitize.collapse_blank_lines,
      },
      images:      ImageOptions {
        images_dir:       self.images_dir(),
        public_prefix:    self.image_public_prefix.clone(),
        branding_markers: self.branding_markers.clone(),
        rewrite_html_img: self.rewrite_html_img,
      },
      icon:        category.and_then(|c| self.icons.get(c).cloned()),
    }
  }

  /// Write the default configuration template to `output`.
  ///
  /// # Errors
  ///
  /// Returns an error if the file cannot be written.
  pub fn generate_default_config(output: &std::path::Path) -> Result<()> {
    fs::write(output, DEFAULT_CONFIG_TEMPLATE).wrap_err_with(|| {
      format!("Failed to write configuration file: {}", output.display())
    })?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, reason = "Fine in tests")]

  use super::*;

  #[test]
  fn test_default_template_parses_back() {
    let config: Config =
      toml::from_str(DEFAULT_CONFIG_TEMPLATE).expect("template should parse");
    assert_eq!(config.output_dir, PathBuf::from("docs"));
    assert!(config.show_output);
    assert!(config.exclude_prefixes.is_empty());
  }

  #[test]
  fn test_partial_config_fills_defaults() {
    let config: Config = toml::from_str(
      r#"
      output_dir = "site/examples"
      exclude_prefixes = ["Raster_Inference"]

      [icons]
      Getting_Started = "rocket"
      "#,
    )
    .expect("should parse");

    assert_eq!(config.output_dir, PathBuf::from("site/examples"));
    assert_eq!(config.exclude_prefixes, vec!["Raster_Inference".to_string()]);
    assert_eq!(
      config.icons.get("Getting_Started").map(String::as_str),
      Some("rocket")
    );
    assert_eq!(config.image_public_prefix, "/images");
    assert!(config.sanitize.escape_braces);
  }

  #[test]
  fn test_convert_options_carry_icon_for_category() {
    let mut config = Config::default();
    config
      .icons
      .insert("Analyzing_Data".to_string(), "chart-line".to_string());

    let options = config.convert_options(Some("Analyzing_Data"));
    assert_eq!(options.icon.as_deref(), Some("chart-line"));

    let options = config.convert_options(Some("Unmapped"));
    assert_eq!(options.icon, None);
  }
}
