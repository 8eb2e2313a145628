use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line interface for nbmdx
#[derive(Parser, Debug)]
#[command(author, version, about = "nbmdx: notebooks to Mintlify MDX")]
pub struct Cli {
  /// Subcommand to execute (see [`Commands`])
  #[command(subcommand)]
  pub command: Commands,

  /// Enable verbose debug logging
  #[arg(short, long)]
  pub verbose: bool,

  /// Path to a TOML configuration file. Defaults to `nbmdx.toml` in the
  /// working directory when present.
  #[arg(short = 'c', long = "config-file")]
  pub config_file: Option<PathBuf>,
}

/// All supported subcommands for the nbmdx CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Convert a notebook file or a directory tree of notebooks to MDX.
  Convert {
    /// Notebook file or directory containing notebooks.
    input: PathBuf,

    /// Output directory for generated MDX files and images.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exclude cell outputs from the conversion.
    #[arg(long = "no-output", action = clap::ArgAction::SetTrue)]
    no_output: bool,

    /// Exclude notebooks whose filename starts with this prefix (can be
    /// specified multiple times).
    #[arg(long = "exclude-prefix", action = clap::ArgAction::Append)]
    exclude_prefix: Vec<String>,

    /// Number of threads to use for parallel conversion.
    #[arg(short = 'p', long = "jobs")]
    jobs: Option<usize>,

    /// Write a pages.json manifest (slug to title mapping) next to the
    /// generated MDX files for the navigation tooling.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    manifest: bool,
  },

  /// Initialize a new nbmdx configuration file
  Init {
    /// Path to create the configuration file at
    #[arg(short, long, default_value = "nbmdx.toml")]
    output: PathBuf,

    /// Force overwrite if file already exists
    #[arg(short, long)]
    force: bool,
  },
}

impl Cli {
  /// Parse command line arguments into a [`Cli`] struct.
  #[must_use]
  pub fn parse_args() -> Self {
    Self::parse()
  }
}
