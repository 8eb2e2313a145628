use std::io;

use thiserror::Error;

/// Error type for notebook conversion.
///
/// Only failures that abort the conversion of a single notebook are
/// represented here. Missing image assets and unrecognized output
/// representations are non-fatal by design and surface as log warnings
/// instead.
#[derive(Debug, Error)]
pub enum ConvertError {
  /// The input could not be parsed as a notebook document.
  #[error("not a valid notebook document: {0}")]
  MalformedInput(String),

  /// The notebook parsed correctly but contains no cells. Batch drivers
  /// treat this as a skip, not a failure.
  #[error("notebook has no cells")]
  EmptyNotebook,

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;
