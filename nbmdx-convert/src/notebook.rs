//! Notebook document parsing.
//!
//! Loads a Jupyter notebook from its on-disk JSON representation into a
//! typed cell sequence. Structural problems (not valid notebook JSON) are
//! the only fatal errors here; cell *content* is deliberately not
//! validated, since downstream transforms must tolerate arbitrary text.

use std::{fs, path::Path};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConvertError, Result};

/// A parsed notebook: an ordered cell sequence plus the document language.
#[derive(Debug, Clone)]
pub struct Notebook {
  /// Cells in document order.
  pub cells:    Vec<Cell>,
  /// Language used to tag fenced code blocks, from the kernel metadata.
  pub language: String,
}

/// A single notebook cell.
#[derive(Debug, Clone)]
pub enum Cell {
  Markdown(MarkdownCell),
  Code(CodeCell),
  /// A cell type the converter does not render (e.g. `raw`). Preserved so
  /// the assembler can skip it without failing the document.
  Other,
}

/// A markdown cell: raw text plus any embedded binary attachments.
#[derive(Debug, Clone)]
pub struct MarkdownCell {
  pub source:      String,
  pub attachments: Vec<Attachment>,
}

/// A named base64 attachment with its mime-type entries in document order.
#[derive(Debug, Clone)]
pub struct Attachment {
  pub name:    String,
  /// (mime-type, base64 payload) pairs, first entry preferred.
  pub entries: Vec<(String, String)>,
}

/// A code cell: source text plus its execution outputs in encounter order.
#[derive(Debug, Clone)]
pub struct CodeCell {
  pub source:  String,
  pub outputs: Vec<Output>,
}

/// A single execution output owned by a code cell.
#[derive(Debug, Clone)]
pub enum Output {
  /// stdout/stderr text.
  Stream { text: String },
  /// `execute_result` or `display_data`: mime-type to payload, in
  /// document order so preference selection is deterministic.
  Data { entries: Vec<(String, String)> },
  /// A raised exception with its traceback lines.
  Error {
    name:      String,
    message:   String,
    traceback: Vec<String>,
  },
}

/// Notebook `source`/`text` fields are stored either as one string or as a
/// list of line strings; both deserialize to the joined text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SourceText {
  One(String),
  Many(Vec<String>),
}

impl SourceText {
  fn join(self) -> String {
    match self {
      Self::One(s) => s,
      Self::Many(lines) => lines.concat(),
    }
  }
}

impl Default for SourceText {
  fn default() -> Self {
    Self::One(String::new())
  }
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
  cells:    Vec<RawCell>,
  #[serde(default)]
  metadata: RawMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RawMetadata {
  #[serde(default)]
  kernelspec:    Option<RawKernelspec>,
  #[serde(default)]
  language_info: Option<RawLanguageInfo>,
}

#[derive(Debug, Deserialize)]
struct RawKernelspec {
  #[serde(default)]
  language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawLanguageInfo {
  #[serde(default)]
  name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
  cell_type: String,
  #[serde(default)]
  source:    SourceText,
  #[serde(default)]
  outputs:   Vec<RawOutput>,
  #[serde(default)]
  attachments: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
  output_type: String,
  #[serde(default)]
  text:        Option<SourceText>,
  #[serde(default)]
  data:        Option<serde_json::Map<String, Value>>,
  #[serde(default)]
  ename:       Option<String>,
  #[serde(default)]
  evalue:      Option<String>,
  #[serde(default)]
  traceback:   Option<Vec<String>>,
}

/// Join a JSON payload that may be a string or a list of strings.
///
/// Returns `None` for payloads that are neither (e.g. the JSON object
/// carried by `application/json` outputs), which the renderer treats as an
/// unrecognized representation.
fn join_payload(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Array(items) => {
      let mut joined = String::new();
      for item in items {
        joined.push_str(item.as_str()?);
      }
      Some(joined)
    },
    _ => None,
  }
}

fn convert_output(raw: RawOutput) -> Option<Output> {
  match raw.output_type.as_str() {
    "stream" => Some(Output::Stream {
      text: raw.text.map(SourceText::join).unwrap_or_default(),
    }),
    "execute_result" | "display_data" => {
      let entries = raw
        .data
        .unwrap_or_default()
        .iter()
        .filter_map(|(mime, payload)| {
          join_payload(payload).map(|text| (mime.clone(), text))
        })
        .collect();
      Some(Output::Data { entries })
    },
    "error" => Some(Output::Error {
      name:      raw.ename.unwrap_or_else(|| "Error".to_string()),
      message:   raw.evalue.unwrap_or_default(),
      traceback: raw.traceback.unwrap_or_default(),
    }),
    // Unknown output types carry nothing we can render
    _ => None,
  }
}

fn convert_cell(raw: RawCell) -> Cell {
  match raw.cell_type.as_str() {
    "markdown" => {
      let attachments = raw
        .attachments
        .unwrap_or_default()
        .iter()
        .map(|(name, mimes)| {
          let entries = mimes
            .as_object()
            .map(|map| {
              map
                .iter()
                .filter_map(|(mime, payload)| {
                  join_payload(payload).map(|text| (mime.clone(), text))
                })
                .collect()
            })
            .unwrap_or_default();
          Attachment {
            name: name.clone(),
            entries,
          }
        })
        .collect();

      Cell::Markdown(MarkdownCell {
        source: raw.source.join(),
        attachments,
      })
    },
    "code" => Cell::Code(CodeCell {
      source:  raw.source.join(),
      outputs: raw.outputs.into_iter().filter_map(convert_output).collect(),
    }),
    _ => Cell::Other,
  }
}

impl Notebook {
  /// Parse a notebook from its JSON bytes.
  ///
  /// # Errors
  ///
  /// Returns [`ConvertError::MalformedInput`] if the bytes are not valid
  /// notebook JSON and [`ConvertError::EmptyNotebook`] if the cell
  /// sequence is empty.
  pub fn parse(bytes: &[u8]) -> Result<Self> {
    let raw: RawNotebook = serde_json::from_slice(bytes)
      .map_err(|e| ConvertError::MalformedInput(e.to_string()))?;

    if raw.cells.is_empty() {
      return Err(ConvertError::EmptyNotebook);
    }

    let language = raw
      .metadata
      .kernelspec
      .and_then(|k| k.language)
      .or_else(|| raw.metadata.language_info.and_then(|l| l.name))
      .unwrap_or_else(|| "python".to_string());

    Ok(Self {
      cells: raw.cells.into_iter().map(convert_cell).collect(),
      language,
    })
  }

  /// Read and parse a notebook file.
  ///
  /// # Errors
  ///
  /// Returns an I/O error if the file cannot be read, otherwise the same
  /// errors as [`Notebook::parse`].
  pub fn from_path(path: &Path) -> Result<Self> {
    let bytes = fs::read(path)?;
    Self::parse(&bytes)
  }

  /// Iterate over the markdown cells in document order.
  pub fn markdown_cells(&self) -> impl Iterator<Item = &MarkdownCell> {
    self.cells.iter().filter_map(|cell| match cell {
      Cell::Markdown(md) => Some(md),
      _ => None,
    })
  }
}
