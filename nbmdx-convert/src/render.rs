//! Cell rendering: one notebook cell to one MDX-compatible text fragment.
//!
//! Rendering is a pure text transform. Markdown cells pass through
//! verbatim, with image references recorded for later relocation; code
//! cells become a fenced block followed by their rendered outputs. Output
//! payloads select exactly one representation via a fixed mime-type
//! preference order.

use std::{collections::HashSet, sync::LazyLock};

use log::debug;
use regex::Regex;

use crate::{
  notebook::{Cell, CodeCell, MarkdownCell, Output},
  utils::never_matching_regex,
};

/// Options controlling cell rendering.
#[derive(Debug, Clone)]
pub struct RenderOptions {
  /// Whether code cell outputs are rendered at all.
  pub show_output: bool,
  /// Language tag applied to code cell fences.
  pub language:    String,
}

impl Default for RenderOptions {
  fn default() -> Self {
    Self {
      show_output: true,
      language:    "python".to_string(),
    }
  }
}

/// Which markup syntax an image reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSyntax {
  /// `![alt](path)`
  Markdown,
  /// `<img src="path">`
  HtmlTag,
}

/// Where an image reference's bytes come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
  /// Base64 payload captured from the owning cell's attachment map.
  Attachment { mime: String, payload: String },
  /// A path to resolve against the notebook's own directory.
  Local,
  /// An `attachment:` reference whose name is absent from the cell's
  /// attachment map. Left unmodified by the relocator.
  Unresolved,
}

/// An image reference discovered during rendering, pending relocation.
#[derive(Debug, Clone)]
pub struct ImageReference {
  /// The path exactly as written in the source markup.
  pub original: String,
  pub syntax:   ImageSyntax,
  pub source:   ImageSource,
}

/// A rendered cell: MDX-safe text plus pending image relocations.
#[derive(Debug, Clone, Default)]
pub struct RenderedFragment {
  pub text:   String,
  pub images: Vec<ImageReference>,
}

/// Mime types in preference order; the first one present in an output's
/// data map wins and the rest are ignored.
const MIME_PREFERENCE: &[&str] = &[
  "image/png",
  "image/jpeg",
  "image/svg+xml",
  "text/html",
  "text/plain",
];

static MD_IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"!\[[^\]]*\]\(\s*([^)\s]+)(?:\s+"[^"]*")?\s*\)"#)
    .unwrap_or_else(|_| never_matching_regex())
});
static HTML_IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["'][^>]*?>"#)
    .unwrap_or_else(|_| never_matching_regex())
});
static ANSI_ESCAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\x1b\[[0-9;]*m").unwrap_or_else(|_| never_matching_regex())
});

/// Render a single cell into an MDX fragment.
#[must_use]
pub fn render_cell(cell: &Cell, options: &RenderOptions) -> RenderedFragment {
  match cell {
    Cell::Markdown(md) => render_markdown_cell(md),
    Cell::Code(code) => render_code_cell(code, options),
    Cell::Other => RenderedFragment::default(),
  }
}

/// A markdown cell passes through verbatim; image references are recorded
/// as pending relocations, with attachment payloads captured from the
/// cell while it is still in reach.
fn render_markdown_cell(cell: &MarkdownCell) -> RenderedFragment {
  let mut images = Vec::new();
  let mut seen: HashSet<String> = HashSet::new();

  for (regex, syntax) in [
    (&*MD_IMAGE_RE, ImageSyntax::Markdown),
    (&*HTML_IMG_RE, ImageSyntax::HtmlTag),
  ] {
    for caps in regex.captures_iter(&cell.source) {
      let Some(path) = caps.get(1).map(|m| m.as_str()) else {
        continue;
      };
      if is_external_path(path) || !seen.insert(path.to_string()) {
        continue;
      }
      images.push(ImageReference {
        original: path.to_string(),
        syntax,
        source: classify_source(path, cell),
      });
    }
  }

  RenderedFragment {
    text: cell.source.clone(),
    images,
  }
}

/// Remote URLs and already-inlined data URIs are not relocatable
/// references.
fn is_external_path(path: &str) -> bool {
  path.starts_with("http://")
    || path.starts_with("https://")
    || path.starts_with("data:")
}

fn classify_source(path: &str, cell: &MarkdownCell) -> ImageSource {
  let Some(name) = path.strip_prefix("attachment:") else {
    return ImageSource::Local;
  };

  cell
    .attachments
    .iter()
    .find(|a| a.name == name)
    .and_then(|a| a.entries.first())
    .map_or(ImageSource::Unresolved, |(mime, payload)| {
      ImageSource::Attachment {
        mime:    mime.clone(),
        payload: payload.clone(),
      }
    })
}

/// Render a code cell: fenced source first, then each output in encounter
/// order. An empty source emits no fence, but outputs still render.
fn render_code_cell(
  cell: &CodeCell,
  options: &RenderOptions,
) -> RenderedFragment {
  let mut blocks = Vec::new();

  if !cell.source.trim().is_empty() {
    blocks.push(format!(
      "```{}\n{}\n```\n",
      options.language, cell.source
    ));
  }

  if options.show_output {
    for output in &cell.outputs {
      if let Some(block) = render_output(output) {
        blocks.push(block);
      }
    }
  }

  RenderedFragment {
    text:   blocks.join("\n"),
    images: Vec::new(),
  }
}

fn render_output(output: &Output) -> Option<String> {
  match output {
    Output::Stream { text } => {
      if text.trim().is_empty() {
        return None;
      }
      Some(expandable("Output", text.trim_end()))
    },
    Output::Data { entries } => render_data_output(entries),
    Output::Error { name, traceback, .. } => {
      let joined = traceback.join("\n");
      let clean = ANSI_ESCAPE_RE.replace_all(&joined, "");
      Some(expandable(&format!("Error: {name}"), clean.trim_end()))
    },
  }
}

/// Select exactly one representation per the fixed preference order.
fn render_data_output(entries: &[(String, String)]) -> Option<String> {
  let Some((mime, payload)) = MIME_PREFERENCE.iter().find_map(|preferred| {
    entries
      .iter()
      .find(|(mime, _)| mime == preferred)
      .map(|(mime, payload)| (mime.as_str(), payload.as_str()))
  }) else {
    debug!("output payload has no renderable representation, omitting");
    return None;
  };

  match mime {
    "image/png" | "image/jpeg" => {
      // Embedded base64 must stay on one line inside the src attribute
      let data: String = payload.split_whitespace().collect();
      Some(format!(
        "\n<Frame>\n  <img src=\"data:{mime};base64,{data}\" alt=\"Output\" />\n</Frame>\n"
      ))
    },
    "image/svg+xml" => {
      Some(format!("\n<Frame>\n{}\n</Frame>\n", payload.trim_end()))
    },
    "text/html" => {
      let title = if payload.to_lowercase().contains("<table") {
        "Table Output"
      } else {
        "HTML Output"
      };
      Some(format!(
        "\n<Expandable title=\"{title}\">\n```html\n{}\n```\n</Expandable>\n",
        payload.trim_end()
      ))
    },
    "text/plain" => {
      if payload.trim().is_empty() {
        return None;
      }
      Some(expandable("Output", payload.trim_end()))
    },
    _ => None,
  }
}

fn expandable(title: &str, body: &str) -> String {
  format!("\n<Expandable title=\"{title}\">\n```\n{body}\n```\n</Expandable>\n")
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, clippy::panic, reason = "Fine in tests")]

  use super::*;
  use crate::notebook::Attachment;

  fn md_cell(source: &str) -> MarkdownCell {
    MarkdownCell {
      source:      source.to_string(),
      attachments: Vec::new(),
    }
  }

  #[test]
  fn test_code_cell_source_is_fenced_verbatim() {
    let cell = CodeCell {
      source:  "df = spark.read.parquet(\"x\")\ndf.show()".to_string(),
      outputs: Vec::new(),
    };
    let fragment =
      render_cell(&Cell::Code(cell), &RenderOptions::default());

    assert!(fragment.text.contains(
      "```python\ndf = spark.read.parquet(\"x\")\ndf.show()\n```"
    ));
  }

  #[test]
  fn test_empty_code_cell_renders_outputs_only() {
    let cell = CodeCell {
      source:  "   \n".to_string(),
      outputs: vec![Output::Stream {
        text: "hello\n".to_string(),
      }],
    };
    let fragment =
      render_cell(&Cell::Code(cell), &RenderOptions::default());

    assert!(!fragment.text.contains("```python"));
    assert!(fragment.text.contains("<Expandable title=\"Output\">"));
    assert!(fragment.text.contains("hello"));
  }

  #[test]
  fn test_show_output_false_drops_outputs() {
    let cell = CodeCell {
      source:  "print(1)".to_string(),
      outputs: vec![Output::Stream {
        text: "1\n".to_string(),
      }],
    };
    let options = RenderOptions {
      show_output: false,
      ..RenderOptions::default()
    };
    let fragment = render_cell(&Cell::Code(cell), &options);

    assert!(fragment.text.contains("```python"));
    assert!(!fragment.text.contains("Expandable"));
  }

  #[test]
  fn test_mime_preference_selects_png_over_text() {
    let output = Output::Data {
      entries: vec![
        ("text/plain".to_string(), "<Figure>".to_string()),
        ("image/png".to_string(), "aGVsbG8=".to_string()),
      ],
    };
    let block = render_output(&output).expect("should render");
    assert!(block.contains("data:image/png;base64,aGVsbG8="));
    assert!(!block.contains("<Figure>"));
  }

  #[test]
  fn test_html_output_with_table_gets_table_label() {
    let output = Output::Data {
      entries: vec![(
        "text/html".to_string(),
        "<div><TABLE><tr><td>1</td></tr></TABLE></div>".to_string(),
      )],
    };
    let block = render_output(&output).expect("should render");
    assert!(block.contains("title=\"Table Output\""));
  }

  #[test]
  fn test_unknown_mime_types_omitted() {
    let output = Output::Data {
      entries: vec![(
        "application/vnd.jupyter.widget-view+json".to_string(),
        "{}".to_string(),
      )],
    };
    assert!(render_output(&output).is_none());
  }

  #[test]
  fn test_error_output_strips_ansi_codes() {
    let output = Output::Error {
      name:      "ValueError".to_string(),
      message:   "bad value".to_string(),
      traceback: vec![
        "\u{1b}[0;31mValueError\u{1b}[0m: bad value".to_string(),
        "  at line 3".to_string(),
      ],
    };
    let block = render_output(&output).expect("should render");

    assert!(block.contains("title=\"Error: ValueError\""));
    assert!(!block.contains('\u{1b}'));
    assert!(block.contains("ValueError: bad value"));
  }

  #[test]
  fn test_markdown_cell_records_image_references() {
    let cell = md_cell(
      "![chart](figures/chart.png)\n\
       <img src=\"./other.jpg\">\n\
       ![remote](https://example.com/x.png)",
    );
    let fragment =
      render_cell(&Cell::Markdown(cell), &RenderOptions::default());

    let originals: Vec<&str> =
      fragment.images.iter().map(|i| i.original.as_str()).collect();
    assert_eq!(originals, vec!["figures/chart.png", "./other.jpg"]);
    assert_eq!(fragment.images[0].syntax, ImageSyntax::Markdown);
    assert_eq!(fragment.images[1].syntax, ImageSyntax::HtmlTag);
  }

  #[test]
  fn test_attachment_reference_captures_payload() {
    let cell = MarkdownCell {
      source:      "![c](attachment:chart.png)".to_string(),
      attachments: vec![Attachment {
        name:    "chart.png".to_string(),
        entries: vec![("image/png".to_string(), "aGVsbG8=".to_string())],
      }],
    };
    let fragment =
      render_cell(&Cell::Markdown(cell), &RenderOptions::default());

    assert_eq!(fragment.images.len(), 1);
    match &fragment.images[0].source {
      ImageSource::Attachment { mime, payload } => {
        assert_eq!(mime, "image/png");
        assert_eq!(payload, "aGVsbG8=");
      },
      other => panic!("expected attachment source, got {other:?}"),
    }
  }

  #[test]
  fn test_missing_attachment_is_unresolved() {
    let cell = md_cell("![c](attachment:gone.png)");
    let fragment =
      render_cell(&Cell::Markdown(cell), &RenderOptions::default());

    assert!(matches!(
      fragment.images[0].source,
      ImageSource::Unresolved
    ));
  }
}
