//! Image relocation: rewrite image references in rendered fragments to a
//! flat, per-document-namespaced output directory, materializing bytes
//! from attachments or copying local files as needed.
//!
//! Missing assets are non-fatal: the reference is left unmodified and a
//! warning is surfaced, so one broken link never aborts a batch.

use std::{
  fs,
  path::{Path, PathBuf},
};

use base64::Engine;
use log::warn;
use regex::Regex;

use crate::{
  error::Result,
  render::{ImageReference, ImageSource, ImageSyntax},
  utils::{never_matching_regex, sanitize_filename},
};

/// Options controlling image relocation.
#[derive(Debug, Clone)]
pub struct ImageOptions {
  /// Flat directory all relocated images are written into.
  pub images_dir:       PathBuf,
  /// Path prefix under which the documentation site serves that
  /// directory; rewritten references point here.
  pub public_prefix:    String,
  /// Substring markers identifying branding assets, whose references are
  /// dropped entirely.
  pub branding_markers: Vec<String>,
  /// Whether `<img src=...>` tags are rewritten in addition to
  /// markdown-syntax images.
  pub rewrite_html_img: bool,
}

impl Default for ImageOptions {
  fn default() -> Self {
    Self {
      images_dir:       PathBuf::from("images"),
      public_prefix:    "/images".to_string(),
      branding_markers: vec!["branding/".to_string()],
      rewrite_html_img: true,
    }
  }
}

/// Result of relocating one fragment's images.
#[derive(Debug, Default)]
pub struct RelocationOutcome {
  /// Fragment text with references rewritten to published paths.
  pub text:    String,
  /// Image files written to the output directory.
  pub written: Vec<PathBuf>,
}

/// Relocate every pending image reference of a fragment.
///
/// The `{slug}-` filename prefix keeps images from different notebooks
/// collision-free in the shared flat directory.
///
/// # Errors
///
/// Returns an I/O error if the images directory cannot be created or an
/// image file cannot be written. Unresolvable references are not errors.
pub fn relocate_images(
  text: &str,
  images: &[ImageReference],
  slug: &str,
  notebook_dir: &Path,
  options: &ImageOptions,
) -> Result<RelocationOutcome> {
  let mut outcome = RelocationOutcome {
    text: text.to_string(),
    ..RelocationOutcome::default()
  };

  for image in images {
    if image.syntax == ImageSyntax::HtmlTag && !options.rewrite_html_img {
      continue;
    }

    if options
      .branding_markers
      .iter()
      .any(|marker| image.original.contains(marker))
    {
      outcome.text = drop_image_markup(&outcome.text, image);
      continue;
    }

    match &image.source {
      ImageSource::Attachment { mime, payload } => {
        relocate_attachment(&mut outcome, image, mime, payload, slug, options)?;
      },
      ImageSource::Unresolved => {
        warn!(
          "attachment reference {} not found in cell attachments, leaving unmodified",
          image.original
        );
      },
      ImageSource::Local => {
        relocate_local(&mut outcome, image, slug, notebook_dir, options)?;
      },
    }
  }

  Ok(outcome)
}

fn relocate_attachment(
  outcome: &mut RelocationOutcome,
  image: &ImageReference,
  mime: &str,
  payload: &str,
  slug: &str,
  options: &ImageOptions,
) -> Result<()> {
  let name = image
    .original
    .strip_prefix("attachment:")
    .unwrap_or(&image.original);
  let stem = Path::new(name)
    .file_stem()
    .map_or_else(|| name.to_string(), |s| s.to_string_lossy().to_string());
  let filename =
    format!("{slug}-{}.{}", sanitize_filename(&stem), mime_extension(mime));

  // Notebook JSON wraps base64 payloads across lines
  let packed: String = payload.split_whitespace().collect();
  let Ok(bytes) =
    base64::engine::general_purpose::STANDARD.decode(packed.as_bytes())
  else {
    warn!(
      "attachment {} has an undecodable base64 payload, leaving unmodified",
      image.original
    );
    return Ok(());
  };

  let target = options.images_dir.join(&filename);
  fs::create_dir_all(&options.images_dir)?;
  fs::write(&target, bytes)?;

  rewrite_reference(outcome, image, &filename, options);
  outcome.written.push(target);
  Ok(())
}

fn relocate_local(
  outcome: &mut RelocationOutcome,
  image: &ImageReference,
  slug: &str,
  notebook_dir: &Path,
  options: &ImageOptions,
) -> Result<()> {
  let resolved = resolve_relative(&image.original, notebook_dir);

  if !resolved.is_file() {
    warn!(
      "image {} not found at {}, leaving reference unmodified",
      image.original,
      resolved.display()
    );
    return Ok(());
  }

  let original_name = resolved
    .file_name()
    .map_or_else(|| image.original.clone(), |n| n.to_string_lossy().to_string());
  let filename = format!("{slug}-{}", sanitize_filename(&original_name));
  let target = options.images_dir.join(&filename);

  fs::create_dir_all(&options.images_dir)?;
  fs::copy(&resolved, &target)?;

  rewrite_reference(outcome, image, &filename, options);
  outcome.written.push(target);
  Ok(())
}

/// Normalize a leading `./`, resolve a leading `../` one level up, and
/// resolve everything else against the notebook's own directory.
fn resolve_relative(path: &str, notebook_dir: &Path) -> PathBuf {
  if let Some(rest) = path.strip_prefix("./") {
    notebook_dir.join(rest)
  } else if let Some(rest) = path.strip_prefix("../") {
    notebook_dir
      .parent()
      .unwrap_or(notebook_dir)
      .join(rest)
  } else {
    notebook_dir.join(path)
  }
}

fn rewrite_reference(
  outcome: &mut RelocationOutcome,
  image: &ImageReference,
  filename: &str,
  options: &ImageOptions,
) {
  let published = format!("{}/{filename}", options.public_prefix);
  outcome.text = outcome.text.replace(&image.original, &published);
}

/// Remove the whole image markup for a dropped (branding) reference.
fn drop_image_markup(text: &str, image: &ImageReference) -> String {
  let escaped = regex::escape(&image.original);
  let pattern = match image.syntax {
    ImageSyntax::Markdown => {
      format!(r#"!\[[^\]]*\]\(\s*{escaped}(?:\s+"[^"]*")?\s*\)"#)
    },
    ImageSyntax::HtmlTag => format!(r"(?is)<img\b[^>]*{escaped}[^>]*?>"),
  };

  Regex::new(&pattern)
    .unwrap_or_else(|_| never_matching_regex())
    .replace_all(text, "")
    .into_owned()
}

/// Map a mime type to a file extension, normalizing `jpeg` to `jpg`.
fn mime_extension(mime: &str) -> String {
  let subtype = mime.rsplit('/').next().unwrap_or(mime);
  match subtype {
    "jpeg" => "jpg".to_string(),
    "svg+xml" => "svg".to_string(),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  #![allow(clippy::expect_used, clippy::panic, reason = "Fine in tests")]

  use tempfile::tempdir;

  use super::*;

  fn reference(original: &str, syntax: ImageSyntax, source: ImageSource) -> ImageReference {
    ImageReference {
      original: original.to_string(),
      syntax,
      source,
    }
  }

  #[test]
  fn test_mime_extension_normalization() {
    assert_eq!(mime_extension("image/png"), "png");
    assert_eq!(mime_extension("image/jpeg"), "jpg");
    assert_eq!(mime_extension("image/svg+xml"), "svg");
  }

  #[test]
  fn test_attachment_written_and_reference_rewritten() {
    let tmp = tempdir().expect("tempdir");
    let options = ImageOptions {
      images_dir: tmp.path().join("images"),
      ..ImageOptions::default()
    };
    let image = reference(
      "attachment:chart.png",
      ImageSyntax::Markdown,
      ImageSource::Attachment {
        mime:    "image/png".to_string(),
        payload: "aGVsbG8=".to_string(),
      },
    );

    let outcome = relocate_images(
      "![c](attachment:chart.png)",
      &[image],
      "my-notebook",
      tmp.path(),
      &options,
    )
    .expect("relocation should succeed");

    assert_eq!(outcome.text, "![c](/images/my-notebook-chart.png)");
    let written = tmp.path().join("images/my-notebook-chart.png");
    assert_eq!(outcome.written, vec![written.clone()]);
    assert_eq!(fs::read(written).expect("file exists"), b"hello");
  }

  #[test]
  fn test_local_file_copied_with_slug_prefix() {
    let tmp = tempdir().expect("tempdir");
    let nb_dir = tmp.path().join("notebooks");
    fs::create_dir_all(nb_dir.join("figures")).expect("mkdir");
    fs::write(nb_dir.join("figures/map.png"), b"png bytes").expect("write");

    let options = ImageOptions {
      images_dir: tmp.path().join("out/images"),
      ..ImageOptions::default()
    };
    let image = reference(
      "figures/map.png",
      ImageSyntax::Markdown,
      ImageSource::Local,
    );

    let outcome = relocate_images(
      "![m](figures/map.png)",
      &[image],
      "intro",
      &nb_dir,
      &options,
    )
    .expect("relocation should succeed");

    assert_eq!(outcome.text, "![m](/images/intro-map.png)");
    assert!(tmp.path().join("out/images/intro-map.png").is_file());
  }

  #[test]
  fn test_slug_prefix_prevents_collisions_across_documents() {
    let tmp = tempdir().expect("tempdir");
    let nb_dir = tmp.path().to_path_buf();
    fs::write(nb_dir.join("chart.png"), b"one").expect("write");

    let options = ImageOptions {
      images_dir: tmp.path().join("images"),
      ..ImageOptions::default()
    };
    let image =
      reference("chart.png", ImageSyntax::Markdown, ImageSource::Local);

    for slug in ["first-doc", "second-doc"] {
      relocate_images("![](chart.png)", &[image.clone()], slug, &nb_dir, &options)
        .expect("relocation should succeed");
    }

    assert!(tmp.path().join("images/first-doc-chart.png").is_file());
    assert!(tmp.path().join("images/second-doc-chart.png").is_file());
  }

  #[test]
  fn test_missing_local_file_left_unmodified() {
    let tmp = tempdir().expect("tempdir");
    let options = ImageOptions {
      images_dir: tmp.path().join("images"),
      ..ImageOptions::default()
    };
    let image =
      reference("gone.png", ImageSyntax::Markdown, ImageSource::Local);

    let outcome = relocate_images(
      "![g](gone.png)",
      &[image],
      "doc",
      tmp.path(),
      &options,
    )
    .expect("missing asset is non-fatal");

    assert_eq!(outcome.text, "![g](gone.png)");
    assert!(outcome.written.is_empty());
  }

  #[test]
  fn test_branding_reference_dropped_without_write() {
    let tmp = tempdir().expect("tempdir");
    let options = ImageOptions {
      images_dir: tmp.path().join("images"),
      ..ImageOptions::default()
    };
    let image = reference(
      "../branding/logo.png",
      ImageSyntax::Markdown,
      ImageSource::Local,
    );

    let outcome = relocate_images(
      "intro\n![logo](../branding/logo.png)\ntext",
      &[image],
      "doc",
      tmp.path(),
      &options,
    )
    .expect("should succeed");

    assert_eq!(outcome.text, "intro\n\ntext");
    assert!(outcome.written.is_empty());
    assert!(!tmp.path().join("images").exists());
  }

  #[test]
  fn test_html_img_rewrite_is_optional() {
    let tmp = tempdir().expect("tempdir");
    fs::write(tmp.path().join("pic.png"), b"x").expect("write");
    let image =
      reference("pic.png", ImageSyntax::HtmlTag, ImageSource::Local);

    let baseline_only = ImageOptions {
      images_dir: tmp.path().join("images"),
      rewrite_html_img: false,
      ..ImageOptions::default()
    };
    let outcome = relocate_images(
      "<img src=\"pic.png\">",
      &[image.clone()],
      "doc",
      tmp.path(),
      &baseline_only,
    )
    .expect("should succeed");
    assert_eq!(outcome.text, "<img src=\"pic.png\">");

    let with_html = ImageOptions {
      images_dir: tmp.path().join("images"),
      ..ImageOptions::default()
    };
    let outcome = relocate_images(
      "<img src=\"pic.png\">",
      &[image],
      "doc",
      tmp.path(),
      &with_html,
    )
    .expect("should succeed");
    assert_eq!(outcome.text, "<img src=\"/images/doc-pic.png\">");
  }

  #[test]
  fn test_unresolved_attachment_left_unmodified() {
    let tmp = tempdir().expect("tempdir");
    let options = ImageOptions {
      images_dir: tmp.path().join("images"),
      ..ImageOptions::default()
    };
    let image = reference(
      "attachment:missing.png",
      ImageSyntax::Markdown,
      ImageSource::Unresolved,
    );

    let outcome = relocate_images(
      "![m](attachment:missing.png)",
      &[image],
      "doc",
      tmp.path(),
      &options,
    )
    .expect("should succeed");

    assert_eq!(outcome.text, "![m](attachment:missing.png)");
  }
}
