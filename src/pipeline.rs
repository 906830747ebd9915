use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{Config, ExtractionConfig};
use crate::metadata::{self, MetadataMap, NormalizedResult};
use crate::png;

/// Extensions picked up when collecting images.
///
/// Only PNG carries text chunks, but JPEG and WebP files are routinely mixed
/// in; they are read and reported as "not a PNG" instead of being skipped.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Reader and normalizer output for one in-memory image.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    /// `false` if the buffer did not start with the PNG signature.
    pub valid: bool,
    /// Every decoded text chunk, in file order.
    pub metadata: MetadataMap,
    /// Prompts recovered from `metadata`.
    pub normalized: NormalizedResult,
}

/// The result of extracting prompts from a single file.
///
/// # Example
///
/// ```rust,no_run
/// use png_prompt::config::Config;
/// use png_prompt::pipeline::extract_file;
///
/// let result = extract_file("image.png".as_ref(), &Config::default()).unwrap();
/// if let Some(prompt) = &result.extraction.normalized.primary_prompt {
///     println!("Prompt: {prompt}");
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub extraction: Extraction,
}

/// Collect supported image files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). Only files with a supported image
/// extension are included.
///
/// # Example
///
/// ```rust,no_run
/// use png_prompt::pipeline::collect_images;
/// use std::path::PathBuf;
///
/// let images = collect_images(&[
///     PathBuf::from("render.png"),   // single file
///     PathBuf::from("./outputs/"),   // entire directory
/// ]);
/// println!("Found {} images", images.len());
/// ```
pub fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut images = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                images.push(path.clone());
            } else {
                log::warn!("Skipping unsupported file: {}", path.display());
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let p = entry.path();
                if p.is_file() && is_supported_image(p) {
                    images.push(p.to_path_buf());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    images
}

/// Check if a file has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Run the chunk reader and the normalizer over an in-memory image.
///
/// Never fails: a buffer that isn't a PNG gives `valid: false` and an
/// all-`None` result, indistinguishable from a PNG without metadata.
pub fn extract_bytes(data: &[u8], options: &ExtractionConfig) -> Extraction {
    let parsed = png::parse_with(data, options);
    if !parsed.valid {
        log::debug!("Not a PNG ({} bytes), no text chunks to read", data.len());
        return Extraction::default();
    }

    let normalized = metadata::normalize(&parsed.metadata);
    Extraction {
        valid: true,
        metadata: parsed.metadata,
        normalized,
    }
}

/// Read a file and extract its prompts.
///
/// Reading the file is the only step that can fail; everything after it
/// degrades to an empty result instead.
pub fn extract_file(path: &Path, config: &Config) -> Result<ExtractionResult> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let extraction = extract_bytes(&data, &config.extraction);
    log::debug!(
        "{}: {} text chunk(s), prompt {}",
        path.display(),
        extraction.metadata.len(),
        if extraction.normalized.primary_prompt.is_some() { "found" } else { "not found" }
    );

    Ok(ExtractionResult {
        path: path.to_path_buf(),
        extraction,
    })
}
