//! # png-prompt
//!
//! Recover the prompts and generation settings that AI image generators
//! (Stable Diffusion front-ends, NovelAI, ComfyUI, InvokeAI, ...) embed in
//! PNG text chunks.
//!
//! ## Quick Start
//!
//! The simplest way to use the library is through the pipeline module, which
//! handles the full read → parse → normalize flow:
//!
//! ```rust,no_run
//! use png_prompt::config::Config;
//! use png_prompt::pipeline::{collect_images, extract_file};
//! use std::path::PathBuf;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!
//!     // Collect supported image files from paths (files or directories)
//!     let images = collect_images(&[PathBuf::from("./outputs")]);
//!
//!     for path in &images {
//!         let result = extract_file(path, &config)?;
//!         match &result.extraction.normalized.primary_prompt {
//!             Some(prompt) => println!("{}: {prompt}", path.display()),
//!             None => println!("{}: no prompt found", path.display()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! The chunk reader and the normalizer can also be called separately:
//!
//! ```rust
//! use png_prompt::metadata::normalize;
//! use png_prompt::png;
//!
//! // A bare signature followed by a single tEXt chunk (CRC not checked)
//! let mut data = png::PNG_SIGNATURE.to_vec();
//! let payload = b"parameters\0a cat on a sofa\nSteps: 20";
//! data.extend_from_slice(&(payload.len() as u32).to_be_bytes());
//! data.extend_from_slice(b"tEXt");
//! data.extend_from_slice(payload);
//! data.extend_from_slice(&[0; 4]);
//!
//! let parsed = png::parse(&data);
//! assert!(parsed.valid);
//! assert_eq!(parsed.metadata.get("parameters"), Some("a cat on a sofa\nSteps: 20"));
//!
//! let result = normalize(&parsed.metadata);
//! assert_eq!(result.primary_prompt.as_deref(), Some("a cat on a sofa\nSteps: 20"));
//! ```
//!
//! ## Supported Chunks
//!
//! | Chunk | Decoding |
//! |-------|----------|
//! | `tEXt` | Latin-1 keyword and text |
//! | `iTXt` | UTF-8 text; compressed text as a placeholder unless inflating |
//! | `zTXt` | Placeholder unless inflating |
//! | Other | Kept when the payload is UTF-8 and looks like JSON or `key: value` text |
//!
//! ## Modules
//!
//! - [`config`] — Configuration types and loading/saving
//! - [`metadata`] — Ordered chunk map and prompt normalization
//! - [`pipeline`] — Image collection and per-file extraction
//! - [`png`] — PNG chunk walking and text-chunk decoding
//! - [`vision`] — Request body and reply parsing for a vision model that writes prompts

pub mod config;
pub mod metadata;
pub mod pipeline;
pub mod png;
pub mod vision;
