//! AI-generation metadata normalization.
//!
//! - [`MetadataMap`] — Ordered keyword → text map produced by the PNG reader
//! - [`normalize`] — Recover the generation prompt, negative prompt and a
//!   human-readable summary from a [`MetadataMap`]
//!
//! Generators disagree on where they put things: NovelAI writes a JSON
//! `Comment`, AUTOMATIC1111 a flat `parameters` string, ComfyUI its node
//! graph under `prompt` / `workflow`. The normalizer tries each layout in
//! turn and degrades to keyword matching, so it never rejects a file.

pub mod keywords;
mod map;
mod normalizer;

pub use map::MetadataMap;
pub use normalizer::{NormalizedResult, RAW_COMMENT_KEY, normalize};
