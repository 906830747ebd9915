//! PNG text-chunk reading.
//!
//! This module provides two entry points:
//!
//! - [`parse`] — Scan a buffer with the default options
//! - [`parse_with`] — Scan a buffer with explicit [`ExtractionConfig`](crate::config::ExtractionConfig) options
//!
//! The reader walks the chunk stream of a PNG file and decodes `tEXt`,
//! `zTXt`, `iTXt` and text-like custom chunks into a
//! [`MetadataMap`](crate::metadata::MetadataMap). Image data chunks are never
//! inspected, and a buffer that is not a PNG is reported as such rather than
//! treated as an error.

mod reader;
mod text;

pub use reader::{PNG_SIGNATURE, ParseResult, parse, parse_with};
pub(crate) use text::is_compressed_placeholder;
