use serde::Serialize;

use super::text;
use crate::config::ExtractionConfig;
use crate::metadata::MetadataMap;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunks that never carry human-readable metadata. Their payload is not read.
const SKIPPED_CHUNKS: [&[u8; 4]; 3] = [b"IHDR", b"IDAT", b"IEND"];

/// Outcome of scanning a buffer.
///
/// `valid` is `false` when the buffer does not start with the PNG signature;
/// `metadata` is then always empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    pub valid: bool,
    pub metadata: MetadataMap,
}

/// Scan a buffer for text metadata using the default options.
///
/// # Example
///
/// ```rust
/// let result = png_prompt::png::parse(b"\xff\xd8\xff\xe0 not a png");
/// assert!(!result.valid);
/// assert!(result.metadata.is_empty());
/// ```
pub fn parse(data: &[u8]) -> ParseResult {
    parse_with(data, &ExtractionConfig::default())
}

/// Scan a buffer for text metadata.
///
/// Walks the chunk stream after the signature: 4-byte big-endian length,
/// 4-byte type, payload, 4-byte CRC (not validated). The scan ends when
/// fewer than 8 bytes remain or a payload runs past the end of the buffer;
/// whatever was decoded up to that point is returned. A chunk that fails to
/// decode is logged and skipped.
pub fn parse_with(data: &[u8], options: &ExtractionConfig) -> ParseResult {
    if data.len() < PNG_SIGNATURE.len() || data[..PNG_SIGNATURE.len()] != PNG_SIGNATURE {
        return ParseResult::default();
    }

    let mut metadata = MetadataMap::new();
    let mut pos = PNG_SIGNATURE.len();

    while data.len().saturating_sub(pos) >= 8 {
        let length =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let chunk_type: [u8; 4] = [data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]];
        let chunk_start = pos;
        pos += 8;

        // Offset of the next chunk header: payload plus CRC.
        let next = pos.saturating_add(length).saturating_add(4);

        if length == 0 || SKIPPED_CHUNKS.contains(&&chunk_type) {
            pos = next;
            continue;
        }

        let type_str: String = chunk_type.iter().map(|&b| b as char).collect();

        if length >= options.max_text_chunk_len {
            log::debug!("Skipping {type_str} chunk at offset {chunk_start}: {length} bytes is too large for text");
            pos = next;
            continue;
        }

        let Some(payload) = data.get(pos..pos.saturating_add(length)) else {
            log::debug!(
                "{type_str} chunk at offset {chunk_start} runs past end of buffer, stopping"
            );
            break;
        };

        let decoded = match &chunk_type {
            b"tEXt" => text::decode_text(payload).map(Some),
            b"zTXt" => text::decode_ztxt(payload, options.inflate_compressed).map(Some),
            b"iTXt" => text::decode_itxt(payload, options.inflate_compressed).map(Some),
            _ => Ok(text::decode_custom(payload).map(|text| (type_str.clone(), text))),
        };

        match decoded {
            Ok(Some((keyword, value))) => {
                log::debug!("{type_str} '{keyword}': {} chars", value.chars().count());
                metadata.insert(keyword, value);
            }
            Ok(None) => {}
            Err(e) => log::warn!("Skipping {type_str} chunk at offset {chunk_start}: {e:#}"),
        }

        pos = next;
    }

    ParseResult {
        valid: true,
        metadata,
    }
}
