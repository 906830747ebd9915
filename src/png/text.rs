use anyhow::{Context, Result};
use flate2::read::ZlibDecoder;
use std::io::Read;

/// Upper bound on inflated text, so a tiny zTXt can't expand without limit.
const MAX_INFLATED_LEN: u64 = 4 * 1024 * 1024;

/// Prefix shared by every placeholder recorded for compressed text.
pub(crate) const COMPRESSED_PLACEHOLDER_PREFIX: &str = "[Compressed ";

/// A decoded `(keyword, text)` pair.
pub(crate) type TextEntry = (String, String);

/// Decode bytes as ISO-8859-1. Every byte maps to the code point of the same value.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Split off a null-terminated field, returning it and the bytes after the terminator.
fn split_null(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let null_pos = data.iter().position(|&b| b == 0)?;
    Some((&data[..null_pos], &data[null_pos + 1..]))
}

fn placeholder(chunk_type: &str, keyword: &str) -> String {
    format!("{COMPRESSED_PLACEHOLDER_PREFIX}{chunk_type} data for {keyword}]")
}

/// Inflate a zlib stream (PNG compression method 0).
///
/// Output beyond [`MAX_INFLATED_LEN`] is an error rather than a silent cut,
/// so the caller records the placeholder instead of a truncated text.
fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data).take(MAX_INFLATED_LEN + 1);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .context("zlib stream is corrupt")?;
    if out.len() as u64 > MAX_INFLATED_LEN {
        anyhow::bail!("inflated text exceeds {MAX_INFLATED_LEN} bytes");
    }
    Ok(out)
}

/// Decode a tEXt chunk.
///
/// Format: keyword\0text, both latin1.
pub(crate) fn decode_text(data: &[u8]) -> Result<TextEntry> {
    let (keyword, text) = split_null(data).context("tEXt chunk has no keyword terminator")?;
    Ok((latin1(keyword), latin1(text)))
}

/// Decode a zTXt chunk.
///
/// Format: keyword\0compression_method compressed_text
///
/// Only the keyword is recovered unless `inflate_compressed` is set; the
/// value is then a placeholder naming the keyword.
pub(crate) fn decode_ztxt(data: &[u8], inflate_compressed: bool) -> Result<TextEntry> {
    let (keyword, rest) = split_null(data).context("zTXt chunk has no keyword terminator")?;
    let keyword = latin1(keyword);

    if inflate_compressed {
        match rest.split_first() {
            Some((0, compressed)) => match inflate(compressed) {
                Ok(text) => return Ok((keyword, latin1(&text))),
                Err(e) => log::warn!("Could not inflate zTXt '{keyword}': {e:#}"),
            },
            Some((method, _)) => {
                log::warn!("zTXt '{keyword}' uses unknown compression method {method}")
            }
            None => log::warn!("zTXt '{keyword}' has no compression method byte"),
        }
    }

    let text = placeholder("zTXt", &keyword);
    Ok((keyword, text))
}

/// Decode an iTXt (international text) chunk.
///
/// Format: keyword\0 compression_flag compression_method language_tag\0 translated_keyword\0 text
///
/// The keyword and text are utf-8. The language tag and translated keyword
/// are skipped.
pub(crate) fn decode_itxt(data: &[u8], inflate_compressed: bool) -> Result<TextEntry> {
    let (keyword, rest) = split_null(data).context("iTXt chunk has no keyword terminator")?;
    let keyword = String::from_utf8_lossy(keyword).into_owned();

    let [compression_flag, compression_method, rest @ ..] = rest else {
        anyhow::bail!("iTXt chunk '{keyword}' is missing its compression fields");
    };

    let (_language, rest) =
        split_null(rest).context("iTXt chunk has no language tag terminator")?;
    let (_translated, text) =
        split_null(rest).context("iTXt chunk has no translated keyword terminator")?;

    if *compression_flag == 0 {
        return Ok((keyword, String::from_utf8_lossy(text).into_owned()));
    }

    if inflate_compressed {
        if *compression_method == 0 {
            match inflate(text) {
                Ok(inflated) => {
                    return Ok((keyword, String::from_utf8_lossy(&inflated).into_owned()));
                }
                Err(e) => log::warn!("Could not inflate iTXt '{keyword}': {e:#}"),
            }
        } else {
            log::warn!("iTXt '{keyword}' uses unknown compression method {compression_method}");
        }
    }

    let text = placeholder("iTXt", &keyword);
    Ok((keyword, text))
}

/// Decode an unrecognized chunk that might hold text.
///
/// The payload must be valid utf-8, longer than 10 characters, and contain
/// one of `:`, `{` or `}`. Anything else is noise and yields `None`.
pub(crate) fn decode_custom(data: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(data).ok()?;
    if text.chars().count() > 10 && text.contains([':', '{', '}']) {
        Some(text.to_string())
    } else {
        None
    }
}

/// Whether `value` is a placeholder recorded for compressed text.
pub(crate) fn is_compressed_placeholder(value: &str) -> bool {
    value.starts_with(COMPRESSED_PLACEHOLDER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn zlib(text: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text).unwrap();
        encoder.finish().unwrap()
    }

    fn itxt(keyword: &str, flag: u8, lang: &str, translated: &str, text: &[u8]) -> Vec<u8> {
        let mut data = keyword.as_bytes().to_vec();
        data.push(0);
        data.push(flag);
        data.push(0);
        data.extend_from_slice(lang.as_bytes());
        data.push(0);
        data.extend_from_slice(translated.as_bytes());
        data.push(0);
        data.extend_from_slice(text);
        data
    }

    // ── tEXt ─────────────────────────────────────────────────────────

    #[test]
    fn text_splits_at_first_null() {
        let (k, v) = decode_text(b"Title\0AI Generated\0Test").unwrap();
        assert_eq!(k, "Title");
        assert_eq!(v, "AI Generated\0Test");
    }

    #[test]
    fn text_is_latin1() {
        let (k, v) = decode_text(b"Author\0Jos\xe9").unwrap();
        assert_eq!(k, "Author");
        assert_eq!(v, "José");
    }

    #[test]
    fn text_without_null_fails() {
        assert!(decode_text(b"no terminator here").is_err());
    }

    #[test]
    fn text_empty_value() {
        let (k, v) = decode_text(b"Software\0").unwrap();
        assert_eq!(k, "Software");
        assert_eq!(v, "");
    }

    // ── zTXt ─────────────────────────────────────────────────────────

    #[test]
    fn ztxt_placeholder() {
        let mut data = b"parameters\0\0".to_vec();
        data.extend(zlib(b"a cat"));
        let (k, v) = decode_ztxt(&data, false).unwrap();
        assert_eq!(k, "parameters");
        assert_eq!(v, "[Compressed zTXt data for parameters]");
        assert!(is_compressed_placeholder(&v));
    }

    #[test]
    fn ztxt_inflated() {
        let mut data = b"parameters\0\0".to_vec();
        data.extend(zlib(b"a cat, Steps: 20"));
        let (_, v) = decode_ztxt(&data, true).unwrap();
        assert_eq!(v, "a cat, Steps: 20");
    }

    #[test]
    fn ztxt_corrupt_stream_falls_back_to_placeholder() {
        let data = b"parameters\0\0garbage".to_vec();
        let (_, v) = decode_ztxt(&data, true).unwrap();
        assert_eq!(v, "[Compressed zTXt data for parameters]");
    }

    #[test]
    fn ztxt_over_inflate_limit_falls_back_to_placeholder() {
        let mut data = b"parameters\0\0".to_vec();
        data.extend(zlib(&vec![b'a'; MAX_INFLATED_LEN as usize + 1]));
        let (_, v) = decode_ztxt(&data, true).unwrap();
        assert_eq!(v, "[Compressed zTXt data for parameters]");
    }

    #[test]
    fn ztxt_at_inflate_limit_kept() {
        let mut data = b"parameters\0\0".to_vec();
        data.extend(zlib(&vec![b'a'; MAX_INFLATED_LEN as usize]));
        let (_, v) = decode_ztxt(&data, true).unwrap();
        assert_eq!(v.len(), MAX_INFLATED_LEN as usize);
    }

    #[test]
    fn ztxt_unknown_method_falls_back_to_placeholder() {
        let mut data = b"parameters\0\x07".to_vec();
        data.extend(zlib(b"a cat"));
        let (_, v) = decode_ztxt(&data, true).unwrap();
        assert!(is_compressed_placeholder(&v));
    }

    // ── iTXt ─────────────────────────────────────────────────────────

    #[test]
    fn itxt_uncompressed_unicode() {
        let data = itxt("Description", 0, "", "", "a prompt with unicode: 日本語".as_bytes());
        let (k, v) = decode_itxt(&data, false).unwrap();
        assert_eq!(k, "Description");
        assert_eq!(v, "a prompt with unicode: 日本語");
    }

    #[test]
    fn itxt_skips_language_and_translation() {
        let data = itxt("Title", 0, "ja", "タイトル", "猫".as_bytes());
        let (k, v) = decode_itxt(&data, false).unwrap();
        assert_eq!(k, "Title");
        assert_eq!(v, "猫");
    }

    #[test]
    fn itxt_compressed_placeholder() {
        let data = itxt("prompt", 1, "", "", &zlib(b"{\"a\":1}"));
        let (_, v) = decode_itxt(&data, false).unwrap();
        assert_eq!(v, "[Compressed iTXt data for prompt]");
    }

    #[test]
    fn itxt_compressed_inflated() {
        let data = itxt("prompt", 1, "", "", &zlib("{\"a\":\"日本\"}".as_bytes()));
        let (_, v) = decode_itxt(&data, true).unwrap();
        assert_eq!(v, "{\"a\":\"日本\"}");
    }

    #[test]
    fn itxt_missing_terminators_fails() {
        assert!(decode_itxt(b"Description\0\0\0en", false).is_err());
        assert!(decode_itxt(b"Description\0\0", false).is_err());
        assert!(decode_itxt(b"Description\0", false).is_err());
        assert!(decode_itxt(b"Description", false).is_err());
    }

    // ── custom chunks ────────────────────────────────────────────────

    #[test]
    fn custom_text_with_json_kept() {
        assert_eq!(
            decode_custom(br#"{"seed": 42}"#).as_deref(),
            Some(r#"{"seed": 42}"#)
        );
    }

    #[test]
    fn custom_short_or_plain_dropped() {
        assert!(decode_custom(b"a:b").is_none());
        assert!(decode_custom(b"just some plain words").is_none());
    }

    #[test]
    fn custom_invalid_utf8_dropped() {
        assert!(decode_custom(b"\xff\xfe{broken: utf8}").is_none());
    }
}
