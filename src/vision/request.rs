use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use crate::config::VisionConfig;

/// Guess an image MIME type from its leading bytes.
///
/// Falls back to `image/png`, which is what the prompt extractor deals with.
pub fn sniff_mime(data: &[u8]) -> &'static str {
    match data {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/png",
    }
}

/// Build a `generateContent` request body carrying the image and the instruction.
///
/// The image goes in as base64 `inline_data`; its MIME type is sniffed from
/// the bytes rather than trusted from a file name.
///
/// # Example
///
/// ```rust
/// use png_prompt::config::VisionConfig;
/// use png_prompt::vision::{PromptLength, build_prompt, build_request_body};
///
/// let body = build_request_body(b"\x89PNG\r\n\x1a\n", &build_prompt(PromptLength::Short), &VisionConfig::default());
/// assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
/// ```
pub fn build_request_body(image: &[u8], prompt: &str, config: &VisionConfig) -> Value {
    json!({
        "contents": [
            {
                "parts": [
                    { "text": prompt },
                    {
                        "inline_data": {
                            "mime_type": sniff_mime(image),
                            "data": BASE64.encode(image)
                        }
                    }
                ]
            }
        ],
        "generationConfig": {
            "maxOutputTokens": config.max_output_tokens
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_known_formats() {
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\n"), "image/png");
        assert_eq!(sniff_mime(b"\xff\xd8\xff\xe0\x00\x10JFIF"), "image/jpeg");
        assert_eq!(sniff_mime(b"GIF89a"), "image/gif");
        assert_eq!(sniff_mime(b"RIFF\x24\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn sniff_unknown_defaults_to_png() {
        assert_eq!(sniff_mime(b""), "image/png");
        assert_eq!(sniff_mime(b"RIFF\x24\x00\x00\x00WAVE"), "image/png");
    }

    #[test]
    fn body_layout() {
        let config = VisionConfig {
            max_output_tokens: 256,
            ..VisionConfig::default()
        };
        let body = build_request_body(b"\xff\xd8\xff", "describe", &config);

        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "describe");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], "/9j/");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
    }
}
