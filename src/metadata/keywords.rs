//! Static lookup tables for spotting AI-generation metadata.
//!
//! Both tables are compared case-insensitively: field names against chunk
//! keywords (substring match), tool keywords against chunk values.

/// Keywords used by generators and EXIF writers for prompt and settings fields.
pub const AI_FIELD_NAMES: &[&str] = &[
    "Software",
    "UserComment",
    "ImageDescription",
    "Description",
    "Comment",
    "Title",
    "Author",
    "Source",
    "Generation time",
    "parameters",
    "prompt",
    "negative_prompt",
    "uc",
    "seed",
    "steps",
    "sampler",
    "scale",
    "cfg_scale",
    "model",
    "model_hash",
    "workflow",
    "sd-metadata",
    "dream",
    "invokeai_metadata",
    "generation_data",
];

/// Tool and technique names that mark a value as AI-generation metadata.
pub const AI_TOOL_KEYWORDS: &[&str] = &[
    "stable diffusion",
    "midjourney",
    "dall-e",
    "novelai",
    "automatic1111",
    "comfyui",
    "invokeai",
    "fooocus",
    "diffusion",
    "sdxl",
    "lora",
    "checkpoint",
    "negative prompt",
    "cfg scale",
    "sampler",
    "txt2img",
    "img2img",
];

/// Whether a chunk keyword names a known AI or EXIF metadata field.
pub fn is_ai_field(key: &str) -> bool {
    let key = key.to_lowercase();
    AI_FIELD_NAMES
        .iter()
        .any(|name| key.contains(&name.to_lowercase()))
}

/// Whether a value mentions a known AI tool or technique.
pub fn mentions_ai_tool(value: &str) -> bool {
    let value = value.to_lowercase();
    AI_TOOL_KEYWORDS.iter().any(|kw| value.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_keywords_are_lowercase() {
        // mentions_ai_tool compares against the lowercased value as-is
        for kw in AI_TOOL_KEYWORDS {
            assert_eq!(*kw, kw.to_lowercase());
        }
    }

    #[test]
    fn field_match_is_case_insensitive_substring() {
        assert!(is_ai_field("software"));
        assert!(is_ai_field("SOFTWARE"));
        assert!(is_ai_field("positive_prompt"));
        assert!(is_ai_field("Comment (raw)"));
        assert!(!is_ai_field("Creation Time"));
        assert!(!is_ai_field("Copyright"));
    }

    #[test]
    fn tool_match() {
        assert!(mentions_ai_tool("Made with Stable Diffusion XL"));
        assert!(mentions_ai_tool("ComfyUI"));
        assert!(!mentions_ai_tool("Adobe Photoshop"));
    }
}
