//! Data exchanged with a vision-language model that writes prompts for an image.
//!
//! The model call itself happens elsewhere; this module only produces what
//! is sent ([`build_prompt`], [`build_request_body`]) and interprets what
//! comes back ([`parse_vision_response`]).

mod request;

pub use request::{build_request_body, sniff_mime};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How long the generated prompts should be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptLength {
    /// Concise, at most 30 words
    Short,
    /// Detailed, at most 80 words
    #[default]
    Medium,
    /// Rich and descriptive, at most 200 words
    Long,
}

impl PromptLength {
    fn instruction(self) -> &'static str {
        match self {
            Self::Short => "Generate a concise prompt with only the key elements (at most 30 words).",
            Self::Medium => "Generate a detailed prompt of moderate length (at most 80 words).",
            Self::Long => {
                "Generate a long, highly detailed prompt with rich description (at most 200 words)."
            }
        }
    }
}

impl FromStr for PromptLength {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(format!(
                "unknown prompt length '{other}' (expected short, medium or long)"
            )),
        }
    }
}

impl fmt::Display for PromptLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        })
    }
}

/// Prompts written by the vision model, one per generator syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisionPrompts {
    pub novelai: Option<String>,
    pub stable_diffusion: Option<String>,
}

/// Build the instruction sent alongside the image.
///
/// Asks for a single JSON object with a `novelai` and a `stable_diffusion`
/// prompt, each following its generator's weighting syntax.
pub fn build_prompt(length: PromptLength) -> String {
    format!(
        r#"Write NovelAI and Stable Diffusion prompts for this image and return them as JSON. {instruction} Respond with the JSON block only, no introduction or explanation.

NovelAI prompt rules:
- Emphasis: wrap words in curly braces, e.g. {{high quality}}, {{{{masterpiece}}}}
- De-emphasis: wrap words in square brackets, e.g. [low quality], [[blurry]]
- Numeric weight: use "weight::prompt::" or "weight::prompt1, prompt2::", e.g. 1.2::masterpiece::, 0.8::simple background::

Stable Diffusion prompt rules:
- Weight: wrap the word in parentheses followed by a colon and a number, e.g. (masterpiece:1.2), (low quality:0.8)

Both prompts should cover:
- Quality tags (masterpiece, best quality, ultra detailed, intricate details, high resolution, 8k)
- Composition and angle (full body, close-up, medium shot, wide shot, from above, from below, eye level, dutch angle, dynamic pose)
- Mood (serene, joyful, melancholic, chaotic, ethereal, mysterious, vibrant, somber, energetic)
- Art style (anime style, oil painting, watercolor, cyberpunk, realistic, concept art, digital painting, ukiyo-e, cel-shaded, pencil sketch)
- Character details (hair color, eye color, skin tone, clothing, accessories, pose, facial expression, body type, age, gender)
- Background (natural landscape, city street, futuristic interior, ancient castle, dense forest, snowy mountains, starry night sky)
- Lighting and color (volumetric lighting, golden hour, neon glow, monochrome, soft lighting, harsh shadows, cinematic lighting)
- Other details (weather, time of day, foreground and background objects, magical effects, lens flare, dust particles)

Required JSON format:
{{
  "novelai": "prompt text",
  "stable_diffusion": "prompt text"
}}

Follow the format and rules above and write both prompts in English."#,
        instruction = length.instruction()
    )
}

/// Parse the vision model's reply into [`VisionPrompts`].
///
/// Models often wrap the JSON in a markdown fence, surround it with prose,
/// or leave trailing commas; each of these is tolerated. Fails only when no
/// JSON object with a `novelai` or `stable_diffusion` key can be found.
pub fn parse_vision_response(text: &str) -> Result<VisionPrompts> {
    log::debug!("Raw vision response:\n{text}");

    for candidate in extract_json_candidates(text.trim()) {
        for attempt in [candidate.clone(), fix_trailing_commas(&candidate)] {
            let Ok(value) = serde_json::from_str::<serde_json::Value>(&attempt) else {
                continue;
            };
            if let Some(prompts) = value_to_prompts(&value) {
                return Ok(prompts);
            }
        }
    }

    anyhow::bail!("Could not find novelai / stable_diffusion prompts in vision response")
}

/// Possible JSON object strings in a model reply, most specific first.
fn extract_json_candidates(text: &str) -> Vec<String> {
    let mut candidates = Vec::new();

    // Fenced block: ```json ... ``` or ``` ... ```
    if text.contains("```") {
        let fenced = text
            .lines()
            .skip_while(|l| !l.trim().starts_with("```"))
            .skip(1)
            .take_while(|l| !l.trim().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n");
        if !fenced.trim().is_empty() {
            candidates.push(fenced);
        }
    }

    // Outermost braces
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            candidates.push(text[start..=end].to_string());
        }
    }

    candidates.push(text.to_string());
    candidates
}

/// Remove commas directly before a closing `}` or `]`, outside of strings.
fn fix_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            escape_next = false;
        } else if in_string && c == '\\' {
            escape_next = true;
        } else if c == '"' {
            in_string = !in_string;
        } else if !in_string && c == ',' {
            let rest = chars.clone().find(|c| !c.is_whitespace());
            if matches!(rest, Some('}') | Some(']')) {
                continue;
            }
        }
        result.push(c);
    }
    result
}

fn value_to_prompts(value: &serde_json::Value) -> Option<VisionPrompts> {
    let obj = value.as_object()?;
    let field = |name: &str| {
        obj.get(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let prompts = VisionPrompts {
        novelai: field("novelai"),
        stable_diffusion: field("stable_diffusion"),
    };
    if prompts.novelai.is_none() && prompts.stable_diffusion.is_none() {
        None
    } else {
        Some(prompts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── PromptLength ─────────────────────────────────────────────────

    #[test]
    fn length_from_str() {
        assert_eq!("short".parse::<PromptLength>().unwrap(), PromptLength::Short);
        assert_eq!("MEDIUM".parse::<PromptLength>().unwrap(), PromptLength::Medium);
        assert_eq!("Long".parse::<PromptLength>().unwrap(), PromptLength::Long);
        assert!("huge".parse::<PromptLength>().is_err());
    }

    #[test]
    fn length_display_round_trips() {
        for length in [PromptLength::Short, PromptLength::Medium, PromptLength::Long] {
            assert_eq!(length.to_string().parse::<PromptLength>().unwrap(), length);
        }
    }

    #[test]
    fn length_serde_lowercase() {
        assert_eq!(serde_json::to_string(&PromptLength::Long).unwrap(), "\"long\"");
    }

    // ── build_prompt ─────────────────────────────────────────────────

    #[test]
    fn prompt_mentions_format_and_length() {
        let prompt = build_prompt(PromptLength::Short);
        assert!(prompt.contains("\"novelai\""));
        assert!(prompt.contains("\"stable_diffusion\""));
        assert!(prompt.contains("at most 30 words"));
        assert!(prompt.contains("{high quality}"));
        assert!(prompt.contains("{{masterpiece}}"));
        assert!(prompt.contains("(masterpiece:1.2)"));

        assert!(build_prompt(PromptLength::Long).contains("at most 200 words"));
    }

    // ── parse_vision_response ────────────────────────────────────────

    #[test]
    fn parse_plain_json() {
        let prompts =
            parse_vision_response(r#"{"novelai": "{cat}, night", "stable_diffusion": "(cat:1.2), night"}"#)
                .unwrap();
        assert_eq!(prompts.novelai.as_deref(), Some("{cat}, night"));
        assert_eq!(prompts.stable_diffusion.as_deref(), Some("(cat:1.2), night"));
    }

    #[test]
    fn parse_fenced_json() {
        let text = "Here you go:\n```json\n{\n  \"novelai\": \"a\",\n  \"stable_diffusion\": \"b\"\n}\n```\nEnjoy!";
        let prompts = parse_vision_response(text).unwrap();
        assert_eq!(prompts.novelai.as_deref(), Some("a"));
        assert_eq!(prompts.stable_diffusion.as_deref(), Some("b"));
    }

    #[test]
    fn parse_trailing_comma() {
        let prompts = parse_vision_response(r#"{"novelai": "a", "stable_diffusion": "b",}"#).unwrap();
        assert_eq!(prompts.stable_diffusion.as_deref(), Some("b"));
    }

    #[test]
    fn parse_surrounding_prose() {
        let prompts =
            parse_vision_response(r#"Sure! {"novelai": "forest, {{fog}}"} Hope it helps."#).unwrap();
        assert_eq!(prompts.novelai.as_deref(), Some("forest, {{fog}}"));
        assert!(prompts.stable_diffusion.is_none());
    }

    #[test]
    fn parse_rejects_other_json() {
        assert!(parse_vision_response(r#"{"title": "x"}"#).is_err());
        assert!(parse_vision_response(r#"{"novelai": ""}"#).is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_vision_response("").is_err());
        assert!(parse_vision_response("I cannot help with that.").is_err());
    }

    // ── fix_trailing_commas ──────────────────────────────────────────

    #[test]
    fn trailing_commas_removed() {
        assert_eq!(fix_trailing_commas(r#"{"a": 1,}"#), r#"{"a": 1}"#);
        assert_eq!(fix_trailing_commas("[1, 2 ,\n ]"), "[1, 2 \n ]");
    }

    #[test]
    fn commas_in_strings_kept() {
        let s = r#"{"a": "x,}", "b": "\",]"}"#;
        assert_eq!(fix_trailing_commas(s), s);
    }
}
