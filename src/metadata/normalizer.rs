use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

use super::keywords;
use super::map::MetadataMap;
use crate::png::is_compressed_placeholder;

/// Key the raw `Comment` text is scanned under when it isn't valid JSON.
pub const RAW_COMMENT_KEY: &str = "Comment (raw)";

/// Values longer than this are treated as metadata even without a keyword match.
const LONG_VALUE_CHARS: usize = 50;

/// Generator settings copied from a `Comment` JSON object into the display text.
const SETTING_FIELDS: &[(&str, &str)] = &[
    ("steps", "Steps"),
    ("sampler", "Sampler"),
    ("seed", "Seed"),
    ("height", "Height"),
    ("width", "Width"),
    ("scale", "CFG Scale"),
    ("cfg_scale", "CFG Scale"),
    ("model", "Model"),
    ("clip_skip", "Clip Skip"),
    ("strength", "Strength"),
    ("version", "Version"),
];

const WORKFLOW_PLACEHOLDER: &str = "[Workflow data could not be displayed]";

static NEGATIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:negative[ _]prompt|\buc)[ \t]*:[ \t]*([^\r\n]+)")
        .expect("negative prompt pattern is valid")
});

/// Prompts and display text recovered from a [`MetadataMap`].
///
/// All fields are `None` when the image carried nothing that looks like
/// AI-generation metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    /// Every recognized metadata entry, formatted as labeled lines.
    pub exif_string: Option<String>,
    /// Best guess at the positive (generation) prompt.
    pub primary_prompt: Option<String>,
    /// Best guess at the secondary prompt, annotated with any negative prompt.
    pub secondary_prompt: Option<String>,
}

impl NormalizedResult {
    /// `true` if nothing was recovered.
    pub fn is_empty(&self) -> bool {
        self.exif_string.is_none() && self.primary_prompt.is_none() && self.secondary_prompt.is_none()
    }
}

/// Running state of one normalization.
#[derive(Default)]
struct Accumulator {
    lines: Vec<String>,
    primary: Option<String>,
    secondary: Option<String>,
    found: bool,
}

impl Accumulator {
    fn push_line(&mut self, line: impl Into<String>) {
        self.found = true;
        self.lines.push(line.into());
    }

    fn display(&self) -> String {
        self.lines.join("\n")
    }

    /// Use `prompt` for whichever of the two prompts is still unset.
    fn offer_prompt(&mut self, prompt: &str) {
        if self.primary.is_none() {
            self.primary = Some(prompt.to_string());
        }
        if self.secondary.is_none() {
            self.secondary = Some(prompt.to_string());
        }
    }

    fn append_negative(&mut self, negative: &str) {
        let annotation = format!("[Negative Prompt: {negative}]");
        match &mut self.secondary {
            Some(s) if s.contains(&annotation) => {}
            Some(s) => {
                s.push(' ');
                s.push_str(&annotation);
            }
            None => self.secondary = Some(annotation),
        }
    }

    fn finish(self) -> NormalizedResult {
        let exif_string = self.found.then(|| self.display());
        NormalizedResult {
            exif_string,
            primary_prompt: self.primary,
            secondary_prompt: self.secondary,
        }
    }
}

/// Recover prompts from decoded PNG text metadata.
///
/// Sources are consulted from most to least structured:
///
/// 1. A `Comment` holding JSON (NovelAI style), including v4 caption objects,
///    negative prompts, sampler settings and ComfyUI workflows
/// 2. A `parameters` entry (AUTOMATIC1111 style)
/// 3. Any other entry whose key or value looks AI-related
/// 4. A line-based search over everything collected so far
///
/// A prompt found by an earlier source is never replaced by a later one,
/// except that a v4 caption overrides the plain `prompt` field. Nothing in
/// here fails: malformed JSON just drops through to the heuristic scan.
///
/// # Example
///
/// ```rust
/// use png_prompt::metadata::{MetadataMap, normalize};
///
/// let map: MetadataMap = [("parameters", "masterpiece, 1girl")].into_iter().collect();
/// let result = normalize(&map);
/// assert_eq!(result.primary_prompt.as_deref(), Some("masterpiece, 1girl"));
/// assert!(result.exif_string.unwrap().contains("Parameters: masterpiece, 1girl"));
/// ```
pub fn normalize(metadata: &MetadataMap) -> NormalizedResult {
    let mut acc = Accumulator::default();
    let mut raw_comment = None;

    if let Some(comment) = metadata.get("Comment") {
        match serde_json::from_str::<Value>(comment) {
            Ok(json) => read_comment_json(&mut acc, &json),
            Err(e) => {
                log::debug!("Comment is not JSON ({e}), scanning it as plain text");
                raw_comment = Some(comment);
            }
        }
    }

    if let Some(params) = metadata.get("parameters").filter(|p| !p.trim().is_empty()) {
        acc.push_line(format!("Parameters: {params}"));
        acc.offer_prompt(params);
    }

    let remaining = metadata
        .iter()
        .filter(|(key, _)| *key != "Comment" && *key != "parameters")
        .chain(raw_comment.map(|c| (RAW_COMMENT_KEY, c)));
    for (key, value) in remaining {
        scan_entry(&mut acc, key, value);
    }

    if acc.primary.is_none() && !acc.lines.is_empty() {
        fall_back_to_display_text(&mut acc);
    }

    acc.finish()
}

/// Extract prompts and settings from a parsed `Comment`.
fn read_comment_json(acc: &mut Accumulator, json: &Value) {
    acc.found = true;

    if let Some(obj) = json.as_object() {
        if let Some(prompt) = obj.get("prompt").and_then(unwrap_prompt) {
            acc.push_line(format!("Prompt: {prompt}"));
            acc.offer_prompt(&prompt);
        }

        // v4 captions are the authoritative prompt in newer files
        if let Some(v4) = obj.get("v4_prompt").and_then(base_caption) {
            acc.push_line(format!("V4 Prompt: {v4}"));
            acc.primary = Some(v4.clone());
            if acc.secondary.is_none() {
                acc.secondary = Some(v4);
            }
        }

        if let Some(uc) = obj.get("uc").and_then(non_empty_str) {
            acc.push_line(format!("Negative Prompt (uc): {uc}"));
            acc.append_negative(&uc);
        }

        if let Some(v4_uc) = obj.get("v4_negative_prompt").and_then(base_caption) {
            acc.push_line(format!("V4 Negative Prompt: {v4_uc}"));
            acc.append_negative(&v4_uc);
        }

        if let Some(negative) = obj.get("negative_prompt").and_then(non_empty_str) {
            acc.push_line(format!("Negative Prompt: {negative}"));
            let mentioned = acc
                .secondary
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains("negative prompt"));
            if !mentioned {
                acc.append_negative(&negative);
            }
        }

        for (field, label) in SETTING_FIELDS {
            if let Some(value) = obj.get(*field).filter(|v| !v.is_null()) {
                acc.push_line(format!("{label}: {}", display_value(value)));
            }
        }

        if let Some(workflow) = obj.get("workflow").filter(|v| !v.is_null()) {
            acc.push_line(format!("Workflow:\n{}", render_workflow(workflow)));
        }
    }

    let full = serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string());
    acc.push_line(format!("Full JSON Comment:\n{full}"));
}

/// Classify one entry and record it if it looks like generation metadata.
fn scan_entry(acc: &mut Accumulator, key: &str, value: &str) {
    let relevant = keywords::is_ai_field(key)
        || keywords::mentions_ai_tool(value)
        || (value.chars().count() > LONG_VALUE_CHARS && !is_compressed_placeholder(value));
    if !relevant {
        return;
    }

    acc.push_line(format!("{key}: {value}"));

    let key = key.to_lowercase();
    if acc.primary.is_none()
        && (key.contains("prompt") || key.contains("description"))
        && !value.trim().is_empty()
    {
        acc.offer_prompt(value);
    }
}

/// Last resort: take the prompt from the collected display text.
fn fall_back_to_display_text(acc: &mut Accumulator) {
    let display = acc.display();

    let prompt_line = display.lines().find_map(|line| {
        let line = line.trim_start();
        let label = line.get(..7)?;
        if !label.eq_ignore_ascii_case("prompt:") {
            return None;
        }
        Some(line[7..].trim()).filter(|rest| !rest.is_empty())
    });
    acc.offer_prompt(prompt_line.unwrap_or(display.as_str()));

    let negative = NEGATIVE_PATTERN
        .captures(&display)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|v| !v.is_empty());
    if let (Some(negative), Some(secondary)) = (negative, acc.secondary.as_mut()) {
        if !secondary.contains(negative) {
            secondary.push_str(", negative_prompt: ");
            secondary.push_str(negative);
        }
    }
}

/// A `prompt` field is either plain text, or (in some exporters) a caption
/// object or a string holding one.
fn unwrap_prompt(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            if s.trim_start().starts_with('{') {
                if let Some(caption) = serde_json::from_str::<Value>(s)
                    .ok()
                    .as_ref()
                    .and_then(base_caption)
                {
                    return Some(caption);
                }
            }
            non_empty_str(value)
        }
        Value::Object(_) => base_caption(value),
        _ => None,
    }
}

/// `caption.base_caption` of a caption object, or `caption` itself when it is a string.
fn base_caption(value: &Value) -> Option<String> {
    let caption = value.get("caption")?;
    match caption {
        Value::String(_) => non_empty_str(caption),
        _ => caption.get("base_caption").and_then(non_empty_str),
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Strings without quotes, everything else as compact JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// ComfyUI stores its graph either as an object or as a JSON string.
///
/// Anything that isn't a JSON object or array, directly or inside a string,
/// is shown as a placeholder.
fn render_workflow(workflow: &Value) -> String {
    let parsed;
    let graph = match workflow {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(v) => {
                parsed = v;
                &parsed
            }
            Err(_) => return WORKFLOW_PLACEHOLDER.to_string(),
        },
        other => other,
    };
    if !(graph.is_object() || graph.is_array()) {
        return WORKFLOW_PLACEHOLDER.to_string();
    }
    serde_json::to_string_pretty(graph).unwrap_or_else(|_| WORKFLOW_PLACEHOLDER.to_string())
}
