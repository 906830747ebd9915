use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vision::PromptLength;

/// Largest chunk payload that is still decoded as text.
///
/// Anything at or above this size is assumed to be image data or some other
/// binary blob and is skipped unread.
pub const DEFAULT_MAX_TEXT_CHUNK_LEN: usize = 500_000;

/// Top-level configuration for the png-prompt library.
///
/// Controls how PNG text chunks are decoded, how the vision-model prompt is
/// built, and what the CLI prints.
///
/// # Loading
///
/// ```rust,no_run
/// use png_prompt::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.extraction.inflate_compressed = true;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chunk decoding options.
    pub extraction: ExtractionConfig,
    /// Vision-model prompt and request settings.
    pub vision: VisionConfig,
    /// Output behavior of the CLI.
    pub output: OutputConfig,
}

/// Options for the PNG chunk reader.
///
/// # Example
///
/// ```rust
/// use png_prompt::config::ExtractionConfig;
///
/// let options = ExtractionConfig {
///     inflate_compressed: true, // decompress zTXt / iTXt
///     ..ExtractionConfig::default()
/// };
/// assert_eq!(options.max_text_chunk_len, 500_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Inflate zTXt and compressed iTXt payloads instead of recording a placeholder.
    pub inflate_compressed: bool,
    /// Chunks with a payload this long or longer are never decoded as text.
    pub max_text_chunk_len: usize,
}

/// Settings for the vision-model request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub model: String,
    pub prompt_length: PromptLength,
    pub max_output_tokens: u32,
}

/// CLI output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print every decoded text chunk, not only the normalized result.
    pub show_chunks: bool,
    /// Print results as JSON.
    pub json: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            inflate_compressed: false,
            max_text_chunk_len: DEFAULT_MAX_TEXT_CHUNK_LEN,
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            prompt_length: PromptLength::Medium,
            max_output_tokens: 1000,
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
