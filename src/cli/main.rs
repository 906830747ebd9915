use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use png_prompt::vision::{self, PromptLength};
use png_prompt::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "png-prompt-cli",
    version,
    about = "Recover AI image-generation prompts and settings from PNG text chunks"
)]
struct Cli {
    /// Image files or directories to scan
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Also print every decoded text chunk
    #[arg(long = "show-chunks")]
    show_chunks: bool,

    /// Decompress zTXt and compressed iTXt chunks instead of showing a placeholder
    #[arg(long)]
    inflate: bool,

    /// Print the vision model request body for each image instead of extracting
    #[arg(long = "vision-request")]
    vision_request: bool,

    /// Length of the prompts asked from the vision model (short, medium, long)
    #[arg(long, value_name = "LENGTH")]
    length: Option<PromptLength>,

    /// Parse a saved vision model reply and print the prompts it contains
    #[arg(long = "vision-response", value_name = "FILE")]
    vision_response: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Load config and apply CLI overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.inflate {
        config.extraction.inflate_compressed = true;
    }
    if cli.json {
        config.output.json = true;
    }
    if cli.show_chunks {
        config.output.show_chunks = true;
    }
    if let Some(length) = cli.length {
        config.vision.prompt_length = length;
    }

    // Handle --vision-response
    if let Some(ref reply_path) = cli.vision_response {
        let text = std::fs::read_to_string(reply_path)
            .with_context(|| format!("Failed to read {}", reply_path.display()))?;
        let prompts = vision::parse_vision_response(&text)?;
        if config.output.json {
            println!("{}", serde_json::to_string_pretty(&prompts)?);
        } else {
            print_vision_prompts(&prompts);
        }
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let images = pipeline::collect_images(&cli.paths);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    // Handle --vision-request
    if cli.vision_request {
        let prompt = vision::build_prompt(config.vision.prompt_length);
        log::info!(
            "Building {} request(s) for {} ({} prompts)",
            images.len(),
            config.vision.model,
            config.vision.prompt_length
        );
        for image_path in &images {
            let bytes = std::fs::read(image_path)
                .with_context(|| format!("Failed to read {}", image_path.display()))?;
            let body = vision::build_request_body(&bytes, &prompt, &config.vision);
            log::info!("Request body for {}", image_path.display());
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        return Ok(());
    }

    log::info!("Found {} image(s) to scan", images.len());

    let mut results = Vec::new();
    let mut failed = 0;
    let total = images.len();

    for (i, image_path) in images.iter().enumerate() {
        log::info!("[{}/{}] Processing: {}", i + 1, total, image_path.display());

        match pipeline::extract_file(image_path, &config) {
            Ok(result) => {
                if !config.output.json {
                    print_extraction(&result, config.output.show_chunks);
                }
                results.push(result);
            }
            Err(e) => {
                log::error!("  Error: {e:#}");
                failed += 1;
            }
        }
    }

    // JSON output
    if config.output.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    // Summary
    let png_count = results.iter().filter(|r| r.extraction.valid).count();
    let with_prompt = results
        .iter()
        .filter(|r| r.extraction.normalized.primary_prompt.is_some())
        .count();
    log::info!(
        "Done: {png_count} PNG(s), {with_prompt} with prompts, {failed} failed out of {total} images"
    );

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 70;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print the prompts and metadata found in one file.
fn print_extraction(result: &pipeline::ExtractionResult, show_chunks: bool) {
    let extraction = &result.extraction;

    println!();
    println!("{BOLD}File:{RESET} {}", result.path.display());
    println!("{DIM}{}{RESET}", "═".repeat(96));

    if !extraction.valid {
        println!("  {DIM}(not a PNG, no text chunks to read){RESET}");
        println!();
        return;
    }

    let normalized = &extraction.normalized;
    if normalized.is_empty() {
        println!("  {DIM}(no generation metadata found){RESET}");
    } else {
        println!("  {BOLD}Prompts{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(94));
        if let Some(ref primary) = normalized.primary_prompt {
            print_highlighted("Prompt", primary);
        }
        if let Some(ref secondary) = normalized.secondary_prompt {
            if normalized.primary_prompt.as_ref() != Some(secondary) {
                print_highlighted("With negative", secondary);
            }
        }
        println!();

        if let Some(ref display) = normalized.exif_string {
            println!("  {BOLD}Metadata{RESET}");
            println!("  {DIM}{}{RESET}", "─".repeat(94));
            for line in display.lines() {
                println!("  {line}");
            }
        }
    }

    if show_chunks {
        println!();
        println!("  {BOLD}Text Chunks{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(94));
        if extraction.metadata.is_empty() {
            println!("  {DIM}(none){RESET}");
        }
        for (key, value) in extraction.metadata.iter() {
            print_row(key, value);
        }
    }

    println!();
}

/// Print both prompts from a vision model reply.
fn print_vision_prompts(prompts: &vision::VisionPrompts) {
    println!();
    println!("{BOLD}Vision prompts{RESET}");
    println!("{DIM}{}{RESET}", "═".repeat(96));
    match prompts.novelai {
        Some(ref p) => print_highlighted("NovelAI", p),
        None => print_row("NovelAI", "(missing)"),
    }
    match prompts.stable_diffusion {
        Some(ref p) => print_highlighted("Stable Diffusion", p),
        None => print_row("Stable Diffusion", "(missing)"),
    }
    println!();
}

/// Print a single row in the metadata display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    for (i, line) in wrap_lines(val).iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Print a prompt row (green).
fn print_highlighted(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    for (i, line) in wrap_lines(val).iter().enumerate() {
        if i == 0 {
            println!("  {GREEN}{tag_col} : {line}{RESET}");
        } else {
            println!("  {GREEN}{INDENT}{line}{RESET}");
        }
    }
}

/// Wrap each line of a possibly multi-line value.
fn wrap_lines(s: &str) -> Vec<String> {
    let lines: Vec<String> = s.lines().flat_map(|line| wrap_text(line, VAL_WIDTH)).collect();
    if lines.is_empty() { vec![String::new()] } else { lines }
}

/// Wrap text at word boundaries to fit within max_width.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in s.split_whitespace() {
        if current_line.is_empty() {
            current_line = word.to_string();
        } else if current_line.len() + 1 + word.len() <= max_width {
            current_line.push(' ');
            current_line.push_str(word);
        } else {
            lines.push(current_line);
            current_line = word.to_string();
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_parsed_by_clap() {
        let cli = Cli::try_parse_from(["png-prompt-cli", "--length", "long", "a.png"]).unwrap();
        assert_eq!(cli.length, Some(PromptLength::Long));
        assert_eq!(cli.paths, vec![PathBuf::from("a.png")]);
    }

    #[test]
    fn bad_length_rejected_by_clap() {
        assert!(Cli::try_parse_from(["png-prompt-cli", "--length", "huge"]).is_err());
    }

    #[test]
    fn wrap_text_at_word_boundaries() {
        assert_eq!(wrap_text("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap_lines(""), vec![String::new()]);
    }
}
