//! The `codeglance render` command: render a local file's thumbnail.
//!
//! Runs the decode, lexer and render stages without a DAM, which is handy for
//! checking fonts and themes.

use anyhow::Context;
use clap::Args;
use codeglance_core::pipeline::decode_preview;
use codeglance_core::{Config, LexerResolver, ThumbnailRenderer};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Arguments for the `render` command.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Source file to render
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output PNG (defaults to `<input>.png`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Thumbnail edge length in pixels (overrides `thumbnail.size`)
    #[arg(short, long)]
    pub size: Option<u32>,
}

/// Execute the render command.
pub async fn execute(args: RenderArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(size) = args.size {
        anyhow::ensure!((1..=4096).contains(&size), "--size must be between 1 and 4096");
        config.thumbnail.size = size;
    }

    let name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file: {}", args.input.display()))?;

    let resolver = LexerResolver::new(config.processing.lexer_cache_size);
    let lexer = resolver
        .resolve(&name)
        .with_context(|| format!("No lexer found for {name}"))?;

    let prefix = read_prefix(&args.input, config.processing.read_limit_bytes)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let decoded = decode_preview(&prefix);
    match &decoded.encoding {
        Some(encoding) => tracing::debug!("Decoded {name} as {encoding}"),
        None => tracing::warn!("No encoding matched {name}, using printable bytes"),
    }

    let renderer = ThumbnailRenderer::new(config.thumbnail.clone(), config.font_path());
    let thumbnail = tokio::task::spawn_blocking(move || renderer.render(&name, &decoded.text, &lexer))
        .await??;

    let output = args
        .output
        .unwrap_or_else(|| default_output(&args.input));
    std::fs::write(&output, &thumbnail.png)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} ({}, {}x{}) -> {}",
        args.input.display(),
        thumbnail.language,
        thumbnail.size,
        thumbnail.size,
        output.display()
    );
    Ok(())
}

fn read_prefix(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(limit);
    std::fs::File::open(path)?
        .take(limit as u64)
        .read_to_end(&mut buffer)?;
    Ok(buffer)
}

fn default_output(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".png");
    PathBuf::from(name)
}
