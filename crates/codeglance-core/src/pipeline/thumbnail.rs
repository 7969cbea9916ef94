//! Syntax-highlighted thumbnail rendering with PNG output.
//!
//! Text is highlighted with the resolved grammar, drawn onto a wide canvas,
//! cropped to a top-left anchored square (the opening lines are the most
//! representative part of a source file) and resized to the target size.

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use std::path::PathBuf;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, Theme, ThemeSet};
use syntect::util::LinesWithEndings;

use crate::config::ThumbnailConfig;
use crate::error::{PipelineError, PipelineResult};

use super::glyph::GlyphFont;
use super::lexer::Lexer;

const TAB_WIDTH: usize = 4;
const DEFAULT_THEME: &str = "InspiredGitHub";

/// A rendered preview ready for upload.
#[derive(Debug, Clone)]
pub struct RenderedThumbnail {
    /// PNG-encoded image bytes
    pub png: Vec<u8>,
    /// Edge length of the square image
    pub size: u32,
    /// Display name of the grammar used for highlighting
    pub language: String,
}

/// Renders highlighted source text into fixed-size thumbnails.
pub struct ThumbnailRenderer {
    config: ThumbnailConfig,
    font_path: PathBuf,
    theme: Theme,
}

impl ThumbnailRenderer {
    /// Create a renderer. `font_path` is checked on every render, so a font
    /// dropped in place later is picked up without a restart.
    pub fn new(config: ThumbnailConfig, font_path: PathBuf) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(&config.theme) {
            Some(theme) => theme,
            None => {
                tracing::warn!(
                    "Unknown theme '{}', falling back to {DEFAULT_THEME}",
                    config.theme
                );
                themes.remove(DEFAULT_THEME).unwrap_or_default()
            }
        };

        Self {
            config,
            font_path,
            theme,
        }
    }

    /// Render `text` highlighted with `lexer` into a PNG thumbnail.
    ///
    /// `path` is only used to label errors. The output is always exactly
    /// `size` x `size` pixels.
    pub fn render(&self, path: &str, text: &str, lexer: &Lexer) -> PipelineResult<RenderedThumbnail> {
        let font = GlyphFont::load(&self.font_path, self.config.font_size);

        let canvas = self.rasterize(text, lexer, &font).map_err(|message| PipelineError::Render {
            path: path.to_string(),
            message,
        })?;

        let thumbnail = crop_and_resize(&canvas, self.config.size);
        let png = encode_png(&thumbnail).map_err(|e| PipelineError::Render {
            path: path.to_string(),
            message: format!("PNG encoding failed: {e}"),
        })?;

        tracing::trace!(
            "Rendered {path}: canvas {}x{}, png {} bytes",
            canvas.width(),
            canvas.height(),
            png.len()
        );

        Ok(RenderedThumbnail {
            png,
            size: self.config.size,
            language: lexer.name().to_string(),
        })
    }

    /// Draw highlighted text onto a canvas `canvas_scale` times as wide as the target.
    fn rasterize(&self, text: &str, lexer: &Lexer, font: &GlyphFont) -> Result<RgbImage, String> {
        let pad = self.config.image_pad;
        let width = self.config.size.saturating_mul(self.config.canvas_scale).max(1);
        let line_step = font.line_height() + self.config.line_pad;

        let mut highlighter = HighlightLines::new(lexer.syntax(), &self.theme);
        let mut lines = Vec::new();
        for line in LinesWithEndings::from(text) {
            let ranges = highlighter
                .highlight_line(line, lexer.syntax_set())
                .map_err(|e| format!("Highlighting failed: {e}"))?;
            lines.push(ranges);
        }

        // Anything below `width` is cropped away, so the canvas never needs to be taller.
        let content_height = pad * 2 + line_step * (lines.len().max(1) as u32);
        let height = content_height.min(width).max(1);

        let background = rgb(self.theme.settings.background, Rgb([255, 255, 255]));
        let mut canvas = RgbImage::from_pixel(width, height, background);

        for (index, ranges) in lines.iter().enumerate() {
            let top = pad + line_step * index as u32;
            if top >= height {
                break;
            }
            let mut x = pad as f32;
            for (style, piece) in ranges {
                let color = rgb(Some(style.foreground), Rgb([0, 0, 0]));
                for c in piece.chars() {
                    match c {
                        '\t' => x += font.advance(' ') * TAB_WIDTH as f32,
                        c if c.is_control() => {}
                        c => {
                            if x < width as f32 {
                                font.draw(&mut canvas, c, x, top, color);
                            }
                            x += font.advance(c);
                        }
                    }
                }
            }
        }

        Ok(canvas)
    }
}

/// Crop to the largest top-left square, then resize bilinearly to `size` x `size`.
pub fn crop_and_resize(image: &RgbImage, size: u32) -> RgbImage {
    let side = image.width().min(image.height()).max(1);
    let square = imageops::crop_imm(image, 0, 0, side, side).to_image();
    imageops::resize(&square, size, size, FilterType::Triangle)
}

/// Encode with maximum lossless compression.
pub fn encode_png(image: &RgbImage) -> image::ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, PngFilter::Adaptive);
    image.write_with_encoder(encoder)?;
    Ok(buffer)
}

fn rgb(color: Option<Color>, fallback: Rgb<u8>) -> Rgb<u8> {
    color.map(|c| Rgb([c.r, c.g, c.b])).unwrap_or(fallback)
}
