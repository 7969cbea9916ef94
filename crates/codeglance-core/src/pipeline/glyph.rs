//! Glyph rasterization for preview rendering.
//!
//! A TrueType/OpenType font is used when one is configured and present on
//! disk; otherwise the built-in 8x8 bitmap font is scaled to the requested
//! size, so rendering never depends on system fonts.

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use font8x8::{UnicodeFonts, BASIC_FONTS, BLOCK_FONTS, BOX_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};
use std::path::Path;

/// Source of glyph shapes.
pub enum GlyphFont {
    /// Built-in 8x8 bitmap glyphs, each pixel drawn as a `scale` x `scale` block
    Bitmap { scale: u32 },
    /// Anti-aliased outlines from a font file
    Outline { font: FontVec, scale: PxScale },
}

impl GlyphFont {
    /// The built-in bitmap font sized as close to `font_size` as integer scaling allows.
    pub fn builtin(font_size: u32) -> Self {
        let scale = ((font_size + 4) / 8).max(1);
        GlyphFont::Bitmap { scale }
    }

    /// Load a font file.
    pub fn from_file(path: &Path, font_size: u32) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| e.to_string())?;
        Ok(GlyphFont::Outline {
            font,
            scale: PxScale::from(font_size as f32),
        })
    }

    /// Use the font at `path` if it exists and parses, else the built-in font.
    pub fn load(path: &Path, font_size: u32) -> Self {
        if !path.is_file() {
            return Self::builtin(font_size);
        }
        match Self::from_file(path, font_size) {
            Ok(font) => {
                tracing::debug!("Using custom font {:?}", path);
                font
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable font {:?}: {e}", path);
                Self::builtin(font_size)
            }
        }
    }

    /// Whether this is the built-in bitmap font.
    pub fn is_builtin(&self) -> bool {
        matches!(self, GlyphFont::Bitmap { .. })
    }

    /// Horizontal advance for a character, in pixels.
    pub fn advance(&self, c: char) -> f32 {
        match self {
            GlyphFont::Bitmap { scale } => (8 * scale) as f32,
            GlyphFont::Outline { font, scale } => {
                let scaled = font.as_scaled(*scale);
                scaled.h_advance(font.glyph_id(c))
            }
        }
    }

    /// Height of one line of text, excluding line padding.
    pub fn line_height(&self) -> u32 {
        match self {
            GlyphFont::Bitmap { scale } => 8 * scale,
            GlyphFont::Outline { font, scale } => {
                let scaled = font.as_scaled(*scale);
                (scaled.height() + scaled.line_gap()).ceil().max(1.0) as u32
            }
        }
    }

    /// Draw `c` with its line box's top-left corner at (`x`, `top`).
    pub fn draw(&self, canvas: &mut RgbImage, c: char, x: f32, top: u32, color: Rgb<u8>) {
        match self {
            GlyphFont::Bitmap { scale } => draw_bitmap(canvas, c, x.round() as i64, top, *scale, color),
            GlyphFont::Outline { font, scale } => {
                let scaled = font.as_scaled(*scale);
                let mut glyph = scaled.scaled_glyph(c);
                glyph.position = point(x, top as f32 + scaled.ascent());

                if let Some(outlined) = font.outline_glyph(glyph) {
                    let bounds = outlined.px_bounds();
                    outlined.draw(|gx, gy, coverage| {
                        let px = bounds.min.x as i64 + gx as i64;
                        let py = bounds.min.y as i64 + gy as i64;
                        blend(canvas, px, py, color, coverage);
                    });
                }
            }
        }
    }
}

fn bitmap_rows(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BOX_FONTS.get(c))
        .or_else(|| BLOCK_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn draw_bitmap(canvas: &mut RgbImage, c: char, x: i64, top: u32, scale: u32, color: Rgb<u8>) {
    let scale = i64::from(scale);
    for (row, bits) in bitmap_rows(c).iter().enumerate() {
        for col in 0..8 {
            // Bit 0 is the leftmost pixel.
            if bits & (1 << col) == 0 {
                continue;
            }
            let x0 = x + col * scale;
            let y0 = i64::from(top) + row as i64 * scale;
            for dy in 0..scale {
                for dx in 0..scale {
                    blend(canvas, x0 + dx, y0 + dy, color, 1.0);
                }
            }
        }
    }
}

/// Alpha-blend `color` over the canvas pixel, ignoring out-of-bounds writes.
fn blend(canvas: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height()) {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0);
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for (dst, src) in pixel.0.iter_mut().zip(color.0) {
        *dst = (f32::from(*dst) * (1.0 - alpha) + f32::from(src) * alpha).round() as u8;
    }
}
