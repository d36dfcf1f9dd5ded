//! Offline placeholder provider.
//!
//! Renders a deterministic stand-in for model output: a vertical gradient of
//! the primary brand color with "GENERATED IMAGE" drawn in block letters at
//! the center. Results are flagged as [`ImageProviderKind::Placeholder`] so
//! callers can tell them apart from real generations.

use crate::config::{parse_hex_color, BrandConfig};
use crate::error::GenerationError;
use crate::image::provider::ImageProvider;
use crate::image::types::{
    GeneratedImage, GenerationMetadata, GenerationRequest, ImageProviderKind, CANONICAL_SIZE,
};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use std::time::Instant;

const LABEL: &str = "GENERATED IMAGE";

/// Darkening applied at the bottom row of the gradient.
const GRADIENT_DEPTH: f32 = 0.4;

/// Pixels per font cell.
const GLYPH_SCALE: u32 = 6;
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

/// Color used when no brand color is available.
const FALLBACK_COLOR: Rgb<u8> = Rgb([0x80, 0x80, 0x80]);

/// Builder for PlaceholderProvider.
#[derive(Debug, Clone)]
pub struct PlaceholderProviderBuilder {
    color: Rgb<u8>,
    size: u32,
}

impl Default for PlaceholderProviderBuilder {
    fn default() -> Self {
        Self {
            color: FALLBACK_COLOR,
            size: CANONICAL_SIZE,
        }
    }
}

impl PlaceholderProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fill color.
    pub fn color(mut self, color: Rgb<u8>) -> Self {
        self.color = color;
        self
    }

    /// Sets the edge length of the square output.
    pub fn size(mut self, size: u32) -> Self {
        self.size = size.max(1);
        self
    }

    /// Builds the provider.
    pub fn build(self) -> PlaceholderProvider {
        PlaceholderProvider {
            color: self.color,
            size: self.size,
        }
    }
}

/// Deterministic offline base image renderer.
#[derive(Debug, Clone)]
pub struct PlaceholderProvider {
    color: Rgb<u8>,
    size: u32,
}

impl PlaceholderProvider {
    /// Creates a new `PlaceholderProviderBuilder`.
    pub fn builder() -> PlaceholderProviderBuilder {
        PlaceholderProviderBuilder::new()
    }

    /// Renders in the first color of the brand palette.
    pub fn for_brand(brand: &BrandConfig) -> Self {
        let color = brand
            .colors
            .first()
            .and_then(|c| parse_hex_color(c))
            .unwrap_or(FALLBACK_COLOR);
        Self::builder().color(color).build()
    }

    /// The primary fill color.
    pub fn color(&self) -> Rgb<u8> {
        self.color
    }

    fn render(&self) -> RgbImage {
        let size = self.size;
        let span = (size - 1).max(1) as f32;
        let mut img = RgbImage::from_fn(size, size, |_, y| {
            let factor = 1.0 - GRADIENT_DEPTH * (y as f32 / span);
            let Rgb([r, g, b]) = self.color;
            Rgb([shade(r, factor), shade(g, factor), shade(b, factor)])
        });

        let ink = if luminance(self.color) > 186.0 {
            Rgb([0x20, 0x20, 0x20])
        } else {
            Rgb([0xFF, 0xFF, 0xFF])
        };
        draw_label(&mut img, LABEL, ink);
        img
    }
}

#[async_trait]
impl ImageProvider for PlaceholderProvider {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, GenerationError> {
        let start = Instant::now();
        tracing::debug!(prompt = %request.prompt, "rendering placeholder base image");
        let img = self.render();

        Ok(GeneratedImage::new(
            img,
            ImageProviderKind::Placeholder,
            GenerationMetadata {
                model: None,
                duration_ms: Some(start.elapsed().as_millis() as u64),
            },
        ))
    }

    fn kind(&self) -> ImageProviderKind {
        ImageProviderKind::Placeholder
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        Ok(())
    }
}

fn shade(channel: u8, factor: f32) -> u8 {
    (channel as f32 * factor).round().clamp(0.0, 255.0) as u8
}

fn luminance(Rgb([r, g, b]): Rgb<u8>) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Draws `text` centered on `img` with the built-in 5x7 font.
fn draw_label(img: &mut RgbImage, text: &str, ink: Rgb<u8>) {
    let advance = (GLYPH_WIDTH + 1) * GLYPH_SCALE;
    let count = text.chars().count() as u32;
    if count == 0 {
        return;
    }
    let text_width = count * advance - GLYPH_SCALE;
    let text_height = GLYPH_HEIGHT * GLYPH_SCALE;
    if text_width > img.width() || text_height > img.height() {
        return;
    }

    let x0 = (img.width() - text_width) / 2;
    let y0 = (img.height() - text_height) / 2;

    for (i, ch) in text.chars().enumerate() {
        let rows = glyph(ch);
        let gx = x0 + i as u32 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let px = gx + col * GLYPH_SCALE;
                let py = y0 + row as u32 * GLYPH_SCALE;
                for dy in 0..GLYPH_SCALE {
                    for dx in 0..GLYPH_SCALE {
                        img.put_pixel(px + dx, py + dy, ink);
                    }
                }
            }
        }
    }
}

/// Row bitmaps, most significant of the low five bits is the leftmost column.
fn glyph(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        _ => [0; 7],
    }
}
