//! Logo compositing.

use crate::error::{Error, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};
use std::path::Path;

/// Logo width as a fraction of the base width (1/10).
const LOGO_WIDTH_DIVISOR: u32 = 10;

/// Gap between the logo and the right and bottom edges, in pixels.
pub const LOGO_INSET: i64 = 20;

/// Overlays the brand logo at the bottom-right corner of `base`.
///
/// Without a logo, or when the logo cannot be read, the input is returned
/// unchanged. An unreadable logo is logged as a warning.
pub fn apply_branding(base: RgbImage, logo_path: Option<&Path>) -> RgbImage {
    let Some(path) = logo_path else {
        return base;
    };
    if !path.exists() {
        tracing::debug!(path = %path.display(), "logo not found, skipping branding");
        return base;
    }

    let logo = match load_logo(path) {
        Ok(logo) => logo,
        Err(e) => {
            tracing::warn!(path = %path.display(), "{e}");
            return base;
        }
    };
    overlay_logo(base, &logo)
}

fn load_logo(path: &Path) -> Result<RgbaImage> {
    let logo = image::open(path)
        .map_err(|e| Error::Branding(format!("cannot read logo {}: {}", path.display(), e)))?;
    Ok(logo.to_rgba8())
}

/// Scales `logo` to a tenth of the base width and alpha-blends it in.
pub fn overlay_logo(base: RgbImage, logo: &RgbaImage) -> RgbImage {
    let (base_w, base_h) = base.dimensions();
    let Some((logo_w, logo_h)) = logo_dimensions(base_w, logo.dimensions()) else {
        tracing::debug!(base_w, "base too small for a logo, skipping branding");
        return base;
    };

    let scaled = imageops::resize(logo, logo_w, logo_h, FilterType::Lanczos3);
    let x = base_w as i64 - logo_w as i64 - LOGO_INSET;
    let y = base_h as i64 - logo_h as i64 - LOGO_INSET;

    let mut canvas = DynamicImage::ImageRgb8(base).into_rgba8();
    imageops::overlay(&mut canvas, &scaled, x, y);
    DynamicImage::ImageRgba8(canvas).into_rgb8()
}

/// Target logo size, or `None` if it would collapse to zero pixels.
fn logo_dimensions(base_w: u32, (logo_w, logo_h): (u32, u32)) -> Option<(u32, u32)> {
    let width = base_w / LOGO_WIDTH_DIVISOR;
    if width == 0 || logo_w == 0 || logo_h == 0 {
        return None;
    }
    let height = (logo_h as f64 * width as f64 / logo_w as f64).round() as u32;
    Some((width, height.max(1)))
}
