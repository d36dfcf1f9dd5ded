//! Brand-aware prompt enhancement.

use crate::config::BrandConfig;

/// Quality qualifiers appended to every prompt.
pub const QUALITY_SUFFIX: &str = "professional marketing image, high quality, detailed";

/// Appends brand style, palette and quality qualifiers to a user prompt.
pub fn enhance_prompt(user_prompt: &str, brand: &BrandConfig) -> String {
    format!(
        "{}, {}, using colors: {}, {}",
        user_prompt,
        brand.style_keywords,
        brand.colors.join(", "),
        QUALITY_SUFFIX
    )
}
