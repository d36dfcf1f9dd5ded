//! Core types for base image generation.

use serde::{Deserialize, Serialize};

/// Edge length of the square base image every provider returns.
pub const CANONICAL_SIZE: u32 = 1024;

/// Output formats supported by the variant exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    /// JPEG format (lossy, written at a fixed quality).
    #[default]
    #[serde(rename = "jpg", alias = "jpeg", alias = "JPG", alias = "JPEG")]
    Jpeg,
    /// PNG format (lossless).
    #[serde(rename = "png", alias = "PNG")]
    Png,
    /// WebP format (written lossless).
    #[serde(rename = "webp", alias = "WEBP")]
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }

    /// Whether the encoder takes a lossy quality setting.
    pub fn supports_quality(&self) -> bool {
        matches!(self, Self::Jpeg)
    }

    /// Maps to the `image` crate's format enum.
    pub fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
            Self::WebP => image::ImageFormat::WebP,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Image provider kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageProviderKind {
    /// Deterministic offline renderer.
    #[default]
    Placeholder,
    /// Google Gemini image models.
    Gemini,
}

impl std::fmt::Display for ImageProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Placeholder => write!(f, "placeholder"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// Metadata about the generation process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation, if any.
    pub model: Option<String>,
    /// Generation duration in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A request to generate a base image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The enhanced prompt describing the desired image.
    pub prompt: String,
}

impl GenerationRequest {
    /// Creates a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
        }
    }
}

/// A decoded base image with provenance.
///
/// The pixel buffer is opaque RGB at [`CANONICAL_SIZE`] and is handed on by
/// value; nothing downstream keeps a reference to it.
#[derive(Debug, Clone)]
#[must_use = "generated image should be branded and exported"]
pub struct GeneratedImage {
    /// Decoded pixels.
    pub image: image::RgbImage,
    /// Provider that produced this image.
    pub provider: ImageProviderKind,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Creates a new generated image.
    pub fn new(
        image: image::RgbImage,
        provider: ImageProviderKind,
        metadata: GenerationMetadata,
    ) -> Self {
        Self {
            image,
            provider,
            metadata,
        }
    }

    /// True when the image came from the offline renderer, not a model.
    pub fn is_placeholder(&self) -> bool {
        self.provider == ImageProviderKind::Placeholder
    }

    /// Pixel dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Releases the pixel buffer.
    pub fn into_image(self) -> image::RgbImage {
        self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 12] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_MAGIC: [u8; 12] = [0xFF, 0xD8, 0xFF, 0xE0, 0, 0, 0, 0, 0, 0, 0, 0];
    const WEBP_MAGIC: [u8; 12] = *b"RIFF\x00\x00\x00\x00WEBP";

    #[test]
    fn test_format_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&PNG_MAGIC),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&JPEG_MAGIC),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&WEBP_MAGIC),
            Some(ImageFormat::WebP)
        );
        assert_eq!(ImageFormat::from_magic_bytes(&[0x89, 0x50]), None);
    }

    #[test]
    fn test_format_deserializes_config_spellings() {
        let jpg: ImageFormat = serde_json::from_str("\"jpg\"").unwrap();
        let jpeg: ImageFormat = serde_json::from_str("\"jpeg\"").unwrap();
        assert_eq!(jpg, ImageFormat::Jpeg);
        assert_eq!(jpeg, ImageFormat::Jpeg);
        assert_eq!(serde_json::to_string(&ImageFormat::Jpeg).unwrap(), "\"jpg\"");
        assert!(serde_json::from_str::<ImageFormat>("\"tiff\"").is_err());
    }

    #[test]
    fn test_only_jpeg_takes_quality() {
        assert!(ImageFormat::Jpeg.supports_quality());
        assert!(!ImageFormat::Png.supports_quality());
        assert!(!ImageFormat::WebP.supports_quality());
    }

    #[test]
    fn test_provider_kind_display() {
        assert_eq!(ImageProviderKind::Gemini.to_string(), "gemini");
        assert_eq!(ImageProviderKind::Placeholder.to_string(), "placeholder");
    }

    #[test]
    fn test_placeholder_flag() {
        let img = image::RgbImage::new(4, 4);
        let placeholder = GeneratedImage::new(
            img.clone(),
            ImageProviderKind::Placeholder,
            GenerationMetadata::default(),
        );
        let model = GeneratedImage::new(img, ImageProviderKind::Gemini, GenerationMetadata::default());
        assert!(placeholder.is_placeholder());
        assert!(!model.is_placeholder());
        assert_eq!(model.dimensions(), (4, 4));
    }
}
