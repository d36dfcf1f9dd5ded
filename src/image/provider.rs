//! Base image provider trait.

use crate::error::GenerationError;
use crate::image::types::{GeneratedImage, GenerationRequest, ImageProviderKind};
use async_trait::async_trait;

/// Trait for base image providers.
///
/// One call produces one canonical-size RGB image. Providers make a single
/// attempt; the pipeline bounds the call with a timeout.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates a base image from the given request.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<GeneratedImage, GenerationError>;

    /// Returns the kind of this provider.
    fn kind(&self) -> ImageProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            ImageProviderKind::Placeholder => "Placeholder (offline)",
            ImageProviderKind::Gemini => "Gemini (Google)",
        }
    }

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> std::result::Result<(), GenerationError>;
}

/// Resamples a decoded image to the canonical square if it is not already.
#[cfg_attr(not(feature = "gemini-image"), allow(dead_code))]
pub(crate) fn to_canonical(image: image::RgbImage, size: u32) -> image::RgbImage {
    if image.dimensions() == (size, size) {
        return image;
    }
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        size,
        "resampling provider output to canonical size"
    );
    image::imageops::resize(&image, size, size, image::imageops::FilterType::Lanczos3)
}
