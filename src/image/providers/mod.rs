//! Base image providers.

#[cfg(feature = "gemini-image")]
mod gemini;
mod placeholder;

#[cfg(feature = "gemini-image")]
pub use gemini::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

pub use placeholder::{PlaceholderProvider, PlaceholderProviderBuilder};
