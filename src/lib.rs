#![warn(missing_docs)]
//! brandgen - Batch branded image generation.
//!
//! Turns text prompts into on-brand marketing images: each prompt is
//! enhanced with the brand's style and palette, rendered by a base image
//! provider, stamped with the brand logo, and exported at every configured
//! size.
//!
//! # Quick Start
//!
//! ```no_run
//! use brandgen::{Config, Pipeline, PromptJob};
//!
//! #[tokio::main]
//! async fn main() -> brandgen::Result<()> {
//!     let config = Config::load("config.json")?;
//!     let pipeline = Pipeline::from_config(config)?;
//!
//!     let report = pipeline
//!         .run(&[PromptJob::new("Summer sale with beach vibes").with_name("summer_sale")])
//!         .await;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! # Providers
//!
//! - `placeholder` (always available): deterministic offline renderer
//! - `gemini` (feature `gemini-image`): Gemini image models (Google)
//!
//! # Features
//!
//! - `gemini-image`: Gemini provider
//! - `cli`: `brandgen` command-line interface

mod error;

pub mod config;
pub mod compositor;
pub mod export;
pub mod image;
pub mod notify;
pub mod pipeline;
pub mod prompt;
pub mod scaffold;

// Re-export error types at crate root
pub use error::{Error, GenerationError, Result};

pub use config::{
    ApiConfig, BrandConfig, Config, NotificationConfig, StorageConfig, VariantSpec,
    VariantsConfig,
};
pub use compositor::apply_branding;
pub use export::{export_variants, VariantResult};
pub use crate::image::providers::{PlaceholderProvider, PlaceholderProviderBuilder};
pub use crate::image::{GeneratedImage, GenerationRequest, ImageFormat, ImageProvider, ImageProviderKind};
pub use notify::{ConsoleNotifier, Notifier, WebhookNotifier};
pub use pipeline::{BatchReport, GenerationResult, Pipeline, PromptJob, PromptOutcome};
pub use prompt::enhance_prompt;

#[cfg(feature = "gemini-image")]
pub use crate::image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::image::{GeneratedImage, GenerationRequest, ImageProvider};
    pub use crate::pipeline::{GenerationResult, Pipeline, PromptJob};

    #[cfg(feature = "gemini-image")]
    pub use crate::image::providers::GeminiProvider;

    pub use crate::image::providers::PlaceholderProvider;
}
