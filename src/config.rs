//! Configuration model.
//!
//! A single JSON document with `api`, `brand`, `image_variants`, `storage`
//! and `notification` sections. [`Config::load`] parses and validates it;
//! once loaded the value is never mutated and is passed by reference to each
//! pipeline stage.

use crate::error::{Error, Result};
use crate::image::{ImageFormat, ImageProviderKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default bound on a single provider call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Full pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider selection and credentials.
    #[serde(default)]
    pub api: ApiConfig,
    /// Brand identity.
    pub brand: BrandConfig,
    /// Output format and sizes.
    pub image_variants: VariantsConfig,
    /// Output location.
    pub storage: StorageConfig,
    /// Completion notifications.
    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Base image provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Which provider produces base images.
    #[serde(default)]
    pub provider: ImageProviderKind,
    /// API key; the `GEMINI_API_KEY` environment variable takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    /// Model id override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Upper bound on one provider call, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            provider: ImageProviderKind::default(),
            gemini_api_key: None,
            model: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    /// Provider call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolves the Gemini key: environment first, then this config.
    ///
    /// Placeholder values left by `init` are treated as unset.
    pub fn resolve_gemini_key(&self) -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .or_else(|| self.gemini_api_key.clone())
            .filter(|k| !k.trim().is_empty() && !k.starts_with("YOUR_"))
    }
}

/// Brand identity applied to every generated image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    /// Display name, used in notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Palette as hex strings, primary color first.
    pub colors: Vec<String>,
    /// Free-form style keywords appended to prompts.
    #[serde(default)]
    pub style_keywords: String,
    /// Logo composited onto each image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<PathBuf>,
}

/// One named output size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSpec {
    /// Directory and filename component; unique within a config.
    pub name: String,
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Free-form note on where the variant is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VariantSpec {
    /// Creates a spec without a description.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            description: None,
        }
    }

    /// `"WxH"` label.
    pub fn size_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Output format and the ordered list of sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantsConfig {
    /// Encoding used for every variant.
    #[serde(default)]
    pub format: ImageFormat,
    /// Sizes in export order.
    pub sizes: Vec<VariantSpec>,
}

/// Where variants are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the `{variant}/{file}` tree.
    pub output_directory: PathBuf,
}

impl StorageConfig {
    /// Directory holding every file of one variant.
    pub fn variant_dir(&self, variant: &str) -> PathBuf {
        self.output_directory.join(variant)
    }
}

/// Completion notification settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Whether to notify at all.
    #[serde(default)]
    pub enabled: bool,
    /// Webhook endpoint; the console is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl NotificationConfig {
    /// Webhook URL, with empty strings treated as unset.
    pub fn webhook(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        let size = |name: &str, width, height, description: &str| VariantSpec {
            name: name.to_string(),
            width,
            height,
            description: Some(description.to_string()),
        };

        Self {
            api: ApiConfig::default(),
            brand: BrandConfig {
                name: Some("TechBrand Inc.".to_string()),
                colors: vec![
                    "#0066CC".to_string(),
                    "#00A3E0".to_string(),
                    "#FFFFFF".to_string(),
                ],
                style_keywords: "modern, clean, professional, minimalist".to_string(),
                logo_path: Some(PathBuf::from("assets/logo.png")),
            },
            image_variants: VariantsConfig {
                format: ImageFormat::Jpeg,
                sizes: vec![
                    size("social_square", 1080, 1080, "Instagram/Facebook square post"),
                    size("social_story", 1080, 1920, "Instagram/Facebook story"),
                    size("web_banner", 1920, 1080, "Website banner/hero image"),
                    size("email_header", 600, 200, "Email header image"),
                    size("thumbnail", 400, 400, "Thumbnail/preview"),
                ],
            },
            storage: StorageConfig {
                output_directory: PathBuf::from("generated_images"),
            },
            notification: NotificationConfig {
                enabled: true,
                webhook_url: None,
            },
        }
    }
}

impl Config {
    /// Loads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates a config document.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!("failed to write {}: {}", path.display(), e))
        })
    }

    /// Checks every invariant the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        if self.brand.colors.is_empty() {
            return Err(Error::Config("brand.colors must list at least one color".into()));
        }
        for color in &self.brand.colors {
            if parse_hex_color(color).is_none() {
                return Err(Error::Config(format!(
                    "brand.colors: '{}' is not a hex color",
                    color
                )));
            }
        }

        if self.image_variants.sizes.is_empty() {
            return Err(Error::Config(
                "image_variants.sizes must list at least one size".into(),
            ));
        }
        let mut seen = HashSet::new();
        for spec in &self.image_variants.sizes {
            validate_variant_name(&spec.name)?;
            if spec.width == 0 || spec.height == 0 {
                return Err(Error::Config(format!(
                    "variant '{}' must have positive width and height",
                    spec.name
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate variant name '{}'",
                    spec.name
                )));
            }
        }

        if self.storage.output_directory.as_os_str().is_empty() {
            return Err(Error::Config("storage.output_directory is empty".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Config("api.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Variant names become a directory segment and part of every filename.
fn validate_variant_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Config("variant name must not be empty".into()));
    }
    if name == "." || name == ".." || name.contains(|c| c == '/' || c == '\\') {
        return Err(Error::Config(format!(
            "variant name '{}' must be a single path segment",
            name
        )));
    }
    Ok(())
}

/// Parses `#RGB` or `#RRGGBB` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Option<image::Rgb<u8>> {
    let hex = s.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(image::Rgb(rgb))
        }
        6 => {
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(image::Rgb([channel(0)?, channel(2)?, channel(4)?]))
        }
        _ => None,
    }
}
