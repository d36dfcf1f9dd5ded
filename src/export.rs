//! Multi-size variant export.

use crate::config::{StorageConfig, VariantSpec, VariantsConfig};
use crate::error::{Error, Result};
use crate::image::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// JPEG quality for every exported variant.
pub const JPEG_QUALITY: u8 = 95;

/// Filename timestamp layout, shared by every variant of one prompt.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One exported file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantResult {
    /// Variant name from the config.
    pub name: String,
    /// `"WxH"`.
    pub size: String,
    /// Absolute path of the written file.
    pub path: PathBuf,
    /// `file://` URI of `path`.
    pub url: String,
}

/// Creates the output root and one directory per variant.
pub fn prepare_output_dirs(storage: &StorageConfig, variants: &VariantsConfig) -> Result<()> {
    for spec in &variants.sizes {
        let dir = storage.variant_dir(&spec.name);
        std::fs::create_dir_all(&dir).map_err(|e| Error::export_io(&dir, e))?;
    }
    tracing::debug!(
        dir = %storage.output_directory.display(),
        variants = variants.sizes.len(),
        "output directories ready"
    );
    Ok(())
}

/// Resizes `branded` to every configured size and writes each to disk.
///
/// All files share one timestamp captured at the start of the call. The
/// first failure aborts the call; files already written are left in place.
pub fn export_variants(
    branded: RgbImage,
    prompt_name: &str,
    variants: &VariantsConfig,
    storage: &StorageConfig,
) -> Result<Vec<VariantResult>> {
    let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
    export_variants_at(&branded, prompt_name, &timestamp, variants, storage)
}

pub(crate) fn export_variants_at(
    branded: &RgbImage,
    prompt_name: &str,
    timestamp: &str,
    variants: &VariantsConfig,
    storage: &StorageConfig,
) -> Result<Vec<VariantResult>> {
    let format = variants.format;
    let mut results = Vec::with_capacity(variants.sizes.len());

    for spec in &variants.sizes {
        let filename = variant_filename(prompt_name, &spec.name, timestamp, format);
        let path = storage.variant_dir(&spec.name).join(filename);

        let resized = imageops::resize(branded, spec.width, spec.height, FilterType::Lanczos3);
        write_image(&resized, &path, format)?;

        let absolute = std::fs::canonicalize(&path).map_err(|e| Error::export_io(&path, e))?;
        tracing::info!(variant = %spec.name, path = %absolute.display(), "saved variant");
        results.push(variant_result(spec, absolute));
    }

    Ok(results)
}

/// `{prompt}_{variant}_{timestamp}.{ext}`
pub fn variant_filename(
    prompt_name: &str,
    variant: &str,
    timestamp: &str,
    format: ImageFormat,
) -> String {
    format!(
        "{}_{}_{}.{}",
        prompt_name,
        variant,
        timestamp,
        format.extension()
    )
}

fn variant_result(spec: &VariantSpec, absolute: PathBuf) -> VariantResult {
    VariantResult {
        name: spec.name.clone(),
        size: spec.size_label(),
        url: file_uri(&absolute),
        path: absolute,
    }
}

/// `file://` URI for an absolute path.
pub fn file_uri(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    if s.starts_with('/') {
        format!("file://{}", s)
    } else {
        format!("file:///{}", s)
    }
}

fn write_image(img: &RgbImage, path: &Path, format: ImageFormat) -> Result<()> {
    let to_export = |source| Error::Export {
        path: path.to_path_buf(),
        source,
    };

    if format.supports_quality() {
        let file = File::create(path).map_err(|e| Error::export_io(path, e))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
            .encode_image(img)
            .map_err(to_export)?;
        std::io::Write::flush(&mut writer).map_err(|e| Error::export_io(path, e))?;
        Ok(())
    } else {
        img.save_with_format(path, format.to_image_format())
            .map_err(to_export)
    }
}
