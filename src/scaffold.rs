//! Project scaffolding: starter config, directory tree and placeholder logo.

use crate::config::{parse_hex_color, Config};
use crate::error::{Error, Result};
use crate::export::prepare_output_dirs;
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};

/// Config file name written by [`init`].
pub const CONFIG_FILE: &str = "config.json";

const LOGO_SIZE: u32 = 200;
const LOGO_MARGIN: u32 = 20;

/// What [`init`] did.
#[derive(Debug, Clone, Default)]
pub struct InitReport {
    /// Config written, or `None` if an existing one was kept.
    pub config_written: Option<PathBuf>,
    /// Logo drawn, or `None` if one already existed or none is configured.
    pub logo_written: Option<PathBuf>,
    /// Output root that now exists.
    pub output_directory: PathBuf,
}

/// Sets up a working directory under `root`.
///
/// An existing `config.json` is kept unless `force` is set; its contents
/// then drive the directory tree and logo location.
pub fn init(root: &Path, force: bool) -> Result<InitReport> {
    let config_path = root.join(CONFIG_FILE);
    let mut report = InitReport::default();

    let config = if config_path.exists() && !force {
        tracing::info!(path = %config_path.display(), "keeping existing config");
        Config::load(&config_path)?
    } else {
        let config = Config::default();
        config.save(&config_path)?;
        tracing::info!(path = %config_path.display(), "wrote starter config");
        report.config_written = Some(config_path);
        config
    };

    let mut storage = config.storage.clone();
    storage.output_directory = root.join(&storage.output_directory);
    prepare_output_dirs(&storage, &config.image_variants)?;
    report.output_directory = storage.output_directory;

    if let Some(ref logo) = config.brand.logo_path {
        let logo_path = root.join(logo);
        if logo_path.exists() {
            tracing::info!(path = %logo_path.display(), "logo already exists");
        } else {
            let color = config
                .brand
                .colors
                .first()
                .and_then(|c| parse_hex_color(c))
                .map(|rgb| Rgba([rgb[0], rgb[1], rgb[2], 255]))
                .unwrap_or(Rgba([0, 102, 204, 255]));
            write_placeholder_logo(&logo_path, color)?;
            report.logo_written = Some(logo_path);
        }
    }

    Ok(report)
}

/// Draws a filled circle on a transparent square and saves it as PNG.
pub fn write_placeholder_logo(path: &Path, color: Rgba<u8>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::export_io(parent, e))?;
    }

    let center = LOGO_SIZE as f32 / 2.0;
    let radius = center - LOGO_MARGIN as f32;
    let logo = RgbaImage::from_fn(LOGO_SIZE, LOGO_SIZE, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        if dx * dx + dy * dy <= radius * radius {
            color
        } else {
            Rgba([color[0], color[1], color[2], 0])
        }
    });

    logo.save_with_format(path, image::ImageFormat::Png)
        .map_err(|source| Error::Export {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::info!(path = %path.display(), "created placeholder logo");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_everything() {
        let dir = tempfile::tempdir().unwrap();
        let report = init(dir.path(), false).unwrap();

        assert_eq!(report.config_written, Some(dir.path().join(CONFIG_FILE)));
        let config = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        for spec in &config.image_variants.sizes {
            assert!(report.output_directory.join(&spec.name).is_dir());
        }

        let logo_path = report.logo_written.unwrap();
        let logo = image::open(&logo_path).unwrap().to_rgba8();
        assert_eq!(logo.dimensions(), (LOGO_SIZE, LOGO_SIZE));
        assert_eq!(logo.get_pixel(0, 0)[3], 0);
        assert_eq!(*logo.get_pixel(100, 100), Rgba([0x00, 0x66, 0xCC, 255]));
    }

    #[test]
    fn test_init_keeps_existing_files_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let mut custom = Config::default();
        custom.brand.style_keywords = "retro".into();
        custom.save(dir.path().join(CONFIG_FILE)).unwrap();

        let report = init(dir.path(), false).unwrap();
        assert!(report.config_written.is_none());
        let kept = Config::load(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(kept.brand.style_keywords, "retro");

        let again = init(dir.path(), false).unwrap();
        assert!(again.logo_written.is_none());
    }

    #[test]
    fn test_init_force_overwrites_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();

        assert!(init(dir.path(), false).unwrap_err().is_fatal());
        let report = init(dir.path(), true).unwrap();
        assert!(report.config_written.is_some());
        Config::load(dir.path().join(CONFIG_FILE)).unwrap();
    }
}
