//! Pipeline configuration module.
//!
//! Handles loading, validating, and merging `iconsync.toml`. Stock defaults are
//! serialized to a TOML value and the user file (if any) is merged on top, so a
//! config file only needs the keys it wants to override.
//!
//! ## Config File Location
//!
//! `iconsync.toml` is read from the working directory, which is also the root
//! of the git working tree the pipeline publishes from:
//!
//! ```text
//! repo/
//! ├── iconsync.toml      # Optional, overrides stock defaults
//! ├── tubiao.json        # Published manifest
//! ├── uploaders.json     # Uploader records (written by the upload bot)
//! └── pic/               # Source directory
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! [images]
//! target_size = 512            # Canonical edge length in pixels
//! scale_factor = 4             # Upscale when an edge is < target_size × scale_factor
//! corner_radius_ratio = 0.18   # Rounded-corner radius as a fraction of target_size
//!
//! [upscaler]
//! binary = "realesrgan-ncnn-vulkan"
//! timeout_secs = 120
//!
//! [repository]
//! account = "Absurd-BC"
//! name = "icons"
//! branch = "main"
//! remote = "origin"
//! raw_base_url = "https://raw.githubusercontent.com"
//! web_base_url = "https://github.com"
//!
//! [manifest]
//! path = "tubiao.json"
//! uploaders_path = "uploaders.json"
//! title = "..."
//! description = "..."
//!
//! [notify]
//! enabled = true
//! dir = "/root/apps/telegram-bot"
//!
//! [processing]
//! max_processes = 1
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILENAME: &str = "iconsync.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full pipeline configuration.
///
/// All fields have defaults matching the production deployment; an absent
/// config file yields exactly [`PipelineConfig::default`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Canonical size and variant geometry.
    pub images: ImagesConfig,
    /// External super-resolution binary.
    pub upscaler: UpscalerConfig,
    /// Remote repository the assets are published to.
    pub repository: RepositoryConfig,
    /// Published manifest and uploader store locations.
    pub manifest: ManifestConfig,
    /// Drop-file notifications for the consumer process.
    pub notify: NotifyConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.target_size == 0 {
            return Err(ConfigError::Validation(
                "images.target_size must be non-zero".into(),
            ));
        }
        if self.images.scale_factor == 0 {
            return Err(ConfigError::Validation(
                "images.scale_factor must be at least 1".into(),
            ));
        }
        let ratio = self.images.corner_radius_ratio;
        if !(ratio > 0.0 && ratio <= 0.5) {
            return Err(ConfigError::Validation(
                "images.corner_radius_ratio must be in (0, 0.5]".into(),
            ));
        }
        if self.upscaler.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "upscaler.timeout_secs must be non-zero".into(),
            ));
        }
        let repo = &self.repository;
        for (key, value) in [
            ("repository.account", &repo.account),
            ("repository.name", &repo.name),
            ("repository.branch", &repo.branch),
            ("repository.remote", &repo.remote),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }
}

/// Canonical image geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Edge length of every canonical asset and variant.
    pub target_size: u32,
    /// Super-resolution factor passed to the upscaler.
    pub scale_factor: u32,
    /// Rounded-corner radius as a fraction of `target_size`.
    pub corner_radius_ratio: f64,
}

impl ImagesConfig {
    /// Corner radius in pixels, floored.
    pub fn corner_radius(&self) -> u32 {
        (self.target_size as f64 * self.corner_radius_ratio).floor() as u32
    }

    /// Minimum edge below which an image is sent to the upscaler.
    pub fn upscale_threshold(&self) -> u32 {
        self.target_size.saturating_mul(self.scale_factor)
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            target_size: 512,
            scale_factor: 4,
            corner_radius_ratio: 0.18,
        }
    }
}

/// External super-resolution binary settings.
///
/// The model identifier is not configured here: it comes from the second
/// positional CLI argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpscalerConfig {
    /// Path (or `$PATH` name) of the upscaler executable.
    pub binary: PathBuf,
    /// Hard timeout for one upscaler invocation.
    pub timeout_secs: u64,
}

impl UpscalerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpscalerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("realesrgan-ncnn-vulkan"),
            timeout_secs: 120,
        }
    }
}

/// Remote repository coordinates, used both for pushing and for URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    pub account: String,
    pub name: String,
    pub branch: String,
    pub remote: String,
    /// Base for raw-content URLs in the manifest.
    pub raw_base_url: String,
    /// Base for browsable URLs in notifications.
    pub web_base_url: String,
}

impl RepositoryConfig {
    /// Raw-content URL of a repository-relative path.
    pub fn raw_url(&self, rel_path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base_url.trim_end_matches('/'),
            self.account,
            self.name,
            self.branch,
            rel_path.trim_start_matches('/')
        )
    }

    /// Browsable (blob) URL of a repository-relative path.
    pub fn blob_url(&self, rel_path: &str) -> String {
        format!(
            "{}/{}/{}/blob/{}/{}",
            self.web_base_url.trim_end_matches('/'),
            self.account,
            self.name,
            self.branch,
            rel_path.trim_start_matches('/')
        )
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            account: "Absurd-BC".into(),
            name: "icons".into(),
            branch: "main".into(),
            remote: "origin".into(),
            raw_base_url: "https://raw.githubusercontent.com".into(),
            web_base_url: "https://github.com".into(),
        }
    }
}

/// Published manifest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    /// Manifest path relative to the working directory.
    pub path: PathBuf,
    /// Uploader store path relative to the working directory.
    pub uploaders_path: PathBuf,
    /// Manifest `name` field.
    pub title: String,
    /// Manifest `description` field.
    pub description: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tubiao.json"),
            uploaders_path: PathBuf::from("uploaders.json"),
            title: "Upscaled icon library".into(),
            description:
                "Automatically processed high-quality icon library with multiple style variants"
                    .into(),
        }
    }
}

/// Drop-file notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    pub enabled: bool,
    /// Directory owned by the consumer process.
    pub dir: PathBuf,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("/root/apps/telegram-bot"),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of assets transformed at once.
    /// Defaults to 1 (strictly sequential). `0` uses all CPU cores. Values
    /// larger than the core count are clamped down.
    pub max_processes: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: 1,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `0` → use all available cores
/// - `n` → use `min(n, cores)`
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    match config.max_processes {
        0 => cores,
        n => n.min(cores),
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PipelineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `iconsync.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PipelineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `iconsync.toml` in the given directory.
pub fn load_config(dir: &Path) -> Result<PipelineConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `iconsync.toml`.
pub fn stock_config_toml() -> &'static str {
    r##"# iconsync configuration
# ======================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Canonical geometry
# ---------------------------------------------------------------------------
[images]
# Every canonical asset and variant is target_size × target_size pixels.
target_size = 512

# Images with an edge shorter than target_size × scale_factor are sent to
# the upscaler first; the factor is also passed to it as `-s`.
scale_factor = 4

# Rounded-corner radius as a fraction of target_size.
corner_radius_ratio = 0.18

# ---------------------------------------------------------------------------
# Super-resolution
# ---------------------------------------------------------------------------
[upscaler]
binary = "realesrgan-ncnn-vulkan"

# A run that exceeds this is killed; the pipeline continues with the
# original image.
timeout_secs = 120

# ---------------------------------------------------------------------------
# Publishing
# ---------------------------------------------------------------------------
[repository]
account = "Absurd-BC"
name = "icons"
branch = "main"
remote = "origin"
raw_base_url = "https://raw.githubusercontent.com"
web_base_url = "https://github.com"

[manifest]
path = "tubiao.json"
uploaders_path = "uploaders.json"
title = "Upscaled icon library"
description = "Automatically processed high-quality icon library with multiple style variants"

# ---------------------------------------------------------------------------
# Notifications
# ---------------------------------------------------------------------------
[notify]
enabled = true
# Directory watched by the consumer process. A missing directory is
# logged and skipped.
dir = "/root/apps/telegram-bot"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Assets transformed in parallel. 1 keeps processing strictly sequential,
# 0 uses every CPU core.
max_processes = 1
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_geometry() {
        let config = PipelineConfig::default();
        assert_eq!(config.images.target_size, 512);
        assert_eq!(config.images.scale_factor, 4);
        assert_eq!(config.images.corner_radius(), 92);
        assert_eq!(config.images.upscale_threshold(), 2048);
    }

    #[test]
    fn default_upscaler_timeout_is_two_minutes() {
        let config = PipelineConfig::default();
        assert_eq!(config.upscaler.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[repository]
account = "someone"
"#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.repository.account, "someone");
        assert_eq!(config.repository.name, "icons");
        assert_eq!(config.images.target_size, 512);
    }

    // =========================================================================
    // URL helpers
    // =========================================================================

    #[test]
    fn raw_url_template() {
        let repo = RepositoryConfig::default();
        assert_eq!(
            repo.raw_url("pic/logo_radius.png"),
            "https://raw.githubusercontent.com/Absurd-BC/icons/main/pic/logo_radius.png"
        );
    }

    #[test]
    fn raw_url_tolerates_slashes() {
        let repo = RepositoryConfig {
            raw_base_url: "https://raw.example.com/".into(),
            ..RepositoryConfig::default()
        };
        assert_eq!(
            repo.raw_url("/tubiao.json"),
            "https://raw.example.com/Absurd-BC/icons/main/tubiao.json"
        );
    }

    #[test]
    fn blob_url_template() {
        let repo = RepositoryConfig::default();
        assert_eq!(
            repo.blob_url("tubiao.json"),
            "https://github.com/Absurd-BC/icons/blob/main/tubiao.json"
        );
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    #[test]
    fn effective_threads_default_is_sequential() {
        assert_eq!(effective_threads(&ProcessingConfig::default()), 1);
    }

    #[test]
    fn effective_threads_zero_means_all_cores() {
        let config = ProcessingConfig { max_processes: 0 };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_clamped() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_processes: 99999,
        };
        assert_eq!(effective_threads(&config), cores);
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[images]
target_size = 512
scale_factor = 4
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[images]
scale_factor = 2
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let images = merged.get("images").unwrap();
        assert_eq!(images.get("scale_factor").unwrap().as_integer(), Some(2));
        assert_eq!(images.get("target_size").unwrap().as_integer(), Some(512));
    }

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("a = 10").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("a").unwrap().as_integer(), Some(10));
        assert_eq!(merged.get("b").unwrap().as_integer(), Some(2));
    }

    // =========================================================================
    // Unknown keys and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<PipelineConfig, _> = toml::from_str("[images]\ntarget_sise = 256\n");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<PipelineConfig, _> = toml::from_str("[imagez]\ntarget_size = 256\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_default_config_passes() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_target() {
        let mut config = PipelineConfig::default();
        config.images.target_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn validate_rejects_radius_ratio_out_of_range() {
        let mut config = PipelineConfig::default();
        config.images.corner_radius_ratio = 0.75;
        assert!(config.validate().is_err());
        config.images.corner_radius_ratio = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_branch() {
        let mut config = PipelineConfig::default();
        config.repository.branch = " ".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("repository.branch"));
    }

    // =========================================================================
    // load_config
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.manifest.path, PathBuf::from("tubiao.json"));
        assert!(config.notify.enabled);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[notify]
enabled = false

[upscaler]
timeout_secs = 5
"#,
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert!(!config.notify.enabled);
        assert_eq!(config.upscaler.timeout_secs, 5);
        assert_eq!(config.repository.branch, "main");
    }

    #[test]
    fn load_config_zero_processes_uses_all_cores() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[processing]\nmax_processes = 0\n",
        )
        .unwrap();
        let config = load_config(tmp.path()).unwrap();
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config.processing), cores);
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            "[upscaler]\ntimeout_secs = 0\n",
        )
        .unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_surfaces_toml_errors() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[images\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: PipelineConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config.images.target_size, 512);
        assert_eq!(config.images.scale_factor, 4);
        assert_eq!(config.upscaler.timeout_secs, 120);
        assert_eq!(config.repository.account, "Absurd-BC");
        assert_eq!(config.processing.max_processes, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value();
        for section in [
            "images",
            "upscaler",
            "repository",
            "manifest",
            "notify",
            "processing",
        ] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
