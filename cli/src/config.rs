//! Configuration management for the facewatch command.
//!
//! Configuration is read from a YAML file (default `config.yaml` in the
//! working directory). A missing file means all defaults.

use std::path::{Path, PathBuf};

use facewatch_gallery::{DetectionModel, DetectorOptions};
use serde::{Deserialize, Serialize};

use crate::paths::expand_home;

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// facewatch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum descriptor distance accepted as a match.
    pub tolerance: f32,

    /// Directory scanned for enrollment images.
    pub faces_dir: PathBuf,

    /// Directory holding descriptor records. Defaults to `faces_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,

    /// Fixed descriptor length. Learned from the first record when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Run detection on every n-th frame.
    pub process_every_n_frames: usize,

    /// Index of the capture device for live sources.
    pub camera_index: u32,

    /// Frames are resized by this factor before detection, in `(0, 1]`.
    pub scale: f32,

    /// `hog` (fast) or `cnn` (precise).
    pub detection_model: DetectionModel,

    /// Extra upsampling passes when looking for small faces.
    pub upsample_times: u32,

    /// Where classification results go.
    pub notify: NotifyConfig,
}

/// Notification targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Print one line per result to stdout.
    pub console: bool,

    /// POST each result as JSON to this URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: 0.6,
            faces_dir: PathBuf::from("faces"),
            store_dir: None,
            dimension: None,
            process_every_n_frames: 2,
            camera_index: 0,
            scale: 0.25,
            detection_model: DetectionModel::Hog,
            upsample_times: 0,
            notify: NotifyConfig::default(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            console: true,
            webhook: None,
        }
    }
}

impl Config {
    /// Returns the enrollment image directory with `~` expanded.
    pub fn faces_dir(&self) -> PathBuf {
        expand_home(&self.faces_dir)
    }

    /// Returns the record directory with `~` expanded.
    pub fn store_dir(&self) -> PathBuf {
        match &self.store_dir {
            Some(dir) => expand_home(dir),
            None => self.faces_dir(),
        }
    }

    /// Returns the options handed to the face detector.
    pub fn detector_options(&self) -> DetectorOptions {
        DetectorOptions {
            model: self.detection_model,
            upsample_times: self.upsample_times,
            scale: self.scale,
        }
    }

    /// Rejects values that would make the core fail later.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            anyhow::bail!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            );
        }
        if self.process_every_n_frames == 0 {
            anyhow::bail!("process_every_n_frames must be at least 1");
        }
        if self.dimension == Some(0) {
            anyhow::bail!("dimension must be positive");
        }
        self.detector_options().validate()?;
        if let Some(raw) = &self.notify.webhook {
            let url = url::Url::parse(raw)
                .map_err(|e| anyhow::anyhow!("notify.webhook {:?}: {}", raw, e))?;
            if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
                anyhow::bail!("notify.webhook must be an http(s) URL, got {:?}", raw);
            }
        }
        Ok(())
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Loads and validates configuration from `custom_path`, or from
/// [`DEFAULT_CONFIG_FILE`] when `None`. A missing file yields defaults.
pub fn load_config(custom_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = custom_path
        .map(expand_home)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let cfg = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("parse {}: {}", path.display(), e))?
        }
    } else {
        Config::default()
    };

    cfg.validate()?;
    Ok(cfg)
}
