use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub device_index: i32,
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_detection_scale")]
    pub detection_scale: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_gallery_dir")]
    pub gallery_dir: PathBuf,
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    #[serde(default)]
    pub label_font: Option<PathBuf>,
}

fn default_frame_interval_ms() -> u64 { 30 }
fn default_stop_timeout_ms() -> u64 { 1000 }
fn default_tolerance() -> f64 { crate::matcher::DEFAULT_TOLERANCE }
fn default_detection_scale() -> f64 { 0.5 }
fn default_true() -> bool { true }
fn default_gallery_dir() -> PathBuf { PathBuf::from("known_faces") }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            frame_interval_ms: default_frame_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            detection_scale: default_detection_scale(),
            enabled: default_true(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            gallery_dir: default_gallery_dir(),
            models_dir: None,
            label_font: None,
        }
    }
}

impl CameraConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl AppConfig {
    /// `<config_dir>/facereco/config.json`, falling back to the working directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("facereco").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("facereco.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&content)?;
            log::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}
