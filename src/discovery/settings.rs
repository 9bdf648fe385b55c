//! Tool settings (gridslice.yaml) parsing.
//!
//! Settings hold export defaults that are not part of any one map:
//! target DPI, JPEG quality, the crop heuristic and output location.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::geometry::{CropThreshold, DEFAULT_CROP_THRESHOLD};

/// Settings loaded from gridslice.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// DPI exported tiles are rendered at.
    pub export_dpi: Option<f64>,

    /// JPEG quality, 1-100.
    pub jpeg_quality: Option<u8>,

    /// Leftover fraction of a cell at which a slice counts as cropped.
    pub crop_threshold: Option<f64>,

    /// Output directory for exports.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Draw the coloured reference frame on exports.
    pub reference_lines: Option<bool>,

    /// Draw the name/scale badge on exports.
    pub badge: Option<bool>,

    /// File name for multi-slice bundles (default: `{map name}.zip`).
    pub zip_name: Option<String>,
}

pub const DEFAULT_EXPORT_DPI: f64 = 300.0;
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

fn default_output() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            export_dpi: None,
            jpeg_quality: None,
            crop_threshold: None,
            output: default_output(),
            reference_lines: None,
            badge: None,
            zip_name: None,
        }
    }
}

impl Settings {
    /// Load settings from a gridslice.yaml file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| GridError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read settings: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse settings from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| GridError::Parse {
            message: format!("Invalid settings: {}", e),
            help: Some("Check gridslice.yaml syntax".to_string()),
        })
    }

    pub fn effective_export_dpi(&self) -> f64 {
        self.export_dpi
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(DEFAULT_EXPORT_DPI)
    }

    pub fn effective_jpeg_quality(&self) -> u8 {
        self.jpeg_quality
            .unwrap_or(DEFAULT_JPEG_QUALITY)
            .clamp(1, 100)
    }

    pub fn effective_crop_threshold(&self) -> CropThreshold {
        CropThreshold::new(self.crop_threshold.unwrap_or(DEFAULT_CROP_THRESHOLD))
    }

    /// Reference lines follow the map's own flag unless settings force them.
    pub fn effective_reference_lines(&self, map_flag: bool) -> bool {
        self.reference_lines.unwrap_or(map_flag)
    }

    pub fn effective_badge(&self, map_flag: bool) -> bool {
        self.badge.unwrap_or(map_flag)
    }
}
