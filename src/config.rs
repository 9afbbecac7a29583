// src/config.rs - Run configuration for trait extraction and preprocessing

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{RosetteError, Result};

/// Configuration for a trait extraction run
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Directory holding the original RGB images
    pub images_dir: String,
    /// Directory holding the predicted label masks
    pub masks_dir: String,
    pub output_dir: String,

    #[serde(default = "default_traits_file")]
    pub traits_file: String,

    /// Label classes in output order
    #[serde(default = "default_labels")]
    pub labels: Vec<LabelClass>,

    /// Pixel value excluded from the plant region
    #[serde(default)]
    pub ignore_label: Option<u8>,

    /// Factor by which predicted masks were downscaled relative to the originals
    #[serde(default = "default_scale_ratio")]
    pub scale_ratio: f64,

    // Diagnostics
    #[serde(default = "default_true")]
    pub save_rosette: bool,

    #[serde(default = "default_true")]
    pub save_overlay: bool,

    #[serde(default = "default_true")]
    pub save_mask: bool,

    #[serde(default = "default_true")]
    pub save_hull: bool,

    #[serde(default)]
    pub colormap: ColormapChoice,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

/// A named label class and its grayscale pixel value in the mask
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LabelClass {
    pub name: String,
    pub value: u8,
}

impl LabelClass {
    pub fn new(name: &str, value: u8) -> Self {
        Self { name: name.to_string(), value }
    }
}

/// Colormap used for diagnostic images
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColormapChoice {
    /// Black background followed by three viridis-like class colors
    #[default]
    Default,
    /// PASCAL VOC bit-interleaved colormap
    Pascal,
    /// Explicit list of RGB colors, indexed by label
    Custom(Vec<[u8; 3]>),
}

/// Model input preparation parameters
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PreprocessConfig {
    #[serde(default = "default_crop_size")]
    pub crop_height: u32,

    #[serde(default = "default_crop_size")]
    pub crop_width: u32,

    #[serde(default)]
    pub min_resize_value: Option<u32>,

    #[serde(default)]
    pub max_resize_value: Option<u32>,

    #[serde(default)]
    pub resize_factor: Option<u32>,

    #[serde(default = "default_pad_value")]
    pub pad_value: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            crop_height: default_crop_size(),
            crop_width: default_crop_size(),
            min_resize_value: None,
            max_resize_value: None,
            resize_factor: None,
            pad_value: default_pad_value(),
        }
    }
}

fn default_traits_file() -> String {
    "traits.csv".to_string()
}

fn default_labels() -> Vec<LabelClass> {
    vec![
        LabelClass::new("class_background", 0),
        LabelClass::new("class_norm", 1),
        LabelClass::new("class_senesc", 2),
        LabelClass::new("class_antho", 3),
    ]
}

fn default_scale_ratio() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_parallel() -> bool {
    true
}

fn default_crop_size() -> u32 {
    513
}

fn default_pad_value() -> f32 {
    127.5 // Mean pixel value
}

impl Default for Config {
    fn default() -> Self {
        Self {
            images_dir: "./original_images".to_string(),
            masks_dir: "./raw_masks".to_string(),
            output_dir: "./output".to_string(),
            traits_file: default_traits_file(),
            labels: default_labels(),
            ignore_label: None,
            scale_ratio: default_scale_ratio(),
            save_rosette: true,
            save_overlay: true,
            save_mask: true,
            save_hull: true,
            colormap: ColormapChoice::Default,
            use_parallel: true,
            preprocess: PreprocessConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RosetteError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| RosetteError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Validate parameters that do not depend on the filesystem
    pub fn validate(&self) -> Result<()> {
        if self.labels.is_empty() {
            return Err(RosetteError::Config("at least one label class is required".to_string()));
        }

        let mut names = HashSet::new();
        let mut values = HashSet::new();
        for label in &self.labels {
            if label.name.trim().is_empty() {
                return Err(RosetteError::Config("label names must not be empty".to_string()));
            }
            if !names.insert(label.name.as_str()) {
                return Err(RosetteError::Config(format!("duplicate label name '{}'", label.name)));
            }
            if !values.insert(label.value) {
                return Err(RosetteError::Config(format!("duplicate label value {}", label.value)));
            }
        }

        if !(self.scale_ratio.is_finite() && self.scale_ratio > 0.0) {
            return Err(RosetteError::Config("scale_ratio must be > 0.0".to_string()));
        }

        if let ColormapChoice::Custom(colors) = &self.colormap {
            if colors.is_empty() {
                return Err(RosetteError::Config("custom colormap must not be empty".to_string()));
            }
        }

        self.preprocess.validate()
    }

    /// Check that the input directories exist
    pub fn validate_paths(&self) -> Result<()> {
        for dir in [&self.images_dir, &self.masks_dir] {
            let path = PathBuf::from(dir);
            if !path.is_dir() {
                return Err(RosetteError::InvalidPath(path));
            }
        }
        Ok(())
    }

    /// Location of the appended traits table
    pub fn traits_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir).join(&self.traits_file)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            RosetteError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.crop_height == 0 || self.crop_width == 0 {
            return Err(RosetteError::Config("crop size must be > 0".to_string()));
        }

        if let (Some(min), Some(max)) = (self.min_resize_value, self.max_resize_value) {
            if min > max {
                return Err(RosetteError::Config(
                    "min_resize_value must be <= max_resize_value".to_string(),
                ));
            }
        }

        if matches!(self.min_resize_value, Some(0)) || matches!(self.max_resize_value, Some(0)) {
            return Err(RosetteError::Config("resize values must be > 0".to_string()));
        }

        if self.resize_factor == Some(0) {
            return Err(RosetteError::Config("resize_factor must be > 0".to_string()));
        }

        Ok(())
    }
}
