use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{RosetteError, Result};
use crate::image_io::split_file_name;

/// Metadata kept next to a preprocessed model input
///
/// `resize_ratio` is the factor needed to bring a predicted mask back to the
/// size of the original image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub filename: String,
    pub format: String,
    pub height: u32,
    pub width: u32,
    pub resize_ratio: f64,
}

impl SampleMetadata {
    pub fn new(file_name: &str, height: u32, width: u32, resize_ratio: f64) -> Self {
        let (filename, format) = split_file_name(file_name);
        Self {
            filename: filename.to_string(),
            format: format.to_string(),
            height,
            width,
            resize_ratio,
        }
    }

    /// Sidecar location for a sample inside `dir`
    pub fn sidecar_path<P: AsRef<Path>>(&self, dir: P) -> PathBuf {
        dir.as_ref().join(format!("{}.json", self.filename))
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let metadata: Self = serde_json::from_str(&content)?;

        if !(metadata.resize_ratio.is_finite() && metadata.resize_ratio > 0.0) {
            return Err(RosetteError::Other(format!(
                "invalid resize ratio {} in {}",
                metadata.resize_ratio,
                path.display()
            )));
        }

        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_reads_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = SampleMetadata::new("plant_01.jpeg", 2000, 3000, 2.5);
        assert_eq!(metadata.filename, "plant_01");
        assert_eq!(metadata.format, "jpeg");

        let path = metadata.sidecar_path(dir.path());
        metadata.write_json(&path).unwrap();

        assert_eq!(SampleMetadata::read_json(&path).unwrap(), metadata);
    }

    #[test]
    fn rejects_zero_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(
            &path,
            r#"{"filename":"a","format":"png","height":1,"width":1,"resize_ratio":0.0}"#,
        )
        .unwrap();

        assert!(SampleMetadata::read_json(&path).is_err());
    }
}
