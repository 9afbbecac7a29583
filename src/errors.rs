use thiserror::Error;
use std::io;
use std::path::PathBuf;

/// Custom error types for rosette trait extraction
#[derive(Error, Debug)]
pub enum RosetteError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load configuration from {path}: {source}")]
    ConfigLoad {
        source: toml::de::Error,
        path: PathBuf,
    },

    #[error("CSV output error: {0}")]
    CsvOutput(#[from] csv::Error),

    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mask {file} appears to contain color channels, only grayscale masks are supported")]
    ColorMask { file: String },

    #[error("Could not process image {file}: image is {image:?} but mask is {mask:?}, dimensions have to match")]
    DimensionMismatch {
        file: String,
        image: (u32, u32),
        mask: (u32, u32),
    },

    #[error("Preprocessing error: {0}")]
    Preprocess(String),

    #[error("Colormap error: {0}")]
    Colormap(String),

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),

    #[error("Unexpected error: {0}")]
    Other(String),
}

/// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, RosetteError>;
