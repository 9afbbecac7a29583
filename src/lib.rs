// src/lib.rs - Library interface for rosette trait extraction

pub mod color_analysis;
pub mod colormap;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod image_io;
pub mod image_utils;
pub mod label_mask;
pub mod logger;
pub mod morphology;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod record;
pub mod shape_analysis;
pub mod trait_extraction;

// Re-export commonly used types and functions
pub use errors::{RosetteError, Result};
pub use config::{Config, LabelClass, ColormapChoice, PreprocessConfig};
pub use pipeline::{process_all, process_pair, prepare_all, prepare_image, BatchSummary, PreparedSample};
pub use image_io::{InputImage, MaskPair, load_image, load_mask, save_image};
pub use output::{TraitRecord, TraitValue, append_traits_csv};

// Re-export trait measurement
pub use trait_extraction::measure_traits;
pub use shape_analysis::{region_properties, calculate_perimeter, RegionProperties};
pub use color_analysis::{calculate_color_indices, split_channels, ColorIndices};
pub use label_mask::{create_bool_mask, MaskSelector, PLANT_REGION};

// Re-export diagnostics
pub use diagnostics::{draw_diagnostics, DiagnosticOptions};
pub use colormap::Colormap;

// Re-export model input preparation
pub use preprocess::{
    crop,
    get_label_resize_method,
    pad_to_bounding_box,
    preprocess_image,
    resize_to_range,
    ResizeMethod,
    ResizeRange,
};
pub use record::SampleMetadata;
