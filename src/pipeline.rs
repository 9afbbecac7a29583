// src/pipeline.rs - Per-image driver for trait measurement and model input preparation

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::colormap::Colormap;
use crate::config::Config;
use crate::diagnostics::{draw_diagnostics, DiagnosticOptions};
use crate::errors::{RosetteError, Result};
use crate::image_io::{
    find_mask_pairs, get_image_files_in_dir, load_image, load_mask, save_image, InputImage, MaskPair,
};
use crate::image_utils::to_u8_image;
use crate::label_mask::LabelMask;
use crate::output::{append_traits_csv, TraitRecord};
use crate::preprocess::{preprocess_image, resize_ratio};
use crate::record::SampleMetadata;
use crate::trait_extraction::measure_traits;

/// Subdirectory of the preprocessing output holding the resized originals
pub const ORIGINALS_DIR: &str = "original_images";

/// Outcome of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Files written for one prepared image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSample {
    /// Padded model input, `{stem}.png` in the output directory
    pub model_input: PathBuf,
    /// Resized original to measure predicted masks against
    pub original: PathBuf,
    /// Metadata sidecar next to the resized original
    pub sidecar: PathBuf,
}

impl From<&Config> for DiagnosticOptions {
    fn from(config: &Config) -> Self {
        Self {
            save_rosette: config.save_rosette,
            save_overlay: config.save_overlay,
            save_mask: config.save_mask,
            save_hull: config.save_hull,
        }
    }
}

/// A pair after trait measurement, kept for drawing diagnostics
struct MeasuredPair {
    input: InputImage,
    mask: LabelMask,
    record: TraitRecord,
}

/// Ratio to apply to a mask
///
/// A sidecar next to the mask wins over one next to the image; without
/// either the configured ratio is used.
fn scale_ratio_for(pair: &MaskPair, config: &Config) -> Result<f64> {
    for sidecar in [pair.mask_path.with_extension("json"), pair.image_path.with_extension("json")] {
        if sidecar.is_file() {
            let metadata = SampleMetadata::read_json(&sidecar)?;
            debug!("Using resize ratio {} from {}", metadata.resize_ratio, sidecar.display());
            return Ok(metadata.resize_ratio);
        }
    }
    Ok(config.scale_ratio)
}

fn measure_pair(pair: &MaskPair, config: &Config) -> Result<MeasuredPair> {
    let input = load_image(&pair.image_path)?;
    let mask = load_mask(&pair.mask_path)?;
    let scale_ratio = scale_ratio_for(pair, config)?;

    let record = measure_traits(
        &mask,
        &input.image,
        scale_ratio,
        &input.file_name,
        config.ignore_label,
        &config.labels,
    )?;

    Ok(MeasuredPair { input, mask, record })
}

/// Draw diagnostics; failures are logged and never affect the measured traits
fn write_diagnostics(measured: &MeasuredPair, config: &Config, colormap: &Colormap) {
    let result = draw_diagnostics(
        &measured.mask,
        &measured.input.image,
        &measured.input.file_name,
        &DiagnosticOptions::from(config),
        config.ignore_label,
        &config.labels,
        colormap,
        &config.output_dir,
    );

    match result {
        Ok(written) => debug!(
            "{}: {} traits, {} diagnostic images",
            measured.input.file_name,
            measured.record.len(),
            written.len()
        ),
        Err(e) => warn!("No diagnostics for {}: {}", measured.input.file_name, e),
    }
}

/// Measure one mask/image pair and write its diagnostics
///
/// The trait row is returned rather than written so callers control the
/// order of rows in the shared table.
pub fn process_pair(pair: &MaskPair, config: &Config, colormap: &Colormap) -> Result<TraitRecord> {
    let measured = measure_pair(pair, config)?;
    write_diagnostics(&measured, config, colormap);
    Ok(measured.record)
}

/// Measure every mask in `masks_dir` and append one row per image to the traits table
///
/// Each row is appended before that image's diagnostics are drawn.
pub fn process_all(config: &Config) -> Result<BatchSummary> {
    config.validate()?;
    config.validate_paths()?;

    let colormap = Colormap::from_choice(&config.colormap)?;
    let pairs = find_mask_pairs(&config.masks_dir, &config.images_dir)?;
    info!("Found {} mask/image pairs", pairs.len());

    let traits_path = config.traits_path();
    let table = Mutex::new(());

    let handle = |pair: &MaskPair| -> bool {
        info!("Processing: {}", pair.mask_path.display());
        let result = measure_pair(pair, config).and_then(|measured| {
            let _guard = table
                .lock()
                .map_err(|_| RosetteError::Other("traits table lock poisoned".to_string()))?;
            append_traits_csv(&traits_path, &measured.record)?;
            Ok(measured)
        });

        match result {
            Ok(measured) => {
                write_diagnostics(&measured, config, &colormap);
                true
            }
            Err(e) => {
                warn!("Failed to process {}: {}", pair.mask_path.display(), e);
                false
            }
        }
    };

    let outcomes: Vec<bool> = if config.use_parallel {
        pairs.par_iter().map(handle).collect()
    } else {
        pairs.iter().map(handle).collect()
    };

    let processed = outcomes.iter().filter(|&&ok| ok).count();
    let summary = BatchSummary {
        processed,
        failed: outcomes.len() - processed,
    };
    info!("Wrote traits for {} images to {}", summary.processed, traits_path.display());

    Ok(summary)
}

/// Prepare one image for the model
///
/// Besides the padded model input, the resized original and its sidecar are
/// written to `original_images/`, ready to serve as `images_dir` when
/// measuring masks predicted on the model input.
pub fn prepare_image<P: AsRef<Path>>(path: P, config: &Config, output_dir: &Path) -> Result<PreparedSample> {
    let input = load_image(path)?;
    let prepared = preprocess_image(&input.image, &config.preprocess)?;

    let ratio = resize_ratio(input.image.dimensions(), prepared.original.dimensions());
    let (width, height) = input.image.dimensions();
    let metadata = SampleMetadata::new(&input.file_name, height, width, ratio);

    let model_input = output_dir.join(format!("{}.png", metadata.filename));
    save_image(&to_u8_image(&prepared.processed), &model_input)?;

    let originals_dir = output_dir.join(ORIGINALS_DIR);
    let original = originals_dir.join(format!("{}.png", metadata.filename));
    save_image(&prepared.original, &original)?;

    let sidecar = metadata.sidecar_path(&originals_dir);
    metadata.write_json(&sidecar)?;

    debug!("{}: resize ratio {:.4}", input.file_name, ratio);

    Ok(PreparedSample { model_input, original, sidecar })
}

/// Prepare every image in `images_dir` for the model
pub fn prepare_all(config: &Config, output_dir: &Path) -> Result<BatchSummary> {
    config.preprocess.validate()?;
    let files = get_image_files_in_dir(&config.images_dir)?;
    info!("Preparing {} images", files.len());

    let handle = |path: &PathBuf| match prepare_image(path, config, output_dir) {
        Ok(_) => true,
        Err(e) => {
            warn!("Failed to prepare {}: {}", path.display(), e);
            false
        }
    };

    let outcomes: Vec<bool> = if config.use_parallel {
        files.par_iter().map(handle).collect()
    } else {
        files.iter().map(handle).collect()
    };

    let processed = outcomes.iter().filter(|&&ok| ok).count();
    Ok(BatchSummary {
        processed,
        failed: outcomes.len() - processed,
    })
}
