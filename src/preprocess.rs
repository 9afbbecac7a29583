// src/preprocess.rs - Resize, pad and crop images for the segmentation model

use image::imageops::{self, FilterType};
use image::{GenericImage, ImageBuffer, Pixel, Primitive, Rgb, Rgb32FImage, RgbImage};
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::errors::{RosetteError, Result};
use crate::image_utils::to_float_image;

type Buffer<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

/// Interpolation used when resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMethod {
    Bilinear,
    NearestNeighbor,
}

impl ResizeMethod {
    fn filter(self) -> FilterType {
        match self {
            ResizeMethod::Bilinear => FilterType::Triangle,
            ResizeMethod::NearestNeighbor => FilterType::Nearest,
        }
    }
}

/// Resize method for label maps, chosen by the label's value type
///
/// Integer labels are class ids and must not be interpolated; float labels
/// are treated as continuous.
pub trait LabelResize: Primitive {
    const METHOD: ResizeMethod;
}

impl LabelResize for u8 {
    const METHOD: ResizeMethod = ResizeMethod::NearestNeighbor;
}

impl LabelResize for u16 {
    const METHOD: ResizeMethod = ResizeMethod::NearestNeighbor;
}

impl LabelResize for u32 {
    const METHOD: ResizeMethod = ResizeMethod::NearestNeighbor;
}

impl LabelResize for f32 {
    const METHOD: ResizeMethod = ResizeMethod::Bilinear;
}

/// Resize method for labels of subpixel type `S`
pub fn get_label_resize_method<S: LabelResize>() -> ResizeMethod {
    S::METHOD
}

/// Options for `resize_to_range`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeRange {
    /// Desired size of the smaller side
    pub min_size: Option<u32>,
    /// Maximum size of the larger side
    pub max_size: Option<u32>,
    /// Output sides become multiples of `factor` plus one
    pub factor: Option<u32>,
    pub keep_aspect_ratio: bool,
}

impl ResizeRange {
    pub fn is_active(&self) -> bool {
        self.min_size.is_some() || self.max_size.is_some()
    }
}

impl From<&PreprocessConfig> for ResizeRange {
    fn from(config: &PreprocessConfig) -> Self {
        Self {
            min_size: config.min_resize_value,
            max_size: config.max_resize_value,
            factor: config.resize_factor,
            keep_aspect_ratio: true,
        }
    }
}

/// Output (height, width) for resizing an image into the given range
///
/// The image is scaled so its smaller side equals `min_size`, unless that
/// pushes the larger side past `max_size`, in which case the larger side is
/// scaled to `max_size` instead.
pub fn resize_dimensions(height: u32, width: u32, range: &ResizeRange) -> Result<(u32, u32)> {
    if height == 0 || width == 0 {
        return Err(RosetteError::Preprocess("cannot resize an empty image".to_string()));
    }
    if range.factor == Some(0) {
        return Err(RosetteError::Preprocess("resize factor must be > 0".to_string()));
    }
    if range.min_size == Some(0) || range.max_size == Some(0) {
        return Err(RosetteError::Preprocess("resize sizes must be > 0".to_string()));
    }

    let (h, w) = (height as f64, width as f64);

    let max_size = range.max_size.map(|max| match range.factor {
        Some(factor) => max - (max - 1) % factor,
        None => max,
    });

    // Multiply before dividing so exact ratios stay exact
    let scaled = |target: u32, side: f64| {
        let t = target as f64;
        ((h * t / side).floor() as u32, (w * t / side).floor() as u32)
    };

    let mut size = match (range.min_size, max_size) {
        (Some(min), Some(max)) => {
            let large = scaled(min, h.min(w));
            if large.0.max(large.1) > max {
                scaled(max, h.max(w))
            } else {
                large
            }
        }
        (Some(min), None) => scaled(min, h.min(w)),
        (None, Some(max)) => scaled(max, h.max(w)),
        (None, None) => (height, width),
    };

    if let Some(factor) = range.factor {
        let align = |side: u32| side + (factor - (side.max(1) - 1) % factor) % factor;
        size = (align(size.0), align(size.1));
    }

    if !range.keep_aspect_ratio {
        let side = size.0.max(size.1);
        size = (side, side);
    }

    if size.0 == 0 || size.1 == 0 {
        return Err(RosetteError::Preprocess(format!(
            "resize range produced an empty image from {}x{}",
            width, height
        )));
    }

    Ok(size)
}

/// Resize an image, and optionally its label map, into the given range
///
/// The image is interpolated bilinearly; the label uses the method implied by
/// its value type.
pub fn resize_to_range<P, L>(
    image: &Buffer<P>,
    label: Option<&Buffer<L>>,
    range: &ResizeRange,
) -> Result<(Buffer<P>, Option<Buffer<L>>)>
where
    P: Pixel + 'static,
    L: Pixel + 'static,
    L::Subpixel: LabelResize,
{
    let (width, height) = image.dimensions();
    let (new_height, new_width) = resize_dimensions(height, width, range)?;

    debug!("Resizing {}x{} -> {}x{}", width, height, new_width, new_height);

    let resized = imageops::resize(image, new_width, new_height, ResizeMethod::Bilinear.filter());
    let resized_label = label.map(|l| {
        let method = get_label_resize_method::<L::Subpixel>();
        imageops::resize(l, new_width, new_height, method.filter())
    });

    Ok((resized, resized_label))
}

/// Place an image on a `target_height` x `target_width` canvas filled with `pad_value`
pub fn pad_to_bounding_box<P: Pixel>(
    image: &Buffer<P>,
    offset_height: u32,
    offset_width: u32,
    target_height: u32,
    target_width: u32,
    pad_value: P,
) -> Result<Buffer<P>> {
    let (width, height) = image.dimensions();

    if target_width < width {
        return Err(RosetteError::Preprocess("target_width must be >= width".to_string()));
    }
    if target_height < height {
        return Err(RosetteError::Preprocess("target_height must be >= height".to_string()));
    }
    if offset_width > target_width - width || offset_height > target_height - height {
        return Err(RosetteError::Preprocess(
            "target size not possible with the given target offsets".to_string(),
        ));
    }

    let mut padded = ImageBuffer::from_pixel(target_width, target_height, pad_value);
    padded.copy_from(image, offset_width, offset_height)?;

    Ok(padded)
}

/// Cut a `crop_height` x `crop_width` window starting at the given offsets
pub fn crop<P: Pixel + 'static>(
    image: &Buffer<P>,
    offset_height: u32,
    offset_width: u32,
    crop_height: u32,
    crop_width: u32,
) -> Result<Buffer<P>> {
    let (width, height) = image.dimensions();

    if crop_height > height || crop_width > width {
        return Err(RosetteError::Preprocess("Crop size greater than the image size.".to_string()));
    }
    if offset_height > height - crop_height || offset_width > width - crop_width {
        return Err(RosetteError::Preprocess("Crop window exceeds the image bounds.".to_string()));
    }

    Ok(imageops::crop_imm(image, offset_width, offset_height, crop_width, crop_height).to_image())
}

/// Model-ready image together with the (possibly resized) original
pub struct PreprocessedImage {
    /// Original image, resized if a resize range was configured
    pub original: RgbImage,
    /// Float image padded to the crop size
    pub processed: Rgb32FImage,
}

/// Resize into range and pad to at least the crop size with the mean pixel
pub fn preprocess_image(image: &RgbImage, config: &PreprocessConfig) -> Result<PreprocessedImage> {
    let range = ResizeRange::from(config);

    let (original, processed) = if range.is_active() {
        let (resized, _) = resize_to_range::<Rgb<u8>, image::Luma<u8>>(image, None, &range)?;
        let processed = to_float_image(&resized);
        (resized, processed)
    } else {
        (image.clone(), to_float_image(image))
    };

    let (width, height) = processed.dimensions();
    if height > config.crop_height || width > config.crop_width {
        return Err(RosetteError::Preprocess(format!(
            "image of {}x{} does not fit the {}x{} crop size; set a resize range",
            width, height, config.crop_width, config.crop_height
        )));
    }

    let pad = config.pad_value;
    let processed = pad_to_bounding_box(
        &processed,
        0,
        0,
        config.crop_height,
        config.crop_width,
        Rgb([pad, pad, pad]),
    )?;

    Ok(PreprocessedImage { original, processed })
}

/// Ratio by which a mask predicted on `resized` must be scaled to match `original`
pub fn resize_ratio(original: (u32, u32), resized: (u32, u32)) -> f64 {
    let original_side = original.0.max(original.1) as f64;
    let resized_side = resized.0.max(resized.1) as f64;
    if resized_side == 0.0 {
        1.0
    } else {
        original_side / resized_side
    }
}
