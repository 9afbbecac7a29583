// src/label_mask.rs - Label masks predicted by the segmentation model

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, RgbImage};

use crate::config::LabelClass;
use crate::errors::{RosetteError, Result};
use crate::morphology::BoolMask;

/// Pseudo-label addressing every plant pixel regardless of class
pub const PLANT_REGION: &str = "plant_region";

/// 2-D array of class labels
pub type LabelMask = GrayImage;

/// Which pixels of a label mask to select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskSelector {
    /// All non-zero labels, optionally excluding one label value
    PlantRegion { ignore_label: Option<u8> },
    /// Exactly one label value
    Class(u8),
}

/// Select pixels of a label mask
pub fn create_bool_mask(mask: &LabelMask, selector: MaskSelector) -> BoolMask {
    let (width, height) = mask.dimensions();
    BoolMask::from_fn(width, height, |x, y| {
        let value = mask.get_pixel(x, y)[0];
        match selector {
            MaskSelector::PlantRegion { ignore_label: None } => value > 0,
            MaskSelector::PlantRegion { ignore_label: Some(ignore) } => value > 0 && value != ignore,
            MaskSelector::Class(label) => value == label,
        }
    })
}

/// Accept a decoded mask only if it is single-channel
pub fn into_label_mask(mask: DynamicImage, file: &str) -> Result<LabelMask> {
    match mask {
        DynamicImage::ImageLuma8(gray) => Ok(gray),
        DynamicImage::ImageLuma16(gray) => {
            let (width, height) = gray.dimensions();
            let mut narrowed = GrayImage::new(width, height);
            for (x, y, pixel) in gray.enumerate_pixels() {
                let value = u8::try_from(pixel[0]).map_err(|_| {
                    RosetteError::Other(format!("Mask {} has label {} above 255", file, pixel[0]))
                })?;
                narrowed.put_pixel(x, y, Luma([value]));
            }
            Ok(narrowed)
        }
        _ => Err(RosetteError::ColorMask { file: file.to_string() }),
    }
}

/// Image and mask must cover the same pixels
pub fn check_mask_dimensions(image: &RgbImage, mask: &LabelMask, file: &str) -> Result<()> {
    if image.dimensions() != mask.dimensions() {
        return Err(RosetteError::DimensionMismatch {
            file: file.to_string(),
            image: image.dimensions(),
            mask: mask.dimensions(),
        });
    }
    Ok(())
}

/// Nearest-neighbor rescale of a label mask by `ratio`
///
/// Output sides are `max(round(side * ratio), 1)` with ties rounded to even;
/// each output pixel takes the
/// label under its center, so no new label values are introduced.
pub fn rescale_nearest(mask: &LabelMask, ratio: f64) -> LabelMask {
    if ratio == 1.0 {
        return mask.clone();
    }

    let (width, height) = mask.dimensions();
    let new_width = ((width as f64 * ratio).round_ties_even() as u32).max(1);
    let new_height = ((height as f64 * ratio).round_ties_even() as u32).max(1);

    let source_index = |out: u32, out_len: u32, in_len: u32| -> u32 {
        let mapped = ((out as f64 + 0.5) * in_len as f64 / out_len as f64).floor() as u32;
        mapped.min(in_len.saturating_sub(1))
    };

    ImageBuffer::from_fn(new_width, new_height, |x, y| {
        *mask.get_pixel(
            source_index(x, new_width, width),
            source_index(y, new_height, height),
        )
    })
}

/// Number of pixels carrying `value`
pub fn count_equal(mask: &LabelMask, value: u8) -> u64 {
    mask.pixels().filter(|p| p[0] == value).count() as u64
}

/// Copy of `mask` with every `value` pixel set to background
pub fn clear_label(mask: &LabelMask, value: u8) -> LabelMask {
    let mut cleared = mask.clone();
    for pixel in cleared.pixels_mut().filter(|p| p[0] == value) {
        pixel[0] = 0;
    }
    cleared
}

/// Replace label values by their position in `labels` when values are sparse
///
/// Colormaps are indexed by position, so values such as `0, 128, 255` are
/// mapped to `0, 1, 2`. Dense labels are returned unchanged.
pub fn remap_labels(mask: &LabelMask, labels: &[LabelClass]) -> LabelMask {
    let max_value = labels.iter().map(|l| l.value as usize).max().unwrap_or(0);
    if labels.len() >= max_value {
        return mask.clone();
    }

    let mut lookup: Vec<u8> = (0..=255u8).collect();
    for (index, label) in labels.iter().enumerate() {
        lookup[label.value as usize] = index as u8;
    }

    let mut remapped = mask.clone();
    for pixel in remapped.pixels_mut() {
        pixel[0] = lookup[pixel[0] as usize];
    }
    remapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn mask_from(values: &[&[u8]]) -> LabelMask {
        let height = values.len() as u32;
        let width = values[0].len() as u32;
        ImageBuffer::from_fn(width, height, |x, y| Luma([values[y as usize][x as usize]]))
    }

    #[test]
    fn plant_region_excludes_background_and_ignore_label() {
        let mask = mask_from(&[&[0, 1, 2], &[3, 255, 0]]);

        let all = create_bool_mask(&mask, MaskSelector::PlantRegion { ignore_label: None });
        assert_eq!(all.count(), 4);

        let ignoring = create_bool_mask(&mask, MaskSelector::PlantRegion { ignore_label: Some(255) });
        assert_eq!(ignoring.count(), 3);
        assert!(!ignoring.get(1, 1));
    }

    #[test]
    fn class_selects_exact_value() {
        let mask = mask_from(&[&[0, 2, 2], &[3, 2, 0]]);
        let class = create_bool_mask(&mask, MaskSelector::Class(2));
        assert_eq!(class.count(), 3);
        assert!(class.get(1, 0) && class.get(2, 0) && class.get(1, 1));
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let image = RgbImage::from_pixel(3, 2, Rgb([0, 0, 0]));
        let mask = GrayImage::new(2, 3);
        let err = check_mask_dimensions(&image, &mask, "a.png").unwrap_err();
        assert!(matches!(err, RosetteError::DimensionMismatch { image: (3, 2), mask: (2, 3), .. }));
        assert!(check_mask_dimensions(&image, &GrayImage::new(3, 2), "a.png").is_ok());
    }

    #[test]
    fn color_masks_are_rejected() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(2, 2));
        assert!(matches!(into_label_mask(rgb, "m.png"), Err(RosetteError::ColorMask { .. })));

        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([1])));
        assert_eq!(into_label_mask(gray, "m.png").unwrap().get_pixel(0, 0)[0], 1);
    }

    #[test]
    fn rescale_doubles_each_pixel() {
        let mask = mask_from(&[&[1, 2], &[3, 4]]);
        let scaled = rescale_nearest(&mask, 2.0);
        assert_eq!(scaled.dimensions(), (4, 4));
        assert_eq!(scaled.get_pixel(0, 0)[0], 1);
        assert_eq!(scaled.get_pixel(1, 1)[0], 1);
        assert_eq!(scaled.get_pixel(2, 0)[0], 2);
        assert_eq!(scaled.get_pixel(3, 3)[0], 4);
        assert_eq!(count_equal(&scaled, 3), 4);
    }

    #[test]
    fn rescale_never_collapses_to_zero() {
        let mask = mask_from(&[&[7, 7, 7]]);
        let scaled = rescale_nearest(&mask, 0.1);
        assert_eq!(scaled.dimensions(), (1, 1));
        assert_eq!(scaled.get_pixel(0, 0)[0], 7);
    }

    #[test]
    fn rescale_rounds_half_sizes_to_even() {
        let mask = LabelMask::from_pixel(5, 3, Luma([1]));
        let scaled = rescale_nearest(&mask, 2.5);
        // 12.5 -> 12 and 7.5 -> 8
        assert_eq!(scaled.dimensions(), (12, 8));
        assert_eq!(count_equal(&scaled, 1), 96);
    }

    #[test]
    fn sparse_labels_are_remapped_to_positions() {
        let labels = vec![
            LabelClass::new("background", 0),
            LabelClass::new("leaf", 128),
            LabelClass::new("flower", 255),
        ];
        let mask = mask_from(&[&[0, 128, 255]]);
        let remapped = remap_labels(&mask, &labels);
        assert_eq!(remapped.get_pixel(1, 0)[0], 1);
        assert_eq!(remapped.get_pixel(2, 0)[0], 2);
    }

    #[test]
    fn cleared_label_becomes_background() {
        let mask = mask_from(&[&[1, 255, 2]]);
        let cleared = clear_label(&mask, 255);
        assert_eq!(cleared, mask_from(&[&[1, 0, 2]]));
    }

    #[test]
    fn dense_labels_are_kept() {
        let labels = vec![LabelClass::new("background", 0), LabelClass::new("leaf", 1)];
        let mask = mask_from(&[&[0, 1]]);
        assert_eq!(remap_labels(&mask, &labels), mask);
    }
}
