// src/diagnostics.rs - Visual checks of a segmentation

use std::path::{Path, PathBuf};
use image::{Rgb, RgbImage};
use tracing::debug;

use crate::colormap::Colormap;
use crate::config::LabelClass;
use crate::errors::Result;
use crate::image_io::{save_image, split_file_name};
use crate::image_utils::{blend, BLEND_WEIGHT};
use crate::label_mask::{
    check_mask_dimensions, clear_label, create_bool_mask, remap_labels, LabelMask, MaskSelector,
};
use crate::morphology::convex_hull_image;

/// Which diagnostic images to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiagnosticOptions {
    pub save_rosette: bool,
    pub save_overlay: bool,
    pub save_mask: bool,
    pub save_hull: bool,
}

impl DiagnosticOptions {
    pub fn any(&self) -> bool {
        self.save_rosette || self.save_overlay || self.save_mask || self.save_hull
    }
}

/// Image with every non-plant pixel set to black
pub fn crop_rosette(image: &RgbImage, mask: &LabelMask) -> RgbImage {
    let mut crop = image.clone();
    for (x, y, pixel) in crop.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == 0 {
            *pixel = Rgb([0, 0, 0]);
        }
    }
    crop
}

/// Colored mask blended with the convex hull of the plant region in white
pub fn hull_image(colored_mask: &RgbImage, mask: &LabelMask, ignore_label: Option<u8>) -> RgbImage {
    let plant = create_bool_mask(mask, MaskSelector::PlantRegion { ignore_label });
    let hull = convex_hull_image(&plant);

    let (width, height) = mask.dimensions();
    let hull_rgb = RgbImage::from_fn(width, height, |x, y| {
        if hull.get(x, y) { Rgb([255, 255, 255]) } else { Rgb([0, 0, 0]) }
    });

    blend(colored_mask, &hull_rgb, BLEND_WEIGHT)
}

/// Save diagnostic images for one segmentation into `output_dir`
///
/// Returns the paths written.
pub fn draw_diagnostics<P: AsRef<Path>>(
    mask: &LabelMask,
    image: &RgbImage,
    file_name: &str,
    options: &DiagnosticOptions,
    ignore_label: Option<u8>,
    labels: &[LabelClass],
    colormap: &Colormap,
    output_dir: P,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if !options.any() {
        return Ok(written);
    }

    check_mask_dimensions(image, mask, file_name)?;

    let output_dir = output_dir.as_ref();
    let (name, _) = split_file_name(file_name);

    // Ignored pixels are drawn as background
    let visible = match ignore_label {
        Some(value) => clear_label(mask, value),
        None => mask.clone(),
    };
    let colored_mask = colormap.colorize(&remap_labels(&visible, labels))?;

    let mut save = |prefix: &str, extension: &str, img: &RgbImage| -> Result<()> {
        let path = output_dir.join(format!("{}_{}.{}", prefix, name, extension));
        save_image(img, &path)?;
        debug!("Saved {}", path.display());
        written.push(path);
        Ok(())
    };

    if options.save_rosette {
        save("crop", "jpeg", &crop_rosette(image, mask))?;
    }

    if options.save_mask {
        save("mask", "png", &colored_mask)?;
    }

    if options.save_overlay {
        save("overlay", "jpeg", &blend(image, &colored_mask, BLEND_WEIGHT))?;
    }

    if options.save_hull {
        save("hull", "png", &hull_image(&colored_mask, mask, ignore_label))?;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn sample() -> (GrayImage, RgbImage) {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(1, 1, Luma([1]));
        mask.put_pixel(2, 2, Luma([2]));
        (mask, RgbImage::from_pixel(4, 4, Rgb([100, 150, 200])))
    }

    #[test]
    fn crop_blacks_out_background() {
        let (mask, image) = sample();
        let crop = crop_rosette(&image, &mask);
        assert_eq!(crop.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(crop.get_pixel(1, 1), &Rgb([100, 150, 200]));
    }

    #[test]
    fn hull_covers_gap_between_classes() {
        let (mask, _) = sample();
        let colored = Colormap::default_map().colorize(&mask).unwrap();
        let hull = hull_image(&colored, &mask, None);

        // Background outside the hull stays black
        assert_eq!(hull.get_pixel(3, 0), &Rgb([0, 0, 0]));
        // 0.6 * [31, 158, 137] + 0.4 * 255
        assert_eq!(hull.get_pixel(1, 1), &Rgb([120, 196, 184]));
    }

    #[test]
    fn writes_requested_images() {
        let dir = tempfile::tempdir().unwrap();
        let (mask, image) = sample();
        let labels = vec![
            LabelClass::new("class_background", 0),
            LabelClass::new("class_norm", 1),
            LabelClass::new("class_senesc", 2),
        ];
        let options = DiagnosticOptions {
            save_rosette: true,
            save_overlay: false,
            save_mask: true,
            save_hull: true,
        };

        let written = draw_diagnostics(
            &mask,
            &image,
            "plant.png",
            &options,
            None,
            &labels,
            &Colormap::default_map(),
            dir.path(),
        )
        .unwrap();

        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["crop_plant.jpeg", "mask_plant.png", "hull_plant.png"]);
        assert!(written.iter().all(|p| p.exists()));

        let saved_mask = image::open(dir.path().join("mask_plant.png")).unwrap().to_rgb8();
        assert_eq!(saved_mask.get_pixel(2, 2), &Rgb([253, 231, 37]));
    }

    #[test]
    fn ignored_label_is_painted_as_background() {
        let dir = tempfile::tempdir().unwrap();
        let (mut mask, image) = sample();
        mask.put_pixel(3, 3, Luma([255]));
        let options = DiagnosticOptions { save_mask: true, ..DiagnosticOptions::default() };

        draw_diagnostics(
            &mask,
            &image,
            "plant.png",
            &options,
            Some(255),
            &[],
            &Colormap::default_map(),
            dir.path(),
        )
        .unwrap();

        let saved_mask = image::open(dir.path().join("mask_plant.png")).unwrap().to_rgb8();
        assert_eq!(saved_mask.get_pixel(3, 3), &Rgb([0, 0, 0]));
        assert_eq!(saved_mask.get_pixel(1, 1), &Rgb([31, 158, 137]));
    }

    #[test]
    fn nothing_requested_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mask, image) = sample();
        let written = draw_diagnostics(
            &mask,
            &image,
            "plant.png",
            &DiagnosticOptions::default(),
            None,
            &[],
            &Colormap::default_map(),
            dir.path(),
        )
        .unwrap();
        assert!(written.is_empty());
    }
}
