use std::fs;
use std::path::{Path, PathBuf};
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::debug;

use crate::errors::{RosetteError, Result};
use crate::label_mask::into_label_mask;

/// Represents an input image with its metadata
pub struct InputImage {
    pub image: RgbImage,
    pub path: PathBuf,
    /// File name including extension
    pub file_name: String,
}

/// A predicted mask and the original image it was segmented from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskPair {
    pub mask_path: PathBuf,
    pub image_path: PathBuf,
}

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get all image files directly inside a directory, sorted by name
pub fn get_image_files_in_dir<P: AsRef<Path>>(dir_path: P) -> Result<Vec<PathBuf>> {
    let dir_path = dir_path.as_ref();

    if !dir_path.is_dir() {
        return Err(RosetteError::InvalidPath(dir_path.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir_path)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            files.push(path);
        }
    }
    files.sort();

    Ok(files)
}

/// Pair every mask with the original image sharing its file stem
///
/// Masks without a matching original are skipped with a debug message.
pub fn find_mask_pairs<P: AsRef<Path>, Q: AsRef<Path>>(masks_dir: P, images_dir: Q) -> Result<Vec<MaskPair>> {
    let originals = get_image_files_in_dir(images_dir)?;
    let mut pairs = Vec::new();

    for mask_path in get_image_files_in_dir(masks_dir)? {
        let stem = mask_path.file_stem().and_then(|s| s.to_str());
        let original = originals
            .iter()
            .find(|p| p.file_stem().and_then(|s| s.to_str()) == stem);

        match original {
            Some(image_path) => pairs.push(MaskPair {
                mask_path: mask_path.clone(),
                image_path: image_path.clone(),
            }),
            None => debug!("No original image for mask {}", mask_path.display()),
        }
    }

    Ok(pairs)
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| RosetteError::InvalidPath(path.to_path_buf()))
}

/// Load an image as 8-bit RGB, dropping any alpha channel
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<InputImage> {
    let path = path.as_ref();
    let file_name = file_name_of(path)?;
    let image = image::open(path)?.to_rgb8();

    Ok(InputImage {
        image,
        path: path.to_path_buf(),
        file_name,
    })
}

/// Load a grayscale label mask
pub fn load_mask<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let path = path.as_ref();
    let file_name = file_name_of(path)?;
    let mask: DynamicImage = image::open(path)?;

    into_label_mask(mask, &file_name)
}

/// Save an RGB image, format chosen by extension
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    image.save(path)?;

    Ok(())
}

/// Split a file name at its last dot into name and format
pub fn split_file_name(file_name: &str) -> (&str, &str) {
    match file_name.rsplit_once('.') {
        Some((name, format)) => (name, format),
        None => (file_name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbaImage, Rgba};

    #[test]
    fn splits_at_last_dot() {
        assert_eq!(split_file_name("plant.01.png"), ("plant.01", "png"));
        assert_eq!(split_file_name("plant"), ("plant", ""));
    }

    #[test]
    fn pairs_masks_with_originals_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let masks = dir.path().join("masks");
        let images = dir.path().join("images");
        fs::create_dir_all(&masks).unwrap();
        fs::create_dir_all(&images).unwrap();

        GrayImage::new(2, 2).save(masks.join("a.png")).unwrap();
        GrayImage::new(2, 2).save(masks.join("orphan.png")).unwrap();
        RgbImage::new(2, 2).save(images.join("a.jpeg")).unwrap();
        fs::write(images.join("notes.txt"), "x").unwrap();

        let pairs = find_mask_pairs(&masks, &images).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].image_path, images.join("a.jpeg"));
    }

    #[test]
    fn load_image_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgba.png");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4])).save(&path).unwrap();

        let input = load_image(&path).unwrap();
        assert_eq!(input.file_name, "rgba.png");
        assert_eq!(input.image.dimensions(), (3, 2));
        assert_eq!(input.image.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn load_mask_rejects_color() {
        let dir = tempfile::tempdir().unwrap();
        let gray = dir.path().join("gray.png");
        let color = dir.path().join("color.png");
        GrayImage::from_pixel(2, 2, Luma([3])).save(&gray).unwrap();
        RgbImage::new(2, 2).save(&color).unwrap();

        assert_eq!(load_mask(&gray).unwrap().get_pixel(1, 1)[0], 3);
        assert!(matches!(load_mask(&color), Err(RosetteError::ColorMask { .. })));
    }
}
