// src/color_analysis.rs - Color channel indices within a segmented region

use image::{GrayImage, RgbImage};

use crate::morphology::BoolMask;

/// Red, green and blue planes of an RGB image
pub struct Channels {
    pub red: GrayImage,
    pub green: GrayImage,
    pub blue: GrayImage,
}

/// Split an RGB image into single channels
pub fn split_channels(image: &RgbImage) -> Channels {
    let (width, height) = image.dimensions();
    let plane = |c: usize| GrayImage::from_fn(width, height, |x, y| image::Luma([image.get_pixel(x, y)[c]]));

    Channels {
        red: plane(0),
        green: plane(1),
        blue: plane(2),
    }
}

/// Mean channel intensities and the chroma indices derived from them
///
/// Follows Del Valle et al. (2018). Ratios use IEEE arithmetic, so a zero
/// denominator gives an infinity and an empty region gives NaN throughout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorIndices {
    pub red_channel: f64,
    pub green_channel: f64,
    pub blue_channel: f64,
    pub chroma_ratio: f64,
    pub chroma_difference: f64,
    pub chroma_base: f64,
    pub green_strength: f64,
    pub blue_green_ratio: f64,
}

impl ColorIndices {
    /// Build indices from channel means
    pub fn from_means(red: f64, green: f64, blue: f64) -> Self {
        let blue_red_mean = (blue + red) / 2.0;
        Self {
            red_channel: red,
            green_channel: green,
            blue_channel: blue,
            chroma_ratio: green / blue_red_mean,
            chroma_difference: blue_red_mean - green,
            chroma_base: (blue + red) / green,
            green_strength: green / (red + green + blue),
            blue_green_ratio: blue / green,
        }
    }

    /// Trait name suffixes paired with their values, in output order
    pub fn named_values(&self) -> [(&'static str, f64); 8] {
        [
            ("red_channel", self.red_channel),
            ("green_channel", self.green_channel),
            ("blue_channel", self.blue_channel),
            ("chroma_ratio", self.chroma_ratio),
            ("chroma_difference", self.chroma_difference),
            ("chroma_base", self.chroma_base),
            ("green_strength", self.green_strength),
            ("blue_green_ratio", self.blue_green_ratio),
        ]
    }
}

fn masked_mean(channel: &GrayImage, mask: &BoolMask) -> f64 {
    let mut sum = 0u64;
    let mut count = 0u64;
    for (x, y) in mask.points() {
        sum += channel.get_pixel(x, y)[0] as u64;
        count += 1;
    }
    if count == 0 {
        f64::NAN
    } else {
        sum as f64 / count as f64
    }
}

/// Calculate color indices over the pixels selected by `mask`
pub fn calculate_color_indices(channels: &Channels, mask: &BoolMask) -> ColorIndices {
    ColorIndices::from_means(
        masked_mean(&channels.red, mask),
        masked_mean(&channels.green, mask),
        masked_mean(&channels.blue, mask),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use image::Rgb;

    #[test]
    fn splits_channels() {
        let image = RgbImage::from_pixel(2, 1, Rgb([10, 20, 30]));
        let channels = split_channels(&image);
        assert_eq!(channels.red.get_pixel(1, 0)[0], 10);
        assert_eq!(channels.green.get_pixel(1, 0)[0], 20);
        assert_eq!(channels.blue.get_pixel(1, 0)[0], 30);
    }

    #[test]
    fn indices_over_masked_pixels() {
        let mut image = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        image.put_pixel(0, 0, Rgb([40, 100, 20]));
        image.put_pixel(1, 0, Rgb([60, 140, 40]));

        let mut mask = BoolMask::new(2, 2);
        mask.set(0, 0, true);
        mask.set(1, 0, true);

        let indices = calculate_color_indices(&split_channels(&image), &mask);

        assert_approx_eq!(indices.red_channel, 50.0, 1e-12);
        assert_approx_eq!(indices.green_channel, 120.0, 1e-12);
        assert_approx_eq!(indices.blue_channel, 30.0, 1e-12);
        assert_approx_eq!(indices.chroma_ratio, 120.0 / 40.0, 1e-12);
        assert_approx_eq!(indices.chroma_difference, 40.0 - 120.0, 1e-12);
        assert_approx_eq!(indices.chroma_base, 80.0 / 120.0, 1e-12);
        assert_approx_eq!(indices.green_strength, 120.0 / 200.0, 1e-12);
        assert_approx_eq!(indices.blue_green_ratio, 30.0 / 120.0, 1e-12);
    }

    #[test]
    fn empty_region_is_nan() {
        let image = RgbImage::new(2, 2);
        let indices = calculate_color_indices(&split_channels(&image), &BoolMask::new(2, 2));
        assert!(indices.named_values().iter().all(|(_, v)| v.is_nan()));
    }

    #[test]
    fn black_region_divides_by_zero() {
        let indices = ColorIndices::from_means(0.0, 0.0, 0.0);
        assert!(indices.chroma_ratio.is_nan());
        assert_eq!(indices.chroma_difference, 0.0);

        let no_green = ColorIndices::from_means(10.0, 0.0, 10.0);
        assert!(no_green.chroma_base.is_infinite());
        assert!(no_green.blue_green_ratio.is_infinite());
    }
}
