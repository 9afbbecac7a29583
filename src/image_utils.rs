use image::{ImageBuffer, Rgb, Rgb32FImage, RgbImage};

/// Weight of the first image when blending diagnostics
pub const BLEND_WEIGHT: f32 = 0.6;

/// Check if a point is inside the image bounds
#[inline]
pub fn in_bounds(x: i64, y: i64, width: u32, height: u32) -> bool {
    x >= 0 && y >= 0 && (x as u64) < width as u64 && (y as u64) < height as u64
}

/// Cast an 8-bit RGB image to float without normalizing the value range
pub fn to_float_image(image: &RgbImage) -> Rgb32FImage {
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        Rgb([p[0] as f32, p[1] as f32, p[2] as f32])
    })
}

/// Round and clamp a float RGB image back to 8 bits
pub fn to_u8_image(image: &Rgb32FImage) -> RgbImage {
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let p = image.get_pixel(x, y);
        Rgb([round_channel(p[0]), round_channel(p[1]), round_channel(p[2])])
    })
}

#[inline]
fn round_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Weighted sum `weight * a + (1 - weight) * b`, truncated to 8 bits
pub fn blend(a: &RgbImage, b: &RgbImage, weight: f32) -> RgbImage {
    let (width, height) = a.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let pa = a.get_pixel(x, y);
        let pb = b.get_pixel(x, y);
        let mix = |i: usize| {
            (weight * pa[i] as f32 + (1.0 - weight) * pb[i] as f32).clamp(0.0, 255.0) as u8
        };
        Rgb([mix(0), mix(1), mix(2)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_round_trip_keeps_values() {
        let image = RgbImage::from_pixel(2, 2, Rgb([10, 128, 255]));
        let float = to_float_image(&image);
        assert_eq!(float.get_pixel(1, 1)[1], 128.0);
        assert_eq!(to_u8_image(&float), image);
    }

    #[test]
    fn mean_pad_value_rounds_up() {
        let float = Rgb32FImage::from_pixel(1, 1, Rgb([127.5, -3.0, 300.0]));
        assert_eq!(to_u8_image(&float).get_pixel(0, 0), &Rgb([128, 0, 255]));
    }

    #[test]
    fn blend_truncates() {
        let a = RgbImage::from_pixel(1, 1, Rgb([100, 0, 255]));
        let b = RgbImage::from_pixel(1, 1, Rgb([31, 158, 137]));
        // 0.6 * 100 + 0.4 * 31 = 72.4
        assert_eq!(blend(&a, &b, BLEND_WEIGHT).get_pixel(0, 0)[0], 72);
    }

    #[test]
    fn bounds_check() {
        assert!(in_bounds(0, 0, 1, 1));
        assert!(!in_bounds(-1, 0, 1, 1));
        assert!(!in_bounds(1, 0, 1, 1));
    }
}
