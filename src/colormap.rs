// src/colormap.rs - Label to color lookup for diagnostic images

use image::{Rgb, RgbImage};

use crate::config::ColormapChoice;
use crate::errors::{RosetteError, Result};
use crate::label_mask::LabelMask;

/// Number of entries in the PASCAL VOC colormap
pub const PASCAL_MAX_ENTRIES: usize = 256;

const DEFAULT_COLORS: [[u8; 3]; 4] = [
    [0, 0, 0],
    [31, 158, 137],
    [253, 231, 37],
    [72, 40, 120],
];

/// Label-indexed RGB colors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colormap {
    colors: Vec<[u8; 3]>,
}

impl Colormap {
    pub fn new(colors: Vec<[u8; 3]>) -> Result<Self> {
        if colors.is_empty() {
            return Err(RosetteError::Colormap("colormap must contain at least one color".to_string()));
        }
        Ok(Self { colors })
    }

    /// Background black followed by three class colors
    pub fn default_map() -> Self {
        Self { colors: DEFAULT_COLORS.to_vec() }
    }

    /// PASCAL VOC colormap: the bits of each label are interleaved into the
    /// high bits of the three channels
    pub fn pascal() -> Self {
        let mut colors = vec![[0u8; 3]; PASCAL_MAX_ENTRIES];
        for (label, color) in colors.iter_mut().enumerate() {
            let mut index = label;
            for shift in (0..8).rev() {
                for (channel, value) in color.iter_mut().enumerate() {
                    *value |= (((index >> channel) & 1) << shift) as u8;
                }
                index >>= 3;
            }
        }
        Self { colors }
    }

    pub fn from_choice(choice: &ColormapChoice) -> Result<Self> {
        match choice {
            ColormapChoice::Default => Ok(Self::default_map()),
            ColormapChoice::Pascal => Ok(Self::pascal()),
            ColormapChoice::Custom(colors) => Self::new(colors.clone()),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn color(&self, label: u8) -> Option<[u8; 3]> {
        self.colors.get(label as usize).copied()
    }

    /// Paint every label with its color
    pub fn colorize(&self, mask: &LabelMask) -> Result<RgbImage> {
        let (width, height) = mask.dimensions();
        let mut colored = RgbImage::new(width, height);

        for (x, y, pixel) in mask.enumerate_pixels() {
            let label = pixel[0];
            let color = self.color(label).ok_or_else(|| {
                RosetteError::Colormap(format!(
                    "label value {} exceeds colormap with {} entries",
                    label,
                    self.colors.len()
                ))
            })?;
            colored.put_pixel(x, y, Rgb(color));
        }

        Ok(colored)
    }
}
