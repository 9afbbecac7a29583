// src/shape_analysis.rs - Region properties of a segmented rosette

use nalgebra::Matrix2;
use std::f64::consts::{PI, SQRT_2};

use crate::morphology::{binary_erosion, convex_hull_image, fill_holes, BoolMask};

/// Morphometric properties of all selected pixels, treated as one region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionProperties {
    pub area: u64,
    pub filled_area: u64,
    pub convex_area: u64,
    pub equivalent_diameter: f64,
    pub major_axis_length: f64,
    pub minor_axis_length: f64,
    pub perimeter: f64,
    pub eccentricity: f64,
    pub extent: f64,
    pub solidity: f64,
}

impl RegionProperties {
    /// Ratio of major to minor axis, NaN for a degenerate minor axis
    pub fn aspect_ratio(&self) -> f64 {
        if self.minor_axis_length == 0.0 {
            f64::NAN
        } else {
            self.major_axis_length / self.minor_axis_length
        }
    }
}

/// Compute region properties, `None` if the mask selects no pixels
pub fn region_properties(mask: &BoolMask) -> Option<RegionProperties> {
    let bbox = mask.bounding_box()?;
    let area = mask.count();

    let filled_area = fill_holes(mask).count();
    let convex_area = convex_hull_image(mask).count();
    let (l1, l2) = inertia_eigenvalues(mask);

    let eccentricity = if l1 == 0.0 { 0.0 } else { (1.0 - l2 / l1).max(0.0).sqrt() };

    Some(RegionProperties {
        area,
        filled_area,
        convex_area,
        equivalent_diameter: (4.0 * area as f64 / PI).sqrt(),
        major_axis_length: 4.0 * l1.sqrt(),
        minor_axis_length: 4.0 * l2.sqrt(),
        perimeter: calculate_perimeter(mask),
        eccentricity,
        extent: area as f64 / bbox.area() as f64,
        solidity: area as f64 / convex_area as f64,
    })
}

/// Eigenvalues of the inertia tensor, largest first and clipped at zero
fn inertia_eigenvalues(mask: &BoolMask) -> (f64, f64) {
    let n = mask.count() as f64;
    if n == 0.0 {
        return (0.0, 0.0);
    }

    let (mut sum_x, mut sum_y) = (0.0, 0.0);
    for (x, y) in mask.points() {
        sum_x += x as f64;
        sum_y += y as f64;
    }
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);

    let (mut mu_xx, mut mu_yy, mut mu_xy) = (0.0, 0.0, 0.0);
    for (x, y) in mask.points() {
        let dx = x as f64 - mean_x;
        let dy = y as f64 - mean_y;
        mu_xx += dx * dx;
        mu_yy += dy * dy;
        mu_xy += dx * dy;
    }

    let tensor = Matrix2::new(mu_yy / n, -mu_xy / n, -mu_xy / n, mu_xx / n);
    let eigen = tensor.symmetric_eigenvalues();
    let (a, b) = (eigen[0].max(0.0), eigen[1].max(0.0));

    if a >= b { (a, b) } else { (b, a) }
}

/// Border-pixel weight by neighborhood code
///
/// The code of a border pixel is 1 + 2 * (4-neighbors on the border)
/// + 10 * (diagonal neighbors on the border). Straight runs count 1, diagonal
/// runs sqrt(2) and corners between them the average of both.
fn perimeter_weight(code: u32) -> f64 {
    match code {
        5 | 7 | 15 | 17 | 25 | 27 => 1.0,
        21 | 33 => SQRT_2,
        13 | 23 => (1.0 + SQRT_2) / 2.0,
        _ => 0.0,
    }
}

/// Perimeter of the region's border pixels, 4-neighborhood
///
/// A single pixel or a region without straight border runs has perimeter 0.
pub fn calculate_perimeter(mask: &BoolMask) -> f64 {
    let bbox = match mask.bounding_box() {
        Some(b) => b,
        None => return 0.0,
    };

    let eroded = binary_erosion(mask);
    let is_border = |x: i64, y: i64| mask.get_or_false(x, y) && !eroded.get_or_false(x, y);

    let mut perimeter = 0.0;
    for y in bbox.min_y as i64..=bbox.max_y as i64 {
        for x in bbox.min_x as i64..=bbox.max_x as i64 {
            if !is_border(x, y) {
                continue;
            }

            let mut code = 1;
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                if is_border(x + dx, y + dy) {
                    code += 2;
                }
            }
            for (dx, dy) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
                if is_border(x + dx, y + dy) {
                    code += 10;
                }
            }
            perimeter += perimeter_weight(code);
        }
    }

    perimeter
}
