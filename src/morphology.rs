// src/morphology.rs - Binary mask primitives: hole filling, erosion, convex hull

use std::collections::{HashSet, VecDeque};

use imageproc::geometry::convex_hull;
use imageproc::point::Point;

use crate::image_utils::in_bounds;

/// 4-connected neighbor offsets
static CROSS_NEIGHBORHOOD: [(i64, i64); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];

/// Row-major boolean image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

/// Inclusive pixel bounds of the true region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

impl BoolMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn<F: FnMut(u32, u32) -> bool>(width: u32, height: u32, mut f: F) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                mask.set(x, y, f(x, y));
            }
        }
        mask
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    /// Value at signed coordinates, false outside the image
    #[inline]
    pub fn get_or_false(&self, x: i64, y: i64) -> bool {
        in_bounds(x, y, self.width, self.height) && self.get(x as u32, y as u32)
    }

    pub fn count(&self) -> u64 {
        self.data.iter().filter(|&&v| v).count() as u64
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Coordinates of all true pixels in row-major order
    pub fn points(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v)
            .map(move |(i, _)| ((i % self.width as usize) as u32, (i / self.width as usize) as u32))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bbox: Option<BoundingBox> = None;
        for (x, y) in self.points() {
            bbox = Some(match bbox {
                None => BoundingBox { min_x: x, min_y: y, max_x: x, max_y: y },
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            });
        }
        bbox
    }
}

/// Fill background regions that cannot be reached from the bounding box border
///
/// Background connectivity is 4-neighborhood, so diagonal gaps in the
/// foreground do not leak.
pub fn fill_holes(mask: &BoolMask) -> BoolMask {
    let mut filled = mask.clone();
    let bbox = match mask.bounding_box() {
        Some(b) => b,
        None => return filled,
    };

    let (w, h) = (bbox.width() as usize, bbox.height() as usize);
    let local = |x: usize, y: usize| mask.get(bbox.min_x + x as u32, bbox.min_y + y as u32);

    let mut outside = vec![false; w * h];
    let mut queue = VecDeque::new();

    for y in 0..h {
        for x in 0..w {
            let on_border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
            if on_border && !local(x, y) {
                outside[y * w + x] = true;
                queue.push_back((x, y));
            }
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        for &(dx, dy) in &CROSS_NEIGHBORHOOD {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                continue;
            }
            let (nx, ny) = (nx as usize, ny as usize);
            if !outside[ny * w + nx] && !local(nx, ny) {
                outside[ny * w + nx] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    for y in 0..h {
        for x in 0..w {
            if !outside[y * w + x] {
                filled.set(bbox.min_x + x as u32, bbox.min_y + y as u32, true);
            }
        }
    }

    filled
}

/// Erode with a 3x3 cross, treating everything outside the image as background
pub fn binary_erosion(mask: &BoolMask) -> BoolMask {
    let (width, height) = mask.dimensions();
    BoolMask::from_fn(width, height, |x, y| {
        mask.get(x, y)
            && CROSS_NEIGHBORHOOD
                .iter()
                .all(|&(dx, dy)| mask.get_or_false(x as i64 + dx, y as i64 + dy))
    })
}

/// Twice the signed area of triangle (o, a, b)
#[inline]
fn cross(o: &Point<i64>, a: &Point<i64>, b: &Point<i64>) -> i64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn inside_convex_polygon(polygon: &[Point<i64>], p: &Point<i64>) -> bool {
    let n = polygon.len();
    let (mut has_pos, mut has_neg) = (false, false);
    for i in 0..n {
        let c = cross(&polygon[i], &polygon[(i + 1) % n], p);
        has_pos |= c > 0;
        has_neg |= c < 0;
        if has_pos && has_neg {
            return false;
        }
    }
    true
}

/// Smallest convex set of pixels containing every true pixel
///
/// The hull is spanned by the edge midpoints of each foreground pixel. Working
/// on doubled coordinates keeps every vertex integral, so membership tests for
/// pixel centers are exact and include pixels lying on the hull boundary.
pub fn convex_hull_image(mask: &BoolMask) -> BoolMask {
    let (width, height) = mask.dimensions();
    let mut hull_mask = BoolMask::new(width, height);

    let bbox = match mask.bounding_box() {
        Some(b) => b,
        None => return hull_mask,
    };

    // Neighboring pixels share midpoints
    let mut midpoints = HashSet::new();
    for (x, y) in mask.points() {
        let (cx, cy) = (2 * x as i64, 2 * y as i64);
        midpoints.insert((cx - 1, cy));
        midpoints.insert((cx + 1, cy));
        midpoints.insert((cx, cy - 1));
        midpoints.insert((cx, cy + 1));
    }
    let mut corners: Vec<Point<i64>> = midpoints.into_iter().map(|(x, y)| Point::new(x, y)).collect();
    corners.sort_by_key(|p| (p.y, p.x));
    let hull = convex_hull(&corners);

    for y in bbox.min_y..=bbox.max_y {
        for x in bbox.min_x..=bbox.max_x {
            let center = Point::new(2 * x as i64, 2 * y as i64);
            if inside_convex_polygon(&hull, &center) {
                hull_mask.set(x, y, true);
            }
        }
    }

    hull_mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_rows(rows: &[&str]) -> BoolMask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        BoolMask::from_fn(width, height, |x, y| rows[y as usize].as_bytes()[x as usize] == b'#')
    }

    #[test]
    fn bounding_box_of_scattered_pixels() {
        let mask = from_rows(&[
            ".....",
            "..#..",
            ".....",
            "#....",
        ]);
        let bbox = mask.bounding_box().unwrap();
        assert_eq!((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y), (0, 1, 2, 3));
        assert_eq!(bbox.area(), 9);
        assert!(BoolMask::new(3, 3).bounding_box().is_none());
    }

    #[test]
    fn fills_enclosed_hole() {
        let mask = from_rows(&[
            ".....",
            ".###.",
            ".#.#.",
            ".###.",
            ".....",
        ]);
        let filled = fill_holes(&mask);
        assert_eq!(mask.count(), 8);
        assert_eq!(filled.count(), 9);
        assert!(filled.get(2, 2));
    }

    #[test]
    fn diagonal_gap_still_encloses_hole() {
        let mask = from_rows(&[
            ".#.",
            "#.#",
            ".#.",
        ]);
        assert_eq!(fill_holes(&mask).count(), 5);
    }

    #[test]
    fn open_notch_is_not_a_hole() {
        let mask = from_rows(&[
            "###",
            "#.#",
            "#.#",
        ]);
        assert_eq!(fill_holes(&mask).count(), 7);
    }

    #[test]
    fn erosion_removes_border_ring() {
        let mask = from_rows(&[
            "###",
            "###",
            "###",
        ]);
        let eroded = binary_erosion(&mask);
        assert_eq!(eroded.count(), 1);
        assert!(eroded.get(1, 1));
    }

    #[test]
    fn hull_of_l_shape_fills_the_corner() {
        let mask = from_rows(&[
            "#..",
            "#..",
            "###",
        ]);
        let hull = convex_hull_image(&mask);
        assert!(hull.get(1, 1));
        assert!(!hull.get(2, 0));
        assert_eq!(hull.count(), 6);
    }

    #[test]
    fn hull_of_single_pixel_is_itself() {
        let mut mask = BoolMask::new(3, 3);
        mask.set(1, 1, true);
        assert_eq!(convex_hull_image(&mask), mask);
    }

    #[test]
    fn hull_of_empty_mask_is_empty() {
        assert!(convex_hull_image(&BoolMask::new(4, 4)).is_empty());
    }
}
