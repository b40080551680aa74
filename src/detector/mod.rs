//! Locating a QR symbol in a binarized image and sampling its module grid.

pub mod alignment;
pub mod finder;
pub mod sampler;

use crate::decoder::Version;
use crate::error::DecodeError;
use crate::models::{BitMatrix, Point};
use crate::utils::geometry::PerspectiveTransform;

use alignment::{AlignmentPattern, AlignmentPatternFinder};
use finder::FinderPatternFinder;

/// Search allowances around the projected alignment center, in modules.
const ALIGNMENT_ALLOWANCES: [f32; 3] = [4.0, 8.0, 16.0];

/// A located symbol: its sampled module grid plus the pattern centers that
/// anchored it (bottom-left, top-left, top-right, and the alignment
/// pattern when one was found).
#[derive(Debug)]
pub struct DetectorResult {
    pub bits: BitMatrix,
    pub points: Vec<Point>,
}

/// Detector over one binarized image.
pub struct Detector<'a> {
    image: &'a BitMatrix,
}

impl<'a> Detector<'a> {
    pub fn new(image: &'a BitMatrix) -> Self {
        Self { image }
    }

    /// Locate a symbol and sample its grid.
    pub fn detect(&self) -> Result<DetectorResult, DecodeError> {
        let [bottom_left, top_left, top_right] = FinderPatternFinder::new(self.image).find()?;

        let module_size = self.calculate_module_size(
            &top_left.center,
            &top_right.center,
            &bottom_left.center,
        );
        if module_size < 1.0 {
            return Err(DecodeError::NotFound("module size below one pixel"));
        }
        let dimension = Self::compute_dimension(
            &top_left.center,
            &top_right.center,
            &bottom_left.center,
            module_size,
        )?;
        let provisional_version = Version::for_dimension(dimension)?;
        let modules_between_fp_centers = provisional_version.dimension() - 7;

        let mut alignment_pattern: Option<AlignmentPattern> = None;
        if !provisional_version.alignment_pattern_centers().is_empty() {
            // Project the bottom-right corner from the three finders, then
            // pull 3 modules back toward the top-left onto the alignment
            // center.
            let bottom_right_x = top_right.center.x - top_left.center.x + bottom_left.center.x;
            let bottom_right_y = top_right.center.y - top_left.center.y + bottom_left.center.y;
            let correction = 1.0 - 3.0 / modules_between_fp_centers as f32;
            let est_alignment_x =
                top_left.center.x + correction * (bottom_right_x - top_left.center.x);
            let est_alignment_y =
                top_left.center.y + correction * (bottom_right_y - top_left.center.y);

            for &allowance in &ALIGNMENT_ALLOWANCES {
                match self.find_alignment_in_region(
                    module_size,
                    est_alignment_x,
                    est_alignment_y,
                    allowance,
                ) {
                    Ok(pattern) => {
                        alignment_pattern = Some(pattern);
                        break;
                    }
                    Err(DecodeError::NotFound(_)) => {}
                    Err(other) => return Err(other),
                }
            }
            // Decoding proceeds without the alignment pattern when the
            // search comes up empty.
        }

        let transform = Self::create_transform(
            &top_left.center,
            &top_right.center,
            &bottom_left.center,
            alignment_pattern.as_ref(),
            dimension,
        );
        let bits = sampler::sample_grid(self.image, &transform, dimension)?;

        let mut points = vec![bottom_left.center, top_left.center, top_right.center];
        if let Some(pattern) = alignment_pattern {
            points.push(pattern.center);
        }
        Ok(DetectorResult { bits, points })
    }

    fn create_transform(
        top_left: &Point,
        top_right: &Point,
        bottom_left: &Point,
        alignment_pattern: Option<&AlignmentPattern>,
        dimension: usize,
    ) -> PerspectiveTransform {
        let dim_minus_three = dimension as f32 - 3.5;
        let (bottom_right_x, bottom_right_y, source_bottom_right) = match alignment_pattern {
            Some(pattern) => (pattern.center.x, pattern.center.y, dim_minus_three - 3.0),
            None => (
                top_right.x - top_left.x + bottom_left.x,
                top_right.y - top_left.y + bottom_left.y,
                dim_minus_three,
            ),
        };
        PerspectiveTransform::quadrilateral_to_quadrilateral(
            3.5,
            3.5,
            dim_minus_three,
            3.5,
            source_bottom_right,
            source_bottom_right,
            3.5,
            dim_minus_three,
            top_left.x,
            top_left.y,
            top_right.x,
            top_right.y,
            bottom_right_x,
            bottom_right_y,
            bottom_left.x,
            bottom_left.y,
        )
    }

    /// Side length in modules from the center distances, snapped to a valid
    /// dimension. One module of error is tolerated; two in the same
    /// direction means the symbol was not really there.
    fn compute_dimension(
        top_left: &Point,
        top_right: &Point,
        bottom_left: &Point,
        module_size: f32,
    ) -> Result<usize, DecodeError> {
        let tltr = round(top_left.distance(top_right) / module_size);
        let tlbl = round(top_left.distance(bottom_left) / module_size);
        let mut dimension = (tltr + tlbl) / 2 + 7;
        match dimension & 0x03 {
            0 => dimension += 1,
            2 => dimension -= 1,
            3 => return Err(DecodeError::NotFound("implausible symbol dimension")),
            _ => {}
        }
        Ok(dimension)
    }

    /// Average module size along both top edges, each measured with
    /// black-white-black runs in both directions.
    fn calculate_module_size(
        &self,
        top_left: &Point,
        top_right: &Point,
        bottom_left: &Point,
    ) -> f32 {
        (self.calculate_module_size_one_way(top_left, top_right)
            + self.calculate_module_size_one_way(top_left, bottom_left))
            / 2.0
    }

    fn calculate_module_size_one_way(&self, pattern: &Point, other_pattern: &Point) -> f32 {
        let estimate1 = self.size_of_black_white_black_run_both_ways(
            pattern.x as i32,
            pattern.y as i32,
            other_pattern.x as i32,
            other_pattern.y as i32,
        );
        let estimate2 = self.size_of_black_white_black_run_both_ways(
            other_pattern.x as i32,
            other_pattern.y as i32,
            pattern.x as i32,
            pattern.y as i32,
        );
        // Each estimate crosses one finder pattern: 3.5 modules either way.
        match (estimate1, estimate2) {
            (Some(first), Some(second)) => (first + second) / 14.0,
            (Some(first), None) => first / 7.0,
            (None, Some(second)) => second / 7.0,
            (None, None) => 0.0,
        }
    }

    /// Total length of the black-white-black transition runs on either side
    /// of (from), along the axis toward (to). The leg away from (to) is
    /// clipped against the image border and the result scaled accordingly.
    fn size_of_black_white_black_run_both_ways(
        &self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    ) -> Option<f32> {
        let first = self.size_of_black_white_black_run(from_x, from_y, to_x, to_y);

        let width = self.image.width() as i32;
        let height = self.image.height() as i32;
        let mut scale = 1.0f32;
        let mut other_to_x = from_x - (to_x - from_x);
        if other_to_x < 0 {
            scale = from_x as f32 / (from_x - other_to_x) as f32;
            other_to_x = 0;
        } else if other_to_x >= width {
            scale = (width - 1 - from_x) as f32 / (other_to_x - from_x) as f32;
            other_to_x = width - 1;
        }
        let mut other_to_y = (from_y as f32 - (to_y - from_y) as f32 * scale) as i32;

        scale = 1.0;
        if other_to_y < 0 {
            scale = from_y as f32 / (from_y - other_to_y) as f32;
            other_to_y = 0;
        } else if other_to_y >= height {
            scale = (height - 1 - from_y) as f32 / (other_to_y - from_y) as f32;
            other_to_y = height - 1;
        }
        let other_to_x = (from_x as f32 + (other_to_x - from_x) as f32 * scale) as i32;

        let second = self.size_of_black_white_black_run(from_x, from_y, other_to_x, other_to_y);
        match (first, second) {
            // The center pixel is counted in both legs.
            (Some(first), Some(second)) => Some(first + second - 1.0),
            _ => None,
        }
    }

    /// Bresenham walk from (from) toward (to), measuring the distance
    /// covered by three color transitions: black run, white run, and the
    /// first pixel of the next black run.
    fn size_of_black_white_black_run(
        &self,
        mut from_x: i32,
        mut from_y: i32,
        mut to_x: i32,
        mut to_y: i32,
    ) -> Option<f32> {
        let steep = (to_y - from_y).abs() > (to_x - from_x).abs();
        if steep {
            std::mem::swap(&mut from_x, &mut from_y);
            std::mem::swap(&mut to_x, &mut to_y);
        }

        let dx = (to_x - from_x).abs();
        let dy = (to_y - from_y).abs();
        let mut error = -dx / 2;
        let x_step = if from_x < to_x { 1 } else { -1 };
        let y_step = if from_y < to_y { 1 } else { -1 };

        let mut state = 0u8;
        let x_limit = to_x + x_step;
        let mut x = from_x;
        let mut y = from_y;
        while x != x_limit {
            let real_x = if steep { y } else { x };
            let real_y = if steep { x } else { y };
            if real_x < 0
                || real_y < 0
                || real_x >= self.image.width() as i32
                || real_y >= self.image.height() as i32
            {
                return None;
            }
            // In state 1 we look for white, otherwise for black.
            if (state == 1) == self.image.get(real_x as usize, real_y as usize) {
                if state == 2 {
                    return Some(distance_i(x, y, from_x, from_y));
                }
                state += 1;
            }
            error += dy;
            if error > 0 {
                if y == to_y {
                    break;
                }
                y += y_step;
                error -= dx;
            }
            x += x_step;
        }
        // Hitting the endpoint while scanning for the final black pixel
        // still yields a usable measurement.
        if state == 2 {
            return Some(distance_i(to_x + x_step, to_y, from_x, from_y));
        }
        None
    }

    fn find_alignment_in_region(
        &self,
        module_size: f32,
        est_alignment_x: f32,
        est_alignment_y: f32,
        allowance_factor: f32,
    ) -> Result<AlignmentPattern, DecodeError> {
        let allowance = (allowance_factor * module_size) as i32;
        let width = self.image.width() as i32;
        let height = self.image.height() as i32;
        let est_x = est_alignment_x as i32;
        let est_y = est_alignment_y as i32;

        let left = (est_x - allowance).max(0);
        let right = (est_x + allowance).min(width - 1);
        if ((right - left) as f32) < module_size * 3.0 {
            return Err(DecodeError::NotFound("alignment search region too small"));
        }
        let top = (est_y - allowance).max(0);
        let bottom = (est_y + allowance).min(height - 1);
        if ((bottom - top) as f32) < module_size * 3.0 {
            return Err(DecodeError::NotFound("alignment search region too small"));
        }

        AlignmentPatternFinder::new(
            self.image,
            left as usize,
            top as usize,
            (right - left) as usize,
            (bottom - top) as usize,
            module_size,
        )
        .find()
    }
}

fn round(value: f32) -> usize {
    (value + 0.5) as usize
}

fn distance_i(ax: i32, ay: i32, bx: i32, by: i32) -> f32 {
    let dx = (ax - bx) as f32;
    let dy = (ay - by) as f32;
    (dx * dx + dy * dy).sqrt()
}
