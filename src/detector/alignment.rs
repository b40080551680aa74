//! Alignment pattern detection: a 1:1:1 white-black-white match on the
//! pattern's center module inside a bounded search window.

use crate::error::DecodeError;
use crate::models::{BitMatrix, Point};

/// A located alignment pattern.
#[derive(Debug, Clone)]
pub struct AlignmentPattern {
    pub center: Point,
    pub estimated_module_size: f32,
}

impl AlignmentPattern {
    fn about_equals(&self, module_size: f32, i: f32, j: f32) -> bool {
        if (i - self.center.y).abs() <= module_size && (j - self.center.x).abs() <= module_size {
            let module_size_diff = (module_size - self.estimated_module_size).abs();
            module_size_diff <= 1.0 || module_size_diff <= self.estimated_module_size
        } else {
            false
        }
    }

    fn combine_estimate(&self, i: f32, j: f32, new_module_size: f32) -> Self {
        Self {
            center: Point::new((self.center.x + j) / 2.0, (self.center.y + i) / 2.0),
            estimated_module_size: (self.estimated_module_size + new_module_size) / 2.0,
        }
    }
}

/// Scanner for one alignment pattern within a rectangle, working outward
/// from the middle row. A candidate seen twice is returned immediately;
/// otherwise the best guess is used.
pub struct AlignmentPatternFinder<'a> {
    image: &'a BitMatrix,
    start_x: usize,
    start_y: usize,
    width: usize,
    height: usize,
    module_size: f32,
    possible_centers: Vec<AlignmentPattern>,
}

impl<'a> AlignmentPatternFinder<'a> {
    pub fn new(
        image: &'a BitMatrix,
        start_x: usize,
        start_y: usize,
        width: usize,
        height: usize,
        module_size: f32,
    ) -> Self {
        Self {
            image,
            start_x,
            start_y,
            width,
            height,
            module_size,
            possible_centers: Vec::new(),
        }
    }

    pub fn find(mut self) -> Result<AlignmentPattern, DecodeError> {
        let max_j = self.start_x + self.width;
        let middle_i = self.start_y + self.height / 2;

        for i_gen in 0..self.height {
            // Middle row first, then alternating above and below.
            let offset = (i_gen + 1) / 2;
            let i = if i_gen & 1 == 0 {
                middle_i + offset
            } else {
                middle_i - offset
            };

            let mut state_count = [0usize; 3];
            let mut j = self.start_x;
            // Burn leading white: a run starting mid-window has an unknown
            // left extent.
            while j < max_j && !self.image.get(j, i) {
                j += 1;
            }
            let mut current_state = 0usize;
            while j < max_j {
                if self.image.get(j, i) {
                    if current_state == 1 {
                        state_count[1] += 1;
                    } else if current_state == 2 {
                        // Black again after white-black-white: evaluate.
                        if self.found_pattern_cross(&state_count) {
                            if let Some(confirmed) = self.handle_possible_center(&state_count, i, j)
                            {
                                return Ok(confirmed);
                            }
                        }
                        state_count[0] = state_count[2];
                        state_count[1] = 1;
                        state_count[2] = 0;
                        current_state = 1;
                    } else {
                        current_state += 1;
                        state_count[current_state] += 1;
                    }
                } else {
                    if current_state == 1 {
                        current_state += 1;
                    }
                    state_count[current_state] += 1;
                }
                j += 1;
            }
            if self.found_pattern_cross(&state_count) {
                if let Some(confirmed) = self.handle_possible_center(&state_count, i, max_j) {
                    return Ok(confirmed);
                }
            }
        }

        // Nothing was confirmed twice; any sighting at all beats giving up.
        if let Some(first) = self.possible_centers.into_iter().next() {
            return Ok(first);
        }
        Err(DecodeError::NotFound("no alignment pattern in region"))
    }

    /// Each of the three runs must be within half a module of the expected
    /// module size.
    fn found_pattern_cross(&self, state_count: &[usize; 3]) -> bool {
        let max_variance = self.module_size / 2.0;
        state_count
            .iter()
            .all(|&count| (self.module_size - count as f32).abs() < max_variance)
    }

    fn center_from_end(state_count: &[usize; 3], end: usize) -> f32 {
        (end - state_count[2]) as f32 - state_count[1] as f32 / 2.0
    }

    fn cross_check_vertical(
        &self,
        start_i: usize,
        center_j: usize,
        max_count: usize,
        original_total: usize,
    ) -> Option<f32> {
        let image = self.image;
        let max_i = image.height();
        let mut state_count = [0usize; 3];

        let mut i = start_i as isize;
        while i >= 0 && image.get(center_j, i as usize) && state_count[1] <= max_count {
            state_count[1] += 1;
            i -= 1;
        }
        if i < 0 || state_count[1] > max_count {
            return None;
        }
        while i >= 0 && !image.get(center_j, i as usize) && state_count[0] <= max_count {
            state_count[0] += 1;
            i -= 1;
        }
        if state_count[0] > max_count {
            return None;
        }

        let mut i = start_i + 1;
        while i < max_i && image.get(center_j, i) && state_count[1] <= max_count {
            state_count[1] += 1;
            i += 1;
        }
        if i == max_i || state_count[1] > max_count {
            return None;
        }
        while i < max_i && !image.get(center_j, i) && state_count[2] <= max_count {
            state_count[2] += 1;
            i += 1;
        }
        if state_count[2] > max_count {
            return None;
        }

        let total: usize = state_count.iter().sum();
        if 5 * total.abs_diff(original_total) >= 2 * original_total {
            return None;
        }
        if self.found_pattern_cross(&state_count) {
            Some(Self::center_from_end(&state_count, i))
        } else {
            None
        }
    }

    /// Cross-check a horizontal hit vertically; merge with a previous
    /// sighting when they agree, which confirms the pattern.
    fn handle_possible_center(
        &mut self,
        state_count: &[usize; 3],
        i: usize,
        j: usize,
    ) -> Option<AlignmentPattern> {
        let state_count_total: usize = state_count.iter().sum();
        let center_j = Self::center_from_end(state_count, j);
        let center_i = self.cross_check_vertical(
            i,
            center_j as usize,
            2 * state_count[1],
            state_count_total,
        )?;

        let estimated_module_size = state_count_total as f32 / 3.0;
        for center in &self.possible_centers {
            if center.about_equals(estimated_module_size, center_i, center_j) {
                return Some(center.combine_estimate(center_i, center_j, estimated_module_size));
            }
        }
        self.possible_centers.push(AlignmentPattern {
            center: Point::new(center_j, center_i),
            estimated_module_size,
        });
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Paint a 5x5-module alignment pattern centered at (cx, cy) in pixels.
    fn draw_alignment(matrix: &mut BitMatrix, cx: usize, cy: usize, scale: usize) {
        const PATTERN: [[u8; 5]; 5] = [
            [1, 1, 1, 1, 1],
            [1, 0, 0, 0, 1],
            [1, 0, 1, 0, 1],
            [1, 0, 0, 0, 1],
            [1, 1, 1, 1, 1],
        ];
        let left = cx - 5 * scale / 2;
        let top = cy - 5 * scale / 2;
        for (my, row) in PATTERN.iter().enumerate() {
            for (mx, &module) in row.iter().enumerate() {
                if module == 1 {
                    for dy in 0..scale {
                        for dx in 0..scale {
                            matrix.set(left + mx * scale + dx, top + my * scale + dy);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_finds_centered_pattern() {
        let mut matrix = BitMatrix::new(80, 80);
        draw_alignment(&mut matrix, 40, 40, 4);
        let finder = AlignmentPatternFinder::new(&matrix, 20, 20, 40, 40, 4.0);
        let pattern = finder.find().unwrap();
        assert!((pattern.center.x - 40.0).abs() < 2.0);
        assert!((pattern.center.y - 40.0).abs() < 2.0);
        assert!((pattern.estimated_module_size - 4.0).abs() < 1.5);
    }

    #[test]
    fn test_finds_off_center_pattern() {
        let mut matrix = BitMatrix::new(80, 80);
        draw_alignment(&mut matrix, 30, 48, 3);
        let finder = AlignmentPatternFinder::new(&matrix, 15, 30, 40, 36, 3.0);
        let pattern = finder.find().unwrap();
        assert!((pattern.center.x - 30.0).abs() < 2.0);
        assert!((pattern.center.y - 48.0).abs() < 2.0);
    }

    #[test]
    fn test_empty_region_not_found() {
        let matrix = BitMatrix::new(80, 80);
        let finder = AlignmentPatternFinder::new(&matrix, 20, 20, 40, 40, 4.0);
        assert!(matches!(
            finder.find(),
            Err(DecodeError::NotFound(_))
        ));
    }
}
