//! Finder pattern detection using 1:1:3:1:1 run-ratio scanning.

use std::cmp::Ordering;

use crate::error::DecodeError;
use crate::models::{BitMatrix, Point, cross_product_z};

/// A candidate merges with an existing center once it has been seen twice.
const CENTER_QUORUM: usize = 2;
/// Rows skipped between scan lines until the first confirmation.
const MIN_SKIP: usize = 3;
/// Largest supported symbol width in modules, bounding the initial skip.
const MAX_MODULES: usize = 57;

/// One finder pattern candidate: center, module size estimate and how many
/// scan rows confirmed it.
#[derive(Debug, Clone)]
pub struct FinderPattern {
    pub center: Point,
    pub estimated_module_size: f32,
    pub count: usize,
}

impl FinderPattern {
    fn new(x: f32, y: f32, estimated_module_size: f32) -> Self {
        Self {
            center: Point::new(x, y),
            estimated_module_size,
            count: 1,
        }
    }

    /// Same pattern? Chebyshev distance within one module and module sizes
    /// within max(1, size) of each other.
    fn about_equals(&self, module_size: f32, i: f32, j: f32) -> bool {
        if (i - self.center.y).abs() <= module_size && (j - self.center.x).abs() <= module_size {
            let module_size_diff = (module_size - self.estimated_module_size).abs();
            module_size_diff <= 1.0 || module_size_diff <= self.estimated_module_size
        } else {
            false
        }
    }

    /// Count-weighted average with a new sighting.
    fn combine_estimate(&self, i: f32, j: f32, new_module_size: f32) -> Self {
        let combined_count = (self.count + 1) as f32;
        let count = self.count as f32;
        Self {
            center: Point::new(
                (count * self.center.x + j) / combined_count,
                (count * self.center.y + i) / combined_count,
            ),
            estimated_module_size: (count * self.estimated_module_size + new_module_size)
                / combined_count,
            count: self.count + 1,
        }
    }
}

/// Scanner locating the three finder patterns of one symbol.
pub struct FinderPatternFinder<'a> {
    image: &'a BitMatrix,
    possible_centers: Vec<FinderPattern>,
    has_skipped: bool,
}

impl<'a> FinderPatternFinder<'a> {
    pub fn new(image: &'a BitMatrix) -> Self {
        Self {
            image,
            possible_centers: Vec::new(),
            has_skipped: false,
        }
    }

    /// Scan the image and return the best triple ordered as
    /// (bottom-left, top-left, top-right).
    pub fn find(mut self) -> Result<[FinderPattern; 3], DecodeError> {
        let max_i = self.image.height();
        let max_j = self.image.width();

        // Sparse scan first; the skip drops to 2 after the first
        // confirmation so nearby patterns aren't jumped over.
        let mut i_skip = (3 * max_i) / (4 * MAX_MODULES);
        if i_skip < MIN_SKIP {
            i_skip = MIN_SKIP;
        }

        let mut done = false;
        let mut i = i_skip - 1;
        while i < max_i && !done {
            let mut state_count = [0usize; 5];
            let mut current_state = 0usize;
            let mut j = 0usize;
            while j < max_j {
                if self.image.get(j, i) {
                    // Black pixel.
                    if current_state & 1 == 1 {
                        current_state += 1;
                    }
                    state_count[current_state] += 1;
                } else if current_state & 1 == 0 {
                    // White pixel while counting black.
                    if current_state == 4 {
                        if Self::found_pattern_cross(&state_count) {
                            if self.handle_possible_center(&state_count, i, j) {
                                i_skip = 2;
                                if self.has_skipped {
                                    done = self.have_multiply_confirmed_centers();
                                } else {
                                    let row_skip = self.find_row_skip();
                                    if row_skip > state_count[2] {
                                        // Jump to just above the next
                                        // pattern's expected row.
                                        i += (row_skip - state_count[2]).saturating_sub(i_skip);
                                        j = max_j;
                                    }
                                }
                                state_count = [0; 5];
                                current_state = 0;
                            } else {
                                shift_counts2(&mut state_count);
                                current_state = 3;
                            }
                        } else {
                            shift_counts2(&mut state_count);
                            current_state = 3;
                        }
                    } else {
                        current_state += 1;
                        state_count[current_state] += 1;
                    }
                } else {
                    // White pixel while counting white.
                    state_count[current_state] += 1;
                }
                j += 1;
            }
            // A pattern may end flush against the right edge.
            if Self::found_pattern_cross(&state_count)
                && self.handle_possible_center(&state_count, i, max_j)
            {
                i_skip = state_count[0];
                if self.has_skipped {
                    done = self.have_multiply_confirmed_centers();
                }
            }
            i += i_skip;
        }

        let mut patterns = self.select_best_patterns()?;
        order_best_patterns(&mut patterns);
        Ok(patterns)
    }

    /// Do five runs look like 1:1:3:1:1 with each within 50% of the module?
    fn found_pattern_cross(state_count: &[usize; 5]) -> bool {
        let mut total_module_size = 0usize;
        for &count in state_count {
            if count == 0 {
                return false;
            }
            total_module_size += count;
        }
        if total_module_size < 7 {
            return false;
        }
        let module_size = total_module_size as f32 / 7.0;
        let max_variance = module_size / 2.0;
        (module_size - state_count[0] as f32).abs() < max_variance
            && (module_size - state_count[1] as f32).abs() < max_variance
            && (3.0 * module_size - state_count[2] as f32).abs() < 3.0 * max_variance
            && (module_size - state_count[3] as f32).abs() < max_variance
            && (module_size - state_count[4] as f32).abs() < max_variance
    }

    fn center_from_end(state_count: &[usize; 5], end: usize) -> f32 {
        (end - state_count[4] - state_count[3]) as f32 - state_count[2] as f32 / 2.0
    }

    /// Walk vertically through a horizontal hit; the run pattern must
    /// repeat within 40% of the horizontal total.
    fn cross_check_vertical(
        &self,
        start_i: usize,
        center_j: usize,
        max_count: usize,
        original_total: usize,
    ) -> Option<f32> {
        let image = self.image;
        let max_i = image.height();
        let mut state_count = [0usize; 5];

        let mut i = start_i as isize;
        while i >= 0 && image.get(center_j, i as usize) {
            state_count[2] += 1;
            i -= 1;
        }
        if i < 0 {
            return None;
        }
        while i >= 0 && !image.get(center_j, i as usize) && state_count[1] <= max_count {
            state_count[1] += 1;
            i -= 1;
        }
        if i < 0 || state_count[1] > max_count {
            return None;
        }
        while i >= 0 && image.get(center_j, i as usize) && state_count[0] <= max_count {
            state_count[0] += 1;
            i -= 1;
        }
        if state_count[0] > max_count {
            return None;
        }

        let mut i = start_i + 1;
        while i < max_i && image.get(center_j, i) {
            state_count[2] += 1;
            i += 1;
        }
        if i == max_i {
            return None;
        }
        while i < max_i && !image.get(center_j, i) && state_count[3] < max_count {
            state_count[3] += 1;
            i += 1;
        }
        if i == max_i || state_count[3] >= max_count {
            return None;
        }
        while i < max_i && image.get(center_j, i) && state_count[4] < max_count {
            state_count[4] += 1;
            i += 1;
        }
        if state_count[4] >= max_count {
            return None;
        }

        let total: usize = state_count.iter().sum();
        if 5 * total.abs_diff(original_total) >= 2 * original_total {
            return None;
        }
        if Self::found_pattern_cross(&state_count) {
            Some(Self::center_from_end(&state_count, i))
        } else {
            None
        }
    }

    /// Symmetric re-check through the refined vertical center, with the
    /// tighter 20% tolerance.
    fn cross_check_horizontal(
        &self,
        start_j: usize,
        center_i: usize,
        max_count: usize,
        original_total: usize,
    ) -> Option<f32> {
        let image = self.image;
        let max_j = image.width();
        let mut state_count = [0usize; 5];

        let mut j = start_j as isize;
        while j >= 0 && image.get(j as usize, center_i) {
            state_count[2] += 1;
            j -= 1;
        }
        if j < 0 {
            return None;
        }
        while j >= 0 && !image.get(j as usize, center_i) && state_count[1] <= max_count {
            state_count[1] += 1;
            j -= 1;
        }
        if j < 0 || state_count[1] > max_count {
            return None;
        }
        while j >= 0 && image.get(j as usize, center_i) && state_count[0] <= max_count {
            state_count[0] += 1;
            j -= 1;
        }
        if state_count[0] > max_count {
            return None;
        }

        let mut j = start_j + 1;
        while j < max_j && image.get(j, center_i) {
            state_count[2] += 1;
            j += 1;
        }
        if j == max_j {
            return None;
        }
        while j < max_j && !image.get(j, center_i) && state_count[3] < max_count {
            state_count[3] += 1;
            j += 1;
        }
        if j == max_j || state_count[3] >= max_count {
            return None;
        }
        while j < max_j && image.get(j, center_i) && state_count[4] < max_count {
            state_count[4] += 1;
            j += 1;
        }
        if state_count[4] >= max_count {
            return None;
        }

        let total: usize = state_count.iter().sum();
        if 5 * total.abs_diff(original_total) >= original_total {
            return None;
        }
        if Self::found_pattern_cross(&state_count) {
            Some(Self::center_from_end(&state_count, j))
        } else {
            None
        }
    }

    /// Diagonal cross-check through the candidate center; the total run may
    /// differ from the horizontal one by at most a factor of two.
    fn cross_check_diagonal(&self, center_i: usize, center_j: usize, original_total: usize) -> bool {
        let image = self.image;
        let mut state_count = [0usize; 5];

        // Up and to the left.
        let mut i = 0usize;
        while center_i >= i && center_j >= i && image.get(center_j - i, center_i - i) {
            state_count[2] += 1;
            i += 1;
        }
        if center_i < i || center_j < i {
            return false;
        }
        while center_i >= i && center_j >= i && !image.get(center_j - i, center_i - i) {
            state_count[1] += 1;
            i += 1;
        }
        if center_i < i || center_j < i {
            return false;
        }
        while center_i >= i && center_j >= i && image.get(center_j - i, center_i - i) {
            state_count[0] += 1;
            i += 1;
        }
        if state_count[0] == 0 {
            return false;
        }

        // Down and to the right.
        let max_i = image.height();
        let max_j = image.width();
        let mut i = 1usize;
        while center_i + i < max_i && center_j + i < max_j && image.get(center_j + i, center_i + i)
        {
            state_count[2] += 1;
            i += 1;
        }
        while center_i + i < max_i && center_j + i < max_j && !image.get(center_j + i, center_i + i)
        {
            state_count[3] += 1;
            i += 1;
        }
        if state_count[3] == 0 {
            return false;
        }
        while center_i + i < max_i && center_j + i < max_j && image.get(center_j + i, center_i + i)
        {
            state_count[4] += 1;
            i += 1;
        }
        if state_count[4] == 0 {
            return false;
        }

        let total: usize = state_count.iter().sum();
        total.abs_diff(original_total) < 2 * original_total
            && Self::found_pattern_cross(&state_count)
    }

    /// Run the cross-check ladder on a horizontal hit and merge or record
    /// the confirmed center. Returns whether the candidate survived.
    fn handle_possible_center(&mut self, state_count: &[usize; 5], i: usize, j: usize) -> bool {
        let state_count_total: usize = state_count.iter().sum();
        let center_j = Self::center_from_end(state_count, j);
        let center_i = match self.cross_check_vertical(
            i,
            center_j as usize,
            state_count[2],
            state_count_total,
        ) {
            Some(value) => value,
            None => return false,
        };
        let center_j = match self.cross_check_horizontal(
            center_j as usize,
            center_i as usize,
            state_count[2],
            state_count_total,
        ) {
            Some(value) => value,
            None => return false,
        };
        if !self.cross_check_diagonal(center_i as usize, center_j as usize, state_count_total) {
            return false;
        }

        let estimated_module_size = state_count_total as f32 / 7.0;
        for center in self.possible_centers.iter_mut() {
            if center.about_equals(estimated_module_size, center_i, center_j) {
                *center = center.combine_estimate(center_i, center_j, estimated_module_size);
                return true;
            }
        }
        self.possible_centers
            .push(FinderPattern::new(center_j, center_i, estimated_module_size));
        true
    }

    /// Once two centers are confirmed, most rows between them hold no new
    /// finder pattern; estimate how many can be skipped.
    fn find_row_skip(&mut self) -> usize {
        if self.possible_centers.len() <= 1 {
            return 0;
        }
        let mut first_confirmed: Option<Point> = None;
        for center in &self.possible_centers {
            if center.count >= CENTER_QUORUM {
                match first_confirmed {
                    None => first_confirmed = Some(center.center),
                    Some(first) => {
                        self.has_skipped = true;
                        let skip = ((first.x - center.center.x).abs()
                            - (first.y - center.center.y).abs())
                            / 2.0;
                        return if skip > 0.0 { skip as usize } else { 0 };
                    }
                }
            }
        }
        0
    }

    /// True when at least three confirmed centers agree on module size to
    /// within 5% of their total.
    fn have_multiply_confirmed_centers(&self) -> bool {
        let mut confirmed_count = 0usize;
        let mut total_module_size = 0f32;
        for center in &self.possible_centers {
            if center.count >= CENTER_QUORUM {
                confirmed_count += 1;
                total_module_size += center.estimated_module_size;
            }
        }
        if confirmed_count < 3 {
            return false;
        }
        let average = total_module_size / self.possible_centers.len() as f32;
        let total_deviation: f32 = self
            .possible_centers
            .iter()
            .map(|center| (center.estimated_module_size - average).abs())
            .sum();
        total_deviation <= 0.05 * total_module_size
    }

    /// Of all candidates, pick the three with compatible module sizes whose
    /// triangle is closest to an isosceles right triangle.
    fn select_best_patterns(self) -> Result<[FinderPattern; 3], DecodeError> {
        let mut candidates = self.possible_centers;
        if candidates.len() < 3 {
            return Err(DecodeError::NotFound("too few finder patterns"));
        }
        candidates.sort_by(|a, b| {
            a.estimated_module_size
                .partial_cmp(&b.estimated_module_size)
                .unwrap_or(Ordering::Equal)
        });

        let mut best_distortion = f64::MAX;
        let mut best: Option<[usize; 3]> = None;
        for i in 0..candidates.len() - 2 {
            let min_module_size = candidates[i].estimated_module_size;
            for j in (i + 1)..candidates.len() - 1 {
                let squares0 =
                    candidates[i].center.distance_squared(&candidates[j].center) as f64;
                for k in (j + 1)..candidates.len() {
                    // Sorted by module size, so k carries the maximum.
                    if candidates[k].estimated_module_size > min_module_size * 1.4 {
                        continue;
                    }
                    let mut sides = [
                        squares0,
                        candidates[j].center.distance_squared(&candidates[k].center) as f64,
                        candidates[i].center.distance_squared(&candidates[k].center) as f64,
                    ];
                    sides.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                    // For an isosceles right triangle the squared hypotenuse
                    // is twice each squared leg.
                    let distortion =
                        (sides[2] - 2.0 * sides[1]).abs() + (sides[2] - 2.0 * sides[0]).abs();
                    if distortion < best_distortion {
                        best_distortion = distortion;
                        best = Some([i, j, k]);
                    }
                }
            }
        }

        match best {
            Some([i, j, k]) => Ok([
                candidates[i].clone(),
                candidates[j].clone(),
                candidates[k].clone(),
            ]),
            None => Err(DecodeError::NotFound("no plausible finder triple")),
        }
    }
}

fn shift_counts2(state_count: &mut [usize; 5]) {
    state_count[0] = state_count[2];
    state_count[1] = state_count[3];
    state_count[2] = state_count[4];
    state_count[3] = 1;
    state_count[4] = 0;
}

/// Arrange three patterns as (bottom-left, top-left, top-right): the
/// longest pairwise side joins bottom-left and top-right, and the cross
/// product fixes the handedness.
pub fn order_best_patterns(patterns: &mut [FinderPattern; 3]) {
    let d01 = patterns[0].center.distance(&patterns[1].center);
    let d12 = patterns[1].center.distance(&patterns[2].center);
    let d02 = patterns[0].center.distance(&patterns[2].center);

    let (mut a, b, mut c) = if d12 >= d01 && d12 >= d02 {
        (1, 0, 2)
    } else if d02 >= d12 && d02 >= d01 {
        (0, 1, 2)
    } else {
        (0, 2, 1)
    };
    if cross_product_z(
        &patterns[a].center,
        &patterns[b].center,
        &patterns[c].center,
    ) < 0.0
    {
        std::mem::swap(&mut a, &mut c);
    }

    *patterns = [
        patterns[a].clone(),
        patterns[b].clone(),
        patterns[c].clone(),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Paint a finder pattern (7x7 modules) at the given pixel offset.
    fn draw_finder(matrix: &mut BitMatrix, left: usize, top: usize, scale: usize) {
        const PATTERN: [[u8; 7]; 7] = [
            [1, 1, 1, 1, 1, 1, 1],
            [1, 0, 0, 0, 0, 0, 1],
            [1, 0, 1, 1, 1, 0, 1],
            [1, 0, 1, 1, 1, 0, 1],
            [1, 0, 1, 1, 1, 0, 1],
            [1, 0, 0, 0, 0, 0, 1],
            [1, 1, 1, 1, 1, 1, 1],
        ];
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

    fn center_of(left: usize, top: usize, scale: usize) -> Point {
        Point::new(left as f32 + 3.5 * scale as f32, top as f32 + 3.5 * scale as f32)
    }

    #[test]
    fn test_finds_and_orders_three_patterns() {
        let mut matrix = BitMatrix::new(160, 160);
        draw_finder(&mut matrix, 10, 10, 4);
        draw_finder(&mut matrix, 120, 10, 4);
        draw_finder(&mut matrix, 10, 120, 4);

        let patterns = FinderPatternFinder::new(&matrix).find().unwrap();
        let [bottom_left, top_left, top_right] = &patterns;

        let expect_tl = center_of(10, 10, 4);
        let expect_tr = center_of(120, 10, 4);
        let expect_bl = center_of(10, 120, 4);
        assert!(top_left.center.distance(&expect_tl) < 2.0);
        assert!(top_right.center.distance(&expect_tr) < 2.0);
        assert!(bottom_left.center.distance(&expect_bl) < 2.0);

        // Ordering invariants: the diagonal is the longest side and the
        // triangle is right-handed.
        let diagonal = bottom_left.center.distance(&top_right.center);
        assert!(top_left.center.distance(&bottom_left.center) <= diagonal);
        assert!(top_left.center.distance(&top_right.center) <= diagonal);
        assert!(
            cross_product_z(&bottom_left.center, &top_left.center, &top_right.center) >= 0.0
        );

        for pattern in &patterns {
            assert!((pattern.estimated_module_size - 4.0).abs() < 1.0);
        }
    }

    #[test]
    fn test_blank_image_finds_nothing() {
        let matrix = BitMatrix::new(100, 100);
        assert!(matches!(
            FinderPatternFinder::new(&matrix).find(),
            Err(DecodeError::NotFound(_))
        ));
    }

    #[test]
    fn test_found_pattern_cross_ratios() {
        assert!(FinderPatternFinder::found_pattern_cross(&[4, 4, 12, 4, 4]));
        assert!(FinderPatternFinder::found_pattern_cross(&[1, 1, 3, 1, 1]));
        assert!(!FinderPatternFinder::found_pattern_cross(&[4, 4, 4, 4, 4]));
        assert!(!FinderPatternFinder::found_pattern_cross(&[0, 4, 12, 4, 4]));
        assert!(!FinderPatternFinder::found_pattern_cross(&[1, 1, 1, 1, 1]));
    }

    #[test]
    fn test_candidate_merging() {
        let pattern = FinderPattern::new(50.0, 40.0, 4.0);
        assert!(pattern.about_equals(4.2, 41.0, 51.0));
        assert!(!pattern.about_equals(4.2, 60.0, 51.0));
        let merged = pattern.combine_estimate(42.0, 52.0, 5.0);
        assert_eq!(merged.count, 2);
        assert!((merged.center.x - 51.0).abs() < 1e-4);
        assert!((merged.center.y - 41.0).abs() < 1e-4);
        assert!((merged.estimated_module_size - 4.5).abs() < 1e-4);
    }
}
