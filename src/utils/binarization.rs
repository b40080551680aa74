//! Luminance → bit-matrix conversion.
//!
//! Two strategies: a global-histogram threshold for tiny images and a
//! block-local adaptive threshold for everything else. Both mark a module
//! dark when its luminance falls at or below the estimated black point.

use crate::error::DecodeError;
use crate::models::BitMatrix;
use crate::utils::luminance::LuminanceSource;

/// Below this size per side the 8x8 block grid is too coarse to smooth, so
/// the global histogram takes over.
const MINIMUM_DIMENSION: usize = 40;

const BLOCK_SIZE_POWER: usize = 3;
const BLOCK_SIZE: usize = 1 << BLOCK_SIZE_POWER;

/// Blocks whose luminance spread stays within this range count as blank.
const MIN_DYNAMIC_RANGE: i32 = 24;

const LUMINANCE_BUCKETS: usize = 32;
const LUMINANCE_SHIFT: usize = 3;

/// Binarize a luminance source, choosing the strategy by image size.
pub fn binarize<S: LuminanceSource>(source: &S) -> Result<BitMatrix, DecodeError> {
    if source.width() < MINIMUM_DIMENSION || source.height() < MINIMUM_DIMENSION {
        histogram_binarize(source)
    } else {
        block_binarize(source)
    }
}

/// Global-histogram binarization: estimate one black point from a handful
/// of sampled rows, then threshold every pixel against it.
pub fn histogram_binarize<S: LuminanceSource>(source: &S) -> Result<BitMatrix, DecodeError> {
    let width = source.width();
    let height = source.height();
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidArgument("empty luminance source"));
    }

    let mut buckets = [0u32; LUMINANCE_BUCKETS];
    let mut row_buf = Vec::new();
    for k in 1..5 {
        let y = height * k / 5;
        source.row(y, &mut row_buf);
        let right = width * 4 / 5;
        for &pixel in &row_buf[width / 5..right] {
            buckets[(pixel >> LUMINANCE_SHIFT) as usize] += 1;
        }
    }
    let black_point = estimate_black_point(&buckets)?;

    let luminances = source.matrix();
    let mut matrix = BitMatrix::new(width, height);
    for y in 0..height {
        let offset = y * width;
        for x in 0..width {
            if (luminances[offset + x] as u32) < black_point {
                matrix.set(x, y);
            }
        }
    }
    Ok(matrix)
}

/// Find the valley between the two dominant histogram peaks.
fn estimate_black_point(buckets: &[u32; LUMINANCE_BUCKETS]) -> Result<u32, DecodeError> {
    let mut max_bucket_count = 0u32;
    let mut first_peak = 0usize;
    let mut first_peak_size = 0u32;
    for (x, &count) in buckets.iter().enumerate() {
        if count > first_peak_size {
            first_peak = x;
            first_peak_size = count;
        }
        if count > max_bucket_count {
            max_bucket_count = count;
        }
    }

    // Second peak: tall and far from the first.
    let mut second_peak = 0usize;
    let mut second_peak_score = 0u64;
    for (x, &count) in buckets.iter().enumerate() {
        let distance = x.abs_diff(first_peak) as u64;
        let score = count as u64 * distance * distance;
        if score > second_peak_score {
            second_peak = x;
            second_peak_score = score;
        }
    }

    let (first_peak, second_peak) = if first_peak > second_peak {
        (second_peak, first_peak)
    } else {
        (first_peak, second_peak)
    };
    if second_peak - first_peak <= LUMINANCE_BUCKETS / 16 {
        return Err(DecodeError::NotFound("luminance histogram lacks two peaks"));
    }

    let mut best_valley = second_peak - 1;
    let mut best_valley_score = -1i64;
    for x in (first_peak + 1..second_peak).rev() {
        let from_first = (x - first_peak) as i64;
        let score = from_first
            * from_first
            * (second_peak - x) as i64
            * (max_bucket_count - buckets[x]) as i64;
        if score > best_valley_score {
            best_valley = x;
            best_valley_score = score;
        }
    }
    Ok((best_valley as u32) << LUMINANCE_SHIFT)
}

/// Block-local adaptive binarization over an 8x8 tiling.
pub fn block_binarize<S: LuminanceSource>(source: &S) -> Result<BitMatrix, DecodeError> {
    let width = source.width();
    let height = source.height();
    if width < MINIMUM_DIMENSION || height < MINIMUM_DIMENSION {
        return Err(DecodeError::InvalidArgument("image too small for block grid"));
    }

    let luminances = source.matrix();
    let sub_width = width.div_ceil(BLOCK_SIZE);
    let sub_height = height.div_ceil(BLOCK_SIZE);
    let black_points = calculate_black_points(&luminances, sub_width, sub_height, width, height);

    let mut matrix = BitMatrix::new(width, height);
    apply_thresholds(
        &luminances,
        &black_points,
        sub_width,
        sub_height,
        width,
        height,
        &mut matrix,
    );
    Ok(matrix)
}

/// Per-block black point: the block mean when the block has contrast, else a
/// blend of the already-computed neighbours so blank regions inherit the
/// surrounding estimate.
fn calculate_black_points(
    luminances: &[u8],
    sub_width: usize,
    sub_height: usize,
    width: usize,
    height: usize,
) -> Vec<Vec<i32>> {
    let max_x_offset = width - BLOCK_SIZE;
    let max_y_offset = height - BLOCK_SIZE;
    let mut black_points = vec![vec![0i32; sub_width]; sub_height];

    for y in 0..sub_height {
        let yoffset = (y << BLOCK_SIZE_POWER).min(max_y_offset);
        for x in 0..sub_width {
            let xoffset = (x << BLOCK_SIZE_POWER).min(max_x_offset);
            let mut sum = 0i32;
            let mut min = 255i32;
            let mut max = 0i32;
            for yy in 0..BLOCK_SIZE {
                let offset = (yoffset + yy) * width + xoffset;
                for &pixel in &luminances[offset..offset + BLOCK_SIZE] {
                    let pixel = pixel as i32;
                    sum += pixel;
                    if pixel < min {
                        min = pixel;
                    }
                    if pixel > max {
                        max = pixel;
                    }
                }
            }

            let mut average = sum >> (BLOCK_SIZE_POWER * 2);
            if max - min <= MIN_DYNAMIC_RANGE {
                // Low contrast: assume white, a hair below the darkest pixel.
                average = min / 2;
                if y > 0 && x > 0 {
                    let neighbour_average = (black_points[y - 1][x]
                        + 2 * black_points[y][x - 1]
                        + black_points[y - 1][x - 1])
                        / 4;
                    if min < neighbour_average {
                        average = neighbour_average;
                    }
                }
            }
            black_points[y][x] = average;
        }
    }
    black_points
}

fn apply_thresholds(
    luminances: &[u8],
    black_points: &[Vec<i32>],
    sub_width: usize,
    sub_height: usize,
    width: usize,
    height: usize,
    matrix: &mut BitMatrix,
) {
    let max_x_offset = width - BLOCK_SIZE;
    let max_y_offset = height - BLOCK_SIZE;
    for y in 0..sub_height {
        let yoffset = (y << BLOCK_SIZE_POWER).min(max_y_offset);
        let top = y.clamp(2, sub_height - 3);
        for x in 0..sub_width {
            let xoffset = (x << BLOCK_SIZE_POWER).min(max_x_offset);
            let left = x.clamp(2, sub_width - 3);
            let mut sum = 0i32;
            for row in &black_points[top - 2..=top + 2] {
                for &point in &row[left - 2..=left + 2] {
                    sum += point;
                }
            }
            threshold_block(luminances, xoffset, yoffset, sum / 25, width, matrix);
        }
    }
}

/// `<=` rather than `<` so zero-luminance pixels stay black under a zero
/// threshold.
fn threshold_block(
    luminances: &[u8],
    xoffset: usize,
    yoffset: usize,
    threshold: i32,
    stride: usize,
    matrix: &mut BitMatrix,
) {
    for yy in 0..BLOCK_SIZE {
        let offset = (yoffset + yy) * stride + xoffset;
        for xx in 0..BLOCK_SIZE {
            if (luminances[offset + xx] as i32) <= threshold {
                matrix.set(xoffset + xx, yoffset + yy);
            }
        }
    }
}
