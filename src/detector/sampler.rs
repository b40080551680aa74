//! Grid sampling: read one bit per module center through the perspective
//! transform.

use crate::error::DecodeError;
use crate::models::BitMatrix;
use crate::utils::geometry::PerspectiveTransform;

/// Sample a `dimension` x `dimension` grid of module centers from `image`.
///
/// Points that land exactly one pixel outside the image are nudged back in;
/// anything further out means the transform is off and the symbol is
/// treated as not found.
pub fn sample_grid(
    image: &BitMatrix,
    transform: &PerspectiveTransform,
    dimension: usize,
) -> Result<BitMatrix, DecodeError> {
    if dimension == 0 {
        return Err(DecodeError::InvalidArgument("empty sampling grid"));
    }
    let width = image.width();
    let height = image.height();
    let mut bits = BitMatrix::new(dimension, dimension);
    let mut points = vec![0f32; 2 * dimension];

    for y in 0..dimension {
        let i_value = y as f32 + 0.5;
        for x in 0..dimension {
            points[2 * x] = x as f32 + 0.5;
            points[2 * x + 1] = i_value;
        }
        transform.transform_points(&mut points);
        check_and_nudge_points(width, height, &mut points)?;

        for x in 0..dimension {
            let px = points[2 * x] as isize;
            let py = points[2 * x + 1] as isize;
            if px < 0 || py < 0 || px >= width as isize || py >= height as isize {
                // A twisted transform can still escape after nudging.
                return Err(DecodeError::NotFound("sample point outside image"));
            }
            if image.get(px as usize, py as usize) {
                bits.set(x, y);
            }
        }
    }
    Ok(bits)
}

/// Move points sitting at -1 or at width/height one pixel into range. The
/// scan runs from both ends and stops at the first interior point, since
/// only the row's extremes can legitimately protrude.
fn check_and_nudge_points(
    width: usize,
    height: usize,
    points: &mut [f32],
) -> Result<(), DecodeError> {
    let width_i = width as isize;
    let height_i = height as isize;

    let mut nudged = true;
    let mut offset = 0;
    while offset + 1 < points.len() && nudged {
        let x = points[offset] as isize;
        let y = points[offset + 1] as isize;
        if x < -1 || x > width_i || y < -1 || y > height_i {
            return Err(DecodeError::NotFound("transform maps outside image"));
        }
        nudged = false;
        if x == -1 {
            points[offset] = 0.0;
            nudged = true;
        } else if x == width_i {
            points[offset] = width as f32 - 1.0;
            nudged = true;
        }
        if y == -1 {
            points[offset + 1] = 0.0;
            nudged = true;
        } else if y == height_i {
            points[offset + 1] = height as f32 - 1.0;
            nudged = true;
        }
        offset += 2;
    }

    nudged = true;
    let mut offset = points.len() - 2;
    loop {
        let x = points[offset] as isize;
        let y = points[offset + 1] as isize;
        if x < -1 || x > width_i || y < -1 || y > height_i {
            return Err(DecodeError::NotFound("transform maps outside image"));
        }
        nudged = false;
        if x == -1 {
            points[offset] = 0.0;
            nudged = true;
        } else if x == width_i {
            points[offset] = width as f32 - 1.0;
            nudged = true;
        }
        if y == -1 {
            points[offset + 1] = 0.0;
            nudged = true;
        } else if y == height_i {
            points[offset + 1] = height as f32 - 1.0;
            nudged = true;
        }
        if !nudged || offset < 2 {
            break;
        }
        offset -= 2;
    }
    Ok(())
}
