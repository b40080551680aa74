//! Greyscale raster abstraction consumed by the binarizer.

use std::sync::Arc;

use rayon::prelude::*;

use crate::error::DecodeError;

/// Images at or above this size convert channels to luminance row-parallel.
const PARALLEL_MIN_PIXELS: usize = 1 << 20;

/// Read-only view of a greyscale raster.
///
/// `row` and `matrix` must agree: for every in-range pixel the value seen
/// through either accessor is identical.
pub trait LuminanceSource {
    /// View width in pixels.
    fn width(&self) -> usize;

    /// View height in pixels.
    fn height(&self) -> usize;

    /// Copy one row of luminances into `buf`, resizing it to `width`.
    fn row(&self, y: usize, buf: &mut Vec<u8>);

    /// The whole view as a row-major buffer of `width * height` luminances.
    fn matrix(&self) -> Vec<u8>;

    /// A new view of a sub-rectangle of this source.
    fn crop(
        &self,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

/// Greyscale raster with shared immutable pixels; cropping produces another
/// window over the same buffer.
#[derive(Debug, Clone)]
pub struct GreyImage {
    pixels: Arc<[u8]>,
    stride: usize,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
}

impl GreyImage {
    /// Wrap a row-major luminance buffer. The buffer length must be exactly
    /// `width * height`.
    pub fn new(pixels: Vec<u8>, width: usize, height: usize) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(DecodeError::InvalidArgument("pixel buffer size mismatch"));
        }
        Ok(Self {
            pixels: pixels.into(),
            stride: width,
            left: 0,
            top: 0,
            width,
            height,
        })
    }

    /// Convert a packed RGB buffer (3 bytes per pixel).
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Result<Self, DecodeError> {
        if rgb.len() != width * height * 3 {
            return Err(DecodeError::InvalidArgument("rgb buffer size mismatch"));
        }
        Self::new(channels_to_luminance(rgb, width, height, 3), width, height)
    }

    /// Convert a packed RGBA buffer (4 bytes per pixel, alpha ignored).
    pub fn from_rgba(rgba: &[u8], width: usize, height: usize) -> Result<Self, DecodeError> {
        if rgba.len() != width * height * 4 {
            return Err(DecodeError::InvalidArgument("rgba buffer size mismatch"));
        }
        Self::new(channels_to_luminance(rgba, width, height, 4), width, height)
    }
}

impl LuminanceSource for GreyImage {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn row(&self, y: usize, buf: &mut Vec<u8>) {
        debug_assert!(y < self.height);
        let start = (self.top + y) * self.stride + self.left;
        buf.clear();
        buf.extend_from_slice(&self.pixels[start..start + self.width]);
    }

    fn matrix(&self) -> Vec<u8> {
        if self.left == 0 && self.top == 0 && self.stride == self.width {
            return self.pixels.to_vec();
        }
        let mut out = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            let start = (self.top + y) * self.stride + self.left;
            out.extend_from_slice(&self.pixels[start..start + self.width]);
        }
        out
    }

    fn crop(
        &self,
        left: usize,
        top: usize,
        width: usize,
        height: usize,
    ) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 || left + width > self.width || top + height > self.height {
            return Err(DecodeError::InvalidArgument("crop outside source"));
        }
        Ok(Self {
            pixels: Arc::clone(&self.pixels),
            stride: self.stride,
            left: self.left + left,
            top: self.top + top,
            width,
            height,
        })
    }
}

/// Luminance of one pixel: greys pass through, colour averages the channels
/// with green weighted double.
#[inline]
fn pixel_luminance(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        r
    } else {
        ((r as u16 + 2 * g as u16 + b as u16) / 4) as u8
    }
}

fn channels_to_luminance(data: &[u8], width: usize, height: usize, channels: usize) -> Vec<u8> {
    let mut grey = vec![0u8; width * height];
    if width * height >= PARALLEL_MIN_PIXELS {
        grey.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
            let row_start = y * width * channels;
            for (x, out) in row.iter_mut().enumerate() {
                let idx = row_start + x * channels;
                *out = pixel_luminance(data[idx], data[idx + 1], data[idx + 2]);
            }
        });
    } else {
        for (out, px) in grey.iter_mut().zip(data.chunks_exact(channels)) {
            *out = pixel_luminance(px[0], px[1], px[2]);
        }
    }
    grey
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grey_passthrough_and_weighted_average() {
        assert_eq!(pixel_luminance(200, 200, 200), 200);
        // (100 + 2*50 + 20) / 4 = 55
        assert_eq!(pixel_luminance(100, 50, 20), 55);
    }

    #[test]
    fn test_from_rgb() {
        let rgb = vec![10, 10, 10, 100, 50, 20];
        let img = GreyImage::from_rgb(&rgb, 2, 1).unwrap();
        assert_eq!(img.matrix(), vec![10, 55]);
    }

    #[test]
    fn test_row_and_matrix_agree() {
        let pixels: Vec<u8> = (0..48).map(|v| v as u8).collect();
        let img = GreyImage::new(pixels, 8, 6).unwrap();
        let matrix = img.matrix();
        let mut buf = Vec::new();
        for y in 0..6 {
            img.row(y, &mut buf);
            assert_eq!(&buf[..], &matrix[y * 8..(y + 1) * 8]);
        }
    }

    #[test]
    fn test_crop_views_same_pixels() {
        let pixels: Vec<u8> = (0..64).map(|v| v as u8).collect();
        let img = GreyImage::new(pixels, 8, 8).unwrap();
        let crop = img.crop(2, 3, 4, 2).unwrap();
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.matrix(), vec![26, 27, 28, 29, 34, 35, 36, 37]);

        let mut buf = Vec::new();
        crop.row(1, &mut buf);
        assert_eq!(buf, vec![34, 35, 36, 37]);

        // Crop of a crop stays anchored to the original buffer.
        let inner = crop.crop(1, 1, 2, 1).unwrap();
        assert_eq!(inner.matrix(), vec![35, 36]);
        assert!(crop.crop(3, 0, 4, 1).is_err());
    }
}
