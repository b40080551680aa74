//! Pure Rust QR code reader.
//!
//! Takes a greyscale luminance raster, binarizes it, locates a single QR
//! symbol (rotated, skewed, mirrored or partially damaged), reconstructs
//! its module grid, error-corrects the codewords and extracts the payload.

#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// QR decoding modules (error correction, format extraction, data modes)
pub mod decoder;
/// QR detection modules (finder patterns, alignment, grid sampling)
pub mod detector;
/// Core data structures (QRCode, BitMatrix, Point, etc.)
pub mod models;
/// Imaging utilities (luminance sources, binarization, geometry)
pub mod utils;

mod error;

pub use decoder::{Decoder, Version};
pub use detector::Detector;
pub use error::DecodeError;
pub use models::{BitMatrix, ECLevel, MaskPattern, Point, QRCode, StructuredAppend};
pub use utils::luminance::{GreyImage, LuminanceSource};

/// Decode the QR code in a greyscale raster.
///
/// Runs the full pipeline: binarization, finder/alignment detection, grid
/// sampling and codeword decoding, with a mirrored re-read on failure.
pub fn decode(source: &GreyImage) -> Result<QRCode, DecodeError> {
    let binary = utils::binarization::binarize(source)?;
    let detected = Detector::new(&binary).detect()?;
    let mut qr = Decoder::decode(&detected.bits)?;
    qr.position = detected.points;
    Ok(qr)
}

/// Decode from a row-major greyscale buffer (1 byte per pixel).
pub fn decode_luminance(gray: &[u8], width: usize, height: usize) -> Result<QRCode, DecodeError> {
    decode(&GreyImage::new(gray.to_vec(), width, height)?)
}

/// Decode from a packed RGB buffer (3 bytes per pixel).
pub fn decode_rgb(rgb: &[u8], width: usize, height: usize) -> Result<QRCode, DecodeError> {
    decode(&GreyImage::from_rgb(rgb, width, height)?)
}

/// Decode from a packed RGBA buffer (4 bytes per pixel, alpha ignored).
pub fn decode_rgba(rgba: &[u8], width: usize, height: usize) -> Result<QRCode, DecodeError> {
    decode(&GreyImage::from_rgba(rgba, width, height)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_image_is_not_found() {
        let gray = vec![255u8; 100 * 100];
        assert!(matches!(
            decode_luminance(&gray, 100, 100),
            Err(DecodeError::NotFound(_))
        ));
    }

    #[test]
    fn test_buffer_size_is_validated() {
        assert!(matches!(
            decode_luminance(&[0u8; 10], 100, 100),
            Err(DecodeError::InvalidArgument(_))
        ));
    }
}
