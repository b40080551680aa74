//! The coding pipeline: from a sampled module grid to the decoded payload.
//!
//! Format/version extraction, data-mask removal, codeword de-interleaving,
//! Reed-Solomon correction and bitstream parsing.

pub mod bit_source;
pub mod bitstream;
pub mod data_block;
pub mod eci;
pub mod format;
pub mod gf256;
pub mod gf_poly;
pub mod modes;
pub mod parser;
pub mod reed_solomon;
pub mod version;

pub use format::FormatInformation;
pub use parser::BitMatrixParser;
pub use reed_solomon::ReedSolomonDecoder;
pub use version::{EcBlockInfo, Version};

use crate::error::DecodeError;
use crate::models::{BitMatrix, QRCode};

/// Decoder for a sampled, axis-aligned module grid.
pub struct Decoder;

impl Decoder {
    /// Decode a grid into its payload.
    ///
    /// A first pass reads the grid as-is. If anything fails, a second pass
    /// re-reads it transposed, which recovers mirrored symbols; when that
    /// fails too, the error of the first pass is surfaced.
    pub fn decode(bits: &BitMatrix) -> Result<QRCode, DecodeError> {
        let mut parser = BitMatrixParser::new(bits.clone())?;
        match Self::decode_parser(&mut parser, false) {
            Ok(qr) => Ok(qr),
            Err(first_error) => {
                Self::decode_mirrored(&mut parser).map_err(|_| first_error)
            }
        }
    }

    fn decode_mirrored(parser: &mut BitMatrixParser) -> Result<QRCode, DecodeError> {
        parser.remask();
        parser.set_mirror(true);
        parser.read_version()?;
        parser.read_format_information()?;
        parser.mirror();
        Self::decode_parser(parser, true)
    }

    fn decode_parser(parser: &mut BitMatrixParser, mirrored: bool) -> Result<QRCode, DecodeError> {
        let version = parser.read_version()?;
        let format_info = parser.read_format_information()?;
        let codewords = parser.read_codewords()?;
        let blocks = data_block::build_data_blocks(&codewords, version, format_info.ec_level)?;

        let total_data: usize = blocks.iter().map(|block| block.num_data_codewords).sum();
        let mut data_bytes = Vec::with_capacity(total_data);
        for block in blocks {
            let num_data_codewords = block.num_data_codewords;
            let two_s = block.codewords.len() - num_data_codewords;
            let corrected = ReedSolomonDecoder::new(two_s).decode(block.codewords)?;
            data_bytes.extend_from_slice(&corrected[..num_data_codewords]);
        }

        let stream = bitstream::decode(&data_bytes, version)?;
        Ok(QRCode {
            text: stream.text,
            raw_bytes: data_bytes,
            byte_segments: stream.byte_segments,
            version,
            ec_level: format_info.ec_level,
            mask_pattern: format_info.mask_pattern,
            structured_append: stream.structured_append,
            mirrored,
            position: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ECLevel;

    fn matrix_from_qrcodegen(qr: &qrcodegen::QrCode) -> BitMatrix {
        let size = qr.size() as usize;
        let mut matrix = BitMatrix::new(size, size);
        for y in 0..size {
            for x in 0..size {
                if qr.get_module(x as i32, y as i32) {
                    matrix.set(x, y);
                }
            }
        }
        matrix
    }

    fn encode(text: &str, ecc: qrcodegen::QrCodeEcc) -> BitMatrix {
        let qr = qrcodegen::QrCode::encode_text(text, ecc).unwrap();
        matrix_from_qrcodegen(&qr)
    }

    #[test]
    fn test_decodes_byte_mode_grid() {
        let qr = Decoder::decode(&encode("Decoder test payload", qrcodegen::QrCodeEcc::Medium))
            .unwrap();
        assert_eq!(qr.text, "Decoder test payload");
        assert!(!qr.mirrored);
        assert_eq!(qr.byte_segments.len(), 1);
    }

    #[test]
    fn test_decodes_transposed_grid_as_mirrored() {
        let mut matrix = encode("mirror me", qrcodegen::QrCodeEcc::Low);
        matrix.mirror();
        let qr = Decoder::decode(&matrix).unwrap();
        assert_eq!(qr.text, "mirror me");
        assert!(qr.mirrored);
    }

    #[test]
    fn test_numeric_grid() {
        // Pin the version and level so the wire metadata is predictable.
        let segments = vec![qrcodegen::QrSegment::make_numeric("31415926535")];
        let encoded = qrcodegen::QrCode::encode_segments_advanced(
            &segments,
            qrcodegen::QrCodeEcc::Quartile,
            qrcodegen::Version::new(1),
            qrcodegen::Version::new(5),
            None,
            false,
        )
        .unwrap();
        let qr = Decoder::decode(&matrix_from_qrcodegen(&encoded)).unwrap();
        assert_eq!(qr.text, "31415926535");
        assert!(qr.byte_segments.is_empty());
        assert_eq!(qr.ec_level, ECLevel::Q);
    }

    #[test]
    fn test_garbage_grid_fails_with_first_error() {
        let mut matrix = BitMatrix::new(21, 21);
        for k in 0..21 {
            matrix.set(k, (k * 7) % 21);
        }
        assert!(Decoder::decode(&matrix).is_err());
    }
}
