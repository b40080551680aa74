//! Extraction of format info, version info and codewords from a sampled
//! module grid.

use crate::error::DecodeError;
use crate::models::BitMatrix;

use super::format::FormatInformation;
use super::version::Version;

/// Parser over one sampled grid. Owns a mutable copy of the matrix: reading
/// codewords removes the data mask in place, and the mirrored retry
/// transposes it.
pub struct BitMatrixParser {
    bits: BitMatrix,
    parsed_version: Option<Version>,
    parsed_format_info: Option<FormatInformation>,
    mirror: bool,
}

impl BitMatrixParser {
    pub fn new(bits: BitMatrix) -> Result<Self, DecodeError> {
        let dimension = bits.height();
        if dimension < 21 || dimension % 4 != 1 {
            return Err(DecodeError::Format("invalid grid dimension"));
        }
        Ok(Self {
            bits,
            parsed_version: None,
            parsed_format_info: None,
            mirror: false,
        })
    }

    /// When mirrored, read (j, i) in place of (i, j); the grid itself is
    /// only transposed later, for the codeword pass.
    fn copy_bit(&self, i: usize, j: usize, bits_acc: u32) -> u32 {
        let bit = if self.mirror {
            self.bits.get(j, i)
        } else {
            self.bits.get(i, j)
        };
        (bits_acc << 1) | bit as u32
    }

    /// Assemble and decode the two 15-bit format words.
    pub fn read_format_information(&mut self) -> Result<FormatInformation, DecodeError> {
        if let Some(info) = self.parsed_format_info {
            return Ok(info);
        }

        // Copy one: around the top-left finder pattern.
        let mut format_info_bits1 = 0u32;
        for i in 0..6 {
            format_info_bits1 = self.copy_bit(i, 8, format_info_bits1);
        }
        format_info_bits1 = self.copy_bit(7, 8, format_info_bits1);
        format_info_bits1 = self.copy_bit(8, 8, format_info_bits1);
        format_info_bits1 = self.copy_bit(8, 7, format_info_bits1);
        for j in (0..6).rev() {
            format_info_bits1 = self.copy_bit(8, j, format_info_bits1);
        }

        // Copy two: split across the top-right and bottom-left corners.
        let dimension = self.bits.height();
        let mut format_info_bits2 = 0u32;
        let j_min = dimension - 7;
        for j in (j_min..dimension).rev() {
            format_info_bits2 = self.copy_bit(8, j, format_info_bits2);
        }
        for i in (dimension - 8)..dimension {
            format_info_bits2 = self.copy_bit(i, 8, format_info_bits2);
        }

        let info = FormatInformation::decode(format_info_bits1, format_info_bits2)?;
        self.parsed_format_info = Some(info);
        Ok(info)
    }

    /// Determine the version, from the dimension alone below version 7 and
    /// from the two 18-bit version blocks above.
    pub fn read_version(&mut self) -> Result<Version, DecodeError> {
        if let Some(version) = self.parsed_version {
            return Ok(version);
        }

        let dimension = self.bits.height();
        let provisional = (dimension - 17) / 4;
        if provisional <= 6 {
            return Version::new(provisional as u8);
        }

        // Top-right 3x6 block.
        let ij_min = dimension - 11;
        let mut version_bits = 0u32;
        for j in (0..6).rev() {
            for i in (ij_min..=dimension - 9).rev() {
                version_bits = self.copy_bit(i, j, version_bits);
            }
        }
        if let Ok(version) = Version::decode_version_information(version_bits) {
            if version.dimension() == dimension {
                self.parsed_version = Some(version);
                return Ok(version);
            }
        }

        // Bottom-left 6x3 block.
        let mut version_bits = 0u32;
        for i in (0..6).rev() {
            for j in (ij_min..=dimension - 9).rev() {
                version_bits = self.copy_bit(i, j, version_bits);
            }
        }
        if let Ok(version) = Version::decode_version_information(version_bits) {
            if version.dimension() == dimension {
                self.parsed_version = Some(version);
                return Ok(version);
            }
        }
        Err(DecodeError::Format("version information unreadable"))
    }

    /// Remove the data mask and stream the codewords out of the zig-zag
    /// traversal: right-to-left column pairs, alternating up and down,
    /// skipping the vertical timing column and all function modules.
    pub fn read_codewords(&mut self) -> Result<Vec<u8>, DecodeError> {
        let format_info = self.read_format_information()?;
        let version = self.read_version()?;

        let dimension = self.bits.height();
        self.bits.unmask(dimension, format_info.mask_pattern);
        let function_pattern = version.build_function_pattern()?;

        let mut result = Vec::with_capacity(version.total_codewords());
        let mut reading_up = true;
        let mut current_byte = 0u32;
        let mut bits_read = 0u32;
        let mut j = dimension - 1;
        loop {
            if j == 6 {
                // Skip the vertical timing column entirely.
                j -= 1;
            }
            for count in 0..dimension {
                let i = if reading_up { dimension - 1 - count } else { count };
                for col in 0..2 {
                    let x = j - col;
                    if !function_pattern.get(x, i) {
                        bits_read += 1;
                        current_byte <<= 1;
                        if self.bits.get(x, i) {
                            current_byte |= 1;
                        }
                        if bits_read == 8 {
                            result.push(current_byte as u8);
                            bits_read = 0;
                            current_byte = 0;
                        }
                    }
                }
            }
            reading_up = !reading_up;
            if j < 3 {
                break;
            }
            j -= 2;
        }

        if result.len() != version.total_codewords() {
            return Err(DecodeError::Format("codeword count mismatch"));
        }
        Ok(result)
    }

    /// Re-apply the data mask, undoing a `read_codewords` pass that ended in
    /// failure so a second attempt starts from the original grid.
    pub fn remask(&mut self) {
        if let Some(info) = self.parsed_format_info {
            let dimension = self.bits.height();
            self.bits.unmask(dimension, info.mask_pattern);
        }
    }

    /// Enter or leave mirrored reading; forgets cached format/version data.
    pub fn set_mirror(&mut self, mirror: bool) {
        self.parsed_version = None;
        self.parsed_format_info = None;
        self.mirror = mirror;
    }

    /// Transpose the grid in place.
    pub fn mirror(&mut self) {
        self.bits.mirror();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_rejects_bad_dimensions() {
        assert!(BitMatrixParser::new(BitMatrix::new(20, 20)).is_err());
        assert!(BitMatrixParser::new(BitMatrix::new(24, 24)).is_err());
        assert!(BitMatrixParser::new(BitMatrix::new(21, 21)).is_ok());
    }

    #[test]
    fn test_reads_format_version_and_codewords() {
        let segments = vec![qrcodegen::QrSegment::make_bytes(b"format parser test")];
        let qr = qrcodegen::QrCode::encode_segments_advanced(
            &segments,
            qrcodegen::QrCodeEcc::Quartile,
            qrcodegen::Version::new(7),
            qrcodegen::Version::new(7),
            None,
            false,
        )
        .unwrap();

        let mut parser = BitMatrixParser::new(matrix_from_qrcodegen(&qr)).unwrap();
        let version = parser.read_version().unwrap();
        assert_eq!(version.number(), 7);
        let format = parser.read_format_information().unwrap();
        assert_eq!(format.ec_level, crate::models::ECLevel::Q);
        let codewords = parser.read_codewords().unwrap();
        assert_eq!(codewords.len(), version.total_codewords());
    }

    #[test]
    fn test_mirrored_read_of_transposed_grid() {
        let segments = vec![qrcodegen::QrSegment::make_bytes(b"mirror")];
        let qr = qrcodegen::QrCode::encode_segments_advanced(
            &segments,
            qrcodegen::QrCodeEcc::Medium,
            qrcodegen::Version::new(2),
            qrcodegen::Version::new(2),
            None,
            false,
        )
        .unwrap();

        let mut transposed = matrix_from_qrcodegen(&qr);
        transposed.mirror();

        let mut parser = BitMatrixParser::new(transposed).unwrap();
        parser.set_mirror(true);
        let format = parser.read_format_information().unwrap();
        assert_eq!(format.ec_level, crate::models::ECLevel::M);
        parser.mirror();
        let codewords = parser.read_codewords().unwrap();
        assert_eq!(codewords.len(), 44);
    }
}
