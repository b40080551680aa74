//! QR symbol versions and the ISO 18004 tables keyed by them.

use crate::error::DecodeError;
use crate::models::{BitMatrix, ECLevel};

/// Version-info codewords for versions 7..=40: 6 data bits + 12 BCH bits.
const VERSION_DECODE_LOOKUP: [u32; 34] = [
    0x07C94, 0x085BC, 0x09A99, 0x0A4D3, 0x0BBF6, 0x0C762, 0x0D847, 0x0E60D, 0x0F928, 0x10B78,
    0x1145D, 0x12A17, 0x13532, 0x149A6, 0x15683, 0x168C9, 0x177EC, 0x18EC4, 0x191E1, 0x1AFAB,
    0x1B08E, 0x1CC1A, 0x1D33F, 0x1ED75, 0x1F250, 0x209D5, 0x216F0, 0x228BA, 0x2379F, 0x24B0B,
    0x2542E, 0x26A64, 0x27541, 0x28C69,
];

/// Alignment pattern center coordinates per version.
const ALIGNMENT_PATTERN_CENTERS: [&[usize]; 40] = [
    &[],
    &[6, 18],
    &[6, 22],
    &[6, 26],
    &[6, 30],
    &[6, 34],
    &[6, 22, 38],
    &[6, 24, 42],
    &[6, 26, 46],
    &[6, 28, 50],
    &[6, 30, 54],
    &[6, 32, 58],
    &[6, 34, 62],
    &[6, 26, 46, 66],
    &[6, 26, 48, 70],
    &[6, 26, 50, 74],
    &[6, 30, 54, 78],
    &[6, 30, 56, 82],
    &[6, 30, 58, 86],
    &[6, 34, 62, 90],
    &[6, 28, 50, 72, 94],
    &[6, 26, 50, 74, 98],
    &[6, 30, 54, 78, 102],
    &[6, 28, 54, 80, 106],
    &[6, 32, 58, 84, 110],
    &[6, 30, 58, 86, 114],
    &[6, 34, 62, 90, 118],
    &[6, 26, 50, 74, 98, 122],
    &[6, 30, 54, 78, 102, 126],
    &[6, 26, 52, 78, 104, 130],
    &[6, 30, 56, 82, 108, 134],
    &[6, 34, 60, 86, 112, 138],
    &[6, 30, 58, 86, 114, 142],
    &[6, 34, 62, 90, 118, 146],
    &[6, 30, 54, 78, 102, 126, 150],
    &[6, 24, 50, 76, 102, 128, 154],
    &[6, 28, 54, 80, 106, 132, 158],
    &[6, 32, 58, 84, 110, 136, 162],
    &[6, 26, 54, 82, 110, 138, 166],
    &[6, 30, 58, 86, 114, 142, 170],
];

// ECC codewords per block and block counts, indexed [level ordinal][version - 1].
const EC_CODEWORDS_PER_BLOCK: [[u8; 40]; 4] = [
    [
        7, 10, 15, 20, 26, 18, 20, 24, 30, 18, 20, 24, 26, 30, 22, 24, 28, 30, 28, 28, 28, 28, 30,
        30, 26, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // L
    [
        10, 16, 26, 18, 24, 16, 18, 22, 22, 26, 30, 22, 22, 24, 24, 28, 28, 26, 26, 26, 26, 28, 28,
        28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28, 28,
    ], // M
    [
        13, 22, 18, 26, 18, 24, 18, 22, 20, 24, 28, 26, 24, 20, 30, 24, 28, 28, 26, 30, 28, 30, 30,
        30, 30, 28, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // Q
    [
        17, 28, 22, 16, 22, 28, 26, 26, 24, 28, 24, 28, 22, 24, 24, 30, 28, 28, 26, 28, 30, 24, 30,
        30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30, 30,
    ], // H
];

const NUM_EC_BLOCKS: [[u8; 40]; 4] = [
    [
        1, 1, 1, 1, 1, 2, 2, 2, 2, 4, 4, 4, 4, 4, 6, 6, 6, 6, 7, 8, 8, 9, 9, 10, 12, 12, 12, 13,
        14, 15, 16, 17, 18, 19, 19, 20, 21, 22, 24, 25,
    ], // L
    [
        1, 1, 1, 2, 2, 4, 4, 4, 5, 5, 5, 8, 9, 9, 10, 10, 11, 13, 14, 16, 17, 17, 18, 20, 21, 23,
        25, 26, 28, 29, 31, 33, 35, 37, 38, 40, 43, 45, 47, 49,
    ], // M
    [
        1, 1, 2, 2, 4, 4, 6, 6, 8, 8, 8, 10, 12, 16, 12, 17, 16, 18, 21, 20, 23, 23, 25, 27, 29,
        34, 34, 35, 38, 40, 43, 45, 48, 51, 53, 56, 59, 62, 65, 68,
    ], // Q
    [
        1, 1, 2, 4, 4, 4, 5, 6, 8, 8, 11, 11, 16, 16, 18, 16, 19, 21, 25, 25, 25, 34, 30, 32, 35,
        37, 40, 42, 45, 48, 51, 54, 57, 60, 63, 66, 70, 74, 77, 81,
    ], // H
];

/// Error-correction block shape for one version/level pair.
#[derive(Debug, Clone, Copy)]
pub struct EcBlockInfo {
    pub ec_codewords_per_block: usize,
    pub num_blocks: usize,
}

/// QR symbol version, 1..=40.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version(u8);

impl Version {
    pub fn new(number: u8) -> Result<Self, DecodeError> {
        if (1..=40).contains(&number) {
            Ok(Self(number))
        } else {
            Err(DecodeError::InvalidArgument("version out of range"))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Side length in modules: 17 + 4 * version.
    pub fn dimension(self) -> usize {
        17 + 4 * self.0 as usize
    }

    /// Provisional version for a sampled grid of the given side length.
    pub fn for_dimension(dimension: usize) -> Result<Self, DecodeError> {
        if dimension < 21 || dimension % 4 != 1 {
            return Err(DecodeError::Format("invalid grid dimension"));
        }
        Self::new(((dimension - 17) / 4) as u8).map_err(|_| DecodeError::Format("grid too large"))
    }

    pub fn alignment_pattern_centers(self) -> &'static [usize] {
        ALIGNMENT_PATTERN_CENTERS[self.0 as usize - 1]
    }

    /// Total codewords in the symbol (data + ECC).
    pub fn total_codewords(self) -> usize {
        num_raw_data_modules(self.0 as usize) / 8
    }

    pub fn ec_block_info(self, level: ECLevel) -> EcBlockInfo {
        let idx = self.0 as usize - 1;
        EcBlockInfo {
            ec_codewords_per_block: EC_CODEWORDS_PER_BLOCK[level.ordinal()][idx] as usize,
            num_blocks: NUM_EC_BLOCKS[level.ordinal()][idx] as usize,
        }
    }

    /// Decode an 18-bit version-info codeword, tolerating up to 3 bit errors.
    pub fn decode_version_information(bits: u32) -> Result<Self, DecodeError> {
        let mut best_difference = u32::MAX;
        let mut best_version = 0u8;
        for (i, &target) in VERSION_DECODE_LOOKUP.iter().enumerate() {
            if target == bits {
                return Self::new(i as u8 + 7);
            }
            let difference = (bits ^ target).count_ones();
            if difference < best_difference {
                best_difference = difference;
                best_version = i as u8 + 7;
            }
        }
        if best_difference <= 3 {
            return Self::new(best_version);
        }
        Err(DecodeError::Format("version information unreadable"))
    }

    /// Mask of every module reserved for function patterns: finders with
    /// separators and format areas, alignment boxes, timing lines, and the
    /// version blocks on versions above 6.
    pub fn build_function_pattern(self) -> Result<BitMatrix, DecodeError> {
        let dimension = self.dimension();
        let mut bits = BitMatrix::new(dimension, dimension);

        bits.set_region(0, 0, 9, 9)?;
        bits.set_region(dimension - 8, 0, 8, 9)?;
        bits.set_region(0, dimension - 8, 9, 8)?;

        let centers = self.alignment_pattern_centers();
        let max = centers.len();
        for (x, &cy) in centers.iter().enumerate() {
            for (y, &cx) in centers.iter().enumerate() {
                // The three boxes coinciding with finder corners don't exist.
                if (x == 0 && (y == 0 || y == max - 1)) || (x == max - 1 && y == 0) {
                    continue;
                }
                bits.set_region(cx - 2, cy - 2, 5, 5)?;
            }
        }

        bits.set_region(6, 9, 1, dimension - 17)?;
        bits.set_region(9, 6, dimension - 17, 1)?;

        if self.0 > 6 {
            bits.set_region(dimension - 11, 0, 3, 6)?;
            bits.set_region(0, dimension - 11, 6, 3)?;
        }
        Ok(bits)
    }
}

/// Modules available for codeword bits, from the ISO module-count formula.
fn num_raw_data_modules(version: usize) -> usize {
    let mut result = (16 * version + 128) * version + 64;
    if version >= 2 {
        let num_align = version / 7 + 2;
        result -= (25 * num_align - 10) * num_align - 55;
        if version >= 7 {
            result -= 36;
        }
    }
    result
}
