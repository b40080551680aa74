//! Format information: ECC level + data mask recovered from the two 15-bit
//! BCH-protected copies around the finder patterns.

use crate::error::DecodeError;
use crate::models::{ECLevel, MaskPattern};

const FORMAT_INFO_MASK_QR: u32 = 0x5412;

/// All 32 valid masked format patterns and the 5 data bits they carry
/// (level << 3 | mask). Valid codewords differ in at least 7 bits, so up to
/// 3 bit errors resolve unambiguously.
const FORMAT_INFO_DECODE_LOOKUP: [(u32, u8); 32] = [
    (0x5412, 0x00),
    (0x5125, 0x01),
    (0x5E7C, 0x02),
    (0x5B4B, 0x03),
    (0x45F9, 0x04),
    (0x40CE, 0x05),
    (0x4F97, 0x06),
    (0x4AA0, 0x07),
    (0x77C4, 0x08),
    (0x72F3, 0x09),
    (0x7DAA, 0x0A),
    (0x789D, 0x0B),
    (0x662F, 0x0C),
    (0x6318, 0x0D),
    (0x6C41, 0x0E),
    (0x6976, 0x0F),
    (0x1689, 0x10),
    (0x13BE, 0x11),
    (0x1CE7, 0x12),
    (0x19D0, 0x13),
    (0x0762, 0x14),
    (0x0255, 0x15),
    (0x0D0C, 0x16),
    (0x083B, 0x17),
    (0x355F, 0x18),
    (0x3068, 0x19),
    (0x3F31, 0x1A),
    (0x3A06, 0x1B),
    (0x24B4, 0x1C),
    (0x2183, 0x1D),
    (0x2EDA, 0x1E),
    (0x2BED, 0x1F),
];

/// Decoded format information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInformation {
    pub ec_level: ECLevel,
    pub mask_pattern: MaskPattern,
}

impl FormatInformation {
    /// Decode the two independently-read 15-bit words. Some encoders skip
    /// the 0x5412 masking step, so both interpretations are tried.
    pub fn decode(masked1: u32, masked2: u32) -> Result<Self, DecodeError> {
        if let Some(info) = Self::do_decode(masked1, masked2) {
            return Ok(info);
        }
        Self::do_decode(masked1 ^ FORMAT_INFO_MASK_QR, masked2 ^ FORMAT_INFO_MASK_QR)
            .ok_or(DecodeError::Format("format information unreadable"))
    }

    fn do_decode(masked1: u32, masked2: u32) -> Option<Self> {
        let mut best_difference = u32::MAX;
        let mut best_bits = 0u8;
        for &(target, bits) in &FORMAT_INFO_DECODE_LOOKUP {
            if target == masked1 || target == masked2 {
                return Some(Self::from_bits(bits));
            }
            let mut difference = (masked1 ^ target).count_ones();
            if difference < best_difference {
                best_difference = difference;
                best_bits = bits;
            }
            if masked1 != masked2 {
                difference = (masked2 ^ target).count_ones();
                if difference < best_difference {
                    best_difference = difference;
                    best_bits = bits;
                }
            }
        }
        if best_difference <= 3 {
            Some(Self::from_bits(best_bits))
        } else {
            None
        }
    }

    fn from_bits(bits: u8) -> Self {
        Self {
            ec_level: ECLevel::from_format_bits((bits >> 3) as u32),
            mask_pattern: MaskPattern::from_bits(bits & 0x07),
        }
    }
}
