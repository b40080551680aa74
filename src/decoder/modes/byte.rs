//! Byte mode (0100): 8-bit data, interpreted through the active ECI
//! charset or sniffed among UTF-8, Shift_JIS and ISO-8859-1.

use crate::decoder::bit_source::BitSource;
use crate::decoder::eci::Charset;
use crate::error::DecodeError;

pub struct ByteDecoder;

impl ByteDecoder {
    pub fn decode(
        bits: &mut BitSource<'_>,
        result: &mut String,
        byte_segments: &mut Vec<Vec<u8>>,
        count: usize,
        charset: Option<Charset>,
    ) -> Result<(), DecodeError> {
        if 8 * count > bits.available() {
            return Err(DecodeError::Format("byte segment truncated"));
        }
        let mut bytes = Vec::with_capacity(count);
        for _ in 0..count {
            bytes.push(bits.read(8)? as u8);
        }
        let charset = charset.unwrap_or_else(|| guess_charset(&bytes));
        result.push_str(&charset.decode(&bytes));
        byte_segments.push(bytes);
        Ok(())
    }
}

/// No ECI in effect: take valid UTF-8 at face value, then try Shift_JIS,
/// and fall back to Latin-1.
fn guess_charset(bytes: &[u8]) -> Charset {
    if std::str::from_utf8(bytes).is_ok() {
        return Charset::Encoding(encoding_rs::UTF_8);
    }
    if looks_like_shift_jis(bytes) {
        return Charset::Encoding(encoding_rs::SHIFT_JIS);
    }
    Charset::Latin1
}

fn looks_like_shift_jis(bytes: &[u8]) -> bool {
    let mut double_byte_pairs = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte < 0x80 {
            i += 1;
        } else if (0xA1..=0xDF).contains(&byte) {
            // Half-width katakana.
            i += 1;
        } else if (0x81..=0x9F).contains(&byte) || (0xE0..=0xEF).contains(&byte) {
            i += 1;
            if i >= bytes.len() {
                return false;
            }
            let trail = bytes[i];
            if !(0x40..=0xFC).contains(&trail) || trail == 0x7F {
                return false;
            }
            double_byte_pairs += 1;
            i += 1;
        } else {
            return false;
        }
    }
    double_byte_pairs > 0
}
