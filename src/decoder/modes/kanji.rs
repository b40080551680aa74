//! Kanji mode (1000): 13-bit values unpacked to two-byte Shift_JIS.

use crate::decoder::bit_source::BitSource;
use crate::error::DecodeError;

pub struct KanjiDecoder;

impl KanjiDecoder {
    pub fn decode(
        bits: &mut BitSource<'_>,
        result: &mut String,
        count: usize,
    ) -> Result<(), DecodeError> {
        if 13 * count > bits.available() {
            return Err(DecodeError::Format("kanji segment truncated"));
        }
        let mut sjis_bytes = Vec::with_capacity(2 * count);
        for _ in 0..count {
            let value = bits.read(13)?;
            let mut assembled = ((value / 0x0C0) << 8) | (value % 0x0C0);
            if assembled < 0x1F00 {
                assembled += 0x8140;
            } else {
                assembled += 0xC140;
            }
            sjis_bytes.push((assembled >> 8) as u8);
            sjis_bytes.push((assembled & 0xFF) as u8);
        }
        let (decoded, _, had_errors) = encoding_rs::SHIFT_JIS.decode(&sjis_bytes);
        if had_errors {
            return Err(DecodeError::Format("invalid Shift_JIS sequence"));
        }
        result.push_str(&decoded);
        Ok(())
    }
}
