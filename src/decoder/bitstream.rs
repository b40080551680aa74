//! Mode-dispatch parsing of the error-corrected data codewords.

use crate::error::DecodeError;
use crate::models::StructuredAppend;

use super::bit_source::BitSource;
use super::eci::{Charset, charset_for_eci};
use super::modes::alphanumeric::AlphanumericDecoder;
use super::modes::byte::ByteDecoder;
use super::modes::kanji::KanjiDecoder;
use super::modes::numeric::NumericDecoder;
use super::version::Version;

const MODE_TERMINATOR: u32 = 0x00;
const MODE_NUMERIC: u32 = 0x01;
const MODE_ALPHANUMERIC: u32 = 0x02;
const MODE_STRUCTURED_APPEND: u32 = 0x03;
const MODE_BYTE: u32 = 0x04;
const MODE_FNC1_FIRST_POSITION: u32 = 0x05;
const MODE_ECI: u32 = 0x07;
const MODE_KANJI: u32 = 0x08;
const MODE_FNC1_SECOND_POSITION: u32 = 0x09;

/// Parsed payload of one symbol.
#[derive(Debug)]
pub struct DecodedStream {
    pub text: String,
    pub byte_segments: Vec<Vec<u8>>,
    pub structured_append: Option<StructuredAppend>,
}

/// Parse the concatenated data codewords into text and segments.
pub fn decode(bytes: &[u8], version: Version) -> Result<DecodedStream, DecodeError> {
    let mut bits = BitSource::new(bytes);
    let mut text = String::new();
    let mut byte_segments: Vec<Vec<u8>> = Vec::new();
    let mut structured_append = None;
    let mut charset: Option<Charset> = None;
    let mut fc1_in_effect = false;

    loop {
        let mode = if bits.available() < 4 {
            MODE_TERMINATOR
        } else {
            bits.read(4)?
        };
        match mode {
            MODE_TERMINATOR => break,
            MODE_FNC1_FIRST_POSITION | MODE_FNC1_SECOND_POSITION => {
                fc1_in_effect = true;
            }
            MODE_STRUCTURED_APPEND => {
                if bits.available() < 16 {
                    return Err(DecodeError::Format("structured append header truncated"));
                }
                structured_append = Some(StructuredAppend {
                    sequence: bits.read(8)? as u8,
                    parity: bits.read(8)? as u8,
                });
            }
            MODE_ECI => {
                charset = Some(charset_for_eci(parse_eci_designator(&mut bits)?)?);
            }
            MODE_NUMERIC => {
                let count = bits.read(character_count_bits(mode, version)?)? as usize;
                NumericDecoder::decode(&mut bits, &mut text, count)?;
            }
            MODE_ALPHANUMERIC => {
                let count = bits.read(character_count_bits(mode, version)?)? as usize;
                AlphanumericDecoder::decode(&mut bits, &mut text, count, fc1_in_effect)?;
            }
            MODE_BYTE => {
                let count = bits.read(character_count_bits(mode, version)?)? as usize;
                ByteDecoder::decode(&mut bits, &mut text, &mut byte_segments, count, charset)?;
            }
            MODE_KANJI => {
                let count = bits.read(character_count_bits(mode, version)?)? as usize;
                KanjiDecoder::decode(&mut bits, &mut text, count)?;
            }
            // GB/T 18284 Hanzi (0b1101) is deliberately not handled.
            _ => return Err(DecodeError::Format("unknown mode indicator")),
        }
    }

    Ok(DecodedStream {
        text,
        byte_segments,
        structured_append,
    })
}

/// Width of the character count field for a data mode at a given version.
fn character_count_bits(mode: u32, version: Version) -> Result<usize, DecodeError> {
    let class = match version.number() {
        1..=9 => 0,
        10..=26 => 1,
        _ => 2,
    };
    let widths: [usize; 3] = match mode {
        MODE_NUMERIC => [10, 12, 14],
        MODE_ALPHANUMERIC => [9, 11, 13],
        MODE_BYTE => [8, 16, 16],
        MODE_KANJI => [8, 10, 12],
        _ => return Err(DecodeError::Format("mode carries no character count")),
    };
    Ok(widths[class])
}

/// ECI designator: 1 to 3 bytes, length keyed by the top bits of the first.
fn parse_eci_designator(bits: &mut BitSource<'_>) -> Result<u32, DecodeError> {
    let first_byte = bits.read(8)?;
    if first_byte & 0x80 == 0 {
        return Ok(first_byte & 0x7F);
    }
    if first_byte & 0xC0 == 0x80 {
        return Ok(((first_byte & 0x3F) << 8) | bits.read(8)?);
    }
    if first_byte & 0xE0 == 0xC0 {
        return Ok(((first_byte & 0x1F) << 16) | bits.read(16)?);
    }
    Err(DecodeError::Format("invalid ECI designator encoding"))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BitWriter {
        bits: Vec<bool>,
    }

    impl BitWriter {
        fn new() -> Self {
            Self { bits: Vec::new() }
        }

        fn push(&mut self, value: u32, width: usize) -> &mut Self {
            for i in (0..width).rev() {
                self.bits.push((value >> i) & 1 != 0);
            }
            self
        }

        fn into_bytes(self) -> Vec<u8> {
            let mut out = vec![0u8; self.bits.len().div_ceil(8)];
            for (i, &bit) in self.bits.iter().enumerate() {
                if bit {
                    out[i / 8] |= 1 << (7 - i % 8);
                }
            }
            out
        }
    }

    fn version(number: u8) -> Version {
        Version::new(number).unwrap()
    }

    #[test]
    fn test_numeric_segment() {
        let mut writer = BitWriter::new();
        writer.push(MODE_NUMERIC, 4).push(3, 10).push(512, 10);
        let stream = decode(&writer.into_bytes(), version(1)).unwrap();
        assert_eq!(stream.text, "512");
        assert!(stream.byte_segments.is_empty());
    }

    #[test]
    fn test_byte_segment_and_terminator() {
        let mut writer = BitWriter::new();
        writer.push(MODE_BYTE, 4).push(2, 8);
        writer.push(b'h' as u32, 8).push(b'i' as u32, 8);
        writer.push(MODE_TERMINATOR, 4);
        let stream = decode(&writer.into_bytes(), version(1)).unwrap();
        assert_eq!(stream.text, "hi");
        assert_eq!(stream.byte_segments, vec![b"hi".to_vec()]);
    }

    #[test]
    fn test_eci_changes_byte_charset() {
        // ECI 7 = ISO-8859-5 (Cyrillic): byte 0xB4 is "Д".
        let mut writer = BitWriter::new();
        writer.push(MODE_ECI, 4).push(7, 8);
        writer.push(MODE_BYTE, 4).push(1, 8).push(0xB4, 8);
        let stream = decode(&writer.into_bytes(), version(1)).unwrap();
        assert_eq!(stream.text, "Д");
    }

    #[test]
    fn test_structured_append_recorded() {
        let mut writer = BitWriter::new();
        writer.push(MODE_STRUCTURED_APPEND, 4).push(0x23, 8).push(0x9A, 8);
        writer.push(MODE_NUMERIC, 4).push(1, 10).push(5, 4);
        let stream = decode(&writer.into_bytes(), version(1)).unwrap();
        assert_eq!(stream.text, "5");
        let sa = stream.structured_append.unwrap();
        assert_eq!(sa.sequence, 0x23);
        assert_eq!(sa.parity, 0x9A);
    }

    #[test]
    fn test_count_width_depends_on_version() {
        // The same numeric segment needs 12 count bits at version 10.
        let mut writer = BitWriter::new();
        writer.push(MODE_NUMERIC, 4).push(2, 12).push(42, 7);
        let stream = decode(&writer.into_bytes(), version(10)).unwrap();
        assert_eq!(stream.text, "42");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let mut writer = BitWriter::new();
        writer.push(0x0D, 4).push(0, 8);
        assert!(matches!(
            decode(&writer.into_bytes(), version(1)),
            Err(DecodeError::Format(_))
        ));
    }

    #[test]
    fn test_overlong_count_rejected() {
        let mut writer = BitWriter::new();
        writer.push(MODE_BYTE, 4).push(200, 8);
        assert!(decode(&writer.into_bytes(), version(1)).is_err());
    }

    #[test]
    fn test_empty_stream_yields_empty_text() {
        let stream = decode(&[], version(1)).unwrap();
        assert_eq!(stream.text, "");
        assert!(stream.byte_segments.is_empty());
        assert!(stream.structured_append.is_none());
    }
}
