//! Alphanumeric mode (0010): 11-bit pairs over a 45-character alphabet.

use crate::decoder::bit_source::BitSource;
use crate::error::DecodeError;

const ALPHANUMERIC_CHARS: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

pub struct AlphanumericDecoder;

impl AlphanumericDecoder {
    pub fn decode(
        bits: &mut BitSource<'_>,
        result: &mut String,
        mut count: usize,
        fc1_in_effect: bool,
    ) -> Result<(), DecodeError> {
        let start = result.len();
        while count > 1 {
            let pair = bits.read(11)?;
            result.push(table_char(pair / 45)?);
            result.push(table_char(pair % 45)?);
            count -= 2;
        }
        if count == 1 {
            result.push(table_char(bits.read(6)?)?);
        }

        if fc1_in_effect {
            // GS1 escapes: "%%" is a literal percent, a lone "%" is the
            // group separator.
            let rewritten: String = {
                let segment: Vec<char> = result[start..].chars().collect();
                let mut out = String::with_capacity(segment.len());
                let mut i = 0;
                while i < segment.len() {
                    if segment[i] == '%' {
                        if i + 1 < segment.len() && segment[i + 1] == '%' {
                            out.push('%');
                            i += 2;
                        } else {
                            out.push('\u{1D}');
                            i += 1;
                        }
                    } else {
                        out.push(segment[i]);
                        i += 1;
                    }
                }
                out
            };
            result.truncate(start);
            result.push_str(&rewritten);
        }
        Ok(())
    }
}

fn table_char(index: u32) -> Result<char, DecodeError> {
    ALPHANUMERIC_CHARS
        .get(index as usize)
        .map(|&b| b as char)
        .ok_or(DecodeError::Format("alphanumeric index out of range"))
}
