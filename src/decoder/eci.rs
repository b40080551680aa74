//! Extended Channel Interpretation: mapping ECI designators to character
//! encodings.

use encoding_rs::Encoding;

use crate::error::DecodeError;

/// Character set a byte segment decodes through.
///
/// ISO-8859-1 is kept apart from the WHATWG machinery: its label resolves
/// to windows-1252 there, which remaps 0x80..0x9F.
#[derive(Clone, Copy)]
pub enum Charset {
    Latin1,
    Encoding(&'static Encoding),
}

impl Charset {
    /// Decode bytes to text. Unmappable sequences become U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::Encoding(encoding) => encoding.decode(bytes).0.into_owned(),
        }
    }
}

/// Resolve an ECI designator value to its character set.
///
/// Designators without a registered charset (or pointing at encodings with
/// no decoder here, like Cp437's 0 and 2) fall back to byte-transparent
/// Latin-1 where that is harmless, and error otherwise.
pub fn charset_for_eci(value: u32) -> Result<Charset, DecodeError> {
    let label: &str = match value {
        // Cp437 and US-ASCII: pass bytes through as code points.
        0 | 2 | 27 | 170 => return Ok(Charset::Latin1),
        1 | 3 => return Ok(Charset::Latin1),
        4 => "iso-8859-2",
        5 => "iso-8859-3",
        6 => "iso-8859-4",
        7 => "iso-8859-5",
        8 => "iso-8859-6",
        9 => "iso-8859-7",
        10 => "iso-8859-8",
        11 => "iso-8859-9",
        12 => "iso-8859-10",
        13 => "iso-8859-11",
        15 => "iso-8859-13",
        16 => "iso-8859-14",
        17 => "iso-8859-15",
        18 => "iso-8859-16",
        20 => "shift_jis",
        21 => "windows-1250",
        22 => "windows-1251",
        23 => "windows-1252",
        24 => "windows-1256",
        25 => "utf-16be",
        26 => "utf-8",
        28 => "big5",
        29 => "gb18030",
        30 => "euc-kr",
        _ => return Err(DecodeError::Format("unsupported ECI designator")),
    };
    Encoding::for_label(label.as_bytes())
        .map(Charset::Encoding)
        .ok_or(DecodeError::Format("unsupported ECI designator"))
}
