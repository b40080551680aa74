//! Per-mode segment decoders for the QR data bitstream.

pub mod alphanumeric;
pub mod byte;
pub mod kanji;
pub mod numeric;
