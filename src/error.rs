use thiserror::Error;

/// Errors surfaced by the decoding pipeline.
///
/// `NotFound` and `Format` are the ordinary "this image does not contain a
/// readable QR code" outcomes; `ReedSolomon` means a symbol was located but
/// carried more corruption than its error correction can absorb.
/// `InvalidArgument` marks caller/programming errors and is never produced
/// by a well-formed input image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no QR code found: {0}")]
    NotFound(&'static str),

    #[error("malformed QR code: {0}")]
    Format(&'static str),

    #[error("error correction failed: {0}")]
    ReedSolomon(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}
