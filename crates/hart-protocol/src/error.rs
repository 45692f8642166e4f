//! Frame error types

use thiserror::Error;

/// Result type alias using [`FrameError`]
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors from the wire-frame codec.
///
/// A checksum mismatch is deliberately NOT here: the parser still returns
/// the parsed fields and annotates the result, so callers can inspect and
/// discard.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// No leading run of `FF` bytes, or nothing after it
    #[error("missing preamble")]
    MissingPreamble,

    /// Input ends before the layout is complete
    #[error("truncated frame: expected at least {expected} bytes after the preamble, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Input is not a hex-encoded byte stream
    #[error("invalid hex input '{0}'")]
    BadHex(String),
}
