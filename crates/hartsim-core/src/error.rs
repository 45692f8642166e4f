//! Error types for hartsim-core

use thiserror::Error;

/// Result type alias using [`CodecError`]
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised by the typed-value codec.
///
/// The codec never substitutes defaults: every malformed or out-of-range
/// input surfaces here and the caller decides how to recover.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Empty hex input where a value was required
    #[error("empty hex value for type {0}")]
    EmptyHex(String),

    /// Hex input longer than the type allows
    #[error("hex value '{hex}' too long for type {ty}")]
    HexTooLong { hex: String, ty: String },

    /// Hex input that does not parse as hexadecimal
    #[error("invalid hex value '{0}'")]
    BadHex(String),

    /// User-entered text that does not parse as the declared type
    #[error("cannot parse '{text}' as {ty}")]
    BadText { text: String, ty: String },

    /// Hex input with the wrong byte count for the type
    #[error("expected {expected} bytes for type {ty}, got {actual}")]
    BadLength {
        ty: String,
        expected: usize,
        actual: usize,
    },

    /// Value outside the encodable range of the type
    #[error("value {value} out of range for type {ty}")]
    OutOfRange { value: String, ty: String },

    /// Character that cannot be represented in packed ASCII
    #[error("character {0:?} not representable in packed ASCII")]
    UnsupportedChar(char),

    /// Day/month/year combination that is not a calendar date
    #[error("invalid calendar date {day:02}/{month:02}/{year}")]
    InvalidDate { day: u8, month: u8, year: i32 },

    /// Byte values that do not form a valid time of day
    #[error("invalid time of day ({0} ms)")]
    InvalidTime(f64),

    /// Label with no entry in the enumeration table
    #[error("label '{label}' not found in enumeration table {table}")]
    UnknownLabel { label: String, table: u32 },

    /// Human value of the wrong kind for the declared type
    #[error("cannot encode {actual} value as {expected}")]
    ValueKind {
        expected: &'static str,
        actual: &'static str,
    },

    /// Type string that is not one of the HART data types
    #[error("unknown HART data type '{0}'")]
    UnknownType(String),
}
