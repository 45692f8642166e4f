//! The closed set of HART wire data types

use std::fmt;
use std::str::FromStr;

use crate::error::CodecError;

/// Declared data type of a cell, parsed from its `TYPE` meta cell.
///
/// `Enum`/`BitEnum` carry the index of the fixed enumeration table they
/// decode through (see [`crate::codec::enums`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HartType {
    /// 16-bit unsigned integer, up to 4 hex chars
    Uint,
    /// 16-bit two's-complement integer
    Int,
    /// IEEE 754 single-precision float ("SREAL" on the wire)
    Float,
    /// 3 bytes: day, month, year - 1900
    Date,
    /// 4 bytes: 1/32 ms since midnight, big-endian
    Time,
    /// HART packed ASCII (6-bit codes with the bit-6 inversion quirk)
    PackedAscii,
    /// Single byte looked up in enumeration table `n`
    Enum(u32),
    /// Bit flags looked up in enumeration table `n`
    BitEnum(u32),
}

impl HartType {
    /// Whether the machine representation of this type is wider than one
    /// 16-bit Modbus register.
    pub fn is_wide(&self) -> bool {
        matches!(self, HartType::Float | HartType::Time)
    }
}

impl FromStr for HartType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "UINT" | "UNSIGNED" => return Ok(HartType::Uint),
            "INT" => return Ok(HartType::Int),
            "SREAL" | "FLOAT" => return Ok(HartType::Float),
            "DATE" => return Ok(HartType::Date),
            "TIME" => return Ok(HartType::Time),
            "PACKED_ASCII" => return Ok(HartType::PackedAscii),
            _ => {}
        }
        // ENUM<n> / BIT_ENUM<n>
        if let Some(rest) = s.strip_prefix("BIT_ENUM<") {
            if let Some(n) = rest.strip_suffix('>').and_then(|n| n.parse().ok()) {
                return Ok(HartType::BitEnum(n));
            }
        }
        if let Some(rest) = s.strip_prefix("ENUM<") {
            if let Some(n) = rest.strip_suffix('>').and_then(|n| n.parse().ok()) {
                return Ok(HartType::Enum(n));
            }
        }
        Err(CodecError::UnknownType(s.to_string()))
    }
}

impl fmt::Display for HartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HartType::Uint => write!(f, "UINT"),
            HartType::Int => write!(f, "INT"),
            HartType::Float => write!(f, "SREAL"),
            HartType::Date => write!(f, "DATE"),
            HartType::Time => write!(f, "TIME"),
            HartType::PackedAscii => write!(f, "PACKED_ASCII"),
            HartType::Enum(n) => write!(f, "ENUM<{n}>"),
            HartType::BitEnum(n) => write!(f, "BIT_ENUM<{n}>"),
        }
    }
}
