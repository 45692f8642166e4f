//! Bit-exact conversion between the three cell representations.
//!
//! Every cell value exists in three interchangeable forms:
//! - **origin**: the persisted string (hex for literal cells)
//! - **machine**: the same bytes viewed as a raw number
//! - **human**: the decoded, display-facing value
//!
//! [`to_human`] and [`from_human`] translate between the hex and human forms
//! per declared [`HartType`], preserving the HART wire quirks exactly:
//! packed ASCII's bit-6 inversion, the SREAL exponent/mantissa packing, and
//! the 1/32 ms TIME weighting. Origin and machine are the same underlying
//! bytes, so that direction is a no-op handled by the caller.

pub mod enums;

use std::fmt;

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::error::{CodecError, Result};
use crate::types::HartType;

/// A decoded, display-facing cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum HumanValue {
    /// UINT / INT cells
    Int(i64),
    /// SREAL cells
    Number(f64),
    /// PACKED_ASCII, ENUM and BIT_ENUM cells
    Text(String),
    /// DATE cells
    Date(NaiveDate),
    /// TIME cells (millisecond precision)
    Time(NaiveTime),
}

impl HumanValue {
    /// Numeric view, used when binding cell references inside formulas.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HumanValue::Int(i) => Some(*i as f64),
            HumanValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Integral view, accepting whole-number floats.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            HumanValue::Int(i) => Some(*i),
            HumanValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            _ => None,
        }
    }

    /// Kind name for error messages
    fn kind(&self) -> &'static str {
        match self {
            HumanValue::Int(_) => "integer",
            HumanValue::Number(_) => "number",
            HumanValue::Text(_) => "text",
            HumanValue::Date(_) => "date",
            HumanValue::Time(_) => "time",
        }
    }
}

impl fmt::Display for HumanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HumanValue::Int(i) => write!(f, "{i}"),
            HumanValue::Number(n) => write!(f, "{n}"),
            HumanValue::Text(s) => write!(f, "{s}"),
            HumanValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            HumanValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.3f")),
        }
    }
}

impl From<f64> for HumanValue {
    fn from(n: f64) -> Self {
        HumanValue::Number(n)
    }
}

impl From<i64> for HumanValue {
    fn from(i: i64) -> Self {
        HumanValue::Int(i)
    }
}

impl From<&str> for HumanValue {
    fn from(s: &str) -> Self {
        HumanValue::Text(s.to_string())
    }
}

/// Parse user-entered text into the human value of the given type.
///
/// This is the GUI-edit entry point: `"255"` for integers, `"1.25"` for
/// SREAL, `"2024-03-12"` for dates, `"12:30:05.250"` for times, verbatim
/// text for packed ASCII and enumerations.
pub fn parse_text(text: &str, ty: HartType) -> Result<HumanValue> {
    let bad = || CodecError::BadText {
        text: text.trim().to_string(),
        ty: ty.to_string(),
    };
    let text = text.trim();
    match ty {
        HartType::Uint | HartType::Int => {
            text.parse::<i64>().map(HumanValue::Int).map_err(|_| bad())
        }
        HartType::Float => text.parse::<f64>().map(HumanValue::Number).map_err(|_| bad()),
        HartType::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(HumanValue::Date)
            .map_err(|_| bad()),
        HartType::Time => NaiveTime::parse_from_str(text, "%H:%M:%S%.3f")
            .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
            .map(HumanValue::Time)
            .map_err(|_| bad()),
        HartType::PackedAscii | HartType::Enum(_) | HartType::BitEnum(_) => {
            Ok(HumanValue::Text(text.to_string()))
        }
    }
}

// ============================================================================
// Decode: hex -> human
// ============================================================================

/// Decode a persisted hex string into its human representation.
pub fn to_human(hex: &str, ty: HartType) -> Result<HumanValue> {
    let hex = hex.trim();
    match ty {
        HartType::Uint => Ok(HumanValue::Int(decode_u16(hex, ty)? as i64)),
        HartType::Int => {
            let raw = decode_u16(hex, ty)? as i64;
            // Two's-complement: values >= 0x8000 are negative
            let v = if raw >= 0x8000 { raw - 0x10000 } else { raw };
            Ok(HumanValue::Int(v))
        }
        HartType::Float => decode_float(hex),
        HartType::Date => decode_date(hex),
        HartType::Time => decode_time(hex),
        HartType::PackedAscii => Ok(HumanValue::Text(unpack_ascii(&hex_bytes(hex)?))),
        HartType::Enum(n) => {
            let v = decode_byte(hex)?;
            Ok(HumanValue::Text(
                enums::label(n, v).unwrap_or(enums::INVALID).to_string(),
            ))
        }
        HartType::BitEnum(n) => {
            let v = decode_byte(hex)?;
            Ok(HumanValue::Text(decode_flags(n, v)))
        }
    }
}

fn decode_u16(hex: &str, ty: HartType) -> Result<u16> {
    if hex.is_empty() {
        return Err(CodecError::EmptyHex(ty.to_string()));
    }
    if hex.len() > 4 {
        return Err(CodecError::HexTooLong {
            hex: hex.to_string(),
            ty: ty.to_string(),
        });
    }
    u16::from_str_radix(hex, 16).map_err(|_| CodecError::BadHex(hex.to_string()))
}

fn decode_byte(hex: &str) -> Result<u8> {
    if hex.is_empty() {
        return Err(CodecError::EmptyHex("ENUM".to_string()));
    }
    u8::from_str_radix(hex, 16).map_err(|_| CodecError::BadHex(hex.to_string()))
}

fn decode_float(hex: &str) -> Result<HumanValue> {
    if hex.len() != 8 {
        return Err(CodecError::BadLength {
            ty: HartType::Float.to_string(),
            expected: 4,
            actual: hex.len() / 2,
        });
    }
    let bits = u32::from_str_radix(hex, 16).map_err(|_| CodecError::BadHex(hex.to_string()))?;
    if bits & 0x7FFF_FFFF == 0 {
        return Ok(HumanValue::Number(0.0));
    }
    let sign = if bits >> 31 != 0 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let fraction = (bits & 0x007F_FFFF) as f64 / (1u32 << 23) as f64;
    let value = sign * 2f64.powi(exponent - 127) * (1.0 + fraction);
    Ok(HumanValue::Number(value))
}

fn decode_date(hex: &str) -> Result<HumanValue> {
    let b = hex_bytes(hex)?;
    if b.len() != 3 {
        return Err(CodecError::BadLength {
            ty: HartType::Date.to_string(),
            expected: 3,
            actual: b.len(),
        });
    }
    let (day, month, year) = (b[0], b[1], 1900 + b[2] as i32);
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .map(HumanValue::Date)
        .ok_or(CodecError::InvalidDate { day, month, year })
}

fn decode_time(hex: &str) -> Result<HumanValue> {
    let b = hex_bytes(hex)?;
    if b.len() != 4 {
        return Err(CodecError::BadLength {
            ty: HartType::Time.to_string(),
            expected: 4,
            actual: b.len(),
        });
    }
    // Big-endian weighted sum of 1/32 ms units since midnight
    let ms = b[0] as f64 * 524288.0 + b[1] as f64 * 2048.0 + b[2] as f64 * 8.0 + b[3] as f64 * 0.03125;
    let total = ms.round() as u32;
    let (h, m) = (total / 3_600_000, total % 3_600_000 / 60_000);
    let (s, milli) = (total % 60_000 / 1000, total % 1000);
    NaiveTime::from_hms_milli_opt(h, m, s, milli)
        .map(HumanValue::Time)
        .ok_or(CodecError::InvalidTime(ms))
}

fn decode_flags(table: u32, value: u8) -> String {
    let mut labels = Vec::new();
    let mut covered = 0u8;
    for (flag, label) in enums::entries(table) {
        if value & flag != 0 {
            labels.push(*label);
            covered |= flag;
        }
    }
    if value & !covered != 0 {
        labels.push(enums::INVALID);
    }
    labels.join(", ")
}

// ============================================================================
// Encode: human -> hex
// ============================================================================

/// Encode a human value back into its persisted hex form.
///
/// `byte_size` sizes the hex output; it comes from the row's `BYTE_SIZE`
/// meta cell.
pub fn from_human(value: &HumanValue, ty: HartType, byte_size: usize) -> Result<String> {
    match ty {
        HartType::Uint => {
            let v = expect_int(value, ty)?;
            if !(0..=0xFFFF).contains(&v) {
                return Err(out_of_range(value, ty));
            }
            Ok(format_word(v as u32, byte_size))
        }
        HartType::Int => {
            let v = expect_int(value, ty)?;
            // Positive values above 0x7FFF are accepted and encode as-is
            if !(-0x8000..=0xFFFF).contains(&v) {
                return Err(out_of_range(value, ty));
            }
            let raw = if v < 0 { v + 0x10000 } else { v } as u32;
            Ok(format_word(raw, byte_size))
        }
        HartType::Float => encode_float(value),
        HartType::Date => encode_date(value),
        HartType::Time => encode_time(value),
        HartType::PackedAscii => {
            let s = expect_text(value, ty)?;
            pack_ascii(s, byte_size)
        }
        HartType::Enum(n) => {
            let label = expect_text(value, ty)?;
            let v = enums::value(n, label).ok_or_else(|| CodecError::UnknownLabel {
                label: label.to_string(),
                table: n,
            })?;
            Ok(format!("{v:02X}"))
        }
        HartType::BitEnum(n) => {
            let text = expect_text(value, ty)?;
            let mut v = 0u8;
            for label in text.split(", ").filter(|l| !l.is_empty()) {
                v |= enums::value(n, label).ok_or_else(|| CodecError::UnknownLabel {
                    label: label.to_string(),
                    table: n,
                })?;
            }
            Ok(format!("{v:02X}"))
        }
    }
}

fn encode_float(value: &HumanValue) -> Result<String> {
    let v = value
        .as_f64()
        .ok_or_else(|| value_kind("number", value))?;
    if v == 0.0 {
        return Ok("00000000".to_string());
    }
    let sign = if v < 0.0 { 1u32 } else { 0 };
    let a = v.abs();
    let exponent = 127 + a.log2().floor() as i32;
    if !(0..=254).contains(&exponent) {
        return Err(out_of_range(value, HartType::Float));
    }
    let mantissa = ((a / 2f64.powi(exponent - 127) - 1.0) * (1u32 << 23) as f64).floor() as u32;
    let bits = (sign << 31) | ((exponent as u32) << 23) | (mantissa & 0x007F_FFFF);
    // The reference tooling emits SREAL in lowercase; keep it that way
    Ok(format!("{bits:08x}"))
}

fn encode_date(value: &HumanValue) -> Result<String> {
    let d = match value {
        HumanValue::Date(d) => *d,
        other => return Err(value_kind("date", other)),
    };
    use chrono::Datelike;
    let year = d.year();
    if !(1900..=2155).contains(&year) {
        return Err(out_of_range(value, HartType::Date));
    }
    Ok(format!(
        "{:02X}{:02X}{:02X}",
        d.day(),
        d.month(),
        year - 1900
    ))
}

fn encode_time(value: &HumanValue) -> Result<String> {
    let t = match value {
        HumanValue::Time(t) => *t,
        other => return Err(value_kind("time", other)),
    };
    let ms = t.num_seconds_from_midnight() as u64 * 1000 + (t.nanosecond() / 1_000_000) as u64;
    Ok(format!("{:08X}", ms * 32))
}

fn expect_int(value: &HumanValue, ty: HartType) -> Result<i64> {
    value.as_int().ok_or_else(|| CodecError::ValueKind {
        expected: match ty {
            HartType::Uint | HartType::Int => "integer",
            _ => "number",
        },
        actual: value.kind(),
    })
}

fn expect_text<'a>(value: &'a HumanValue, _ty: HartType) -> Result<&'a str> {
    match value {
        HumanValue::Text(s) => Ok(s),
        other => Err(value_kind("text", other)),
    }
}

fn value_kind(expected: &'static str, actual: &HumanValue) -> CodecError {
    CodecError::ValueKind {
        expected,
        actual: actual.kind(),
    }
}

fn out_of_range(value: &HumanValue, ty: HartType) -> CodecError {
    CodecError::OutOfRange {
        value: value.to_string(),
        ty: ty.to_string(),
    }
}

fn format_word(raw: u32, byte_size: usize) -> String {
    let width = byte_size.max(2) * 2;
    format!("{raw:0width$X}")
}

// ============================================================================
// Packed ASCII
// ============================================================================

/// Decode packed-ASCII bytes into text.
///
/// The byte string is treated as one big-endian integer and split into 6-bit
/// groups from the least-significant end, so leading zero groups drop out.
/// A code with bit 5 set is already its ASCII code point; otherwise bit 6 is
/// set. This is the HART bit-6 inversion quirk, not standard 6-bit ASCII.
fn unpack_ascii(bytes: &[u8]) -> String {
    let mut codes: Vec<u8> = Vec::new();
    let mut acc: u32 = 0;
    let mut nbits = 0;
    for b in bytes.iter().rev() {
        acc |= (*b as u32) << nbits;
        nbits += 8;
        while nbits >= 6 {
            codes.push((acc & 0x3F) as u8);
            acc >>= 6;
            nbits -= 6;
        }
    }
    if nbits > 0 {
        codes.push((acc & 0x3F) as u8);
    }
    while codes.last() == Some(&0) {
        codes.pop();
    }
    codes
        .iter()
        .rev()
        .map(|&c| {
            let ascii = if c & 0x20 != 0 { c } else { c | 0x40 };
            ascii as char
        })
        .collect()
}

/// Encode text into packed-ASCII hex, padded to at least `byte_size` bytes.
fn pack_ascii(text: &str, byte_size: usize) -> Result<String> {
    let mut codes = Vec::with_capacity(text.len());
    for c in text.chars() {
        let v = c as u32;
        if !(0x20..=0x5F).contains(&v) {
            return Err(CodecError::UnsupportedChar(c));
        }
        codes.push((v & 0x3F) as u8);
    }
    let nbytes = byte_size.max((codes.len() * 6 + 7) / 8);
    let mut out = vec![0u8; nbytes];
    let mut acc: u32 = 0;
    let mut nbits = 0;
    let mut i = nbytes;
    for &code in codes.iter().rev() {
        acc |= (code as u32) << nbits;
        nbits += 6;
        while nbits >= 8 {
            if i == 0 {
                return Err(CodecError::OutOfRange {
                    value: text.to_string(),
                    ty: HartType::PackedAscii.to_string(),
                });
            }
            i -= 1;
            out[i] = (acc & 0xFF) as u8;
            acc >>= 8;
            nbits -= 8;
        }
    }
    if nbits > 0 && i > 0 {
        i -= 1;
        out[i] = (acc & 0xFF) as u8;
    }
    Ok(hex_string(&out))
}

// ============================================================================
// Hex helpers
// ============================================================================

fn hex_bytes(hex: &str) -> Result<Vec<u8>> {
    if hex.is_empty() || hex.len() % 2 != 0 {
        return Err(CodecError::BadHex(hex.to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| CodecError::BadHex(hex.to_string()))
        })
        .collect()
}

fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}
