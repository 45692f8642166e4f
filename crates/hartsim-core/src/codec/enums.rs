//! Fixed enumeration tables for `ENUM<n>` / `BIT_ENUM<n>` cells.
//!
//! Table indices are part of the persisted type strings, so entries are
//! append-only. Unmatched values decode to [`INVALID`], never an error.

use ahash::AHashMap;
use once_cell::sync::Lazy;

/// Sentinel rendered for a value with no entry in its table.
pub const INVALID: &str = "INVALID";

/// One enumeration table: (value, label) pairs.
///
/// For `BIT_ENUM` tables the values are single-bit flags.
pub type EnumTable = &'static [(u8, &'static str)];

/// Table 0: engineering unit codes (subset of the HART unit table).
const UNITS: EnumTable = &[
    (0x06, "psi"),
    (0x07, "bar"),
    (0x0C, "kPa"),
    (0x20, "degC"),
    (0x21, "degF"),
    (0x39, "percent"),
    (0xFA, "NOT_USED"),
];

/// Table 1: loop current mode.
const LOOP_CURRENT_MODE: EnumTable = &[(0x00, "DISABLED"), (0x01, "ENABLED")];

/// Table 2: alarm selection code.
const ALARM_SELECTION: EnumTable = &[
    (0x00, "HIGH"),
    (0x01, "LOW"),
    (0xEF, "HOLD_LAST"),
    (0xFA, "NOT_USED"),
    (0xFB, "NONE"),
    (0xFC, "UNKNOWN"),
];

/// Table 3: transfer function code.
const TRANSFER_FUNCTION: EnumTable = &[
    (0x00, "LINEAR"),
    (0x01, "SQUARE_ROOT"),
    (0x02, "SQUARE_ROOT_THIRD_POWER"),
    (0x03, "SQUARE_ROOT_FIFTH_POWER"),
    (0xFA, "NOT_USED"),
];

/// Table 4 (bit flags): field device status byte.
const DEVICE_STATUS: EnumTable = &[
    (0x01, "PV_OUT_OF_LIMITS"),
    (0x02, "NON_PV_OUT_OF_LIMITS"),
    (0x04, "LOOP_CURRENT_SATURATED"),
    (0x08, "LOOP_CURRENT_FIXED"),
    (0x10, "MORE_STATUS_AVAILABLE"),
    (0x20, "COLD_START"),
    (0x40, "CONFIG_CHANGED"),
    (0x80, "DEVICE_MALFUNCTION"),
];

/// Table 5 (bit flags): write-protect / lock status.
const LOCK_STATUS: EnumTable = &[
    (0x01, "WRITE_PROTECTED"),
    (0x02, "LOCKED_BY_PRIMARY"),
    (0x04, "LOCKED_BY_SECONDARY"),
];

static TABLES: Lazy<AHashMap<u32, EnumTable>> = Lazy::new(|| {
    let mut m = AHashMap::new();
    m.insert(0, UNITS);
    m.insert(1, LOOP_CURRENT_MODE);
    m.insert(2, ALARM_SELECTION);
    m.insert(3, TRANSFER_FUNCTION);
    m.insert(4, DEVICE_STATUS);
    m.insert(5, LOCK_STATUS);
    m
});

/// Look up the label for `value` in table `n`.
pub fn label(n: u32, value: u8) -> Option<&'static str> {
    TABLES
        .get(&n)
        .and_then(|t| t.iter().find(|(v, _)| *v == value))
        .map(|(_, l)| *l)
}

/// Reverse lookup: the value for `label` in table `n`.
pub fn value(n: u32, label: &str) -> Option<u8> {
    TABLES
        .get(&n)
        .and_then(|t| t.iter().find(|(_, l)| *l == label))
        .map(|(v, _)| *v)
}

/// All flag entries of table `n`, for `BIT_ENUM` decoding.
pub fn entries(n: u32) -> EnumTable {
    TABLES.get(&n).copied().unwrap_or(&[])
}
