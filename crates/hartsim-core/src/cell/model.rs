//! Cell value models

use std::fmt;

/// How a cell produces its value, derived from the leading sentinel of its
/// origin string: `@` = formula, `$` = transfer-function input, else literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellModel {
    /// Literal hex value
    #[default]
    Value,
    /// Formula over other cells, re-evaluated on dependency change
    Func,
    /// Formula-driven input to an external transfer-function simulator;
    /// the cell's stored value is injected back by that simulator
    TFunc,
}

impl CellModel {
    /// Derive the model from a raw origin string.
    pub fn of(origin: &str) -> Self {
        match origin.as_bytes().first() {
            Some(b'@') => CellModel::Func,
            Some(b'$') => CellModel::TFunc,
            _ => CellModel::Value,
        }
    }

    /// The expression text of a formula origin (the part after the sentinel).
    ///
    /// Returns `None` for `Value` origins.
    pub fn body(origin: &str) -> Option<&str> {
        match Self::of(origin) {
            CellModel::Value => None,
            _ => Some(&origin[1..]),
        }
    }
}

impl fmt::Display for CellModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellModel::Value => write!(f, "value"),
            CellModel::Func => write!(f, "func"),
            CellModel::TFunc => write!(f, "tfunc"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_detection() {
        assert_eq!(CellModel::of("00FF"), CellModel::Value);
        assert_eq!(CellModel::of("@HART.dev1.pv + 1"), CellModel::Func);
        assert_eq!(CellModel::of("$[1.0],[1.0,0.5],2,HART.dev1.sp"), CellModel::TFunc);
        assert_eq!(CellModel::of(""), CellModel::Value);
    }

    #[test]
    fn test_body() {
        assert_eq!(CellModel::body("@B+1"), Some("B+1"));
        assert_eq!(CellModel::body("00FF"), None);
    }
}
