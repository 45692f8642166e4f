//! In-memory cell state

use crate::cell::{CellId, CellModel};
use crate::types::HartType;

/// The in-memory state of one cell.
///
/// A cell is created once per (row, column) when its table is loaded and
/// lives for the process lifetime. Its `model` and `deps` are always kept
/// consistent with the current `origin` string; any mutation that changes
/// the leading sentinel re-derives both.
#[derive(Debug, Clone)]
pub struct CellData {
    /// Declared wire type, from the row's `TYPE` meta cell
    pub declared_type: HartType,
    /// Byte width, from the row's `BYTE_SIZE` meta cell; sizes hex output
    pub byte_size: usize,
    /// How the cell produces its value
    pub model: CellModel,
    /// The raw persisted string: hex for `Value` cells, the literal
    /// expression text (with sentinel) for `Func`/`TFunc` cells
    pub origin: String,
    /// Cells referenced by the formula, in first-appearance order
    pub deps: Vec<CellId>,
    /// Runtime value of a `Func` cell (its evaluation result) or a `TFunc`
    /// cell (the value injected by the external simulator)
    pub cached: Option<f64>,
    /// Most recent evaluation of a `TFunc` cell's input expression,
    /// handed to the external simulator
    pub input_value: Option<f64>,
    /// Re-entrancy guard: set while this cell is re-evaluating
    pub evaluating: bool,
}

impl CellData {
    /// Create a cell from its declared type, byte size and origin string.
    ///
    /// The model is derived from the origin's sentinel; dependency tokens
    /// are extracted by the caller (the formula engine owns that pattern).
    pub fn new(declared_type: HartType, byte_size: usize, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            declared_type,
            byte_size,
            model: CellModel::of(&origin),
            origin,
            deps: Vec::new(),
            cached: None,
            input_value: None,
            evaluating: false,
        }
    }

    /// Replace the origin string, re-deriving the model.
    ///
    /// Subscription bookkeeping (old deps out, new deps in) is the graph's
    /// job; this only keeps the model/origin pair consistent.
    pub fn set_origin(&mut self, origin: impl Into<String>) {
        self.origin = origin.into();
        self.model = CellModel::of(&self.origin);
        if self.model == CellModel::Value {
            self.deps.clear();
            self.cached = None;
            self.input_value = None;
        }
    }

    /// The formula text, if this is a `Func` or `TFunc` cell.
    pub fn formula(&self) -> Option<&str> {
        CellModel::body(&self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_origin_rederives_model() {
        let mut cell = CellData::new(HartType::Float, 4, "3FBE3A80");
        assert_eq!(cell.model, CellModel::Value);

        cell.set_origin("@HART.dev1.pv * 2");
        assert_eq!(cell.model, CellModel::Func);
        assert_eq!(cell.formula(), Some("HART.dev1.pv * 2"));

        cell.deps.push(CellId::new("HART", "pv", "dev1"));
        cell.set_origin("41200000");
        assert_eq!(cell.model, CellModel::Value);
        assert!(cell.deps.is_empty());
    }
}
