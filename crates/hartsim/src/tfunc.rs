//! Transfer-function registry.
//!
//! A `$`-cell's origin declares a dynamic system (`[num],[den],delay`) plus
//! a live input expression. The graph evaluates only the input; the system
//! itself is ticked by an external simulator that reads the registry and
//! injects its outputs back through
//! [`SimTable::inject_simulated`](crate::SimTable::inject_simulated).
//!
//! The registry is an explicit object owned by the graph - registration is
//! keyed by cell id, with no ambient global state.

use ahash::AHashMap;
use hartsim_core::CellId;
use hartsim_formula::TfSpec;

/// One registered transfer-function cell.
#[derive(Debug, Clone)]
pub struct TfEntry {
    pub spec: TfSpec,
    /// Latest evaluation of the input expression
    pub input: Option<f64>,
}

/// All currently simulated cells.
#[derive(Debug, Default)]
pub struct TfRegistry {
    entries: AHashMap<CellId, TfEntry>,
}

impl TfRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a cell's transfer function.
    pub fn register(&mut self, id: CellId, spec: TfSpec) {
        self.entries.insert(id, TfEntry { spec, input: None });
    }

    /// The cell stopped being a `$`-cell; the simulator must drop it.
    pub fn deregister(&mut self, id: &CellId) {
        self.entries.remove(id);
    }

    /// Record the latest input value for a simulated cell.
    pub fn set_input(&mut self, id: &CellId, input: f64) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.input = Some(input);
        }
    }

    pub fn contains(&self, id: &CellId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &CellId) -> Option<&TfEntry> {
        self.entries.get(id)
    }

    /// Iterate all simulated cells, for the external simulator's tick loop.
    pub fn iter(&self) -> impl Iterator<Item = (&CellId, &TfEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hartsim_formula::parse_tfunc;

    #[test]
    fn test_register_lifecycle() {
        let mut reg = TfRegistry::new();
        let id = CellId::new("HART", "pv", "dev1");
        let spec = parse_tfunc("[1.0],[1.0,0.5],2,HART.dev1.sp").unwrap();

        reg.register(id.clone(), spec);
        assert!(reg.contains(&id));

        reg.set_input(&id, 42.0);
        assert_eq!(reg.get(&id).unwrap().input, Some(42.0));

        reg.deregister(&id);
        assert!(reg.is_empty());
    }
}
