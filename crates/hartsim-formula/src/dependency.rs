//! Dependency edge bookkeeping for formula cells

use ahash::{AHashMap, AHashSet};
use hartsim_core::CellId;

/// Precedent/dependent edges between cells.
///
/// The cell graph uses this to answer "who re-evaluates when X changes"
/// and to unsubscribe a cell atomically when its formula is replaced.
/// Propagation itself is eager and depth-first in the graph; this structure
/// only stores the edges.
#[derive(Debug, Default)]
pub struct DepGraph {
    /// Cell -> cells whose formulas reference it
    dependents: AHashMap<CellId, AHashSet<CellId>>,
    /// Cell -> cells its formula references
    precedents: AHashMap<CellId, AHashSet<CellId>>,
}

impl DepGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent`'s formula references `precedent`.
    pub fn subscribe(&mut self, precedent: CellId, dependent: CellId) {
        self.dependents
            .entry(precedent.clone())
            .or_default()
            .insert(dependent.clone());
        self.precedents.entry(dependent).or_default().insert(precedent);
    }

    /// Drop every precedent edge of `cell` (it stops being a formula, or its
    /// formula changed and new edges will be added).
    pub fn unsubscribe_all(&mut self, cell: &CellId) {
        if let Some(precedents) = self.precedents.remove(cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(cell);
                }
            }
        }
    }

    /// The cells whose formulas reference `cell`, in unspecified order.
    pub fn dependents_of(&self, cell: &CellId) -> Vec<CellId> {
        self.dependents
            .get(cell)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The cells that `cell`'s formula references.
    pub fn precedents_of(&self, cell: &CellId) -> Vec<CellId> {
        self.precedents
            .get(cell)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether `cell` can reach itself through precedent edges.
    ///
    /// Cycles are tolerated at runtime (the per-cell re-entrancy guard cuts
    /// them off); this is used to log a warning when a formula assignment
    /// closes a loop.
    pub fn has_cycle_from(&self, cell: &CellId) -> bool {
        let mut visited = AHashSet::new();
        self.reaches(cell, cell, &mut visited)
    }

    fn reaches(&self, from: &CellId, target: &CellId, visited: &mut AHashSet<CellId>) -> bool {
        if let Some(precedents) = self.precedents.get(from) {
            for p in precedents {
                if p == target {
                    return true;
                }
                if visited.insert(p.clone()) && self.reaches(p, target, visited) {
                    return true;
                }
            }
        }
        false
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
    }
}
