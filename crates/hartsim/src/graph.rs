//! The reactive cell graph.
//!
//! [`SimTable`] owns every cell of one table, keeps formula results
//! consistent with their declared dependencies, and notifies subscribers on
//! change. Propagation is synchronous, eager and depth-first: when a cell
//! changes, every cell whose formula references it re-evaluates immediately
//! and, if its own value changed, propagates further. A per-cell
//! `evaluating` flag suppresses re-entrant updates, which is also the only
//! cutoff for dependency cycles.
//!
//! Loading is the one concurrent phase: every row's origin strings are
//! fetched in independent tasks and the constructor resolves only once all
//! cells have their initial values. After that the graph is logically
//! single-threaded; share it across threads behind a mutex (the bridges do).

use std::sync::Arc;

use ahash::AHashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use hartsim_core::{
    codec, is_meta_column, CellData, CellId, CellModel, CodecError, HartType, HumanValue,
};
use hartsim_formula::{evaluate_text, extract_refs, parse_tfunc, DepGraph};

use crate::store::Store;
use crate::tfunc::TfRegistry;

/// Which of a cell's three representations to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repr {
    /// The persisted string (hex or formula text)
    Origin,
    /// The raw value bytes; same underlying data as `Origin`
    Machine,
    /// The decoded, display-facing value
    Human,
}

/// Errors surfaced by the graph API.
///
/// Expression failures never appear here - they are recovered internally
/// (logged, result defaults to zero) so one bad formula cannot take down
/// the table.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("no such cell {0}")]
    NoSuchCell(CellId),

    /// A composite `|`/`&` row read referenced a cell that cannot be resolved
    #[error("unresolvable composite row '{0}'")]
    Unresolved(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("table load failed: {0}")]
    Load(String),

    #[error("cell {0} is not a transfer-function cell")]
    NotSimulated(CellId),
}

/// Notification delivered to external subscribers on a cell change.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub cell: CellId,
    /// Whether the change came from a user edit (as opposed to propagation,
    /// the wire, or the simulator)
    pub user_edit: bool,
}

/// Handle returned by [`SimTable::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&ChangeEvent) + Send>;

struct WriteOp {
    table: String,
    row: String,
    col: String,
    value: String,
}

/// A live, formula-driven parameter table.
pub struct SimTable {
    name: String,
    rows: Vec<String>,
    cols: Vec<String>,
    cells: AHashMap<CellId, CellData>,
    deps: DepGraph,
    tf: TfRegistry,
    listeners: AHashMap<CellId, Vec<(SubscriptionId, Listener)>>,
    subscriptions: AHashMap<SubscriptionId, CellId>,
    next_subscription: u64,
    writer: mpsc::UnboundedSender<WriteOp>,
}

impl SimTable {
    // ========================================================================
    // Load
    // ========================================================================

    /// Fetch and build the whole table.
    ///
    /// Every row's origin strings are fetched concurrently; formula cells
    /// are wired and evaluated before the future resolves, so a loaded
    /// `SimTable` is always ready - there is no observable half-loaded
    /// state.
    pub async fn load(name: &str, store: Arc<dyn Store>) -> Result<Self, GraphError> {
        let rows = store.row_keys(name).await;
        let cols = store.col_keys(name).await;

        // One fetch task per row
        let mut tasks: JoinSet<(String, Vec<(String, Option<String>)>)> = JoinSet::new();
        for row in rows.iter().cloned() {
            let store = Arc::clone(&store);
            let table = name.to_string();
            let cols = cols.clone();
            tasks.spawn(async move {
                let mut fetched = Vec::with_capacity(cols.len());
                for col in cols {
                    let raw = store.get_raw(&table, &row, &col).await;
                    fetched.push((col, raw));
                }
                (row, fetched)
            });
        }

        let mut raw: AHashMap<(String, String), String> = AHashMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (row, fetched) = joined.map_err(|e| GraphError::Load(e.to_string()))?;
            for (col, value) in fetched {
                if let Some(value) = value {
                    raw.insert((row.clone(), col), value);
                }
            }
        }

        // Ordered persistence: a single writer task drains the queue FIFO
        let (writer, mut write_queue) = mpsc::unbounded_channel::<WriteOp>();
        let write_store = Arc::clone(&store);
        tokio::spawn(async move {
            while let Some(op) = write_queue.recv().await {
                write_store
                    .set_raw(&op.table, &op.row, &op.col, &op.value)
                    .await;
            }
        });

        let mut table = Self {
            name: name.to_string(),
            rows: rows.clone(),
            cols: cols.clone(),
            cells: AHashMap::new(),
            deps: DepGraph::new(),
            tf: TfRegistry::new(),
            listeners: AHashMap::new(),
            subscriptions: AHashMap::new(),
            next_subscription: 0,
            writer,
        };

        for row in &rows {
            let declared_type = raw
                .get(&(row.clone(), "TYPE".to_string()))
                .and_then(|s| s.parse::<HartType>().ok())
                .unwrap_or(HartType::Uint);
            let byte_size = raw
                .get(&(row.clone(), "BYTE_SIZE".to_string()))
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(2);
            for col in &cols {
                let origin = raw
                    .get(&(row.clone(), col.clone()))
                    .cloned()
                    .unwrap_or_default();
                let id = CellId::new(name, row.clone(), col.clone());
                table
                    .cells
                    .insert(id, CellData::new(declared_type, byte_size, origin));
            }
        }

        // Wire and evaluate formula cells. Chains settle through normal
        // propagation: evaluating B pushes into any already-wired dependent.
        let formula_cells: Vec<CellId> = table
            .cells
            .iter()
            .filter(|(id, c)| c.model != CellModel::Value && !is_meta_column(&id.column))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &formula_cells {
            table.wire(id);
        }
        for id in &formula_cells {
            match table.cells[id].model {
                CellModel::Func => table.recompute(id, false),
                CellModel::TFunc => table.recompute_input(id),
                CellModel::Value => {}
            }
        }

        debug!(table = name, cells = table.cells.len(), "table loaded");
        Ok(table)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.cols
    }

    /// Columns holding device entries (everything but the meta columns).
    pub fn device_columns(&self) -> Vec<String> {
        self.cols
            .iter()
            .filter(|c| !is_meta_column(c))
            .cloned()
            .collect()
    }

    /// The transfer-function registry, for the external simulator.
    pub fn tf_registry(&self) -> &TfRegistry {
        &self.tf
    }

    /// Declared type of a cell, for register sizing at the Modbus boundary.
    pub fn declared_type(&self, id: &CellId) -> Option<HartType> {
        self.cells.get(id).map(|c| c.declared_type)
    }

    // ========================================================================
    // Read
    // ========================================================================

    /// Read a cell in the requested representation.
    ///
    /// Meta cells come back as their opaque string in every representation.
    /// Composite row keys (`"A | B"`, `"A & B"`) are read-only bitwise
    /// views over the referenced cells.
    pub fn get(&self, id: &CellId, repr: Repr) -> Result<HumanValue, GraphError> {
        if id.row.contains(" | ") || id.row.contains(" & ") {
            return self.composite_read(id, repr);
        }
        let cell = self
            .cells
            .get(id)
            .ok_or_else(|| GraphError::NoSuchCell(id.clone()))?;

        if is_meta_column(&id.column) {
            return Ok(HumanValue::Text(cell.origin.clone()));
        }

        match cell.model {
            CellModel::Value => match repr {
                // Origin and machine are the same underlying bytes
                Repr::Origin | Repr::Machine => Ok(HumanValue::Text(cell.origin.clone())),
                Repr::Human => Ok(codec::to_human(&cell.origin, cell.declared_type)?),
            },
            CellModel::Func | CellModel::TFunc => match repr {
                Repr::Origin => Ok(HumanValue::Text(cell.origin.clone())),
                Repr::Human => Ok(HumanValue::Number(cell.cached.unwrap_or(0.0))),
                Repr::Machine => Ok(HumanValue::Text(self.machine_hex(cell))),
            },
        }
    }

    /// Machine hex of a formula cell: its runtime value re-encoded per the
    /// declared type. Falls back to zero bytes when the value cannot be
    /// encoded (e.g. out of range).
    fn machine_hex(&self, cell: &CellData) -> String {
        let value = HumanValue::Number(cell.cached.unwrap_or(0.0));
        codec::from_human(&value, cell.declared_type, cell.byte_size)
            .unwrap_or_else(|_| "00".repeat(cell.byte_size.max(1)))
    }

    /// Bitwise OR (`|`) / AND (`&`) view over two or more rows.
    fn composite_read(&self, id: &CellId, repr: Repr) -> Result<HumanValue, GraphError> {
        let (sep, and) = if id.row.contains(" | ") {
            (" | ", false)
        } else {
            (" & ", true)
        };
        let mut combined: Option<u64> = None;
        let mut width = 2;
        for part in id.row.split(sep) {
            let pid = CellId::new(&self.name, part.trim(), id.column.clone());
            let cell = self
                .cells
                .get(&pid)
                .ok_or_else(|| GraphError::Unresolved(id.row.clone()))?;
            let hex = match cell.model {
                CellModel::Value => cell.origin.clone(),
                _ => self.machine_hex(cell),
            };
            let value = u64::from_str_radix(hex.trim(), 16)
                .map_err(|_| GraphError::Unresolved(id.row.clone()))?;
            width = width.max(cell.byte_size.max(1) * 2);
            combined = Some(match combined {
                None => value,
                Some(acc) if and => acc & value,
                Some(acc) => acc | value,
            });
        }
        let combined = combined.ok_or_else(|| GraphError::Unresolved(id.row.clone()))?;
        match repr {
            Repr::Human => Ok(HumanValue::Int(combined as i64)),
            Repr::Origin | Repr::Machine => {
                Ok(HumanValue::Text(format!("{combined:0width$X}")))
            }
        }
    }

    /// Numeric value used when a formula references this cell.
    fn human_f64(&self, id: &CellId) -> Option<f64> {
        let cell = self.cells.get(id)?;
        if is_meta_column(&id.column) {
            return None;
        }
        match cell.model {
            CellModel::Value => codec::to_human(&cell.origin, cell.declared_type)
                .ok()?
                .as_f64(),
            CellModel::Func | CellModel::TFunc => cell.cached,
        }
    }

    // ========================================================================
    // Write
    // ========================================================================

    /// Write a cell and run the propagation cascade to completion.
    ///
    /// The new model is derived from `raw`'s sentinel; leaving or entering
    /// `Func`/`TFunc` atomically rewires subscriptions (and the
    /// transfer-function registry). A `Human`-representation write to a
    /// literal cell is converted to its native encoding before persisting.
    pub fn set(
        &mut self,
        id: &CellId,
        raw: &str,
        repr: Repr,
        user_edit: bool,
    ) -> Result<(), GraphError> {
        let (old_model, old_origin, declared_type, byte_size) = {
            let cell = self
                .cells
                .get(id)
                .ok_or_else(|| GraphError::NoSuchCell(id.clone()))?;
            (
                cell.model,
                cell.origin.clone(),
                cell.declared_type,
                cell.byte_size,
            )
        };

        // Meta cells are opaque: no models, no codec, no propagation
        if is_meta_column(&id.column) {
            if old_origin != raw {
                self.cells.get_mut(id).unwrap().set_origin(raw);
                self.persist(id, raw);
                self.emit(id, user_edit);
            }
            return Ok(());
        }

        let new_model = CellModel::of(raw);

        // Convert display input to the native encoding before persisting
        let to_store = if repr == Repr::Human && new_model == CellModel::Value {
            let human = codec::parse_text(raw, declared_type)?;
            codec::from_human(&human, declared_type, byte_size)?
        } else {
            raw.to_string()
        };

        if to_store == old_origin {
            return Ok(());
        }

        // Leaving a formula model: drop subscriptions first, and tell the
        // transfer-function registry the cell is no longer simulated
        if old_model != CellModel::Value {
            self.deps.unsubscribe_all(id);
        }
        if old_model == CellModel::TFunc && new_model != CellModel::TFunc {
            self.tf.deregister(id);
        }

        self.cells.get_mut(id).unwrap().set_origin(to_store.clone());
        if new_model != CellModel::Value {
            self.wire(id);
        }

        self.persist(id, &to_store);

        match new_model {
            CellModel::Value => self.changed(id, user_edit),
            CellModel::Func => self.recompute(id, user_edit),
            // The graph only produces the input; the cell's own value comes
            // later from the simulator
            CellModel::TFunc => self.recompute_input(id),
        }
        Ok(())
    }

    /// Inject the external simulator's output into a `$`-cell.
    ///
    /// This is the tail end of the simulated path: the value lands in the
    /// cell's runtime slot and fans out through the same notification
    /// cascade as any other change. The origin (and the registration) stay
    /// untouched.
    pub fn inject_simulated(&mut self, id: &CellId, value: f64) -> Result<(), GraphError> {
        let cell = self
            .cells
            .get_mut(id)
            .ok_or_else(|| GraphError::NoSuchCell(id.clone()))?;
        if cell.model != CellModel::TFunc {
            return Err(GraphError::NotSimulated(id.clone()));
        }
        let changed = cell.cached != Some(value);
        cell.cached = Some(value);
        if changed {
            self.changed(id, false);
        }
        Ok(())
    }

    // ========================================================================
    // Wiring and propagation
    // ========================================================================

    /// Derive dependencies from the current formula and subscribe to them.
    /// Self-references are dropped to avoid trivial recursion.
    fn wire(&mut self, id: &CellId) {
        let cell = match self.cells.get(id) {
            Some(c) => c,
            None => return,
        };
        let model = cell.model;
        let body = match cell.formula() {
            Some(b) => b.to_string(),
            None => return,
        };

        let expr_text = match model {
            CellModel::TFunc => match parse_tfunc(&body) {
                Ok(spec) => {
                    let text = spec.input_expr.clone();
                    self.tf.register(id.clone(), spec);
                    text
                }
                Err(e) => {
                    warn!(cell = %id, error = %e, "malformed transfer function");
                    return;
                }
            },
            _ => body,
        };

        let refs: Vec<CellId> = extract_refs(&expr_text)
            .into_iter()
            .filter(|dep| dep != id)
            .collect();
        for dep in &refs {
            self.deps.subscribe(dep.clone(), id.clone());
        }
        if self.deps.has_cycle_from(id) {
            warn!(cell = %id, "formula closes a dependency cycle; updates will stall at the re-entrancy guard");
        }
        self.cells.get_mut(id).unwrap().deps = refs;
    }

    /// Re-evaluate a formula cell. Guarded against re-entry: a cell that is
    /// already evaluating ignores the request, which is what cuts off
    /// dependency cycles.
    fn recompute(&mut self, id: &CellId, user_edit: bool) {
        let formula = match self.cells.get(id) {
            Some(c) if !c.evaluating && c.model == CellModel::Func => match c.formula() {
                Some(f) => f.to_string(),
                None => return,
            },
            _ => return,
        };
        self.cells.get_mut(id).unwrap().evaluating = true;
        let result = self.eval(id, &formula);
        let changed = {
            let cell = self.cells.get_mut(id).unwrap();
            let changed = cell.cached != Some(result);
            cell.cached = Some(result);
            changed
        };
        if changed {
            self.changed(id, user_edit);
        }
        self.cells.get_mut(id).unwrap().evaluating = false;
    }

    /// Re-evaluate a `$`-cell's input expression and hand the result to the
    /// transfer-function registry. The cell's own value is not touched.
    fn recompute_input(&mut self, id: &CellId) {
        let input_expr = match (self.cells.get(id), self.tf.get(id)) {
            (Some(c), Some(entry)) if !c.evaluating => entry.spec.input_expr.clone(),
            _ => return,
        };
        self.cells.get_mut(id).unwrap().evaluating = true;
        let result = self.eval(id, &input_expr);
        self.cells.get_mut(id).unwrap().input_value = Some(result);
        self.tf.set_input(id, result);
        self.cells.get_mut(id).unwrap().evaluating = false;
    }

    /// Evaluate an expression against current cell values. Failures are
    /// recovered here: logged, and the typed default (zero) is returned.
    fn eval(&self, id: &CellId, text: &str) -> f64 {
        let resolver = |dep: &CellId| self.human_f64(dep);
        match evaluate_text(text, &resolver) {
            Ok(v) => v,
            Err(e) => {
                warn!(cell = %id, error = %e, "formula evaluation failed, defaulting to 0");
                0.0
            }
        }
    }

    /// Fan a change out: dependents re-evaluate depth-first, then external
    /// listeners are notified.
    fn changed(&mut self, id: &CellId, user_edit: bool) {
        for dep in self.deps.dependents_of(id) {
            match self.cells.get(&dep).map(|c| c.model) {
                Some(CellModel::Func) => self.recompute(&dep, user_edit),
                Some(CellModel::TFunc) => self.recompute_input(&dep),
                _ => {}
            }
        }
        self.emit(id, user_edit);
    }

    fn emit(&mut self, id: &CellId, user_edit: bool) {
        let event = ChangeEvent {
            cell: id.clone(),
            user_edit,
        };
        if let Some(mut subscribers) = self.listeners.remove(id) {
            for (_, listener) in subscribers.iter_mut() {
                listener(&event);
            }
            self.listeners
                .entry(id.clone())
                .or_default()
                .append(&mut subscribers);
        }
    }

    fn persist(&self, id: &CellId, value: &str) {
        let op = WriteOp {
            table: id.table.clone(),
            row: id.row.clone(),
            col: id.column.clone(),
            value: value.to_string(),
        };
        if self.writer.send(op).is_err() {
            warn!(cell = %id, "persistence writer is gone, value kept in memory only");
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a change listener for one cell.
    pub fn subscribe(
        &mut self,
        id: &CellId,
        listener: impl FnMut(&ChangeEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.next_subscription += 1;
        let sub = SubscriptionId(self.next_subscription);
        self.listeners
            .entry(id.clone())
            .or_default()
            .push((sub, Box::new(listener)));
        self.subscriptions.insert(sub, id.clone());
        sub
    }

    /// Remove a previously registered listener.
    pub fn unsubscribe(&mut self, sub: SubscriptionId) {
        if let Some(id) = self.subscriptions.remove(&sub) {
            if let Some(listeners) = self.listeners.get_mut(&id) {
                listeners.retain(|(s, _)| *s != sub);
            }
        }
    }
}

// ============================================================================
// Dispatcher access
// ============================================================================

/// The command dispatcher reads and writes cells in machine representation,
/// keyed by (column, row), and matches addresses against the device columns.
impl hart_protocol::DeviceTable for SimTable {
    fn device_columns(&self) -> Vec<String> {
        SimTable::device_columns(self)
    }

    fn read(&self, column: &str, row: &str) -> Option<String> {
        let id = CellId::new(self.name.clone(), row, column);
        match self.get(&id, Repr::Machine) {
            Ok(value) => {
                let hex = value.to_string();
                if hex.is_empty() {
                    None
                } else {
                    Some(hex)
                }
            }
            Err(_) => None,
        }
    }

    fn write(&mut self, column: &str, row: &str, hex: &str) {
        let id = CellId::new(self.name.clone(), row, column);
        if let Err(e) = self.set(&id, hex, Repr::Machine, false) {
            warn!(cell = %id, error = %e, "dispatcher write dropped");
        }
    }
}
