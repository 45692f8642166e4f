//! Boundary seams for the external Modbus server and desktop GUI.
//!
//! Both collaborators live on their own threads, so the bridges share the
//! graph behind a mutex: one writer at a time, and every `set` runs its
//! full propagation cascade before the lock is released.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use tracing::debug;

use hartsim_core::CellId;

use crate::graph::{ChangeEvent, GraphError, Repr, SimTable, SubscriptionId};

/// Modbus point kind, matched against a row's `MB_POINT` meta cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// Read-only input register
    Input,
    /// Read-write holding register
    Holding,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Input => "IR",
            PointKind::Holding => "HR",
        }
    }
}

impl FromStr for PointKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "IR" => Ok(PointKind::Input),
            "HR" => Ok(PointKind::Holding),
            _ => Err(()),
        }
    }
}

/// Register-map view of one device column, consumed by the external Modbus
/// TCP server.
pub struct ModbusBridge {
    table: Arc<Mutex<SimTable>>,
    column: String,
}

impl ModbusBridge {
    pub fn new(table: Arc<Mutex<SimTable>>, column: impl Into<String>) -> Self {
        Self {
            table,
            column: column.into(),
        }
    }

    /// Resolve a register address to its machine value.
    ///
    /// The row is found by its `ADDRESS` and `MB_POINT` meta cells; the
    /// result is sized per the declared type (32 bits for SREAL/TIME,
    /// 16 bits otherwise). `None` when no row maps to the address.
    pub fn read_register(&self, address: u16, kind: PointKind) -> Option<u32> {
        let table = self.table.lock().unwrap();
        let row = find_row(&table, address, kind)?;
        let id = CellId::new(table.name(), row, self.column.clone());
        let hex = table.get(&id, Repr::Machine).ok()?.to_string();
        let value = u32::from_str_radix(hex.trim(), 16).ok()?;
        let wide = table.declared_type(&id).map(|t| t.is_wide()).unwrap_or(false);
        Some(if wide { value } else { value & 0xFFFF })
    }

    /// Write a register through the normal cell-write path (display
    /// representation, so the value goes through the codec).
    pub fn write_register(&self, address: u16, value: f64) -> Result<(), GraphError> {
        let mut table = self.table.lock().unwrap();
        let row = find_row(&table, address, PointKind::Holding)
            .ok_or_else(|| GraphError::Unresolved(format!("register {address}")))?;
        let id = CellId::new(table.name(), row, self.column.clone());
        let text = if value.fract() == 0.0 {
            format!("{}", value as i64)
        } else {
            value.to_string()
        };
        debug!(address, row = %id.row, "modbus register write");
        table.set(&id, &text, Repr::Human, false)
    }
}

/// Find the row whose `ADDRESS`/`MB_POINT` meta cells match.
fn find_row(table: &SimTable, address: u16, kind: PointKind) -> Option<String> {
    let wanted = address.to_string();
    table.rows().iter().cloned().find(|row| {
        let addr = CellId::new(table.name(), row.clone(), "ADDRESS");
        let point = CellId::new(table.name(), row.clone(), "MB_POINT");
        let addr_hit = table
            .get(&addr, Repr::Origin)
            .map(|v| v.to_string().trim() == wanted)
            .unwrap_or(false);
        let kind_hit = table
            .get(&point, Repr::Origin)
            .map(|v| v.to_string().trim() == kind.as_str())
            .unwrap_or(false);
        addr_hit && kind_hit
    })
}

/// Display-facing view for the desktop GUI.
pub struct GuiBridge {
    table: Arc<Mutex<SimTable>>,
}

impl GuiBridge {
    pub fn new(table: Arc<Mutex<SimTable>>) -> Self {
        Self { table }
    }

    /// Register a change callback for one cell.
    pub fn subscribe(
        &self,
        id: &CellId,
        listener: impl FnMut(&ChangeEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.table.lock().unwrap().subscribe(id, listener)
    }

    pub fn unsubscribe(&self, sub: SubscriptionId) {
        self.table.lock().unwrap().unsubscribe(sub);
    }

    /// Pre-formatted display value. A cell that cannot render (bad hex,
    /// unresolved formula) shows the recoverable-error marker instead of
    /// blocking the rest of the table.
    pub fn display_value(&self, id: &CellId) -> String {
        match self.table.lock().unwrap().get(id, Repr::Human) {
            Ok(value) => value.to_string(),
            Err(_) => "#ERR".to_string(),
        }
    }

    /// A user edit: display representation, flagged as such in the change
    /// notifications.
    pub fn apply_user_edit(&self, id: &CellId, text: &str) -> Result<(), GraphError> {
        self.table.lock().unwrap().set(id, text, Repr::Human, true)
    }
}
