//! The persistence collaborator.
//!
//! The production application keeps tables in a SQLite key/value store;
//! this crate only consumes the boundary. Missing rows/columns yield
//! `None` - never an error - and composite row keys (`"A | B"`, `"A & B"`)
//! are resolved above this layer, by the graph.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

/// Table storage as the graph consumes it.
///
/// `row_keys`/`col_keys` are ordered; `get_raw` returns `None` for cells
/// that were never written.
#[async_trait]
pub trait Store: Send + Sync {
    async fn row_keys(&self, table: &str) -> Vec<String>;
    async fn col_keys(&self, table: &str) -> Vec<String>;
    async fn get_raw(&self, table: &str, row: &str, col: &str) -> Option<String>;
    async fn set_raw(&self, table: &str, row: &str, col: &str, value: &str);
}

/// In-memory [`Store`], used by tests and the CLI.
///
/// Key order is insertion order, like the production store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: Vec<String>,
    cols: Vec<String>,
    cells: BTreeMap<(String, String, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one cell, registering its row and column keys on first sight.
    pub fn seed(&self, table: &str, row: &str, col: &str, value: &str) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.rows.iter().any(|r| r == row) {
            inner.rows.push(row.to_string());
        }
        if !inner.cols.iter().any(|c| c == col) {
            inner.cols.push(col.to_string());
        }
        inner.cells.insert(
            (table.to_string(), row.to_string(), col.to_string()),
            value.to_string(),
        );
    }

    /// Snapshot of a cell, for assertions on persisted state.
    pub fn raw(&self, table: &str, row: &str, col: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .cells
            .get(&(table.to_string(), row.to_string(), col.to_string()))
            .cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn row_keys(&self, _table: &str) -> Vec<String> {
        self.inner.lock().unwrap().rows.clone()
    }

    async fn col_keys(&self, _table: &str) -> Vec<String> {
        self.inner.lock().unwrap().cols.clone()
    }

    async fn get_raw(&self, table: &str, row: &str, col: &str) -> Option<String> {
        self.raw(table, row, col)
    }

    async fn set_raw(&self, table: &str, row: &str, col: &str, value: &str) {
        self.inner.lock().unwrap().cells.insert(
            (table.to_string(), row.to_string(), col.to_string()),
            value.to_string(),
        );
    }
}
