//! Cell identity

use std::fmt;

/// Columns that describe a row rather than hold a device value.
///
/// Meta cells are opaque strings: never formulas, never translated by the
/// typed-value codec.
pub const META_COLUMNS: [&str; 5] = ["NAME", "TYPE", "BYTE_SIZE", "MB_POINT", "ADDRESS"];

/// Whether a column key is one of the reserved meta columns.
pub fn is_meta_column(column: &str) -> bool {
    META_COLUMNS.contains(&column)
}

/// Identifies one cell as (table, row, column).
///
/// Formulas reference cells in `Table.Column.Row` order; [`CellId::from_ref`]
/// parses that form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellId {
    pub table: String,
    pub row: String,
    pub column: String,
}

impl CellId {
    /// Create a new cell id
    pub fn new(
        table: impl Into<String>,
        row: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            row: row.into(),
            column: column.into(),
        }
    }

    /// Parse a dotted `Table.Column.Row` formula reference.
    pub fn from_ref(token: &str) -> Option<Self> {
        let mut parts = token.split('.');
        let table = parts.next()?;
        let column = parts.next()?;
        let row = parts.next()?;
        if parts.next().is_some() || table.is_empty() || column.is_empty() || row.is_empty() {
            return None;
        }
        Some(Self::new(table, row, column))
    }

    /// Render in the dotted `Table.Column.Row` reference form.
    pub fn to_ref(&self) -> String {
        format!("{}.{}.{}", self.table, self.column, self.row)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.table, self.column, self.row)
    }
}
