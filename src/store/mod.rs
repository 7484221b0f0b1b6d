//! Table persistence for tracked positions.
//!
//! This module provides:
//! - The `TableStore` collaborator contract
//! - The tracking-sheet column layout
//! - A CSV-backed store

pub mod csv_store;

pub use csv_store::CsvTableStore;

use crate::domain::TrackedPosition;
use thiserror::Error;

/// Column headers of the tracking table, in order.
pub const TRACKING_COLUMNS: [&str; 19] = [
    "Symbol",
    "Purchase Date",
    "Initial Price",
    "End Price",
    "Total Change Pct",
    "Day 1 Price",
    "Day 1 Change Pct",
    "Day 2 Price",
    "Day 2 Change Pct",
    "Day 3 Price",
    "Day 3 Change Pct",
    "Day 4 Price",
    "Day 4 Change Pct",
    "Day 5 Price",
    "Day 5 Change Pct",
    "Day 6 Price",
    "Day 6 Change Pct",
    "Day 7 Price",
    "Day 7 Change Pct",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table not found: {0}")]
    NotFound(String),
    #[error("table already exists: {0}")]
    AlreadyExists(String),
    #[error("missing required column: {0}")]
    MissingColumn(String),
    #[error("invalid value {value:?} in column '{column}' on line {line}")]
    InvalidCell {
        line: u64,
        column: String,
        value: String,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// `None` for lines without a symbol; those are written back untouched.
    pub position: Option<TrackedPosition>,
    /// Cells as read, in file column order. Tracking cells are overwritten
    /// from `position` on save; all other cells pass through.
    pub cells: Vec<String>,
}

impl TableRow {
    pub fn tracked(position: TrackedPosition) -> Self {
        Self {
            position: Some(position),
            cells: Vec::new(),
        }
    }
}

/// Whole table: the header as found in the file plus every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            columns: TRACKING_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: &[TrackedPosition]) -> Self {
        Self {
            rows: positions.iter().cloned().map(TableRow::tracked).collect(),
            ..Self::default()
        }
    }

    /// Tracked positions in table order, skipping pass-through lines.
    pub fn positions(&self) -> impl Iterator<Item = &TrackedPosition> {
        self.rows.iter().filter_map(|r| r.position.as_ref())
    }

    pub fn into_positions(self) -> Vec<TrackedPosition> {
        self.rows.into_iter().filter_map(|r| r.position).collect()
    }

    /// Header to write: the existing columns, then any missing tracking
    /// columns in tracking order.
    pub fn output_columns(&self) -> Vec<String> {
        let mut columns = self.columns.clone();
        for name in TRACKING_COLUMNS {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        columns
    }
}

/// Ordered table of tracked positions.
///
/// Rows are addressed by position within one pass; `save_table` replaces
/// the whole file.
pub trait TableStore: Send + Sync {
    /// Whether the table exists yet.
    fn exists(&self) -> bool;

    /// Create an empty table with the tracking header.
    fn create(&self) -> Result<(), StoreError>;

    /// Column headers as stored.
    fn columns(&self) -> Result<Vec<String>, StoreError>;

    /// Load every line, keeping columns and lines the tracker does not own.
    fn load_table(&self) -> Result<Table, StoreError>;

    /// Replace the stored table with `table`.
    fn save_table(&self, table: &Table) -> Result<(), StoreError>;

    /// Tracked positions only, in table order.
    fn load(&self) -> Result<Vec<TrackedPosition>, StoreError> {
        Ok(self.load_table()?.into_positions())
    }

    /// Replace the table with a fresh one holding just `rows`.
    fn save(&self, rows: &[TrackedPosition]) -> Result<(), StoreError> {
        self.save_table(&Table::from_positions(rows))
    }
}
