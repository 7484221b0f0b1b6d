//! CSV-backed tracking table.

use super::{StoreError, Table, TableRow, TableStore, TRACKING_COLUMNS};
use crate::domain::{
    format_date, parse_calendar_date, Decimal, Symbol, TrackedPosition, DAYS_TRACKED,
};
use csv::StringRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tracking table stored as a CSV file with the tracking-sheet header.
#[derive(Debug, Clone)]
pub struct CsvTableStore {
    path: PathBuf,
}

impl CsvTableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Write header and rows to a sibling file, then rename it into place.
    fn write_atomic(&self, table: &Table) -> Result<(), StoreError> {
        let columns = table.output_columns();
        let tmp = self.temp_path();
        {
            // Pass-through lines may be longer than the header.
            let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&tmp)?;
            writer.write_record(&columns)?;
            for row in &table.rows {
                writer.write_record(to_record(row, &columns))?;
            }
            writer.flush()?;
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn reader(&self) -> Result<csv::Reader<std::fs::File>, StoreError> {
        if !self.exists() {
            return Err(StoreError::NotFound(self.path.display().to_string()));
        }
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?)
    }
}

impl TableStore for CsvTableStore {
    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn create(&self) -> Result<(), StoreError> {
        if self.exists() {
            return Err(StoreError::AlreadyExists(self.path.display().to_string()));
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.write_atomic(&Table::new())?;
        info!(
            "Created {} with {} columns",
            self.path.display(),
            TRACKING_COLUMNS.len()
        );
        Ok(())
    }

    fn columns(&self) -> Result<Vec<String>, StoreError> {
        let mut reader = self.reader()?;
        Ok(reader.headers()?.iter().map(str::to_string).collect())
    }

    fn load_table(&self) -> Result<Table, StoreError> {
        let mut reader = self.reader()?;
        let headers = reader.headers()?.clone();
        let layout = Layout::from_headers(&headers)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let position = layout.parse(&record, line)?;
            if position.is_none() {
                debug!("Keeping line {} without a symbol as-is", line);
            }
            rows.push(TableRow {
                position,
                cells: record.iter().map(str::to_string).collect(),
            });
        }

        let table = Table {
            columns: headers.iter().map(str::to_string).collect(),
            rows,
        };
        info!(
            "Loaded {} rows ({} tracked) from {}",
            table.rows.len(),
            table.positions().count(),
            self.path.display()
        );
        Ok(table)
    }

    fn save_table(&self, table: &Table) -> Result<(), StoreError> {
        self.write_atomic(table)?;
        info!("Saved {} rows to {}", table.rows.len(), self.path.display());
        Ok(())
    }
}

/// Column positions resolved from the file's header.
struct Layout {
    index: HashMap<String, usize>,
}

impl Layout {
    fn from_headers(headers: &StringRecord) -> Result<Self, StoreError> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (i, h) in headers.iter().enumerate() {
            index.entry(h.to_string()).or_insert(i);
        }
        if !index.contains_key(TRACKING_COLUMNS[0]) {
            return Err(StoreError::MissingColumn(TRACKING_COLUMNS[0].to_string()));
        }
        Ok(Self { index })
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        let value = record.get(*self.index.get(column)?)?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("nan") {
            None
        } else {
            Some(value)
        }
    }

    fn decimal(
        &self,
        record: &StringRecord,
        column: &str,
        line: u64,
    ) -> Result<Option<Decimal>, StoreError> {
        self.cell(record, column)
            .map(|raw| {
                Decimal::from_str_canonical(raw).map_err(|_| StoreError::InvalidCell {
                    line,
                    column: column.to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()
    }

    fn parse(&self, record: &StringRecord, line: u64) -> Result<Option<TrackedPosition>, StoreError> {
        let Some(symbol) = self.cell(record, "Symbol") else {
            return Ok(None);
        };
        let mut row = TrackedPosition::new(Symbol::new(symbol));

        row.purchase_date = self
            .cell(record, "Purchase Date")
            .map(|raw| {
                parse_calendar_date(raw).ok_or_else(|| StoreError::InvalidCell {
                    line,
                    column: "Purchase Date".to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()?;
        row.initial_price = self.decimal(record, "Initial Price", line)?;
        row.end_price = self.decimal(record, "End Price", line)?;
        row.total_change_pct = self.decimal(record, "Total Change Pct", line)?;

        for n in 1..=DAYS_TRACKED {
            let entry = row.day_mut(n);
            entry.price = self.decimal(record, &format!("Day {} Price", n), line)?;
            entry.change_pct = self.decimal(record, &format!("Day {} Change Pct", n), line)?;
        }
        Ok(Some(row))
    }
}

/// Tracking cells of a position, paired with their column names.
fn tracking_cells(row: &TrackedPosition) -> Vec<(&'static str, String)> {
    let cell = |v: Option<Decimal>| v.map(|d| d.to_canonical_string()).unwrap_or_default();

    let mut values = Vec::with_capacity(TRACKING_COLUMNS.len());
    values.push(row.symbol.to_string());
    values.push(row.purchase_date.map(format_date).unwrap_or_default());
    values.push(cell(row.initial_price));
    values.push(cell(row.end_price));
    values.push(cell(row.total_change_pct));
    for day in &row.days {
        values.push(cell(day.price));
        values.push(cell(day.change_pct));
    }
    TRACKING_COLUMNS.into_iter().zip(values).collect()
}

/// Original cells padded to the header, with tracking cells overlaid.
fn to_record(row: &TableRow, columns: &[String]) -> Vec<String> {
    let mut record = row.cells.clone();
    if record.len() < columns.len() {
        record.resize(columns.len(), String::new());
    }
    if let Some(position) = &row.position {
        for (name, value) in tracking_cells(position) {
            if let Some(i) = columns.iter().position(|c| c == name) {
                record[i] = value;
            }
        }
    }
    record
}
