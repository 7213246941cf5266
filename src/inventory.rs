//! Life cycle inventory tables: parsed from an uploaded CSV or synthesised.
//!
//! Uploaded tables are accepted with whatever columns they carry.  The first column is treated
//! as the stage label by the chart renderer; nothing else about the shape is assumed.

use std::fmt;

use log::debug;
use rand::Rng;
use thiserror::Error;

/// Header of the stage label column in synthesised tables.
pub const STAGE_COLUMN: &str = "Life Cycle Stage";

/// Life-cycle stages used by synthesised tables, in row order.
pub const LIFE_CYCLE_STAGES: [&str; 4] = ["Materials", "Manufacturing", "Use Phase", "End-of-Life"];

/// A synthesised metric column and the sampling interval for each stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricSpec {
    pub column: &'static str,
    /// Half-open `[low, high)` intervals, one per entry of [`LIFE_CYCLE_STAGES`].
    pub ranges: [(f64, f64); 4],
}

/// The three metric columns of a synthesised table.
pub const METRICS: [MetricSpec; 3] = [
    MetricSpec {
        column: "Energy Use (MJ)",
        ranges: [(80.0, 120.0), (50.0, 100.0), (10.0, 20.0), (15.0, 30.0)],
    },
    MetricSpec {
        column: "GHG Emissions (kg CO2-eq)",
        ranges: [(5.0, 10.0), (8.0, 12.0), (1.0, 3.0), (2.0, 4.0)],
    },
    MetricSpec {
        column: "Water Use (L)",
        ranges: [(20.0, 40.0), (10.0, 30.0), (1.0, 5.0), (5.0, 15.0)],
    },
];

/// Errors raised while parsing an uploaded inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("the dataset has no header row")]
    MissingHeader,
    #[error("row {row} has {found} fields but the header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// A single table cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Classifies a raw CSV field.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else if let Ok(value) = trimmed.parse::<f64>() {
            Cell::Number(value)
        } else {
            Cell::Text(raw.to_owned())
        }
    }

    /// Returns the numeric value, if the cell holds one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

/// An immutable inventory: column names plus rows of cells of the same width.
#[derive(Clone, Debug, PartialEq)]
pub struct InventoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl InventoryTable {
    /// Creates a table, checking that every row matches the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, InventoryError> {
        if columns.is_empty() {
            return Err(InventoryError::MissingHeader);
        }
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(InventoryError::RaggedRow {
                row: index + 1,
                expected: columns.len(),
                found: row.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cells of the column at `index`, in row order.
    pub fn column_cells(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Stringified first-column cells, used as stage labels.
    pub fn stage_labels(&self) -> Vec<String> {
        self.column_cells(0).map(Cell::to_string).collect()
    }

    /// Header plus every row with all cells stringified.
    pub fn to_string_rows(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let body = self
            .rows
            .iter()
            .map(|row| row.iter().map(Cell::to_string).collect())
            .collect();
        (self.columns.clone(), body)
    }
}

/// Synthesises a four-stage table from the thread-local RNG.
///
/// Every call yields different values.
pub fn synthesize() -> InventoryTable {
    synthesize_with(&mut rand::thread_rng())
}

/// Synthesises a four-stage table drawing every cell independently from `rng`.
pub fn synthesize_with<R: Rng + ?Sized>(rng: &mut R) -> InventoryTable {
    let columns = std::iter::once(STAGE_COLUMN)
        .chain(METRICS.iter().map(|metric| metric.column))
        .map(str::to_owned)
        .collect();

    let rows = LIFE_CYCLE_STAGES
        .iter()
        .enumerate()
        .map(|(stage_index, stage)| {
            std::iter::once(Cell::Text((*stage).to_owned()))
                .chain(METRICS.iter().map(|metric| {
                    let (low, high) = metric.ranges[stage_index];
                    Cell::Number(rng.gen_range(low..high))
                }))
                .collect()
        })
        .collect();

    InventoryTable { columns, rows }
}

/// Parses CSV bytes with a header row.
///
/// Rows shorter than the header are padded with empty cells; longer rows are rejected.
pub fn parse(bytes: &[u8]) -> Result<InventoryTable, InventoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    if columns.iter().all(|column| column.trim().is_empty()) {
        return Err(InventoryError::MissingHeader);
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > columns.len() {
            return Err(InventoryError::RaggedRow {
                row: index + 1,
                expected: columns.len(),
                found: record.len(),
            });
        }
        let mut row: Vec<Cell> = record.iter().map(Cell::parse).collect();
        row.resize(columns.len(), Cell::Empty);
        rows.push(row);
    }

    InventoryTable::new(columns, rows)
}

/// Parses an upload, returning `None` on any parse error.
pub fn load(bytes: &[u8]) -> Option<InventoryTable> {
    match parse(bytes) {
        Ok(table) => Some(table),
        Err(err) => {
            debug!("Ignoring uploaded dataset: {}", err);
            None
        }
    }
}

/// Uses the upload when it parses and synthesises a table otherwise.
pub fn load_or_synthesize(upload: Option<&[u8]>) -> InventoryTable {
    upload.and_then(load).unwrap_or_else(synthesize)
}
