//! Grid index model.
//!
//! The rendered grid carries two synthetic columns that never reach the
//! persisted dataset:
//! - column 0: row selection checkbox
//! - last column: row actions (delete button)
//!
//! Two coordinate spaces exist and are kept apart by type:
//! - `GridCoord` addresses the rendered grid (synthetic columns included)
//! - `DataCoord` addresses the dataset (synthetic columns excluded)
//!
//! Conversion happens here and nowhere else.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Header text of the leading selection column.
pub const SELECT_HEADER: &str = "Select";
/// Header text of the trailing actions column.
pub const ACTIONS_HEADER: &str = "Actions";

/// Number of synthetic columns before the first data column.
const LEADING_OFFSET: usize = 1;

/// Cell position in the rendered grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub row: usize,
    pub col: usize,
}

impl GridCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Cell position in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataCoord {
    pub row: usize,
    pub col: usize,
}

impl DataCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

pub(crate) fn is_select_header(text: &str) -> bool {
    text.trim() == SELECT_HEADER
}

pub(crate) fn is_actions_header(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(ACTIONS_HEADER)
}

/// Strip the selection (first) and actions (last) entries from a grid header.
pub fn dataset_header_for(grid_header: &[String]) -> Vec<String> {
    if grid_header.len() < 2 {
        return Vec::new();
    }
    grid_header[1..grid_header.len() - 1]
        .iter()
        .map(|h| h.trim().to_string())
        .collect()
}

/// True when the header already ends with the actions column.
pub(crate) fn has_actions_column(header: &[String]) -> bool {
    header.last().map(|h| is_actions_header(h)).unwrap_or(false)
}

/// Add the synthetic columns to a header, once.
///
/// Idempotent: a header already starting with `Select` keeps it, a header
/// already ending with `Actions` (case-insensitive) keeps it. A data column
/// named `Actions` anywhere else is ordinary data.
pub fn decorate_header(header: &[String]) -> Vec<String> {
    let mut out: Vec<String> = header.to_vec();
    if !has_actions_column(&out) {
        out.push(ACTIONS_HEADER.to_string());
    }
    if !out.first().map(|h| is_select_header(h)).unwrap_or(false) {
        out.insert(0, SELECT_HEADER.to_string());
    }
    out
}

/// Add empty synthetic cells to a dataset row.
pub fn decorate_row(row: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(row.len() + 2);
    out.push(String::new());
    out.extend(row.iter().cloned());
    out.push(String::new());
    out
}

/// Index arithmetic for one grid header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    grid_header: Vec<String>,
    dataset_header: Vec<String>,
}

impl GridLayout {
    /// Build from a grid header (synthetic columns included).
    pub fn new(grid_header: Vec<String>) -> Self {
        let dataset_header = dataset_header_for(&grid_header);
        Self { grid_header, dataset_header }
    }

    pub fn grid_header(&self) -> &[String] {
        &self.grid_header
    }

    pub fn dataset_header(&self) -> &[String] {
        &self.dataset_header
    }

    /// Width every grid row must have.
    pub fn grid_width(&self) -> usize {
        self.grid_header.len()
    }

    pub fn dataset_width(&self) -> usize {
        self.dataset_header.len()
    }

    fn actions_col(&self) -> Option<usize> {
        self.grid_header.len().checked_sub(1)
    }

    /// Convert a grid coordinate to a dataset coordinate.
    ///
    /// Returns None for the selection column, the actions column, or any
    /// column past the dataset width.
    pub fn to_dataset(&self, coord: GridCoord) -> Option<DataCoord> {
        if Some(coord.col) == self.actions_col() {
            return None;
        }
        let col = coord.col.checked_sub(LEADING_OFFSET)?;
        if col >= self.dataset_width() {
            return None;
        }
        Some(DataCoord::new(coord.row, col))
    }

    /// Convert a dataset coordinate to a grid coordinate.
    pub fn to_grid(&self, coord: DataCoord) -> Option<GridCoord> {
        if coord.col >= self.dataset_width() {
            return None;
        }
        Some(GridCoord::new(coord.row, coord.col + LEADING_OFFSET))
    }

    /// Reject a coordinate that does not address a data cell.
    pub fn require_data_cell(&self, coord: GridCoord) -> Result<DataCoord, EngineError> {
        self.to_dataset(coord).ok_or(EngineError::SyntheticColumn(coord))
    }

    /// Reject a row missing one of its synthetic cells.
    pub fn check_row(&self, row: usize, width: usize) -> Result<(), EngineError> {
        if width != self.grid_width() {
            return Err(EngineError::MisalignedRow {
                row,
                expected: self.grid_width(),
                found: width,
            });
        }
        Ok(())
    }
}
