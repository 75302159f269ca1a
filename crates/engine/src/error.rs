//! Error types for the editable-dataset engine.
//!
//! Two layers:
//! - `GridError` is what the grid widget collaborator reports
//! - `EngineError` is what engine operations surface to the caller
//!
//! Recoverable conditions (stale coordinates during replay, display rule
//! failures) are handled inside the engine and only logged.

use crate::layout::GridCoord;

/// Failures reported by a grid widget implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Row index not present in the grid
    RowOutOfRange(usize),
    /// Column index not present in the row
    ColumnOutOfRange(usize),
    /// The grid instance was destroyed and not yet rebuilt
    Destroyed,
    /// The widget does not offer this accessor
    Unsupported(&'static str),
    /// Any other widget-specific failure
    Other(String),
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::RowOutOfRange(row) => write!(f, "row {} is not in the grid", row),
            GridError::ColumnOutOfRange(col) => write!(f, "column {} is not in the grid", col),
            GridError::Destroyed => write!(f, "grid instance is destroyed"),
            GridError::Unsupported(what) => write!(f, "grid does not support {}", what),
            GridError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GridError {}

/// Errors surfaced by engine operations.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Target cell of an edit no longer exists
    StaleCoordinate(GridCoord),
    /// Coordinate points at the selection or actions column
    SyntheticColumn(GridCoord),
    /// Row lacks one of the synthetic columns (width differs from grid header)
    MisalignedRow { row: usize, expected: usize, found: usize },
    /// Every extraction strategy failed or returned nothing usable
    NoDataExtracted { attempts: Vec<String> },
    /// Extracted row width differs from header width
    SchemaMismatch { row: usize, header_count: usize, row_width: usize },
    /// No dataset headers to save against
    EmptyHeader,
    /// Server or transport rejected the save
    PersistenceFailure(String),
    /// Operation requires an active edit session
    NotEditing,
    /// A save request is already in flight
    SaveInFlight,
    /// Grid collaborator failure
    Grid(GridError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::StaleCoordinate(c) => {
                write!(f, "cell ({}, {}) no longer exists", c.row, c.col)
            }
            EngineError::SyntheticColumn(c) => {
                write!(f, "column {} is not a data column", c.col)
            }
            EngineError::MisalignedRow { row, expected, found } => write!(
                f,
                "row {} has {} cells, expected {} (selection/actions column missing)",
                row, found, expected
            ),
            EngineError::NoDataExtracted { attempts } => {
                write!(f, "No data rows found")?;
                if !attempts.is_empty() {
                    write!(f, " (tried: {})", attempts.join("; "))?;
                }
                Ok(())
            }
            EngineError::SchemaMismatch { row, header_count, row_width } => write!(
                f,
                "Data mismatch: found {} headers but {} data columns (row {})",
                header_count, row_width, row
            ),
            EngineError::EmptyHeader => write!(f, "No headers found"),
            EngineError::PersistenceFailure(msg) => write!(f, "Error saving table: {}", msg),
            EngineError::NotEditing => write!(f, "not in edit mode"),
            EngineError::SaveInFlight => write!(f, "a save is already in progress"),
            EngineError::Grid(e) => write!(f, "grid error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<GridError> for EngineError {
    fn from(err: GridError) -> Self {
        EngineError::Grid(err)
    }
}
