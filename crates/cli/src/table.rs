//! Turn a loaded CSV into a configured in-memory grid.

use gridedit_engine::display::{DisplayMode, DisplayRules};
use gridedit_engine::grid::{Grid, MemoryGrid};
use gridedit_engine::years::{distinct_years, initial_year};

use crate::load::Dataset;
use crate::CliError;

#[derive(Debug, Clone)]
pub struct GridOptions {
    pub mode: DisplayMode,
    pub order_column: String,
    /// Explicit search term; wins over the year filter
    pub search: Option<String>,
    pub year_filter: bool,
    pub preferred_year: i32,
}

/// A ready grid plus the years found in the order column.
pub struct OpenedGrid {
    pub grid: MemoryGrid,
    pub years: Vec<i32>,
}

pub fn open_grid(dataset: Dataset, opts: &GridOptions) -> Result<OpenedGrid, CliError> {
    if dataset.header.is_empty() {
        return Err(CliError::io("file has no header row"));
    }

    let mut grid = MemoryGrid::from_dataset(&dataset.header, dataset.rows)
        .with_display(&DisplayRules::builtin(), opts.mode)
        .with_default_order(&opts.order_column);
    let years = distinct_years(&grid, &opts.order_column);

    let search = match &opts.search {
        Some(term) => Some(term.clone()),
        None if opts.year_filter => initial_year(&years, opts.preferred_year).map(|y| y.to_string()),
        None => None,
    };
    if let Some(term) = search {
        log::debug!("initial search {:?}", term);
        grid.set_search(&term).map_err(|e| CliError::engine(e.into()))?;
    }

    Ok(OpenedGrid { grid, years })
}
