//! Fault-injection grid for exercising the extraction fallbacks.
//!
//! Wraps a `MemoryGrid` and lets each data accessor be forced to error,
//! return nothing, or return null rows. Accessor calls are recorded in order.

use std::cell::RefCell;

use crate::error::GridError;
use crate::grid::{Grid, GridRow, MemoryGrid};
use crate::layout::GridCoord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Error,
    Empty,
    Nulls,
}

pub struct FaultyGrid {
    pub inner: MemoryGrid,
    /// Applies to live reads only; markup reads after destroy pass through
    pub rendered: Option<Fault>,
    pub search_removed: Option<Fault>,
    pub ordered: Option<Fault>,
    pub legacy: Option<Fault>,
    pub legacy_supported: bool,
    pub destroy: Option<Fault>,
    calls: RefCell<Vec<&'static str>>,
}

impl FaultyGrid {
    pub fn new(inner: MemoryGrid) -> Self {
        Self {
            inner,
            rendered: None,
            search_removed: None,
            ordered: None,
            legacy: None,
            legacy_supported: false,
            destroy: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    fn record(&self, name: &'static str) {
        self.calls.borrow_mut().push(name);
    }

    fn faulted(&self, fault: Fault) -> Result<Vec<GridRow>, GridError> {
        match fault {
            Fault::Error => Err(GridError::Other("injected failure".into())),
            Fault::Empty => Ok(Vec::new()),
            Fault::Nulls => Ok(vec![GridRow::Missing; self.inner.row_count().max(1)]),
        }
    }
}

impl Grid for FaultyGrid {
    fn header(&self) -> Vec<String> {
        self.inner.header()
    }

    fn row_count(&self) -> usize {
        self.inner.row_count()
    }

    fn row(&self, row: usize) -> Result<Vec<String>, GridError> {
        self.inner.row(row)
    }

    fn cell(&self, coord: GridCoord) -> Result<String, GridError> {
        self.inner.cell(coord)
    }

    fn set_cell(&mut self, coord: GridCoord, value: &str) -> Result<(), GridError> {
        self.inner.set_cell(coord, value)
    }

    fn add_row(&mut self, row: Vec<String>) -> Result<(), GridError> {
        self.inner.add_row(row)
    }

    fn remove_row(&mut self, row: usize) -> Result<(), GridError> {
        self.inner.remove_row(row)
    }

    fn add_rows(&mut self, rows: Vec<Vec<String>>) -> Result<(), GridError> {
        self.inner.add_rows(rows)
    }

    fn clear(&mut self) -> Result<(), GridError> {
        self.inner.clear()
    }

    fn search(&self) -> String {
        self.inner.search()
    }

    fn set_search(&mut self, term: &str) -> Result<(), GridError> {
        self.inner.set_search(term)
    }

    fn rendered_rows(&self) -> Result<Vec<Vec<String>>, GridError> {
        if self.inner.is_destroyed() {
            return self.inner.rendered_rows();
        }
        self.record("rendered_rows");
        match self.rendered {
            Some(Fault::Error) => Err(GridError::Other("injected failure".into())),
            Some(Fault::Empty) | Some(Fault::Nulls) => Ok(Vec::new()),
            None => self.inner.rendered_rows(),
        }
    }

    fn rows_search_removed(&self) -> Result<Vec<GridRow>, GridError> {
        self.record("rows_search_removed");
        match self.search_removed {
            Some(fault) => self.faulted(fault),
            None => self.inner.rows_search_removed(),
        }
    }

    fn rows_ordered_search_removed(&self) -> Result<Vec<GridRow>, GridError> {
        self.record("rows_ordered_search_removed");
        match self.ordered {
            Some(fault) => self.faulted(fault),
            None => self.inner.rows_ordered_search_removed(),
        }
    }

    fn legacy_data(&self) -> Result<Vec<GridRow>, GridError> {
        self.record("legacy_data");
        match self.legacy {
            Some(fault) => self.faulted(fault),
            None if self.legacy_supported => self.inner.rows_search_removed(),
            None => Err(GridError::Unsupported("legacy data accessor")),
        }
    }

    fn destroy(&mut self) -> Result<(), GridError> {
        self.record("destroy");
        match self.destroy {
            Some(_) => Err(GridError::Other("injected failure".into())),
            None => self.inner.destroy(),
        }
    }

    fn reinit(&mut self) -> Result<(), GridError> {
        self.inner.reinit()
    }
}
