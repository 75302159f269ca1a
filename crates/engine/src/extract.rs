//! Resilient extraction of the full dataset from a live grid.
//!
//! The grid may be searched, sorted or half-broken when a save starts, and no
//! single accessor is trusted. Strategies run in a fixed order; each one is
//! guarded so an error, an empty result or an inconsistent result falls
//! through to the next. The first usable result wins.
//!
//! Strategies run strictly one after another: the destroy/rebuild strategy
//! must never overlap a read of the live grid.
//!
//! Output rows are normalized to the dataset header: array rows lose their
//! selection and actions cells, object rows are projected in header order.

use serde::Serialize;

use crate::error::{EngineError, GridError};
use crate::grid::{Grid, GridRow};
use crate::layout::dataset_header_for;

/// One way of reading the grid's unfiltered content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Clear the search, read the rendered rows, restore the search
    TemporarySearchClear,
    /// Data accessor with the search removed
    SearchRemoved,
    /// Data accessor with current order and search removed
    OrderedSearchRemoved,
    /// Legacy whole-table accessor
    LegacyData,
    /// Destroy the widget, read the bare markup, rebuild the widget
    DestroyRebuild,
}

impl Strategy {
    /// Every strategy in the order they are attempted
    pub const ALL: [Strategy; 5] = [
        Strategy::TemporarySearchClear,
        Strategy::SearchRemoved,
        Strategy::OrderedSearchRemoved,
        Strategy::LegacyData,
        Strategy::DestroyRebuild,
    ];

    /// Human-readable name, reported as the extraction method
    pub fn label(self) -> &'static str {
        match self {
            Strategy::TemporarySearchClear => "Temporary search clear + rendered rows",
            Strategy::SearchRemoved => "Grid API with search removed",
            Strategy::OrderedSearchRemoved => "Grid API with order and search removed",
            Strategy::LegacyData => "Legacy bulk accessor",
            Strategy::DestroyRebuild => "Grid destroy/rebuild + markup parsing",
        }
    }

    fn run<G: Grid + ?Sized>(self, grid: &mut G) -> Result<Vec<GridRow>, ExtractionError> {
        match self {
            Strategy::TemporarySearchClear => temporary_search_clear(grid),
            Strategy::SearchRemoved => Ok(grid.rows_search_removed()?),
            Strategy::OrderedSearchRemoved => Ok(grid.rows_ordered_search_removed()?),
            Strategy::LegacyData => Ok(grid.legacy_data()?),
            Strategy::DestroyRebuild => destroy_rebuild(grid),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a single strategy's result was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    Grid(GridError),
    Empty,
    AllMissing,
    Inconsistent(String),
}

impl std::fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionError::Grid(e) => write!(f, "{}", e),
            ExtractionError::Empty => write!(f, "no rows"),
            ExtractionError::AllMissing => write!(f, "only null rows"),
            ExtractionError::Inconsistent(msg) => write!(f, "inconsistent rows: {}", msg),
        }
    }
}

impl From<GridError> for ExtractionError {
    fn from(err: GridError) -> Self {
        ExtractionError::Grid(err)
    }
}

/// A complete dataset read from the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Dataset header (synthetic columns stripped)
    pub header: Vec<String>,
    /// Rows aligned to `header`, canonical order
    pub rows: Vec<Vec<String>>,
    /// Strategy that produced the rows
    pub method: Strategy,
}

/// Extract with every strategy, in order.
pub fn extract<G: Grid + ?Sized>(grid: &mut G) -> Result<Extraction, EngineError> {
    extract_with(grid, &Strategy::ALL)
}

/// Extract trying only the given strategies, in the given order.
pub fn extract_with<G: Grid + ?Sized>(
    grid: &mut G,
    strategies: &[Strategy],
) -> Result<Extraction, EngineError> {
    let header = dataset_header_for(&grid.header());
    let mut attempts = Vec::new();

    for &strategy in strategies {
        let outcome = strategy
            .run(grid)
            .and_then(|rows| normalize(rows, &header));

        match outcome {
            Ok(rows) => {
                log::info!("extracted {} rows using {}", rows.len(), strategy);
                return Ok(Extraction { header, rows, method: strategy });
            }
            Err(e) => {
                log::debug!("extraction strategy '{}' rejected: {}", strategy, e);
                attempts.push(format!("{}: {}", strategy, e));
            }
        }
    }

    Err(EngineError::NoDataExtracted { attempts })
}

fn temporary_search_clear<G: Grid + ?Sized>(grid: &mut G) -> Result<Vec<GridRow>, ExtractionError> {
    let saved = grid.search();
    grid.set_search("")?;
    let rendered = grid.rendered_rows();
    // Restore before looking at the result so the user's view is never left cleared
    let restored = grid.set_search(&saved);
    let rendered = rendered?;
    restored?;

    Ok(rendered
        .into_iter()
        .filter(|row| !row.is_empty())
        .map(GridRow::Array)
        .collect())
}

fn destroy_rebuild<G: Grid + ?Sized>(grid: &mut G) -> Result<Vec<GridRow>, ExtractionError> {
    let saved = grid.search();
    grid.destroy()?;
    let rendered = grid.rendered_rows();
    grid.reinit()?;
    if !saved.is_empty() {
        grid.set_search(&saved)?;
    }

    Ok(rendered?
        .into_iter()
        .filter(|row| !row.is_empty())
        .map(GridRow::Array)
        .collect())
}

/// Validate a strategy's rows and align them to the dataset header.
fn normalize(rows: Vec<GridRow>, header: &[String]) -> Result<Vec<Vec<String>>, ExtractionError> {
    if rows.is_empty() {
        return Err(ExtractionError::Empty);
    }
    if rows.iter().all(|r| matches!(r, GridRow::Missing)) {
        return Err(ExtractionError::AllMissing);
    }

    rows.into_iter()
        .enumerate()
        .map(|(idx, row)| match row {
            GridRow::Array(cells) => Ok(strip_synthetic(cells)),
            GridRow::Object(fields) => {
                if !header.iter().any(|h| fields.contains_key(h)) {
                    return Err(ExtractionError::Inconsistent(format!(
                        "row {} has none of the header fields",
                        idx
                    )));
                }
                Ok(header
                    .iter()
                    .map(|h| fields.get(h).cloned().unwrap_or_default())
                    .collect())
            }
            GridRow::Missing => Err(ExtractionError::Inconsistent(format!("row {} is null", idx))),
        })
        .collect()
}

fn strip_synthetic(mut cells: Vec<String>) -> Vec<String> {
    if cells.len() < 2 {
        return Vec::new();
    }
    cells.pop();
    cells.remove(0);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayMode, DisplayRules};
    use crate::grid::MemoryGrid;
    use crate::harness::{Fault, FaultyGrid};
    use std::collections::BTreeMap;

    fn strings(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    fn dataset(n: usize) -> (Vec<String>, Vec<Vec<String>>) {
        let header = strings(&["STATION", "OFFENSE", "YEAR"]);
        let rows = (0..n)
            .map(|i| vec![format!("S{:02}", i), format!("O{}", i % 3), format!("{}", 2014 + i % 3)])
            .collect();
        (header, rows)
    }

    fn memory(n: usize) -> MemoryGrid {
        let (header, rows) = dataset(n);
        MemoryGrid::from_dataset(&header, rows).with_display(&DisplayRules::builtin(), DisplayMode::Friendly)
    }

    #[test]
    fn test_primary_strategy_ignores_search() {
        for n in [1usize, 50] {
            let mut unfiltered = memory(n);
            let baseline = extract(&mut unfiltered).unwrap();

            let mut filtered = memory(n);
            filtered.set_search("2015").unwrap();
            assert!(filtered.visible_count() < n || n == 1);

            let result = extract(&mut filtered).unwrap();
            assert_eq!(result.method, Strategy::TemporarySearchClear);
            assert_eq!(result.rows, baseline.rows);
            assert_eq!(result.rows.len(), n);
            // Search restored afterwards
            assert_eq!(filtered.search(), "2015");
        }
    }

    #[test]
    fn test_empty_grid_fails_with_no_data() {
        let mut grid = memory(0);
        match extract(&mut grid) {
            Err(EngineError::NoDataExtracted { attempts }) => assert_eq!(attempts.len(), 5),
            other => panic!("expected NoDataExtracted, got {:?}", other),
        }
        assert!(!grid.is_destroyed());
    }

    #[test]
    fn test_falls_through_to_ordered_search_removed() {
        let mut grid = FaultyGrid::new(memory(6));
        grid.inner.set_search("2016").unwrap();
        grid.rendered = Some(Fault::Error);
        grid.search_removed = Some(Fault::Nulls);
        grid.legacy = Some(Fault::Error);
        grid.destroy = Some(Fault::Error);

        let result = extract(&mut grid).unwrap();
        assert_eq!(result.method, Strategy::OrderedSearchRemoved);
        assert_eq!(result.rows, dataset(6).1);
        assert_eq!(grid.calls(), vec!["rendered_rows", "rows_search_removed", "rows_ordered_search_removed"]);
    }

    #[test]
    fn test_falls_through_to_destroy_rebuild() {
        let mut grid = FaultyGrid::new(memory(4));
        grid.inner.set_search("S01").unwrap();
        grid.rendered = Some(Fault::Empty);
        grid.search_removed = Some(Fault::Error);
        grid.ordered = Some(Fault::Empty);
        grid.legacy = Some(Fault::Nulls);

        let result = extract(&mut grid).unwrap();
        assert_eq!(result.method, Strategy::DestroyRebuild);
        assert_eq!(result.rows, dataset(4).1);
        assert!(!grid.inner.is_destroyed());
        assert_eq!(grid.inner.search(), "S01");
        assert_eq!(grid.inner.visible_count(), 1);
    }

    #[test]
    fn test_destroy_rebuild_keeps_view_order() {
        let ordered = || {
            let header = strings(&["DATE_COMMITTED", "STATION"]);
            let rows = vec![
                strings(&["2016-01-01", "B"]),
                strings(&["2014-01-01", "A"]),
                strings(&["2015-01-01", "C"]),
            ];
            MemoryGrid::from_dataset(&header, rows).with_default_order("DATE_COMMITTED")
        };

        let primary = extract(&mut ordered()).unwrap();
        assert_eq!(primary.method, Strategy::TemporarySearchClear);

        let mut grid = FaultyGrid::new(ordered());
        grid.inner.set_search("2015").unwrap();
        grid.rendered = Some(Fault::Error);
        grid.search_removed = Some(Fault::Error);
        grid.ordered = Some(Fault::Error);
        grid.legacy = Some(Fault::Error);

        let fallback = extract(&mut grid).unwrap();
        assert_eq!(fallback.method, Strategy::DestroyRebuild);
        assert_eq!(fallback.rows, primary.rows);
        assert_eq!(fallback.rows[0], strings(&["2014-01-01", "A"]));
    }

    #[test]
    fn test_data_column_named_actions_is_saved() {
        let header = strings(&["actions", "STATION"]);
        let rows = vec![strings(&["review", "A"]), strings(&["", "B"])];
        let mut grid = MemoryGrid::from_dataset(&header, rows.clone());

        let result = extract(&mut grid).unwrap();
        assert_eq!(result.header, header);
        assert_eq!(result.rows, rows);
        assert!(crate::save::validate(&result.header, &result.rows).is_ok());
    }

    #[test]
    fn test_all_strategies_fail() {
        let mut grid = FaultyGrid::new(memory(3));
        grid.rendered = Some(Fault::Error);
        grid.search_removed = Some(Fault::Empty);
        grid.ordered = Some(Fault::Nulls);
        grid.legacy = Some(Fault::Error);
        grid.destroy = Some(Fault::Error);

        assert!(matches!(extract(&mut grid), Err(EngineError::NoDataExtracted { .. })));
    }

    #[test]
    fn test_legacy_accessor_used_when_offered() {
        let mut grid = FaultyGrid::new(memory(2));
        grid.rendered = Some(Fault::Error);
        grid.search_removed = Some(Fault::Error);
        grid.ordered = Some(Fault::Error);
        grid.legacy_supported = true;

        let result = extract(&mut grid).unwrap();
        assert_eq!(result.method, Strategy::LegacyData);
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_object_rows_projected_in_header_order() {
        let header = strings(&["STATION", "OFFENSE"]);
        let mut a = BTreeMap::new();
        a.insert("OFFENSE".to_string(), "Other".to_string());
        a.insert("STATION".to_string(), "A".to_string());
        let mut b = BTreeMap::new();
        b.insert("STATION".to_string(), "B".to_string());

        let rows = normalize(vec![GridRow::Object(a), GridRow::Object(b)], &header).unwrap();
        assert_eq!(rows, vec![strings(&["A", "Other"]), strings(&["B", ""])]);
    }

    #[test]
    fn test_normalize_rejects_partial_nulls_and_foreign_objects() {
        let header = strings(&["STATION"]);
        let rows = vec![GridRow::Array(strings(&["", "A", ""])), GridRow::Missing];
        assert!(matches!(normalize(rows, &header), Err(ExtractionError::Inconsistent(_))));

        let mut foreign = BTreeMap::new();
        foreign.insert("OTHER".to_string(), "x".to_string());
        assert!(matches!(
            normalize(vec![GridRow::Object(foreign)], &header),
            Err(ExtractionError::Inconsistent(_))
        ));
        assert_eq!(normalize(vec![GridRow::Missing], &header), Err(ExtractionError::AllMissing));
        assert_eq!(normalize(vec![], &header), Err(ExtractionError::Empty));
    }

    #[test]
    fn test_strip_synthetic() {
        assert_eq!(strip_synthetic(strings(&["", "a", "b", "Delete"])), strings(&["a", "b"]));
        assert!(strip_synthetic(strings(&["x"])).is_empty());
    }
}
