//! Grid widget collaborator.
//!
//! `Grid` is the interface the engine needs from a rendered, searchable table
//! widget. Rows are addressed by their data index (stable under sort and
//! search); cells by `GridCoord`, synthetic columns included.
//!
//! `MemoryGrid` is a complete in-process implementation backed by a row view
//! layer. Its "markup" is the plain cell text: selection cells render empty,
//! actions cells render the delete button label, data cells render their raw
//! value trimmed.

use std::collections::BTreeMap;

use crate::display::{ColumnId, DisplayMode, DisplayRegistry, DisplayRules, RenderContext};
use crate::error::GridError;
use crate::layout::{self, GridCoord, GridLayout};
use crate::view::{sort_permutation, RowView, SortDirection, SortState};

/// Text of the actions cell as rendered.
pub const DELETE_BUTTON_TEXT: &str = "Delete";

/// One row as returned by a widget data accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridRow {
    /// Positional cells, synthetic columns included
    Array(Vec<String>),
    /// Named fields keyed by header text
    Object(BTreeMap<String, String>),
    /// Accessor returned null for this row (e.g. hidden by a filter)
    Missing,
}

/// Operations the engine needs from the grid widget.
pub trait Grid {
    /// Header text of every column, synthetic columns included
    fn header(&self) -> Vec<String>;

    /// Total rows, search ignored
    fn row_count(&self) -> usize;

    /// Cells of one row, synthetic columns included
    fn row(&self, row: usize) -> Result<Vec<String>, GridError>;

    fn cell(&self, coord: GridCoord) -> Result<String, GridError>;

    /// Set one cell's data and redraw
    fn set_cell(&mut self, coord: GridCoord, value: &str) -> Result<(), GridError>;

    /// Append a row and redraw
    fn add_row(&mut self, row: Vec<String>) -> Result<(), GridError>;

    /// Remove a row and redraw; later rows shift down
    fn remove_row(&mut self, row: usize) -> Result<(), GridError>;

    /// Append many rows, one redraw
    fn add_rows(&mut self, rows: Vec<Vec<String>>) -> Result<(), GridError>;

    /// Remove every row
    fn clear(&mut self) -> Result<(), GridError>;

    /// Current search term
    fn search(&self) -> String;

    /// Set the search term and redraw
    fn set_search(&mut self, term: &str) -> Result<(), GridError>;

    /// Text of the rendered rows, trimmed, in rendered order.
    ///
    /// On a live grid these are the rows passing the current search. On a
    /// destroyed grid this reads the bare markup, which holds every row in
    /// the order last drawn.
    fn rendered_rows(&self) -> Result<Vec<Vec<String>>, GridError>;

    /// Data accessor with the search removed
    fn rows_search_removed(&self) -> Result<Vec<GridRow>, GridError>;

    /// Data accessor with the search removed, current order requested explicitly
    fn rows_ordered_search_removed(&self) -> Result<Vec<GridRow>, GridError>;

    /// Legacy whole-table accessor, if the widget still offers one
    fn legacy_data(&self) -> Result<Vec<GridRow>, GridError> {
        Err(GridError::Unsupported("legacy data accessor"))
    }

    /// Tear down the widget instance, leaving the markup in place
    fn destroy(&mut self) -> Result<(), GridError>;

    /// Rebuild the widget instance with its original configuration
    fn reinit(&mut self) -> Result<(), GridError>;

    /// Deep copy of every row in data order
    fn snapshot(&self) -> Result<Vec<Vec<String>>, GridError> {
        (0..self.row_count()).map(|r| self.row(r)).collect()
    }
}

// =============================================================================
// MemoryGrid
// =============================================================================

/// Configuration applied on construction and on every rebuild.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridConfig {
    /// Initial order (grid column index)
    pub order: Option<SortState>,
}

pub struct MemoryGrid {
    layout: GridLayout,
    rows: Vec<Vec<String>>,
    view: RowView,
    search: String,
    sort: Option<SortState>,
    config: GridConfig,
    display: DisplayRegistry,
    mode: DisplayMode,
    destroyed: bool,
}

impl MemoryGrid {
    /// Build from an already-decorated grid header and rows.
    pub fn new(grid_header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let view = RowView::new(rows.len());
        Self {
            layout: GridLayout::new(grid_header),
            rows,
            view,
            search: String::new(),
            sort: None,
            config: GridConfig::default(),
            display: DisplayRegistry::default(),
            mode: DisplayMode::default(),
            destroyed: false,
        }
    }

    /// Build from a plain dataset, adding the synthetic columns once.
    pub fn from_dataset(header: &[String], rows: Vec<Vec<String>>) -> Self {
        let added_select = !header.first().map(|h| layout::is_select_header(h)).unwrap_or(false);
        let added_actions = !layout::has_actions_column(header);
        let grid_header = layout::decorate_header(header);

        let rows = rows
            .into_iter()
            .map(|mut row| {
                if added_select {
                    row.insert(0, String::new());
                }
                if added_actions {
                    row.push(String::new());
                }
                row
            })
            .collect();
        Self::new(grid_header, rows)
    }

    /// Bind display rules and set the rendering mode.
    pub fn with_display(mut self, rules: &DisplayRules, mode: DisplayMode) -> Self {
        self.display = rules.bind(self.layout.dataset_header());
        self.mode = mode;
        self.redraw();
        self
    }

    /// Configure and apply the default order.
    pub fn with_config(mut self, config: GridConfig) -> Self {
        self.config = config;
        self.sort = config.order;
        self.redraw();
        self
    }

    /// Default order by a named data column, ascending, if present.
    pub fn with_default_order(self, column: &str) -> Self {
        let order = self
            .layout
            .grid_header()
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(column))
            .map(|col| SortState { column: col, direction: SortDirection::Ascending });
        self.with_config(GridConfig { order })
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn display(&self) -> &DisplayRegistry {
        &self.display
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Switch raw/friendly rendering for every column and redraw.
    pub fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
        self.redraw();
    }

    pub fn sort_state(&self) -> Option<SortState> {
        self.sort
    }

    /// Order by a grid column and redraw.
    pub fn order_by(&mut self, column: usize, direction: SortDirection) -> Result<(), GridError> {
        self.ensure_live()?;
        if column >= self.layout.grid_width() {
            return Err(GridError::ColumnOutOfRange(column));
        }
        self.sort = Some(SortState { column, direction });
        self.redraw();
        Ok(())
    }

    /// Visible row count under the current search
    pub fn visible_count(&self) -> usize {
        self.view.visible_count()
    }

    /// Visible data rows in rendered order
    pub fn visible_rows(&self) -> &[usize] {
        self.view.visible()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Cell text as shown to the user.
    pub fn display_text(&self, coord: GridCoord) -> Result<String, GridError> {
        let raw = self.cell(coord)?;
        Ok(self.render_cell(coord.col, &raw, RenderContext::Display))
    }

    fn render_cell(&self, col: usize, raw: &str, context: RenderContext) -> String {
        if col == 0 {
            return String::new();
        }
        if col + 1 == self.layout.grid_width() {
            return DELETE_BUTTON_TEXT.to_string();
        }
        match self.layout.to_dataset(GridCoord::new(0, col)) {
            Some(data) => self.display.render_in(ColumnId(data.col), raw, self.mode, context),
            None => raw.to_string(),
        }
    }

    fn markup_text(&self, row: &[String]) -> Vec<String> {
        let width = self.layout.grid_width();
        row.iter()
            .enumerate()
            .map(|(col, raw)| {
                if col == 0 {
                    String::new()
                } else if col + 1 == width {
                    DELETE_BUTTON_TEXT.to_string()
                } else {
                    raw.trim().to_string()
                }
            })
            .collect()
    }

    fn row_matches(&self, row: &[String], needle: &str) -> bool {
        row.iter().enumerate().any(|(col, raw)| {
            self.layout.to_dataset(GridCoord::new(0, col)).is_some()
                && self
                    .render_cell(col, raw, RenderContext::Filter)
                    .to_lowercase()
                    .contains(needle)
        })
    }

    /// Re-apply order and search to the row view.
    fn redraw(&mut self) {
        if self.destroyed {
            return;
        }
        if self.view.row_count() != self.rows.len() {
            self.view = RowView::new(self.rows.len());
        }

        match self.sort {
            Some(SortState { column, direction }) => {
                let rows = &self.rows;
                let perm = sort_permutation(
                    &self.view,
                    |d| rows[d].get(column).cloned().unwrap_or_default(),
                    direction,
                );
                self.view.apply_sort(perm);
            }
            None => self.view.clear_sort(),
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            self.view.clear_filter();
        } else {
            let mask = self.rows.iter().map(|row| self.row_matches(row, &needle)).collect();
            self.view.apply_filter(mask);
        }
    }

    fn ensure_live(&self) -> Result<(), GridError> {
        if self.destroyed {
            Err(GridError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn all_rows_in_view_order(&self) -> Vec<GridRow> {
        self.view
            .ordered()
            .iter()
            .map(|&d| GridRow::Array(self.rows[d].clone()))
            .collect()
    }
}

impl Grid for MemoryGrid {
    fn header(&self) -> Vec<String> {
        self.layout.grid_header().to_vec()
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row(&self, row: usize) -> Result<Vec<String>, GridError> {
        self.rows.get(row).cloned().ok_or(GridError::RowOutOfRange(row))
    }

    fn cell(&self, coord: GridCoord) -> Result<String, GridError> {
        let row = self.rows.get(coord.row).ok_or(GridError::RowOutOfRange(coord.row))?;
        row.get(coord.col).cloned().ok_or(GridError::ColumnOutOfRange(coord.col))
    }

    fn set_cell(&mut self, coord: GridCoord, value: &str) -> Result<(), GridError> {
        self.ensure_live()?;
        let row = self.rows.get_mut(coord.row).ok_or(GridError::RowOutOfRange(coord.row))?;
        let cell = row.get_mut(coord.col).ok_or(GridError::ColumnOutOfRange(coord.col))?;
        *cell = value.to_string();
        self.redraw();
        Ok(())
    }

    fn add_row(&mut self, row: Vec<String>) -> Result<(), GridError> {
        self.ensure_live()?;
        self.rows.push(row);
        self.view.push_row();
        self.redraw();
        Ok(())
    }

    fn remove_row(&mut self, row: usize) -> Result<(), GridError> {
        self.ensure_live()?;
        if row >= self.rows.len() {
            return Err(GridError::RowOutOfRange(row));
        }
        self.rows.remove(row);
        self.view.delete_row(row);
        self.redraw();
        Ok(())
    }

    fn add_rows(&mut self, rows: Vec<Vec<String>>) -> Result<(), GridError> {
        self.ensure_live()?;
        for row in rows {
            self.rows.push(row);
            self.view.push_row();
        }
        self.redraw();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), GridError> {
        self.ensure_live()?;
        self.rows.clear();
        self.view = RowView::new(0);
        Ok(())
    }

    fn search(&self) -> String {
        self.search.clone()
    }

    fn set_search(&mut self, term: &str) -> Result<(), GridError> {
        self.ensure_live()?;
        self.search = term.to_string();
        self.redraw();
        Ok(())
    }

    fn rendered_rows(&self) -> Result<Vec<Vec<String>>, GridError> {
        if self.destroyed {
            // Markup keeps the last drawn order, every row included
            return Ok(self
                .view
                .ordered()
                .iter()
                .map(|&d| self.markup_text(&self.rows[d]))
                .collect());
        }
        Ok(self
            .view
            .visible()
            .iter()
            .map(|&d| self.markup_text(&self.rows[d]))
            .collect())
    }

    fn rows_search_removed(&self) -> Result<Vec<GridRow>, GridError> {
        self.ensure_live()?;
        Ok(self.all_rows_in_view_order())
    }

    fn rows_ordered_search_removed(&self) -> Result<Vec<GridRow>, GridError> {
        self.ensure_live()?;
        Ok(self.all_rows_in_view_order())
    }

    fn destroy(&mut self) -> Result<(), GridError> {
        self.ensure_live()?;
        self.destroyed = true;
        Ok(())
    }

    fn reinit(&mut self) -> Result<(), GridError> {
        self.destroyed = false;
        self.search.clear();
        self.sort = self.config.order;
        self.view = RowView::new(self.rows.len());
        self.redraw();
        Ok(())
    }
}

// =============================================================================
// Row deletion
// =============================================================================

/// Result of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// User declined the confirmation
    Declined,
    /// Rows removed; `table_empty` when nothing is left
    Deleted { count: usize, table_empty: bool },
}

/// Remove the given data rows after confirmation.
///
/// Rows are removed highest index first so earlier indices stay valid.
/// Duplicates and out-of-range rows are ignored.
pub fn delete_rows<G, C>(grid: &mut G, rows: &[usize], confirm: C) -> Result<DeleteOutcome, GridError>
where
    G: Grid + ?Sized,
    C: FnOnce(usize) -> bool,
{
    let mut targets: Vec<usize> = rows.iter().copied().filter(|&r| r < grid.row_count()).collect();
    targets.sort_unstable();
    targets.dedup();

    if targets.is_empty() {
        return Ok(DeleteOutcome::Deleted { count: 0, table_empty: grid.row_count() == 0 });
    }
    if !confirm(targets.len()) {
        return Ok(DeleteOutcome::Declined);
    }

    for &row in targets.iter().rev() {
        grid.remove_row(row)?;
    }
    log::debug!("deleted {} row(s)", targets.len());

    Ok(DeleteOutcome::Deleted { count: targets.len(), table_empty: grid.row_count() == 0 })
}
