//! Row view layer for the in-memory grid.
//!
//! Maps between:
//! - View space (rendered order, affected by sort and search)
//! - Data space (row index the grid addresses cells by, 0..N-1)
//!
//! Key invariants:
//! - Cell edits and edit history use data rows
//! - Rendering and extraction walk view rows
//! - `visible_mask` is indexed by DATA row, so sorting never changes visibility
//! - Sorting compares raw values only

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
pub struct RowView {
    /// view_row -> data_row
    row_order: Vec<usize>,
    /// Indexed by data row; false = hidden by search
    visible_mask: Vec<bool>,
    /// Cached visible data rows in view order
    visible_rows: Vec<usize>,
}

impl RowView {
    /// Identity mapping for N rows, all visible
    pub fn new(row_count: usize) -> Self {
        Self {
            row_order: (0..row_count).collect(),
            visible_mask: vec![true; row_count],
            visible_rows: (0..row_count).collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_order.len()
    }

    pub fn visible_count(&self) -> usize {
        self.visible_rows.len()
    }

    /// All data rows in view order, hidden ones included
    pub fn ordered(&self) -> &[usize] {
        &self.row_order
    }

    /// Visible data rows in view order
    pub fn visible(&self) -> &[usize] {
        &self.visible_rows
    }

    pub fn is_filtered(&self) -> bool {
        self.visible_count() < self.row_count()
    }

    pub fn is_data_row_visible(&self, data_row: usize) -> bool {
        self.visible_mask.get(data_row).copied().unwrap_or(false)
    }

    fn rebuild_visible_cache(&mut self) {
        self.visible_rows = self
            .row_order
            .iter()
            .copied()
            .filter(|&d| self.visible_mask.get(d).copied().unwrap_or(false))
            .collect();
    }

    /// Apply a permutation mapping new view_row -> data_row
    pub fn apply_sort(&mut self, permutation: Vec<usize>) {
        self.row_order = permutation;
        self.rebuild_visible_cache();
    }

    pub fn clear_sort(&mut self) {
        self.row_order = (0..self.row_order.len()).collect();
        self.rebuild_visible_cache();
    }

    /// Apply visibility (mask indexed by data row)
    pub fn apply_filter(&mut self, visible_mask: Vec<bool>) {
        self.visible_mask = visible_mask;
        self.rebuild_visible_cache();
    }

    pub fn clear_filter(&mut self) {
        self.visible_mask = vec![true; self.row_order.len()];
        self.rebuild_visible_cache();
    }

    /// A row was appended at the end of the data
    pub fn push_row(&mut self) {
        let data_row = self.row_order.len();
        self.row_order.push(data_row);
        self.visible_mask.push(true);
        self.rebuild_visible_cache();
    }

    /// A data row was removed; later data rows shift down by one
    pub fn delete_row(&mut self, data_row: usize) {
        if data_row >= self.row_order.len() {
            return;
        }
        self.row_order.retain(|&d| d != data_row);
        for d in self.row_order.iter_mut() {
            if *d > data_row {
                *d -= 1;
            }
        }
        self.visible_mask.remove(data_row);
        self.rebuild_visible_cache();
    }
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Active sort column (grid column index) and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: usize,
    pub direction: SortDirection,
}

/// Comparison key derived from a raw cell value.
///
/// Numbers sort before text, blanks sort last. Text compares trimmed and
/// lowercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Number(OrderedFloat<f64>),
    Text(String),
    Blank,
}

impl SortKey {
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return SortKey::Blank;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => SortKey::Number(OrderedFloat(n)),
            _ => SortKey::Text(trimmed.to_lowercase()),
        }
    }
}

/// Stable sort of all rows by the raw value at `value_at(data_row)`.
///
/// Ties keep the current view order. Returns the new view_row -> data_row
/// permutation to hand to `RowView::apply_sort`.
pub fn sort_permutation<F>(view: &RowView, value_at: F, direction: SortDirection) -> Vec<usize>
where
    F: Fn(usize) -> String,
{
    let mut keyed: Vec<(SortKey, usize, usize)> = view
        .ordered()
        .iter()
        .enumerate()
        .map(|(view_row, &data_row)| (SortKey::from_raw(&value_at(data_row)), view_row, data_row))
        .collect();

    keyed.sort_by(|a, b| {
        let ord = a.0.cmp(&b.0);
        let ord = match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        };
        ord.then(a.1.cmp(&b.1))
    });

    keyed.into_iter().map(|(_, _, data_row)| data_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_view_identity() {
        let view = RowView::new(4);
        assert_eq!(view.ordered(), &[0, 1, 2, 3]);
        assert_eq!(view.visible(), &[0, 1, 2, 3]);
        assert!(!view.is_filtered());
    }

    #[test]
    fn test_row_view_sort_and_filter() {
        let mut view = RowView::new(4);
        view.apply_sort(vec![3, 1, 0, 2]);
        view.apply_filter(vec![true, false, true, true]);

        assert_eq!(view.visible(), &[3, 0, 2]);
        assert!(view.is_filtered());
        assert!(!view.is_data_row_visible(1));

        view.clear_filter();
        assert_eq!(view.visible(), &[3, 1, 0, 2]);
        view.clear_sort();
        assert_eq!(view.visible(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_row_view_delete_shifts_data_rows() {
        let mut view = RowView::new(4);
        view.apply_sort(vec![3, 1, 0, 2]);
        view.apply_filter(vec![true, true, false, true]);
        view.delete_row(1);

        assert_eq!(view.ordered(), &[2, 0, 1]);
        // Data row 2 (was 3) still visible, data row 1 (was 2) still hidden
        assert_eq!(view.visible(), &[2, 0]);
    }

    #[test]
    fn test_row_view_push_row() {
        let mut view = RowView::new(2);
        view.apply_sort(vec![1, 0]);
        view.push_row();
        assert_eq!(view.ordered(), &[1, 0, 2]);
        assert!(view.is_data_row_visible(2));
    }

    #[test]
    fn test_sort_key_ordering() {
        let mut keys = vec![
            SortKey::from_raw("banana"),
            SortKey::from_raw(""),
            SortKey::from_raw("10"),
            SortKey::from_raw("Apple"),
            SortKey::from_raw("2"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                SortKey::Number(OrderedFloat(2.0)),
                SortKey::Number(OrderedFloat(10.0)),
                SortKey::Text("apple".into()),
                SortKey::Text("banana".into()),
                SortKey::Blank,
            ]
        );
    }

    #[test]
    fn test_sort_permutation_stable() {
        let values = ["b", "a", "b", "a"];
        let view = RowView::new(4);
        let asc = sort_permutation(&view, |d| values[d].to_string(), SortDirection::Ascending);
        assert_eq!(asc, vec![1, 3, 0, 2]);

        let desc = sort_permutation(&view, |d| values[d].to_string(), SortDirection::Descending);
        assert_eq!(desc, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_sort_dates_as_text() {
        let values = ["2016-03-01", "2015-12-31", "2015-01-02"];
        let view = RowView::new(3);
        let perm = sort_permutation(&view, |d| values[d].to_string(), SortDirection::Ascending);
        assert_eq!(perm, vec![2, 1, 0]);
    }
}
