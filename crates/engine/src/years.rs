//! Year filter support: distinct years in the date column, the initial
//! year to search for, and paging of the year buttons.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::grid::Grid;
use crate::layout::GridCoord;

/// Column the grid is ordered and filtered by when present.
pub const DEFAULT_ORDER_COLUMN: &str = "DATE_COMMITTED";

pub const DEFAULT_PREFERRED_YEAR: i32 = 2015;

/// Year buttons shown per page.
pub const YEARS_PER_PAGE: usize = 5;

/// Extract a year from a date cell.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, `MM/DD/YYYY`, or anything
/// starting with four digits.
pub fn parse_year(raw: &str) -> Option<i32> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.year());
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(d.year());
    }
    if let Ok(d) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
        return Some(d.year());
    }

    let prefix = text.get(..4)?;
    if prefix.bytes().all(|b| b.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

/// Sorted distinct years found in `column` across every grid row.
///
/// Empty when the column is missing.
pub fn distinct_years<G: Grid + ?Sized>(grid: &G, column: &str) -> Vec<i32> {
    let Some(col) = grid.header().iter().position(|h| h.trim().eq_ignore_ascii_case(column)) else {
        return Vec::new();
    };

    let mut years = BTreeSet::new();
    for r in 0..grid.row_count() {
        if let Ok(value) = grid.cell(GridCoord::new(r, col)) {
            if let Some(year) = parse_year(&value) {
                years.insert(year);
            }
        }
    }
    years.into_iter().collect()
}

/// `preferred` when present, else the earliest year.
pub fn initial_year(years: &[i32], preferred: i32) -> Option<i32> {
    if years.contains(&preferred) {
        Some(preferred)
    } else {
        years.iter().min().copied()
    }
}

/// Pages through the year list a fixed number at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearPager {
    years: Vec<i32>,
    page: usize,
}

impl YearPager {
    pub fn new(years: Vec<i32>) -> Self {
        Self { years, page: 0 }
    }

    /// Start on the page holding `year`.
    pub fn showing(years: Vec<i32>, year: i32) -> Self {
        let page = years.iter().position(|y| *y == year).map(|i| i / YEARS_PER_PAGE).unwrap_or(0);
        Self { years, page }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.years.len().div_ceil(YEARS_PER_PAGE).max(1)
    }

    pub fn current(&self) -> &[i32] {
        let start = (self.page * YEARS_PER_PAGE).min(self.years.len());
        let end = (start + YEARS_PER_PAGE).min(self.years.len());
        &self.years[start..end]
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        self.page + 1 < self.page_count()
    }

    pub fn previous_page(&mut self) -> bool {
        if self.has_previous() {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn next_page(&mut self) -> bool {
        if self.has_next() {
            self.page += 1;
            true
        } else {
            false
        }
    }
}
