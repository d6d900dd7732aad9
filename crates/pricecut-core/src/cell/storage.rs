//! Cell storage implementation
//!
//! Sparse, row-major storage: only cells that hold a value or a style are
//! kept, in a `BTreeMap<row, BTreeMap<col, CellData>>` so rows come out
//! ordered for writing.

use std::collections::BTreeMap;

use super::CellValue;

/// Complete data for a single cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellData {
    /// The cell's value
    pub value: CellValue,
    /// Index into the workbook stylesheet's cell formats (0 = default)
    pub style_index: u32,
}

impl CellData {
    /// Create a new cell with a value and default style
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            style_index: 0,
        }
    }

    /// Create a new cell with a value and style
    pub fn with_style(value: CellValue, style_index: u32) -> Self {
        Self { value, style_index }
    }

    /// Check if this cell is effectively empty (no value and default style)
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style_index == 0
    }
}

/// Sparse row-based storage for worksheet cells
#[derive(Debug, Default)]
pub struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,
}

impl CellStorage {
    /// Create a new empty cell storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cell
    pub fn get(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row)?.get(&col)
    }

    /// Get a mutable cell
    pub fn get_mut(&mut self, row: u32, col: u16) -> Option<&mut CellData> {
        self.rows.get_mut(&row)?.get_mut(&col)
    }

    /// Store a cell, dropping it instead if it is empty
    pub fn set(&mut self, row: u32, col: u16, data: CellData) {
        if data.is_empty() {
            self.remove(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, data);
        }
    }

    /// Set a cell's value, keeping its style
    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        let style_index = self.get(row, col).map_or(0, |c| c.style_index);
        self.set(row, col, CellData::with_style(value, style_index));
    }

    /// Set a cell's style index, keeping its value
    pub fn set_style(&mut self, row: u32, col: u16, style_index: u32) {
        let value = self
            .get(row, col)
            .map(|c| c.value.clone())
            .unwrap_or_default();
        self.set(row, col, CellData::with_style(value, style_index));
    }

    /// Remove a cell
    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellData> {
        let cells = self.rows.get_mut(&row)?;
        let removed = cells.remove(&col);
        if cells.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Check if no cells are stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Highest row index holding a stored cell
    pub fn last_row(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    /// Bounds of stored cells as (min_row, min_col, max_row, max_col)
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;
        let cols = self.rows.values().flat_map(|cells| {
            let first = cells.keys().next().copied();
            let last = cells.keys().next_back().copied();
            first.into_iter().chain(last)
        });
        let (min_col, max_col) = cols.fold((u16::MAX, 0), |(lo, hi), c| (lo.min(c), hi.max(c)));
        Some((min_row, min_col, max_row, max_col))
    }

    /// Iterate all cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows
            .iter()
            .flat_map(|(&row, cells)| cells.iter().map(move |(&col, data)| (row, col, data)))
    }
}
