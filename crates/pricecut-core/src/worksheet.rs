//! Worksheet type

use std::collections::BTreeMap;

use pricecut_chart::Chart;

use crate::cell::{CellAddress, CellData, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A worksheet (single sheet in a workbook)
#[derive(Debug)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Cell storage
    cells: CellStorage,
    /// Custom column widths in characters, keyed by 0-based column
    column_widths: BTreeMap<u16, f64>,
    /// Charts drawn on this sheet
    charts: Vec<Chart>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
            column_widths: BTreeMap::new(),
            charts: Vec::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    // === Cell Access ===

    /// Get a cell by address string (e.g., "A1")
    pub fn cell(&self, address: &str) -> Result<Option<&CellData>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cells.get(addr.row, addr.col))
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(row, col)
    }

    /// Get cell value by address string
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get cell value by indices ([`CellValue::Empty`] when absent)
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells
            .get(row, col)
            .map(|c| c.value.clone())
            .unwrap_or_default()
    }

    /// Whether the cell holds no value. A styled but valueless cell is empty.
    pub fn is_cell_empty_at(&self, row: u32, col: u16) -> bool {
        self.cells.get(row, col).map_or(true, |c| c.value.is_empty())
    }

    /// Get a cell's style index (0 if the cell does not exist)
    pub fn cell_style_index_at(&self, row: u32, col: u16) -> u32 {
        self.cells.get(row, col).map_or(0, |c| c.style_index)
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;
        self.cells.set_value(row, col, value.into());
        Ok(())
    }

    /// Set a cell formula by row and column indices
    pub fn set_cell_formula_at(&mut self, row: u32, col: u16, formula: &str) -> Result<()> {
        let formula = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={}", formula)
        };
        self.set_cell_value_at(row, col, CellValue::formula(formula))
    }

    /// Set a cell's style index (an `xf` index into the workbook stylesheet)
    pub fn set_cell_style_index_at(&mut self, row: u32, col: u16, style_index: u32) -> Result<()> {
        self.validate_cell_position(row, col)?;
        self.cells.set_style(row, col, style_index);
        Ok(())
    }

    // === Extent ===

    /// 1-based number of the last row holding any cell, styled or valued.
    ///
    /// An empty sheet reports 1, so a scan over `2..=max_row()` visits nothing.
    pub fn max_row(&self) -> u32 {
        self.cells.last_row().map_or(1, |row| row + 1)
    }

    /// Get the used range (bounds of all stored cells)
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(min_row, min_col, max_row, max_col)| {
                CellRange::from_indices(min_row, min_col, max_row, max_col)
            })
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    /// Check if the worksheet has no cells
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate all cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.cells.iter()
    }

    // === Columns ===

    /// Custom width of a column, if one was set
    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Set a custom column width in characters
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// All custom column widths
    pub fn custom_column_widths(&self) -> &BTreeMap<u16, f64> {
        &self.column_widths
    }

    // === Charts ===

    /// Attach a chart to this sheet
    pub fn add_chart(&mut self, chart: Chart) {
        self.charts.push(chart);
    }

    /// Charts attached to this sheet, in insertion order
    pub fn charts(&self) -> &[Chart] {
        &self.charts
    }

    fn validate_cell_position(&self, row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        Ok(())
    }
}
