//! # pricecut
//!
//! Apply a discount to the prices in a workbook and chart the result.
//!
//! A run loads an XLSX file and picks the sheet named "Sheet1" (or the
//! active sheet). It writes `price * (1 - rate)` from column C into column
//! D, adds a bar chart of the corrected prices and saves a copy.
//!
//! ## Example
//!
//! ```rust
//! use pricecut::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A2", "Widget").unwrap();
//! sheet.set_cell_value("C2", 100.0).unwrap();
//!
//! let outcome = apply_discount(sheet, 0.25).unwrap();
//! assert_eq!(outcome.processed_rows, vec![2]);
//! assert_eq!(sheet.get_value("D2").unwrap(), CellValue::Number(75.0));
//!
//! // workbook.save("prices_corrected.xlsx").unwrap();
//! ```

pub mod error;
pub mod prelude;
pub mod processor;

pub use error::ProcessError;
pub use processor::{
    apply_discount, build_chart, chart_title, derive_output_path, format_percent,
    process_workbook, DiscountOptions, DiscountOutcome, DiscountProcessor, DiscountReport,
    SkippedRow, CATEGORY_COLUMN, CORRECTED_COLUMN, CORRECTED_HEADER, DEFAULT_CHART_ANCHOR,
    DEFAULT_DISCOUNT_RATE, DEFAULT_SHEET_NAME, PRICE_COLUMN,
};

// Re-export core types
pub use pricecut_core::{
    CellAddress, CellData, CellError, CellRange, CellValue, CoercionError, Error, Result,
    Workbook, Worksheet, MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN,
};

// Re-export chart types
pub use pricecut_chart::{
    Axis, Chart, ChartAnchor, ChartType, DataReference, DataSeries, Legend, LegendPosition,
};

// Re-export I/O types
pub use pricecut_xlsx::{XlsxError, XlsxReader, XlsxResult, XlsxWriter};

use std::path::Path;

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt {
    /// Open a workbook from a file
    fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook>;

    /// Save the workbook to a file
    fn save<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()>;
}

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let path = path.as_ref();

        match lowercase_extension(path).as_deref() {
            Some("xlsx") | Some("xlsm") => XlsxReader::read_file(path),
            _ => Err(XlsxError::UnsupportedFormat(path.display().to_string())),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()> {
        let path = path.as_ref();

        // Macros are not carried through a load, so only plain workbooks are written
        match lowercase_extension(path).as_deref() {
            Some("xlsx") => XlsxWriter::write_file(self, path),
            _ => Err(XlsxError::UnsupportedFormat(path.display().to_string())),
        }
    }
}
