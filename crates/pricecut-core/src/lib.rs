//! # pricecut-core
//!
//! In-memory workbook model used by pricecut.
//!
//! - [`CellValue`] - tagged cell values with explicit numeric coercion
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`Workbook`], [`Worksheet`] - the document structures
//!
//! ## Example
//!
//! ```rust
//! use pricecut_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Item").unwrap();
//! sheet.set_cell_value_at(1, 2, 19.99).unwrap();
//!
//! assert_eq!(sheet.get_value("C2").unwrap(), CellValue::Number(19.99));
//! assert_eq!(sheet.max_row(), 2);
//! ```

pub mod cell;
pub mod error;
pub mod workbook;
pub mod worksheet;

pub use cell::{
    CellAddress, CellData, CellError, CellRange, CellStorage, CellValue, CoercionError,
    SharedString,
};
pub use error::{Error, Result};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
