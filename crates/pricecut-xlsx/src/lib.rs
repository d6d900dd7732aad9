//! # pricecut-xlsx
//!
//! XLSX (Office Open XML) reader and writer for pricecut.
//!
//! The reader loads cell values, style indices, column widths and the raw
//! stylesheet. The writer emits the same parts back, plus a DrawingML part
//! and a chart part for every chart attached to a worksheet.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
