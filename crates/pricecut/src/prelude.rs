//! Prelude module - common imports for pricecut users
//!
//! ```rust
//! use pricecut::prelude::*;
//! ```

pub use crate::{
    // Processing
    apply_discount,
    process_workbook,
    // Cell types
    CellAddress,
    CellRange,
    CellValue,
    // Chart types
    Chart,
    ChartType,
    DiscountOptions,
    DiscountProcessor,
    DiscountReport,
    // Error types
    Error,
    ProcessError,
    Result,
    // Main types
    Workbook,
    // Extension traits
    WorkbookExt,
    Worksheet,
    // I/O types
    XlsxError,
    XlsxReader,
    XlsxWriter,
};
