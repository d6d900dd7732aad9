//! Processing errors

use std::path::PathBuf;

use pricecut_xlsx::XlsxError;
use thiserror::Error;

/// Errors returned by [`DiscountProcessor::run`](crate::DiscountProcessor::run)
///
/// Rows with unreadable prices are not errors; they are skipped and
/// reported in [`DiscountReport::skipped`](crate::DiscountReport::skipped).
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The input path does not name an existing file. Nothing was read or written.
    #[error("Input file '{}' not found", .0.display())]
    FileNotFound(PathBuf),

    /// Loading, transforming or saving the workbook failed
    #[error("Error processing workbook: {0}")]
    ProcessingFailure(#[from] XlsxError),
}
