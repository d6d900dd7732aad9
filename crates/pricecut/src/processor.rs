//! Discount processing: correct a sheet's prices and chart the result

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use pricecut_chart::{Axis, Chart, ChartAnchor, ChartType, DataReference, DataSeries};
use pricecut_core::{CellAddress, CellRange, CellValue, CoercionError, Workbook, Worksheet};
use pricecut_xlsx::XlsxError;

use crate::error::ProcessError;
use crate::WorkbookExt;

/// Discount applied when none is given (10%)
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.1;

/// Sheet processed when present
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Cell at which the chart's top-left corner is placed
pub const DEFAULT_CHART_ANCHOR: &str = "F2";

/// Header written above the corrected prices
pub const CORRECTED_HEADER: &str = "Corrected Price";

/// Column holding item names, used as chart categories (A)
pub const CATEGORY_COLUMN: u16 = 0;

/// Column holding the original prices (C)
pub const PRICE_COLUMN: u16 = 2;

/// Column receiving the corrected prices (D)
pub const CORRECTED_COLUMN: u16 = 3;

const HEADER_ROW: u32 = 0;
const FIRST_DATA_ROW: u32 = 1;

/// Options for a [`DiscountProcessor`] run
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountOptions {
    /// Fraction taken off each price; 0.1 means 10% off.
    ///
    /// Not range-checked: a negative rate raises prices and a rate above 1
    /// makes them negative.
    pub discount_rate: f64,
    /// Where to save; derived from the input name when `None`
    pub output: Option<PathBuf>,
    /// Sheet to process, falling back to the active sheet when missing
    pub sheet_name: String,
    /// A1 reference of the chart's top-left cell
    pub chart_anchor: String,
}

impl Default for DiscountOptions {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            output: None,
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            chart_anchor: DEFAULT_CHART_ANCHOR.to_string(),
        }
    }
}

impl DiscountOptions {
    /// Set the discount rate
    pub fn with_discount_rate(mut self, rate: f64) -> Self {
        self.discount_rate = rate;
        self
    }

    /// Set an explicit output path
    pub fn with_output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set the preferred sheet name
    pub fn with_sheet_name<S: Into<String>>(mut self, name: S) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Set the chart anchor cell
    pub fn with_chart_anchor<S: Into<String>>(mut self, anchor: S) -> Self {
        self.chart_anchor = anchor.into();
        self
    }
}

/// A data row whose price could not be read as a number
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based row number
    pub row: u32,
    /// The price cell's value
    pub value: CellValue,
    /// Why it was rejected
    pub error: CoercionError,
}

/// What [`apply_discount`] did to a sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscountOutcome {
    /// Whether the corrected-price header was written
    pub header_written: bool,
    /// 1-based rows that received a corrected price, ascending
    pub processed_rows: Vec<u32>,
    /// Rows skipped because of an unreadable price, ascending
    pub skipped: Vec<SkippedRow>,
}

impl DiscountOutcome {
    /// Number of corrected prices written
    pub fn processed(&self) -> usize {
        self.processed_rows.len()
    }

    /// First and last processed row, `None` when nothing was processed.
    ///
    /// Skipped rows between the two stay inside the range; skipped rows
    /// before the first or after the last do not widen it.
    pub fn row_bounds(&self) -> Option<(u32, u32)> {
        let first = self.processed_rows.iter().min()?;
        let last = self.processed_rows.iter().max()?;
        Some((*first, *last))
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountReport {
    /// Path the workbook was saved to
    pub output: PathBuf,
    /// Number of corrected prices written
    pub processed: usize,
    /// First charted row (1-based)
    pub first_row: u32,
    /// Last charted row (1-based)
    pub last_row: u32,
    /// Rows skipped because of an unreadable price
    pub skipped: Vec<SkippedRow>,
}

/// Write corrected prices into a sheet.
///
/// Sets the header cell D1 unless it already holds a value, then for every
/// row from 2 to [`Worksheet::max_row`] reads the price in column C. Empty
/// prices are ignored. Prices that cannot be read as numbers are logged and
/// recorded as skipped. Every other row gets `price * (1 - discount_rate)`
/// in column D.
pub fn apply_discount(
    sheet: &mut Worksheet,
    discount_rate: f64,
) -> pricecut_core::Result<DiscountOutcome> {
    let mut outcome = DiscountOutcome::default();

    if sheet.is_cell_empty_at(HEADER_ROW, CORRECTED_COLUMN) {
        sheet.set_cell_value_at(HEADER_ROW, CORRECTED_COLUMN, CORRECTED_HEADER)?;
        outcome.header_written = true;
    }

    // max_row is 1-based, so this visits sheet rows 2..=max_row
    for row in FIRST_DATA_ROW..sheet.max_row() {
        let price = sheet.get_value_at(row, PRICE_COLUMN);
        if price.is_empty() {
            continue;
        }

        match price.coerce_number() {
            Ok(original) => {
                let corrected = original * (1.0 - discount_rate);
                sheet.set_cell_value_at(row, CORRECTED_COLUMN, corrected)?;
                outcome.processed_rows.push(row + 1);
            }
            Err(error) => {
                tracing::warn!(
                    "Skipping row {} - invalid price value: {}",
                    row + 1,
                    price
                );
                outcome.skipped.push(SkippedRow {
                    row: row + 1,
                    value: price,
                    error,
                });
            }
        }
    }

    Ok(outcome)
}

/// Build the corrected-price bar chart for a processed sheet.
///
/// Values come from column D and categories from column A, over the rows
/// between the first and last processed row. Returns `None` when nothing
/// was processed.
pub fn build_chart(
    sheet_name: &str,
    outcome: &DiscountOutcome,
    discount_rate: f64,
    anchor: ChartAnchor,
) -> Option<Chart> {
    let (first, last) = outcome.row_bounds()?;

    // Outcome rows are 1-based
    let values = CellRange::column_span(CORRECTED_COLUMN, first - 1, last - 1);
    let categories = CellRange::column_span(CATEGORY_COLUMN, first - 1, last - 1);

    let mut chart = Chart::new(ChartType::ColumnClustered)
        .with_title(chart_title(discount_rate))
        .with_category_axis(Axis::new().with_title("Items"))
        .with_value_axis(Axis::new().with_title("Price"))
        .with_anchor(anchor);
    chart.add_series(
        DataSeries::new(DataReference::formula(values.to_sheet_reference(sheet_name)))
            .with_categories(DataReference::formula(
                categories.to_sheet_reference(sheet_name),
            )),
    );

    Some(chart)
}

/// `Corrected Prices (10.0% Discount Applied)` for a rate of 0.1
pub fn chart_title(discount_rate: f64) -> String {
    format!(
        "Corrected Prices ({}% Discount Applied)",
        format_percent(discount_rate)
    )
}

/// Render `rate * 100` the way the chart title shows it.
///
/// Whole numbers keep one decimal place (`10.0`). Other values use the
/// shortest text that reads back as the same float (`7.000000000000001`).
/// Magnitudes below 1e-4 or from 1e16 up switch to exponent form (`1e-05`,
/// `1e+16`).
pub fn format_percent(discount_rate: f64) -> String {
    let percent = discount_rate * 100.0;

    if percent.is_nan() {
        return "nan".to_string();
    }
    if percent.is_infinite() {
        return if percent > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = percent.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // Rust prints e.g. "1.5e-5"; pad the exponent to two digits with a sign
        let formatted = format!("{:e}", percent);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exponent.abs())
            }
            None => formatted,
        };
    }

    if percent.fract() == 0.0 {
        format!("{:.1}", percent)
    } else {
        percent.to_string()
    }
}

/// Output path used when none is given: `_corrected` goes before the
/// extension of the final path component.
///
/// `data/transactions.xlsx` becomes `data/transactions_corrected.xlsx`;
/// `report` becomes `report_corrected`.
pub fn derive_output_path<P: AsRef<Path>>(filename: P) -> PathBuf {
    let filename = filename.as_ref();

    let Some(stem) = filename.file_stem() else {
        let mut name = filename.as_os_str().to_os_string();
        name.push("_corrected");
        return PathBuf::from(name);
    };

    let mut name = OsString::from(stem);
    name.push("_corrected");
    if let Some(extension) = filename.extension() {
        name.push(".");
        name.push(extension);
    }
    filename.with_file_name(name)
}

/// Applies a discount to one sheet of a workbook file and saves a copy
/// with the corrected prices and a bar chart of them.
///
/// ```no_run
/// use pricecut::{DiscountOptions, DiscountProcessor};
///
/// let options = DiscountOptions::default().with_discount_rate(0.25);
/// match DiscountProcessor::new(options).run("transactions.xlsx")? {
///     Some(report) => println!("{} prices written to {}", report.processed, report.output.display()),
///     None => println!("nothing to do"),
/// }
/// # Ok::<(), pricecut::ProcessError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DiscountProcessor {
    options: DiscountOptions,
}

impl DiscountProcessor {
    /// Create a processor with the given options
    pub fn new(options: DiscountOptions) -> Self {
        Self { options }
    }

    /// The options this processor runs with
    pub fn options(&self) -> &DiscountOptions {
        &self.options
    }

    /// Process `filename`.
    ///
    /// Returns `Ok(None)` without writing anything when no row had a
    /// readable price.
    pub fn run<P: AsRef<Path>>(&self, filename: P) -> Result<Option<DiscountReport>, ProcessError> {
        let filename = filename.as_ref();
        if !filename.is_file() {
            return Err(ProcessError::FileNotFound(filename.to_path_buf()));
        }

        let output = self
            .options
            .output
            .clone()
            .unwrap_or_else(|| derive_output_path(filename));

        // A bad anchor is a configuration error, whatever the sheet holds
        let anchor = CellAddress::parse(&self.options.chart_anchor).map_err(XlsxError::from)?;

        let mut workbook = Workbook::open(filename)?;
        let sheet_index = self.select_sheet(&workbook)?;
        let sheet = workbook
            .worksheet_mut(sheet_index)
            .ok_or_else(|| XlsxError::InvalidFormat("Workbook has no worksheets".into()))?;

        let rate = self.options.discount_rate;
        let outcome = apply_discount(sheet, rate).map_err(XlsxError::from)?;

        let Some(chart) = build_chart(
            sheet.name(),
            &outcome,
            rate,
            ChartAnchor::at(anchor.row, anchor.col),
        ) else {
            tracing::warn!("No valid price data found to process");
            return Ok(None);
        };

        let (first_row, last_row) = outcome.row_bounds().unwrap_or_default();
        tracing::info!(
            "Chart created with {} data points (rows {} to {})",
            outcome.processed(),
            first_row,
            last_row
        );

        sheet.add_chart(chart);
        workbook.save(&output)?;

        tracing::info!(
            "Successfully processed {} items and saved to '{}'",
            outcome.processed(),
            output.display()
        );

        Ok(Some(DiscountReport {
            output,
            processed: outcome.processed(),
            first_row,
            last_row,
            skipped: outcome.skipped,
        }))
    }

    /// Index of the configured sheet, or of the active sheet when it is missing
    fn select_sheet(&self, workbook: &Workbook) -> Result<usize, XlsxError> {
        if let Some(index) = workbook.sheet_index(&self.options.sheet_name) {
            return Ok(index);
        }

        let active = workbook
            .active_worksheet()
            .ok_or_else(|| XlsxError::InvalidFormat("Workbook has no worksheets".into()))?;
        tracing::warn!(
            "Using sheet '{}' as '{}' was not found",
            active.name(),
            self.options.sheet_name
        );
        Ok(workbook.active_sheet())
    }
}

/// Apply `discount_rate` to `filename` and save the result.
///
/// Saves to `output_filename`, or next to the input with `_corrected`
/// added to its name. Returns the saved path, or `None` when no row had a
/// readable price.
pub fn process_workbook<P: AsRef<Path>>(
    filename: P,
    discount_rate: f64,
    output_filename: Option<PathBuf>,
) -> Result<Option<PathBuf>, ProcessError> {
    let options = DiscountOptions {
        discount_rate,
        output: output_filename,
        ..DiscountOptions::default()
    };
    let report = DiscountProcessor::new(options).run(filename)?;
    Ok(report.map(|r| r.output))
}
