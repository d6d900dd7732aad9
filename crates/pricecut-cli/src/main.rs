//! pricecut CLI - apply a discount to the prices in a workbook

use anyhow::{Context, Result};
use clap::Parser;
use pricecut::{DiscountOptions, DiscountProcessor, DEFAULT_CHART_ANCHOR, DEFAULT_SHEET_NAME};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pricecut")]
#[command(
    author,
    version,
    about = "Write discounted prices into a workbook and chart them"
)]
struct Cli {
    /// Input workbook (xlsx)
    #[arg(default_value = "transactions.xlsx")]
    input: PathBuf,

    /// Discount rate as a fraction (0.1 = 10%)
    #[arg(short, long, default_value_t = pricecut::DEFAULT_DISCOUNT_RATE)]
    rate: f64,

    /// Output workbook (default: input name with "_corrected" appended)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Sheet to process; the active sheet is used when it does not exist
    #[arg(short, long, default_value = DEFAULT_SHEET_NAME)]
    sheet: String,

    /// Top-left cell of the chart
    #[arg(long, default_value = DEFAULT_CHART_ANCHOR)]
    anchor: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut options = DiscountOptions::default()
        .with_discount_rate(cli.rate)
        .with_sheet_name(cli.sheet)
        .with_chart_anchor(cli.anchor);
    if let Some(output) = cli.output {
        options = options.with_output(output);
    }

    let report = DiscountProcessor::new(options)
        .run(&cli.input)
        .with_context(|| format!("Failed to process '{}'", cli.input.display()))?;

    match report {
        Some(report) => {
            if !report.skipped.is_empty() {
                tracing::info!("{} rows skipped", report.skipped.len());
            }
            println!("{}", report.output.display());
        }
        None => eprintln!("Nothing to do: no valid prices in '{}'", cli.input.display()),
    }

    Ok(())
}

/// Log to stderr, `info` and up unless RUST_LOG says otherwise
fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
