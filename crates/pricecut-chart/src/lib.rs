//! # pricecut-chart
//!
//! Chart model for pricecut: what a chart plots, how it is labelled and
//! where it sits on a worksheet. Serialization lives in `pricecut-xlsx`.

mod axis;
mod chart;
mod legend;
mod series;

pub use axis::Axis;
pub use chart::{BarDirection, Chart, ChartAnchor, ChartType, Grouping};
pub use legend::{Legend, LegendPosition};
pub use series::{DataReference, DataSeries};
