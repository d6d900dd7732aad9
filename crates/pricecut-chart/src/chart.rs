//! Chart types

use crate::axis::Axis;
use crate::legend::Legend;
use crate::series::DataSeries;

/// Chart types drawn with DrawingML's `barChart` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartType {
    /// Vertical bars side by side
    #[default]
    ColumnClustered,
    ColumnStacked,
    ColumnPercentStacked,
    /// Horizontal bars side by side
    BarClustered,
    BarStacked,
    BarPercentStacked,
}

impl ChartType {
    /// Orientation of the bars
    pub fn direction(&self) -> BarDirection {
        match self {
            ChartType::ColumnClustered
            | ChartType::ColumnStacked
            | ChartType::ColumnPercentStacked => BarDirection::Column,
            ChartType::BarClustered | ChartType::BarStacked | ChartType::BarPercentStacked => {
                BarDirection::Bar
            }
        }
    }

    /// How multiple series share a category
    pub fn grouping(&self) -> Grouping {
        match self {
            ChartType::ColumnClustered | ChartType::BarClustered => Grouping::Clustered,
            ChartType::ColumnStacked | ChartType::BarStacked => Grouping::Stacked,
            ChartType::ColumnPercentStacked | ChartType::BarPercentStacked => {
                Grouping::PercentStacked
            }
        }
    }
}

/// Bar orientation (`c:barDir`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarDirection {
    Column,
    Bar,
}

impl BarDirection {
    pub fn xlsx_code(&self) -> &'static str {
        match self {
            BarDirection::Column => "col",
            BarDirection::Bar => "bar",
        }
    }
}

/// Series grouping (`c:grouping`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    Clustered,
    Stacked,
    PercentStacked,
}

impl Grouping {
    pub fn xlsx_code(&self) -> &'static str {
        match self {
            Grouping::Clustered => "clustered",
            Grouping::Stacked => "stacked",
            Grouping::PercentStacked => "percentStacked",
        }
    }

    /// Stacked groupings need full overlap so segments sit on each other
    pub fn overlap(&self) -> Option<i32> {
        match self {
            Grouping::Clustered => None,
            Grouping::Stacked | Grouping::PercentStacked => Some(100),
        }
    }
}

/// Chart definition
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    /// Chart type
    pub chart_type: ChartType,
    /// Chart title
    pub title: Option<String>,
    /// Data series
    pub series: Vec<DataSeries>,
    /// Category axis (X)
    pub category_axis: Axis,
    /// Value axis (Y)
    pub value_axis: Axis,
    /// Legend; `None` hides it
    pub legend: Option<Legend>,
    /// Position on the sheet
    pub anchor: ChartAnchor,
}

impl Chart {
    /// Create a new chart with a right-hand legend anchored at A1
    pub fn new(chart_type: ChartType) -> Self {
        Self {
            chart_type,
            title: None,
            series: Vec::new(),
            category_axis: Axis::new(),
            value_axis: Axis::new(),
            legend: Some(Legend::default()),
            anchor: ChartAnchor::default(),
        }
    }

    /// Set chart title
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the category (X) axis
    pub fn with_category_axis(mut self, axis: Axis) -> Self {
        self.category_axis = axis;
        self
    }

    /// Set the value (Y) axis
    pub fn with_value_axis(mut self, axis: Axis) -> Self {
        self.value_axis = axis;
        self
    }

    /// Set or hide the legend
    pub fn with_legend(mut self, legend: Option<Legend>) -> Self {
        self.legend = legend;
        self
    }

    /// Set the position on the sheet
    pub fn with_anchor(mut self, anchor: ChartAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Add a data series
    pub fn add_series(&mut self, series: DataSeries) {
        self.series.push(series);
    }
}

/// Cells spanned by a chart's frame (0-based; `to_*` is exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartAnchor {
    /// Start column
    pub from_col: u16,
    /// Start row
    pub from_row: u32,
    /// End column
    pub to_col: u16,
    /// End row
    pub to_row: u32,
}

impl ChartAnchor {
    /// Default footprint, about 15 cm x 7.5 cm at default cell sizes
    pub const DEFAULT_COLS: u16 = 9;
    pub const DEFAULT_ROWS: u32 = 15;

    /// Anchor the top-left corner at a cell, with the default footprint
    pub fn at(row: u32, col: u16) -> Self {
        Self {
            from_col: col,
            from_row: row,
            to_col: col.saturating_add(Self::DEFAULT_COLS),
            to_row: row.saturating_add(Self::DEFAULT_ROWS),
        }
    }
}

impl Default for ChartAnchor {
    fn default() -> Self {
        Self::at(0, 0)
    }
}
