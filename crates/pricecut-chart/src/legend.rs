//! Legend types

/// Chart legend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Legend {
    /// Position
    pub position: LegendPosition,
    /// Whether legend overlays the plot area
    pub overlay: bool,
}

impl Legend {
    /// Create a new legend
    pub fn new(position: LegendPosition) -> Self {
        Self {
            position,
            overlay: false,
        }
    }
}

/// Legend position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegendPosition {
    #[default]
    Right,
    Top,
    Bottom,
    Left,
    TopRight,
}

impl LegendPosition {
    /// DrawingML `c:legendPos` value
    pub fn xlsx_code(&self) -> &'static str {
        match self {
            LegendPosition::Right => "r",
            LegendPosition::Top => "t",
            LegendPosition::Bottom => "b",
            LegendPosition::Left => "l",
            LegendPosition::TopRight => "tr",
        }
    }
}
