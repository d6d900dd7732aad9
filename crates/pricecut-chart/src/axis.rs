//! Axis types

/// Chart axis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Axis {
    /// Axis title
    pub title: Option<String>,
    /// Minimum value (value axes only)
    pub minimum: Option<f64>,
    /// Maximum value (value axes only)
    pub maximum: Option<f64>,
}

impl Axis {
    /// Create a new axis
    pub fn new() -> Self {
        Self::default()
    }

    /// Set axis title
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set axis bounds
    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.minimum = Some(min);
        self.maximum = Some(max);
        self
    }
}
