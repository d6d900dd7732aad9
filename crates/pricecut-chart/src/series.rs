//! Data series types

/// Data series for a chart
#[derive(Debug, Clone, PartialEq)]
pub struct DataSeries {
    /// Series name
    pub name: Option<String>,
    /// Values (Y data)
    pub values: DataReference,
    /// Categories (X labels)
    pub categories: Option<DataReference>,
}

impl DataSeries {
    /// Create a new data series
    pub fn new(values: DataReference) -> Self {
        Self {
            name: None,
            values,
            categories: None,
        }
    }

    /// Set series name
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set categories
    pub fn with_categories(mut self, categories: DataReference) -> Self {
        self.categories = Some(categories);
        self
    }
}

/// Where a series reads its data from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataReference {
    /// Sheet-qualified range, e.g. `'Sheet1'!$D$2:$D$10`
    Formula(String),
}

impl DataReference {
    /// Create a formula reference
    pub fn formula<S: Into<String>>(formula: S) -> Self {
        DataReference::Formula(formula.into())
    }

    /// The reference text
    pub fn as_formula(&self) -> &str {
        match self {
            DataReference::Formula(f) => f,
        }
    }
}
