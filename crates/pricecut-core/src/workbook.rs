//! Workbook type - the main document structure

use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook (spreadsheet document)
///
/// Holds the ordered worksheets, which one is active, and the stylesheet
/// the cells' style indices point into.
#[derive(Debug)]
pub struct Workbook {
    /// Worksheets in the workbook
    worksheets: Vec<Worksheet>,
    /// Active sheet index
    active_sheet: usize,
    /// Raw `xl/styles.xml` carried through load and save untouched
    stylesheet: Option<Vec<u8>>,
}

impl Workbook {
    /// Create a new workbook with one worksheet named "Sheet1"
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            active_sheet: 0,
            stylesheet: None,
        }
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            active_sheet: 0,
            stylesheet: None,
        }
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by exact name
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    /// Get a mutable worksheet by exact name
    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.worksheets.iter_mut().find(|ws| ws.name() == name)
    }

    /// Get the index of a worksheet by exact name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(Worksheet::name).collect()
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Add a new worksheet with a generated "SheetN" name
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_worksheet_with_name(&name)
    }

    /// Add a new worksheet with specified name
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;
        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    /// Get the active sheet index
    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    /// Set the active sheet index
    pub fn set_active_sheet(&mut self, index: usize) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.active_sheet = index;
        Ok(())
    }

    /// The active worksheet
    pub fn active_worksheet(&self) -> Option<&Worksheet> {
        self.worksheets.get(self.active_sheet)
    }

    /// The active worksheet, mutably
    pub fn active_worksheet_mut(&mut self) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(self.active_sheet)
    }

    /// Raw stylesheet bytes, if the workbook was loaded with one
    pub fn stylesheet(&self) -> Option<&[u8]> {
        self.stylesheet.as_deref()
    }

    /// Replace the raw stylesheet
    pub fn set_stylesheet(&mut self, xml: Vec<u8>) {
        self.stylesheet = Some(xml);
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "'{}' is longer than {} characters",
                name, MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "'{}' contains '{}'",
                name, c
            )));
        }

        // Excel compares sheet names case-insensitively
        let lower = name.to_lowercase();
        if self
            .worksheets
            .iter()
            .any(|ws| ws.name().to_lowercase() == lower)
        {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }

    fn generate_sheet_name(&self) -> String {
        (self.worksheets.len() + 1..)
            .map(|n| format!("Sheet{}", n))
            .find(|name| self.validate_sheet_name(name).is_ok())
            .unwrap_or_else(|| "Sheet".to_string())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.worksheet(0).unwrap().name(), "Sheet1");
        assert_eq!(wb.active_worksheet().unwrap().name(), "Sheet1");
        assert!(wb.stylesheet().is_none());
    }

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new();

        assert_eq!(wb.add_worksheet().unwrap(), 1);
        assert_eq!(wb.worksheet(1).unwrap().name(), "Sheet2");

        assert_eq!(wb.add_worksheet_with_name("Data").unwrap(), 2);
        assert_eq!(wb.sheet_names(), vec!["Sheet1", "Sheet2", "Data"]);
        assert_eq!(wb.sheet_index("Data"), Some(2));
    }

    #[test]
    fn test_duplicate_name() {
        let mut wb = Workbook::new();
        assert!(wb.add_worksheet_with_name("SHEET1").is_err());
        assert!(wb.add_worksheet_with_name("sheet1").is_err());
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut wb = Workbook::new();

        assert!(wb.add_worksheet_with_name("").is_err());
        assert!(wb.add_worksheet_with_name("Q1/Q2").is_err());
        assert!(wb.add_worksheet_with_name("Sheet[1]").is_err());

        let long_name = "A".repeat(MAX_SHEET_NAME_LEN + 1);
        assert!(wb.add_worksheet_with_name(&long_name).is_err());
    }

    #[test]
    fn test_active_sheet() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Summary").unwrap();
        wb.add_worksheet_with_name("Prices").unwrap();

        wb.set_active_sheet(1).unwrap();
        assert_eq!(wb.active_worksheet().unwrap().name(), "Prices");
        assert!(wb.set_active_sheet(2).is_err());
    }

    #[test]
    fn test_lookup_by_name_is_exact() {
        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("sheet1").unwrap();

        assert!(wb.worksheet_by_name("Sheet1").is_none());
        assert!(wb.worksheet_by_name_mut("sheet1").is_some());
    }
}
