//! In-memory workbook backend

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::sheet::{Sheet, SheetBackend, SheetId};
use crate::worksheet::Worksheet;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// A named collection of in-memory worksheets
#[derive(Debug)]
pub struct Workbook {
    id: String,
    worksheets: Vec<Arc<Worksheet>>,
    opens: AtomicUsize,
}

impl Workbook {
    /// Create an empty workbook identified by `id`
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            worksheets: Vec::new(),
            opens: AtomicUsize::new(0),
        }
    }

    /// Workbook identifier, as used in `[book]` prefixes
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index).map(|ws| ws.as_ref())
    }

    /// Get a mutable worksheet by index.
    ///
    /// Sheets already handed out by [`SheetBackend::open_sheet`] keep the
    /// contents they had when opened.
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index).map(Arc::make_mut)
    }

    /// Find a sheet index by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.worksheets
            .iter()
            .position(|ws| ws.name().to_lowercase() == name)
    }

    /// Add a new empty worksheet and return it for filling
    pub fn add_worksheet(&mut self, name: &str) -> Result<&mut Worksheet> {
        let index = self.add_existing_worksheet(Worksheet::new(name))?;
        let count = self.worksheets.len();
        self.worksheet_mut(index)
            .ok_or(Error::SheetOutOfBounds(index, count))
    }

    /// Append an already-built worksheet, returning its index
    pub fn add_existing_worksheet(&mut self, mut worksheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(worksheet.name())?;
        let index = self.worksheets.len();
        worksheet.set_id(SheetId::new(self.id.clone(), index, worksheet.name()));
        self.worksheets.push(Arc::new(worksheet));
        Ok(index)
    }

    /// Builder form of [`add_existing_worksheet`](Self::add_existing_worksheet)
    pub fn with_worksheet(mut self, worksheet: Worksheet) -> Result<Self> {
        self.add_existing_worksheet(worksheet)?;
        Ok(self)
    }

    /// How many times sheets were opened through the backend interface
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::Relaxed)
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        if self.sheet_index(name).is_some() {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }
}

impl SheetBackend for Workbook {
    fn id(&self) -> &str {
        &self.id
    }

    fn sheet_names(&self) -> Vec<String> {
        self.worksheets.iter().map(|ws| ws.name().to_string()).collect()
    }

    fn open_sheet(&self, index: usize) -> Result<Arc<dyn Sheet>> {
        let worksheet = self
            .worksheets
            .get(index)
            .ok_or(Error::SheetOutOfBounds(index, self.worksheets.len()))?;
        self.opens.fetch_add(1, Ordering::Relaxed);
        log::debug!("opening sheet {} of workbook '{}'", index, self.id);
        let sheet: Arc<dyn Sheet> = worksheet.clone();
        Ok(sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new("book");
        wb.add_worksheet("Data").unwrap().set_cell_value("A1", 1).unwrap();
        wb.add_worksheet("Other").unwrap();

        assert_eq!(wb.sheet_count(), 2);
        assert_eq!(wb.sheet_names(), vec!["Data", "Other"]);
        assert_eq!(wb.sheet_index("other"), Some(1));
        assert_eq!(
            wb.worksheet(1).unwrap().id(),
            &SheetId::new("book", 1, "Other")
        );
    }

    #[test]
    fn test_invalid_and_duplicate_names() {
        let mut wb = Workbook::new("book");
        wb.add_worksheet("Sheet1").unwrap();

        assert!(matches!(
            wb.add_worksheet("SHEET1"),
            Err(Error::DuplicateSheetName(_))
        ));
        let long = "A".repeat(MAX_SHEET_NAME_LEN + 1);
        for bad in ["", "a/b", "a:b", "[x]", long.as_str()] {
            assert!(wb.add_worksheet(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_open_sheet_counts_and_bounds() {
        let mut wb = Workbook::new("book");
        wb.add_worksheet("S").unwrap().set_cell_value("B2", "x").unwrap();

        let sheet = wb.open_sheet(0).unwrap();
        assert_eq!(sheet.name(), "S");
        assert_eq!(sheet.read_rect(1..2, 1..2).unwrap(), vec![vec![CellValue::string("x")]]);
        assert_eq!(wb.open_count(), 1);
        assert!(matches!(wb.open_sheet(3), Err(Error::SheetOutOfBounds(3, 1))));
    }
}
