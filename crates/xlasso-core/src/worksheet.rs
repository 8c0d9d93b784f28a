//! In-memory worksheet

use std::ops::Range;

use crate::cell::storage::CellStorage;
use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::sheet::{Sheet, SheetId};
use crate::{MAX_COLS, MAX_ROWS};

/// A sheet held entirely in memory
#[derive(Debug, Clone)]
pub struct Worksheet {
    id: SheetId,
    cells: CellStorage,
    hard_bounds: Option<CellAddress>,
}

impl Worksheet {
    /// Create a new, standalone worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            id: SheetId::new("", 0, name),
            cells: CellStorage::new(),
            hard_bounds: None,
        }
    }

    /// Build a worksheet from row-major values starting at A1
    pub fn from_rows<S, R, V>(name: S, rows: R) -> Result<Self>
    where
        S: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut sheet = Self::new(name);
        for (row, values) in rows.into_iter().enumerate() {
            let row = u32::try_from(row).map_err(|_| Error::RowOutOfBounds(u32::MAX, MAX_ROWS - 1))?;
            for (col, value) in values.into_iter().enumerate() {
                let col = u16::try_from(col)
                    .map_err(|_| Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1))?;
                sheet.set_cell_value_at(row, col, value)?;
            }
        }
        Ok(sheet)
    }

    /// Fix the sheet dimensions; `last` is the last addressable cell.
    pub fn with_hard_bounds(mut self, last: CellAddress) -> Self {
        self.hard_bounds = Some(last);
        self
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub(crate) fn set_id(&mut self, id: SheetId) {
        self.id = id;
    }

    // === Cell Access ===

    /// Get a cell value by address string
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get a cell value by row and column indices
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells.get(row, col).cloned().unwrap_or_default()
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;
        self.cells.set_value(row, col, value.into());
        Ok(())
    }

    /// Clear a cell by indices
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        self.cells.remove(row, col);
    }

    /// Get the used range (bounds of all non-empty cells)
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells.used_range()
    }

    fn validate_cell_position(&self, row: u32, col: u16) -> Result<()> {
        let (max_row, max_col) = match self.hard_bounds {
            Some(last) => (last.row, last.col),
            None => (MAX_ROWS - 1, MAX_COLS - 1),
        };
        if row > max_row {
            return Err(Error::RowOutOfBounds(row, max_row));
        }
        if col > max_col {
            return Err(Error::ColumnOutOfBounds(col as u32, max_col));
        }
        Ok(())
    }
}

impl Sheet for Worksheet {
    fn id(&self) -> &SheetId {
        &self.id
    }

    fn bounds(&self) -> Option<CellRange> {
        self.cells.used_range()
    }

    fn hard_bounds(&self) -> Option<CellAddress> {
        self.hard_bounds
    }

    fn read_rect(&self, rows: Range<u32>, cols: Range<u16>) -> Result<Vec<Vec<CellValue>>> {
        Ok(self.cells.block(rows, cols))
    }
}
