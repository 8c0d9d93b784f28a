//! The sheet abstraction every storage backend implements
//!
//! A [`SheetBackend`] is one workbook-like source (an in-memory
//! [`Workbook`](crate::Workbook), a CSV file, a spreadsheet reader) that
//! can list and open its sheets. Each opened [`Sheet`] is a read-only
//! cell grid that reports how far its data extends and hands back
//! rectangular blocks of values.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::Result;

/// Identity of an opened sheet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SheetId {
    /// Identifier of the backend (workbook) owning the sheet
    pub book: String,
    /// Zero-based position of the sheet inside its workbook
    pub index: usize,
    /// Sheet name
    pub name: String,
}

impl SheetId {
    /// Create a new sheet identity
    pub fn new<B: Into<String>, N: Into<String>>(book: B, index: usize, name: N) -> Self {
        Self {
            book: book.into(),
            index,
            name: name.into(),
        }
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.book.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "[{}]{}", self.book, self.name)
        }
    }
}

/// A read-only grid of cells
pub trait Sheet: Send + Sync + fmt::Debug {
    /// Identity of this sheet
    fn id(&self) -> &SheetId;

    /// Sheet name
    fn name(&self) -> &str {
        &self.id().name
    }

    /// Best-effort extent of the non-empty cells, `None` when the sheet holds no data.
    ///
    /// Backends that cannot compute the exact extent may over-report it;
    /// callers only rely on cells outside the returned range being empty.
    fn bounds(&self) -> Option<CellRange>;

    /// Last addressable cell when the backend has fixed dimensions
    fn hard_bounds(&self) -> Option<CellAddress> {
        None
    }

    /// Read the half-open block `rows` x `cols` as row-major values.
    ///
    /// Cells beyond the stored data come back as [`CellValue::Empty`]. An
    /// empty block yields an empty `Vec`.
    fn read_rect(&self, rows: Range<u32>, cols: Range<u16>) -> Result<Vec<Vec<CellValue>>>;

    /// Whether every cell of the block is empty
    fn is_blank(&self, rows: Range<u32>, cols: Range<u16>) -> Result<bool> {
        Ok(self
            .read_rect(rows, cols)?
            .iter()
            .flatten()
            .all(CellValue::is_empty))
    }
}

/// A source of sheets, typically one workbook
pub trait SheetBackend: Send + Sync + fmt::Debug {
    /// Identifier used in `[book]` reference prefixes
    fn id(&self) -> &str;

    /// Names of the sheets, in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Open the sheet at `index`
    fn open_sheet(&self, index: usize) -> Result<Arc<dyn Sheet>>;
}
