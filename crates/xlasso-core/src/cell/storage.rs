//! Sparse cell storage
//!
//! Only non-empty cells are stored, using a row-based BTreeMap structure.

use std::collections::BTreeMap;
use std::ops::Range;

use super::value::StringPool;
use super::{CellRange, CellValue};
use crate::CellAddress;

/// Sparse row-major storage for worksheet cells
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, CellValue>>`
#[derive(Debug, Clone, Default)]
pub(crate) struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
    string_pool: StringPool,
}

impl CellStorage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Set a cell value, removing the cell when the value is empty
    pub(crate) fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        let value = match value {
            CellValue::String(s) => CellValue::String(self.string_pool.intern(s)),
            other => other,
        };

        if value.is_empty() {
            self.remove(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, value);
        }
    }

    pub(crate) fn remove(&mut self, row: u32, col: u16) -> Option<CellValue> {
        let row_map = self.rows.get_mut(&row)?;
        let removed = row_map.remove(&col);
        if row_map.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    pub(crate) fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Bounds of the non-empty cells, `None` if there are none
    pub(crate) fn used_range(&self) -> Option<CellRange> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;

        let mut min_col = u16::MAX;
        let mut max_col = 0u16;
        for row_data in self.rows.values() {
            if let Some(&col) = row_data.keys().next() {
                min_col = min_col.min(col);
            }
            if let Some(&col) = row_data.keys().next_back() {
                max_col = max_col.max(col);
            }
        }

        Some(CellRange::new(
            CellAddress::new(min_row, min_col),
            CellAddress::new(max_row, max_col),
        ))
    }

    /// Copy out a dense block, padding missing cells with `Empty`
    pub(crate) fn block(&self, rows: Range<u32>, cols: Range<u16>) -> Vec<Vec<CellValue>> {
        if rows.is_empty() || cols.is_empty() {
            return Vec::new();
        }

        let width = cols.len();
        let mut block: Vec<Vec<CellValue>> = rows
            .clone()
            .map(|_| vec![CellValue::Empty; width])
            .collect();

        for (&row, row_data) in self.rows.range(rows.clone()) {
            let out = &mut block[(row - rows.start) as usize];
            for (&col, value) in row_data.range(cols.clone()) {
                out[(col - cols.start) as usize] = value.clone();
            }
        }

        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_cells_not_stored() {
        let mut storage = CellStorage::new();
        storage.set_value(0, 0, CellValue::Number(1.0));
        storage.set_value(0, 0, CellValue::Empty);
        assert_eq!(storage.cell_count(), 0);
        assert_eq!(storage.used_range(), None);
    }

    #[test]
    fn test_used_range() {
        let mut storage = CellStorage::new();
        storage.set_value(5, 3, CellValue::Number(1.0));
        storage.set_value(2, 7, CellValue::string("x"));
        storage.set_value(9, 1, CellValue::Boolean(true));
        assert_eq!(storage.used_range().unwrap().to_string(), "B3:H10");
    }

    #[test]
    fn test_block_pads_missing_cells() {
        let mut storage = CellStorage::new();
        storage.set_value(1, 1, CellValue::Number(5.0));
        let block = storage.block(0..3, 0..2);
        assert_eq!(
            block,
            vec![
                vec![CellValue::Empty, CellValue::Empty],
                vec![CellValue::Empty, CellValue::Number(5.0)],
                vec![CellValue::Empty, CellValue::Empty],
            ]
        );
        assert!(storage.block(2..2, 0..5).is_empty());
    }
}
