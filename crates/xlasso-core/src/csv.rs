//! CSV loading into in-memory worksheets

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::cell::CellValue;
use crate::error::{Error, Result};
use crate::workbook::Workbook;
use crate::worksheet::Worksheet;
use crate::{MAX_COLS, MAX_ROWS};

/// Options for reading CSV files
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Field delimiter (default: comma)
    pub delimiter: u8,
    /// Quote character (default: double quote)
    pub quote: u8,
    /// Detect numbers and booleans instead of keeping every field as text
    pub auto_detect_types: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            auto_detect_types: true,
        }
    }
}

impl Worksheet {
    /// Read every CSV record into a worksheet, first record at row 1
    pub fn from_csv_reader<R: Read>(name: &str, reader: R, options: &CsvOptions) -> Result<Self> {
        let mut csv_reader = ::csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut sheet = Worksheet::new(name);
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            if row >= MAX_ROWS as usize {
                return Err(Error::RowOutOfBounds(row as u32, MAX_ROWS - 1));
            }
            for (col, field) in record.iter().enumerate() {
                if col >= MAX_COLS as usize {
                    return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1));
                }
                let value = if options.auto_detect_types {
                    detect_type(field)
                } else if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::string(field)
                };
                sheet.set_cell_value_at(row as u32, col as u16, value)?;
            }
        }

        log::debug!(
            "loaded {} cells from CSV into sheet '{}'",
            sheet.cell_count(),
            name
        );
        Ok(sheet)
    }
}

impl Workbook {
    /// Load a CSV file as a single-sheet workbook.
    ///
    /// The workbook id is the file path as given and the sheet is named
    /// after the file stem.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sheet1")
            .to_string();
        let sheet = Worksheet::from_csv_reader(&name, File::open(path)?, options)?;
        Workbook::new(path.display().to_string()).with_worksheet(sheet)
    }
}

fn detect_type(field: &str) -> CellValue {
    let field = field.trim();

    if field.is_empty() {
        return CellValue::Empty;
    }

    if field.eq_ignore_ascii_case("true") {
        return CellValue::Boolean(true);
    }
    if field.eq_ignore_ascii_case("false") {
        return CellValue::Boolean(false);
    }

    if let Ok(n) = field.parse::<f64>() {
        if n.is_finite() {
            return CellValue::Number(n);
        }
    }

    CellValue::string(field)
}
