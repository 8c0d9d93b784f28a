//! # xlasso-core
//!
//! Core data structures shared by the xlasso reference engine.
//!
//! This crate provides:
//! - [`CellValue`] - Scalar values captured from a sheet (numbers, strings, booleans, errors)
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges
//! - [`Sheet`] and [`SheetBackend`] - The interface every sheet-storage backend implements
//! - [`Workbook`], [`Worksheet`] - An in-memory backend, optionally loaded from CSV
//!
//! ## Example
//!
//! ```rust
//! use xlasso_core::{CellValue, Sheet, Workbook};
//!
//! let mut workbook = Workbook::new("book");
//! let sheet = workbook.add_worksheet("Sheet1").unwrap();
//! sheet.set_cell_value("A1", "Hello").unwrap();
//! sheet.set_cell_value_at(0, 1, 42.0).unwrap();
//!
//! let sheet = workbook.worksheet(0).unwrap();
//! let rows = sheet.read_rect(0..1, 0..2).unwrap();
//! assert_eq!(rows[0][1], CellValue::Number(42.0));
//! ```

pub mod cell;
#[cfg(feature = "csv")]
pub mod csv;
pub mod error;
pub mod sheet;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellError, CellRange, CellValue, SharedString};
#[cfg(feature = "csv")]
pub use crate::csv::CsvOptions;
pub use error::{Error, Result};
pub use sheet::{Sheet, SheetBackend, SheetId};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
