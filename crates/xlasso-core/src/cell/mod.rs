//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellValue`] - The value captured from a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - An inclusive range of cells (e.g., "A1:B10")

mod address;
pub(crate) mod storage;
mod value;

pub use address::{CellAddress, CellRange};
pub use value::{CellError, CellValue, SharedString};
