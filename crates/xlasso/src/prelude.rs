//! Prelude module - common imports for xlasso users
//!
//! ```rust
//! use xlasso::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CellAddress,
    CellError,
    CellValue,

    // Error types
    LassoError,
    LassoResult,

    // Resolution
    Lasso,
    LassoContext,
    Ranger,
    RangerOptions,
    ResolvedRect,
    SheetsFactory,

    // Sheets
    Sheet,
    SheetBackend,
    Workbook,
    Worksheet,

    // Filtered values
    Table,
    Value,
};
