//! # xlasso
//!
//! Capture rectangular regions of spreadsheet data from compact reference
//! strings ("lassoing").
//!
//! A reference names an optional book and sheet, up to two edges and a
//! pipeline of filters:
//!
//! ```text
//! [book]Sheet1!A1(DR):..(DR)+(df(header=0))
//! ```
//!
//! Edges may be absolute (`A1`, `R5C3`), relative to a cursor (`R[-1]C[2]`),
//! or symbolic (`^` first, `_` last data row/column, `.` cursor); each edge
//! can then move in `L U R D` steps and grow until blank (`+`) or to the
//! sheet margin (`*`).
//!
//! ## Example
//!
//! ```rust
//! use xlasso::prelude::*;
//!
//! let sheet = Worksheet::from_rows(
//!     "Sheet1",
//!     [["name", "qty"], ["apple", "3"], ["pear", "1"]],
//! )
//! .unwrap();
//! let factory = SheetsFactory::new().with_backend(Workbook::new("book").with_worksheet(sheet).unwrap());
//!
//! let ranger = Ranger::new(&factory);
//! let lasso = ranger.lasso("Sheet1!A1:B_(dict)").unwrap();
//! assert_eq!(lasso.rect().to_string(), "A1:B3");
//! assert_eq!(lasso.value().get("pear"), Some(&Value::Cell(CellValue::string("1"))));
//! ```

pub mod ast;
pub mod error;
mod expr;
pub mod factory;
pub mod filters;
mod lasso;
pub mod options;
pub mod parser;
pub mod prelude;
pub mod ranger;
pub mod resolver;
pub mod value;

pub use ast::{
    Axis, Coordinate, Direction, Edge, EdgeModifier, FilterCall, LassoSpec, Literal, MarginKind,
    Move, SheetSelector,
};
pub use error::{LassoError, LassoResult};
pub use factory::SheetsFactory;
pub use filters::{default_filters, FilterContext, FilterDef, FilterImpl, FilterRegistry};
pub use lasso::Lasso;
pub use options::RangerOptions;
pub use parser::parse_reference;
pub use ranger::{lasso, LassoContext, Ranger};
pub use resolver::{EdgeResolver, ResolvedRect, Sides};
pub use value::{compare_cells, compare_values, Table, Value};

// Re-export core types
#[cfg(feature = "csv")]
pub use xlasso_core::CsvOptions;
pub use xlasso_core::{
    CellAddress, CellError, CellRange, CellValue, Sheet, SheetBackend, SheetId, Workbook,
    Worksheet, MAX_COLS, MAX_ROWS,
};
