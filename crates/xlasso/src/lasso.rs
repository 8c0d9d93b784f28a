//! Resolution result

use xlasso_core::{CellValue, SheetId};

use crate::ast::LassoSpec;
use crate::resolver::ResolvedRect;
use crate::value::Value;

/// A resolved reference: where it pointed, what it captured, and what the
/// filters made of it
#[derive(Debug, Clone, PartialEq)]
pub struct Lasso {
    spec: LassoSpec,
    sheet: SheetId,
    rect: ResolvedRect,
    values: Vec<Vec<CellValue>>,
    value: Value,
}

impl Lasso {
    pub(crate) fn new(
        spec: LassoSpec,
        sheet: SheetId,
        rect: ResolvedRect,
        values: Vec<Vec<CellValue>>,
        value: Value,
    ) -> Self {
        Self {
            spec,
            sheet,
            rect,
            values,
            value,
        }
    }

    /// The parsed reference
    pub fn spec(&self) -> &LassoSpec {
        &self.spec
    }

    /// Identity of the sheet the rectangle was read from
    pub fn sheet(&self) -> &SheetId {
        &self.sheet
    }

    pub fn rect(&self) -> ResolvedRect {
        self.rect
    }

    /// Raw captured cells, row-major
    pub fn values(&self) -> &[Vec<CellValue>] {
        &self.values
    }

    /// Output of the filter pipeline
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}
