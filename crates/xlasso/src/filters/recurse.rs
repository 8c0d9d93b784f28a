//! `recurse` filter

use xlasso_core::{CellAddress, CellValue};

use super::FilterContext;
use crate::ast::{FilterCall, Literal};
use crate::error::{LassoError, LassoResult};
use crate::lasso::Lasso;
use crate::parser::parse_reference;
use crate::value::{Table, Value};

/// Lasso the reference argument, or every string cell of the value that
/// parses as a reference
///
/// Without a reference, `include` and `exclude` pick the map keys and
/// table columns to descend into, and `depth` bounds how many nesting
/// levels are visited (negative: no bound, 0: none).
pub(super) fn filter_recurse(value: Value, call: &FilterCall, cx: &FilterContext<'_>) -> LassoResult<Value> {
    let dive = Dive {
        cx,
        include: keys(call.param(1, "include"), "include")?,
        exclude: keys(call.param(2, "exclude"), "exclude")?,
        depth: match call.param(3, "depth").filter(|lit| !lit.is_null()) {
            None => -1,
            Some(Literal::Number(n)) if n.fract() == 0.0 => *n as i64,
            Some(other) => {
                return Err(LassoError::argument(
                    "recurse",
                    format!("depth must be a whole number, got {}", other),
                ))
            }
        },
    };

    match call.param(0, "reference").filter(|lit| !lit.is_null()) {
        None => dive.value(value, 0, Some(cx.rect().top_left())),
        Some(Literal::String(reference)) => {
            let context = cx.nested(cx.rect().top_left());
            cx.ranger()
                .resolve_lasso(reference, &context)
                .map(Lasso::into_value)
                .map_err(|e| e.within(cx.reference()))
        }
        Some(other) => Err(LassoError::argument(
            "recurse",
            format!("reference must be a string, got {}", other),
        )),
    }
}

fn keys(literal: Option<&Literal>, param: &str) -> LassoResult<Option<Vec<String>>> {
    match literal {
        None | Some(Literal::Null) => Ok(None),
        Some(Literal::List(items)) => items
            .iter()
            .map(|item| key(item, param))
            .collect::<LassoResult<Vec<_>>>()
            .map(Some),
        Some(item) => key(item, param).map(|key| Some(vec![key])),
    }
}

fn key(literal: &Literal, param: &str) -> LassoResult<String> {
    match literal {
        Literal::String(s) => Ok(s.clone()),
        // Column names of a header-less table are numbers
        Literal::Number(n) if n.fract() == 0.0 => Ok(format!("{}", *n as i64)),
        other => Err(LassoError::argument(
            "recurse",
            format!("{} keys must be strings, got {}", param, other),
        )),
    }
}

struct Dive<'c, 'a> {
    cx: &'c FilterContext<'a>,
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    depth: i64,
}

impl Dive<'_, '_> {
    fn is_included(&self, key: &str) -> bool {
        self.include
            .as_ref()
            .map_or(true, |keys| keys.iter().any(|k| k == key))
            && self
                .exclude
                .as_ref()
                .map_or(true, |keys| keys.iter().all(|k| k != key))
    }

    fn reaches(&self, level: i64) -> bool {
        self.depth < 0 || level < self.depth
    }

    /// Replace reference strings found in `value`, which sits `level`
    /// containers deep
    ///
    /// `cursor` tracks the sheet position of the value while it still
    /// mirrors the captured grid: the outer list walks rows, the lists
    /// inside it walk columns. Maps and tables lose it.
    fn value(&self, value: Value, level: i64, cursor: Option<CellAddress>) -> LassoResult<Value> {
        if !self.reaches(level) {
            return Ok(value);
        }
        match value {
            Value::Cell(CellValue::String(text)) => Ok(self
                .expand(text.as_str(), cursor)?
                .unwrap_or(Value::Cell(CellValue::String(text)))),
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| {
                    let cursor = cursor.and_then(|c| match level {
                        0 => c.offset(i as i64, 0),
                        1 => c.offset(0, i as i64),
                        _ => None,
                    });
                    self.value(item, level + 1, cursor)
                })
                .collect::<LassoResult<Vec<_>>>()
                .map(Value::List),
            Value::Map(entries) => entries
                .into_iter()
                .map(|(key, item)| {
                    if self.is_included(&key) {
                        self.value(item, level + 1, None).map(|item| (key, item))
                    } else {
                        Ok((key, item))
                    }
                })
                .collect::<LassoResult<Vec<_>>>()
                .map(Value::Map),
            Value::Table(table) => self.table(table, level).map(Value::Table),
            other => Ok(other),
        }
    }

    /// Columns sit one level below the table, their cells two
    fn table(&self, table: Table, level: i64) -> LassoResult<Table> {
        if !self.reaches(level + 2) {
            return Ok(table);
        }
        let (columns, mut rows) = table.into_parts();
        for (j, column) in columns.iter().enumerate() {
            if !self.is_included(column) {
                continue;
            }
            for row in rows.iter_mut() {
                let text = match &row[j] {
                    CellValue::String(text) => text.clone(),
                    _ => continue,
                };
                if let Some(value) = self.expand(text.as_str(), None)? {
                    row[j] = single_cell(value).map_err(|value| {
                        LassoError::argument(
                            "recurse",
                            format!(
                                "{:?} in column '{}' captured {} cells, a table cell holds one",
                                text.as_str(),
                                column,
                                value.cells().len()
                            ),
                        )
                    })?;
                }
            }
        }
        Ok(Table::new(columns, rows))
    }

    /// Lasso `text` if it parses as a reference
    fn expand(&self, text: &str, cursor: Option<CellAddress>) -> LassoResult<Option<Value>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let spec = match parse_reference(text) {
            Ok(spec) => spec,
            Err(e) if e.is_parse_error() => {
                log::debug!("recurse skipped non-reference {:?}: {}", text, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let context = self
            .cx
            .nested(cursor.unwrap_or_else(|| self.cx.rect().top_left()));
        let lasso = self
            .cx
            .ranger()
            .resolve_spec(spec, &context)
            .map_err(|e| e.within(self.cx.reference()))?;
        Ok(Some(lasso.into_value()))
    }
}

/// The one cell a value holds, looking through single-item lists
fn single_cell(value: Value) -> Result<CellValue, Value> {
    match value {
        Value::Cell(cell) => Ok(cell),
        Value::List(items) if items.len() == 1 => items
            .into_iter()
            .next()
            .map_or(Err(Value::empty_list()), single_cell),
        other => Err(other),
    }
}
