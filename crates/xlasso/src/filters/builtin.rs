//! Built-in shaping filters

use xlasso_core::CellValue;

use super::{FilterContext, FilterDef, FilterRegistry};
use crate::ast::{FilterCall, Literal};
use crate::error::{LassoError, LassoResult};
use crate::value::{compare_values, Table, Value};

pub(super) fn register_builtin_filters(registry: &FilterRegistry) {
    registry.register(FilterDef {
        name: "identity".into(),
        min_args: 0,
        max_args: Some(0),
        implementation: filter_identity,
        description: "identity: pass the value through".into(),
    });

    registry.register(FilterDef {
        name: "trim".into(),
        min_args: 0,
        max_args: Some(0),
        implementation: filter_trim,
        description: "trim: cut the value down to its non-empty bounding box".into(),
    });

    registry.register(FilterDef {
        name: "df".into(),
        min_args: 0,
        max_args: Some(1),
        implementation: filter_df,
        description: "df(header=null): build a table, taking column names from row `header`".into(),
    });

    registry.register(FilterDef {
        name: "dict".into(),
        min_args: 0,
        max_args: Some(0),
        implementation: filter_dict,
        description: "dict: map the first cell of each 2-cell row to the second".into(),
    });

    registry.register(FilterDef {
        name: "sorted".into(),
        min_args: 0,
        max_args: Some(1),
        implementation: filter_sorted,
        description: "sorted(reverse=false): sort the rows of a list".into(),
    });

    registry.register(FilterDef {
        name: "redim".into(),
        min_args: 0,
        max_args: Some(5),
        implementation: filter_redim,
        description: "redim(scalar, cell, row, col, table): reshape to 0, 1 or 2 dimensions, \
                      [ndim, true] also transposes"
            .into(),
    });

    registry.register(FilterDef {
        name: "pipe".into(),
        min_args: 1,
        max_args: None,
        implementation: filter_pipe,
        description: "pipe(f, ...): apply the given filter calls in order".into(),
    });
}

/// The value as rows of cells, or an argument error naming `filter`
fn grid(filter: &str, value: &Value) -> LassoResult<Vec<Vec<CellValue>>> {
    value.to_grid().ok_or_else(|| {
        LassoError::argument(
            filter,
            format!("expected a 2D value, got a {}", value.type_name()),
        )
    })
}

fn filter_identity(value: Value, _call: &FilterCall, _cx: &FilterContext<'_>) -> LassoResult<Value> {
    Ok(value)
}

fn filter_trim(value: Value, _call: &FilterCall, _cx: &FilterContext<'_>) -> LassoResult<Value> {
    let rows = grid("trim", &value)?;

    let filled: Vec<(usize, usize)> = rows
        .iter()
        .enumerate()
        .flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| !cell.is_empty())
                .map(move |(c, _)| (r, c))
        })
        .collect();
    if filled.is_empty() {
        return Ok(Value::empty_list());
    }

    let top = filled.iter().map(|p| p.0).min().unwrap_or_default();
    let bottom = filled.iter().map(|p| p.0).max().unwrap_or_default();
    let left = filled.iter().map(|p| p.1).min().unwrap_or_default();
    let right = filled.iter().map(|p| p.1).max().unwrap_or_default();

    let trimmed = rows[top..=bottom]
        .iter()
        .map(|row| {
            (left..=right)
                .map(|c| row.get(c).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    Ok(Value::from_rows(trimmed))
}

fn filter_df(value: Value, call: &FilterCall, _cx: &FilterContext<'_>) -> LassoResult<Value> {
    let header = match call.param(0, "header") {
        None | Some(Literal::Null) => None,
        Some(lit) => Some(lit.as_index().ok_or_else(|| {
            LassoError::argument("df", format!("header must be a row index or null, got {}", lit))
        })?),
    };

    let mut rows = grid("df", &value)?;
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);

    let columns = match header {
        None => (0..width).map(|i| i.to_string()).collect(),
        Some(n) => {
            if n >= rows.len() {
                return Err(LassoError::argument(
                    "df",
                    format!("header row {} is outside the {} captured rows", n, rows.len()),
                ));
            }
            let names = rows[n].clone();
            rows.drain(..=n);
            (0..width)
                .map(|i| match names.get(i) {
                    Some(cell) if !cell.is_empty() => cell.to_string(),
                    _ => i.to_string(),
                })
                .collect()
        }
    };

    Ok(Value::Table(Table::new(columns, rows)))
}

fn filter_dict(value: Value, _call: &FilterCall, _cx: &FilterContext<'_>) -> LassoResult<Value> {
    grid("dict", &value)?
        .into_iter()
        .map(|row| match <[CellValue; 2]>::try_from(row) {
            Ok([key, value]) => Ok((key.to_string(), Value::Cell(value))),
            Err(row) => Err(LassoError::argument(
                "dict",
                format!("each row needs exactly 2 cells, found {}", row.len()),
            )),
        })
        .collect::<LassoResult<Vec<_>>>()
        .map(Value::Map)
}

fn filter_sorted(value: Value, call: &FilterCall, _cx: &FilterContext<'_>) -> LassoResult<Value> {
    let reverse = match call.param(0, "reverse") {
        None | Some(Literal::Null) => false,
        Some(lit) => lit.as_bool().ok_or_else(|| {
            LassoError::argument("sorted", format!("reverse must be a boolean, got {}", lit))
        })?,
    };

    match value {
        Value::List(mut items) => {
            if reverse {
                items.sort_by(|a, b| compare_values(b, a));
            } else {
                items.sort_by(compare_values);
            }
            Ok(Value::List(items))
        }
        other => Err(LassoError::argument(
            "sorted",
            format!("expected a list, got a {}", other.type_name()),
        )),
    }
}

/// Parameter names of `redim`, indexed by capture shape
const SHAPES: [&str; 5] = ["scalar", "cell", "row", "col", "table"];

fn filter_redim(value: Value, call: &FilterCall, cx: &FilterContext<'_>) -> LassoResult<Value> {
    let shape = cx.shape_index();
    let (ndim, transpose) = match call.param(shape, SHAPES[shape]) {
        None | Some(Literal::Null) => return Ok(value),
        Some(Literal::List(items)) => match items.as_slice() {
            [ndim, flag] => (
                dimension(ndim)?,
                flag.as_bool().ok_or_else(|| {
                    LassoError::argument("redim", format!("transpose flag must be a boolean, got {}", flag))
                })?,
            ),
            _ => {
                return Err(LassoError::argument(
                    "redim",
                    "expected ndim or [ndim, transpose]",
                ))
            }
        },
        Some(lit) => (dimension(lit)?, false),
    };

    let mut rows = grid("redim", &value)?;
    if transpose {
        rows = transpose_rows(rows);
    }

    Ok(match ndim {
        2 => Value::from_rows(rows),
        1 => Value::List(rows.into_iter().flatten().map(Value::Cell).collect()),
        _ => {
            let mut cells: Vec<CellValue> = rows.into_iter().flatten().collect();
            if cells.len() == 1 {
                Value::Cell(cells.remove(0))
            } else {
                Value::List(cells.into_iter().map(Value::Cell).collect())
            }
        }
    })
}

fn dimension(lit: &Literal) -> LassoResult<usize> {
    match lit.as_index() {
        Some(n) if n <= 2 => Ok(n),
        _ => Err(LassoError::argument(
            "redim",
            format!("dimension must be 0, 1 or 2, got {}", lit),
        )),
    }
}

fn transpose_rows(rows: Vec<Vec<CellValue>>) -> Vec<Vec<CellValue>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|c| {
            rows.iter()
                .map(|row| row.get(c).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

fn filter_pipe(value: Value, call: &FilterCall, cx: &FilterContext<'_>) -> LassoResult<Value> {
    call.args.iter().try_fold(value, |value, arg| match arg {
        Literal::Call(inner) => cx.apply(inner, value),
        other => Err(LassoError::argument(
            "pipe",
            format!("arguments must be filter calls, got {}", other),
        )),
    })
}
