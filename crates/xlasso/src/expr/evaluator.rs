//! Expression evaluator
//!
//! Scalars follow spreadsheet rules: error operands propagate, division by
//! zero yields `#DIV/0!` and non-numeric arithmetic yields `#VALUE!`.

use std::cmp::Ordering;

use xlasso_core::{CellError, CellValue};

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{LassoError, LassoResult};
use crate::value::{compare_cells, Value};

/// Evaluate `expr` with `x` bound to `input`
pub fn evaluate(expr: &Expr, input: &Value) -> LassoResult<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Cell(CellValue::Number(*n))),
        Expr::String(s) => Ok(Value::Cell(CellValue::string(s.as_str()))),
        Expr::Boolean(b) => Ok(Value::Cell(CellValue::Boolean(*b))),
        Expr::Variable(name) => {
            if name.eq_ignore_ascii_case("x") {
                Ok(input.clone())
            } else {
                Err(LassoError::Eval(format!("unknown name '{}'", name)))
            }
        }
        Expr::BinaryOp { op, left, right } => {
            let left = evaluate(left, input)?;
            let right = evaluate(right, input)?;
            broadcast(left, right, &|l, r| binary_scalar(*op, l, r))
        }
        Expr::UnaryOp {
            op: UnaryOperator::Negate,
            operand,
        } => map_cells(evaluate(operand, input)?, &|cell| {
            numeric(cell, |n| CellValue::Number(-n))
        }),
        Expr::Function { name, args } => call_function(name, args, input),
    }
}

/// Operand form of a value: tables become their rows, maps are rejected
fn operand(value: Value) -> LassoResult<Value> {
    match value {
        Value::Table(table) => Ok(Value::from_rows(table.rows().to_vec())),
        Value::Map(_) => Err(LassoError::Eval("maps cannot be used as operands".into())),
        other => Ok(other),
    }
}

/// Apply `op` element-wise, repeating a cell operand across a list
fn broadcast(
    left: Value,
    right: Value,
    op: &dyn Fn(&CellValue, &CellValue) -> CellValue,
) -> LassoResult<Value> {
    match (operand(left)?, operand(right)?) {
        (Value::Cell(l), Value::Cell(r)) => Ok(Value::Cell(op(&l, &r))),
        (Value::List(l), Value::List(r)) => {
            if l.len() != r.len() {
                return Err(LassoError::Eval(format!(
                    "shape mismatch: {} and {} elements",
                    l.len(),
                    r.len()
                )));
            }
            l.into_iter()
                .zip(r)
                .map(|(l, r)| broadcast(l, r, op))
                .collect::<LassoResult<Vec<_>>>()
                .map(Value::List)
        }
        (Value::List(l), right) => l
            .into_iter()
            .map(|l| broadcast(l, right.clone(), op))
            .collect::<LassoResult<Vec<_>>>()
            .map(Value::List),
        (left, Value::List(r)) => r
            .into_iter()
            .map(|r| broadcast(left.clone(), r, op))
            .collect::<LassoResult<Vec<_>>>()
            .map(Value::List),
        (left, right) => Err(LassoError::Eval(format!(
            "cannot combine a {} and a {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Apply `f` to every cell, keeping the list structure
fn map_cells(value: Value, f: &dyn Fn(&CellValue) -> CellValue) -> LassoResult<Value> {
    match operand(value)? {
        Value::Cell(cell) => Ok(Value::Cell(f(&cell))),
        Value::List(items) => items
            .into_iter()
            .map(|item| map_cells(item, f))
            .collect::<LassoResult<Vec<_>>>()
            .map(Value::List),
        other => Err(LassoError::Eval(format!(
            "cannot apply to a {}",
            other.type_name()
        ))),
    }
}

fn to_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        CellValue::Empty => Some(0.0),
        CellValue::String(s) => s.as_str().trim().parse().ok(),
        CellValue::Error(_) => None,
    }
}

/// Text form used by `&`
fn to_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        other => other.to_string(),
    }
}

/// Run `f` on the numeric form of `cell`, propagating errors
fn numeric(cell: &CellValue, f: impl Fn(f64) -> CellValue) -> CellValue {
    match cell {
        CellValue::Error(e) => CellValue::Error(*e),
        other => to_number(other).map_or(CellValue::Error(CellError::Value), f),
    }
}

fn binary_scalar(op: BinaryOperator, left: &CellValue, right: &CellValue) -> CellValue {
    // Propagate errors
    if let CellValue::Error(e) = left {
        return CellValue::Error(*e);
    }
    if let CellValue::Error(e) = right {
        return CellValue::Error(*e);
    }

    let compare = |accept: fn(Ordering) -> bool| {
        CellValue::Boolean(accept(compare_cells(left, right)))
    };

    match op {
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => match (to_number(left), to_number(right)) {
            (Some(l), Some(r)) => arithmetic(op, l, r),
            _ => CellValue::Error(CellError::Value),
        },

        BinaryOperator::Equal => compare(Ordering::is_eq),
        BinaryOperator::NotEqual => compare(Ordering::is_ne),
        BinaryOperator::LessThan => compare(Ordering::is_lt),
        BinaryOperator::LessEqual => compare(Ordering::is_le),
        BinaryOperator::GreaterThan => compare(Ordering::is_gt),
        BinaryOperator::GreaterEqual => compare(Ordering::is_ge),

        BinaryOperator::Concat => CellValue::string(to_text(left) + &to_text(right)),
    }
}

fn arithmetic(op: BinaryOperator, l: f64, r: f64) -> CellValue {
    match op {
        BinaryOperator::Add => CellValue::Number(l + r),
        BinaryOperator::Subtract => CellValue::Number(l - r),
        BinaryOperator::Multiply => CellValue::Number(l * r),
        BinaryOperator::Divide if r == 0.0 => CellValue::Error(CellError::Div0),
        BinaryOperator::Divide => CellValue::Number(l / r),
        _ => {
            let result = l.powf(r);
            if result.is_nan() || result.is_infinite() {
                CellValue::Error(CellError::Num)
            } else {
                CellValue::Number(result)
            }
        }
    }
}

// === Functions ===

/// Function implementation signature; arguments arrive evaluated
type FunctionImpl = fn(&[Value]) -> LassoResult<Value>;

struct FunctionDef {
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    implementation: FunctionImpl,
}

static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef {
        name: "sum",
        min_args: 1,
        max_args: None,
        implementation: fn_sum,
    },
    FunctionDef {
        name: "min",
        min_args: 1,
        max_args: None,
        implementation: fn_min,
    },
    FunctionDef {
        name: "max",
        min_args: 1,
        max_args: None,
        implementation: fn_max,
    },
    FunctionDef {
        name: "count",
        min_args: 1,
        max_args: None,
        implementation: fn_count,
    },
    FunctionDef {
        name: "abs",
        min_args: 1,
        max_args: Some(1),
        implementation: fn_abs,
    },
    FunctionDef {
        name: "round",
        min_args: 1,
        max_args: Some(2),
        implementation: fn_round,
    },
    FunctionDef {
        name: "len",
        min_args: 1,
        max_args: Some(1),
        implementation: fn_len,
    },
];

fn call_function(name: &str, args: &[Expr], input: &Value) -> LassoResult<Value> {
    let def = FUNCTIONS
        .iter()
        .find(|def| def.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| LassoError::Eval(format!("unknown function '{}'", name)))?;

    if args.len() < def.min_args {
        return Err(LassoError::Eval(format!(
            "{} requires at least {} arguments, got {}",
            def.name,
            def.min_args,
            args.len()
        )));
    }
    if let Some(max) = def.max_args {
        if args.len() > max {
            return Err(LassoError::Eval(format!(
                "{} accepts at most {} arguments, got {}",
                def.name,
                max,
                args.len()
            )));
        }
    }

    let values = args
        .iter()
        .map(|arg| evaluate(arg, input))
        .collect::<LassoResult<Vec<_>>>()?;
    (def.implementation)(&values)
}

/// Numbers among the argument cells; the first error cell wins
fn numbers(args: &[Value]) -> Result<Vec<f64>, CellError> {
    let mut out = Vec::new();
    for cell in args.iter().flat_map(Value::cells) {
        match cell {
            CellValue::Number(n) => out.push(*n),
            CellValue::Error(e) => return Err(*e),
            _ => {}
        }
    }
    Ok(out)
}

fn aggregate(args: &[Value], f: impl Fn(&[f64]) -> f64) -> LassoResult<Value> {
    Ok(Value::Cell(match numbers(args) {
        Ok(nums) => CellValue::Number(f(&nums)),
        Err(e) => CellValue::Error(e),
    }))
}

fn fn_sum(args: &[Value]) -> LassoResult<Value> {
    aggregate(args, |nums| nums.iter().sum())
}

fn fn_min(args: &[Value]) -> LassoResult<Value> {
    aggregate(args, |nums| nums.iter().copied().reduce(f64::min).unwrap_or(0.0))
}

fn fn_max(args: &[Value]) -> LassoResult<Value> {
    aggregate(args, |nums| nums.iter().copied().reduce(f64::max).unwrap_or(0.0))
}

fn fn_count(args: &[Value]) -> LassoResult<Value> {
    let count = args
        .iter()
        .flat_map(Value::cells)
        .filter(|cell| matches!(cell, CellValue::Number(_)))
        .count();
    Ok(Value::Cell(CellValue::Number(count as f64)))
}

fn fn_abs(args: &[Value]) -> LassoResult<Value> {
    map_cells(args[0].clone(), &|cell| numeric(cell, |n| CellValue::Number(n.abs())))
}

fn fn_round(args: &[Value]) -> LassoResult<Value> {
    let digits = match args.get(1) {
        None => 0,
        Some(Value::Cell(cell)) => match to_number(cell) {
            Some(d) if d.fract() == 0.0 && d.abs() <= 15.0 => d as i32,
            _ => {
                return Err(LassoError::Eval(format!(
                    "round digits must be a whole number, got {}",
                    cell
                )))
            }
        },
        Some(other) => {
            return Err(LassoError::Eval(format!(
                "round digits must be a number, got a {}",
                other.type_name()
            )))
        }
    };
    let factor = 10f64.powi(digits);
    map_cells(args[0].clone(), &|cell| {
        numeric(cell, |n| CellValue::Number((n * factor).round() / factor))
    })
}

fn fn_len(args: &[Value]) -> LassoResult<Value> {
    let len = match &args[0] {
        Value::List(items) => items.len(),
        Value::Map(entries) => entries.len(),
        Value::Table(table) => table.rows().len(),
        Value::Cell(CellValue::String(s)) => s.as_str().chars().count(),
        Value::Cell(CellValue::Empty) => 0,
        Value::Cell(other) => {
            return Err(LassoError::Eval(format!(
                "len of a {} is undefined",
                other.type_name()
            )))
        }
    };
    Ok(Value::Cell(CellValue::Number(len as f64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_expression;
    use crate::value::Table;
    use pretty_assertions::assert_eq;

    fn eval(text: &str, input: &Value) -> LassoResult<Value> {
        evaluate(&parse_expression(text)?, input)
    }

    fn num(n: f64) -> Value {
        Value::Cell(CellValue::Number(n))
    }

    fn grid(rows: &[&[f64]]) -> Value {
        Value::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|n| CellValue::Number(*n)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_scalar_arithmetic() {
        let none = Value::default();
        assert_eq!(eval("1 + 2 * 3", &none).unwrap(), num(7.0));
        assert_eq!(eval("2 ^ 3 ^ 2", &none).unwrap(), num(512.0));
        assert_eq!(eval("-2 ^ 2", &none).unwrap(), num(4.0));
        assert_eq!(eval("x + 1", &none).unwrap(), num(1.0));
        assert_eq!(
            eval("1 / 0", &none).unwrap(),
            Value::Cell(CellValue::Error(CellError::Div0))
        );
        assert_eq!(
            eval("(-1) ^ 0.5", &none).unwrap(),
            Value::Cell(CellValue::Error(CellError::Num))
        );
        assert_eq!(
            eval("'abc' + 1", &none).unwrap(),
            Value::Cell(CellValue::Error(CellError::Value))
        );
        assert_eq!(eval("' 4 ' * 2", &none).unwrap(), num(8.0));
    }

    #[test]
    fn test_error_propagates() {
        let input = Value::Cell(CellValue::Error(CellError::Na));
        assert_eq!(eval("x * 2", &input).unwrap(), input);
        assert_eq!(eval("x = 1", &input).unwrap(), input);
    }

    #[test]
    fn test_comparison_and_concat() {
        let none = Value::default();
        assert_eq!(
            eval("'a' = 'A'", &none).unwrap(),
            Value::Cell(CellValue::Boolean(true))
        );
        assert_eq!(
            eval("1 < 'a'", &none).unwrap(),
            Value::Cell(CellValue::Boolean(true))
        );
        assert_eq!(
            eval("x & '!'", &num(3.0)).unwrap(),
            Value::Cell(CellValue::string("3!"))
        );
        assert_eq!(
            eval("1.5 & true", &none).unwrap(),
            Value::Cell(CellValue::string("1.5TRUE"))
        );
    }

    #[test]
    fn test_broadcast() {
        let matrix = grid(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(eval("x * 2", &matrix).unwrap(), grid(&[&[2.0, 4.0], &[6.0, 8.0]]));
        assert_eq!(eval("10 - x", &matrix).unwrap(), grid(&[&[9.0, 8.0], &[7.0, 6.0]]));
        assert_eq!(eval("x + x", &matrix).unwrap(), grid(&[&[2.0, 4.0], &[6.0, 8.0]]));
        assert_eq!(eval("-x", &matrix).unwrap(), grid(&[&[-1.0, -2.0], &[-3.0, -4.0]]));
        assert_eq!(
            eval("x > 2", &matrix).unwrap(),
            Value::from_rows(vec![
                vec![CellValue::Boolean(false), CellValue::Boolean(false)],
                vec![CellValue::Boolean(true), CellValue::Boolean(true)],
            ])
        );
    }

    #[test]
    fn test_broadcast_shape_mismatch() {
        let result = broadcast(grid(&[&[1.0, 2.0]]), grid(&[&[1.0]]), &|l, r| {
            binary_scalar(BinaryOperator::Add, l, r)
        });
        assert!(matches!(result, Err(LassoError::Eval(ref msg)) if msg.contains("shape mismatch")));
    }

    #[test]
    fn test_tables_and_maps() {
        let table = Value::Table(Table::new(
            vec!["a".into()],
            vec![vec![CellValue::Number(1.0)], vec![CellValue::Number(2.0)]],
        ));
        assert_eq!(eval("x * 3", &table).unwrap(), grid(&[&[3.0], &[6.0]]));

        let map = Value::Map(vec![("k".into(), num(1.0))]);
        assert!(eval("x + 1", &map).is_err());
        assert_eq!(eval("len(x)", &map).unwrap(), num(1.0));
    }

    #[test]
    fn test_functions() {
        let matrix = grid(&[&[1.0, -2.0], &[3.0, 4.0]]);
        assert_eq!(eval("sum(x)", &matrix).unwrap(), num(6.0));
        assert_eq!(eval("SUM(x, 10)", &matrix).unwrap(), num(16.0));
        assert_eq!(eval("min(x)", &matrix).unwrap(), num(-2.0));
        assert_eq!(eval("max(x)", &matrix).unwrap(), num(4.0));
        assert_eq!(eval("count(x)", &matrix).unwrap(), num(4.0));
        assert_eq!(eval("len(x)", &matrix).unwrap(), num(2.0));
        assert_eq!(eval("abs(x)", &matrix).unwrap(), grid(&[&[1.0, 2.0], &[3.0, 4.0]]));
        assert_eq!(eval("round(2 / 3, 2)", &matrix).unwrap(), num(0.67));
        assert_eq!(eval("round(2.5)", &matrix).unwrap(), num(3.0));
        assert_eq!(eval("len('héllo')", &matrix).unwrap(), num(5.0));
        assert_eq!(eval("max('a')", &matrix).unwrap(), num(0.0));
    }

    #[test]
    fn test_function_errors() {
        let none = Value::default();
        assert!(matches!(eval("nope(1)", &none), Err(LassoError::Eval(_))));
        assert!(matches!(eval("abs(1, 2)", &none), Err(LassoError::Eval(_))));
        assert!(matches!(eval("sum()", &none), Err(LassoError::Eval(_))));
        assert!(matches!(eval("len(1)", &none), Err(LassoError::Eval(_))));
        assert!(matches!(eval("round(1, 0.5)", &none), Err(LassoError::Eval(_))));
        assert!(matches!(eval("y + 1", &none), Err(LassoError::Eval(_))));
        assert_eq!(
            eval("sum(1 / 0, 2)", &none).unwrap(),
            Value::Cell(CellValue::Error(CellError::Div0))
        );
    }
}
