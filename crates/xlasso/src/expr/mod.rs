//! Expression language of the `eval` filter
//!
//! Expressions use spreadsheet operators and a handful of functions over a
//! single variable `x`, bound to the filter input. Operators broadcast over
//! lists element-wise.

mod ast;
mod evaluator;
mod parser;

pub(crate) use evaluator::evaluate;
pub(crate) use parser::parse_expression;
