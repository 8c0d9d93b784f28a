//! `eval` filter

use super::FilterContext;
use crate::ast::FilterCall;
use crate::error::{LassoError, LassoResult};
use crate::expr::{evaluate, parse_expression};
use crate::value::Value;

pub(super) fn filter_eval(value: Value, call: &FilterCall, _cx: &FilterContext<'_>) -> LassoResult<Value> {
    let source = call
        .param(0, "expr")
        .and_then(|lit| lit.as_str())
        .ok_or_else(|| LassoError::argument("eval", "expression must be a string"))?;

    let expr = parse_expression(source)?;
    log::trace!("eval {:?} parsed as {:?}", source, expr);
    evaluate(&expr, &value)
}
