//! Filters registered from outside the crate.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use xlasso::{
    default_filters, CellValue, FilterCall, FilterContext, FilterDef, FilterRegistry, LassoError,
    LassoResult, Literal, Ranger, Value,
};

use crate::{matrix_factory, numbers};

fn scaled(value: Value, factor: f64) -> Value {
    match value {
        Value::Cell(CellValue::Number(n)) => Value::Cell(CellValue::Number(n * factor)),
        Value::List(items) => Value::List(items.into_iter().map(|v| scaled(v, factor)).collect()),
        other => other,
    }
}

fn filter_scale(value: Value, call: &FilterCall, _cx: &FilterContext<'_>) -> LassoResult<Value> {
    match call.param(0, "factor") {
        Some(Literal::Number(factor)) => Ok(scaled(value, *factor)),
        other => Err(LassoError::Eval(format!("scale factor must be a number, got {:?}", other))),
    }
}

/// Name and usage are built at runtime, as a plugin would
fn scale_filter(prefix: &str) -> FilterDef {
    let name = format!("{}Scale", prefix);
    FilterDef {
        description: format!("{}(factor): multiply every number", name).into(),
        name: name.into(),
        min_args: 1,
        max_args: Some(1),
        implementation: filter_scale,
    }
}

#[test]
fn test_custom_filter_registration() {
    let factory = matrix_factory();
    let registry = Arc::new(FilterRegistry::new());
    assert!(registry.register(scale_filter("")).is_none());
    assert!(registry.contains("sCaLe"));
    assert!(registry.names().contains(&"scale".to_string()));

    let ranger = Ranger::new(&factory).with_filters(registry.clone());
    assert_eq!(
        ranger.lasso("Sheet1!A1:C1(SCALE(10))").unwrap().into_value(),
        numbers(&[&[10.0, 20.0, 30.0]])
    );
    // Built-ins stay available next to it
    assert_eq!(
        ranger.lasso("Sheet1!A1:B2(Scale(factor=2), sorted)").unwrap().into_value(),
        numbers(&[&[2.0, 4.0], &[8.0, 10.0]])
    );

    // The shared registry is untouched
    assert!(!default_filters().contains("scale"));
    match Ranger::new(&factory).lasso("Sheet1!A1(scale(2))") {
        Err(LassoError::UnknownFilter { name, .. }) => assert_eq!(name, "scale"),
        other => panic!("expected an unknown filter error, got {:?}", other),
    }
}

#[test]
fn test_empty_registry_holds_only_custom_filters() {
    let factory = matrix_factory();
    let registry = FilterRegistry::empty();
    registry.register(scale_filter("Big"));
    let ranger = Ranger::new(&factory).with_filters(Arc::new(registry));

    assert_eq!(
        ranger.lasso("Sheet1!C3(bigscale(0.5))").unwrap().into_value(),
        numbers(&[&[4.5]])
    );
    assert!(matches!(
        ranger.lasso("Sheet1!A1(identity)"),
        Err(LassoError::UnknownFilter { .. })
    ));

    // Arity is checked before the filter runs
    match ranger.lasso("Sheet1!A1(BigScale)") {
        Err(err @ LassoError::Filter { .. }) => assert!(err.to_string().contains("at least 1")),
        other => panic!("expected a filter error, got {:?}", other),
    }
}
