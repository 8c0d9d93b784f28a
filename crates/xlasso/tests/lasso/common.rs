//! Common fixtures for the end-to-end tests.

use std::sync::Arc;

use xlasso::{CellValue, SheetsFactory, Value, Workbook, Worksheet};

/// `Sheet1` holding 1..=9 in A1:C3, as the only sheet of book `matrix`
pub fn matrix_book() -> Arc<Workbook> {
    let sheet = Worksheet::from_rows("Sheet1", [[1, 2, 3], [4, 5, 6], [7, 8, 9]]).unwrap();
    Arc::new(Workbook::new("matrix").with_worksheet(sheet).unwrap())
}

pub fn matrix_factory() -> SheetsFactory {
    let factory = SheetsFactory::new();
    factory.add_backend(matrix_book());
    factory
}

/// Rows of numbers as a raw capture value
pub fn numbers(rows: &[&[f64]]) -> Value {
    Value::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|n| CellValue::Number(*n)).collect())
            .collect(),
    )
}

pub fn num(n: f64) -> Value {
    Value::Cell(CellValue::Number(n))
}
