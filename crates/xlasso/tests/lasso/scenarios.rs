//! Reference scenarios from parse to filtered value.

use pretty_assertions::assert_eq;
use xlasso::{
    lasso, CellValue, LassoError, Ranger, RangerOptions, SheetsFactory, Value, Workbook, Worksheet,
};

use crate::{matrix_book, matrix_factory, num, numbers};

#[test]
fn test_matrix_capture() {
    let factory = matrix_factory();
    let lasso = Ranger::new(&factory).lasso("Sheet1!A1:C3").unwrap();

    let matrix = numbers(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]);
    assert_eq!(Value::from_rows(lasso.values().to_vec()), matrix);
    assert_eq!(lasso.value(), &matrix);
    assert_eq!(lasso.rect().to_string(), "A1:C3");
    assert_eq!(lasso.spec().to_string(), "Sheet1!A1:C3");
}

#[test]
fn test_single_cell_df() {
    let sheet = Worksheet::from_rows("Sheet1", [[42]]).unwrap();
    let factory = SheetsFactory::new().with_backend(Workbook::new("one").with_worksheet(sheet).unwrap());

    match lasso("Sheet1!A1(df)", &factory).unwrap() {
        Value::Table(table) => {
            assert_eq!(table.shape(), (1, 1));
            assert_eq!(table.get(0, "0"), Some(&CellValue::Number(42.0)));
        }
        other => panic!("expected a table, got {:?}", other),
    }
}

#[test]
fn test_last_cell_is_used_region() {
    let mut sheet = Worksheet::new("Sheet1");
    sheet.set_cell_value("B2", 1).unwrap();
    sheet.set_cell_value("D5", 2).unwrap();
    let factory = SheetsFactory::new().with_backend(Workbook::new("sparse").with_worksheet(sheet).unwrap());
    let ranger = Ranger::new(&factory);

    ranger.lasso("Sheet1!A1").unwrap();
    assert_eq!(ranger.lasso("_").unwrap().rect().to_string(), "B2:D5");
    assert_eq!(ranger.lasso("").unwrap().rect().to_string(), "B2:D5");
}

#[test]
fn test_missing_end_edge_is_syntax_error() {
    let factory = matrix_factory();
    match lasso("Sheet1!A1:", &factory) {
        Err(LassoError::Syntax { offset, .. }) => assert_eq!(offset, 9),
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_unknown_filter() {
    let factory = matrix_factory();
    assert!(matches!(
        lasso("Sheet1!A1:C3(bogus)", &factory),
        Err(LassoError::UnknownFilter { ref name, .. }) if name == "bogus"
    ));
}

#[test]
fn test_expansion_modifiers() {
    let mut sheet = Worksheet::new("Sheet1");
    for (row, col) in [(1, 1), (1, 2), (2, 1), (2, 2), (3, 2)] {
        sheet.set_cell_value_at(row, col, 1).unwrap();
    }
    sheet.set_cell_value("F8", "far").unwrap();
    let factory = SheetsFactory::new().with_backend(Workbook::new("blocks").with_worksheet(sheet).unwrap());
    let ranger = Ranger::new(&factory);

    // Grows down and right through the block, stops at the blank row/column
    assert_eq!(ranger.lasso("Sheet1!B2+").unwrap().rect().to_string(), "B2:C4");
    // Margin of a sheet without hard bounds is its data end
    assert_eq!(ranger.lasso("Sheet1!B2:C2*").unwrap().rect().to_string(), "B2:F8");
    assert_eq!(ranger.lasso("Sheet1!C3*:D3").unwrap().rect().to_string(), "A1:D3");
}

#[test]
fn test_moves_and_cursor() {
    let factory = matrix_factory();
    let ranger = Ranger::new(&factory);
    // End edge is relative to the resolved start
    assert_eq!(ranger.lasso("Sheet1!A1D:R[1]C[2]").unwrap().rect().to_string(), "A2:C3");
    assert_eq!(ranger.lasso("Sheet1!^:_").unwrap().rect().to_string(), "A1:C3");
    assert_eq!(ranger.lasso("Sheet1!B_").unwrap().value(), &numbers(&[&[8.0]]));
}

#[test]
fn test_filter_pipeline() {
    let factory = matrix_factory();
    assert_eq!(
        lasso("Sheet1!A1:C1(eval('x * 2'), redim(row=1))", &factory).unwrap(),
        Value::List(vec![num(2.0), num(4.0), num(6.0)])
    );
    assert_eq!(
        lasso("Sheet1!A1:C3(redim(table=1), sorted(reverse=true), eval('sum(x)'))", &factory)
            .unwrap(),
        num(45.0)
    );
    assert_eq!(
        lasso("Sheet1!A1:B3(pipe(sorted(true), dict))", &factory).unwrap(),
        Value::Map(vec![
            ("7".to_string(), num(8.0)),
            ("4".to_string(), num(5.0)),
            ("1".to_string(), num(2.0)),
        ])
    );
}

#[test]
fn test_lax_mode_keeps_going() {
    let factory = matrix_factory();
    let ranger = Ranger::new(&factory).with_options(RangerOptions::default().with_lax(true));
    let lasso = ranger.lasso("Sheet1!A1:C1(dict, eval('x + 1'))").unwrap();
    assert_eq!(lasso.value(), &numbers(&[&[2.0, 3.0, 4.0]]));
}

#[test]
fn test_sheet_selectors() {
    let first = Worksheet::from_rows("First", [["a"]]).unwrap();
    let second = Worksheet::from_rows("Second Sheet", [["b"]]).unwrap();
    let book = Workbook::new("book.xlsx")
        .with_worksheet(first)
        .unwrap()
        .with_worksheet(second)
        .unwrap();
    let factory = SheetsFactory::new().with_backend(book);
    factory.add_backend(matrix_book());

    let text = |reference: &str| lasso(reference, &factory).unwrap().to_string();
    assert_eq!(text("^!A1"), "[[\"a\"]]");
    assert_eq!(text("_!A1"), "[[\"b\"]]");
    assert_eq!(text("1!A1"), "[[\"b\"]]");
    assert_eq!(text("'Second Sheet'!A1"), "[[\"b\"]]");
    assert_eq!(text("[matrix]Sheet1!C3"), "[[9]]");
    assert_eq!(text("[matrix]A1"), "[[1]]");
}

#[cfg(feature = "csv")]
#[test]
fn test_csv_backend() {
    use xlasso::CsvOptions;

    let data = "name,age\nann,31\nbob,42\n";
    let sheet = Worksheet::from_csv_reader("People", data.as_bytes(), &CsvOptions::default()).unwrap();
    let factory = SheetsFactory::new().with_backend(Workbook::new("people.csv").with_worksheet(sheet).unwrap());

    match lasso("People!A1:B_(df(header=0))", &factory).unwrap() {
        Value::Table(table) => {
            assert_eq!(table.columns(), &["name".to_string(), "age".to_string()]);
            assert_eq!(
                table.column("age"),
                Some(vec![&CellValue::Number(31.0), &CellValue::Number(42.0)])
            );
        }
        other => panic!("expected a table, got {:?}", other),
    }
}
