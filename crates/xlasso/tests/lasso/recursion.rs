//! Nested lassoing through `recurse` and the sheet cache under threads.

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use xlasso::{CellValue, LassoError, Ranger, RangerOptions, SheetsFactory, Workbook, Worksheet};

use crate::{matrix_book, numbers};

/// `Chain!A1` refers to A2, A2 to A3 and so on; the last link holds 42.
/// Lassoing `Chain!A1(recurse)` nests `links - 1` resolutions.
fn chain(links: u32) -> SheetsFactory {
    let mut sheet = Worksheet::new("Chain");
    for row in 0..links - 1 {
        sheet
            .set_cell_value_at(row, 0, format!("A{}(recurse)", row + 2))
            .unwrap();
    }
    sheet.set_cell_value_at(links - 1, 0, 42).unwrap();
    SheetsFactory::new().with_backend(Workbook::new("chain").with_worksheet(sheet).unwrap())
}

#[test]
fn test_recursion_bound() {
    for limit in [0usize, 1, 3, 8] {
        let options = RangerOptions::default().with_max_depth(limit);

        // `limit` nested resolutions fit
        let factory = chain(limit as u32 + 1);
        let ranger = Ranger::new(&factory).with_options(options.clone());
        let lasso = ranger.lasso("Chain!A1(recurse)").unwrap();
        assert_eq!(lasso.value().cells(), vec![&CellValue::Number(42.0)]);

        // One more does not
        let factory = chain(limit as u32 + 2);
        let ranger = Ranger::new(&factory).with_options(options);
        match ranger.lasso("Chain!A1(recurse)") {
            Err(err @ LassoError::RecursionLimit { .. }) => {
                assert_eq!(err.root_reference(), Some("Chain!A1(recurse)"));
                if let LassoError::RecursionLimit { depth, limit: max, via, .. } = err {
                    assert_eq!((depth, max), (limit + 1, limit));
                    // Every enclosing recurse names the reference it was resolving
                    assert_eq!(via.len(), limit + 1);
                    assert_eq!(via.get(1).map(String::as_str), (limit > 0).then_some("A2(recurse)"));
                }
            }
            other => panic!("limit {}: expected a recursion error, got {:?}", limit, other),
        }
    }
}

#[test]
fn test_recursion_error_survives_lax_mode() {
    let factory = chain(4);
    let ranger = Ranger::new(&factory)
        .with_options(RangerOptions::default().with_max_depth(1).with_lax(true));
    assert!(matches!(
        ranger.lasso("Chain!A1(recurse)"),
        Err(LassoError::RecursionLimit { .. })
    ));
}

#[test]
fn test_sheets_open_once_across_threads() {
    let book = matrix_book();
    let factory = SheetsFactory::new();
    factory.add_backend(book.clone());

    thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let ranger = Ranger::new(&factory);
                for _ in 0..10 {
                    let lasso = ranger.lasso("Sheet1!A1:B2").unwrap();
                    assert_eq!(lasso.value(), &numbers(&[&[1.0, 2.0], &[4.0, 5.0]]));
                }
            });
        }
    });

    assert_eq!(book.open_count(), 1);
    assert_eq!(factory.cached_count(), 1);
}

#[test]
fn test_replacing_a_backend_drops_its_sheets() {
    let factory = SheetsFactory::new();
    factory.add_backend(matrix_book());
    assert_eq!(
        Ranger::new(&factory).lasso("[matrix]Sheet1!A1").unwrap().value(),
        &numbers(&[&[1.0]])
    );

    let replacement = Worksheet::from_rows("Sheet1", [[100]]).unwrap();
    factory.add_backend(Arc::new(Workbook::new("matrix").with_worksheet(replacement).unwrap()));
    assert_eq!(
        Ranger::new(&factory).lasso("[matrix]Sheet1!A1").unwrap().value(),
        &numbers(&[&[100.0]])
    );
}
