//! Property-based tests for edge resolution and the canonical form.

use proptest::prelude::*;
use xlasso::{
    parse_reference, Axis, CellAddress, Coordinate, Direction, Edge, EdgeModifier, EdgeResolver,
    FilterCall, LassoContext, LassoSpec, Literal, MarginKind, Move, Ranger, ResolvedRect,
    SheetSelector, SheetsFactory, Sides, Workbook, Worksheet,
};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(128),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn address() -> impl Strategy<Value = CellAddress> {
    (0u32..5000, 0u16..1000).prop_map(|(row, col)| CellAddress::new(row, col))
}

/// Addresses close to the origin, for lassos that read their cells
fn near_address() -> impl Strategy<Value = CellAddress> {
    (0u32..200, 0u16..60).prop_map(|(row, col)| CellAddress::new(row, col))
}

fn coordinate() -> impl Strategy<Value = Coordinate> {
    let plain = prop_oneof![
        address().prop_map(Coordinate::Absolute),
        (-50i64..50, -50i64..50).prop_map(|(d_row, d_col)| Coordinate::Relative { d_row, d_col }),
        (0u16..1000).prop_map(|col| Coordinate::LastRow { col }),
        (0u32..5000).prop_map(|row| Coordinate::LastCol { row }),
        Just(Coordinate::LastCell),
        (-20i64..20, 0u32..1000).prop_map(|(offset, fixed)| Coordinate::CursorRelative {
            axis: Axis::Row,
            offset,
            fixed,
        }),
        (-20i64..20, 0u32..5000).prop_map(|(offset, fixed)| Coordinate::CursorRelative {
            axis: Axis::Col,
            offset,
            fixed,
        }),
    ];
    let margins = prop_oneof![
        (0u32..1000).prop_map(|col| Coordinate::Margin {
            kind: MarginKind::Top,
            fixed: Some(col),
        }),
        (0u32..5000).prop_map(|row| Coordinate::Margin {
            kind: MarginKind::Left,
            fixed: Some(row),
        }),
        (0u32..1000).prop_map(|col| Coordinate::Margin {
            kind: MarginKind::Bottom,
            fixed: Some(col),
        }),
        (0u32..5000).prop_map(|row| Coordinate::Margin {
            kind: MarginKind::Right,
            fixed: Some(row),
        }),
        Just(Coordinate::Margin {
            kind: MarginKind::Top,
            fixed: None,
        }),
        Just(Coordinate::Margin {
            kind: MarginKind::Bottom,
            fixed: None,
        }),
    ];
    prop_oneof![3 => plain, 1 => margins]
}

fn edge() -> impl Strategy<Value = Edge> {
    let direction = prop_oneof![
        Just(Direction::Up),
        Just(Direction::Down),
        Just(Direction::Left),
        Just(Direction::Right),
    ];
    let moves = prop::collection::vec(
        (direction, 1u32..5).prop_map(|(direction, count)| Move { direction, count }),
        0..3,
    );
    let modifier = prop_oneof![
        Just(None),
        Just(Some(EdgeModifier::ExpandUntilBlank)),
        Just(Some(EdgeModifier::ExpandToMargin)),
    ];
    (coordinate(), moves, modifier).prop_map(|(coord, moves, modifier)| Edge {
        coord,
        moves,
        modifier,
    })
}

fn literal() -> impl Strategy<Value = Literal> {
    prop_oneof![
        Just(Literal::Null),
        any::<bool>().prop_map(Literal::Bool),
        (-1000i32..1000).prop_map(|n| Literal::Number(n as f64 / 4.0)),
        "[a-z ]{0,6}".prop_map(Literal::String),
        Just(Literal::Call(FilterCall::new("trim"))),
    ]
}

fn filter_call() -> impl Strategy<Value = FilterCall> {
    let name = prop_oneof![Just("df"), Just("sorted"), Just("redim"), Just("my_filter")];
    let key = prop_oneof![Just("header"), Just("reverse"), Just("expr")];
    (
        name,
        prop::collection::vec(literal(), 0..3),
        prop::collection::vec((key, literal()), 0..2),
    )
        .prop_map(|(name, args, kwargs)| FilterCall {
            name: name.to_string(),
            args,
            kwargs: kwargs
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        })
}

fn sheet_selector() -> impl Strategy<Value = Option<SheetSelector>> {
    prop_oneof![
        Just(None),
        "[A-Za-z][A-Za-z0-9_]{0,8}".prop_map(|name| Some(SheetSelector::Name(name))),
        "[A-Za-z][A-Za-z0-9 .'-]{0,8}".prop_map(|name| Some(SheetSelector::Name(name))),
        (0usize..20).prop_map(|i| Some(SheetSelector::Index(i))),
        Just(Some(SheetSelector::First)),
        Just(Some(SheetSelector::Last)),
    ]
}

fn spec() -> impl Strategy<Value = LassoSpec> {
    (
        prop::option::of("[a-z]{1,6}(\\.xlsx)?"),
        sheet_selector(),
        edge(),
        prop::option::of(edge()),
        prop::collection::vec(filter_call(), 0..3),
    )
        .prop_map(|(book, sheet, start, end, filters)| LassoSpec {
            reference: String::new(),
            book,
            sheet,
            start: Some(start),
            end,
            filters,
        })
}

/// A sheet with data at the given cells
fn sparse_sheet(cells: &[(u32, u16)]) -> Worksheet {
    let mut sheet = Worksheet::new("Sheet1");
    for &(row, col) in cells {
        sheet.set_cell_value_at(row, col, 1).unwrap();
    }
    sheet
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn absolute_pairs_ignore_cursor(a in near_address(), b in near_address(), cursor in address()) {
        let factory = SheetsFactory::new()
            .with_backend(Workbook::new("book").with_worksheet(Worksheet::new("Sheet1")).unwrap());
        let ranger = Ranger::new(&factory);
        let context = LassoContext::new().with_cursor(cursor);

        let reference = format!("Sheet1!{}:{}", a, b);
        let rect = ranger.resolve_lasso(&reference, &context).unwrap().rect();
        prop_assert_eq!(rect, ResolvedRect::from_corners(a, b));
        prop_assert!(rect.row_start < rect.row_end && rect.col_start < rect.col_end);

        // Reversed edges capture the same rectangle
        let reversed = format!("Sheet1!{}:{}", b, a);
        prop_assert_eq!(ranger.resolve_lasso(&reversed, &LassoContext::new()).unwrap().rect(), rect);
    }

    #[test]
    fn expansion_is_idempotent(
        cells in prop::collection::vec((0u32..12, 0u16..12), 0..40),
        origin in (0u32..12, 0u16..12),
        sides in (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()),
        margin in any::<bool>(),
    ) {
        let sheet = sparse_sheet(&cells);
        let resolver = EdgeResolver::new(&sheet, "prop");
        let sides = Sides { top: sides.0, left: sides.1, bottom: sides.2, right: sides.3 };
        let modifier = if margin { EdgeModifier::ExpandToMargin } else { EdgeModifier::ExpandUntilBlank };

        let start = ResolvedRect::single(CellAddress::new(origin.0, origin.1));
        let once = resolver.expand(start, modifier, sides).unwrap();
        let twice = resolver.expand(once, modifier, sides).unwrap();
        prop_assert_eq!(once, twice);

        // Never shrinks
        prop_assert!(once.row_start <= start.row_start && once.col_start <= start.col_start);
        prop_assert!(once.row_end >= start.row_end && once.col_end >= start.col_end);
    }

    #[test]
    fn canonical_form_round_trips(spec in spec()) {
        let text = spec.to_string();
        let parsed = parse_reference(&text).unwrap();
        prop_assert_eq!(&parsed.reference, &text);
        prop_assert_eq!(parsed, LassoSpec { reference: text.clone(), ..spec });
    }
}
