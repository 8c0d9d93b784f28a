//! Parsed, unresolved form of a reference string
//!
//! A [`LassoSpec`] records everything the grammar can express; nothing in
//! here has looked at a sheet yet. `Display` re-serializes each node to the
//! canonical text accepted by [`parse_reference`](crate::parse_reference).

use std::fmt;

use xlasso_core::CellAddress;

/// The axis a cursor-anchored coordinate borrows from the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Row,
    Col,
}

/// Which sheet margin a coordinate snaps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarginKind {
    Top,
    Left,
    Bottom,
    Right,
}

/// A single cell address, absolute or symbolic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coordinate {
    /// Fixed cell
    Absolute(CellAddress),
    /// Signed offsets from the cursor
    Relative { d_row: i64, d_col: i64 },
    /// Last row holding data, at a fixed column
    LastRow { col: u16 },
    /// Last column holding data, at a fixed row
    LastCol { row: u32 },
    /// Last row and last column holding data
    LastCell,
    /// `axis` is taken from the cursor plus `offset`; the other axis is `fixed`
    CursorRelative { axis: Axis, offset: i64, fixed: u32 },
    /// The axis named by `kind` snaps to a margin; the other axis is `fixed`
    /// when given, otherwise the margin of the same side
    Margin { kind: MarginKind, fixed: Option<u32> },
}

/// Direction of an edge move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub(crate) fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'U' => Some(Direction::Up),
            'D' => Some(Direction::Down),
            'L' => Some(Direction::Left),
            'R' => Some(Direction::Right),
            _ => None,
        }
    }

    /// Row and column step for one move
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    fn letter(self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }
}

/// A fixed-step movement applied after the coordinate resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub direction: Direction,
    pub count: u32,
}

/// Growth applied to the rectangle once both edges are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeModifier {
    /// `+`: grow while the adjacent line holds data
    ExpandUntilBlank,
    /// `*`: grow to the sheet margin
    ExpandToMargin,
}

/// One corner of the captured rectangle
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub coord: Coordinate,
    pub moves: Vec<Move>,
    pub modifier: Option<EdgeModifier>,
}

impl Edge {
    /// An edge with no moves or modifier
    pub fn new(coord: Coordinate) -> Self {
        Self {
            coord,
            moves: Vec::new(),
            modifier: None,
        }
    }

    /// Whether this is `_` alone
    pub(crate) fn is_bare_last_cell(&self) -> bool {
        self.coord == Coordinate::LastCell && self.moves.is_empty()
    }
}

/// Picks a sheet inside a workbook
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SheetSelector {
    Name(String),
    /// Zero-based position
    Index(usize),
    /// `^`
    First,
    /// `_`
    Last,
}

/// A literal argument of a filter call
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Literal>),
    Call(FilterCall),
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// Non-negative whole number
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Literal::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 => {
                Some(*n as usize)
            }
            _ => None,
        }
    }
}

/// A named filter with its arguments, e.g. `df(header=0)`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Literal>,
    pub kwargs: Vec<(String, Literal)>,
}

impl FilterCall {
    /// A call without arguments
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }
    }

    pub fn arg(&self, index: usize) -> Option<&Literal> {
        self.args.get(index)
    }

    /// Keyword argument, matched case-insensitively
    pub fn kwarg(&self, name: &str) -> Option<&Literal> {
        self.kwargs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Keyword argument `name`, falling back to positional `index`
    pub fn param(&self, index: usize, name: &str) -> Option<&Literal> {
        self.kwarg(name).or_else(|| self.arg(index))
    }
}

/// A parsed reference
#[derive(Debug, Clone, PartialEq)]
pub struct LassoSpec {
    /// The text this reference was parsed from
    pub reference: String,
    /// `[book]` prefix
    pub book: Option<String>,
    pub sheet: Option<SheetSelector>,
    pub start: Option<Edge>,
    pub end: Option<Edge>,
    pub filters: Vec<FilterCall>,
}

// === Canonical serialization ===

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = |col: u32| CellAddress::column_to_letters(col as u16);
        match *self {
            Coordinate::Absolute(addr) => write!(f, "{}", addr),
            Coordinate::Relative { d_row: 0, d_col: 0 } => write!(f, "."),
            Coordinate::Relative { d_row, d_col } => write!(f, "R[{}]C[{}]", d_row, d_col),
            Coordinate::LastRow { col } => write!(f, "{}_", letters(col as u32)),
            Coordinate::LastCol { row } => write!(f, "_{}", row + 1),
            Coordinate::LastCell => write!(f, "_"),
            Coordinate::CursorRelative {
                axis: Axis::Row,
                offset: 0,
                fixed,
            } => write!(f, "{}.", letters(fixed)),
            Coordinate::CursorRelative {
                axis: Axis::Col,
                offset: 0,
                fixed,
            } => write!(f, ".{}", fixed + 1),
            Coordinate::CursorRelative {
                axis: Axis::Row,
                offset,
                fixed,
            } => write!(f, "R[{}]C{}", offset, fixed + 1),
            Coordinate::CursorRelative {
                axis: Axis::Col,
                offset,
                fixed,
            } => write!(f, "R{}C[{}]", fixed + 1, offset),
            Coordinate::Margin { kind, fixed } => match (kind, fixed) {
                (MarginKind::Top, Some(col)) => write!(f, "{}^", letters(col)),
                (MarginKind::Left, Some(row)) => write!(f, "^{}", row + 1),
                (MarginKind::Top | MarginKind::Left, None) => write!(f, "^"),
                (MarginKind::Bottom, Some(col)) => write!(f, "{}~", letters(col)),
                (MarginKind::Right, Some(row)) => write!(f, "~{}", row + 1),
                (MarginKind::Bottom | MarginKind::Right, None) => write!(f, "~"),
            },
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coord)?;
        for mv in &self.moves {
            write!(f, "{}", mv.direction.letter())?;
            if mv.count != 1 {
                write!(f, "{}", mv.count)?;
            }
        }
        match self.modifier {
            Some(EdgeModifier::ExpandUntilBlank) => write!(f, "+"),
            Some(EdgeModifier::ExpandToMargin) => write!(f, "*"),
            None => Ok(()),
        }
    }
}

/// Names that must be quoted to survive a re-parse
fn needs_quotes(name: &str) -> bool {
    name.is_empty()
        || name == "^"
        || name == "_"
        || name.chars().all(|c| c.is_ascii_digit())
        || !name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Name(name) if needs_quotes(name) => {
                write!(f, "'{}'", name.replace('\'', "''"))
            }
            SheetSelector::Name(name) => write!(f, "{}", name),
            SheetSelector::Index(index) => write!(f, "{}", index),
            SheetSelector::First => write!(f, "^"),
            SheetSelector::Last => write!(f, "_"),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Literal::List(items) => {
                write!(f, "[")?;
                write_joined(f, items)?;
                write!(f, "]")
            }
            Literal::Call(call) => write!(f, "{}", call),
        }
    }
}

impl fmt::Display for FilterCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.args.is_empty() && self.kwargs.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        write_joined(f, &self.args)?;
        for (i, (key, value)) in self.kwargs.iter().enumerate() {
            if i > 0 || !self.args.is_empty() {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for LassoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(book) = &self.book {
            write!(f, "[{}]", book)?;
        }
        if let Some(sheet) = &self.sheet {
            write!(f, "{}!", sheet)?;
        }
        if let Some(start) = &self.start {
            write!(f, "{}", start)?;
        }
        if let Some(end) = &self.end {
            write!(f, ":{}", end)?;
        }
        if !self.filters.is_empty() {
            write!(f, "(")?;
            write_joined(f, &self.filters)?;
            write!(f, ")")?;
        }
        Ok(())
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
