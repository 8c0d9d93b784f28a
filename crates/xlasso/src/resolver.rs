//! Edge resolution
//!
//! Turns the symbolic edges of a [`LassoSpec`](crate::LassoSpec) into an
//! absolute [`ResolvedRect`] against a [`Sheet`]'s reported bounds.

use std::fmt;
use std::ops::Range;

use xlasso_core::{CellAddress, CellRange, Sheet};

use crate::ast::{Axis, Coordinate, Edge, EdgeModifier, MarginKind};
use crate::error::{LassoError, LassoResult};

/// A half-open rectangle of sheet cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResolvedRect {
    pub row_start: u32,
    pub row_end: u32,
    pub col_start: u16,
    pub col_end: u16,
}

impl ResolvedRect {
    /// The rectangle spanned by two corners, in any order
    pub fn from_corners(a: CellAddress, b: CellAddress) -> Self {
        Self {
            row_start: a.row.min(b.row),
            row_end: a.row.max(b.row) + 1,
            col_start: a.col.min(b.col),
            col_end: a.col.max(b.col) + 1,
        }
    }

    pub fn single(cell: CellAddress) -> Self {
        Self::from_corners(cell, cell)
    }

    pub fn from_range(range: CellRange) -> Self {
        Self::from_corners(range.start, range.end)
    }

    /// A rectangle holding no cells
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.row_start >= self.row_end || self.col_start >= self.col_end
    }

    pub fn height(&self) -> usize {
        self.row_end.saturating_sub(self.row_start) as usize
    }

    pub fn width(&self) -> usize {
        self.col_end.saturating_sub(self.col_start) as usize
    }

    pub fn rows(&self) -> Range<u32> {
        self.row_start..self.row_end
    }

    pub fn cols(&self) -> Range<u16> {
        self.col_start..self.col_end
    }

    pub fn top_left(&self) -> CellAddress {
        CellAddress::new(self.row_start, self.col_start)
    }

    /// Inclusive cell range, `None` when empty
    pub fn to_range(&self) -> Option<CellRange> {
        if self.is_empty() {
            return None;
        }
        Some(CellRange::new(
            self.top_left(),
            CellAddress::new(self.row_end - 1, self.col_end - 1),
        ))
    }
}

impl fmt::Display for ResolvedRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_range() {
            Some(range) => write!(f, "{}", range),
            None => write!(f, "(empty)"),
        }
    }
}

/// Which sides of a rectangle an expansion may move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sides {
    pub top: bool,
    pub left: bool,
    pub bottom: bool,
    pub right: bool,
}

impl Sides {
    pub const NONE: Sides = Sides {
        top: false,
        left: false,
        bottom: false,
        right: false,
    };
    pub const ALL: Sides = Sides {
        top: true,
        left: true,
        bottom: true,
        right: true,
    };
    pub const TOP_LEFT: Sides = Sides {
        top: true,
        left: true,
        bottom: false,
        right: false,
    };
    pub const BOTTOM_RIGHT: Sides = Sides {
        top: false,
        left: false,
        bottom: true,
        right: true,
    };

    fn union(self, other: Sides) -> Sides {
        Sides {
            top: self.top || other.top,
            left: self.left || other.left,
            bottom: self.bottom || other.bottom,
            right: self.right || other.right,
        }
    }

    fn any(self) -> bool {
        self.top || self.left || self.bottom || self.right
    }
}

/// Resolves coordinates and edges against one sheet
pub struct EdgeResolver<'a> {
    sheet: &'a dyn Sheet,
    reference: &'a str,
}

impl<'a> EdgeResolver<'a> {
    /// `reference` is only used in error messages
    pub fn new(sheet: &'a dyn Sheet, reference: &'a str) -> Self {
        Self { sheet, reference }
    }

    /// The rectangle covering every non-empty cell; empty for a blank sheet
    pub fn used_region(&self) -> ResolvedRect {
        self.sheet
            .bounds()
            .map(ResolvedRect::from_range)
            .unwrap_or_else(ResolvedRect::empty)
    }

    /// Last row index the bottom margin snaps to
    fn max_row(&self) -> u32 {
        match (self.sheet.hard_bounds(), self.sheet.bounds()) {
            (Some(last), _) => last.row,
            (None, Some(data)) => data.end.row,
            (None, None) => 0,
        }
    }

    /// Last column index the right margin snaps to
    fn max_col(&self) -> u16 {
        match (self.sheet.hard_bounds(), self.sheet.bounds()) {
            (Some(last), _) => last.col,
            (None, Some(data)) => data.end.col,
            (None, None) => 0,
        }
    }

    /// Resolve one coordinate relative to `cursor`
    pub fn resolve(&self, coord: &Coordinate, cursor: CellAddress) -> LassoResult<CellAddress> {
        let data_end = self
            .sheet
            .bounds()
            .map_or(CellAddress::ORIGIN, |range| range.end);

        let cell = match *coord {
            Coordinate::Absolute(cell) => Some(cell),
            Coordinate::Relative { d_row, d_col } => cursor.offset(d_row, d_col),
            Coordinate::LastRow { col } => Some(CellAddress::new(data_end.row, col)),
            Coordinate::LastCol { row } => Some(CellAddress::new(row, data_end.col)),
            Coordinate::LastCell => Some(data_end),
            Coordinate::CursorRelative {
                axis: Axis::Row,
                offset,
                fixed,
            } => CellAddress::new(cursor.row, fixed as u16).offset(offset, 0),
            Coordinate::CursorRelative {
                axis: Axis::Col,
                offset,
                fixed,
            } => CellAddress::new(fixed, cursor.col).offset(0, offset),
            Coordinate::Margin { kind, fixed } => Some(self.resolve_margin(kind, fixed)),
        };

        let cell = cell.ok_or_else(|| {
            self.out_of_bounds(format!("{} from cursor {} leaves the sheet", coord, cursor))
        })?;
        self.check_hard_bounds(cell)?;
        Ok(cell)
    }

    fn resolve_margin(&self, kind: MarginKind, fixed: Option<u32>) -> CellAddress {
        match (kind, fixed) {
            (MarginKind::Top, Some(col)) => CellAddress::new(0, col as u16),
            (MarginKind::Left, Some(row)) => CellAddress::new(row, 0),
            (MarginKind::Bottom, Some(col)) => CellAddress::new(self.max_row(), col as u16),
            (MarginKind::Right, Some(row)) => CellAddress::new(row, self.max_col()),
            (MarginKind::Top | MarginKind::Left, None) => CellAddress::ORIGIN,
            (MarginKind::Bottom | MarginKind::Right, None) => {
                CellAddress::new(self.max_row(), self.max_col())
            }
        }
    }

    /// Resolve an edge's coordinate, then apply its moves in order
    pub fn resolve_edge(&self, edge: &Edge, cursor: CellAddress) -> LassoResult<CellAddress> {
        let mut cell = self.resolve(&edge.coord, cursor)?;
        for mv in &edge.moves {
            let (d_row, d_col) = mv.direction.delta();
            let count = mv.count as i64;
            cell = cell.offset(d_row * count, d_col * count).ok_or_else(|| {
                self.out_of_bounds(format!(
                    "moving {:?} by {} from {} leaves the sheet",
                    mv.direction, mv.count, cell
                ))
            })?;
        }
        self.check_hard_bounds(cell)?;
        Ok(cell)
    }

    /// Resolve both edges into a rectangle and apply their modifiers
    pub fn resolve_rect(
        &self,
        start: Option<&Edge>,
        end: Option<&Edge>,
        cursor: CellAddress,
    ) -> LassoResult<ResolvedRect> {
        let mut to_margin = Sides::NONE;
        let mut until_blank = Sides::NONE;
        let mut grow = |modifier: Option<EdgeModifier>, sides: Sides| match modifier {
            Some(EdgeModifier::ExpandToMargin) => to_margin = to_margin.union(sides),
            Some(EdgeModifier::ExpandUntilBlank) => until_blank = until_blank.union(sides),
            None => {}
        };

        let rect = match (start, end) {
            (None, None) => self.used_region(),
            (Some(edge), None) | (None, Some(edge)) if edge.is_bare_last_cell() => {
                grow(edge.modifier, Sides::ALL);
                self.used_region()
            }
            (Some(edge), None) | (None, Some(edge)) => {
                grow(edge.modifier, Sides::ALL);
                ResolvedRect::single(self.resolve_edge(edge, cursor)?)
            }
            (Some(start), Some(end)) => {
                let a = self.resolve_edge(start, cursor)?;
                let b = self.resolve_edge(end, a)?;
                grow(start.modifier, Sides::TOP_LEFT);
                grow(end.modifier, Sides::BOTTOM_RIGHT);
                ResolvedRect::from_corners(a, b)
            }
        };

        let rect = self.expand(rect, EdgeModifier::ExpandToMargin, to_margin)?;
        self.expand(rect, EdgeModifier::ExpandUntilBlank, until_blank)
    }

    /// Grow `rect` on `sides` according to `modifier`; never shrinks
    pub fn expand(
        &self,
        rect: ResolvedRect,
        modifier: EdgeModifier,
        sides: Sides,
    ) -> LassoResult<ResolvedRect> {
        if rect.is_empty() || !sides.any() {
            return Ok(rect);
        }
        let expanded = match modifier {
            EdgeModifier::ExpandToMargin => self.expand_to_margin(rect, sides),
            EdgeModifier::ExpandUntilBlank => self.expand_until_blank(rect, sides)?,
        };
        if expanded != rect {
            log::trace!("expanded {} to {} ({:?})", rect, expanded, modifier);
        }
        Ok(expanded)
    }

    fn expand_to_margin(&self, mut rect: ResolvedRect, sides: Sides) -> ResolvedRect {
        if sides.top {
            rect.row_start = 0;
        }
        if sides.left {
            rect.col_start = 0;
        }
        if sides.bottom {
            rect.row_end = rect.row_end.max(self.max_row() + 1);
        }
        if sides.right {
            rect.col_end = rect.col_end.max(self.max_col() + 1);
        }
        rect
    }

    fn expand_until_blank(&self, mut rect: ResolvedRect, sides: Sides) -> LassoResult<ResolvedRect> {
        let Some(data) = self.sheet.bounds() else {
            return Ok(rect);
        };

        loop {
            let mut grew = false;

            if sides.top
                && rect.row_start > data.start.row
                && !self.is_blank(rect.row_start - 1..rect.row_start, rect.cols())?
            {
                rect.row_start -= 1;
                grew = true;
            }
            if sides.bottom
                && rect.row_end <= data.end.row
                && !self.is_blank(rect.row_end..rect.row_end + 1, rect.cols())?
            {
                rect.row_end += 1;
                grew = true;
            }
            if sides.left
                && rect.col_start > data.start.col
                && !self.is_blank(rect.rows(), rect.col_start - 1..rect.col_start)?
            {
                rect.col_start -= 1;
                grew = true;
            }
            if sides.right
                && rect.col_end <= data.end.col
                && !self.is_blank(rect.rows(), rect.col_end..rect.col_end + 1)?
            {
                rect.col_end += 1;
                grew = true;
            }

            if !grew {
                return Ok(rect);
            }
            log::trace!("expanding to {}", rect);
        }
    }

    fn is_blank(&self, rows: Range<u32>, cols: Range<u16>) -> LassoResult<bool> {
        self.sheet
            .is_blank(rows, cols)
            .map_err(|source| LassoError::Backend {
                reference: self.reference.to_string(),
                source,
            })
    }

    fn check_hard_bounds(&self, cell: CellAddress) -> LassoResult<()> {
        match self.sheet.hard_bounds() {
            Some(last) if cell.row > last.row || cell.col > last.col => Err(self.out_of_bounds(
                format!("{} is beyond the last cell {} of the sheet", cell, last),
            )),
            _ => Ok(()),
        }
    }

    fn out_of_bounds(&self, message: String) -> LassoError {
        LassoError::OutOfBounds {
            reference: self.reference.to_string(),
            message,
        }
    }
}
