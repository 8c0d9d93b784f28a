//! Reference string parser
//!
//! A single-pass recursive descent parser for lasso references such as
//! `[book]'My Sheet'!A1:C_(df(header=0))`. The only lookahead beyond one
//! character is the scan for a closing sheet quote and the R1C1 pattern.

use lazy_regex::regex;
use xlasso_core::{CellAddress, MAX_COLS, MAX_ROWS};

use crate::ast::{
    Axis, Coordinate, Direction, Edge, EdgeModifier, FilterCall, LassoSpec, Literal, MarginKind,
    Move, SheetSelector,
};
use crate::error::{LassoError, LassoResult};

/// Characters that never open a quoted sheet name
const RESERVED: &[char] = &[
    '^', '_', '.', '$', '[', '(', ')', ':', '!', ',', '+', '*', '-', '~',
];

/// Symbols usable in place of column letters or a row number
const SYMBOLS: &[char] = &['^', '_', '.', '~'];

/// Deepest nesting of lists and filter calls inside a filter argument
const MAX_NESTING: usize = 64;

fn is_quote_char(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace() && !RESERVED.contains(&c)
}

/// Parse a reference string into an unresolved [`LassoSpec`]
///
/// # Example
/// ```rust
/// use xlasso::{parse_reference, SheetSelector};
///
/// let spec = parse_reference("Sheet1!A1:C3(df)").unwrap();
/// assert_eq!(spec.sheet, Some(SheetSelector::Name("Sheet1".into())));
/// assert_eq!(spec.filters[0].name, "df");
/// assert_eq!(spec.to_string(), "Sheet1!A1:C3(df)");
/// ```
pub fn parse_reference(reference: &str) -> LassoResult<LassoSpec> {
    let spec = ReferenceParser::new(reference).parse()?;
    log::trace!("parsed {:?} as {}", reference, spec);
    Ok(spec)
}

/// Column or row part of an A1-style coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
enum Part<'a> {
    Letters(&'a str),
    Digits(&'a str),
    Symbol(char),
    Missing,
}

/// One half of an R1C1 coordinate
#[derive(Debug, Clone, Copy)]
enum R1C1Part {
    Relative(i64),
    Absolute(u32),
}

struct ReferenceParser<'a> {
    input: &'a str,
    pos: usize,
    /// Current literal nesting
    depth: usize,
}

impl<'a> ReferenceParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn parse(mut self) -> LassoResult<LassoSpec> {
        self.skip_whitespace();
        let book = self.parse_book()?;
        let sheet = self.parse_sheet()?;
        let (start, end) = self.parse_edges()?;
        let has_filters = self.input[self.pos..].trim_start().starts_with('(');
        if sheet.is_some() && start.is_none() && !has_filters {
            return Err(self.syntax_error(self.pos, "expected an edge after the sheet name"));
        }
        let filters = self.parse_filter_list()?;

        self.skip_whitespace();
        if !self.is_at_end() {
            return Err(self.syntax_error(
                self.pos,
                format!("unexpected characters '{}'", &self.input[self.pos..]),
            ));
        }

        Ok(LassoSpec {
            reference: self.input.to_string(),
            book,
            sheet,
            start,
            end,
            filters,
        })
    }

    // === Sheet part ===

    fn parse_book(&mut self) -> LassoResult<Option<String>> {
        if self.peek_char() != Some('[') {
            return Ok(None);
        }
        let open = self.pos;
        self.advance();

        let Some(len) = self.input[self.pos..].find(']') else {
            return Err(self.ambiguous_error(open, "unterminated workbook prefix"));
        };
        let book = &self.input[self.pos..self.pos + len];
        if book.trim().is_empty() {
            return Err(self.syntax_error(open, "empty workbook name"));
        }
        self.pos += len + 1;
        Ok(Some(book.to_string()))
    }

    fn parse_sheet(&mut self) -> LassoResult<Option<SheetSelector>> {
        let start = self.pos;
        let Some(c) = self.peek_char() else {
            return Ok(None);
        };
        if is_quote_char(c) {
            return self.parse_quoted_sheet(c).map(Some);
        }

        // The sheet ends at the first '!' that precedes any filter list
        let rest = &self.input[start..];
        let paren = rest.find('(').unwrap_or(rest.len());
        let Some(bang) = rest[..paren].find('!') else {
            return Ok(None);
        };
        let name = &rest[..bang];
        if name.is_empty() {
            return Err(self.syntax_error(start, "empty sheet name"));
        }
        self.pos = start + bang + 1;

        let selector = match name {
            "^" => SheetSelector::First,
            "_" => SheetSelector::Last,
            digits if digits.chars().all(|c| c.is_ascii_digit()) => {
                let index = digits
                    .parse()
                    .map_err(|_| self.syntax_error(start, "sheet index too large"))?;
                SheetSelector::Index(index)
            }
            name => SheetSelector::Name(name.to_string()),
        };
        Ok(Some(selector))
    }

    fn parse_quoted_sheet(&mut self, quote: char) -> LassoResult<SheetSelector> {
        let open = self.pos;
        self.advance();

        let mut name = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(self.ambiguous_error(
                        open,
                        format!("unterminated sheet name quote {}", quote),
                    ))
                }
                Some(c) if c == quote => {
                    self.advance();
                    // Doubled quote is an escaped quote
                    if self.peek_char() == Some(quote) {
                        name.push(quote);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
            }
        }

        if self.peek_char() != Some('!') {
            return Err(self.ambiguous_error(
                self.pos,
                format!("quoted sheet name {}{}{} must be followed by '!'", quote, name, quote),
            ));
        }
        self.advance();

        if name.is_empty() {
            return Err(self.syntax_error(open, "empty sheet name"));
        }
        Ok(SheetSelector::Name(name))
    }

    // === Edges ===

    fn parse_edges(&mut self) -> LassoResult<(Option<Edge>, Option<Edge>)> {
        if self.at_edges_end() {
            return Ok((None, None));
        }
        let start = self.parse_edge()?;

        if self.peek_char() != Some(':') {
            return Ok((Some(start), None));
        }
        let colon = self.pos;
        self.advance();
        if self.at_edges_end() {
            return Err(self.syntax_error(colon, "missing end edge after ':'"));
        }
        let end = self.parse_edge()?;
        Ok((Some(start), Some(end)))
    }

    fn at_edges_end(&self) -> bool {
        match self.peek_char() {
            None | Some('(') => true,
            Some(c) => c.is_whitespace(),
        }
    }

    fn parse_edge(&mut self) -> LassoResult<Edge> {
        let coord = self.parse_coordinate()?;

        let mut moves = Vec::new();
        while let Some(direction) = self.peek_char().and_then(Direction::from_char) {
            let at = self.pos;
            self.advance();
            let count = match self.scan_digits() {
                "" => 1,
                digits => digits
                    .parse()
                    .map_err(|_| self.syntax_error(at, "move count too large"))?,
            };
            moves.push(Move { direction, count });
        }

        let modifier = match self.peek_char() {
            Some('+') => Some(EdgeModifier::ExpandUntilBlank),
            Some('*') => Some(EdgeModifier::ExpandToMargin),
            _ => None,
        };
        if modifier.is_some() {
            self.advance();
        }

        Ok(Edge {
            coord,
            moves,
            modifier,
        })
    }

    fn parse_coordinate(&mut self) -> LassoResult<Coordinate> {
        let start = self.pos;

        let r1c1 = regex!(r"(?i)^R(?:\[([+-]?\d+)\]|(\d+))C(?:\[([+-]?\d+)\]|(\d+))");
        if let Some(caps) = r1c1.captures(&self.input[start..]) {
            let row = match (caps.get(1), caps.get(2)) {
                (Some(rel), _) => R1C1Part::Relative(self.parse_offset(start, rel.as_str())?),
                (None, Some(abs)) => R1C1Part::Absolute(self.parse_row(start, abs.as_str())?),
                (None, None) => return Err(self.syntax_error(start, "malformed R1C1 row")),
            };
            let col = match (caps.get(3), caps.get(4)) {
                (Some(rel), _) => R1C1Part::Relative(self.parse_offset(start, rel.as_str())?),
                (None, Some(abs)) => R1C1Part::Absolute(self.parse_col_number(start, abs.as_str())?),
                (None, None) => return Err(self.syntax_error(start, "malformed R1C1 column")),
            };
            self.pos += caps.get(0).map_or(0, |m| m.len());

            return Ok(match (row, col) {
                (R1C1Part::Relative(d_row), R1C1Part::Relative(d_col)) => {
                    Coordinate::Relative { d_row, d_col }
                }
                (R1C1Part::Absolute(row), R1C1Part::Absolute(col)) => {
                    Coordinate::Absolute(CellAddress::new(row, col as u16))
                }
                (R1C1Part::Relative(offset), R1C1Part::Absolute(col)) => {
                    Coordinate::CursorRelative {
                        axis: Axis::Row,
                        offset,
                        fixed: col,
                    }
                }
                (R1C1Part::Absolute(row), R1C1Part::Relative(offset)) => {
                    Coordinate::CursorRelative {
                        axis: Axis::Col,
                        offset,
                        fixed: row,
                    }
                }
            });
        }

        self.eat('$');
        let col_part = match self.peek_char() {
            Some(c) if SYMBOLS.contains(&c) => {
                self.advance();
                Part::Symbol(c)
            }
            Some(c) if c.is_ascii_alphabetic() => Part::Letters(self.scan_letters()),
            _ => Part::Missing,
        };
        self.eat('$');
        let row_part = match self.peek_char() {
            Some(c) if SYMBOLS.contains(&c) => {
                self.advance();
                Part::Symbol(c)
            }
            Some(c) if c.is_ascii_digit() => Part::Digits(self.scan_digits()),
            _ => Part::Missing,
        };

        let coord = match (col_part, row_part) {
            (Part::Letters(letters), Part::Digits(digits)) => Coordinate::Absolute(CellAddress::new(
                self.parse_row(start, digits)?,
                self.parse_letters(start, letters)?,
            )),
            (Part::Letters(letters), Part::Symbol(sym)) => {
                let col = self.parse_letters(start, letters)?;
                match sym {
                    '_' => Coordinate::LastRow { col },
                    '^' => Coordinate::Margin {
                        kind: MarginKind::Top,
                        fixed: Some(col as u32),
                    },
                    '~' => Coordinate::Margin {
                        kind: MarginKind::Bottom,
                        fixed: Some(col as u32),
                    },
                    _ => Coordinate::CursorRelative {
                        axis: Axis::Row,
                        offset: 0,
                        fixed: col as u32,
                    },
                }
            }
            (Part::Symbol(sym), Part::Digits(digits)) => {
                let row = self.parse_row(start, digits)?;
                match sym {
                    '_' => Coordinate::LastCol { row },
                    '^' => Coordinate::Margin {
                        kind: MarginKind::Left,
                        fixed: Some(row),
                    },
                    '~' => Coordinate::Margin {
                        kind: MarginKind::Right,
                        fixed: Some(row),
                    },
                    _ => Coordinate::CursorRelative {
                        axis: Axis::Col,
                        offset: 0,
                        fixed: row,
                    },
                }
            }
            (Part::Symbol(sym), Part::Missing) => match sym {
                '_' => Coordinate::LastCell,
                '^' => Coordinate::Margin {
                    kind: MarginKind::Top,
                    fixed: None,
                },
                '~' => Coordinate::Margin {
                    kind: MarginKind::Bottom,
                    fixed: None,
                },
                _ => Coordinate::Relative { d_row: 0, d_col: 0 },
            },
            (Part::Symbol(a), Part::Symbol(b)) => {
                return Err(self.syntax_error(
                    start,
                    format!("cannot combine '{}' and '{}' in one coordinate", a, b),
                ))
            }
            (Part::Letters(letters), Part::Missing) => {
                return Err(self.syntax_error(
                    self.pos,
                    format!("missing row after column '{}'", letters),
                ))
            }
            _ => return Err(self.syntax_error(start, "expected a cell coordinate")),
        };
        Ok(coord)
    }

    fn parse_letters(&self, at: usize, letters: &str) -> LassoResult<u16> {
        CellAddress::letters_to_column(letters)
            .map_err(|e| self.syntax_error(at, format!("bad column '{}': {}", letters, e)))
    }

    /// 1-based row number to a 0-based index
    fn parse_row(&self, at: usize, digits: &str) -> LassoResult<u32> {
        match digits.parse::<u32>() {
            Ok(0) => Err(self.syntax_error(at, "row numbers start at 1")),
            Ok(row) if row <= MAX_ROWS => Ok(row - 1),
            _ => Err(self.syntax_error(at, format!("row {} beyond the sheet limit", digits))),
        }
    }

    /// 1-based R1C1 column number to a 0-based index
    fn parse_col_number(&self, at: usize, digits: &str) -> LassoResult<u32> {
        match digits.parse::<u32>() {
            Ok(0) => Err(self.syntax_error(at, "column numbers start at 1")),
            Ok(col) if col <= MAX_COLS as u32 => Ok(col - 1),
            _ => Err(self.syntax_error(at, format!("column {} beyond the sheet limit", digits))),
        }
    }

    fn parse_offset(&self, at: usize, text: &str) -> LassoResult<i64> {
        text.trim_start_matches('+')
            .parse()
            .map_err(|_| self.syntax_error(at, format!("bad offset '{}'", text)))
    }

    // === Filters ===

    fn parse_filter_list(&mut self) -> LassoResult<Vec<FilterCall>> {
        self.skip_whitespace();
        if self.peek_char() != Some('(') {
            return Ok(Vec::new());
        }
        let open = self.pos;
        self.advance();
        self.skip_whitespace();

        let mut filters = Vec::new();
        if self.eat(')') {
            return Ok(filters);
        }
        loop {
            filters.push(self.parse_filter_call()?);
            self.skip_whitespace();
            match self.peek_char() {
                Some(',') => self.advance(),
                Some(')') => {
                    self.advance();
                    return Ok(filters);
                }
                Some(c) => {
                    return Err(self.syntax_error(
                        self.pos,
                        format!("expected ',' or ')' in filter list, found '{}'", c),
                    ))
                }
                None => return Err(self.syntax_error(open, "unterminated filter list")),
            }
        }
    }

    fn parse_filter_call(&mut self) -> LassoResult<FilterCall> {
        self.skip_whitespace();
        let at = self.pos;
        let Some(name) = self.scan_identifier() else {
            return Err(self.syntax_error(at, "expected a filter name"));
        };
        self.parse_call_arguments(name, at)
    }

    fn parse_call_arguments(&mut self, name: &str, at: usize) -> LassoResult<FilterCall> {
        let mut call = FilterCall::new(name);
        self.skip_whitespace();
        if !self.eat('(') {
            return Ok(call);
        }

        self.skip_whitespace();
        if self.eat(')') {
            return Ok(call);
        }
        loop {
            self.skip_whitespace();
            match self.parse_keyword()? {
                Some((key, value)) => call.kwargs.push((key, value)),
                None => {
                    if !call.kwargs.is_empty() {
                        return Err(self.syntax_error(
                            self.pos,
                            "positional argument after keyword argument",
                        ));
                    }
                    let value = self.parse_literal()?;
                    call.args.push(value);
                }
            }
            self.skip_whitespace();
            match self.peek_char() {
                Some(',') => self.advance(),
                Some(')') => {
                    self.advance();
                    return Ok(call);
                }
                Some(c) => {
                    return Err(self.syntax_error(
                        self.pos,
                        format!("expected ',' or ')' after argument, found '{}'", c),
                    ))
                }
                None => {
                    return Err(self.syntax_error(
                        at,
                        format!("unterminated arguments of filter '{}'", name),
                    ))
                }
            }
        }
    }

    /// `ident = literal`, or `None` with the position untouched
    fn parse_keyword(&mut self) -> LassoResult<Option<(String, Literal)>> {
        let saved = self.pos;
        if let Some(key) = self.scan_identifier() {
            self.skip_whitespace();
            if self.eat('=') {
                self.skip_whitespace();
                let value = self.parse_literal()?;
                return Ok(Some((key.to_string(), value)));
            }
        }
        self.pos = saved;
        Ok(None)
    }

    fn parse_literal(&mut self) -> LassoResult<Literal> {
        self.skip_whitespace();
        let at = self.pos;
        match self.peek_char() {
            Some(q @ ('"' | '\'')) => self.scan_string(q).map(Literal::String),
            Some('[') => self.nested(at, Self::parse_list),
            Some(c)
                if c.is_ascii_digit()
                    || ((c == '-' || c == '+' || c == '.')
                        && self
                            .peek_char_at(1)
                            .map_or(false, |n| n.is_ascii_digit() || n == '.')) =>
            {
                self.scan_number()
            }
            Some(_) => {
                let Some(ident) = self.scan_identifier() else {
                    return Err(self.syntax_error(at, "expected a literal"));
                };
                self.skip_whitespace();
                if self.peek_char() != Some('(') {
                    match ident.to_ascii_lowercase().as_str() {
                        "true" => return Ok(Literal::Bool(true)),
                        "false" => return Ok(Literal::Bool(false)),
                        "null" | "none" => return Ok(Literal::Null),
                        _ => {}
                    }
                }
                self.nested(at, |p| p.parse_call_arguments(ident, at))
                    .map(Literal::Call)
            }
            None => Err(self.syntax_error(at, "expected a literal, found end of input")),
        }
    }

    fn parse_list(&mut self) -> LassoResult<Literal> {
        let open = self.pos;
        self.advance();
        let mut items = Vec::new();

        self.skip_whitespace();
        if self.eat(']') {
            return Ok(Literal::List(items));
        }
        loop {
            items.push(self.parse_literal()?);
            self.skip_whitespace();
            match self.peek_char() {
                Some(',') => self.advance(),
                Some(']') => {
                    self.advance();
                    return Ok(Literal::List(items));
                }
                Some(c) => {
                    return Err(self.syntax_error(
                        self.pos,
                        format!("expected ',' or ']' in list, found '{}'", c),
                    ))
                }
                None => return Err(self.syntax_error(open, "unterminated list")),
            }
        }
    }

    /// Run `parse` one literal level deeper
    fn nested<T>(
        &mut self,
        at: usize,
        parse: impl FnOnce(&mut Self) -> LassoResult<T>,
    ) -> LassoResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.syntax_error(
                at,
                format!("arguments nested deeper than {} levels", MAX_NESTING),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // === Token scanning ===

    fn scan_string(&mut self, quote: char) -> LassoResult<String> {
        let open = self.pos;
        self.advance();

        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => return Err(self.syntax_error(open, "unterminated string")),
                Some(c) if c == quote => {
                    self.advance();
                    if self.peek_char() == Some(quote) {
                        s.push(quote);
                        self.advance();
                    } else {
                        return Ok(s);
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_number(&mut self) -> LassoResult<Literal> {
        let start = self.pos;

        if matches!(self.peek_char(), Some('+' | '-')) {
            self.advance();
        }
        self.scan_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.scan_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.advance();
            }
            self.scan_digits();
        }

        let text = &self.input[start..self.pos];
        text.parse()
            .map(Literal::Number)
            .map_err(|_| self.syntax_error(start, format!("bad number '{}'", text)))
    }

    fn scan_identifier(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek_char() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.advance(),
            _ => return None,
        }
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            self.advance();
        }
        Some(&self.input[start..self.pos])
    }

    fn scan_letters(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek_char().map_or(false, |c| c.is_ascii_alphabetic()) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn scan_digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Character offset of byte position `pos`
    fn offset(&self, pos: usize) -> usize {
        self.input[..pos].chars().count()
    }

    fn syntax_error<M: Into<String>>(&self, pos: usize, message: M) -> LassoError {
        LassoError::Syntax {
            reference: self.input.to_string(),
            offset: self.offset(pos),
            message: message.into(),
        }
    }

    fn ambiguous_error<M: Into<String>>(&self, pos: usize, message: M) -> LassoError {
        LassoError::AmbiguousReference {
            reference: self.input.to_string(),
            offset: self.offset(pos),
            message: message.into(),
        }
    }
}
