//! Expression parser
//!
//! A recursive descent parser with spreadsheet operator precedence.

use super::ast::{BinaryOperator, Expr, UnaryOperator};
use crate::error::{LassoError, LassoResult};

/// Deepest nesting of parentheses, calls, and prefix or power chains
const MAX_NESTING: usize = 64;

/// Parse an `eval` expression into an AST
pub fn parse_expression(input: &str) -> LassoResult<Expr> {
    let mut parser = ExprParser::new(input);
    let expr = parser.parse_comparison()?;

    // Make sure we consumed all input
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(LassoError::Eval(format!(
            "unexpected {} after expression in {:?}",
            parser.current_token().describe(),
            input
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    String(String),
    Boolean(bool),
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,

    /// Text that starts no token
    Invalid(String),

    // End of input
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::String(s) => format!("string {:?}", s),
            Token::Boolean(b) => format!("boolean {}", b),
            Token::Identifier(name) => format!("name '{}'", name),
            Token::Invalid(text) => format!("'{}'", text),
            Token::Eof => "end of expression".to_string(),
            other => format!("{:?}", other),
        }
    }
}

struct ExprParser<'a> {
    input: &'a str,
    pos: usize,
    current_token: Option<Token>,
    depth: usize,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            current_token: None,
            depth: 0,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        self.skip_whitespace();
        self.current_token = Some(self.scan_token());
    }

    fn scan_token(&mut self) -> Token {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Token::Eof,
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '&' => Some(Token::Ampersand),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return token;
        }

        // Operators with a two-character form
        match c {
            '*' => {
                self.advance();
                if self.peek_char() == Some('*') {
                    self.advance();
                    return Token::Caret;
                }
                return Token::Star;
            }
            '=' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                }
                return Token::Equal;
            }
            '!' if self.peek_char_at(1) == Some('=') => {
                self.advance();
                self.advance();
                return Token::NotEqual;
            }
            '<' => {
                self.advance();
                return match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                };
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Token::GreaterEqual;
                }
                return Token::GreaterThan;
            }
            _ => {}
        }

        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }

        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        if c.is_alphabetic() || c == '_' {
            return self.scan_identifier();
        }

        self.advance();
        Token::Invalid(c.to_string())
    }

    fn scan_string(&mut self, quote: char) -> Token {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some(c) if c == quote => {
                    // Doubled quote escapes itself
                    if self.peek_char_at(1) == Some(quote) {
                        s.push(quote);
                        self.advance();
                        self.advance();
                    } else {
                        self.advance();
                        return Token::String(s);
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Token::Invalid(self.input[start..].to_string()),
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[start..self.pos];
        match text.parse() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Invalid(text.to_string()),
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        // true(...) would be a function call
        if self.peek_char() != Some('(') {
            if text.eq_ignore_ascii_case("true") {
                return Token::Boolean(true);
            }
            if text.eq_ignore_ascii_case("false") {
                return Token::Boolean(false);
            }
        }

        Token::Identifier(text.to_string())
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

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        self.current_token.as_ref().unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> Token {
        let token = self.current_token.take().unwrap_or(Token::Eof);
        self.advance_token();
        token
    }

    fn expect(&mut self, expected: &Token) -> LassoResult<()> {
        if self.current_token() == expected {
            self.consume();
            Ok(())
        } else {
            Err(LassoError::Eval(format!(
                "expected {}, got {}",
                expected.describe(),
                self.current_token().describe()
            )))
        }
    }

    /// Run `parse` one nesting level deeper
    fn nested(&mut self, parse: fn(&mut Self) -> LassoResult<Expr>) -> LassoResult<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(LassoError::Eval(format!(
                "expression nested deeper than {} levels at offset {}",
                MAX_NESTING,
                self.input[..self.pos].chars().count()
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^
    // 6. Unary: -
    // 7. Primary: literals, names, function calls, parentheses

    fn parse_comparison(&mut self) -> LassoResult<Expr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> LassoResult<Expr> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = Expr::BinaryOp {
                op: BinaryOperator::Concat,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> LassoResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> LassoResult<Expr> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume();
            let right = self.parse_exponent()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> LassoResult<Expr> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume();
            let right = self.nested(Self::parse_exponent)?; // Right associative
            return Ok(Expr::BinaryOp {
                op: BinaryOperator::Power,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> LassoResult<Expr> {
        if matches!(self.current_token(), Token::Minus) {
            self.consume();
            let operand = self.nested(Self::parse_unary)?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Negate,
                operand: Box::new(operand),
            });
        }

        // Prefix plus (no-op)
        if matches!(self.current_token(), Token::Plus) {
            self.consume();
            return self.nested(Self::parse_unary);
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> LassoResult<Expr> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume();
                Ok(Expr::Number(n))
            }

            Token::String(s) => {
                self.consume();
                Ok(Expr::String(s))
            }

            Token::Boolean(b) => {
                self.consume();
                Ok(Expr::Boolean(b))
            }

            Token::LeftParen => {
                self.consume();
                let expr = self.nested(Self::parse_comparison)?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::Identifier(name) => {
                self.consume();
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(Expr::Variable(name))
                }
            }

            other => Err(LassoError::Eval(format!(
                "unexpected {}",
                other.describe()
            ))),
        }
    }

    fn parse_function_call(&mut self, name: String) -> LassoResult<Expr> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();
        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.nested(Self::parse_comparison)?);
            while matches!(self.current_token(), Token::Comma) {
                self.consume();
                args.push(self.nested(Self::parse_comparison)?);
            }
        }

        self.expect(&Token::RightParen)?;
        Ok(Expr::Function { name, args })
    }
}
