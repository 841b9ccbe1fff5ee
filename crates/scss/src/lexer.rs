//! Lexer for SCSS source text.
//!
//! Converts input text into a stream of tokens, tracking the 1-based line
//! and column of every token start. Lexing is restartable: a fresh
//! [`Lexer`] over the same input always produces the same sequence.
//!
//! Malformed input (unterminated strings, comments or interpolations) is
//! reported as an `Err` item in the stream; the parser decides whether
//! that is fatal.

use nom::{
    IResult,
    branch::alt,
    character::complete::{char, digit1},
    combinator::{opt, recognize},
    sequence::pair,
};
use thiserror::Error;

/// A 1-based line/column location.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, column: 1 };

    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Kinds of tokens produced by the lexer.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// Identifier: `color`, `-moz-box`, `--custom`.
    Ident(String),
    /// Variable reference without the `$`.
    Variable(String),
    /// At-rule keyword without the `@`.
    AtKeyword(String),
    /// Numeric literal with its (possibly empty) unit.
    Number { value: f64, unit: String },
    /// `#name`: a hex color in values, an id in selectors.
    Hash(String),
    /// Quoted string, contents kept raw (escapes and `#{}` untouched).
    Str { value: String, quote: char },
    /// Unquoted `url(...)` contents.
    Url(String),
    /// Interpolation opener `#{`.
    InterpStart,
    /// `==`, `!=`, `<=`, `>=`.
    Op(&'static str),
    /// Any other single character.
    Punct(char),
    /// Run of whitespace and `//` comments.
    Whitespace { newline: bool },
    /// Block comment including its delimiters.
    Comment(String),
}

/// A token with its byte span and source positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub pos: Position,
    /// Position immediately after the last character of the token.
    pub end_pos: Position,
}

impl Token {
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace { .. } | TokenKind::Comment(_)
        )
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(s) if s.eq_ignore_ascii_case(name))
    }
}

/// Lexing failures, each carrying the position where the construct began.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unterminated string")]
    UnterminatedString(Position),

    #[error("unterminated comment")]
    UnterminatedComment(Position),

    #[error("unterminated interpolation")]
    UnterminatedInterpolation(Position),
}

impl LexError {
    pub fn position(&self) -> Position {
        match self {
            LexError::UnterminatedString(p)
            | LexError::UnterminatedComment(p)
            | LexError::UnterminatedInterpolation(p) => *p,
        }
    }
}

/// Lexer for SCSS text.
///
/// # Examples
///
/// ```
/// use scss::lexer::{Lexer, TokenKind};
///
/// let tokens: Vec<_> = Lexer::new("$a: 1px;").collect::<Result<_, _>>().unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Variable("a".into()));
/// ```
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self::with_origin(input, Position::START)
    }

    /// Create a lexer whose first character sits at `origin`. Used for
    /// text embedded in a larger document, such as interpolated strings.
    pub fn with_origin(input: &'a str, origin: Position) -> Self {
        Self {
            input,
            pos: 0,
            line: origin.line,
            column: origin.column,
            failed: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining().chars().nth(n)
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_by(&mut self, bytes: usize) {
        let target = self.pos + bytes;
        while self.pos < target {
            if self.advance().is_none() {
                break;
            }
        }
    }

    fn consume_whitespace(&mut self) -> TokenKind {
        let mut newline = false;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    newline |= c == '\n';
                    self.advance();
                }
                Some('/') if self.peek_nth(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        TokenKind::Whitespace { newline }
    }

    fn consume_comment(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let begin = self.pos;
        self.advance_by(2);
        loop {
            match self.peek() {
                Some('*') if self.peek_nth(1) == Some('/') => {
                    self.advance_by(2);
                    return Ok(TokenKind::Comment(self.input[begin..self.pos].to_string()));
                }
                Some(_) => {
                    self.advance();
                }
                None => return Err(LexError::UnterminatedComment(start)),
            }
        }
    }

    /// Skips a `#{ ... }` body, honoring nested braces and strings.
    fn skip_interpolation(&mut self) -> Result<(), LexError> {
        let start = self.here();
        self.advance_by(2);
        let mut depth = 1;
        while depth > 0 {
            match self.peek() {
                Some('{') => {
                    depth += 1;
                    self.advance();
                }
                Some('}') => {
                    depth -= 1;
                    self.advance();
                }
                Some(q @ ('"' | '\'')) => {
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('\\') => {
                                self.advance();
                            }
                            Some(c) if c == q => break,
                            Some(_) => {}
                            None => return Err(LexError::UnterminatedInterpolation(start)),
                        }
                    }
                }
                Some(_) => {
                    self.advance();
                }
                None => return Err(LexError::UnterminatedInterpolation(start)),
            }
        }
        Ok(())
    }

    fn consume_string(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let quote = self.advance().unwrap_or('"');
        let begin = self.pos;
        loop {
            match self.peek() {
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some('#') if self.peek_nth(1) == Some('{') => self.skip_interpolation()?,
                Some('\n') | None => return Err(LexError::UnterminatedString(start)),
                Some(c) if c == quote => {
                    let value = self.input[begin..self.pos].to_string();
                    self.advance();
                    return Ok(TokenKind::Str { value, quote });
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn consume_name(&mut self) -> String {
        let begin = self.pos;
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.advance();
                self.advance();
            } else if is_name_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        self.input[begin..self.pos].to_string()
    }

    fn consume_number(&mut self) -> TokenKind {
        let literal = match number_literal(self.remaining()) {
            Ok((_, literal)) => literal,
            Err(_) => "",
        };
        let value = literal.parse::<f64>().unwrap_or(0.0);
        self.advance_by(literal.len());

        let unit = if self.peek() == Some('%') {
            self.advance();
            "%".to_string()
        } else {
            let begin = self.pos;
            while let Some(c) = self.peek() {
                if c.is_ascii_alphabetic() {
                    self.advance();
                } else {
                    break;
                }
            }
            self.input[begin..self.pos].to_string()
        };
        TokenKind::Number { value, unit }
    }

    /// Attempts to read the contents of an unquoted `url(...)`, with the
    /// lexer positioned on the `(`. Returns `None` (consuming nothing) if
    /// the argument is quoted or otherwise not a raw url.
    fn try_consume_url(&mut self) -> Option<TokenKind> {
        let rest = &self.remaining()[1..];
        let trimmed = rest.trim_start();
        if trimmed.starts_with(['"', '\'', ')']) || trimmed.starts_with('$') {
            return None;
        }
        let mut depth = 0usize;
        let mut end = None;
        for (i, c) in rest.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                ')' if depth == 0 => {
                    end = Some(i);
                    break;
                }
                '(' | '"' | '\'' | '\n' if depth == 0 => return None,
                _ => {}
            }
        }
        let end = end?;
        let contents = rest[..end].trim().to_string();
        self.advance_by(end + 2);
        Some(TokenKind::Url(contents))
    }

    fn next_kind(&mut self) -> Result<TokenKind, LexError> {
        let start = self.here();
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(TokenKind::Whitespace { newline: false }),
        };
        let next = self.peek_nth(1);

        let kind = match c {
            c if c.is_whitespace() => self.consume_whitespace(),
            '/' if next == Some('/') => self.consume_whitespace(),
            '/' if next == Some('*') => self.consume_comment(start)?,
            '"' | '\'' => self.consume_string(start)?,
            '$' if next.is_some_and(is_name_start) => {
                self.advance();
                TokenKind::Variable(self.consume_name())
            }
            '@' if next.is_some_and(|n| is_name_start(n) || n == '-') => {
                self.advance();
                TokenKind::AtKeyword(self.consume_name())
            }
            '#' if next == Some('{') => {
                self.advance_by(2);
                TokenKind::InterpStart
            }
            '#' if next.is_some_and(is_name_char) => {
                self.advance();
                TokenKind::Hash(self.consume_name())
            }
            '0'..='9' => self.consume_number(),
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => self.consume_number(),
            '-' if next.is_some_and(|n| is_name_start(n) || n == '-') => {
                TokenKind::Ident(self.consume_name())
            }
            c if is_name_start(c) => {
                let name = self.consume_name();
                if name.eq_ignore_ascii_case("url") && self.peek() == Some('(') {
                    if let Some(url) = self.try_consume_url() {
                        return Ok(url);
                    }
                }
                TokenKind::Ident(name)
            }
            '=' | '!' | '<' | '>' if next == Some('=') => {
                self.advance_by(2);
                TokenKind::Op(match c {
                    '=' => "==",
                    '!' => "!=",
                    '<' => "<=",
                    _ => ">=",
                })
            }
            _ => {
                self.advance();
                TokenKind::Punct(c)
            }
        };
        Ok(kind)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.input.len() {
            return None;
        }
        let start = self.pos;
        let pos = self.here();
        match self.next_kind() {
            Ok(kind) => Some(Ok(Token {
                kind,
                start,
                end: self.pos,
                pos,
                end_pos: self.here(),
            })),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn number_literal(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
        recognize(pair(char('.'), digit1)),
    ))(input)
}

pub(crate) fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '\\' || !c.is_ascii()
}

pub(crate) fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || c == '\\' || !c.is_ascii()
}
