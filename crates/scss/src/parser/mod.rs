//! Recursive-descent parser from tokens to a [`Stylesheet`].
//!
//! The parser works on the full token vector of one source document.
//! Selectors, at-rule preludes and property names are kept as raw
//! [`Interpolation`]s: their structure is only known after `#{...}` has
//! been evaluated. Expressions are parsed into [`Expr`] trees with the
//! usual precedence:
//!
//! ```text
//! comma list > space list > or > and > == != > < <= > >= > + - > * / % > unary
//! ```
//!
//! Indented (Sass) sources are first rewritten to brace syntax by
//! [`indented::to_scss`], which keeps line numbers intact.

pub mod indented;

use std::rc::Rc;

use crate::ast::{
    AssignFlags, BinaryOp, CallArgs, CallableDecl, ControlDirective, Expr, ImportTarget,
    Interpolation, MessageKind, Param, Stmt, StmtKind, Stylesheet, UnaryOp,
};
use crate::error::{CompileError, Result, ScssError};
use crate::lexer::{Lexer, Position, Token, TokenKind};
use crate::value::{Color, ListSeparator, Number, Value};

/// Functions whose arguments are plain CSS and are kept verbatim.
const RAW_FUNCTIONS: &[&str] = &[
    "calc",
    "-webkit-calc",
    "-moz-calc",
    "var",
    "env",
    "expression",
    "element",
];

/// Parses `source` as SCSS, or as indented Sass when `indented` is set.
/// `file` is only used in error messages.
pub fn parse(source: &str, file: &str, indented: bool) -> Result<Stylesheet> {
    if indented {
        let converted = indented::to_scss(source);
        Parser::new(&converted, file, Position::START)?.parse_stylesheet()
    } else {
        Parser::new(source, file, Position::START)?.parse_stylesheet()
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    file: Rc<str>,
    /// Identifiers that end a space-separated list (`through`, `to`).
    stop_idents: &'static [&'static str],
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, file: &str, origin: Position) -> Result<Self> {
        let tokens = Lexer::with_origin(source, origin)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| {
                let text = match &err {
                    crate::lexer::LexError::UnterminatedString(_) => {
                        "Invalid CSS: unterminated string, expected closing quote"
                    }
                    crate::lexer::LexError::UnterminatedComment(_) => {
                        "Invalid CSS: unterminated comment, expected \"*/\""
                    }
                    crate::lexer::LexError::UnterminatedInterpolation(_) => {
                        "Invalid CSS: unterminated interpolation, expected \"}\""
                    }
                };
                ScssError::Syntax(CompileError::new(err.position(), file, text))
            })?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            file: Rc::from(file),
            stop_idents: &[],
        })
    }

    // ---- token navigation -------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) {
        while self.peek().is_some_and(Token::is_trivia) {
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_kind(), Some(TokenKind::Whitespace { .. })) {
            self.pos += 1;
        }
    }

    /// Index of the next significant token at or after `from`.
    fn sig_index(&self, from: usize) -> usize {
        let mut i = from;
        while self.tokens.get(i).is_some_and(Token::is_trivia) {
            i += 1;
        }
        i
    }

    fn peek_sig(&self) -> Option<&Token> {
        self.tokens.get(self.sig_index(self.pos))
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek_sig().is_some_and(|t| t.is_punct(c))
    }

    fn at_ident(&self, name: &str) -> bool {
        self.peek_sig().is_some_and(|t| t.is_ident(name))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.at_punct(c) {
            self.skip_trivia();
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn preceded_by_whitespace(&self, index: usize) -> bool {
        index > 0
            && self
                .tokens
                .get(index - 1)
                .is_some_and(|t| matches!(t.kind, TokenKind::Whitespace { .. }))
    }

    fn followed_by_whitespace(&self, index: usize) -> bool {
        self.tokens
            .get(index + 1)
            .is_some_and(|t| matches!(t.kind, TokenKind::Whitespace { .. }))
    }

    fn token_text(&self, token: &Token) -> &'a str {
        &self.source[token.start..token.end]
    }

    fn current_pos(&self) -> Position {
        match self.peek_sig() {
            Some(t) => t.pos,
            None => self.eof_pos(),
        }
    }

    // ---- errors ----------------------------------------------------------

    /// Position of the last character of the last significant token.
    fn eof_pos(&self) -> Position {
        self.tokens
            .iter()
            .rev()
            .find(|t| !t.is_trivia())
            .map(|t| Position::new(t.end_pos.line, t.end_pos.column.saturating_sub(1).max(1)))
            .unwrap_or(Position::START)
    }

    /// Up to 20 characters of the current line preceding byte `offset`.
    fn snippet_before(&self, offset: usize) -> String {
        let before = &self.source[..offset.min(self.source.len())];
        let line = before.rsplit('\n').next().unwrap_or("").trim();
        let chars: Vec<char> = line.chars().collect();
        let start = chars.len().saturating_sub(20);
        chars[start..].iter().collect()
    }

    fn expected(&self, what: &str) -> ScssError {
        let index = self.sig_index(self.pos);
        let (pos, offset, was) = match self.tokens.get(index) {
            Some(t) => (t.pos, t.start, self.token_text(t).to_string()),
            None => (self.eof_pos(), self.source.len(), String::new()),
        };
        let text = format!(
            "Invalid CSS after \"{}\": expected {}, was \"{}\"",
            self.snippet_before(offset),
            what,
            was
        );
        ScssError::Syntax(CompileError::new(pos, &*self.file, text))
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.expected(&format!("\"{c}\"")))
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        self.skip_trivia();
        match self.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.expected("identifier")),
        }
    }

    fn expect_variable(&mut self) -> Result<String> {
        self.skip_trivia();
        match self.peek_kind() {
            Some(TokenKind::Variable(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.expected("variable (e.g. $foo)")),
        }
    }

    /// Consumes a statement terminator: `;`, or nothing before `}`/EOF.
    fn end_statement(&mut self) -> Result<()> {
        if self.eat_punct(';') || self.at_punct('}') || self.peek_sig().is_none() {
            Ok(())
        } else {
            Err(self.expected("\";\""))
        }
    }

    // ---- statements ------------------------------------------------------

    fn parse_stylesheet(mut self) -> Result<Stylesheet> {
        let stmts = self.parse_statements(true)?;
        Ok(Stylesheet { stmts })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect_punct('{')?;
        self.parse_statements(false)
    }

    /// Parses statements until the closing `}` (consumed) or, at the top
    /// level, the end of input.
    fn parse_statements(&mut self, top_level: bool) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(token) = self.peek().cloned() else {
                if top_level {
                    return Ok(stmts);
                }
                return Err(self.expected("\"}\""));
            };
            match &token.kind {
                TokenKind::Comment(text) => {
                    self.pos += 1;
                    stmts.push(Stmt::new(StmtKind::Comment(text.clone()), token.pos));
                }
                TokenKind::Punct('}') => {
                    if top_level {
                        return Err(self.expected("selector or at-rule"));
                    }
                    self.pos += 1;
                    return Ok(stmts);
                }
                TokenKind::Punct(';') => self.pos += 1,
                TokenKind::AtKeyword(name) => {
                    self.pos += 1;
                    let stmt = self.parse_at_rule(name, token.pos)?;
                    stmts.push(stmt);
                }
                TokenKind::Variable(name) if self.tokens_after_is_colon(self.pos + 1) => {
                    self.pos += 1;
                    let stmt = self.parse_variable_assignment(name.clone(), token.pos)?;
                    stmts.push(stmt);
                }
                _ if self.looks_like_declaration() => {
                    stmts.push(self.parse_declaration()?);
                }
                _ => stmts.push(self.parse_rule()?),
            }
        }
    }

    fn tokens_after_is_colon(&self, from: usize) -> bool {
        self.tokens
            .get(self.sig_index(from))
            .is_some_and(|t| t.is_punct(':'))
    }

    /// Decides between `name: value` and `selector { ... }`.
    fn looks_like_declaration(&self) -> bool {
        let mut i = self.pos;
        let mut name = String::new();
        loop {
            match self.tokens.get(i).map(|t| &t.kind) {
                Some(TokenKind::Ident(s)) => {
                    name.push_str(s);
                    i += 1;
                }
                Some(TokenKind::Punct('-')) | Some(TokenKind::Punct('*')) if !name.is_empty() || i == self.pos => {
                    name.push('-');
                    i += 1;
                }
                Some(TokenKind::InterpStart) => {
                    name.push('#');
                    let mut depth = 1;
                    i += 1;
                    while depth > 0 {
                        match self.tokens.get(i).map(|t| &t.kind) {
                            Some(TokenKind::InterpStart) | Some(TokenKind::Punct('{')) => depth += 1,
                            Some(TokenKind::Punct('}')) => depth -= 1,
                            None => return false,
                            _ => {}
                        }
                        i += 1;
                    }
                }
                _ => break,
            }
        }
        if name.is_empty() {
            return false;
        }
        i = self.sig_index(i);
        if !self.tokens.get(i).is_some_and(|t| t.is_punct(':')) {
            return false;
        }
        i += 1;
        if name.starts_with("--") {
            return true;
        }
        match self.tokens.get(i) {
            Some(t) if t.is_trivia() || t.is_punct('{') => return true,
            None => return true,
            _ => {}
        }
        let mut interp = 0usize;
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(i) {
            match &token.kind {
                TokenKind::InterpStart => interp += 1,
                TokenKind::Punct('(') | TokenKind::Punct('[') => depth += 1,
                TokenKind::Punct(')') | TokenKind::Punct(']') => depth = depth.saturating_sub(1),
                TokenKind::Punct('{') if interp > 0 => interp += 1,
                TokenKind::Punct('}') if interp > 0 => interp -= 1,
                TokenKind::Punct('{') if depth == 0 => return false,
                TokenKind::Punct(';') | TokenKind::Punct('}') if depth == 0 => return true,
                _ => {}
            }
            i += 1;
        }
        true
    }

    fn parse_variable_assignment(&mut self, name: String, pos: Position) -> Result<Stmt> {
        self.expect_punct(':')?;
        let value = self.parse_expression()?;
        let mut flags = AssignFlags::empty();
        while self.at_punct('!') {
            let index = self.sig_index(self.pos);
            match self.tokens.get(index + 1).map(|t| &t.kind) {
                Some(TokenKind::Ident(flag)) if flag.eq_ignore_ascii_case("default") => {
                    flags |= AssignFlags::DEFAULT
                }
                Some(TokenKind::Ident(flag)) if flag.eq_ignore_ascii_case("global") => {
                    flags |= AssignFlags::GLOBAL
                }
                _ => return Err(self.expected("\";\"")),
            }
            self.pos = index + 2;
        }
        self.end_statement()?;
        Ok(Stmt::new(
            StmtKind::VariableAssignment { name, value, flags },
            pos,
        ))
    }

    fn parse_declaration(&mut self) -> Result<Stmt> {
        self.skip_trivia();
        let pos = self.current_pos();
        let mut property = self.raw_interpolation(false, |t| t.is_punct(':'))?;
        property.trim_end();
        self.expect_punct(':')?;

        let is_custom = property
            .parts
            .first()
            .is_some_and(|p| matches!(p, crate::ast::InterpPart::Text(t) if t.starts_with("--")));
        if is_custom {
            self.skip_trivia();
            let mut text = self.raw_interpolation(false, |t| t.is_punct(';') || t.is_punct('}'))?;
            text.trim_end();
            self.end_statement()?;
            return Ok(Stmt::new(
                StmtKind::Declaration {
                    property,
                    value: Some(Expr::String { text, quoted: false }),
                    important: false,
                    nested: Vec::new(),
                },
                pos,
            ));
        }

        let value = if self.at_punct('{') {
            None
        } else {
            Some(self.parse_expression()?)
        };

        let mut important = false;
        if self.at_punct('!') {
            let index = self.sig_index(self.pos);
            if self
                .tokens
                .get(index + 1)
                .is_some_and(|t| t.is_ident("important"))
            {
                important = true;
                self.pos = index + 2;
            } else {
                return Err(self.expected("\";\""));
            }
        }

        let nested = if self.at_punct('{') {
            self.parse_block()?
        } else {
            if value.is_none() {
                return Err(self.expected("expression (e.g. 1px, bold)"));
            }
            self.end_statement()?;
            Vec::new()
        };

        Ok(Stmt::new(
            StmtKind::Declaration {
                property,
                value,
                important,
                nested,
            },
            pos,
        ))
    }

    fn parse_rule(&mut self) -> Result<Stmt> {
        self.skip_trivia();
        let pos = self.current_pos();
        let mut selector = self.raw_interpolation(false, |t| {
            t.is_punct('{') || t.is_punct(';') || t.is_punct('}')
        })?;
        selector.trim_end();
        if selector.is_empty() || !self.at_punct('{') {
            return Err(self.expected("\"{\""));
        }
        let body = self.parse_block()?;
        Ok(Stmt::new(StmtKind::RuleBlock { selector, body }, pos))
    }

    /// Collects source text up to a depth-0 token matching `stop`,
    /// evaluating `#{...}` (and, with `variables`, bare `$vars`).
    fn raw_interpolation(
        &mut self,
        variables: bool,
        stop: impl Fn(&Token) -> bool,
    ) -> Result<Interpolation> {
        let mut interp = Interpolation::new();
        let mut depth = 0usize;
        while let Some(token) = self.peek().cloned() {
            if depth == 0 && stop(&token) {
                break;
            }
            match &token.kind {
                TokenKind::InterpStart => {
                    self.pos += 1;
                    let expr = self.parse_interpolation_body()?;
                    interp.push_expr(expr);
                    continue;
                }
                TokenKind::Variable(name) if variables => {
                    interp.push_expr(Expr::Variable {
                        name: name.clone(),
                        pos: token.pos,
                    });
                }
                TokenKind::Str { value, quote } => {
                    let inner = self.string_interpolation(value, token.pos)?;
                    interp.push_text(&quote.to_string());
                    for part in inner.parts {
                        match part {
                            crate::ast::InterpPart::Text(t) => interp.push_text(&t),
                            crate::ast::InterpPart::Expr(e) => interp.push_expr(e),
                        }
                    }
                    interp.push_text(&quote.to_string());
                }
                TokenKind::Whitespace { .. } => {
                    if !interp.is_empty() {
                        interp.push_text(" ");
                    }
                }
                TokenKind::Comment(_) => {}
                TokenKind::Punct('(') | TokenKind::Punct('[') => {
                    depth += 1;
                    interp.push_text(self.token_text(&token));
                }
                TokenKind::Punct(')') | TokenKind::Punct(']') => {
                    depth = depth.saturating_sub(1);
                    interp.push_text(self.token_text(&token));
                }
                _ => interp.push_text(self.token_text(&token)),
            }
            self.pos += 1;
        }
        Ok(collapse_spaces(interp))
    }

    /// Parses `expr }` after a consumed `#{`.
    fn parse_interpolation_body(&mut self) -> Result<Expr> {
        let saved = std::mem::replace(&mut self.stop_idents, &[]);
        let expr = self.parse_expression();
        self.stop_idents = saved;
        let expr = expr?;
        self.expect_punct('}')?;
        Ok(expr)
    }

    fn parse_at_rule(&mut self, name: &str, pos: Position) -> Result<Stmt> {
        let lower = name.to_ascii_lowercase();
        let kind = match lower.as_str() {
            "import" => self.parse_import()?,
            "mixin" => StmtKind::MixinDef(Rc::new(self.parse_callable(pos)?)),
            "function" => StmtKind::FunctionDef(Rc::new(self.parse_callable(pos)?)),
            "include" => self.parse_include()?,
            "content" => {
                if self.at_punct('(') {
                    self.parse_call_args()?;
                }
                self.end_statement()?;
                StmtKind::Content
            }
            "return" => {
                let value = self.parse_expression()?;
                self.end_statement()?;
                StmtKind::Return(value)
            }
            "if" => StmtKind::Control(self.parse_if()?),
            "else" => return Err(self.expected("@if before @else")),
            "each" => StmtKind::Control(self.parse_each()?),
            "for" => StmtKind::Control(self.parse_for()?),
            "while" => {
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                StmtKind::Control(ControlDirective::While { condition, body })
            }
            "warn" | "debug" | "error" => {
                let kind = match lower.as_str() {
                    "warn" => MessageKind::Warn,
                    "debug" => MessageKind::Debug,
                    _ => MessageKind::Error,
                };
                let value = self.parse_expression()?;
                self.end_statement()?;
                StmtKind::Message { kind, value }
            }
            "extend" | "at-root" | "use" | "forward" => {
                self.raw_interpolation(false, |t| {
                    t.is_punct(';') || t.is_punct('{') || t.is_punct('}')
                })?;
                if self.at_punct('{') {
                    self.parse_block()?;
                } else {
                    self.end_statement()?;
                }
                StmtKind::Unsupported(lower)
            }
            "media" => {
                self.skip_trivia();
                let mut query =
                    self.raw_interpolation(true, |t| t.is_punct('{') || t.is_punct(';'))?;
                query.trim_end();
                let body = self.parse_block()?;
                StmtKind::Media { query, body }
            }
            _ => {
                self.skip_trivia();
                let mut params = self.raw_interpolation(false, |t| {
                    t.is_punct('{') || t.is_punct(';') || t.is_punct('}')
                })?;
                params.trim_end();
                let body = if self.at_punct('{') {
                    Some(self.parse_block()?)
                } else {
                    self.end_statement()?;
                    None
                };
                StmtKind::AtRule {
                    name: name.to_string(),
                    params,
                    body,
                }
            }
        };
        Ok(Stmt::new(kind, pos))
    }

    fn parse_import(&mut self) -> Result<StmtKind> {
        let mut targets = Vec::new();
        loop {
            self.skip_trivia();
            let Some(token) = self.peek().cloned() else {
                return Err(self.expected("file to import (string or url())"));
            };
            let next = self.tokens.get(self.sig_index(self.pos + 1));
            let simple_end = next.is_none_or(|t| t.is_punct(',') || t.is_punct(';') || t.is_punct('}'));
            match &token.kind {
                TokenKind::Str { value, .. } if simple_end && !value.contains("#{") => {
                    self.pos += 1;
                    targets.push(ImportTarget::Stylesheet {
                        reference: value.clone(),
                        pos: token.pos,
                    });
                }
                _ => {
                    let mut text = self.raw_interpolation(false, |t| {
                        t.is_punct(';') || t.is_punct('}')
                    })?;
                    text.trim_end();
                    targets.push(ImportTarget::Css(text));
                    break;
                }
            }
            if !self.eat_punct(',') {
                break;
            }
        }
        self.end_statement()?;
        Ok(StmtKind::Import(targets))
    }

    fn parse_callable(&mut self, pos: Position) -> Result<CallableDecl> {
        let name = self.expect_ident()?;
        let mut params = Vec::new();
        let mut rest = None;
        if self.eat_punct('(') {
            loop {
                if self.eat_punct(')') {
                    break;
                }
                let param = self.expect_variable()?;
                if self.at_splat() {
                    self.eat_splat();
                    rest = Some(param);
                    self.expect_punct(')')?;
                    break;
                }
                let default = if self.eat_punct(':') {
                    Some(self.parse_space_list()?)
                } else {
                    None
                };
                params.push(Param {
                    name: param,
                    default,
                });
                if !self.eat_punct(',') {
                    self.expect_punct(')')?;
                    break;
                }
            }
        }
        let body = self.parse_block()?;
        Ok(CallableDecl {
            name,
            params,
            rest,
            body,
            file: self.file.clone(),
            pos,
        })
    }

    fn parse_include(&mut self) -> Result<StmtKind> {
        let name = self.expect_ident()?;
        let args = if self.peek_sig().is_some_and(|t| t.is_punct('(')) {
            self.skip_trivia();
            self.pos += 1;
            self.parse_call_args()?
        } else {
            CallArgs::default()
        };
        let content = if self.at_punct('{') {
            Some(Rc::new(self.parse_block()?))
        } else {
            self.end_statement()?;
            None
        };
        Ok(StmtKind::Include {
            name,
            args,
            content,
        })
    }

    fn parse_if(&mut self) -> Result<ControlDirective> {
        let mut clauses = Vec::new();
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        clauses.push((condition, body));
        let mut otherwise = None;
        loop {
            let index = self.sig_index(self.pos);
            let is_else = matches!(
                self.tokens.get(index).map(|t| &t.kind),
                Some(TokenKind::AtKeyword(k)) if k.eq_ignore_ascii_case("else") || k.eq_ignore_ascii_case("elseif")
            );
            if !is_else {
                break;
            }
            let else_if = matches!(
                self.tokens.get(index).map(|t| &t.kind),
                Some(TokenKind::AtKeyword(k)) if k.eq_ignore_ascii_case("elseif")
            );
            self.pos = index + 1;
            if else_if || self.at_ident("if") {
                if !else_if {
                    self.skip_trivia();
                    self.pos += 1;
                }
                let condition = self.parse_expression()?;
                let body = self.parse_block()?;
                clauses.push((condition, body));
            } else {
                otherwise = Some(self.parse_block()?);
                break;
            }
        }
        Ok(ControlDirective::If { clauses, otherwise })
    }

    fn parse_each(&mut self) -> Result<ControlDirective> {
        let mut vars = vec![self.expect_variable()?];
        while self.eat_punct(',') {
            vars.push(self.expect_variable()?);
        }
        if !self.at_ident("in") {
            return Err(self.expected("\"in\""));
        }
        self.skip_trivia();
        self.pos += 1;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(ControlDirective::Each {
            vars,
            iterable,
            body,
        })
    }

    fn parse_for(&mut self) -> Result<ControlDirective> {
        let var = self.expect_variable()?;
        if !self.at_ident("from") {
            return Err(self.expected("\"from\""));
        }
        self.skip_trivia();
        self.pos += 1;
        let saved = std::mem::replace(&mut self.stop_idents, &["through", "to"]);
        let from = self.parse_expression();
        self.stop_idents = saved;
        let from = from?;
        let inclusive = if self.at_ident("through") {
            true
        } else if self.at_ident("to") {
            false
        } else {
            return Err(self.expected("\"through\" or \"to\""));
        };
        self.skip_trivia();
        self.pos += 1;
        let to = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(ControlDirective::For {
            var,
            from,
            to,
            inclusive,
            body,
        })
    }

    // ---- expressions -----------------------------------------------------

    fn at_expression_end(&self) -> bool {
        match self.peek_sig() {
            None => true,
            Some(token) => match &token.kind {
                TokenKind::Punct(c) => matches!(c, ',' | ';' | ')' | ']' | '}' | '{' | ':' | '!' | '.'),
                TokenKind::Ident(name) => self
                    .stop_idents
                    .iter()
                    .any(|stop| name.eq_ignore_ascii_case(stop)),
                _ => false,
            },
        }
    }

    fn at_splat(&self) -> bool {
        let i = self.sig_index(self.pos);
        (0..3).all(|k| self.tokens.get(i + k).is_some_and(|t| t.is_punct('.')))
    }

    fn eat_splat(&mut self) {
        self.pos = self.sig_index(self.pos) + 3;
    }

    /// Full expression: a comma-separated list of space lists.
    fn parse_expression(&mut self) -> Result<Expr> {
        let first = self.parse_space_list()?;
        if !self.at_punct(',') {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(',') {
            if self.at_expression_end() {
                break;
            }
            items.push(self.parse_space_list()?);
        }
        Ok(Expr::List {
            items,
            separator: ListSeparator::Comma,
            bracketed: false,
        })
    }

    fn parse_space_list(&mut self) -> Result<Expr> {
        if self.at_expression_end() {
            return Err(self.expected("expression (e.g. 1px, bold)"));
        }
        let first = self.parse_or()?;
        let mut items = vec![first];
        while !self.at_expression_end() && !self.at_splat() {
            items.push(self.parse_or()?);
        }
        if items.len() == 1 {
            return Ok(items.remove(0));
        }
        Ok(Expr::List {
            items,
            separator: ListSeparator::Space,
            bracketed: false,
        })
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.at_ident("or") {
            let pos = self.current_pos();
            self.skip_trivia();
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs, pos);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_equality()?;
        while self.at_ident("and") {
            let pos = self.current_pos();
            self.skip_trivia();
            self.pos += 1;
            let rhs = self.parse_equality()?;
            lhs = binary(BinaryOp::And, lhs, rhs, pos);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek_sig().map(|t| &t.kind) {
                Some(TokenKind::Op("==")) => BinaryOp::Eq,
                Some(TokenKind::Op("!=")) => BinaryOp::Ne,
                _ => return Ok(lhs),
            };
            let pos = self.current_pos();
            self.skip_trivia();
            self.pos += 1;
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs, pos);
        }
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_sig().map(|t| &t.kind) {
                Some(TokenKind::Punct('<')) => BinaryOp::Lt,
                Some(TokenKind::Punct('>')) => BinaryOp::Gt,
                Some(TokenKind::Op("<=")) => BinaryOp::Le,
                Some(TokenKind::Op(">=")) => BinaryOp::Ge,
                _ => return Ok(lhs),
            };
            let pos = self.current_pos();
            self.skip_trivia();
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs, pos);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let index = self.sig_index(self.pos);
            let op = match self.tokens.get(index).map(|t| &t.kind) {
                Some(TokenKind::Punct('+')) => BinaryOp::Add,
                Some(TokenKind::Punct('-')) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            // `1px -2px` is a two-element list, not a subtraction.
            if self.preceded_by_whitespace(index) && !self.followed_by_whitespace(index) {
                return Ok(lhs);
            }
            let pos = self.tokens[index].pos;
            self.pos = index + 1;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs, pos);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_sig().map(|t| &t.kind) {
                Some(TokenKind::Punct('*')) => BinaryOp::Mul,
                Some(TokenKind::Punct('/')) => BinaryOp::Div,
                Some(TokenKind::Punct('%')) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            let pos = self.current_pos();
            self.skip_trivia();
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs, pos);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.skip_trivia();
        let Some(token) = self.peek().cloned() else {
            return Err(self.expected("expression (e.g. 1px, bold)"));
        };
        let op = match &token.kind {
            TokenKind::Punct('-') => UnaryOp::Neg,
            TokenKind::Punct('+') => UnaryOp::Plus,
            TokenKind::Ident(name) if name.eq_ignore_ascii_case("not") => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            pos: token.pos,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.skip_trivia();
        let Some(token) = self.peek().cloned() else {
            return Err(self.expected("expression (e.g. 1px, bold)"));
        };
        match &token.kind {
            TokenKind::Number { value, unit } => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Number(Number::with_unit(*value, unit))))
            }
            TokenKind::Hash(name) => {
                self.pos += 1;
                match Color::from_hex(name) {
                    Some(color) => Ok(Expr::Literal(Value::Color(color))),
                    None => Ok(Expr::String {
                        text: Interpolation::plain(format!("#{name}")),
                        quoted: false,
                    }),
                }
            }
            TokenKind::Str { value, .. } => {
                self.pos += 1;
                let text = self.string_interpolation(value, token.pos)?;
                Ok(Expr::String { text, quoted: true })
            }
            TokenKind::Url(contents) => {
                self.pos += 1;
                let inner = self.text_interpolation(contents, Position::new(token.pos.line, token.pos.column + 4))?;
                let mut text = Interpolation::plain("url(");
                for part in inner.parts {
                    match part {
                        crate::ast::InterpPart::Text(t) => text.push_text(&t),
                        crate::ast::InterpPart::Expr(e) => text.push_expr(e),
                    }
                }
                text.push_text(")");
                Ok(Expr::String { text, quoted: false })
            }
            TokenKind::Variable(name) => {
                self.pos += 1;
                Ok(Expr::Variable {
                    name: name.clone(),
                    pos: token.pos,
                })
            }
            TokenKind::Punct('(') => {
                self.pos += 1;
                self.parse_parenthesized(token.pos)
            }
            TokenKind::Punct('[') => {
                self.pos += 1;
                let saved = std::mem::replace(&mut self.stop_idents, &[]);
                let inner = if self.at_punct(']') {
                    Ok(None)
                } else {
                    self.parse_expression().map(Some)
                };
                self.stop_idents = saved;
                let inner = inner?;
                self.expect_punct(']')?;
                let (items, separator) = match inner {
                    None => (Vec::new(), ListSeparator::Space),
                    Some(Expr::List {
                        items,
                        separator,
                        bracketed: false,
                    }) => (items, separator),
                    Some(other) => (vec![other], ListSeparator::Space),
                };
                Ok(Expr::List {
                    items,
                    separator,
                    bracketed: true,
                })
            }
            TokenKind::Punct('&') => {
                self.pos += 1;
                Ok(Expr::String {
                    text: Interpolation::plain("&"),
                    quoted: false,
                })
            }
            TokenKind::Ident(_) | TokenKind::InterpStart => self.parse_identifier_like(),
            _ => Err(self.expected("expression (e.g. 1px, bold)")),
        }
    }

    fn parse_parenthesized(&mut self, pos: Position) -> Result<Expr> {
        let saved = std::mem::replace(&mut self.stop_idents, &[]);
        let result = self.parse_parenthesized_inner(pos);
        self.stop_idents = saved;
        result
    }

    fn parse_parenthesized_inner(&mut self, pos: Position) -> Result<Expr> {
        if self.eat_punct(')') {
            return Ok(Expr::Literal(Value::empty_list()));
        }
        let first = self.parse_space_list()?;
        if self.eat_punct(':') {
            let mut entries = vec![(first, self.parse_space_list()?)];
            while self.eat_punct(',') {
                if self.at_punct(')') {
                    break;
                }
                let key = self.parse_space_list()?;
                self.expect_punct(':')?;
                entries.push((key, self.parse_space_list()?));
            }
            self.expect_punct(')')?;
            return Ok(Expr::Map { entries, pos });
        }
        let inner = if self.at_punct(',') {
            let mut items = vec![first];
            while self.eat_punct(',') {
                if self.at_punct(')') {
                    break;
                }
                items.push(self.parse_space_list()?);
            }
            Expr::List {
                items,
                separator: ListSeparator::Comma,
                bracketed: false,
            }
        } else {
            first
        };
        self.expect_punct(')')?;
        Ok(Expr::Paren(Box::new(inner)))
    }

    /// Identifiers, keywords, function calls and interpolated bare words.
    fn parse_identifier_like(&mut self) -> Result<Expr> {
        let start = self.pos;
        let pos = self.tokens[start].pos;

        if let TokenKind::Ident(name) = &self.tokens[start].kind {
            let name = name.clone();
            let next = self.tokens.get(start + 1);
            if next.is_some_and(|t| t.is_punct('(')) {
                self.pos = start + 2;
                let lower = name.to_ascii_lowercase();
                if RAW_FUNCTIONS.contains(&lower.as_str()) {
                    return self.parse_raw_call(&name);
                }
                let args = self.parse_call_args()?;
                return Ok(Expr::Call { name, args, pos });
            }
            let joined = next.is_some_and(|t| t.kind == TokenKind::InterpStart);
            if !joined {
                self.pos = start + 1;
                let lower = name.to_ascii_lowercase();
                return Ok(match lower.as_str() {
                    "true" => Expr::Literal(Value::Bool(true)),
                    "false" => Expr::Literal(Value::Bool(false)),
                    "null" => Expr::Literal(Value::Null),
                    _ => match Color::from_name(&name) {
                        Some(color) => Expr::Literal(Value::Color(color)),
                        None => Expr::String {
                            text: Interpolation::plain(name),
                            quoted: false,
                        },
                    },
                });
            }
        }

        // Bare word assembled from adjacent identifiers and interpolations.
        let mut text = Interpolation::new();
        loop {
            let Some(token) = self.peek().cloned() else { break };
            match &token.kind {
                TokenKind::Ident(name) => {
                    text.push_text(name);
                    self.pos += 1;
                }
                TokenKind::InterpStart => {
                    self.pos += 1;
                    let expr = self.parse_interpolation_body()?;
                    text.push_expr(expr);
                }
                TokenKind::Number { .. } if !text.is_empty() => {
                    text.push_text(self.token_text(&token));
                    self.pos += 1;
                }
                TokenKind::Punct('-')
                    if !text.is_empty()
                        && self
                            .tokens
                            .get(self.pos + 1)
                            .is_some_and(|t| matches!(t.kind, TokenKind::Ident(_) | TokenKind::InterpStart)) =>
                {
                    text.push_text("-");
                    self.pos += 1;
                }
                _ => break,
            }
        }
        if self.peek().is_some_and(|t| t.is_punct('(')) {
            if let Some(name) = text.as_plain() {
                let name = name.to_string();
                self.pos += 1;
                let args = self.parse_call_args()?;
                return Ok(Expr::Call { name, args, pos });
            }
        }
        Ok(Expr::String {
            text,
            quoted: false,
        })
    }

    /// `name(` consumed; keeps the arguments as raw text.
    fn parse_raw_call(&mut self, name: &str) -> Result<Expr> {
        let mut text = Interpolation::plain(format!("{name}("));
        let inner = self.raw_interpolation(false, |t| t.is_punct(')'))?;
        for part in inner.parts {
            match part {
                crate::ast::InterpPart::Text(t) => text.push_text(&t),
                crate::ast::InterpPart::Expr(e) => text.push_expr(e),
            }
        }
        if self.peek().is_none() {
            return Err(self.expected("\")\""));
        }
        self.pos += 1;
        text.push_text(")");
        Ok(Expr::String {
            text,
            quoted: false,
        })
    }

    /// Arguments after a consumed `(`, through the closing `)`.
    fn parse_call_args(&mut self) -> Result<CallArgs> {
        let saved = std::mem::replace(&mut self.stop_idents, &[]);
        let result = self.parse_call_args_inner();
        self.stop_idents = saved;
        result
    }

    fn parse_call_args_inner(&mut self) -> Result<CallArgs> {
        let mut args = CallArgs::default();
        loop {
            if self.eat_punct(')') {
                return Ok(args);
            }
            let index = self.sig_index(self.pos);
            let keyword = match self.tokens.get(index).map(|t| &t.kind) {
                Some(TokenKind::Variable(name)) if self.tokens_after_is_colon(index + 1) => {
                    Some(name.clone())
                }
                _ => None,
            };
            if let Some(name) = keyword {
                self.pos = index + 1;
                self.expect_punct(':')?;
                let value = self.parse_space_list()?;
                args.keyword.push((name, value));
            } else {
                let value = self.parse_space_list()?;
                if self.at_splat() {
                    self.eat_splat();
                    args.rest = Some(Box::new(value));
                } else {
                    args.positional.push(value);
                }
            }
            if !self.eat_punct(',') {
                self.expect_punct(')')?;
                return Ok(args);
            }
        }
    }

    /// Splits the raw contents of a quoted string at `#{...}`.
    fn string_interpolation(&self, raw: &str, token_pos: Position) -> Result<Interpolation> {
        self.text_interpolation(raw, Position::new(token_pos.line, token_pos.column + 1))
    }

    fn text_interpolation(&self, raw: &str, origin: Position) -> Result<Interpolation> {
        let mut interp = Interpolation::new();
        let mut rest = raw;
        let mut column = origin.column;
        while let Some(start) = rest.find("#{") {
            interp.push_text(&rest[..start]);
            column += rest[..start].chars().count() + 2;
            let body_start = start + 2;
            let end = matching_brace(&rest[body_start..]).ok_or_else(|| {
                ScssError::Syntax(CompileError::new(
                    Position::new(origin.line, column),
                    &*self.file,
                    "Invalid CSS: unterminated interpolation, expected \"}\"",
                ))
            })?;
            let body = &rest[body_start..body_start + end];
            let mut sub = Parser::new(body, &self.file, Position::new(origin.line, column))?;
            let expr = sub.parse_expression()?;
            if sub.peek_sig().is_some() {
                return Err(sub.expected("\"}\""));
            }
            interp.push_expr(expr);
            column += body.chars().count() + 1;
            rest = &rest[body_start + end + 1..];
        }
        interp.push_text(rest);
        Ok(interp)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, pos: Position) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        pos,
    }
}

/// Byte offset of the `}` closing an interpolation body.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') if depth == 0 => return Some(i),
            (None, '}') => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Collapses whitespace runs in the text parts to single spaces.
fn collapse_spaces(interp: Interpolation) -> Interpolation {
    let mut out = Interpolation::new();
    for part in interp.parts {
        match part {
            crate::ast::InterpPart::Text(text) => {
                let mut collapsed = String::with_capacity(text.len());
                let mut last_space = false;
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !last_space {
                            collapsed.push(' ');
                        }
                        last_space = true;
                    } else {
                        collapsed.push(c);
                        last_space = false;
                    }
                }
                out.push_text(&collapsed);
            }
            crate::ast::InterpPart::Expr(expr) => out.push_expr(expr),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::InterpPart;

    fn parse_scss(source: &str) -> Stylesheet {
        parse(source, "stdin", false).unwrap()
    }

    fn parse_err(source: &str) -> CompileError {
        match parse(source, "stdin", false).unwrap_err() {
            ScssError::Syntax(details) => details,
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parses_rule_with_declaration() {
        let sheet = parse_scss("div {color: #FFF;}");
        let StmtKind::RuleBlock { selector, body } = &sheet.stmts[0].kind else {
            panic!("expected rule");
        };
        assert_eq!(selector.as_plain(), Some("div"));
        let StmtKind::Declaration { property, value, .. } = &body[0].kind else {
            panic!("expected declaration");
        };
        assert_eq!(property.as_plain(), Some("color"));
        assert!(matches!(value, Some(Expr::Literal(Value::Color(_)))));
    }

    #[test]
    fn pseudo_selector_is_not_a_declaration() {
        let sheet = parse_scss("a:hover { color: red; }");
        assert!(matches!(sheet.stmts[0].kind, StmtKind::RuleBlock { .. }));
    }

    #[test]
    fn declaration_without_space_after_colon() {
        let sheet = parse_scss("a { color:red; }");
        let StmtKind::RuleBlock { body, .. } = &sheet.stmts[0].kind else {
            panic!("expected rule");
        };
        assert!(matches!(body[0].kind, StmtKind::Declaration { .. }));
    }

    #[test]
    fn unterminated_block_reports_last_token() {
        let err = parse_err("div {");
        assert_eq!((err.line, err.column), (1, 5));
        assert!(err.error_text.contains("expected"));
    }

    #[test]
    fn variable_flags() {
        let sheet = parse_scss("$a: 1px !default;\n$b: 2 !global;");
        let StmtKind::VariableAssignment { flags, .. } = &sheet.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(*flags, AssignFlags::DEFAULT);
        let StmtKind::VariableAssignment { flags, .. } = &sheet.stmts[1].kind else {
            panic!("expected assignment");
        };
        assert_eq!(*flags, AssignFlags::GLOBAL);
    }

    #[test]
    fn import_position_is_string_token() {
        let sheet = parse_scss("@import \"foo\";");
        let StmtKind::Import(targets) = &sheet.stmts[0].kind else {
            panic!("expected import");
        };
        assert_eq!(
            targets[0],
            ImportTarget::Stylesheet {
                reference: "foo".into(),
                pos: Position::new(1, 9)
            }
        );
    }

    #[test]
    fn space_list_with_negative_number() {
        let sheet = parse_scss("$a: 1px -2px;");
        let StmtKind::VariableAssignment { value, .. } = &sheet.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value, Expr::List { items, separator: ListSeparator::Space, .. } if items.len() == 2));
    }

    #[test]
    fn subtraction_without_spaces() {
        let sheet = parse_scss("$a: 3px-1px;");
        let StmtKind::VariableAssignment { value, .. } = &sheet.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value, Expr::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn map_literal() {
        let sheet = parse_scss("$m: (a: 1, b: 2);");
        let StmtKind::VariableAssignment { value, .. } = &sheet.stmts[0].kind else {
            panic!("expected assignment");
        };
        assert!(matches!(value, Expr::Map { entries, .. } if entries.len() == 2));
    }

    #[test]
    fn interpolated_selector() {
        let sheet = parse_scss(".a-#{$b} { x: y; }");
        let StmtKind::RuleBlock { selector, .. } = &sheet.stmts[0].kind else {
            panic!("expected rule");
        };
        assert!(matches!(&selector.parts[..], [InterpPart::Text(t), InterpPart::Expr(_)] if t == ".a-"));
    }

    #[test]
    fn string_interpolation_is_split() {
        let sheet = parse_scss("$a: \"x#{1 + 1}y\";");
        let StmtKind::VariableAssignment { value, .. } = &sheet.stmts[0].kind else {
            panic!("expected assignment");
        };
        let Expr::String { text, quoted: true } = value else {
            panic!("expected string");
        };
        assert_eq!(text.parts.len(), 3);
    }

    #[test]
    fn control_directives() {
        let sheet = parse_scss(
            "@if $a == 1 { b: c; } @else if $a { d: e; } @else { f: g; }\n\
             @for $i from 1 through 3 { x: $i; }\n\
             @each $k, $v in (a: 1) { y: $v; }\n\
             @while $i > 0 { $i: $i - 1; }",
        );
        assert_eq!(sheet.stmts.len(), 4);
        let StmtKind::Control(ControlDirective::If { clauses, otherwise }) = &sheet.stmts[0].kind else {
            panic!("expected @if");
        };
        assert_eq!(clauses.len(), 2);
        assert!(otherwise.is_some());
        assert!(matches!(
            sheet.stmts[1].kind,
            StmtKind::Control(ControlDirective::For { inclusive: true, .. })
        ));
    }

    #[test]
    fn mixin_with_defaults_and_rest() {
        let sheet = parse_scss("@mixin m($a, $b: 2px, $rest...) { x: $a; }");
        let StmtKind::MixinDef(decl) = &sheet.stmts[0].kind else {
            panic!("expected mixin");
        };
        assert_eq!(decl.params.len(), 2);
        assert!(decl.params[1].default.is_some());
        assert_eq!(decl.rest.as_deref(), Some("rest"));
    }

    #[test]
    fn include_with_keyword_args_and_content() {
        let sheet = parse_scss("a { @include m(1, $b: 2) { c: d; } }");
        let StmtKind::RuleBlock { body, .. } = &sheet.stmts[0].kind else {
            panic!("expected rule");
        };
        let StmtKind::Include { args, content, .. } = &body[0].kind else {
            panic!("expected include");
        };
        assert_eq!(args.positional.len(), 1);
        assert_eq!(args.keyword[0].0, "b");
        assert!(content.is_some());
    }

    #[test]
    fn raw_calc_arguments() {
        let sheet = parse_scss("a { width: calc(100% - #{$x}); }");
        let StmtKind::RuleBlock { body, .. } = &sheet.stmts[0].kind else {
            panic!("expected rule");
        };
        let StmtKind::Declaration { value: Some(Expr::String { text, .. }), .. } = &body[0].kind else {
            panic!("expected raw string");
        };
        assert!(matches!(&text.parts[0], InterpPart::Text(t) if t == "calc(100% - "));
    }

    #[test]
    fn nested_properties() {
        let sheet = parse_scss("a { font: { family: x; size: 2px; } }");
        let StmtKind::RuleBlock { body, .. } = &sheet.stmts[0].kind else {
            panic!("expected rule");
        };
        let StmtKind::Declaration { value, nested, .. } = &body[0].kind else {
            panic!("expected declaration");
        };
        assert!(value.is_none());
        assert_eq!(nested.len(), 2);
    }

    #[test]
    fn stray_closing_brace() {
        let err = parse_err("a { b: c; } }");
        assert!(err.error_text.contains("expected"));
        assert_eq!(err.column, 13);
    }
}
