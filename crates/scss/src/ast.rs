//! Statement tree produced by the parser.
//!
//! The tree is read-only once parsed: the evaluator walks it and builds a
//! separate CSS tree instead of rewriting nodes in place. Both surface
//! syntaxes (SCSS and indented Sass) produce the same node shapes.

use std::rc::Rc;

use bitflags::bitflags;

use crate::lexer::Position;
use crate::value::{ListSeparator, Value};

/// A fragment of literal text interleaved with `#{...}` expressions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interpolation {
    pub parts: Vec<InterpPart>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InterpPart {
    Text(String),
    Expr(Expr),
}

impl Interpolation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        let mut interp = Self::new();
        interp.push_text(&text.into());
        interp
    }

    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(InterpPart::Text(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(InterpPart::Text(text.to_string()));
        }
    }

    pub fn push_expr(&mut self, expr: Expr) {
        self.parts.push(InterpPart::Expr(expr));
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Returns the text if there are no interpolated expressions.
    pub fn as_plain(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [] => Some(""),
            [InterpPart::Text(text)] => Some(text),
            _ => None,
        }
    }

    /// Trims trailing whitespace from the final text segment.
    pub fn trim_end(&mut self) {
        if let Some(InterpPart::Text(last)) = self.parts.last_mut() {
            let trimmed = last.trim_end().len();
            last.truncate(trimmed);
            if last.is_empty() {
                self.parts.pop();
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

/// An unevaluated SCSS expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Numbers, colors, booleans and `null`.
    Literal(Value),
    /// Quoted string or unquoted identifier, possibly interpolated.
    String { text: Interpolation, quoted: bool },
    Variable { name: String, pos: Position },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        pos: Position,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        pos: Position,
    },
    List {
        items: Vec<Expr>,
        separator: ListSeparator,
        bracketed: bool,
    },
    Map {
        entries: Vec<(Expr, Expr)>,
        pos: Position,
    },
    Call {
        name: String,
        args: CallArgs,
        pos: Position,
    },
    /// Parenthesized expression; forces `/` to mean division.
    Paren(Box<Expr>),
}

impl Expr {
    pub fn is_number_literal(&self) -> bool {
        matches!(self, Expr::Literal(Value::Number(_)))
    }
}

/// Arguments at a mixin or function call site.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Expr>,
    pub keyword: Vec<(String, Expr)>,
    /// Trailing `$list...` splat.
    pub rest: Option<Box<Expr>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
}

/// A `@mixin` or `@function` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct CallableDecl {
    pub name: String,
    pub params: Vec<Param>,
    /// Name of the trailing `$args...` parameter, if any.
    pub rest: Option<String>,
    pub body: Vec<Stmt>,
    pub file: Rc<str>,
    pub pos: Position,
}

bitflags! {
    /// Modifiers on a variable assignment.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AssignFlags: u8 {
        /// `!default`: assign only if unbound or null.
        const DEFAULT = 0b01;
        /// `!global`: assign in the outermost scope.
        const GLOBAL = 0b10;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImportTarget {
    /// A quoted reference resolved through the hook or the filesystem.
    Stylesheet { reference: String, pos: Position },
    /// A plain CSS import emitted verbatim (`url(...)`, media queries).
    Css(Interpolation),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Warn,
    Debug,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ControlDirective {
    If {
        clauses: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    Each {
        vars: Vec<String>,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    For {
        var: String,
        from: Expr,
        to: Expr,
        inclusive: bool,
        body: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    RuleBlock {
        selector: Interpolation,
        body: Vec<Stmt>,
    },
    Declaration {
        property: Interpolation,
        value: Option<Expr>,
        important: bool,
        /// Nested properties: `font: { family: x; }`.
        nested: Vec<Stmt>,
    },
    AtRule {
        name: String,
        params: Interpolation,
        body: Option<Vec<Stmt>>,
    },
    Media {
        query: Interpolation,
        body: Vec<Stmt>,
    },
    VariableAssignment {
        name: String,
        value: Expr,
        flags: AssignFlags,
    },
    MixinDef(Rc<CallableDecl>),
    FunctionDef(Rc<CallableDecl>),
    Include {
        name: String,
        args: CallArgs,
        content: Option<Rc<Vec<Stmt>>>,
    },
    Content,
    Return(Expr),
    Control(ControlDirective),
    Import(Vec<ImportTarget>),
    Message {
        kind: MessageKind,
        value: Expr,
    },
    /// A recognized directive this compiler does not implement.
    Unsupported(String),
    Comment(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Position,
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

/// A parsed source document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stylesheet {
    pub stmts: Vec<Stmt>,
}
