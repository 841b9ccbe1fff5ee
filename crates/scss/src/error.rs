//! Error types for SCSS compilation.
//!
//! Every SCSS-level failure (syntax, import resolution, evaluation) is
//! reported as a single [`CompileError`] carrying the 1-based line and
//! column of the offending construct. Library-boundary failures such as a
//! missing entry file are separate variants and never carry a position.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::lexer::Position;

/// Structured description of a failed compilation.
///
/// `message` is the long, human-readable form including the location;
/// `error_text` is the short description alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    /// 1-based line of the offending construct.
    pub line: usize,
    /// 1-based column of the offending construct.
    pub column: usize,
    /// Path (or synthetic identifier) of the unit the error occurred in.
    pub file: String,
    /// Full diagnostic, e.g. `Error: ... on line 1:5 of stdin`.
    pub message: String,
    /// Short diagnostic without location information.
    pub error_text: String,
}

impl CompileError {
    pub fn new(pos: Position, file: impl Into<String>, error_text: impl Into<String>) -> Self {
        let file = file.into();
        let error_text = error_text.into();
        let message = format!(
            "Error: {}\n        on line {}:{} of {}",
            error_text, pos.line, pos.column, file
        );
        Self {
            line: pos.line,
            column: pos.column,
            file,
            message,
            error_text,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Errors that can occur while compiling a stylesheet.
///
/// # Examples
///
/// ```rust
/// use scss::{compile, CompilationOptions, ScssError};
///
/// let err = compile("div {", &CompilationOptions::default()).unwrap_err();
/// assert!(matches!(err, ScssError::Syntax(_)));
/// assert_eq!(err.details().map(|d| (d.line, d.column)), Some((1, 5)));
/// ```
#[derive(Error, Debug)]
pub enum ScssError {
    /// The source could not be tokenized or parsed.
    #[error("{0}")]
    Syntax(CompileError),

    /// An `@import` could not be resolved, or the import hook failed.
    #[error("{0}")]
    Import(CompileError),

    /// Evaluation failed: undefined names, incompatible units, `@error`, ...
    #[error("{0}")]
    Evaluation(CompileError),

    /// The entry file passed to [`compile_file`](crate::compile_file) does not exist.
    #[error("File to read not found or unreadable: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An I/O error occurred while reading the entry file.
    #[error("I/O error reading stylesheet")]
    Io(#[from] std::io::Error),

    /// The source map could not be serialized.
    #[error("failed to serialize source map")]
    SourceMap(#[from] serde_json::Error),
}

impl ScssError {
    /// Returns the structured details for SCSS-level errors.
    pub fn details(&self) -> Option<&CompileError> {
        match self {
            ScssError::Syntax(e) | ScssError::Import(e) | ScssError::Evaluation(e) => Some(e),
            ScssError::FileNotFound(_) | ScssError::Io(_) | ScssError::SourceMap(_) => None,
        }
    }

    /// Short error text, or the display form for boundary errors.
    pub fn error_text(&self) -> String {
        match self.details() {
            Some(details) => details.error_text.clone(),
            None => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScssError>;
