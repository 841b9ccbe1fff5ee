//! # SCSS - a Sass/SCSS to CSS compiler
//!
//! A self-contained compiler for the SCSS and indented Sass syntaxes with
//! pluggable `@import` resolution. This crate provides:
//!
//! - **Parsing**: a tokenizer and recursive-descent parser for both syntaxes
//! - **Evaluation**: variables, mixins, functions, control directives,
//!   maps and lists, unit-aware arithmetic and selector nesting
//! - **Imports**: filesystem search over include paths, or a caller-supplied
//!   [`ImportHook`]
//! - **Output**: nested, expanded, compact and compressed styles plus
//!   source maps
//!
//! ## Quick Start
//!
//! ```rust
//! use scss::{compile, CompilationOptions, OutputStyle};
//!
//! let source = r#"
//!     $primary: #FFF;
//!
//!     nav {
//!         ul { margin: 0; }
//!         a { color: $primary; }
//!     }
//! "#;
//!
//! let options = CompilationOptions::default().with_output_style(OutputStyle::Compressed);
//! let result = compile(source, &options).expect("valid SCSS");
//! assert_eq!(result.css, "nav ul{margin:0}nav a{color:#FFF}");
//! ```
//!
//! ## Not Yet Implemented
//!
//! - `@use` / `@forward` modules
//! - `@extend` and `@at-root`
//!
//! ## Modules
//!
//! - [`lexer`]: tokens with 1-based positions
//! - [`parser`]: statement trees, including indented Sass conversion
//! - [`value`]: runtime values and operators
//! - [`selector`]: selector parsing and nesting resolution
//! - [`error`]: error types

pub mod ast;
mod context;
mod css;
mod emitter;
pub mod error;
mod eval;
mod importer;
pub mod lexer;
mod options;
pub mod parser;
pub mod selector;
pub mod value;

use std::path::Path;

use once_cell::sync::Lazy;

pub use context::{CompilationContext, CompilationResult, Stage};
pub use error::{CompileError, Result, ScssError};
pub use importer::{ImportHook, ImportRecord, ImportResult};
pub use options::{CompilationOptions, OutputStyle, ParseStyleError};

static VERSION: Lazy<String> = Lazy::new(|| env!("CARGO_PKG_VERSION").to_string());
static LANGUAGE_VERSION: Lazy<String> = Lazy::new(|| "3.5".to_string());

/// Compiles an in-memory SCSS (or, with `is_indented_syntax_source`, Sass)
/// string.
pub fn compile(source: &str, options: &CompilationOptions) -> Result<CompilationResult> {
    CompilationContext::new(options.clone()).compile_string(source)
}

/// Compiles the stylesheet at `path`.
///
/// A missing file is reported as [`ScssError::FileNotFound`] before any
/// compilation starts.
pub fn compile_file(path: impl AsRef<Path>, options: &CompilationOptions) -> Result<CompilationResult> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ScssError::FileNotFound(path.to_path_buf()));
    }
    CompilationContext::new(options.clone()).compile_file(path)
}

/// Version of this compiler.
pub fn version() -> &'static str {
    &VERSION
}

/// Sass language level implemented by this compiler.
pub fn language_version() -> &'static str {
    &LANGUAGE_VERSION
}
