//! `@import` resolution.
//!
//! A reference is resolved in this order, first match wins:
//!
//! 1. the caller-supplied [`ImportHook`], which may rewrite the reference
//!    and supply the source text itself;
//! 2. plain-CSS references (`.css`, `http://`, `//`) pass through as CSS;
//! 3. the filesystem, relative to the importing unit and then to each
//!    include path in order, trying partial and extension variants.
//!
//! Every resolved stylesheet becomes a new [`CompilationUnit`] chained to
//! its importer; the chain is used to reject import cycles.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, trace};

use crate::ast::Stylesheet;
use crate::error::{CompileError, Result, ScssError};
use crate::lexer::Position;
use crate::parser;

/// Answer of an [`ImportHook`] for one reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportResult {
    /// The hook supplies the stylesheet. `path` replaces the reference as
    /// the unit's identifier (reported in included files and passed as
    /// the previous path to nested imports).
    Accepted {
        path: String,
        source: String,
        source_map: Option<String>,
    },
    /// Fall back to the built-in resolution.
    Declined,
    /// Abort the compilation with this diagnostic.
    Failed {
        line: usize,
        column: usize,
        message: String,
    },
}

impl ImportResult {
    pub fn accepted(path: impl Into<String>, source: impl Into<String>) -> Self {
        ImportResult::Accepted {
            path: path.into(),
            source: source.into(),
            source_map: None,
        }
    }
}

/// Dynamic import callback, invoked as `hook(reference, previous_path)`.
///
/// # Examples
///
/// ```rust
/// use scss::{compile, CompilationOptions, ImportHook, ImportResult};
///
/// let hook = ImportHook::new(|reference, _previous| {
///     if reference == "colors" {
///         ImportResult::accepted("/virtual/colors.scss", "$main: red;")
///     } else {
///         ImportResult::Declined
///     }
/// });
/// let options = CompilationOptions::default().with_import_hook(hook);
/// let result = compile("@import \"colors\"; a { color: $main; }", &options).unwrap();
/// assert_eq!(result.included_files, Some(vec!["/virtual/colors.scss".to_string()]));
/// ```
#[derive(Clone)]
pub struct ImportHook(Arc<dyn Fn(&str, &str) -> ImportResult + Send + Sync>);

impl ImportHook {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&str, &str) -> ImportResult + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    pub fn call(&self, reference: &str, previous: &str) -> ImportResult {
        (self.0)(reference, previous)
    }
}

impl fmt::Debug for ImportHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ImportHook(..)")
    }
}

/// One parsed source document taking part in a compilation.
#[derive(Debug)]
pub(crate) struct CompilationUnit {
    /// Resolved path, hook identifier or `stdin`.
    pub path: String,
    pub source: String,
    /// Base directory for relative imports from this unit.
    pub dir: Option<PathBuf>,
    pub parent: Option<Rc<CompilationUnit>>,
    pub stylesheet: Stylesheet,
}

impl CompilationUnit {
    pub fn parse(
        path: String,
        source: String,
        indented: bool,
        dir: Option<PathBuf>,
        parent: Option<Rc<CompilationUnit>>,
    ) -> Result<Rc<Self>> {
        trace!("parsing {path} ({} bytes, indented: {indented})", source.len());
        let stylesheet = parser::parse(&source, &path, indented)?;
        Ok(Rc::new(Self {
            path,
            source,
            dir,
            parent,
            stylesheet,
        }))
    }

    fn ancestors(self: &Rc<Self>) -> impl Iterator<Item = Rc<CompilationUnit>> {
        std::iter::successors(Some(self.clone()), |unit| unit.parent.clone())
    }
}

/// A successful stylesheet import, in resolution order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportRecord {
    pub path: String,
    pub source: String,
    pub source_map: Option<String>,
}

/// The slice of the options the resolver needs.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResolverConfig {
    pub include_paths: Vec<PathBuf>,
    pub hook: Option<ImportHook>,
    pub cwd: PathBuf,
}

pub(crate) enum Resolution {
    /// Emit `@import <text>;` verbatim.
    Css(String),
    Unit(Rc<CompilationUnit>, ImportRecord),
}

pub(crate) struct Resolver {
    config: ResolverConfig,
}

fn is_css_reference(reference: &str) -> bool {
    reference.ends_with(".css")
        || reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("//")
}

fn is_indented_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("sass"))
}

fn parent_dir(path: &str) -> Option<PathBuf> {
    Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

/// Drops `.` and folds `..` components lexically, so one file always has
/// one identifier in the import chain.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// File names tried for `name` inside one directory, in order.
fn candidates(reference: &str) -> Vec<PathBuf> {
    let path = Path::new(reference);
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };

    let has_ext = ["scss", "sass", "css"]
        .iter()
        .any(|ext| path.extension().is_some_and(|e| e == *ext));
    if has_ext {
        return vec![dir.join(name), dir.join(format!("_{name}"))];
    }

    let mut out = Vec::new();
    for ext in ["scss", "sass", "css"] {
        out.push(dir.join(format!("{name}.{ext}")));
        out.push(dir.join(format!("_{name}.{ext}")));
    }
    for ext in ["scss", "sass"] {
        out.push(path.join(format!("index.{ext}")));
        out.push(path.join(format!("_index.{ext}")));
    }
    out
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Resolves `reference` imported from `from` at `pos`.
    pub fn resolve(
        &self,
        reference: &str,
        from: &Rc<CompilationUnit>,
        pos: Position,
    ) -> Result<Resolution> {
        let import_error =
            |text: String| ScssError::Import(CompileError::new(pos, from.path.as_str(), text));

        if let Some(hook) = &self.config.hook {
            match hook.call(reference, &from.path) {
                ImportResult::Accepted {
                    path,
                    source,
                    source_map,
                } => {
                    debug!("import hook accepted {reference:?} as {path}");
                    return self.load(from, path, source, source_map, pos);
                }
                ImportResult::Failed {
                    line,
                    column,
                    message,
                } => {
                    let at = if line == 0 { pos } else { Position::new(line, column) };
                    return Err(ScssError::Import(CompileError::new(
                        at,
                        from.path.as_str(),
                        message,
                    )));
                }
                ImportResult::Declined => trace!("import hook declined {reference:?}"),
            }
        }

        if is_css_reference(reference) {
            return Ok(Resolution::Css(format!("\"{reference}\"")));
        }

        let base = from.dir.clone().unwrap_or_else(|| self.config.cwd.clone());
        let roots = std::iter::once(base).chain(self.config.include_paths.iter().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                self.config.cwd.join(dir)
            }
        }));

        for root in roots {
            for candidate in candidates(reference) {
                let full = normalize_path(&root.join(&candidate));
                if !full.is_file() {
                    continue;
                }
                let path = full.to_string_lossy().into_owned();
                debug!("resolved import {reference:?} to {path}");
                let source = std::fs::read_to_string(&full).map_err(|err| {
                    import_error(format!("File to import not found or unreadable: {path} ({err})"))
                })?;
                return self.load(from, path, source, None, pos);
            }
        }

        Err(import_error(format!(
            "Unable to find include file for @import \"{reference}\""
        )))
    }

    fn load(
        &self,
        from: &Rc<CompilationUnit>,
        path: String,
        source: String,
        source_map: Option<String>,
        pos: Position,
    ) -> Result<Resolution> {
        let chain: Vec<Rc<CompilationUnit>> = from.ancestors().collect();
        if let Some(idx) = chain.iter().position(|unit| unit.path == path) {
            let mut links: Vec<&str> = chain[..=idx].iter().rev().map(|u| u.path.as_str()).collect();
            links.push(&path);
            let lines: Vec<String> = links
                .windows(2)
                .map(|pair| format!("    {} imports {}", pair[0], pair[1]))
                .collect();
            return Err(ScssError::Import(CompileError::new(
                pos,
                from.path.as_str(),
                format!("An @import loop has been found:\n{}", lines.join("\n")),
            )));
        }

        let record = ImportRecord {
            path: path.clone(),
            source: source.clone(),
            source_map,
        };
        let unit = CompilationUnit::parse(
            path.clone(),
            source,
            is_indented_path(&path),
            parent_dir(&path),
            Some(from.clone()),
        )?;
        Ok(Resolution::Unit(unit, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> Rc<CompilationUnit> {
        CompilationUnit::parse("stdin".into(), String::new(), false, None, None).unwrap()
    }

    #[test]
    fn partial_and_extension_candidates() {
        let names: Vec<String> = candidates("dir/foo")
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names[0], "dir/foo.scss");
        assert_eq!(names[1], "dir/_foo.scss");
        assert!(names.contains(&"dir/foo/_index.scss".to_string()));
    }

    #[test]
    fn normalize_folds_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/a/sub/../sub/./b.scss")),
            PathBuf::from("/a/sub/b.scss")
        );
        assert_eq!(normalize_path(Path::new("../x/../y")), PathBuf::from("../y"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn css_references_pass_through() {
        let resolver = Resolver::new(ResolverConfig::default());
        let resolution = resolver
            .resolve("theme.css", &root(), Position::new(1, 9))
            .unwrap();
        assert!(matches!(resolution, Resolution::Css(text) if text == "\"theme.css\""));
    }

    #[test]
    fn hook_failure_carries_its_position() {
        let resolver = Resolver::new(ResolverConfig {
            hook: Some(ImportHook::new(|_, _| ImportResult::Failed {
                line: 3,
                column: 7,
                message: "nope".into(),
            })),
            ..ResolverConfig::default()
        });
        let Err(ScssError::Import(err)) = resolver.resolve("x", &root(), Position::new(1, 9)) else {
            panic!("expected an import error");
        };
        assert_eq!((err.line, err.column, err.error_text.as_str()), (3, 7, "nope"));
    }

    #[test]
    fn self_import_is_a_loop() {
        let resolver = Resolver::new(ResolverConfig {
            hook: Some(ImportHook::new(|_, _| ImportResult::accepted("/a.scss", ""))),
            ..ResolverConfig::default()
        });
        let Ok(Resolution::Unit(a, _)) = resolver.resolve("a", &root(), Position::START) else {
            panic!("expected a unit");
        };
        let Err(ScssError::Import(err)) = resolver.resolve("a", &a, Position::START) else {
            panic!("expected an import loop");
        };
        assert!(err.error_text.starts_with("An @import loop has been found"));
        assert!(err.error_text.contains("/a.scss imports /a.scss"));
    }
}
