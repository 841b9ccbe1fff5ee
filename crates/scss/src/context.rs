//! Per-compilation orchestration.
//!
//! A [`CompilationContext`] owns the options of one compilation and runs
//! the pipeline `parse -> evaluate (resolving imports) -> emit`, then
//! assembles the source map. Each stage only receives the configuration
//! it needs. After a compilation, [`CompilationContext::stage`] reports
//! whether it ended in [`Stage::Succeeded`] or [`Stage::Failed`].

use std::path::{Path, PathBuf};

use log::debug;

use crate::emitter::sourcemap::{self, SourceMap};
use crate::emitter::{self, EmitConfig};
use crate::error::{Result, ScssError};
use crate::eval;
use crate::importer::{self, CompilationUnit, Resolver, ResolverConfig};
use crate::options::CompilationOptions;

/// Pipeline stages of a compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Created,
    Parsing,
    Evaluating,
    Emitting,
    Succeeded,
    Failed,
}

/// Output of a successful compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilationResult {
    pub css: String,
    /// Source map JSON when `generate_source_map` is set.
    pub source_map: Option<String>,
    /// Entry file (for file compilations) and every resolved import, in
    /// resolution order. `None` when empty.
    pub included_files: Option<Vec<String>>,
}

struct Entry {
    path: String,
    source: String,
    indented: bool,
    dir: Option<PathBuf>,
    /// List the entry itself as the first included file.
    listed: bool,
}

#[derive(Debug)]
pub struct CompilationContext {
    options: CompilationOptions,
    cwd: PathBuf,
    stage: Stage,
}

impl CompilationContext {
    pub fn new(options: CompilationOptions) -> Self {
        Self {
            options,
            cwd: std::env::current_dir().unwrap_or_default(),
            stage: Stage::Created,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn transition(&mut self, next: Stage) {
        debug!("compilation stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    fn rooted(&self, path: &Path) -> PathBuf {
        importer::normalize_path(&self.cwd.join(path))
    }

    /// Compiles in-memory source. `input_file`, when set, names the unit
    /// in diagnostics and anchors relative imports.
    pub fn compile_string(&mut self, source: &str) -> Result<CompilationResult> {
        let input = self.options.input_file.as_deref().map(|p| self.rooted(p));
        let entry = Entry {
            path: input
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| "stdin".to_string()),
            source: source.to_string(),
            indented: self.options.is_indented_syntax_source,
            dir: input.as_deref().and_then(Path::parent).map(Path::to_path_buf),
            listed: false,
        };
        self.run(entry)
    }

    /// Compiles the file at `path`, which also becomes the import base.
    pub fn compile_file(&mut self, path: &Path) -> Result<CompilationResult> {
        let path = self.rooted(path);
        let source = std::fs::read_to_string(&path).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => ScssError::FileNotFound(path.clone()),
            _ => ScssError::Io(err),
        })?;
        let indented = self.options.is_indented_syntax_source
            || path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("sass"));
        let entry = Entry {
            path: path.to_string_lossy().into_owned(),
            source,
            indented,
            dir: path.parent().map(Path::to_path_buf),
            listed: true,
        };
        self.run(entry)
    }

    fn run(&mut self, entry: Entry) -> Result<CompilationResult> {
        let result = self.pipeline(entry);
        match &result {
            Ok(_) => self.transition(Stage::Succeeded),
            Err(err) => {
                debug!("compilation failed: {err}");
                self.transition(Stage::Failed);
            }
        }
        result
    }

    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            include_paths: self.options.include_paths.clone(),
            hook: self.options.try_import.clone(),
            cwd: self.cwd.clone(),
        }
    }

    fn emit_config(&self) -> EmitConfig {
        EmitConfig {
            style: self.options.output_style,
            precision: self.options.precision,
            indent: self.options.indent.clone(),
            linefeed: self.options.linefeed.clone(),
            source_comments: self.options.source_comments,
        }
    }

    fn pipeline(&mut self, entry: Entry) -> Result<CompilationResult> {
        self.transition(Stage::Parsing);
        let mut included = Vec::new();
        if entry.listed {
            included.push(entry.path.clone());
        }
        let unit = CompilationUnit::parse(entry.path, entry.source, entry.indented, entry.dir, None)?;

        self.transition(Stage::Evaluating);
        let resolver = Resolver::new(self.resolver_config());
        let evaluation = eval::evaluate(&unit, &resolver, self.options.precision)?;
        included.extend(evaluation.includes.into_iter().map(|record| record.path));

        self.transition(Stage::Emitting);
        let emitted = emitter::emit(&evaluation.tree, &self.emit_config())?;
        let mut css = emitted.css;

        let source_map = if self.options.generate_source_map {
            let output = self
                .options
                .output_file
                .as_deref()
                .map(|p| self.rooted(p))
                .unwrap_or_else(|| self.cwd.join("result.css"));
            let map_path = match &self.options.source_map_file {
                Some(p) => self.rooted(p),
                None => PathBuf::from(format!("{}.map", output.display())),
            };
            let map_dir = map_path.parent().unwrap_or(self.cwd.as_path()).to_path_buf();
            let output_dir = output.parent().unwrap_or(self.cwd.as_path()).to_path_buf();

            let map = SourceMap {
                version: 3,
                file: sourcemap::relative_path(&map_dir, &output),
                source_root: self.options.source_map_root.clone().unwrap_or_default(),
                sources: evaluation
                    .tree
                    .sources
                    .iter()
                    .map(|s| sourcemap::relative_path(&map_dir, Path::new(s)))
                    .collect(),
                sources_content: self
                    .options
                    .source_map_contents
                    .then(|| evaluation.tree.source_texts.clone()),
                names: Vec::new(),
                mappings: sourcemap::encode_mappings(&emitted.mappings),
            };
            let json = map.to_json()?;

            if !self.options.omit_source_map_url {
                let url = if self.options.source_map_embed {
                    sourcemap::data_url(&json)
                } else {
                    sourcemap::relative_path(&output_dir, &map_path)
                };
                if !css.is_empty() && !css.ends_with('\n') {
                    css.push_str(&self.options.linefeed);
                }
                css.push_str(&format!("/*# sourceMappingURL={url} */"));
            }
            Some(json)
        } else {
            None
        };

        Ok(CompilationResult {
            css,
            source_map,
            included_files: (!included.is_empty()).then_some(included),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_compilation_has_no_included_files() {
        let result = CompilationContext::new(CompilationOptions::default())
            .compile_string("a { b: c; }")
            .unwrap();
        assert_eq!(result.included_files, None);
        assert_eq!(result.source_map, None);
    }

    #[test]
    fn missing_file_is_a_boundary_error() {
        let err = CompilationContext::new(CompilationOptions::default())
            .compile_file(Path::new("/definitely/not/here.scss"))
            .unwrap_err();
        assert!(matches!(err, ScssError::FileNotFound(_)));
    }

    #[test]
    fn stage_starts_created() {
        let context = CompilationContext::new(CompilationOptions::default());
        assert_eq!(context.stage(), Stage::Created);
    }

    #[test]
    fn stage_reports_outcome() {
        let mut context = CompilationContext::new(CompilationOptions::default());
        context.compile_string("a { b: c; }").unwrap();
        assert_eq!(context.stage(), Stage::Succeeded);

        let mut context = CompilationContext::new(CompilationOptions::default());
        assert!(context.compile_string("a { b: $missing; }").is_err());
        assert_eq!(context.stage(), Stage::Failed);
    }

    #[test]
    fn relative_paths_are_rooted_and_normalized() {
        let context = CompilationContext::new(CompilationOptions::default());
        let rooted = context.rooted(Path::new("./styles/../main.scss"));
        assert_eq!(rooted, context.cwd.join("main.scss"));
    }
}
