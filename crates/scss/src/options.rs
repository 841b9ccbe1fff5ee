//! Compilation options.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::importer::ImportHook;

/// CSS serialization style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OutputStyle {
    /// Indentation mirrors the source nesting; closing braces trail.
    #[default]
    Nested,
    /// One declaration per line, braces on their own lines.
    Expanded,
    /// One rule per line.
    Compact,
    /// No insignificant whitespace.
    Compressed,
    /// Serialized like [`OutputStyle::Expanded`].
    Inspect,
    /// Serialized like [`OutputStyle::Expanded`].
    Sass,
}

impl OutputStyle {
    pub fn name(self) -> &'static str {
        match self {
            OutputStyle::Nested => "nested",
            OutputStyle::Expanded => "expanded",
            OutputStyle::Compact => "compact",
            OutputStyle::Compressed => "compressed",
            OutputStyle::Inspect => "inspect",
            OutputStyle::Sass => "sass",
        }
    }
}

impl fmt::Display for OutputStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown output style `{0}` (expected nested, expanded, compact, compressed, inspect or sass)")]
pub struct ParseStyleError(pub String);

impl FromStr for OutputStyle {
    type Err = ParseStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nested" => Ok(OutputStyle::Nested),
            "expanded" => Ok(OutputStyle::Expanded),
            "compact" => Ok(OutputStyle::Compact),
            "compressed" => Ok(OutputStyle::Compressed),
            "inspect" => Ok(OutputStyle::Inspect),
            "sass" => Ok(OutputStyle::Sass),
            _ => Err(ParseStyleError(s.to_string())),
        }
    }
}

/// Options of one compilation.
///
/// Relative paths are resolved against the current working directory when
/// the compilation starts.
///
/// ```rust
/// use scss::{CompilationOptions, OutputStyle};
///
/// let options = CompilationOptions::default()
///     .with_output_style(OutputStyle::Compressed)
///     .with_precision(3)
///     .with_include_path("vendor/styles");
/// assert_eq!(options.include_paths.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct CompilationOptions {
    pub output_style: OutputStyle,
    /// Decimal digits in emitted numbers.
    pub precision: usize,
    /// Emit `/* line N, file */` before each rule.
    pub source_comments: bool,
    pub generate_source_map: bool,
    /// Inline the map as a base64 `data:` URL.
    pub source_map_embed: bool,
    /// Include the original sources in the map.
    pub source_map_contents: bool,
    /// Leave out the trailing `sourceMappingURL` comment.
    pub omit_source_map_url: bool,
    /// Parse in-memory input as indented Sass.
    pub is_indented_syntax_source: bool,
    pub indent: String,
    pub linefeed: String,
    pub input_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    /// Searched in order; the first match wins.
    pub include_paths: Vec<PathBuf>,
    pub source_map_file: Option<PathBuf>,
    pub source_map_root: Option<String>,
    pub try_import: Option<ImportHook>,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            output_style: OutputStyle::Nested,
            precision: 5,
            source_comments: false,
            generate_source_map: false,
            source_map_embed: false,
            source_map_contents: false,
            omit_source_map_url: false,
            is_indented_syntax_source: false,
            indent: "  ".to_string(),
            linefeed: "\n".to_string(),
            input_file: None,
            output_file: None,
            include_paths: Vec::new(),
            source_map_file: None,
            source_map_root: None,
            try_import: None,
        }
    }
}

impl CompilationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_style(mut self, style: OutputStyle) -> Self {
        self.output_style = style;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_source_comments(mut self, enabled: bool) -> Self {
        self.source_comments = enabled;
        self
    }

    pub fn with_source_map(mut self, enabled: bool) -> Self {
        self.generate_source_map = enabled;
        self
    }

    pub fn with_source_map_embed(mut self, enabled: bool) -> Self {
        self.source_map_embed = enabled;
        self
    }

    pub fn with_source_map_contents(mut self, enabled: bool) -> Self {
        self.source_map_contents = enabled;
        self
    }

    pub fn with_omit_source_map_url(mut self, enabled: bool) -> Self {
        self.omit_source_map_url = enabled;
        self
    }

    pub fn with_indented_syntax(mut self, enabled: bool) -> Self {
        self.is_indented_syntax_source = enabled;
        self
    }

    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    pub fn with_linefeed(mut self, linefeed: impl Into<String>) -> Self {
        self.linefeed = linefeed.into();
        self
    }

    pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.input_file = Some(path.into());
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    pub fn with_include_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.include_paths.push(path.into());
        self
    }

    pub fn with_source_map_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_map_file = Some(path.into());
        self
    }

    pub fn with_source_map_root(mut self, root: impl Into<String>) -> Self {
        self.source_map_root = Some(root.into());
        self
    }

    pub fn with_import_hook(mut self, hook: ImportHook) -> Self {
        self.try_import = Some(hook);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CompilationOptions::default();
        assert_eq!(options.output_style, OutputStyle::Nested);
        assert_eq!(options.precision, 5);
        assert_eq!(options.indent, "  ");
        assert_eq!(options.linefeed, "\n");
    }

    #[test]
    fn style_names_parse_case_insensitively() {
        for style in [
            OutputStyle::Nested,
            OutputStyle::Expanded,
            OutputStyle::Compact,
            OutputStyle::Compressed,
            OutputStyle::Inspect,
            OutputStyle::Sass,
        ] {
            assert_eq!(style.to_string().parse::<OutputStyle>(), Ok(style));
        }
        assert_eq!("Compressed".parse::<OutputStyle>(), Ok(OutputStyle::Compressed));
        assert!("pretty".parse::<OutputStyle>().is_err());
    }
}
