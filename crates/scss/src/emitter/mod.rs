//! CSS serialization of the evaluated tree.
//!
//! The four output styles only differ in whitespace and in which comments
//! survive:
//!
//! ```text
//! nested:     a {\n  color: red; }\n  a b {\n    x: y; }\n
//! expanded:   a {\n  color: red;\n}\n\na b {\n  x: y;\n}\n
//! compact:    a { color: red; }\na b { x: y; }\n
//! compressed: a{color:red}a b{x:y}
//! ```
//!
//! While writing, the emitter records a [`Mapping`] for every selector,
//! declaration and at-rule so a source map can be built afterwards.

pub(crate) mod sourcemap;

use crate::css::{CssNode, CssTree, NodeId, RuleItem, Span};
use crate::error::{CompileError, Result, ScssError};
use crate::options::OutputStyle;

use sourcemap::Mapping;

/// The slice of the options the emitter needs.
#[derive(Clone, Debug)]
pub(crate) struct EmitConfig {
    pub style: OutputStyle,
    pub precision: usize,
    pub indent: String,
    pub linefeed: String,
    pub source_comments: bool,
}

#[derive(Debug)]
pub(crate) struct Emitted {
    pub css: String,
    pub mappings: Vec<Mapping>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Layout {
    Nested,
    Expanded,
    Compact,
    Compressed,
}

impl From<OutputStyle> for Layout {
    fn from(style: OutputStyle) -> Self {
        match style {
            OutputStyle::Nested => Layout::Nested,
            OutputStyle::Compact => Layout::Compact,
            OutputStyle::Compressed => Layout::Compressed,
            OutputStyle::Expanded | OutputStyle::Inspect | OutputStyle::Sass => Layout::Expanded,
        }
    }
}

/// Serializes `tree` according to `config`.
pub(crate) fn emit(tree: &CssTree, config: &EmitConfig) -> Result<Emitted> {
    let mut writer = Writer {
        tree,
        config,
        layout: config.style.into(),
        out: String::new(),
        line: 0,
        column: 0,
        mappings: Vec::new(),
    };
    writer.emit_children(None, 0)?;

    let Writer {
        mut out,
        mut mappings,
        layout,
        ..
    } = writer;

    if !out.is_ascii() {
        if layout == Layout::Compressed {
            out.insert(0, '\u{FEFF}');
            for m in mappings.iter_mut().filter(|m| m.generated_line == 0) {
                m.generated_column += 1;
            }
        } else {
            out.insert_str(0, &format!("@charset \"UTF-8\";{}", config.linefeed));
            for m in &mut mappings {
                m.generated_line += 1;
            }
        }
    }
    Ok(Emitted { css: out, mappings })
}

struct Writer<'a> {
    tree: &'a CssTree,
    config: &'a EmitConfig,
    layout: Layout,
    out: String,
    line: usize,
    column: usize,
    mappings: Vec<Mapping>,
}

impl Writer<'_> {
    fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.out.push_str(text);
    }

    fn newline(&mut self) {
        if self.layout != Layout::Compressed {
            let linefeed = self.config.linefeed.clone();
            self.write(&linefeed);
        }
    }

    fn indent(&mut self, level: usize) {
        if self.layout != Layout::Compressed {
            let indent = self.config.indent.repeat(level);
            self.write(&indent);
        }
    }

    fn mark(&mut self, span: Span) {
        self.mappings.push(Mapping {
            generated_line: self.line,
            generated_column: self.column,
            source: span.source,
            original_line: span.pos.line.saturating_sub(1),
            original_column: span.pos.column.saturating_sub(1),
        });
    }

    /// Removes the trailing linefeed so a closing brace can follow on the
    /// same line (nested and compact styles).
    fn pop_linefeed(&mut self) {
        let linefeed = &self.config.linefeed;
        if !linefeed.is_empty() && self.out.ends_with(linefeed.as_str()) {
            let len = self.out.len() - linefeed.len();
            self.out.truncate(len);
            self.line -= linefeed.matches('\n').count();
            let start = self.out.rfind('\n').map(|i| i + 1).unwrap_or(0);
            self.column = self.out[start..].chars().count();
        }
    }

    fn error(&self, span: Span, text: String) -> ScssError {
        let file = self
            .tree
            .sources
            .get(span.source)
            .map(String::as_str)
            .unwrap_or("stdin");
        ScssError::Evaluation(CompileError::new(span.pos, file, text))
    }

    fn compressed(&self) -> bool {
        self.layout == Layout::Compressed
    }

    fn comment_visible(&self, text: &str) -> bool {
        !self.compressed() || text.starts_with("/*!")
    }

    fn is_visible(&self, id: NodeId) -> bool {
        match &self.tree.nodes[id] {
            CssNode::Rule {
                selectors, items, ..
            } => !selectors.without_placeholders().is_empty() && self.has_visible_items(items),
            CssNode::Block {
                children, items, ..
            } => self.has_visible_items(items) || children.iter().any(|c| self.is_visible(*c)),
            CssNode::Directive { .. } => true,
            CssNode::Comment { text, .. } => self.comment_visible(text),
        }
    }

    fn has_visible_items(&self, items: &[RuleItem]) -> bool {
        items.iter().any(|item| match item {
            RuleItem::Declaration(_) => true,
            RuleItem::Comment(text) => self.comment_visible(text),
        })
    }

    fn is_group(&self, id: NodeId) -> bool {
        matches!(
            self.tree.nodes[id],
            CssNode::Rule { .. } | CssNode::Block { .. }
        )
    }

    fn node_depth(&self, id: NodeId) -> usize {
        match &self.tree.nodes[id] {
            CssNode::Rule { depth, .. }
            | CssNode::Block { depth, .. }
            | CssNode::Directive { depth, .. }
            | CssNode::Comment { depth, .. } => *depth,
        }
    }

    /// Emits the visible children of `container` at nesting `level`.
    fn emit_children(&mut self, container: Option<NodeId>, level: usize) -> Result<()> {
        let children: Vec<NodeId> = self
            .tree
            .children(container)
            .iter()
            .copied()
            .filter(|id| self.is_visible(*id))
            .collect();

        let mut previous: Option<NodeId> = None;
        for id in children {
            if let Some(prev) = previous {
                let starts_group = match self.layout {
                    Layout::Compressed => false,
                    Layout::Expanded => level == 0,
                    Layout::Nested | Layout::Compact => level == 0 && self.node_depth(id) == 0,
                };
                if starts_group && self.is_group(prev) {
                    self.newline();
                }
            }
            self.emit_node(id, level)?;
            previous = Some(id);
        }
        Ok(())
    }

    /// Indentation of a node: source depth in nested style, container
    /// level otherwise.
    fn level_for(&self, id: NodeId, level: usize) -> usize {
        match self.layout {
            Layout::Nested => self.node_depth(id),
            _ => level,
        }
    }

    fn emit_node(&mut self, id: NodeId, level: usize) -> Result<()> {
        let tree = self.tree;
        let indent = self.level_for(id, level);
        match &tree.nodes[id] {
            CssNode::Rule {
                selectors,
                items,
                span,
                ..
            } => {
                if self.config.source_comments && !self.compressed() {
                    let file = tree.sources.get(span.source).cloned().unwrap_or_default();
                    self.indent(indent);
                    self.write(&format!("/* line {}, {} */", span.pos.line, file));
                    self.newline();
                }
                self.indent(indent);
                self.mark(*span);
                let selector = selectors.without_placeholders().to_css(self.compressed());
                self.write(&selector);
                self.open_brace();
                self.emit_items(items, indent)?;
                self.close_brace(indent);
            }
            CssNode::Block {
                name,
                params,
                children,
                items,
                span,
                ..
            } => {
                self.indent(indent);
                self.mark(*span);
                self.write(&format!("@{name}"));
                if !params.is_empty() {
                    self.write(" ");
                    self.write(params);
                }
                self.open_brace();
                let has_items = self.has_visible_items(items);
                if has_items {
                    self.emit_items(items, indent)?;
                }
                if children.iter().any(|c| self.is_visible(*c)) {
                    if has_items && self.layout != Layout::Compressed {
                        if self.layout == Layout::Compact {
                            self.write(" ");
                        } else {
                            self.newline();
                        }
                    }
                    if self.layout == Layout::Compact && !has_items {
                        self.newline();
                    }
                    self.emit_children(Some(id), level + 1)?;
                }
                self.close_brace(indent);
            }
            CssNode::Directive {
                name, params, span, ..
            } => {
                self.indent(indent);
                self.mark(*span);
                self.write(&format!("@{name}"));
                if !params.is_empty() {
                    self.write(" ");
                    self.write(params);
                }
                self.write(";");
                self.newline();
            }
            CssNode::Comment { text, span, .. } => {
                self.indent(indent);
                self.mark(*span);
                self.write(text);
                self.newline();
            }
        }
        Ok(())
    }

    fn open_brace(&mut self) {
        match self.layout {
            Layout::Compressed => self.write("{"),
            Layout::Compact => self.write(" {"),
            Layout::Nested | Layout::Expanded => {
                self.write(" {");
                self.newline();
            }
        }
    }

    fn close_brace(&mut self, indent: usize) {
        match self.layout {
            Layout::Compressed => {
                if self.out.ends_with(';') {
                    self.out.pop();
                    self.column -= 1;
                }
                self.write("}");
            }
            Layout::Nested | Layout::Compact => {
                self.pop_linefeed();
                self.write(" }");
                self.newline();
            }
            Layout::Expanded => {
                self.indent(indent);
                self.write("}");
                self.newline();
            }
        }
    }

    fn emit_items(&mut self, items: &[RuleItem], indent: usize) -> Result<()> {
        let compressed = self.compressed();
        for item in items {
            match item {
                RuleItem::Declaration(decl) => {
                    let value = decl
                        .value
                        .to_css(self.config.precision, compressed)
                        .map_err(|e| self.error(decl.span, e))?;
                    let important = if decl.important { " !important" } else { "" };
                    self.item_prefix(indent);
                    self.mark(decl.span);
                    let sep = if compressed { ":" } else { ": " };
                    self.write(&format!("{}{sep}{value}{important};", decl.property));
                    self.item_suffix();
                }
                RuleItem::Comment(text) => {
                    if !self.comment_visible(text) {
                        continue;
                    }
                    self.item_prefix(indent);
                    self.write(text);
                    self.item_suffix();
                }
            }
        }
        Ok(())
    }

    fn item_prefix(&mut self, indent: usize) {
        match self.layout {
            Layout::Nested | Layout::Expanded => self.indent(indent + 1),
            Layout::Compact => self.write(" "),
            Layout::Compressed => {}
        }
    }

    fn item_suffix(&mut self) {
        if matches!(self.layout, Layout::Nested | Layout::Expanded) {
            self.newline();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::Declaration;
    use crate::lexer::Position;
    use crate::selector::SelectorList;
    use crate::value::Value;

    fn span() -> Span {
        Span {
            source: 0,
            pos: Position::START,
        }
    }

    fn rule(tree: &mut CssTree, container: Option<NodeId>, selector: &str, depth: usize, decls: &[(&str, &str)]) -> NodeId {
        let items = decls
            .iter()
            .map(|(p, v)| {
                RuleItem::Declaration(Declaration {
                    property: p.to_string(),
                    value: Value::unquoted(*v),
                    important: false,
                    span: span(),
                })
            })
            .collect();
        tree.push(
            container,
            CssNode::Rule {
                selectors: SelectorList::parse(selector),
                items,
                depth,
                span: span(),
            },
        )
    }

    fn sample() -> CssTree {
        let mut tree = CssTree::default();
        tree.add_source("stdin", "");
        rule(&mut tree, None, "a", 0, &[("color", "red"), ("x", "y")]);
        rule(&mut tree, None, "a b", 1, &[("z", "w")]);
        rule(&mut tree, None, "%p", 0, &[("hidden", "yes")]);
        rule(&mut tree, None, "c", 0, &[]);
        rule(&mut tree, None, "d", 0, &[("k", "v")]);
        tree
    }

    fn render(tree: &CssTree, style: OutputStyle) -> String {
        let config = EmitConfig {
            style,
            precision: 5,
            indent: "  ".into(),
            linefeed: "\n".into(),
            source_comments: false,
        };
        emit(tree, &config).unwrap().css
    }

    #[test]
    fn nested_style() {
        assert_eq!(
            render(&sample(), OutputStyle::Nested),
            "a {\n  color: red;\n  x: y; }\n  a b {\n    z: w; }\n\nd {\n  k: v; }\n"
        );
    }

    #[test]
    fn expanded_style() {
        assert_eq!(
            render(&sample(), OutputStyle::Expanded),
            "a {\n  color: red;\n  x: y;\n}\n\na b {\n  z: w;\n}\n\nd {\n  k: v;\n}\n"
        );
    }

    #[test]
    fn compact_style() {
        assert_eq!(
            render(&sample(), OutputStyle::Compact),
            "a { color: red; x: y; }\na b { z: w; }\n\nd { k: v; }\n"
        );
    }

    #[test]
    fn compressed_style() {
        assert_eq!(
            render(&sample(), OutputStyle::Compressed),
            "a{color:red;x:y}a b{z:w}d{k:v}"
        );
    }

    #[test]
    fn media_block_styles() {
        let mut tree = CssTree::default();
        tree.add_source("stdin", "");
        let media = tree.push(
            None,
            CssNode::Block {
                name: "media".into(),
                params: "screen".into(),
                children: Vec::new(),
                items: Vec::new(),
                depth: 0,
                span: span(),
            },
        );
        rule(&mut tree, Some(media), "a", 1, &[("color", "red")]);
        assert_eq!(
            render(&tree, OutputStyle::Nested),
            "@media screen {\n  a {\n    color: red; } }\n"
        );
        assert_eq!(
            render(&tree, OutputStyle::Expanded),
            "@media screen {\n  a {\n    color: red;\n  }\n}\n"
        );
        assert_eq!(
            render(&tree, OutputStyle::Compressed),
            "@media screen{a{color:red}}"
        );
    }

    #[test]
    fn compressed_drops_plain_comments() {
        let mut tree = CssTree::default();
        tree.add_source("stdin", "");
        tree.push(None, CssNode::Comment { text: "/* a */".into(), depth: 0, span: span() });
        tree.push(None, CssNode::Comment { text: "/*! b */".into(), depth: 0, span: span() });
        assert_eq!(render(&tree, OutputStyle::Compressed), "/*! b */");
        assert_eq!(render(&tree, OutputStyle::Nested), "/* a */\n/*! b */\n");
    }

    #[test]
    fn non_ascii_output_gets_charset() {
        let mut tree = CssTree::default();
        tree.add_source("stdin", "");
        rule(&mut tree, None, "a", 0, &[("content", "\"é\"")]);
        assert!(render(&tree, OutputStyle::Expanded).starts_with("@charset \"UTF-8\";\n"));
        assert!(render(&tree, OutputStyle::Compressed).starts_with('\u{FEFF}'));
    }

    #[test]
    fn mappings_point_at_rules_and_declarations() {
        let tree = sample();
        let config = EmitConfig {
            style: OutputStyle::Expanded,
            precision: 5,
            indent: "  ".into(),
            linefeed: "\n".into(),
            source_comments: false,
        };
        let emitted = emit(&tree, &config).unwrap();
        assert_eq!(emitted.mappings[0].generated_line, 0);
        assert_eq!(emitted.mappings[1].generated_line, 1);
        assert_eq!(emitted.mappings[1].generated_column, 2);
    }
}
