//! The flattened CSS tree produced by evaluation and consumed by the
//! emitter.
//!
//! Nodes live in one arena; containers (the root list and block at-rules
//! such as `@media`) refer to their children by [`NodeId`]. Rules never
//! contain other rules: nesting has already been resolved into full
//! selectors, and `depth` only records the source nesting level used by
//! the nested output style.

use crate::lexer::Position;
use crate::selector::SelectorList;
use crate::value::Value;

pub(crate) type NodeId = usize;

/// Origin of an emitted construct, for source maps and source comments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    /// Index into [`CssTree::sources`].
    pub source: usize,
    pub pos: Position,
}

#[derive(Clone, Debug)]
pub(crate) struct Declaration {
    pub property: String,
    pub value: Value,
    pub important: bool,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub(crate) enum RuleItem {
    Declaration(Declaration),
    Comment(String),
}

#[derive(Clone, Debug)]
pub(crate) enum CssNode {
    Rule {
        selectors: SelectorList,
        items: Vec<RuleItem>,
        depth: usize,
        span: Span,
    },
    /// A block at-rule: `@media`, `@supports`, `@keyframes`, `@font-face`...
    Block {
        name: String,
        params: String,
        children: Vec<NodeId>,
        items: Vec<RuleItem>,
        depth: usize,
        span: Span,
    },
    /// A body-less at-rule such as `@import url(a.css)`.
    Directive {
        name: String,
        params: String,
        depth: usize,
        span: Span,
    },
    Comment {
        text: String,
        depth: usize,
        span: Span,
    },
}

#[derive(Debug, Default)]
pub(crate) struct CssTree {
    pub nodes: Vec<CssNode>,
    pub root: Vec<NodeId>,
    /// Identifiers of every unit that contributed output.
    pub sources: Vec<String>,
    /// Source text of each entry of `sources`.
    pub source_texts: Vec<String>,
}

impl CssTree {
    pub fn add_source(&mut self, path: &str, text: &str) -> usize {
        if let Some(idx) = self.sources.iter().position(|s| s == path) {
            return idx;
        }
        self.sources.push(path.to_string());
        self.source_texts.push(text.to_string());
        self.sources.len() - 1
    }

    /// Appends `node` to `container`, or to the root list.
    pub fn push(&mut self, container: Option<NodeId>, node: CssNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        match container.and_then(|c| self.nodes.get_mut(c)) {
            Some(CssNode::Block { children, .. }) => children.push(id),
            _ => self.root.push(id),
        }
        id
    }

    /// Appends an item to a rule or block at-rule.
    pub fn push_item(&mut self, target: NodeId, item: RuleItem) {
        match self.nodes.get_mut(target) {
            Some(CssNode::Rule { items, .. }) | Some(CssNode::Block { items, .. }) => {
                items.push(item)
            }
            _ => {}
        }
    }

    pub fn children(&self, container: Option<NodeId>) -> &[NodeId] {
        match container.and_then(|c| self.nodes.get(c)) {
            Some(CssNode::Block { children, .. }) => children,
            _ => &self.root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_into_block_and_root() {
        let mut tree = CssTree::default();
        let span = Span {
            source: tree.add_source("stdin", ""),
            pos: Position::START,
        };
        let media = tree.push(
            None,
            CssNode::Block {
                name: "media".into(),
                params: "screen".into(),
                children: Vec::new(),
                items: Vec::new(),
                depth: 0,
                span,
            },
        );
        let rule = tree.push(
            Some(media),
            CssNode::Rule {
                selectors: SelectorList::parse("a"),
                items: Vec::new(),
                depth: 1,
                span,
            },
        );
        assert_eq!(tree.root, vec![media]);
        assert_eq!(tree.children(Some(media)), &[rule]);
        assert_eq!(tree.add_source("stdin", ""), 0);
    }
}
