//! Evaluation of a parsed stylesheet into a flat [`CssTree`].
//!
//! The evaluator walks the statement tree of the root unit with a chain of
//! [`scope`]s, evaluates expressions into [`Value`]s, expands mixins and
//! control directives, resolves `@import`s lazily through the
//! [`Resolver`] and flattens nested rules into full selectors.
//!
//! Rule nodes are created when a rule is entered, before any of its
//! children, so a rule's own declarations are emitted ahead of its nested
//! rules. Block at-rules (`@media`, `@supports`, ...) are containers;
//! when one appears inside a rule, declarations inside it are wrapped in a
//! copy of the enclosing selector ("bubbling").

pub(crate) mod builtins;
pub(crate) mod scope;

use std::rc::Rc;

use log::{debug, trace, warn};

use crate::ast::{
    BinaryOp, CallArgs, ControlDirective, Expr, ImportTarget, InterpPart, Interpolation,
    MessageKind, Stmt, StmtKind,
};
use crate::css::{CssNode, CssTree, Declaration, NodeId, RuleItem, Span};
use crate::error::{CompileError, Result, ScssError};
use crate::importer::{CompilationUnit, ImportRecord, Resolution, Resolver};
use crate::lexer::Position;
use crate::selector::SelectorList;
use crate::value::{ListSeparator, Number, SassList, SassMap, SassString, Value, ops};

use builtins::{Args, BUILTINS};
use scope::{Callable, Scope, ScopeRef};

/// Output of a successful evaluation.
#[derive(Debug)]
pub(crate) struct Evaluation {
    pub tree: CssTree,
    pub includes: Vec<ImportRecord>,
}

/// Evaluates `root`, resolving imports through `resolver`.
pub(crate) fn evaluate(
    root: &Rc<CompilationUnit>,
    resolver: &Resolver,
    precision: usize,
) -> Result<Evaluation> {
    let mut tree = CssTree::default();
    let source = tree.add_source(&root.path, &root.source);
    let global = Scope::global();
    let mut evaluator = Evaluator {
        resolver,
        precision,
        tree,
        includes: Vec::new(),
        unit: root.clone(),
        file: Rc::from(root.path.as_str()),
        source,
        scope: global.clone(),
        global,
        container: None,
        rule: None,
        selectors: None,
        media: None,
        in_keyframes: false,
        depth: 0,
        content: Vec::new(),
        in_function: 0,
        property_prefix: None,
        stmt_pos: Position::START,
    };
    evaluator.exec_block(&root.stylesheet.stmts)?;
    Ok(Evaluation {
        tree: evaluator.tree,
        includes: evaluator.includes,
    })
}

/// The `@content` block passed to the mixin currently executing.
#[derive(Clone)]
struct ContentBlock {
    body: Rc<Vec<Stmt>>,
    scope: ScopeRef,
    file: Rc<str>,
}

#[derive(Clone)]
struct MediaContext {
    query: String,
    /// Container holding the `@media` block.
    holder: Option<NodeId>,
    block: NodeId,
}

/// Saved output position, restored when leaving a block.
struct Frame {
    container: Option<NodeId>,
    rule: Option<NodeId>,
    selectors: Option<SelectorList>,
    media: Option<MediaContext>,
    in_keyframes: bool,
    depth: usize,
    scope: ScopeRef,
}

struct Evaluator<'r> {
    resolver: &'r Resolver,
    precision: usize,
    tree: CssTree,
    includes: Vec<ImportRecord>,
    /// Unit whose statements are being evaluated; imports resolve from it.
    unit: Rc<CompilationUnit>,
    /// File reported in errors; differs from `unit` inside mixins.
    file: Rc<str>,
    source: usize,
    global: ScopeRef,
    scope: ScopeRef,
    container: Option<NodeId>,
    rule: Option<NodeId>,
    selectors: Option<SelectorList>,
    media: Option<MediaContext>,
    in_keyframes: bool,
    depth: usize,
    content: Vec<Option<ContentBlock>>,
    in_function: usize,
    property_prefix: Option<String>,
    /// Position of the statement being executed; reported for literal
    /// operands, which carry no position of their own.
    stmt_pos: Position,
}

impl Evaluator<'_> {
    fn error(&self, pos: Position, text: impl Into<String>) -> ScssError {
        ScssError::Evaluation(CompileError::new(pos, &*self.file, text))
    }

    fn span(&self, pos: Position) -> Span {
        Span {
            source: self.source,
            pos,
        }
    }

    fn frame(&self) -> Frame {
        Frame {
            container: self.container,
            rule: self.rule,
            selectors: self.selectors.clone(),
            media: self.media.clone(),
            in_keyframes: self.in_keyframes,
            depth: self.depth,
            scope: self.scope.clone(),
        }
    }

    fn restore(&mut self, frame: Frame) {
        self.container = frame.container;
        self.rule = frame.rule;
        self.selectors = frame.selectors;
        self.media = frame.media;
        self.in_keyframes = frame.in_keyframes;
        self.depth = frame.depth;
        self.scope = frame.scope;
    }

    /// Switches the reported file, returning the previous one.
    fn enter_file(&mut self, file: Rc<str>) -> (Rc<str>, usize) {
        let source = self
            .tree
            .sources
            .iter()
            .position(|s| s.as_str() == &*file)
            .unwrap_or(self.source);
        let previous = (std::mem::replace(&mut self.file, file), self.source);
        self.source = source;
        previous
    }

    fn leave_file(&mut self, (file, source): (Rc<str>, usize)) {
        self.file = file;
        self.source = source;
    }

    /// Runs statements in order; `Some` carries a `@return` value.
    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Option<Value>> {
        for stmt in stmts {
            if let Some(value) = self.exec(stmt)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Runs a control directive body in a fresh semi-global scope.
    fn exec_scoped(&mut self, stmts: &[Stmt], bind: impl FnOnce(&ScopeRef)) -> Result<Option<Value>> {
        let inner = Scope::child(&self.scope, true);
        bind(&inner);
        let outer = std::mem::replace(&mut self.scope, inner);
        let result = self.exec_block(stmts);
        self.scope = outer;
        result
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Option<Value>> {
        let outer = std::mem::replace(&mut self.stmt_pos, stmt.pos);
        let result = self.exec_stmt(stmt);
        self.stmt_pos = outer;
        result
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Option<Value>> {
        let pos = stmt.pos;
        match &stmt.kind {
            StmtKind::RuleBlock { selector, body } => {
                self.reject_in_function(pos)?;
                self.exec_rule(selector, body, pos)?;
            }
            StmtKind::Declaration {
                property,
                value,
                important,
                nested,
            } => {
                self.reject_in_function(pos)?;
                self.exec_declaration(property, value.as_ref(), *important, nested, pos)?;
            }
            StmtKind::AtRule { name, params, body } => {
                self.reject_in_function(pos)?;
                self.exec_at_rule(name, params, body.as_deref(), pos)?;
            }
            StmtKind::Media { query, body } => {
                self.reject_in_function(pos)?;
                self.exec_media(query, body, pos)?;
            }
            StmtKind::VariableAssignment { name, value, flags } => {
                let value = self.eval(value)?;
                scope::set_var(&self.scope, name, value, *flags);
            }
            StmtKind::MixinDef(decl) => scope::set_mixin(
                &self.scope,
                Callable {
                    decl: decl.clone(),
                    closure: self.scope.clone(),
                },
            ),
            StmtKind::FunctionDef(decl) => scope::set_function(
                &self.scope,
                Callable {
                    decl: decl.clone(),
                    closure: self.scope.clone(),
                },
            ),
            StmtKind::Include {
                name,
                args,
                content,
            } => {
                self.reject_in_function(pos)?;
                self.exec_include(name, args, content.as_ref(), pos)?;
            }
            StmtKind::Content => self.exec_content()?,
            StmtKind::Return(expr) => {
                if self.in_function == 0 {
                    return Err(self.error(pos, "@return may only be used within a function."));
                }
                return self.eval(expr).map(Some);
            }
            StmtKind::Control(directive) => return self.exec_control(directive),
            StmtKind::Import(targets) => {
                for target in targets {
                    self.exec_import(target, pos)?;
                }
            }
            StmtKind::Message { kind, value } => self.exec_message(*kind, value, pos)?,
            StmtKind::Unsupported(name) => {
                return Err(self.error(pos, format!("@{name} is not supported")));
            }
            StmtKind::Comment(text) => {
                if self.in_function == 0 {
                    self.add_comment(text, pos);
                }
            }
        }
        Ok(None)
    }

    fn reject_in_function(&self, pos: Position) -> Result<()> {
        if self.in_function > 0 {
            return Err(self.error(
                pos,
                "Functions can only contain variable declarations and control directives.",
            ));
        }
        Ok(())
    }

    fn add_comment(&mut self, text: &str, pos: Position) {
        match self.rule {
            Some(rule) => self
                .tree
                .push_item(rule, RuleItem::Comment(text.to_string())),
            None => {
                let span = self.span(pos);
                self.tree.push(
                    self.container,
                    CssNode::Comment {
                        text: text.to_string(),
                        depth: self.depth,
                        span,
                    },
                );
            }
        }
    }

    fn exec_rule(&mut self, selector: &Interpolation, body: &[Stmt], pos: Position) -> Result<()> {
        let text = self.eval_interpolation(selector)?;
        let parsed = SelectorList::parse(text.trim());
        let resolved = if self.in_keyframes {
            parsed
        } else {
            parsed
                .resolve(self.selectors.as_ref())
                .map_err(|e| self.error(pos, e))?
        };

        let span = self.span(pos);
        let id = self.tree.push(
            self.container,
            CssNode::Rule {
                selectors: resolved.clone(),
                items: Vec::new(),
                depth: self.depth,
                span,
            },
        );

        let frame = self.frame();
        self.rule = Some(id);
        self.selectors = Some(resolved);
        self.depth += 1;
        self.scope = Scope::child(&frame.scope, false);
        let result = self.exec_block(body);
        self.restore(frame);
        result.map(|_| ())
    }

    /// Rule or block receiving declarations at the current position.
    fn declaration_target(&mut self, pos: Position) -> Result<NodeId> {
        if let Some(rule) = self.rule {
            return Ok(rule);
        }
        if let Some(selectors) = &self.selectors {
            let span = self.span(pos);
            let id = self.tree.push(
                self.container,
                CssNode::Rule {
                    selectors: selectors.clone(),
                    items: Vec::new(),
                    depth: self.depth,
                    span,
                },
            );
            self.rule = Some(id);
            return Ok(id);
        }
        if let Some(container) = self.container {
            return Ok(container);
        }
        Err(self.error(
            pos,
            "Properties are only allowed within rules, directives, mixin includes, or other properties.",
        ))
    }

    fn exec_declaration(
        &mut self,
        property: &Interpolation,
        value: Option<&Expr>,
        important: bool,
        nested: &[Stmt],
        pos: Position,
    ) -> Result<()> {
        let name = self.eval_interpolation(property)?;
        let name = name.trim();
        let full = match &self.property_prefix {
            Some(prefix) => format!("{prefix}-{name}"),
            None => name.to_string(),
        };

        if let Some(expr) = value {
            let value = self.eval_css_value(expr)?;
            let css = value
                .to_css(self.precision, false)
                .map_err(|e| self.error(pos, e))?;
            if !css.is_empty() || important {
                let target = self.declaration_target(pos)?;
                let span = self.span(pos);
                self.tree.push_item(
                    target,
                    RuleItem::Declaration(Declaration {
                        property: full.clone(),
                        value,
                        important,
                        span,
                    }),
                );
            }
        } else if nested.is_empty() {
            self.declaration_target(pos)?;
        }

        if !nested.is_empty() {
            let outer = self.property_prefix.replace(full);
            let result = self.exec_block(nested);
            self.property_prefix = outer;
            result?;
        }
        Ok(())
    }

    fn exec_at_rule(
        &mut self,
        name: &str,
        params: &Interpolation,
        body: Option<&[Stmt]>,
        pos: Position,
    ) -> Result<()> {
        let lower = name.to_ascii_lowercase();
        if lower == "charset" {
            return Ok(());
        }
        let params = self.eval_interpolation(params)?;
        let params = params.trim().to_string();
        let span = self.span(pos);

        let Some(body) = body else {
            self.tree.push(
                self.container,
                CssNode::Directive {
                    name: name.to_string(),
                    params,
                    depth: self.depth,
                    span,
                },
            );
            return Ok(());
        };

        let id = self.tree.push(
            self.container,
            CssNode::Block {
                name: name.to_string(),
                params,
                children: Vec::new(),
                items: Vec::new(),
                depth: self.depth,
                span,
            },
        );
        let frame = self.frame();
        self.container = Some(id);
        self.rule = None;
        self.depth += 1;
        self.scope = Scope::child(&frame.scope, false);
        if lower.ends_with("keyframes") {
            self.selectors = None;
            self.in_keyframes = true;
        }
        let result = self.exec_block(body);
        self.restore(frame);
        result.map(|_| ())
    }

    fn exec_media(&mut self, query: &Interpolation, body: &[Stmt], pos: Position) -> Result<()> {
        let query = self.eval_interpolation(query)?;
        let query = query.split_whitespace().collect::<Vec<_>>().join(" ");

        let (query, holder) = match &self.media {
            Some(outer) if self.container == Some(outer.block) => {
                (format!("{} and {}", outer.query, query), outer.holder)
            }
            _ => (query, self.container),
        };
        trace!("@media {query}");

        let span = self.span(pos);
        let id = self.tree.push(
            holder,
            CssNode::Block {
                name: "media".to_string(),
                params: query.clone(),
                children: Vec::new(),
                items: Vec::new(),
                depth: self.depth,
                span,
            },
        );
        let frame = self.frame();
        self.media = Some(MediaContext {
            query,
            holder,
            block: id,
        });
        self.container = Some(id);
        self.rule = None;
        self.depth += 1;
        self.scope = Scope::child(&frame.scope, false);
        let result = self.exec_block(body);
        self.restore(frame);
        result.map(|_| ())
    }

    fn exec_include(
        &mut self,
        name: &str,
        args: &CallArgs,
        content: Option<&Rc<Vec<Stmt>>>,
        pos: Position,
    ) -> Result<()> {
        let Some(mixin) = scope::get_mixin(&self.scope, name) else {
            return Err(self.error(pos, format!("no mixin named {name}")));
        };
        trace!("@include {name}");
        let body_scope = self.bind_args(&mixin, args, pos)?;
        let block = content.map(|body| ContentBlock {
            body: body.clone(),
            scope: self.scope.clone(),
            file: self.file.clone(),
        });

        self.content.push(block);
        let outer = std::mem::replace(&mut self.scope, body_scope);
        let file = self.enter_file(mixin.decl.file.clone());
        let result = self.exec_block(&mixin.decl.body);
        self.leave_file(file);
        self.scope = outer;
        self.content.pop();
        result.map(|_| ())
    }

    fn exec_content(&mut self) -> Result<()> {
        let Some(Some(block)) = self.content.last().cloned() else {
            return Ok(());
        };
        // Nested `@content` inside the block refers to the caller's block.
        let saved = self.content.pop();
        let outer = std::mem::replace(&mut self.scope, Scope::child(&block.scope, false));
        let file = self.enter_file(block.file.clone());
        let result = self.exec_block(&block.body);
        self.leave_file(file);
        self.scope = outer;
        if let Some(saved) = saved {
            self.content.push(saved);
        }
        result.map(|_| ())
    }

    fn exec_control(&mut self, directive: &ControlDirective) -> Result<Option<Value>> {
        match directive {
            ControlDirective::If { clauses, otherwise } => {
                for (condition, body) in clauses {
                    if self.eval(condition)?.is_truthy() {
                        return self.exec_scoped(body, |_| {});
                    }
                }
                match otherwise {
                    Some(body) => self.exec_scoped(body, |_| {}),
                    None => Ok(None),
                }
            }
            ControlDirective::Each {
                vars,
                iterable,
                body,
            } => {
                let items = match self.eval(iterable)? {
                    Value::Map(map) => map
                        .iter()
                        .map(|(k, v)| Value::list(vec![k.clone(), v.clone()], ListSeparator::Space))
                        .collect(),
                    other => other.as_list(),
                };
                for item in items {
                    let returned = self.exec_scoped(body, |scope| {
                        if let [var] = vars.as_slice() {
                            scope::declare_var(scope, var, item);
                        } else {
                            let parts = item.as_list();
                            for (i, var) in vars.iter().enumerate() {
                                let value = parts.get(i).cloned().unwrap_or(Value::Null);
                                scope::declare_var(scope, var, value);
                            }
                        }
                    })?;
                    if returned.is_some() {
                        return Ok(returned);
                    }
                }
                Ok(None)
            }
            ControlDirective::For {
                var,
                from,
                to,
                inclusive,
                body,
            } => {
                let start = self.eval_integer(from)?;
                let end = self.eval_integer(to)?;
                let unit = start.unit.clone();
                let (a, b) = (start.value as i128, end.value as i128);
                let step = if a <= b { 1 } else { -1 };
                let last = if *inclusive { b } else { b - step };
                let mut i = a;
                while (step > 0 && i <= last) || (step < 0 && i >= last) {
                    let value = Value::Number(Number::new(i as f64, unit.clone()));
                    let returned =
                        self.exec_scoped(body, |scope| scope::declare_var(scope, var, value))?;
                    if returned.is_some() {
                        return Ok(returned);
                    }
                    i += step;
                }
                Ok(None)
            }
            ControlDirective::While { condition, body } => {
                while self.eval(condition)?.is_truthy() {
                    let returned = self.exec_scoped(body, |_| {})?;
                    if returned.is_some() {
                        return Ok(returned);
                    }
                }
                Ok(None)
            }
        }
    }

    fn eval_integer(&mut self, expr: &Expr) -> Result<Number> {
        match self.eval(expr)? {
            Value::Number(n) if n.is_int() => Ok(n),
            other => Err(self.error(
                self.expr_pos(expr),
                format!("{} is not an integer.", other.inspect(self.precision)),
            )),
        }
    }

    fn exec_import(&mut self, target: &ImportTarget, pos: Position) -> Result<()> {
        match target {
            ImportTarget::Css(text) => {
                let params = self.eval_interpolation(text)?;
                self.push_css_import(params, pos);
            }
            ImportTarget::Stylesheet {
                reference,
                pos: at,
            } => match self.resolver.resolve(reference, &self.unit, *at)? {
                Resolution::Css(params) => self.push_css_import(params, pos),
                Resolution::Unit(unit, record) => {
                    debug!("importing {}", unit.path);
                    self.includes.push(record);
                    let source = self.tree.add_source(&unit.path, &unit.source);
                    let outer_unit = std::mem::replace(&mut self.unit, unit.clone());
                    let outer_file = std::mem::replace(&mut self.file, Rc::from(unit.path.as_str()));
                    let outer_source = std::mem::replace(&mut self.source, source);
                    let result = self.exec_block(&unit.stylesheet.stmts);
                    self.unit = outer_unit;
                    self.file = outer_file;
                    self.source = outer_source;
                    result?;
                }
            },
        }
        Ok(())
    }

    fn push_css_import(&mut self, params: String, pos: Position) {
        let span = self.span(pos);
        self.tree.push(
            self.container,
            CssNode::Directive {
                name: "import".to_string(),
                params,
                depth: self.depth,
                span,
            },
        );
    }

    fn exec_message(&mut self, kind: MessageKind, value: &Expr, pos: Position) -> Result<()> {
        let text = match self.eval(value)? {
            Value::String(s) => s.text,
            other => other.inspect(self.precision),
        };
        match kind {
            MessageKind::Warn => warn!(
                "{text}\n         on line {} of {}",
                pos.line, self.file
            ),
            MessageKind::Debug => debug!("{}:{} DEBUG: {text}", self.file, pos.line),
            MessageKind::Error => return Err(self.error(pos, text)),
        }
        Ok(())
    }

    fn eval_interpolation(&mut self, interp: &Interpolation) -> Result<String> {
        let mut out = String::new();
        for part in &interp.parts {
            match part {
                InterpPart::Text(text) => out.push_str(text),
                InterpPart::Expr(expr) => {
                    let value = self.eval(expr)?;
                    out.push_str(&value.interpolate_text(self.precision));
                }
            }
        }
        Ok(out)
    }

    /// Evaluates a declaration value, where `12px/1.5` between two
    /// number literals is a separator rather than a division.
    fn eval_css_value(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Binary {
                op: BinaryOp::Div,
                lhs,
                rhs,
                ..
            } => match (lhs.as_ref(), rhs.as_ref()) {
                (Expr::Literal(Value::Number(a)), Expr::Literal(Value::Number(b))) => {
                    Ok(Value::unquoted(format!(
                        "{}/{}",
                        a.format(self.precision, false),
                        b.format(self.precision, false)
                    )))
                }
                _ => self.eval(expr),
            },
            Expr::List {
                items,
                separator,
                bracketed,
            } => {
                let items = items
                    .iter()
                    .map(|item| self.eval_css_value(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(SassList {
                    items,
                    separator: *separator,
                    bracketed: *bracketed,
                }))
            }
            _ => self.eval(expr),
        }
    }

    fn expr_pos(&self, expr: &Expr) -> Position {
        match expr {
            Expr::Variable { pos, .. }
            | Expr::Binary { pos, .. }
            | Expr::Unary { pos, .. }
            | Expr::Map { pos, .. }
            | Expr::Call { pos, .. } => *pos,
            Expr::Paren(inner) => self.expr_pos(inner),
            Expr::List { items, .. } => items
                .first()
                .map(|item| self.expr_pos(item))
                .unwrap_or(self.stmt_pos),
            Expr::Literal(_) | Expr::String { .. } => self.stmt_pos,
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::String { text, quoted } => Ok(Value::String(SassString {
                text: self.eval_interpolation(text)?,
                quoted: *quoted,
            })),
            Expr::Variable { name, pos } => scope::get_var(&self.scope, name)
                .ok_or_else(|| self.error(*pos, format!("Undefined variable: \"${name}\"."))),
            Expr::Binary { op, lhs, rhs, pos } => {
                let left = self.eval(lhs)?;
                match op {
                    BinaryOp::And if !left.is_truthy() => return Ok(left),
                    BinaryOp::Or if left.is_truthy() => return Ok(left),
                    _ => {}
                }
                let right = self.eval(rhs)?;
                ops::binary(*op, &left, &right, self.precision).map_err(|e| self.error(*pos, e))
            }
            Expr::Unary { op, operand, .. } => {
                let value = self.eval(operand)?;
                Ok(ops::unary(*op, &value, self.precision))
            }
            Expr::List {
                items,
                separator,
                bracketed,
            } => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(SassList {
                    items,
                    separator: *separator,
                    bracketed: *bracketed,
                }))
            }
            Expr::Map { entries, .. } => {
                let mut map = SassMap::new();
                for (key, value) in entries {
                    let key = self.eval(key)?;
                    let value = self.eval(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            Expr::Call { name, args, pos } => self.eval_call(name, args, *pos),
            Expr::Paren(inner) => self.eval(inner),
        }
    }

    fn eval_call(&mut self, name: &str, args: &CallArgs, pos: Position) -> Result<Value> {
        if let Some(function) = scope::get_function(&self.scope, name) {
            return self.call_function(&function, args, pos);
        }

        let key = scope::normalize(name);
        match key.as_str() {
            "if" => return self.eval_if(args, pos),
            "variable-exists" | "global-variable-exists" | "function-exists" | "mixin-exists" => {
                let values = self.eval_positional(args)?;
                let Some(Value::String(target)) = values.into_iter().next() else {
                    return Err(self.error(pos, format!("{key}() requires a name string.")));
                };
                let exists = match key.as_str() {
                    "variable-exists" => scope::get_var(&self.scope, &target.text).is_some(),
                    "global-variable-exists" => {
                        scope::global_var_exists(&self.global, &target.text)
                    }
                    "function-exists" => {
                        scope::get_function(&self.scope, &target.text).is_some()
                            || BUILTINS.contains_key(scope::normalize(&target.text).as_str())
                    }
                    _ => scope::get_mixin(&self.scope, &target.text).is_some(),
                };
                return Ok(Value::Bool(exists));
            }
            _ => {}
        }

        let Some(builtin) = BUILTINS.get(key.as_str()) else {
            return self.plain_css_call(name, args);
        };
        let mut positional = self.eval_positional(args)?;
        let mut values: Vec<Option<Value>> = vec![None; builtin.params.len()];
        let variadic = builtin
            .params
            .last()
            .is_some_and(|p| p.ends_with("..."));
        let fixed = builtin.params.len() - usize::from(variadic);

        if variadic {
            let rest = positional.split_off(fixed.min(positional.len()));
            if let Some(slot) = values.last_mut() {
                *slot = Some(match <[Value; 1]>::try_from(rest) {
                    Ok([single]) => single,
                    Err(rest) => Value::list(rest, ListSeparator::Comma),
                });
            }
        } else if positional.len() > fixed {
            return Err(self.error(
                pos,
                format!(
                    "Only {fixed} arguments allowed, but {} were passed.",
                    positional.len()
                ),
            ));
        }
        for (slot, value) in values.iter_mut().zip(positional) {
            *slot = Some(value);
        }
        for (param, expr) in &args.keyword {
            let param = scope::normalize(param);
            let Some(idx) = builtin
                .params
                .iter()
                .position(|p| p.trim_end_matches("...") == param)
            else {
                return Err(self.error(pos, format!("No argument named ${param}.")));
            };
            values[idx] = Some(self.eval(expr)?);
        }

        let bound = Args {
            names: builtin.params,
            values,
            precision: self.precision,
        };
        let result = (builtin.func)(&bound).map_err(|e| self.error(pos, e))?;
        self.check_result(result, pos)
    }

    /// Turns `Error`/`Warning` results into errors and logged warnings.
    fn check_result(&self, value: Value, pos: Position) -> Result<Value> {
        match value {
            Value::Error(message) => Err(self.error(pos, message)),
            Value::Warning(message) => {
                warn!("{message}\n         on line {} of {}", pos.line, self.file);
                Ok(Value::Null)
            }
            other => Ok(other),
        }
    }

    fn eval_positional(&mut self, args: &CallArgs) -> Result<Vec<Value>> {
        let mut values = args
            .positional
            .iter()
            .map(|expr| self.eval(expr))
            .collect::<Result<Vec<_>>>()?;
        if let Some(rest) = &args.rest {
            values.extend(self.eval(rest)?.as_list());
        }
        Ok(values)
    }

    fn eval_if(&mut self, args: &CallArgs, pos: Position) -> Result<Value> {
        let mut slots: [Option<&Expr>; 3] = [None; 3];
        for (slot, expr) in slots.iter_mut().zip(&args.positional) {
            *slot = Some(expr);
        }
        for (name, expr) in &args.keyword {
            let idx = match scope::normalize(name).as_str() {
                "condition" => 0,
                "if-true" => 1,
                "if-false" => 2,
                other => return Err(self.error(pos, format!("No argument named ${other}."))),
            };
            slots[idx] = Some(expr);
        }
        let [Some(condition), Some(if_true), Some(if_false)] = slots else {
            return Err(self.error(pos, "if() requires $condition, $if-true and $if-false."));
        };
        if self.eval(condition)?.is_truthy() {
            self.eval(if_true)
        } else {
            self.eval(if_false)
        }
    }

    /// Unknown functions are passed through as CSS: `foo(1px, red)`.
    fn plain_css_call(&mut self, name: &str, args: &CallArgs) -> Result<Value> {
        let mut parts = Vec::new();
        for value in self.eval_positional(args)? {
            parts.push(self.css_text(&value));
        }
        for (param, expr) in &args.keyword {
            let value = self.eval(expr)?;
            parts.push(format!("${param}: {}", self.css_text(&value)));
        }
        Ok(Value::unquoted(format!("{name}({})", parts.join(", "))))
    }

    fn css_text(&self, value: &Value) -> String {
        value
            .to_css(self.precision, false)
            .unwrap_or_else(|_| value.inspect(self.precision))
    }

    /// Binds call arguments into a new scope under the callable's closure.
    fn bind_args(&mut self, callable: &Callable, args: &CallArgs, pos: Position) -> Result<ScopeRef> {
        let decl = &callable.decl;
        let mut positional = args
            .positional
            .iter()
            .map(|expr| self.eval(expr))
            .collect::<Result<Vec<_>>>()?;
        let mut keyword: Vec<(String, Value)> = Vec::new();
        for (name, expr) in &args.keyword {
            keyword.push((scope::normalize(name), self.eval(expr)?));
        }
        if let Some(rest) = &args.rest {
            match self.eval(rest)? {
                Value::Map(map) => {
                    for (key, value) in map.iter() {
                        let name = match key {
                            Value::String(s) => s.text.clone(),
                            other => other.inspect(self.precision),
                        };
                        keyword.push((scope::normalize(&name), value.clone()));
                    }
                }
                other => positional.extend(other.as_list()),
            }
        }

        if decl.rest.is_none() && positional.len() > decl.params.len() {
            return Err(self.error(
                pos,
                format!(
                    "Only {} arguments allowed, but {} were passed.",
                    decl.params.len(),
                    positional.len()
                ),
            ));
        }

        let scope = Scope::child(&callable.closure, false);
        let mut positional = positional.into_iter();
        for param in &decl.params {
            let key = scope::normalize(&param.name);
            let value = if let Some(value) = positional.next() {
                value
            } else if let Some(idx) = keyword.iter().position(|(name, _)| *name == key) {
                keyword.remove(idx).1
            } else if let Some(default) = &param.default {
                // Defaults may refer to earlier parameters.
                let outer = std::mem::replace(&mut self.scope, scope.clone());
                let value = self.eval(default);
                self.scope = outer;
                value?
            } else {
                return Err(self.error(pos, format!("Missing argument ${}.", param.name)));
            };
            scope::declare_var(&scope, &param.name, value);
        }

        if let Some(rest) = &decl.rest {
            let extra: Vec<Value> = positional.collect();
            scope::declare_var(&scope, rest, Value::list(extra, ListSeparator::Comma));
        } else if let Some((name, _)) = keyword.first() {
            return Err(self.error(pos, format!("No argument named ${name}.")));
        }
        Ok(scope)
    }

    fn call_function(&mut self, function: &Callable, args: &CallArgs, pos: Position) -> Result<Value> {
        trace!("calling function {}", function.decl.name);
        let body_scope = self.bind_args(function, args, pos)?;
        let outer = std::mem::replace(&mut self.scope, body_scope);
        let file = self.enter_file(function.decl.file.clone());
        self.in_function += 1;
        let result = self.exec_block(&function.decl.body);
        self.in_function -= 1;
        self.leave_file(file);
        self.scope = outer;

        match result? {
            Some(value) => self.check_result(value, pos),
            None => Err(self.error(
                pos,
                format!("Function {} finished without @return", function.decl.name),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::ResolverConfig;

    fn run(source: &str) -> Result<Evaluation> {
        let unit = CompilationUnit::parse("stdin".into(), source.into(), false, None, None)?;
        let resolver = Resolver::new(ResolverConfig::default());
        evaluate(&unit, &resolver, 5)
    }

    fn declarations(eval: &Evaluation) -> Vec<(String, String, String)> {
        let mut out = Vec::new();
        for node in &eval.tree.nodes {
            if let CssNode::Rule {
                selectors, items, ..
            } = node
            {
                for item in items {
                    if let RuleItem::Declaration(decl) = item {
                        out.push((
                            selectors.to_css(false),
                            decl.property.clone(),
                            decl.value.to_css(5, false).unwrap(),
                        ));
                    }
                }
            }
        }
        out
    }

    fn decl(sel: &str, prop: &str, value: &str) -> (String, String, String) {
        (sel.to_string(), prop.to_string(), value.to_string())
    }

    #[test]
    fn nested_rules_flatten() {
        let eval = run("a { color: red; b { x: 1px + 2px; } &:hover { y: z } }").unwrap();
        assert_eq!(
            declarations(&eval),
            vec![
                decl("a", "color", "red"),
                decl("a b", "x", "3px"),
                decl("a:hover", "y", "z"),
            ]
        );
    }

    #[test]
    fn mixins_with_defaults_and_content() {
        let eval = run(
            "@mixin m($a, $b: $a * 2) { w: $a; h: $b; @content; }\n\
             .x { @include m(1px) { c: d; } }",
        )
        .unwrap();
        assert_eq!(
            declarations(&eval),
            vec![decl(".x", "w", "1px"), decl(".x", "h", "2px"), decl(".x", "c", "d")]
        );
    }

    #[test]
    fn functions_and_control_flow() {
        let eval = run(
            "@function double($n) { @return $n * 2; }\n\
             @for $i from 1 through 2 { .m-#{$i} { m: double($i) } }",
        )
        .unwrap();
        assert_eq!(
            declarations(&eval),
            vec![decl(".m-1", "m", "2"), decl(".m-2", "m", "4")]
        );
    }

    #[test]
    fn each_destructures_maps() {
        let eval = run("@each $k, $v in (a: 1, b: 2) { .#{$k} { v: $v } }").unwrap();
        assert_eq!(declarations(&eval), vec![decl(".a", "v", "1"), decl(".b", "v", "2")]);
    }

    #[test]
    fn slash_between_literals_is_kept() {
        let eval = run("a { font: 12px/1.5 serif; w: (10px/2); }").unwrap();
        assert_eq!(
            declarations(&eval),
            vec![decl("a", "font", "12px/1.5 serif"), decl("a", "w", "5px")]
        );
    }

    #[test]
    fn undefined_variable_is_reported_at_its_position() {
        let err = run("a {\n  b: $nope;\n}").unwrap_err();
        let ScssError::Evaluation(err) = err else {
            panic!("expected an evaluation error");
        };
        assert_eq!((err.line, err.column), (2, 6));
        assert_eq!(err.error_text, "Undefined variable: \"$nope\".");
    }

    #[test]
    fn top_level_declaration_is_rejected() {
        let err = run("color: red;").unwrap_err();
        assert!(err.error_text().starts_with("Properties are only allowed"));
    }

    #[test]
    fn error_directive_fails() {
        let err = run("@error \"boom\";").unwrap_err();
        assert!(matches!(err, ScssError::Evaluation(_)));
        assert_eq!(err.error_text(), "boom");
    }

    #[test]
    fn extend_is_unsupported() {
        let err = run("a { @extend .b; }").unwrap_err();
        assert_eq!(err.error_text(), "@extend is not supported");
    }

    #[test]
    fn unknown_functions_pass_through() {
        let eval = run("a { t: translate(1px, 2px); }").unwrap();
        assert_eq!(declarations(&eval), vec![decl("a", "t", "translate(1px, 2px)")]);
    }

    #[test]
    fn global_flag_escapes_mixin() {
        let eval = run("$x: 1; @mixin m { $x: 2 !global; } @include m; a { x: $x; }").unwrap();
        assert_eq!(declarations(&eval), vec![decl("a", "x", "2")]);
    }

    #[test]
    fn media_bubbles_out_of_rules() {
        let eval = run("a { @media screen { color: red; } }").unwrap();
        let media = eval.tree.root[1];
        let CssNode::Block { name, params, children, .. } = &eval.tree.nodes[media] else {
            panic!("expected a media block");
        };
        assert_eq!((name.as_str(), params.as_str()), ("media", "screen"));
        assert_eq!(children.len(), 1);
        assert_eq!(declarations(&eval), vec![decl("a", "color", "red")]);
    }

    #[test]
    fn missing_function_return() {
        let err = run("@function f() { $a: 1; } a { b: f(); }").unwrap_err();
        assert_eq!(err.error_text(), "Function f finished without @return");
    }
}
