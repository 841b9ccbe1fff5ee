//! Runtime values produced by expression evaluation.
//!
//! [`Value`] is a closed sum type; every consumer (operators, builtins,
//! serialization) matches it exhaustively. Values are immutable: all
//! operations build new values.

mod color;
mod number;
pub mod ops;

use std::fmt::Write as _;

pub use color::Color;
pub use number::{Number, Unit, format_float};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ListSeparator {
    #[default]
    Space,
    Comma,
}

impl ListSeparator {
    pub fn name(self) -> &'static str {
        match self {
            ListSeparator::Space => "space",
            ListSeparator::Comma => "comma",
        }
    }

    fn css(self, compressed: bool) -> &'static str {
        match (self, compressed) {
            (ListSeparator::Space, _) => " ",
            (ListSeparator::Comma, false) => ", ",
            (ListSeparator::Comma, true) => ",",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SassString {
    pub text: String,
    pub quoted: bool,
}

impl SassString {
    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    fn to_css(&self) -> String {
        if !self.quoted {
            return self.text.clone();
        }
        let quote = if self.text.contains('"') && !self.text.contains('\'') {
            '\''
        } else {
            '"'
        };
        let mut out = String::with_capacity(self.text.len() + 2);
        out.push(quote);
        let mut chars = self.text.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    out.push('\\');
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                c if c == quote => {
                    out.push('\\');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out.push(quote);
        out
    }
}

#[derive(Clone, Debug, Default)]
pub struct SassList {
    pub items: Vec<Value>,
    pub separator: ListSeparator,
    pub bracketed: bool,
}

impl SassList {
    pub fn new(items: Vec<Value>, separator: ListSeparator) -> Self {
        Self {
            items,
            separator,
            bracketed: false,
        }
    }
}

/// Insertion-ordered map with structurally compared keys.
#[derive(Clone, Debug, Default)]
pub struct SassMap {
    entries: Vec<(Value, Value)>,
}

impl SassMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts `value`, replacing the value of an equal key in place.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(Value, Value)> for SassMap {
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> Self {
        let mut map = SassMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl PartialEq for SassMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|ov| ov == v))
    }
}

/// A value computed at compile time.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    Color(Color),
    String(SassString),
    List(SassList),
    Map(SassMap),
    /// Returned by a function to abort compilation.
    Error(String),
    /// Returned by a function to log a warning; evaluates to null.
    Warning(String),
}

impl Value {
    pub fn number(value: f64) -> Self {
        Value::Number(Number::unitless(value))
    }

    pub fn unquoted(text: impl Into<String>) -> Self {
        Value::String(SassString::unquoted(text))
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Value::String(SassString::quoted(text))
    }

    pub fn list(items: Vec<Value>, separator: ListSeparator) -> Self {
        Value::List(SassList::new(items, separator))
    }

    pub fn empty_list() -> Self {
        Value::list(Vec::new(), ListSeparator::Space)
    }

    /// Only `null` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name reported by `type-of()`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Color(_) => "color",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Error(_) => "error",
            Value::Warning(_) => "warning",
        }
    }

    /// The value seen as a list: lists as-is, maps as `key value` pairs,
    /// anything else as a single-element list.
    pub fn as_list(&self) -> Vec<Value> {
        match self {
            Value::List(list) => list.items.clone(),
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| Value::list(vec![k.clone(), v.clone()], ListSeparator::Space))
                .collect(),
            other => vec![other.clone()],
        }
    }

    pub fn separator(&self) -> ListSeparator {
        match self {
            Value::List(list) => list.separator,
            Value::Map(_) => ListSeparator::Comma,
            _ => ListSeparator::Space,
        }
    }

    /// Serializes the value as CSS. Fails for values with no CSS
    /// representation (maps, empty lists, compound units).
    pub fn to_css(&self, precision: usize, compressed: bool) -> Result<String, String> {
        match self {
            Value::Null => Ok(String::new()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => {
                if n.unit.as_single().is_none() && !n.is_unitless() {
                    return Err(format!(
                        "{} isn't a valid CSS value.",
                        n.format(precision, compressed)
                    ));
                }
                Ok(n.format(precision, compressed))
            }
            Value::Color(c) => Ok(c.to_css(precision, compressed)),
            Value::String(s) => Ok(s.to_css()),
            Value::List(list) => {
                if list.items.is_empty() && !list.bracketed {
                    return Err("() isn't a valid CSS value.".to_string());
                }
                let mut parts = Vec::with_capacity(list.items.len());
                for item in list.items.iter().filter(|v| !v.is_null()) {
                    let css = item.to_css(precision, compressed)?;
                    if !css.is_empty() {
                        parts.push(css);
                    }
                }
                let joined = parts.join(list.separator.css(compressed));
                Ok(if list.bracketed {
                    format!("[{joined}]")
                } else {
                    joined
                })
            }
            Value::Map(_) => Err(format!(
                "{} isn't a valid CSS value.",
                self.inspect(precision)
            )),
            Value::Error(msg) | Value::Warning(msg) => Ok(msg.clone()),
        }
    }

    /// Debug representation used by `inspect()`, `@debug` and error
    /// messages.
    pub fn inspect(&self, precision: usize) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Number(n) => n.format(precision, false),
            Value::List(list) if list.items.is_empty() => {
                if list.bracketed { "[]" } else { "()" }.to_string()
            }
            Value::List(list) => {
                let parts: Vec<String> = list
                    .items
                    .iter()
                    .map(|item| match item {
                        Value::List(inner)
                            if inner.items.len() > 1
                                && !inner.bracketed
                                && inner.separator == ListSeparator::Comma =>
                        {
                            format!("({})", item.inspect(precision))
                        }
                        _ => item.inspect(precision),
                    })
                    .collect();
                let joined = parts.join(list.separator.css(false));
                if list.bracketed {
                    format!("[{joined}]")
                } else {
                    joined
                }
            }
            Value::Map(map) => {
                let mut out = String::from("(");
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{}: {}", k.inspect(precision), v.inspect(precision));
                }
                out.push(')');
                out
            }
            other => other
                .to_css(precision, false)
                .unwrap_or_else(|_| String::new()),
        }
    }

    /// Text substituted for `#{...}`: strings lose their quotes and
    /// `null` becomes empty.
    pub fn interpolate_text(&self, precision: usize) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.text.clone(),
            Value::List(list) if !list.items.is_empty() => {
                let parts: Vec<String> = list
                    .items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| v.interpolate_text(precision))
                    .collect();
                parts.join(list.separator.css(false))
            }
            other => other
                .to_css(precision, false)
                .unwrap_or_else(|_| other.inspect(precision)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a == b,
            (Value::String(a), Value::String(b)) => a.text == b.text,
            (Value::List(a), Value::List(b)) => {
                a.items.len() == b.items.len()
                    && a.bracketed == b.bracketed
                    && (a.items.len() <= 1 || a.separator == b.separator)
                    && a.items.iter().zip(&b.items).all(|(x, y)| x == y)
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Map(m), Value::List(l)) | (Value::List(l), Value::Map(m)) => {
                m.is_empty() && l.items.is_empty()
            }
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Warning(a), Value::Warning(b)) => a == b,
            _ => false,
        }
    }
}
