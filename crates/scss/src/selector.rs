//! Selector parsing, nesting resolution and serialization.
//!
//! Selectors are parsed after interpolation has been evaluated, so the
//! parser works on plain text. Nesting is resolved by combining every
//! parent complex selector with every child complex selector:
//!
//! ```css
//! .a, .b {
//!     &:hover { ... }     /* .a:hover, .b:hover */
//!     > p { ... }         /* .a > p, .b > p */
//!     span { ... }        /* .a span, .b span */
//!     &-title { ... }     /* .a-title, .b-title */
//! }
//! ```
//!
//! Text that does not parse as a selector is carried through verbatim as
//! [`Selector::Raw`].

use std::fmt::Write as _;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, opt, recognize, verify},
    multi::many0,
    sequence::{pair, preceded, tuple},
};

use crate::lexer::{is_name_char, is_name_start};

/// A simple selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    Type(String),
    Universal,
    Class(String),
    Id(String),
    /// `%name`; matched only through `@extend`, never emitted.
    Placeholder(String),
    /// Pseudo-class or pseudo-element, including colons and arguments.
    Pseudo(String),
    /// Attribute selector contents between the brackets.
    Attribute(String),
    /// `&`, with an optional suffix (`&-title`).
    Parent(Option<String>),
    /// Keyframe selectors such as `50%`.
    Percentage(String),
    Raw(String),
}

impl Selector {
    fn write_css(&self, out: &mut String) {
        match self {
            Selector::Type(name) | Selector::Percentage(name) | Selector::Raw(name) => {
                out.push_str(name)
            }
            Selector::Universal => out.push('*'),
            Selector::Class(name) => {
                let _ = write!(out, ".{name}");
            }
            Selector::Id(name) => {
                let _ = write!(out, "#{name}");
            }
            Selector::Placeholder(name) => {
                let _ = write!(out, "%{name}");
            }
            Selector::Pseudo(text) => out.push_str(text),
            Selector::Attribute(text) => {
                let _ = write!(out, "[{text}]");
            }
            Selector::Parent(suffix) => {
                out.push('&');
                if let Some(suffix) = suffix {
                    out.push_str(suffix);
                }
            }
        }
    }

    fn append_suffix(&mut self, suffix: &str) -> bool {
        match self {
            Selector::Type(name)
            | Selector::Class(name)
            | Selector::Id(name)
            | Selector::Placeholder(name)
            | Selector::Pseudo(name)
            | Selector::Raw(name) => {
                name.push_str(suffix);
                true
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    pub selectors: Vec<Selector>,
}

impl CompoundSelector {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }

    fn parent_ref(&self) -> Option<usize> {
        self.selectors
            .iter()
            .position(|s| matches!(s, Selector::Parent(_)))
    }
}

/// Relationship between a compound selector and the one after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    /// No following compound: the end of the selector.
    None,
    /// Whitespace.
    Descendant,
    /// `>`
    Child,
    /// `+`
    AdjacentSibling,
    /// `~`
    GeneralSibling,
}

impl Combinator {
    fn symbol(self) -> Option<char> {
        match self {
            Combinator::Child => Some('>'),
            Combinator::AdjacentSibling => Some('+'),
            Combinator::GeneralSibling => Some('~'),
            Combinator::None | Combinator::Descendant => None,
        }
    }
}

/// A compound selector and the combinator that follows it. A leading
/// combinator (`> p` inside a rule) is an empty compound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorPart {
    pub compound: CompoundSelector,
    pub combinator: Combinator,
}

impl SelectorPart {
    pub fn new(compound: CompoundSelector, combinator: Combinator) -> Self {
        Self {
            compound,
            combinator,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<SelectorPart>,
}

impl ComplexSelector {
    pub fn new(parts: Vec<SelectorPart>) -> Self {
        Self { parts }
    }

    fn has_parent_ref(&self) -> bool {
        self.parts.iter().any(|p| p.compound.parent_ref().is_some())
    }

    fn has_leading_combinator(&self) -> bool {
        self.parts
            .first()
            .is_some_and(|p| p.compound.selectors.is_empty())
    }

    fn has_placeholder(&self) -> bool {
        self.parts.iter().any(|p| {
            p.compound
                .selectors
                .iter()
                .any(|s| matches!(s, Selector::Placeholder(_)))
        })
    }

    pub fn to_css(&self, compressed: bool) -> String {
        let mut out = String::new();
        for part in &self.parts {
            for simple in &part.compound.selectors {
                simple.write_css(&mut out);
            }
            match (part.combinator.symbol(), part.combinator) {
                (Some(sym), _) => {
                    if compressed {
                        out.push(sym);
                    } else {
                        if !part.compound.selectors.is_empty() {
                            out.push(' ');
                        }
                        out.push(sym);
                        out.push(' ');
                    }
                }
                (None, Combinator::Descendant) => out.push(' '),
                (None, _) => {}
            }
        }
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    pub fn new(selectors: Vec<ComplexSelector>) -> Self {
        Self { selectors }
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Parses selector text; unparseable selectors become [`Selector::Raw`].
    pub fn parse(text: &str) -> Self {
        match parse_selector_list(text) {
            Ok((rest, list)) if rest.trim().is_empty() => list,
            _ => {
                let selectors = split_top_level(text)
                    .into_iter()
                    .map(|raw| {
                        ComplexSelector::new(vec![SelectorPart::new(
                            CompoundSelector::new(vec![Selector::Raw(raw.to_string())]),
                            Combinator::None,
                        )])
                    })
                    .collect();
                Self::new(selectors)
            }
        }
    }

    /// Resolves `self` nested inside `parent` (or at the top level when
    /// `parent` is `None`).
    pub fn resolve(&self, parent: Option<&SelectorList>) -> Result<SelectorList, String> {
        let Some(parent) = parent else {
            if self.selectors.iter().any(ComplexSelector::has_parent_ref) {
                return Err(
                    "Base-level rules cannot contain the parent-selector-referencing character '&'."
                        .to_string(),
                );
            }
            return Ok(self.clone());
        };

        let mut combined = Vec::new();
        for p in &parent.selectors {
            for c in &self.selectors {
                combined.push(combine(p, c)?);
            }
        }
        Ok(SelectorList::new(combined))
    }

    /// Drops complex selectors that contain a placeholder.
    pub fn without_placeholders(&self) -> SelectorList {
        SelectorList::new(
            self.selectors
                .iter()
                .filter(|s| !s.has_placeholder())
                .cloned()
                .collect(),
        )
    }

    pub fn to_css(&self, compressed: bool) -> String {
        let sep = if compressed { "," } else { ", " };
        self.selectors
            .iter()
            .map(|s| s.to_css(compressed))
            .collect::<Vec<_>>()
            .join(sep)
    }
}

fn combine(parent: &ComplexSelector, child: &ComplexSelector) -> Result<ComplexSelector, String> {
    if child.has_parent_ref() {
        let mut parts = Vec::new();
        for part in &child.parts {
            let Some(idx) = part.compound.parent_ref() else {
                parts.push(part.clone());
                continue;
            };
            let mut p_parts = parent.parts.clone();
            let Some(last) = p_parts.last_mut() else {
                parts.push(part.clone());
                continue;
            };
            for (i, simple) in part.compound.selectors.iter().enumerate() {
                match simple {
                    Selector::Parent(Some(suffix)) if i == idx => {
                        let appended = last
                            .compound
                            .selectors
                            .last_mut()
                            .is_some_and(|s| s.append_suffix(suffix));
                        if !appended {
                            return Err(format!(
                                "Invalid parent selector for \"&{suffix}\": \"{}\"",
                                parent.to_css(false)
                            ));
                        }
                    }
                    Selector::Parent(_) => {}
                    other => last.compound.selectors.push(other.clone()),
                }
            }
            last.combinator = part.combinator;
            parts.extend(p_parts);
        }
        return Ok(ComplexSelector::new(parts));
    }

    let mut p_parts = parent.parts.clone();
    let c_parts = &child.parts;
    if child.has_leading_combinator() {
        if let (Some(last), Some(first)) = (p_parts.last_mut(), c_parts.first()) {
            last.combinator = first.combinator;
        }
        p_parts.extend(c_parts.iter().skip(1).cloned());
    } else {
        if let Some(last) = p_parts.last_mut() {
            if last.combinator == Combinator::None {
                last.combinator = Combinator::Descendant;
            }
        }
        p_parts.extend(c_parts.iter().cloned());
    }
    Ok(ComplexSelector::new(p_parts))
}

/// Splits at commas outside parentheses and brackets.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_ident(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while(|c: char| c == '-'),
        verify(take_while1(is_name_char), |s: &str| {
            s.chars().next().is_some_and(|c| is_name_start(c) || c == '-')
        }),
    ))(input)
}

/// Parenthesized argument with balanced nesting, returned with parens.
fn parse_balanced(input: &str) -> IResult<&str, &str> {
    if !input.starts_with('(') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )));
    }
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..=i]));
                }
            }
            _ => {}
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::TakeUntil,
    )))
}

fn parse_attribute(input: &str) -> IResult<&str, Selector> {
    let (rest, _) = char('[')(input)?;
    match rest.find(']') {
        Some(end) => Ok((
            &rest[end + 1..],
            Selector::Attribute(rest[..end].trim().to_string()),
        )),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        ))),
    }
}

fn parse_simple_selector(input: &str) -> IResult<&str, Selector> {
    alt((
        map(preceded(char('#'), parse_ident), |s| Selector::Id(s.to_string())),
        map(preceded(char('.'), parse_ident), |s| {
            Selector::Class(s.to_string())
        }),
        map(preceded(char('%'), parse_ident), |s| {
            Selector::Placeholder(s.to_string())
        }),
        map(
            recognize(tuple((
                char(':'),
                opt(char(':')),
                parse_ident,
                opt(parse_balanced),
            ))),
            |s: &str| Selector::Pseudo(s.to_string()),
        ),
        map(
            preceded(char('&'), opt(take_while1(is_name_char))),
            |suffix: Option<&str>| Selector::Parent(suffix.map(str::to_string)),
        ),
        map(char('*'), |_| Selector::Universal),
        parse_attribute,
        map(
            recognize(tuple((digit1, opt(pair(char('.'), digit1)), char('%')))),
            |s: &str| Selector::Percentage(s.to_string()),
        ),
        map(parse_ident, |s| Selector::Type(s.to_string())),
    ))(input)
}

fn parse_compound_selector(input: &str) -> IResult<&str, CompoundSelector> {
    let (input, first) = parse_simple_selector(input)?;
    let (input, rest) = many0(parse_simple_selector)(input)?;

    let mut selectors = vec![first];
    selectors.extend(rest);
    Ok((input, CompoundSelector::new(selectors)))
}

fn parse_combinator(input: &str) -> IResult<&str, Combinator> {
    alt((
        map(char('>'), |_| Combinator::Child),
        map(char('+'), |_| Combinator::AdjacentSibling),
        map(char('~'), |_| Combinator::GeneralSibling),
    ))(input)
}

fn parse_complex_selector(input: &str) -> IResult<&str, ComplexSelector> {
    let (input, _) = multispace0(input)?;
    let mut parts = Vec::new();

    let (mut input, leading) = opt(parse_combinator)(input)?;
    if let Some(combinator) = leading {
        parts.push(SelectorPart::new(CompoundSelector::default(), combinator));
        input = multispace0(input)?.0;
    }
    let (rest, mut current) = parse_compound_selector(input)?;
    input = rest;

    loop {
        let (rem, ws) = multispace0(input)?;

        if let Ok((after_op, found)) = parse_combinator(rem) {
            let (after_ws, _) = multispace0(after_op)?;
            match parse_compound_selector(after_ws) {
                Ok((next_input, next)) => {
                    parts.push(SelectorPart::new(current, found));
                    current = next;
                    input = next_input;
                    continue;
                }
                Err(_) => break,
            }
        }

        if !ws.is_empty() {
            match parse_compound_selector(rem) {
                Ok((next_input, next)) => {
                    parts.push(SelectorPart::new(current, Combinator::Descendant));
                    current = next;
                    input = next_input;
                    continue;
                }
                Err(_) => break,
            }
        }

        break;
    }

    parts.push(SelectorPart::new(current, Combinator::None));
    Ok((input, ComplexSelector::new(parts)))
}

fn parse_selector_list(input: &str) -> IResult<&str, SelectorList> {
    let (input, first) = parse_complex_selector(input)?;
    let (input, rest) = many0(preceded(
        tuple((multispace0, char(','), multispace0)),
        parse_complex_selector,
    ))(input)?;

    let mut selectors = vec![first];
    selectors.extend(rest);
    Ok((input, SelectorList::new(selectors)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nest(parent: &str, child: &str) -> String {
        let parent = SelectorList::parse(parent);
        SelectorList::parse(child)
            .resolve(Some(&parent))
            .unwrap()
            .to_css(false)
    }

    #[test]
    fn parses_compound_and_combinators() {
        let list = SelectorList::parse("ul > li.item:hover + a ~ b");
        assert_eq!(list.to_css(false), "ul > li.item:hover + a ~ b");
        assert_eq!(list.to_css(true), "ul>li.item:hover+a~b");
    }

    #[test]
    fn descendant_nesting_is_cartesian() {
        assert_eq!(nest(".a, .b", "p, span"), ".a p, .a span, .b p, .b span");
    }

    #[test]
    fn parent_reference_merges_compound() {
        assert_eq!(nest("a", "&:hover"), "a:hover");
        assert_eq!(nest(".btn", "&.active > i"), ".btn.active > i");
        assert_eq!(nest(".a", ".b &"), ".b .a");
    }

    #[test]
    fn parent_suffix_extends_name() {
        assert_eq!(nest(".card", "&-title"), ".card-title");
        assert_eq!(nest(".a .b", "&__x"), ".a .b__x");
    }

    #[test]
    fn leading_combinator_attaches_to_parent() {
        assert_eq!(nest("ul", "> li"), "ul > li");
        assert_eq!(nest("h1", "+ p"), "h1 + p");
    }

    #[test]
    fn top_level_parent_reference_fails() {
        let err = SelectorList::parse("&.x").resolve(None).unwrap_err();
        assert!(err.contains("parent-selector"));
    }

    #[test]
    fn placeholders_are_dropped() {
        let list = SelectorList::parse("%base, .real").without_placeholders();
        assert_eq!(list.to_css(false), ".real");
    }

    #[test]
    fn pseudo_with_arguments() {
        let list = SelectorList::parse("a:not(.b, .c)::before");
        assert_eq!(list.selectors.len(), 1);
        assert_eq!(list.to_css(false), "a:not(.b, .c)::before");
    }

    #[test]
    fn keyframe_percentages() {
        assert_eq!(SelectorList::parse("0%, 50.5%").to_css(true), "0%,50.5%");
    }

    #[test]
    fn attribute_selector() {
        assert_eq!(
            SelectorList::parse("input[type=\"text\"]").to_css(false),
            "input[type=\"text\"]"
        );
    }
}
