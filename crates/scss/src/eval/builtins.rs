//! Built-in function library.
//!
//! Every entry declares its parameter names (used for keyword arguments)
//! and a plain `fn` that receives the bound arguments. A trailing `...`
//! on the last parameter collects the remaining positional arguments into
//! a list. `if()` and the `*-exists()` functions need the evaluator and
//! live there instead.

use phf::phf_map;

use crate::value::{Color, ListSeparator, Number, SassMap, Unit, Value};

pub(crate) type BuiltinFn = fn(&Args) -> Result<Value, String>;

pub(crate) struct Builtin {
    pub params: &'static [&'static str],
    pub func: BuiltinFn,
}

pub(crate) static BUILTINS: phf::Map<&'static str, Builtin> = phf_map! {
    // colors
    "rgb" => Builtin { params: &["red", "green", "blue"], func: rgb },
    "rgba" => Builtin { params: &["red", "green", "blue", "alpha"], func: rgba },
    "hsl" => Builtin { params: &["hue", "saturation", "lightness"], func: hsl },
    "hsla" => Builtin { params: &["hue", "saturation", "lightness", "alpha"], func: hsla },
    "red" => Builtin { params: &["color"], func: red },
    "green" => Builtin { params: &["color"], func: green },
    "blue" => Builtin { params: &["color"], func: blue },
    "alpha" => Builtin { params: &["color"], func: alpha },
    "opacity" => Builtin { params: &["color"], func: alpha },
    "mix" => Builtin { params: &["color1", "color2", "weight"], func: mix },
    "lighten" => Builtin { params: &["color", "amount"], func: lighten },
    "darken" => Builtin { params: &["color", "amount"], func: darken },
    "saturate" => Builtin { params: &["color", "amount"], func: saturate },
    "desaturate" => Builtin { params: &["color", "amount"], func: desaturate },
    "adjust-hue" => Builtin { params: &["color", "degrees"], func: adjust_hue },
    "grayscale" => Builtin { params: &["color"], func: grayscale },
    "complement" => Builtin { params: &["color"], func: complement },
    "invert" => Builtin { params: &["color", "weight"], func: invert },
    "transparentize" => Builtin { params: &["color", "amount"], func: transparentize },
    "fade-out" => Builtin { params: &["color", "amount"], func: transparentize },
    "opacify" => Builtin { params: &["color", "amount"], func: opacify },
    "fade-in" => Builtin { params: &["color", "amount"], func: opacify },
    // numbers
    "percentage" => Builtin { params: &["number"], func: percentage },
    "round" => Builtin { params: &["number"], func: round },
    "ceil" => Builtin { params: &["number"], func: ceil },
    "floor" => Builtin { params: &["number"], func: floor },
    "abs" => Builtin { params: &["number"], func: abs },
    "min" => Builtin { params: &["numbers..."], func: min },
    "max" => Builtin { params: &["numbers..."], func: max },
    "unit" => Builtin { params: &["number"], func: unit },
    "unitless" => Builtin { params: &["number"], func: unitless },
    "comparable" => Builtin { params: &["number1", "number2"], func: comparable },
    // lists
    "length" => Builtin { params: &["list"], func: length },
    "nth" => Builtin { params: &["list", "n"], func: nth },
    "join" => Builtin { params: &["list1", "list2", "separator"], func: join },
    "append" => Builtin { params: &["list", "val", "separator"], func: append },
    "index" => Builtin { params: &["list", "value"], func: index },
    "list-separator" => Builtin { params: &["list"], func: list_separator },
    // maps
    "map-get" => Builtin { params: &["map", "key"], func: map_get },
    "map-merge" => Builtin { params: &["map1", "map2"], func: map_merge },
    "map-keys" => Builtin { params: &["map"], func: map_keys },
    "map-values" => Builtin { params: &["map"], func: map_values },
    "map-has-key" => Builtin { params: &["map", "key"], func: map_has_key },
    // introspection
    "type-of" => Builtin { params: &["value"], func: type_of },
    "inspect" => Builtin { params: &["value"], func: inspect },
    // strings
    "quote" => Builtin { params: &["string"], func: quote },
    "unquote" => Builtin { params: &["string"], func: unquote },
    "str-length" => Builtin { params: &["string"], func: str_length },
    "to-upper-case" => Builtin { params: &["string"], func: to_upper_case },
    "to-lower-case" => Builtin { params: &["string"], func: to_lower_case },
    "str-index" => Builtin { params: &["string", "substring"], func: str_index },
    "str-slice" => Builtin { params: &["string", "start-at", "end-at"], func: str_slice },
};

/// Bound arguments of one builtin call.
pub(crate) struct Args {
    pub names: &'static [&'static str],
    pub values: Vec<Option<Value>>,
    pub precision: usize,
}

impl Args {
    fn name(&self, i: usize) -> &'static str {
        self.names
            .get(i)
            .map(|n| n.trim_end_matches("..."))
            .unwrap_or("arg")
    }

    fn get(&self, i: usize) -> Option<&Value> {
        self.values.get(i).and_then(Option::as_ref)
    }

    fn required(&self, i: usize) -> Result<&Value, String> {
        self.get(i)
            .ok_or_else(|| format!("Missing argument ${}.", self.name(i)))
    }

    fn number(&self, i: usize) -> Result<&Number, String> {
        match self.required(i)? {
            Value::Number(n) => Ok(n),
            other => Err(format!(
                "${}: {} is not a number.",
                self.name(i),
                other.inspect(self.precision)
            )),
        }
    }

    fn color(&self, i: usize) -> Result<&Color, String> {
        match self.required(i)? {
            Value::Color(c) => Ok(c),
            other => Err(format!(
                "${}: {} is not a color.",
                self.name(i),
                other.inspect(self.precision)
            )),
        }
    }

    fn string(&self, i: usize) -> Result<(&str, bool), String> {
        match self.required(i)? {
            Value::String(s) => Ok((&s.text, s.quoted)),
            other => Err(format!(
                "${}: {} is not a string.",
                self.name(i),
                other.inspect(self.precision)
            )),
        }
    }

    fn map(&self, i: usize) -> Result<SassMap, String> {
        match self.required(i)? {
            Value::Map(m) => Ok(m.clone()),
            Value::List(l) if l.items.is_empty() => Ok(SassMap::new()),
            other => Err(format!(
                "${}: {} is not a map.",
                self.name(i),
                other.inspect(self.precision)
            )),
        }
    }

    /// A number in `0..=max`, accepting percentages of `max`.
    fn channel(&self, i: usize, max: f64) -> Result<f64, String> {
        let n = self.number(i)?;
        if n.unit.as_single() == Some("%") {
            Ok(n.value * max / 100.0)
        } else {
            Ok(n.value)
        }
    }

    /// A percentage amount in `0..=100`, unit optional.
    fn amount(&self, i: usize) -> Result<f64, String> {
        let n = self.number(i)?;
        if !(0.0..=100.0).contains(&n.value) {
            return Err(format!(
                "Amount {} must be between 0% and 100%.",
                n.format(self.precision, false)
            ));
        }
        Ok(n.value)
    }

    fn alpha_amount(&self, i: usize) -> Result<f64, String> {
        let n = self.number(i)?;
        if !(0.0..=1.0).contains(&n.value) {
            return Err(format!(
                "Amount {} must be between 0 and 1.",
                n.format(self.precision, false)
            ));
        }
        Ok(n.value)
    }

    fn separator(&self, i: usize) -> Result<Option<ListSeparator>, String> {
        match self.get(i) {
            None => Ok(None),
            Some(Value::String(s)) => match s.text.as_str() {
                "auto" => Ok(None),
                "space" => Ok(Some(ListSeparator::Space)),
                "comma" => Ok(Some(ListSeparator::Comma)),
                _ => Err("Separator name must be space, comma, or auto.".to_string()),
            },
            Some(_) => Err("Separator name must be space, comma, or auto.".to_string()),
        }
    }
}

fn rgb(args: &Args) -> Result<Value, String> {
    Ok(Value::Color(Color::rgb(
        args.channel(0, 255.0)?,
        args.channel(1, 255.0)?,
        args.channel(2, 255.0)?,
    )))
}

fn rgba(args: &Args) -> Result<Value, String> {
    if let (Some(Value::Color(color)), None) = (args.get(0), args.get(2)) {
        let alpha = args.number(1)?.value;
        return Ok(Value::Color(color.with_alpha(alpha)));
    }
    Ok(Value::Color(Color::rgba(
        args.channel(0, 255.0)?,
        args.channel(1, 255.0)?,
        args.channel(2, 255.0)?,
        args.channel(3, 1.0)?,
    )))
}

fn hsl(args: &Args) -> Result<Value, String> {
    Ok(Value::Color(Color::from_hsla(
        args.number(0)?.value,
        args.number(1)?.value,
        args.number(2)?.value,
        1.0,
    )))
}

fn hsla(args: &Args) -> Result<Value, String> {
    Ok(Value::Color(Color::from_hsla(
        args.number(0)?.value,
        args.number(1)?.value,
        args.number(2)?.value,
        args.channel(3, 1.0)?,
    )))
}

fn red(args: &Args) -> Result<Value, String> {
    Ok(Value::number(args.color(0)?.channels().0 as f64))
}

fn green(args: &Args) -> Result<Value, String> {
    Ok(Value::number(args.color(0)?.channels().1 as f64))
}

fn blue(args: &Args) -> Result<Value, String> {
    Ok(Value::number(args.color(0)?.channels().2 as f64))
}

fn alpha(args: &Args) -> Result<Value, String> {
    match args.required(0)? {
        // IE filter syntax: alpha(opacity=50)
        Value::String(s) => Ok(Value::unquoted(format!("alpha({})", s.text))),
        _ => Ok(Value::number(args.color(0)?.a)),
    }
}

fn mix_colors(c1: &Color, c2: &Color, weight: f64) -> Color {
    let p = weight / 100.0;
    let w = p * 2.0 - 1.0;
    let a = c1.a - c2.a;
    let w1 = if (w * a - -1.0).abs() < f64::EPSILON {
        w
    } else {
        (w + a) / (1.0 + w * a)
    };
    let w1 = (w1 + 1.0) / 2.0;
    let w2 = 1.0 - w1;
    Color::rgba(
        c1.r * w1 + c2.r * w2,
        c1.g * w1 + c2.g * w2,
        c1.b * w1 + c2.b * w2,
        c1.a * p + c2.a * (1.0 - p),
    )
}

fn mix(args: &Args) -> Result<Value, String> {
    let weight = if args.get(2).is_some() {
        args.amount(2)?
    } else {
        50.0
    };
    Ok(Value::Color(mix_colors(args.color(0)?, args.color(1)?, weight)))
}

fn adjust_hsl(color: &Color, dh: f64, ds: f64, dl: f64) -> Value {
    let (h, s, l) = color.to_hsl();
    Value::Color(Color::from_hsla(
        h + dh,
        (s + ds).clamp(0.0, 100.0),
        (l + dl).clamp(0.0, 100.0),
        color.a,
    ))
}

fn lighten(args: &Args) -> Result<Value, String> {
    Ok(adjust_hsl(args.color(0)?, 0.0, 0.0, args.amount(1)?))
}

fn darken(args: &Args) -> Result<Value, String> {
    Ok(adjust_hsl(args.color(0)?, 0.0, 0.0, -args.amount(1)?))
}

fn saturate(args: &Args) -> Result<Value, String> {
    Ok(adjust_hsl(args.color(0)?, 0.0, args.amount(1)?, 0.0))
}

fn desaturate(args: &Args) -> Result<Value, String> {
    Ok(adjust_hsl(args.color(0)?, 0.0, -args.amount(1)?, 0.0))
}

fn adjust_hue(args: &Args) -> Result<Value, String> {
    Ok(adjust_hsl(args.color(0)?, args.number(1)?.value, 0.0, 0.0))
}

fn grayscale(args: &Args) -> Result<Value, String> {
    match args.required(0)? {
        // CSS filter function: grayscale(50%)
        Value::Number(n) => Ok(Value::unquoted(format!(
            "grayscale({})",
            n.format(args.precision, false)
        ))),
        _ => Ok(adjust_hsl(args.color(0)?, 0.0, -100.0, 0.0)),
    }
}

fn complement(args: &Args) -> Result<Value, String> {
    Ok(adjust_hsl(args.color(0)?, 180.0, 0.0, 0.0))
}

fn invert(args: &Args) -> Result<Value, String> {
    let color = args.color(0)?;
    let inverted = Color::rgba(255.0 - color.r, 255.0 - color.g, 255.0 - color.b, color.a);
    let weight = if args.get(1).is_some() {
        args.amount(1)?
    } else {
        100.0
    };
    Ok(Value::Color(mix_colors(&inverted, color, weight)))
}

fn transparentize(args: &Args) -> Result<Value, String> {
    let color = args.color(0)?;
    Ok(Value::Color(color.with_alpha(color.a - args.alpha_amount(1)?)))
}

fn opacify(args: &Args) -> Result<Value, String> {
    let color = args.color(0)?;
    Ok(Value::Color(color.with_alpha(color.a + args.alpha_amount(1)?)))
}

fn percentage(args: &Args) -> Result<Value, String> {
    let n = args.number(0)?;
    if !n.is_unitless() {
        return Err(format!(
            "$number: {} is not a unitless number.",
            n.format(args.precision, false)
        ));
    }
    Ok(Value::Number(Number::with_unit(n.value * 100.0, "%")))
}

fn map_number(args: &Args, f: fn(f64) -> f64) -> Result<Value, String> {
    let n = args.number(0)?;
    Ok(Value::Number(Number::new(f(n.value), n.unit.clone())))
}

fn round(args: &Args) -> Result<Value, String> {
    map_number(args, f64::round)
}

fn ceil(args: &Args) -> Result<Value, String> {
    map_number(args, f64::ceil)
}

fn floor(args: &Args) -> Result<Value, String> {
    map_number(args, f64::floor)
}

fn abs(args: &Args) -> Result<Value, String> {
    map_number(args, f64::abs)
}

fn extreme(args: &Args, keep: std::cmp::Ordering) -> Result<Value, String> {
    let items = args.required(0)?.as_list();
    let mut best: Option<&Number> = None;
    for item in &items {
        let Value::Number(n) = item else {
            return Err(format!("{} is not a number.", item.inspect(args.precision)));
        };
        best = match best {
            Some(b) if n.compare(b)? != keep => Some(b),
            _ => Some(n),
        };
    }
    best.cloned()
        .map(Value::Number)
        .ok_or_else(|| "At least one argument must be passed.".to_string())
}

fn min(args: &Args) -> Result<Value, String> {
    extreme(args, std::cmp::Ordering::Less)
}

fn max(args: &Args) -> Result<Value, String> {
    extreme(args, std::cmp::Ordering::Greater)
}

fn unit(args: &Args) -> Result<Value, String> {
    Ok(Value::quoted(args.number(0)?.unit.to_string()))
}

fn unitless(args: &Args) -> Result<Value, String> {
    Ok(Value::Bool(args.number(0)?.is_unitless()))
}

fn comparable(args: &Args) -> Result<Value, String> {
    let a: &Unit = &args.number(0)?.unit;
    let b: &Unit = &args.number(1)?.unit;
    Ok(Value::Bool(a.is_comparable(b)))
}

fn length(args: &Args) -> Result<Value, String> {
    let value = args.required(0)?;
    let len = match value {
        Value::Map(m) => m.len(),
        other => other.as_list().len(),
    };
    Ok(Value::number(len as f64))
}

fn nth(args: &Args) -> Result<Value, String> {
    let items = args.required(0)?.as_list();
    let n = args.number(1)?;
    let len = items.len() as i64;
    let raw = n.value as i64;
    let idx = if raw < 0 { len + raw } else { raw - 1 };
    if raw == 0 || !n.is_int() || idx < 0 || idx >= len {
        return Err(format!(
            "Invalid index {} for `nth'",
            n.format(args.precision, false)
        ));
    }
    Ok(items[idx as usize].clone())
}

fn resolve_separator(explicit: Option<ListSeparator>, first: &Value, second: Option<&Value>) -> ListSeparator {
    if let Some(sep) = explicit {
        return sep;
    }
    let list_sep = |v: &Value| match v {
        Value::List(l) if l.items.len() > 1 => Some(l.separator),
        Value::Map(m) if !m.is_empty() => Some(ListSeparator::Comma),
        _ => None,
    };
    list_sep(first)
        .or_else(|| second.and_then(list_sep))
        .unwrap_or(ListSeparator::Space)
}

fn join(args: &Args) -> Result<Value, String> {
    let first = args.required(0)?;
    let second = args.required(1)?;
    let separator = resolve_separator(args.separator(2)?, first, Some(second));
    let mut items = first.as_list();
    items.extend(second.as_list());
    Ok(Value::list(items, separator))
}

fn append(args: &Args) -> Result<Value, String> {
    let list = args.required(0)?;
    let separator = resolve_separator(args.separator(2)?, list, None);
    let mut items = list.as_list();
    items.push(args.required(1)?.clone());
    Ok(Value::list(items, separator))
}

fn index(args: &Args) -> Result<Value, String> {
    let needle = args.required(1)?;
    Ok(args
        .required(0)?
        .as_list()
        .iter()
        .position(|v| v == needle)
        .map(|i| Value::number((i + 1) as f64))
        .unwrap_or(Value::Null))
}

fn list_separator(args: &Args) -> Result<Value, String> {
    Ok(Value::unquoted(args.required(0)?.separator().name()))
}

fn map_get(args: &Args) -> Result<Value, String> {
    let map = args.map(0)?;
    Ok(map.get(args.required(1)?).cloned().unwrap_or(Value::Null))
}

fn map_merge(args: &Args) -> Result<Value, String> {
    let mut merged = args.map(0)?;
    for (k, v) in args.map(1)?.iter() {
        merged.insert(k.clone(), v.clone());
    }
    Ok(Value::Map(merged))
}

fn map_keys(args: &Args) -> Result<Value, String> {
    let map = args.map(0)?;
    Ok(Value::list(map.keys().cloned().collect(), ListSeparator::Comma))
}

fn map_values(args: &Args) -> Result<Value, String> {
    let map = args.map(0)?;
    Ok(Value::list(map.values().cloned().collect(), ListSeparator::Comma))
}

fn map_has_key(args: &Args) -> Result<Value, String> {
    Ok(Value::Bool(args.map(0)?.contains_key(args.required(1)?)))
}

fn type_of(args: &Args) -> Result<Value, String> {
    Ok(Value::unquoted(args.required(0)?.type_name()))
}

fn inspect(args: &Args) -> Result<Value, String> {
    Ok(Value::unquoted(args.required(0)?.inspect(args.precision)))
}

fn quote(args: &Args) -> Result<Value, String> {
    let (text, _) = args.string(0)?;
    Ok(Value::quoted(text))
}

fn unquote(args: &Args) -> Result<Value, String> {
    match args.required(0)? {
        Value::String(s) => Ok(Value::unquoted(s.text.clone())),
        other => Ok(other.clone()),
    }
}

fn str_length(args: &Args) -> Result<Value, String> {
    let (text, _) = args.string(0)?;
    Ok(Value::number(text.chars().count() as f64))
}

fn with_case(args: &Args, f: fn(&str) -> String) -> Result<Value, String> {
    let (text, quoted) = args.string(0)?;
    Ok(Value::String(crate::value::SassString {
        text: f(text),
        quoted,
    }))
}

fn to_upper_case(args: &Args) -> Result<Value, String> {
    with_case(args, str::to_ascii_uppercase)
}

fn to_lower_case(args: &Args) -> Result<Value, String> {
    with_case(args, str::to_ascii_lowercase)
}

fn str_index(args: &Args) -> Result<Value, String> {
    let (text, _) = args.string(0)?;
    let (needle, _) = args.string(1)?;
    Ok(match text.find(needle) {
        Some(byte) => Value::number((text[..byte].chars().count() + 1) as f64),
        None => Value::Null,
    })
}

fn str_slice(args: &Args) -> Result<Value, String> {
    let (text, quoted) = args.string(0)?;
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;
    let clamp = |raw: i64| -> i64 {
        if raw < 0 {
            (len + raw + 1).max(1)
        } else {
            raw.max(1)
        }
    };
    let start = clamp(args.number(1)?.value as i64);
    let end = match args.get(2) {
        Some(_) => {
            let raw = args.number(2)?.value as i64;
            if raw < 0 { len + raw + 1 } else { raw.min(len) }
        }
        None => len,
    };
    let text: String = if start > end || start > len {
        String::new()
    } else {
        chars[(start - 1) as usize..end as usize].iter().collect()
    };
    Ok(Value::String(crate::value::SassString { text, quoted }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, values: Vec<Value>) -> Result<Value, String> {
        let builtin = BUILTINS.get(name).unwrap();
        let args = Args {
            names: builtin.params,
            values: values.into_iter().map(Some).collect(),
            precision: 5,
        };
        (builtin.func)(&args)
    }

    fn css(value: Value) -> String {
        value.to_css(5, false).unwrap()
    }

    fn pct(v: f64) -> Value {
        Value::Number(Number::with_unit(v, "%"))
    }

    #[test]
    fn lighten_and_darken() {
        let black = Value::Color(Color::rgb(0.0, 0.0, 0.0));
        assert_eq!(css(call("lighten", vec![black, pct(100.0)]).unwrap()), "white");
        let white = Value::Color(Color::rgb(255.0, 255.0, 255.0));
        assert_eq!(css(call("darken", vec![white, pct(50.0)]).unwrap()), "gray");
    }

    #[test]
    fn mix_defaults_to_half() {
        let red = Value::Color(Color::rgb(255.0, 0.0, 0.0));
        let blue = Value::Color(Color::rgb(0.0, 0.0, 255.0));
        assert_eq!(css(call("mix", vec![red, blue]).unwrap()), "purple");
    }

    #[test]
    fn rgba_with_color() {
        let red = Value::Color(Color::rgb(255.0, 0.0, 0.0));
        assert_eq!(
            css(call("rgba", vec![red, Value::number(0.5)]).unwrap()),
            "rgba(255, 0, 0, 0.5)"
        );
    }

    #[test]
    fn percentage_requires_unitless() {
        assert_eq!(css(call("percentage", vec![Value::number(0.25)]).unwrap()), "25%");
        assert!(call("percentage", vec![pct(1.0)]).is_err());
    }

    #[test]
    fn nth_supports_negative_indices() {
        let list = Value::list(
            vec![Value::unquoted("a"), Value::unquoted("b"), Value::unquoted("c")],
            ListSeparator::Space,
        );
        assert_eq!(call("nth", vec![list.clone(), Value::number(-1.0)]).unwrap(), Value::unquoted("c"));
        assert!(call("nth", vec![list, Value::number(4.0)]).is_err());
    }

    #[test]
    fn join_uses_first_separator() {
        let a = Value::list(vec![Value::number(1.0), Value::number(2.0)], ListSeparator::Comma);
        let joined = call("join", vec![a, Value::number(3.0)]).unwrap();
        assert_eq!(css(joined), "1, 2, 3");
    }

    #[test]
    fn map_functions() {
        let map: SassMap = [
            (Value::unquoted("a"), Value::number(1.0)),
            (Value::unquoted("b"), Value::number(2.0)),
        ]
        .into_iter()
        .collect();
        let map = Value::Map(map);
        assert_eq!(call("map-get", vec![map.clone(), Value::quoted("b")]).unwrap(), Value::number(2.0));
        assert_eq!(call("map-get", vec![map.clone(), Value::quoted("z")]).unwrap(), Value::Null);
        assert_eq!(css(call("map-keys", vec![map.clone()]).unwrap()), "a, b");
        assert_eq!(
            call("map-has-key", vec![map, Value::unquoted("a")]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn string_functions() {
        assert_eq!(call("str-length", vec![Value::quoted("hello")]).unwrap(), Value::number(5.0));
        assert_eq!(
            call("str-slice", vec![Value::quoted("hello"), Value::number(2.0), Value::number(3.0)]).unwrap(),
            Value::quoted("el")
        );
        assert_eq!(call("str-index", vec![Value::quoted("hello"), Value::quoted("l")]).unwrap(), Value::number(3.0));
        assert_eq!(
            css(call("to-upper-case", vec![Value::unquoted("abc")]).unwrap()),
            "ABC"
        );
    }

    #[test]
    fn min_and_max_convert_units() {
        let a = Value::Number(Number::with_unit(1.0, "in"));
        let b = Value::Number(Number::with_unit(50.0, "px"));
        let list = Value::list(vec![a, b], ListSeparator::Comma);
        assert_eq!(css(call("min", vec![list.clone()]).unwrap()), "50px");
        assert_eq!(css(call("max", vec![list]).unwrap()), "1in");
    }

    #[test]
    fn type_of_reports_names() {
        assert_eq!(css(call("type-of", vec![Value::number(1.0)]).unwrap()), "number");
        assert_eq!(css(call("type-of", vec![Value::Null]).unwrap()), "null");
    }
}
