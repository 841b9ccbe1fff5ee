//! Operators over runtime values.
//!
//! `and`/`or` are not handled here: they short-circuit and are evaluated
//! by the evaluator directly.

use std::cmp::Ordering;

use super::{Color, Number, SassList, SassString, Value};
use crate::ast::{BinaryOp, UnaryOp};

fn undefined(op: BinaryOp, lhs: &Value, rhs: &Value, precision: usize) -> String {
    format!(
        "Undefined operation: \"{} {} {}\".",
        lhs.inspect(precision),
        op.symbol(),
        rhs.inspect(precision)
    )
}

/// Applies a binary operator.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value, precision: usize) -> Result<Value, String> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(lhs == rhs)),
        BinaryOp::Ne => return Ok(Value::Bool(lhs != rhs)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            return compare(op, lhs, rhs, precision);
        }
        BinaryOp::And => return Ok(if lhs.is_truthy() { rhs.clone() } else { lhs.clone() }),
        BinaryOp::Or => return Ok(if lhs.is_truthy() { lhs.clone() } else { rhs.clone() }),
        _ => {}
    }

    match (lhs, rhs) {
        (Value::Error(msg), _) | (_, Value::Error(msg)) => Err(msg.clone()),
        (Value::Number(a), Value::Number(b)) => numeric(op, a, b).map(Value::Number),
        (Value::Color(a), Value::Color(b)) => {
            if (a.a - b.a).abs() > 1e-10 {
                return Err(format!(
                    "Alpha channels must be equal: {} {} {}",
                    lhs.inspect(precision),
                    op.symbol(),
                    rhs.inspect(precision)
                ));
            }
            color_channels(op, a, |c| match c {
                0 => b.r,
                1 => b.g,
                _ => b.b,
            })
            .ok_or_else(|| undefined(op, lhs, rhs, precision))
        }
        (Value::Color(a), Value::Number(n)) if n.is_unitless() => {
            color_channels(op, a, |_| n.value).ok_or_else(|| undefined(op, lhs, rhs, precision))
        }
        (Value::Number(n), Value::Color(c))
            if n.is_unitless() && matches!(op, BinaryOp::Add | BinaryOp::Mul) =>
        {
            color_channels(op, c, |_| n.value).ok_or_else(|| undefined(op, lhs, rhs, precision))
        }
        (Value::List(a), Value::List(b))
            if a.items.len() == b.items.len()
                && a.separator == b.separator
                && a.items.len() > 1 =>
        {
            let items = a
                .items
                .iter()
                .zip(&b.items)
                .map(|(x, y)| binary(op, x, y, precision))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(SassList {
                items,
                separator: a.separator,
                bracketed: a.bracketed,
            }))
        }
        _ => fallback(op, lhs, rhs, precision),
    }
}

fn numeric(op: BinaryOp, a: &Number, b: &Number) -> Result<Number, String> {
    match op {
        BinaryOp::Add => a.combine(b, |x, y| x + y),
        BinaryOp::Sub => a.combine(b, |x, y| x - y),
        BinaryOp::Rem => a.combine(b, |x, y| x % y),
        BinaryOp::Mul => Ok(a.mul(b)),
        BinaryOp::Div => Ok(a.div(b)),
        _ => Err(format!("Unsupported numeric operator {}", op.symbol())),
    }
}

fn color_channels(op: BinaryOp, color: &Color, rhs: impl Fn(usize) -> f64) -> Option<Value> {
    let apply = |x: f64, y: f64| -> Option<f64> {
        Some(match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => x / y,
            BinaryOp::Rem => x % y,
            _ => return None,
        })
    };
    Some(Value::Color(Color::rgba(
        apply(color.r, rhs(0))?,
        apply(color.g, rhs(1))?,
        apply(color.b, rhs(2))?,
        color.a,
    )))
}

/// String-ish behavior for operand combinations without arithmetic
/// meaning: `+` concatenates, `-` and `/` join with the operator.
fn fallback(op: BinaryOp, lhs: &Value, rhs: &Value, precision: usize) -> Result<Value, String> {
    let is_string = |v: &Value| matches!(v, Value::String(_));
    match op {
        BinaryOp::Add => {
            if (lhs.is_null() && !is_string(rhs)) || (rhs.is_null() && !is_string(lhs)) {
                return Err(format!(
                    "Invalid null operation: \"{} plus {}\".",
                    lhs.inspect(precision),
                    rhs.inspect(precision)
                ));
            }
            let quoted = match (lhs, rhs) {
                (Value::String(s), _) => s.quoted,
                (_, Value::String(s)) => s.quoted,
                _ => false,
            };
            let text = format!(
                "{}{}",
                lhs.interpolate_text(precision),
                rhs.interpolate_text(precision)
            );
            Ok(Value::String(SassString { text, quoted }))
        }
        BinaryOp::Sub | BinaryOp::Div => {
            if lhs.is_null() || rhs.is_null() {
                return Err(undefined(op, lhs, rhs, precision));
            }
            Ok(Value::unquoted(format!(
                "{}{}{}",
                css_or_inspect(lhs, precision),
                op.symbol(),
                css_or_inspect(rhs, precision)
            )))
        }
        _ => Err(undefined(op, lhs, rhs, precision)),
    }
}

fn css_or_inspect(value: &Value, precision: usize) -> String {
    value
        .to_css(precision, false)
        .unwrap_or_else(|_| value.inspect(precision))
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value, precision: usize) -> Result<Value, String> {
    let (Value::Number(a), Value::Number(b)) = (lhs, rhs) else {
        return Err(undefined(op, lhs, rhs, precision));
    };
    let ordering = a.compare(b)?;
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

/// Applies a unary operator.
pub fn unary(op: UnaryOp, operand: &Value, precision: usize) -> Value {
    match (op, operand) {
        (UnaryOp::Not, v) => Value::Bool(!v.is_truthy()),
        (UnaryOp::Neg, Value::Number(n)) => {
            Value::Number(Number::new(-n.value, n.unit.clone()))
        }
        (UnaryOp::Plus, Value::Number(n)) => Value::Number(n.clone()),
        (UnaryOp::Neg, v) => Value::unquoted(format!("-{}", css_or_inspect(v, precision))),
        (UnaryOp::Plus, v) => Value::unquoted(format!("+{}", css_or_inspect(v, precision))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ListSeparator;

    fn px(v: f64) -> Value {
        Value::Number(Number::with_unit(v, "px"))
    }

    #[test]
    fn adds_numbers_with_units() {
        let sum = binary(BinaryOp::Add, &px(10.0), &px(5.0), 5).unwrap();
        assert_eq!(sum, px(15.0));
    }

    #[test]
    fn incompatible_units_fail() {
        let em = Value::Number(Number::with_unit(1.0, "em"));
        let err = binary(BinaryOp::Add, &px(1.0), &em, 5).unwrap_err();
        assert!(err.starts_with("Incompatible units"));
    }

    #[test]
    fn string_concatenation_keeps_left_quoting() {
        let result = binary(BinaryOp::Add, &Value::quoted("foo"), &Value::unquoted("bar"), 5).unwrap();
        assert_eq!(result.to_css(5, false).unwrap(), "\"foobar\"");
        let result = binary(BinaryOp::Add, &Value::unquoted("foo"), &Value::quoted("bar"), 5).unwrap();
        assert_eq!(result.to_css(5, false).unwrap(), "foobar");
    }

    #[test]
    fn color_arithmetic_is_component_wise() {
        let a = Value::Color(Color::rgb(16.0, 32.0, 48.0));
        let b = Value::Color(Color::rgb(1.0, 2.0, 3.0));
        let sum = binary(BinaryOp::Add, &a, &b, 5).unwrap();
        assert_eq!(sum, Value::Color(Color::rgb(17.0, 34.0, 51.0)));
        let clamped = binary(BinaryOp::Mul, &a, &Value::number(100.0), 5).unwrap();
        assert_eq!(clamped, Value::Color(Color::rgb(255.0, 255.0, 255.0)));
    }

    #[test]
    fn comparison_requires_numbers() {
        assert_eq!(
            binary(BinaryOp::Lt, &px(1.0), &px(2.0), 5).unwrap(),
            Value::Bool(true)
        );
        let err = binary(BinaryOp::Lt, &Value::unquoted("a"), &px(2.0), 5).unwrap_err();
        assert_eq!(err, "Undefined operation: \"a < 2px\".");
    }

    #[test]
    fn list_arithmetic_is_element_wise() {
        let a = Value::list(vec![px(1.0), px(2.0)], ListSeparator::Space);
        let b = Value::list(vec![px(3.0), px(4.0)], ListSeparator::Space);
        let sum = binary(BinaryOp::Add, &a, &b, 5).unwrap();
        assert_eq!(sum.to_css(5, false).unwrap(), "4px 6px");
    }

    #[test]
    fn subtraction_of_idents_joins_text() {
        let result = binary(BinaryOp::Sub, &Value::unquoted("a"), &Value::unquoted("b"), 5).unwrap();
        assert_eq!(result, Value::unquoted("a-b"));
    }

    #[test]
    fn null_arithmetic_fails() {
        assert!(binary(BinaryOp::Add, &Value::Null, &px(1.0), 5).is_err());
        assert_eq!(
            binary(BinaryOp::Add, &Value::quoted("a"), &Value::Null, 5).unwrap(),
            Value::quoted("a")
        );
    }
}
