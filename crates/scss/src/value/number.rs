//! Numbers with units.
//!
//! A [`Number`] carries an `f64` and a (possibly compound) [`Unit`].
//! Compatible units convert automatically (`1in + 1px`); incompatible
//! units make additive operators and comparisons fail.

use std::f64::consts::PI;
use std::fmt;

/// Tolerance used for equality and integer checks.
pub const EPSILON: f64 = 1e-10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UnitKind {
    Length,
    Angle,
    Time,
    Frequency,
    Resolution,
}

/// Conversion factor of `unit` to the canonical unit of its kind.
fn unit_info(unit: &str) -> Option<(UnitKind, f64)> {
    let info = match unit.to_ascii_lowercase().as_str() {
        "px" => (UnitKind::Length, 1.0),
        "in" => (UnitKind::Length, 96.0),
        "cm" => (UnitKind::Length, 96.0 / 2.54),
        "mm" => (UnitKind::Length, 96.0 / 25.4),
        "q" => (UnitKind::Length, 96.0 / 101.6),
        "pt" => (UnitKind::Length, 4.0 / 3.0),
        "pc" => (UnitKind::Length, 16.0),
        "deg" => (UnitKind::Angle, 1.0),
        "grad" => (UnitKind::Angle, 0.9),
        "rad" => (UnitKind::Angle, 180.0 / PI),
        "turn" => (UnitKind::Angle, 360.0),
        "s" => (UnitKind::Time, 1.0),
        "ms" => (UnitKind::Time, 0.001),
        "hz" => (UnitKind::Frequency, 1.0),
        "khz" => (UnitKind::Frequency, 1000.0),
        "dppx" => (UnitKind::Resolution, 1.0),
        "dpi" => (UnitKind::Resolution, 1.0 / 96.0),
        "dpcm" => (UnitKind::Resolution, 2.54 / 96.0),
        _ => return None,
    };
    Some(info)
}

/// Multiplier converting a value in `from` into `to`, if the units are
/// identical or of the same kind.
fn conversion_factor(from: &str, to: &str) -> Option<f64> {
    if from == to {
        return Some(1.0);
    }
    let (from_kind, from_factor) = unit_info(from)?;
    let (to_kind, to_factor) = unit_info(to)?;
    (from_kind == to_kind).then(|| from_factor / to_factor)
}

/// A compound unit: `px`, `px*em`, `px/s`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Unit {
    numer: Vec<String>,
    denom: Vec<String>,
}

impl Unit {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(unit: impl Into<String>) -> Self {
        let unit = unit.into();
        if unit.is_empty() {
            Self::none()
        } else {
            Self {
                numer: vec![unit],
                denom: Vec::new(),
            }
        }
    }

    pub fn is_none(&self) -> bool {
        self.numer.is_empty() && self.denom.is_empty()
    }

    /// Single numerator unit, if the unit is that simple.
    pub fn as_single(&self) -> Option<&str> {
        match (self.numer.as_slice(), self.denom.is_empty()) {
            ([unit], true) => Some(unit),
            _ => None,
        }
    }

    /// Whether values of `self` can be converted into `other`.
    pub fn is_comparable(&self, other: &Unit) -> bool {
        self.is_none() || other.is_none() || self.factor_to(other).is_some()
    }

    fn factor_to(&self, other: &Unit) -> Option<f64> {
        if self == other {
            return Some(1.0);
        }
        if self.numer.len() != other.numer.len() || self.denom.len() != other.denom.len() {
            return None;
        }
        let mut factor = 1.0;
        for (a, b) in self.numer.iter().zip(&other.numer) {
            factor *= conversion_factor(a, b)?;
        }
        for (a, b) in self.denom.iter().zip(&other.denom) {
            factor /= conversion_factor(a, b)?;
        }
        Some(factor)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.numer.join("*"))?;
        if !self.denom.is_empty() {
            write!(f, "/{}", self.denom.join("*"))?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct Number {
    pub value: f64,
    pub unit: Unit,
}

impl Number {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn unitless(value: f64) -> Self {
        Self::new(value, Unit::none())
    }

    pub fn with_unit(value: f64, unit: &str) -> Self {
        Self::new(value, Unit::single(unit))
    }

    pub fn is_unitless(&self) -> bool {
        self.unit.is_none()
    }

    pub fn is_int(&self) -> bool {
        (self.value - self.value.round()).abs() < EPSILON
    }

    /// The value converted into `target`'s unit. Unitless numbers adopt
    /// any unit unchanged.
    pub fn value_in(&self, target: &Unit) -> Option<f64> {
        if self.unit.is_none() || target.is_none() {
            return Some(self.value);
        }
        self.unit.factor_to(target).map(|f| self.value * f)
    }

    fn incompatible(&self, other: &Number) -> String {
        format!("Incompatible units: '{}' and '{}'.", other.unit, self.unit)
    }

    /// Addition-like combination: `+`, `-`, `%`. Result takes the left
    /// unit unless it is unitless.
    pub fn combine(
        &self,
        other: &Number,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<Number, String> {
        let unit = if self.unit.is_none() {
            other.unit.clone()
        } else {
            self.unit.clone()
        };
        let rhs = other
            .value_in(&unit)
            .ok_or_else(|| self.incompatible(other))?;
        Ok(Number::new(op(self.value, rhs), unit))
    }

    pub fn compare(&self, other: &Number) -> Result<std::cmp::Ordering, String> {
        let rhs = other
            .value_in(&self.unit)
            .ok_or_else(|| self.incompatible(other))?;
        Ok(self
            .value
            .partial_cmp(&rhs)
            .unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn mul(&self, other: &Number) -> Number {
        let mut numer = self.unit.numer.clone();
        numer.extend(other.unit.numer.iter().cloned());
        let mut denom = self.unit.denom.clone();
        denom.extend(other.unit.denom.iter().cloned());
        simplify(self.value * other.value, numer, denom)
    }

    pub fn div(&self, other: &Number) -> Number {
        let mut numer = self.unit.numer.clone();
        numer.extend(other.unit.denom.iter().cloned());
        let mut denom = self.unit.denom.clone();
        denom.extend(other.unit.numer.iter().cloned());
        simplify(self.value / other.value, numer, denom)
    }

    /// Serializes the number rounded to `precision` decimal digits.
    pub fn format(&self, precision: usize, compressed: bool) -> String {
        let mut out = format_float(self.value, precision, compressed);
        out.push_str(&self.unit.to_string());
        out
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        if self.unit.is_none() != other.unit.is_none() {
            return false;
        }
        match other.value_in(&self.unit) {
            Some(rhs) => (self.value - rhs).abs() < EPSILON,
            None => false,
        }
    }
}

/// Cancels convertible numerator/denominator pairs.
fn simplify(mut value: f64, numer: Vec<String>, mut denom: Vec<String>) -> Number {
    let mut kept = Vec::new();
    for n in numer {
        let matched = denom
            .iter()
            .position(|d| conversion_factor(&n, d).is_some());
        match matched {
            Some(idx) => {
                let d = denom.remove(idx);
                value *= conversion_factor(&n, &d).unwrap_or(1.0);
            }
            None => kept.push(n),
        }
    }
    Number::new(value, Unit { numer: kept, denom })
}

/// Formats a float with at most `precision` fractional digits, trimming
/// trailing zeros.
pub fn format_float(value: f64, precision: usize, compressed: bool) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let mut out = format!("{:.*}", precision, value);
    if out.contains('.') {
        let trimmed = out.trim_end_matches('0').trim_end_matches('.').len();
        out.truncate(trimmed);
    }
    if out == "-0" {
        out = "0".to_string();
    }
    if compressed {
        if let Some(rest) = out.strip_prefix("0.") {
            out = format!(".{rest}");
        } else if let Some(rest) = out.strip_prefix("-0.") {
            out = format!("-.{rest}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_trims_zeros_and_rounds() {
        assert_eq!(format_float(1.0, 5, false), "1");
        assert_eq!(format_float(1.0 / 3.0, 5, false), "0.33333");
        assert_eq!(format_float(2.5, 5, false), "2.5");
        assert_eq!(format_float(-0.000001, 5, false), "0");
        assert_eq!(format_float(0.5, 5, true), ".5");
    }

    #[test]
    fn add_converts_compatible_units() {
        let a = Number::with_unit(1.0, "in");
        let b = Number::with_unit(96.0, "px");
        let sum = a.combine(&b, |x, y| x + y).unwrap();
        assert_eq!(sum, Number::with_unit(2.0, "in"));
    }

    #[test]
    fn add_rejects_incompatible_units() {
        let a = Number::with_unit(1.0, "px");
        let b = Number::with_unit(1.0, "em");
        let err = a.combine(&b, |x, y| x + y).unwrap_err();
        assert_eq!(err, "Incompatible units: 'em' and 'px'.");
    }

    #[test]
    fn unitless_adopts_other_unit() {
        let a = Number::unitless(2.0);
        let b = Number::with_unit(3.0, "em");
        assert_eq!(a.combine(&b, |x, y| x + y).unwrap(), Number::with_unit(5.0, "em"));
    }

    #[test]
    fn division_cancels_units() {
        let a = Number::with_unit(10.0, "px");
        let b = Number::with_unit(2.0, "px");
        let q = a.div(&b);
        assert!(q.is_unitless());
        assert_eq!(q.value, 5.0);
    }

    #[test]
    fn multiplication_builds_compound_unit() {
        let a = Number::with_unit(2.0, "px");
        let b = Number::with_unit(3.0, "em");
        assert_eq!(a.mul(&b).format(5, false), "6px*em");
    }

    #[test]
    fn unitless_is_not_equal_to_unit() {
        assert_ne!(Number::unitless(1.0), Number::with_unit(1.0, "px"));
        assert_eq!(Number::with_unit(1.0, "s"), Number::with_unit(1000.0, "ms"));
    }
}
