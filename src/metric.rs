//! Scalar results that may be mathematically undefined

use std::fmt;

/// A derived scalar that is either a finite number or undefined.
///
/// Ratios with a zero denominator (a single-visit customer's purchase
/// frequency, the forecast confidence of an all-zero series, ...) come out as
/// `Undefined` instead of leaking NaN or infinity into later aggregates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    Defined(f64),
    Undefined,
}

impl Metric {
    /// `numerator / denominator`, undefined unless the result is finite.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Metric::Undefined;
        }
        Metric::from_f64(numerator / denominator)
    }

    /// Arithmetic mean; undefined for an empty input.
    pub fn mean<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        Metric::ratio(sum, count as f64)
    }

    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Metric::Defined(value)
        } else {
            Metric::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Defined(v) => Some(v),
            Metric::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Metric::Defined(_))
    }

    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(f64) -> f64,
    {
        match self {
            Metric::Defined(v) => Metric::from_f64(f(v)),
            Metric::Undefined => Metric::Undefined,
        }
    }

    /// Threshold comparison; an undefined value never satisfies it.
    pub fn at_least(self, threshold: f64) -> bool {
        match self {
            Metric::Defined(v) => v >= threshold,
            Metric::Undefined => false,
        }
    }
}

impl From<f64> for Metric {
    fn from(value: f64) -> Self {
        Metric::from_f64(value)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, f.precision()) {
            (Metric::Defined(v), Some(precision)) => write!(f, "{:.*}", precision, v),
            (Metric::Defined(v), None) => write!(f, "{}", v),
            (Metric::Undefined, _) => f.write_str("undefined"),
        }
    }
}
