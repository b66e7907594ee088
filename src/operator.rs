use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Aggregation applied to the values collected for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Count,
    Sum,
    Subtract,
    Multiply,
    Avg,
    Min,
    Max,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Count => "count",
            Operator::Sum => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Avg => "avg",
            Operator::Min => "min",
            Operator::Max => "max",
        }
    }

    /// Reduce `values` to a single number.
    ///
    /// `+`, `-`, `*` and `avg` are rounded to two decimals; `-` and `*` fold
    /// left to right. `avg`, `min` and `max` of nothing are 0.
    pub fn reduce(&self, values: &[f64]) -> Result<f64> {
        let result = match self {
            Operator::Count => values.len() as f64,
            Operator::Sum => round_number(values.iter().sum()),
            Operator::Subtract => round_number(fold(self, values, |a, b| a - b)?),
            Operator::Multiply => round_number(fold(self, values, |a, b| a * b)?),
            Operator::Avg => {
                if values.is_empty() {
                    return Ok(0.0);
                }
                round_number(values.iter().sum::<f64>() / values.len() as f64)
            }
            Operator::Min => values.iter().copied().reduce(f64::min).unwrap_or(0.0),
            Operator::Max => values.iter().copied().reduce(f64::max).unwrap_or(0.0),
        };
        Ok(result)
    }

    /// Operator used when already-aggregated points are merged again.
    /// Counts are additive.
    pub fn for_merge(&self) -> Operator {
        match self {
            Operator::Count => Operator::Sum,
            other => *other,
        }
    }
}

fn fold(op: &Operator, values: &[f64], f: impl Fn(f64, f64) -> f64) -> Result<f64> {
    values
        .iter()
        .copied()
        .reduce(f)
        .ok_or_else(|| Error::EmptyInput(format!("operator '{}' needs at least one value", op)))
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "count" => Ok(Operator::Count),
            "+" => Ok(Operator::Sum),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "avg" => Ok(Operator::Avg),
            "min" => Ok(Operator::Min),
            "max" => Ok(Operator::Max),
            other => Err(Error::UnsupportedOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

/// Round to two decimals, ties to even on the scaled value.
pub fn round_number(n: f64) -> f64 {
    (n * 100.0).round_ties_even() / 100.0
}
