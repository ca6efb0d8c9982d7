//! Numeric measurement values
//!
//! A field is either a reading, a reading the export carried but that could not be
//! parsed, or nothing at all. Downstream consumers expect `-1` for both of the latter;
//! that conversion happens only in [`Measurement::to_f64_or_sentinel`].

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Value written for fields without a usable reading
pub const SENTINEL: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Measurement {
    /// Export did not mention the field
    #[default]
    NotReported,
    /// Export carried the field but the value was not numeric
    Unavailable { raw: String },
    Value(Decimal),
}

impl Measurement {
    /// Coerce raw export text; never fails
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map(Measurement::Value)
            .unwrap_or_else(|_| Measurement::Unavailable {
                raw: raw.to_string(),
            })
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Measurement::Value(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Measurement::Value(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Measurement::Unavailable { .. })
    }

    pub fn to_f64_or_sentinel(&self) -> f64 {
        self.value()
            .and_then(|v| v.to_f64())
            .unwrap_or(SENTINEL)
    }
}

impl From<Decimal> for Measurement {
    fn from(value: Decimal) -> Self {
        Measurement::Value(value)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::NotReported => f.write_str("not reported"),
            Measurement::Unavailable { raw } => write!(f, "unavailable ({:?})", raw),
            Measurement::Value(v) => write!(f, "{}", v),
        }
    }
}
