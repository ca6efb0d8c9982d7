//! Flattened key/value form handed to persistence

use serde_json::Value;

/// Storage class of a flattened column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Real,
    Text,
    Bool,
    Json,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Real => "REAL",
            ColumnKind::Text | ColumnKind::Json => "TEXT",
            ColumnKind::Bool => "INTEGER",
        }
    }
}

/// Plain value with no arbitrary-precision or timestamp types left in it
#[derive(Debug, Clone, PartialEq)]
pub enum FlatValue {
    Real(f64),
    Text(String),
    Bool(bool),
    Json(Value),
    Null(ColumnKind),
}

impl FlatValue {
    pub fn kind(&self) -> ColumnKind {
        match self {
            FlatValue::Real(_) => ColumnKind::Real,
            FlatValue::Text(_) => ColumnKind::Text,
            FlatValue::Bool(_) => ColumnKind::Bool,
            FlatValue::Json(_) => ColumnKind::Json,
            FlatValue::Null(kind) => *kind,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FlatValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlatValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FlatValue::Null(_))
    }
}

/// Ordered columns of one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    columns: Vec<(String, FlatValue)>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: FlatValue) {
        self.columns.push((key.into(), value));
    }

    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.columns
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlatValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// JSON object view, used by the dry-run gateway and logs
    pub fn to_json(&self) -> Value {
        let map = self
            .columns
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    FlatValue::Real(f) => Value::from(*f),
                    FlatValue::Text(s) => Value::from(s.as_str()),
                    FlatValue::Bool(b) => Value::from(*b),
                    FlatValue::Json(j) => j.clone(),
                    FlatValue::Null(_) => Value::Null,
                };
                (k.clone(), value)
            })
            .collect();
        Value::Object(map)
    }
}
