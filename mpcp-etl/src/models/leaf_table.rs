//! Bounds-checked MLC leaf storage
//!
//! A geometry record measures a contiguous span of leaves per bank. The span is
//! fixed when the record is built; every read and write is checked against it here
//! so callers never repeat range guards.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

use super::measurement::Measurement;

/// MLC leaf bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    A,
    B,
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bank::A => f.write_str("A"),
            Bank::B => f.write_str("B"),
        }
    }
}

/// Inclusive leaf-index span, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafRange {
    first: u16,
    last: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid leaf range {first}..={last}: leaves are numbered from 1 and first must not exceed last")]
pub struct InvalidLeafRange {
    pub first: u16,
    pub last: u16,
}

impl LeafRange {
    pub fn new(first: u16, last: u16) -> Result<Self, InvalidLeafRange> {
        if first == 0 || first > last {
            return Err(InvalidLeafRange { first, last });
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> u16 {
        self.first
    }

    pub fn last(&self) -> u16 {
        self.last
    }

    pub fn contains(&self, index: u32) -> bool {
        index >= u32::from(self.first) && index <= u32::from(self.last)
    }

    pub fn len(&self) -> usize {
        usize::from(self.last - self.first) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn indices(&self) -> impl Iterator<Item = u16> {
        self.first..=self.last
    }
}

impl Default for LeafRange {
    /// Full 60-leaf bank
    fn default() -> Self {
        Self { first: 1, last: 60 }
    }
}

impl fmt::Display for LeafRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Leaf {index} of bank {bank} is outside the record's range {range}")]
pub struct LeafIndexOutOfRange {
    pub bank: Bank,
    pub index: u32,
    pub range: LeafRange,
}

/// Per-bank leaf measurements over a fixed [`LeafRange`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafTable {
    range: LeafRange,
    bank_a: Vec<Measurement>,
    bank_b: Vec<Measurement>,
}

impl LeafTable {
    pub fn new(range: LeafRange) -> Self {
        Self {
            range,
            bank_a: vec![Measurement::NotReported; range.len()],
            bank_b: vec![Measurement::NotReported; range.len()],
        }
    }

    pub fn range(&self) -> LeafRange {
        self.range
    }

    pub fn get(&self, bank: Bank, index: u32) -> Result<&Measurement, LeafIndexOutOfRange> {
        let slot = self.slot(bank, index)?;
        Ok(&self.bank(bank)[slot])
    }

    pub fn set(
        &mut self,
        bank: Bank,
        index: u32,
        value: Measurement,
    ) -> Result<(), LeafIndexOutOfRange> {
        let slot = self.slot(bank, index)?;
        let leaves = match bank {
            Bank::A => &mut self.bank_a,
            Bank::B => &mut self.bank_b,
        };
        leaves[slot] = value;
        Ok(())
    }

    /// `(leaf index, value)` pairs in ascending leaf order
    pub fn iter(&self, bank: Bank) -> impl Iterator<Item = (u16, &Measurement)> {
        self.range.indices().zip(self.bank(bank).iter())
    }

    /// Number of leaves in `bank` holding a parsed reading
    pub fn reported(&self, bank: Bank) -> usize {
        self.bank(bank).iter().filter(|m| m.is_value()).count()
    }

    /// JSON object keyed `leaf_<n>`, sentinel for leaves without a reading
    pub fn to_json(&self, bank: Bank) -> Value {
        let mut map = Map::with_capacity(self.range.len());
        for (index, value) in self.iter(bank) {
            map.insert(
                format!("leaf_{}", index),
                Value::from(value.to_f64_or_sentinel()),
            );
        }
        Value::Object(map)
    }

    fn bank(&self, bank: Bank) -> &[Measurement] {
        match bank {
            Bank::A => &self.bank_a,
            Bank::B => &self.bank_b,
        }
    }

    fn slot(&self, bank: Bank, index: u32) -> Result<usize, LeafIndexOutOfRange> {
        if !self.range.contains(index) {
            return Err(LeafIndexOutOfRange {
                bank,
                index,
                range: self.range,
            });
        }
        Ok((index - u32::from(self.range.first)) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narrow() -> LeafRange {
        LeafRange::new(11, 50).unwrap()
    }

    #[test]
    fn test_range_validation() {
        assert!(LeafRange::new(0, 60).is_err());
        assert!(LeafRange::new(40, 11).is_err());
        assert_eq!(narrow().len(), 40);
        assert_eq!(LeafRange::default().len(), 60);
    }

    #[test]
    fn test_set_and_get_within_range() {
        let mut table = LeafTable::new(narrow());
        table
            .set(Bank::A, 11, Measurement::parse("0.25"))
            .unwrap();
        table
            .set(Bank::B, 50, Measurement::parse("-0.1"))
            .unwrap();

        assert_eq!(table.get(Bank::A, 11).unwrap(), &Measurement::parse("0.25"));
        assert_eq!(table.get(Bank::B, 50).unwrap(), &Measurement::parse("-0.1"));
        assert_eq!(table.get(Bank::A, 12).unwrap(), &Measurement::NotReported);
        assert_eq!(table.reported(Bank::A), 1);
    }

    #[test]
    fn test_out_of_range_is_rejected_without_mutation() {
        let mut table = LeafTable::new(narrow());
        let before = table.clone();

        let err = table
            .set(Bank::A, 60, Measurement::parse("1.0"))
            .unwrap_err();
        assert_eq!(err.index, 60);
        assert!(table.get(Bank::B, 10).is_err());
        assert!(table.set(Bank::B, 0, Measurement::parse("1.0")).is_err());
        assert_eq!(table, before);
    }

    #[test]
    fn test_json_uses_sentinel_for_missing_leaves() {
        let mut table = LeafTable::new(LeafRange::new(1, 2).unwrap());
        table.set(Bank::A, 1, Measurement::parse("0.5")).unwrap();

        let json = table.to_json(Bank::A);
        assert_eq!(json["leaf_1"], 0.5);
        assert_eq!(json["leaf_2"], -1.0);
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
