//! Folder-derived record metadata

use chrono::NaiveDateTime;
use std::fmt;

/// Linac serial number in canonical `SN<digits>` form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MachineSerial(String);

impl MachineSerial {
    /// Build from the digit run following `SN`; `None` when `digits` is empty or non-numeric
    pub fn from_digits(digits: &str) -> Option<Self> {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(format!("SN{}", digits)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the resolver derives from a folder, fixed at record construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMetadata {
    pub acquisition_time: NaiveDateTime,
    pub machine_serial: MachineSerial,
    pub is_baseline: bool,
}
