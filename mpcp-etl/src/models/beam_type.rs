//! Beam-type tokens and their record families

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linac beam energy/modality, decided once per folder at dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BeamType {
    #[serde(rename = "6e")]
    E6,
    #[serde(rename = "9e")]
    E9,
    #[serde(rename = "12e")]
    E12,
    #[serde(rename = "16e")]
    E16,
    #[serde(rename = "2.5x")]
    X2_5,
    #[serde(rename = "6x")]
    X6,
    #[serde(rename = "6xFFF")]
    X6Fff,
    #[serde(rename = "10x")]
    X10,
    #[serde(rename = "15x")]
    X15,
}

/// Record shape and extraction vocabulary shared by a group of beam types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeamFamily {
    Electron,
    XRay,
    /// Full 6x geometry check (isocenter, couch, jaws, MLC)
    Geometry,
}

impl BeamType {
    pub const ALL: [BeamType; 9] = [
        BeamType::E6,
        BeamType::E9,
        BeamType::E12,
        BeamType::E16,
        BeamType::X2_5,
        BeamType::X6,
        BeamType::X6Fff,
        BeamType::X10,
        BeamType::X15,
    ];

    pub fn token(self) -> &'static str {
        match self {
            BeamType::E6 => "6e",
            BeamType::E9 => "9e",
            BeamType::E12 => "12e",
            BeamType::E16 => "16e",
            BeamType::X2_5 => "2.5x",
            BeamType::X6 => "6x",
            BeamType::X6Fff => "6xFFF",
            BeamType::X10 => "10x",
            BeamType::X15 => "15x",
        }
    }

    pub fn family(self) -> BeamFamily {
        match self {
            BeamType::E6 | BeamType::E9 | BeamType::E12 | BeamType::E16 => BeamFamily::Electron,
            BeamType::X2_5 | BeamType::X6Fff | BeamType::X10 | BeamType::X15 => BeamFamily::XRay,
            BeamType::X6 => BeamFamily::Geometry,
        }
    }

    /// Destination table for records of this beam type
    ///
    /// `beam_<token>` with `.` replaced and lowercased (`beam_2_5x`, `beam_6xfff`);
    /// the geometry check lands in `geometry_6x`.
    pub fn table_tag(self) -> TableTag {
        match self.family() {
            BeamFamily::Geometry => TableTag(format!("geometry_{}", self.token())),
            _ => TableTag(format!(
                "beam_{}",
                self.token().replace('.', "_").to_ascii_lowercase()
            )),
        }
    }
}

impl fmt::Display for BeamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for BeamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BeamType::ALL
            .into_iter()
            .find(|bt| bt.token().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown beam type '{}'", s))
    }
}

/// Persistence table selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableTag(String);

impl TableTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
