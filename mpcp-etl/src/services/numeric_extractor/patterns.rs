//! Field-name vocabularies
//!
//! Export names carry group prefixes and unit suffixes
//! (`CollimationGroup/MLCGroup/MLCLeavesA/MLCLeaf11 [mm]`), so matching is by
//! substring and the first pattern in table order wins. Indexed leaf names and
//! `JawParallelism*` come before the shorter names they would otherwise collide with.

use crate::models::{Bank, LeafKind, MetricField};

/// Where a matched value goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Scalar(MetricField),
    /// Indexed leaf; the index is the digit run after `index_marker`
    Leaf {
        kind: LeafKind,
        bank: Bank,
        index_marker: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct FieldPattern {
    pub pattern: &'static str,
    pub target: Target,
}

const fn scalar(pattern: &'static str, field: MetricField) -> FieldPattern {
    FieldPattern {
        pattern,
        target: Target::Scalar(field),
    }
}

const fn leaf(
    pattern: &'static str,
    kind: LeafKind,
    bank: Bank,
    index_marker: &'static str,
) -> FieldPattern {
    FieldPattern {
        pattern,
        target: Target::Leaf {
            kind,
            bank,
            index_marker,
        },
    }
}

pub const ELECTRON_PATTERNS: &[FieldPattern] = &[
    scalar("BeamOutputChange", MetricField::RelativeOutput),
    scalar("BeamUniformityChange", MetricField::RelativeUniformity),
];

pub const XRAY_PATTERNS: &[FieldPattern] = &[
    scalar("BeamOutputChange", MetricField::RelativeOutput),
    scalar("BeamUniformityChange", MetricField::RelativeUniformity),
    scalar("BeamCenterShift", MetricField::CenterShift),
];

pub const GEOMETRY_PATTERNS: &[FieldPattern] = &[
    // Indexed leaves
    leaf("MLCBacklashLeavesA/MLCBacklashLeaf", LeafKind::Backlash, Bank::A, "MLCBacklashLeaf"),
    leaf("MLCBacklashLeavesB/MLCBacklashLeaf", LeafKind::Backlash, Bank::B, "MLCBacklashLeaf"),
    leaf("MLCLeavesA/MLCLeaf", LeafKind::Position, Bank::A, "MLCLeaf"),
    leaf("MLCLeavesB/MLCLeaf", LeafKind::Position, Bank::B, "MLCLeaf"),
    // MLC summaries
    scalar("MLCBacklashMaxA", MetricField::MlcBacklashMaxA),
    scalar("MLCBacklashMaxB", MetricField::MlcBacklashMaxB),
    scalar("MLCBacklashMeanA", MetricField::MlcBacklashMeanA),
    scalar("MLCBacklashMeanB", MetricField::MlcBacklashMeanB),
    scalar("MaxOffsetA", MetricField::MlcMaxOffsetA),
    scalar("MaxOffsetB", MetricField::MlcMaxOffsetB),
    scalar("MeanOffsetA", MetricField::MlcMeanOffsetA),
    scalar("MeanOffsetB", MetricField::MlcMeanOffsetB),
    // Jaws
    scalar("JawParallelismX1", MetricField::JawParallelismX1),
    scalar("JawParallelismX2", MetricField::JawParallelismX2),
    scalar("JawParallelismY1", MetricField::JawParallelismY1),
    scalar("JawParallelismY2", MetricField::JawParallelismY2),
    scalar("JawX1", MetricField::JawX1),
    scalar("JawX2", MetricField::JawX2),
    scalar("JawY1", MetricField::JawY1),
    scalar("JawY2", MetricField::JawY2),
    // Isocenter and beam
    scalar("IsoCenterSize", MetricField::IsoCenterSize),
    scalar("IsoCenterMVOffset", MetricField::IsoCenterMvOffset),
    scalar("IsoCenterKVOffset", MetricField::IsoCenterKvOffset),
    scalar("BeamOutputChange", MetricField::RelativeOutput),
    scalar("BeamUniformityChange", MetricField::RelativeUniformity),
    scalar("BeamCenterShift", MetricField::CenterShift),
    // Collimator and gantry
    scalar("CollimationRotationOffset", MetricField::CollimationRotationOffset),
    scalar("GantryAbsolute", MetricField::GantryAbsolute),
    scalar("GantryRelative", MetricField::GantryRelative),
    // Couch
    scalar("CouchMaxPositionError", MetricField::CouchMaxPositionError),
    scalar(
        "RotationInducedCouchShiftFullRange",
        MetricField::RotationInducedCouchShiftFullRange,
    ),
    scalar("CouchLat", MetricField::CouchLat),
    scalar("CouchLng", MetricField::CouchLng),
    scalar("CouchVrt", MetricField::CouchVrt),
    scalar("CouchRtnFine", MetricField::CouchRtnFine),
    scalar("CouchRtnLarge", MetricField::CouchRtnLarge),
];

/// First pattern contained in `name`
pub fn match_pattern<'a>(patterns: &'a [FieldPattern], name: &str) -> Option<&'a FieldPattern> {
    patterns.iter().find(|p| name.contains(p.pattern))
}

/// Leaf number following the last `index_marker` in `name`
///
/// `None` when no digits follow or the number does not fit.
pub fn parse_leaf_index(name: &str, index_marker: &str) -> Option<u32> {
    let start = name.rfind(index_marker)? + index_marker.len();
    let digits: String = name[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
