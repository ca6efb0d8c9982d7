//! Beam record variants
//!
//! One closed enum over the three record shapes. The shape is chosen from
//! [`BeamFamily`] at construction; the numeric pass fills it through
//! [`MetricSink`] and the image pass through [`BeamRecord::set_image`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mpcp_common::time::naive_to_iso8601;

use super::beam_type::{BeamFamily, BeamType, TableTag};
use super::flat_record::{ColumnKind, FlatRecord, FlatValue};
use super::image_record::ImageMerge;
use super::leaf_table::{Bank, LeafRange, LeafTable};
use super::measurement::Measurement;
use super::metadata::PathMetadata;

/// Named scalar measurements across all record shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricField {
    RelativeOutput,
    RelativeUniformity,
    CenterShift,
    IsoCenterSize,
    IsoCenterMvOffset,
    IsoCenterKvOffset,
    CollimationRotationOffset,
    GantryAbsolute,
    GantryRelative,
    CouchMaxPositionError,
    CouchLat,
    CouchLng,
    CouchVrt,
    CouchRtnFine,
    CouchRtnLarge,
    RotationInducedCouchShiftFullRange,
    JawX1,
    JawX2,
    JawY1,
    JawY2,
    JawParallelismX1,
    JawParallelismX2,
    JawParallelismY1,
    JawParallelismY2,
    MlcMaxOffsetA,
    MlcMaxOffsetB,
    MlcMeanOffsetA,
    MlcMeanOffsetB,
    MlcBacklashMaxA,
    MlcBacklashMaxB,
    MlcBacklashMeanA,
    MlcBacklashMeanB,
}

/// Geometry-only scalars, in column order
pub const GEOMETRY_FIELDS: [MetricField; 29] = [
    MetricField::IsoCenterSize,
    MetricField::IsoCenterMvOffset,
    MetricField::IsoCenterKvOffset,
    MetricField::CollimationRotationOffset,
    MetricField::GantryAbsolute,
    MetricField::GantryRelative,
    MetricField::CouchMaxPositionError,
    MetricField::CouchLat,
    MetricField::CouchLng,
    MetricField::CouchVrt,
    MetricField::CouchRtnFine,
    MetricField::CouchRtnLarge,
    MetricField::RotationInducedCouchShiftFullRange,
    MetricField::JawX1,
    MetricField::JawX2,
    MetricField::JawY1,
    MetricField::JawY2,
    MetricField::JawParallelismX1,
    MetricField::JawParallelismX2,
    MetricField::JawParallelismY1,
    MetricField::JawParallelismY2,
    MetricField::MlcMaxOffsetA,
    MetricField::MlcMaxOffsetB,
    MetricField::MlcMeanOffsetA,
    MetricField::MlcMeanOffsetB,
    MetricField::MlcBacklashMaxA,
    MetricField::MlcBacklashMaxB,
    MetricField::MlcBacklashMeanA,
    MetricField::MlcBacklashMeanB,
];

impl MetricField {
    pub fn column(self) -> &'static str {
        match self {
            MetricField::RelativeOutput => "relative_output",
            MetricField::RelativeUniformity => "relative_uniformity",
            MetricField::CenterShift => "center_shift",
            MetricField::IsoCenterSize => "isocenter_size",
            MetricField::IsoCenterMvOffset => "isocenter_mv_offset",
            MetricField::IsoCenterKvOffset => "isocenter_kv_offset",
            MetricField::CollimationRotationOffset => "collimation_rotation_offset",
            MetricField::GantryAbsolute => "gantry_absolute",
            MetricField::GantryRelative => "gantry_relative",
            MetricField::CouchMaxPositionError => "couch_max_position_error",
            MetricField::CouchLat => "couch_lat",
            MetricField::CouchLng => "couch_lng",
            MetricField::CouchVrt => "couch_vrt",
            MetricField::CouchRtnFine => "couch_rtn_fine",
            MetricField::CouchRtnLarge => "couch_rtn_large",
            MetricField::RotationInducedCouchShiftFullRange => {
                "rotation_induced_couch_shift_full_range"
            }
            MetricField::JawX1 => "jaw_x1",
            MetricField::JawX2 => "jaw_x2",
            MetricField::JawY1 => "jaw_y1",
            MetricField::JawY2 => "jaw_y2",
            MetricField::JawParallelismX1 => "jaw_parallelism_x1",
            MetricField::JawParallelismX2 => "jaw_parallelism_x2",
            MetricField::JawParallelismY1 => "jaw_parallelism_y1",
            MetricField::JawParallelismY2 => "jaw_parallelism_y2",
            MetricField::MlcMaxOffsetA => "mlc_max_offset_a",
            MetricField::MlcMaxOffsetB => "mlc_max_offset_b",
            MetricField::MlcMeanOffsetA => "mlc_mean_offset_a",
            MetricField::MlcMeanOffsetB => "mlc_mean_offset_b",
            MetricField::MlcBacklashMaxA => "mlc_backlash_max_a",
            MetricField::MlcBacklashMaxB => "mlc_backlash_max_b",
            MetricField::MlcBacklashMeanA => "mlc_backlash_mean_a",
            MetricField::MlcBacklashMeanB => "mlc_backlash_mean_b",
        }
    }
}

/// Which indexed leaf collection a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Position,
    Backlash,
}

/// Write access used by the numeric extraction pass
pub trait MetricSink {
    /// Store a scalar; `false` when this record shape has no such field
    fn set_metric(&mut self, field: MetricField, value: Measurement) -> bool;

    fn leaf_table_mut(&mut self, _kind: LeafKind) -> Option<&mut LeafTable> {
        None
    }
}

/// Attributes shared by every record shape
#[derive(Debug, Clone, PartialEq)]
pub struct RecordHeader {
    pub beam_type: BeamType,
    pub source_path: PathBuf,
    pub metadata: PathMetadata,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectronBeamRecord {
    pub header: RecordHeader,
    pub relative_output: Measurement,
    pub relative_uniformity: Measurement,
    pub image: ImageMerge,
}

impl ElectronBeamRecord {
    pub fn new(header: RecordHeader) -> Self {
        Self {
            header,
            relative_output: Measurement::NotReported,
            relative_uniformity: Measurement::NotReported,
            image: ImageMerge::Pending,
        }
    }
}

impl MetricSink for ElectronBeamRecord {
    fn set_metric(&mut self, field: MetricField, value: Measurement) -> bool {
        match field {
            MetricField::RelativeOutput => self.relative_output = value,
            MetricField::RelativeUniformity => self.relative_uniformity = value,
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XRayBeamRecord {
    pub header: RecordHeader,
    pub relative_output: Measurement,
    pub relative_uniformity: Measurement,
    pub center_shift: Measurement,
    pub image: ImageMerge,
}

impl XRayBeamRecord {
    pub fn new(header: RecordHeader) -> Self {
        Self {
            header,
            relative_output: Measurement::NotReported,
            relative_uniformity: Measurement::NotReported,
            center_shift: Measurement::NotReported,
            image: ImageMerge::Pending,
        }
    }
}

impl MetricSink for XRayBeamRecord {
    fn set_metric(&mut self, field: MetricField, value: Measurement) -> bool {
        match field {
            MetricField::RelativeOutput => self.relative_output = value,
            MetricField::RelativeUniformity => self.relative_uniformity = value,
            MetricField::CenterShift => self.center_shift = value,
            _ => return false,
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBeamRecord {
    pub header: RecordHeader,
    pub relative_output: Measurement,
    pub relative_uniformity: Measurement,
    pub center_shift: Measurement,
    scalars: BTreeMap<MetricField, Measurement>,
    pub mlc_leaf_position: LeafTable,
    pub mlc_backlash: LeafTable,
    pub image: ImageMerge,
}

impl GeometryBeamRecord {
    pub fn new(header: RecordHeader, leaf_range: LeafRange) -> Self {
        Self {
            header,
            relative_output: Measurement::NotReported,
            relative_uniformity: Measurement::NotReported,
            center_shift: Measurement::NotReported,
            scalars: GEOMETRY_FIELDS
                .iter()
                .map(|f| (*f, Measurement::NotReported))
                .collect(),
            mlc_leaf_position: LeafTable::new(leaf_range),
            mlc_backlash: LeafTable::new(leaf_range),
            image: ImageMerge::Pending,
        }
    }

    pub fn leaf_range(&self) -> LeafRange {
        self.mlc_leaf_position.range()
    }

    /// Geometry scalar; `None` for fields outside [`GEOMETRY_FIELDS`]
    pub fn scalar(&self, field: MetricField) -> Option<&Measurement> {
        self.scalars.get(&field)
    }
}

impl MetricSink for GeometryBeamRecord {
    fn set_metric(&mut self, field: MetricField, value: Measurement) -> bool {
        match field {
            MetricField::RelativeOutput => self.relative_output = value,
            MetricField::RelativeUniformity => self.relative_uniformity = value,
            MetricField::CenterShift => self.center_shift = value,
            other => match self.scalars.get_mut(&other) {
                Some(slot) => *slot = value,
                None => return false,
            },
        }
        true
    }

    fn leaf_table_mut(&mut self, kind: LeafKind) -> Option<&mut LeafTable> {
        Some(match kind {
            LeafKind::Position => &mut self.mlc_leaf_position,
            LeafKind::Backlash => &mut self.mlc_backlash,
        })
    }
}

/// A measurement folder's record, one variant per [`BeamFamily`]
#[derive(Debug, Clone, PartialEq)]
pub enum BeamRecord {
    Electron(ElectronBeamRecord),
    XRay(XRayBeamRecord),
    Geometry(GeometryBeamRecord),
}

impl BeamRecord {
    /// Fresh record with every numeric field unreported and the image pass pending
    pub fn new(
        beam_type: BeamType,
        source_path: &Path,
        metadata: PathMetadata,
        leaf_range: LeafRange,
    ) -> Self {
        let header = RecordHeader {
            beam_type,
            source_path: source_path.to_path_buf(),
            metadata,
            note: None,
        };
        match beam_type.family() {
            BeamFamily::Electron => BeamRecord::Electron(ElectronBeamRecord::new(header)),
            BeamFamily::XRay => BeamRecord::XRay(XRayBeamRecord::new(header)),
            BeamFamily::Geometry => {
                BeamRecord::Geometry(GeometryBeamRecord::new(header, leaf_range))
            }
        }
    }

    pub fn header(&self) -> &RecordHeader {
        match self {
            BeamRecord::Electron(r) => &r.header,
            BeamRecord::XRay(r) => &r.header,
            BeamRecord::Geometry(r) => &r.header,
        }
    }

    pub fn beam_type(&self) -> BeamType {
        self.header().beam_type
    }

    pub fn table_tag(&self) -> TableTag {
        self.beam_type().table_tag()
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        let header = match self {
            BeamRecord::Electron(r) => &mut r.header,
            BeamRecord::XRay(r) => &mut r.header,
            BeamRecord::Geometry(r) => &mut r.header,
        };
        header.note = Some(note.into());
    }

    pub fn image(&self) -> &ImageMerge {
        match self {
            BeamRecord::Electron(r) => &r.image,
            BeamRecord::XRay(r) => &r.image,
            BeamRecord::Geometry(r) => &r.image,
        }
    }

    pub fn set_image(&mut self, image: ImageMerge) {
        match self {
            BeamRecord::Electron(r) => r.image = image,
            BeamRecord::XRay(r) => r.image = image,
            BeamRecord::Geometry(r) => r.image = image,
        }
    }

    /// Scalar lookup across shapes; `None` when the shape has no such field
    pub fn metric(&self, field: MetricField) -> Option<&Measurement> {
        match (self, field) {
            (BeamRecord::Electron(r), MetricField::RelativeOutput) => Some(&r.relative_output),
            (BeamRecord::Electron(r), MetricField::RelativeUniformity) => {
                Some(&r.relative_uniformity)
            }
            (BeamRecord::Electron(_), _) => None,
            (BeamRecord::XRay(r), MetricField::RelativeOutput) => Some(&r.relative_output),
            (BeamRecord::XRay(r), MetricField::RelativeUniformity) => Some(&r.relative_uniformity),
            (BeamRecord::XRay(r), MetricField::CenterShift) => Some(&r.center_shift),
            (BeamRecord::XRay(_), _) => None,
            (BeamRecord::Geometry(r), MetricField::RelativeOutput) => Some(&r.relative_output),
            (BeamRecord::Geometry(r), MetricField::RelativeUniformity) => {
                Some(&r.relative_uniformity)
            }
            (BeamRecord::Geometry(r), MetricField::CenterShift) => Some(&r.center_shift),
            (BeamRecord::Geometry(r), other) => r.scalar(other),
        }
    }

    pub fn as_electron(&self) -> Option<&ElectronBeamRecord> {
        match self {
            BeamRecord::Electron(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_xray(&self) -> Option<&XRayBeamRecord> {
        match self {
            BeamRecord::XRay(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&GeometryBeamRecord> {
        match self {
            BeamRecord::Geometry(r) => Some(r),
            _ => None,
        }
    }

    /// Serialize for persistence
    ///
    /// Decimals become `f64` (sentinel `-1` when unreported or unparsable),
    /// the acquisition time an ISO-8601 string, leaf tables JSON objects.
    /// Image metrics are NULL until the merge has produced them.
    pub fn flatten(&self) -> FlatRecord {
        let header = self.header();
        let mut flat = FlatRecord::new();

        flat.push("beam_type", FlatValue::Text(header.beam_type.token().to_string()));
        flat.push(
            "machine_serial",
            FlatValue::Text(header.metadata.machine_serial.to_string()),
        );
        flat.push(
            "acquisition_time",
            FlatValue::Text(naive_to_iso8601(&header.metadata.acquisition_time)),
        );
        flat.push("is_baseline", FlatValue::Bool(header.metadata.is_baseline));
        flat.push(
            "source_path",
            FlatValue::Text(header.source_path.display().to_string()),
        );
        flat.push(
            "note",
            header
                .note
                .clone()
                .map(FlatValue::Text)
                .unwrap_or(FlatValue::Null(ColumnKind::Text)),
        );

        let real = |m: &Measurement| FlatValue::Real(m.to_f64_or_sentinel());

        match self {
            BeamRecord::Electron(r) => {
                flat.push("relative_output", real(&r.relative_output));
                flat.push("relative_uniformity", real(&r.relative_uniformity));
            }
            BeamRecord::XRay(r) => {
                flat.push("relative_output", real(&r.relative_output));
                flat.push("relative_uniformity", real(&r.relative_uniformity));
                flat.push("center_shift", real(&r.center_shift));
            }
            BeamRecord::Geometry(r) => {
                flat.push("relative_output", real(&r.relative_output));
                flat.push("relative_uniformity", real(&r.relative_uniformity));
                flat.push("center_shift", real(&r.center_shift));
                for field in GEOMETRY_FIELDS {
                    let value = r.scalar(field).cloned().unwrap_or_default();
                    flat.push(field.column(), real(&value));
                }
                flat.push("mlc_leaves_a", FlatValue::Json(r.mlc_leaf_position.to_json(Bank::A)));
                flat.push("mlc_leaves_b", FlatValue::Json(r.mlc_leaf_position.to_json(Bank::B)));
                flat.push("mlc_backlash_a", FlatValue::Json(r.mlc_backlash.to_json(Bank::A)));
                flat.push("mlc_backlash_b", FlatValue::Json(r.mlc_backlash.to_json(Bank::B)));
            }
        }

        let metrics = self.image().metrics();
        let metric = |pick: fn(&super::image_record::FieldMetrics) -> f64| {
            metrics
                .map(|m| FlatValue::Real(pick(m)))
                .unwrap_or(FlatValue::Null(ColumnKind::Real))
        };
        flat.push("flatness_horizontal", metric(|m| m.flatness_horizontal));
        flat.push("flatness_vertical", metric(|m| m.flatness_vertical));
        flat.push("symmetry_horizontal", metric(|m| m.symmetry_horizontal));
        flat.push("symmetry_vertical", metric(|m| m.symmetry_vertical));
        flat.push(
            "image_name",
            self.image()
                .image()
                .map(|i| FlatValue::Text(i.generated_image_name.clone()))
                .unwrap_or(FlatValue::Null(ColumnKind::Text)),
        );

        flat
    }
}

impl MetricSink for BeamRecord {
    fn set_metric(&mut self, field: MetricField, value: Measurement) -> bool {
        match self {
            BeamRecord::Electron(r) => r.set_metric(field, value),
            BeamRecord::XRay(r) => r.set_metric(field, value),
            BeamRecord::Geometry(r) => r.set_metric(field, value),
        }
    }

    fn leaf_table_mut(&mut self, kind: LeafKind) -> Option<&mut LeafTable> {
        match self {
            BeamRecord::Geometry(r) => r.leaf_table_mut(kind),
            _ => None,
        }
    }
}
