//! Data models for mpcp-etl

pub mod beam_record;
pub mod beam_type;
pub mod flat_record;
pub mod image_record;
pub mod leaf_table;
pub mod measurement;
pub mod metadata;
pub mod pipeline_state;

pub use beam_record::{
    BeamRecord, ElectronBeamRecord, GeometryBeamRecord, LeafKind, MetricField, MetricSink,
    RecordHeader, XRayBeamRecord, GEOMETRY_FIELDS,
};
pub use beam_type::{BeamFamily, BeamType, TableTag};
pub use flat_record::{ColumnKind, FlatRecord, FlatValue};
pub use image_record::{DetectorFrame, FieldMetrics, ImageMerge, ImageRecord, SkipReason};
pub use leaf_table::{Bank, InvalidLeafRange, LeafIndexOutOfRange, LeafRange, LeafTable};
pub use measurement::{Measurement, SENTINEL};
pub use metadata::{MachineSerial, PathMetadata};
pub use pipeline_state::{InvalidTransition, PipelineRun, PipelineState, StateTransition};
