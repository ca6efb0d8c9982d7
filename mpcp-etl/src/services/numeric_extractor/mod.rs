//! Numeric field extraction
//!
//! Both export forms are reduced to a stream of [`ExportEntry`] values; one
//! substring-matching scan then routes each entry into the record through
//! [`MetricSink`]. Values that fail to parse are stored as
//! [`Measurement::Unavailable`] and never abort the scan.

pub mod csv_export;
pub mod patterns;
pub mod xml_export;

use std::path::{Path, PathBuf};

use mpcp_common::ExportPreference;

use crate::error::ExtractionError;
use crate::models::{
    BeamRecord, ElectronBeamRecord, GeometryBeamRecord, Measurement, MetricSink, XRayBeamRecord,
};
use patterns::{
    match_pattern, parse_leaf_index, FieldPattern, Target, ELECTRON_PATTERNS, GEOMETRY_PATTERNS,
    XRAY_PATTERNS,
};

pub const RESULTS_CSV: &str = "Results.csv";
pub const RESULTS_XML: &str = "Results.xml";
const SET_BEAM_PREFIX: &str = "SetBeam-";

/// One `(name, raw value)` pair from an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    pub name: String,
    pub value: String,
}

impl ExportEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Measurement export of one folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSource {
    Csv(PathBuf),
    Xml {
        results: PathBuf,
        /// Control-point companion; geometry values only
        set_beam: Option<PathBuf>,
    },
}

impl ExportSource {
    /// Pick the folder's export, trying the preferred form first
    pub fn locate(folder: &Path, preference: ExportPreference) -> Result<Self, ExtractionError> {
        let csv = folder.join(RESULTS_CSV);
        let xml = folder.join(RESULTS_XML);

        let as_csv = || csv.is_file().then(|| ExportSource::Csv(csv.clone()));
        let as_xml = || {
            xml.is_file().then(|| ExportSource::Xml {
                results: xml.clone(),
                set_beam: find_set_beam(folder),
            })
        };

        let found = match preference {
            ExportPreference::Csv => as_csv().or_else(as_xml),
            ExportPreference::Xml => as_xml().or_else(as_csv),
        };

        found.ok_or_else(|| ExtractionError::Io {
            path: folder.to_path_buf(),
            reason: format!("neither {} nor {} present", RESULTS_CSV, RESULTS_XML),
        })
    }

    /// The primary export file
    pub fn path(&self) -> &Path {
        match self {
            ExportSource::Csv(path) => path,
            ExportSource::Xml { results, .. } => results,
        }
    }

    pub fn format_name(&self) -> &'static str {
        match self {
            ExportSource::Csv(_) => "csv",
            ExportSource::Xml { .. } => "xml",
        }
    }

    /// Stream every entry; entries delivered before an error stay delivered
    pub fn for_each_entry(
        &self,
        sink: &mut dyn FnMut(ExportEntry),
    ) -> Result<(), ExtractionError> {
        match self {
            ExportSource::Csv(path) => csv_export::read_entries(path, sink),
            ExportSource::Xml { results, set_beam } => {
                xml_export::read_results(results, sink)?;
                if let Some(set_beam) = set_beam {
                    xml_export::read_set_beam(set_beam, sink)?;
                }
                Ok(())
            }
        }
    }
}

/// First `SetBeam-*.xml` by file name
fn find_set_beam(folder: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(folder).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(SET_BEAM_PREFIX) && n.ends_with(".xml"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

/// Counters from one extraction call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Entries stored on the record, fallbacks included
    pub matched: usize,
    /// Entries stored as unavailable
    pub fallbacks: usize,
    /// Leaf entries outside the record's range or without an index
    pub dropped_leaves: usize,
    /// Entries matching no pattern, or a field this record shape lacks
    pub ignored: usize,
}

/// Numeric extractor service
#[derive(Debug, Clone, Default)]
pub struct NumericFieldExtractor;

impl NumericFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_electron(
        &self,
        record: &mut ElectronBeamRecord,
        source: &ExportSource,
    ) -> Result<ExtractionSummary, ExtractionError> {
        scan(record, ELECTRON_PATTERNS, source)
    }

    pub fn extract_xray(
        &self,
        record: &mut XRayBeamRecord,
        source: &ExportSource,
    ) -> Result<ExtractionSummary, ExtractionError> {
        scan(record, XRAY_PATTERNS, source)
    }

    pub fn extract_geometry(
        &self,
        record: &mut GeometryBeamRecord,
        source: &ExportSource,
    ) -> Result<ExtractionSummary, ExtractionError> {
        scan(record, GEOMETRY_PATTERNS, source)
    }

    /// Route to the variant's extraction method
    pub fn extract(
        &self,
        record: &mut BeamRecord,
        source: &ExportSource,
    ) -> Result<ExtractionSummary, ExtractionError> {
        let summary = match record {
            BeamRecord::Electron(r) => self.extract_electron(r, source),
            BeamRecord::XRay(r) => self.extract_xray(r, source),
            BeamRecord::Geometry(r) => self.extract_geometry(r, source),
        }?;

        tracing::debug!(
            export = %source.path().display(),
            format = source.format_name(),
            matched = summary.matched,
            fallbacks = summary.fallbacks,
            dropped_leaves = summary.dropped_leaves,
            ignored = summary.ignored,
            "Numeric extraction complete"
        );
        Ok(summary)
    }
}

fn scan<S: MetricSink>(
    record: &mut S,
    patterns: &[FieldPattern],
    source: &ExportSource,
) -> Result<ExtractionSummary, ExtractionError> {
    let mut summary = ExtractionSummary::default();
    let result = source.for_each_entry(&mut |entry| {
        apply_entry(record, patterns, &entry, &mut summary);
    });

    if let Err(e) = &result {
        tracing::warn!(
            export = %source.path().display(),
            matched = summary.matched,
            error = %e,
            "Extraction stopped early; fields read so far are kept"
        );
    }
    result.map(|_| summary)
}

fn apply_entry<S: MetricSink>(
    record: &mut S,
    patterns: &[FieldPattern],
    entry: &ExportEntry,
    summary: &mut ExtractionSummary,
) {
    let Some(pattern) = match_pattern(patterns, &entry.name) else {
        summary.ignored += 1;
        return;
    };

    let value = Measurement::parse(&entry.value);

    let stored = match pattern.target {
        Target::Scalar(field) => record.set_metric(field, value.clone()),
        Target::Leaf {
            kind,
            bank,
            index_marker,
        } => {
            let Some(index) = parse_leaf_index(&entry.name, index_marker) else {
                tracing::warn!(field = %entry.name, "Leaf field without a usable index, dropped");
                summary.dropped_leaves += 1;
                return;
            };
            let Some(table) = record.leaf_table_mut(kind) else {
                summary.ignored += 1;
                return;
            };
            match table.set(bank, index, value.clone()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(field = %entry.name, "{}, dropped", e);
                    summary.dropped_leaves += 1;
                    return;
                }
            }
        }
    };

    if !stored {
        summary.ignored += 1;
        return;
    }

    summary.matched += 1;
    if let Measurement::Unavailable { raw } = &value {
        summary.fallbacks += 1;
        tracing::warn!(
            field = %entry.name,
            raw = %raw,
            "Non-numeric value, stored as unavailable"
        );
    }
}
