//! `Results.xml` and `SetBeam-*.xml` readers
//!
//! Elements are matched by local name. The console's default namespace is written
//! as `http:/www.varian.com/MPC` (single slash), so namespace URIs are not trusted.
//!
//! XML values are re-emitted under the same names the CSV export uses, so one
//! pattern table serves both formats.

use roxmltree::{Document, Node};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use super::ExportEntry;
use crate::error::ExtractionError;

/// `i:type` value marking beam-profile results
const BEAM_PROFILE_TYPE: &str = "BeamProfileCheck";
/// Couch rotations at or beyond this magnitude are large-range readings
const COUCH_RTN_FINE_LIMIT: i64 = 360;
/// Control point describing the linac itself
const LINAC_WORK_OBJECT: &str = "Linac";
const LEAVES_PER_BANK: usize = 60;

fn read_document(path: &Path) -> Result<String, ExtractionError> {
    std::fs::read_to_string(path).map_err(|e| ExtractionError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn parse_document<'a>(path: &Path, text: &'a str) -> Result<Document<'a>, ExtractionError> {
    Document::parse(text).map_err(|e| ExtractionError::Format {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn text_of(node: Node<'_, '_>) -> String {
    node.text().unwrap_or("").to_string()
}

fn has_type(node: Node<'_, '_>, type_name: &str) -> bool {
    node.attributes().any(|a| {
        a.name() == "type" && a.value().rsplit(':').next() == Some(type_name)
    })
}

/// Beam-profile and couch-reference values from `Results.xml`
pub fn read_results(
    path: &Path,
    sink: &mut dyn FnMut(ExportEntry),
) -> Result<(), ExtractionError> {
    let text = read_document(path)?;
    let doc = parse_document(path, &text)?;

    for check in doc
        .descendants()
        .filter(|n| n.is_element() && has_type(*n, BEAM_PROFILE_TYPE))
    {
        for (element, export_name) in [
            ("RelativeOutput", "BeamProfileCheck/BeamOutputChange"),
            ("RelativeUniformity", "BeamProfileCheck/BeamUniformityChange"),
            ("BeamCenterShift", "BeamProfileCheck/BeamCenterShift"),
        ] {
            if let Some(node) = child(check, element) {
                sink(ExportEntry::new(export_name, text_of(node)));
            }
        }
    }

    let couch = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "CouchReference");
    if let Some(couch) = couch {
        for node in couch.children().filter(|n| n.is_element()) {
            let value = text_of(node);
            let export_name = match node.tag_name().name() {
                "CouchLat" => "CouchReference/CouchLat",
                "CouchLng" => "CouchReference/CouchLng",
                "CouchVrt" => "CouchReference/CouchVrt",
                "CouchRtn" if is_large_rotation(&value) => "CouchReference/CouchRtnLarge",
                "CouchRtn" => "CouchReference/CouchRtnFine",
                _ => continue,
            };
            sink(ExportEntry::new(export_name, value));
        }
    }

    Ok(())
}

/// Unparsable rotations count as fine so the fallback lands in a single column
fn is_large_rotation(raw: &str) -> bool {
    Decimal::from_str(raw.trim())
        .map(|v| v.abs() >= Decimal::from(COUCH_RTN_FINE_LIMIT))
        .unwrap_or(false)
}

/// Gantry, collimator, jaw and MLC values from the first linac control point
pub fn read_set_beam(
    path: &Path,
    sink: &mut dyn FnMut(ExportEntry),
) -> Result<(), ExtractionError> {
    let text = read_document(path)?;
    let doc = parse_document(path, &text)?;

    let control_point = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "ControlPoints")
        .flat_map(|cps| cps.children())
        .filter(|n| n.is_element() && n.tag_name().name() == "Cp")
        .find(|cp| {
            child(*cp, "WorkObjectID")
                .and_then(|w| w.text())
                .map(|t| t.trim() == LINAC_WORK_OBJECT)
                .unwrap_or(false)
        });

    let Some(cp) = control_point else {
        tracing::debug!(file = %path.display(), "No linac control point in SetBeam file");
        return Ok(());
    };

    for (element, export_name) in [
        ("GantryRtn", "SetBeam/GantryAbsolute"),
        ("CollRtn", "SetBeam/CollimationRotationOffset"),
        ("X1", "SetBeam/JawX1"),
        ("X2", "SetBeam/JawX2"),
        ("Y1", "SetBeam/JawY1"),
        ("Y2", "SetBeam/JawY2"),
    ] {
        if let Some(node) = child(cp, element) {
            sink(ExportEntry::new(export_name, text_of(node)));
        }
    }

    if let Some(mlc) = child(cp, "Mlc") {
        for (bank, prefix) in [("A", "MLCLeavesA/MLCLeaf"), ("B", "MLCLeavesB/MLCLeaf")] {
            let Some(values) = child(mlc, bank).and_then(|n| n.text()) else {
                continue;
            };
            for (i, value) in values
                .split_whitespace()
                .take(LEAVES_PER_BANK)
                .enumerate()
            {
                sink(ExportEntry::new(format!("{}{}", prefix, i + 1), value));
            }
        }
    }

    Ok(())
}
