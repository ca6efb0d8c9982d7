//! Built-in flatness/symmetry analyzer
//!
//! Corrects the clinical frame against the dark and flood frames, takes band-averaged
//! central profiles, and evaluates them over the central part of the field
//! (Varian point-difference definitions).

use std::path::Path;

use crate::error::ImageAnalysisError;
use crate::models::{DetectorFrame, FieldMetrics};
use crate::services::image_merge::{ImageAnalysis, ImageMetricAnalyzer};
use crate::services::xim_reader::XimImage;

/// Lower bound on the flood gain so dead pixels do not divide by zero
const MIN_GAIN: f64 = 1e-6;
/// Field edge threshold, fraction of the profile maximum
const EDGE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldAnalyzer {
    /// Rows (or columns) averaged either side of the centre line
    pub band_half_width: usize,
    /// Fraction of the field width evaluated
    pub in_field_ratio: f64,
}

impl Default for FieldAnalyzer {
    fn default() -> Self {
        Self {
            band_half_width: 5,
            in_field_ratio: 0.8,
        }
    }
}

impl FieldAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics of an already corrected frame
    pub fn metrics(&self, frame: &DetectorFrame) -> Result<FieldMetrics, ImageAnalysisError> {
        let horizontal = self.horizontal_profile(frame);
        let vertical = self.vertical_profile(frame);
        let (flatness_horizontal, symmetry_horizontal) =
            self.evaluate(&horizontal, "horizontal")?;
        let (flatness_vertical, symmetry_vertical) = self.evaluate(&vertical, "vertical")?;

        Ok(FieldMetrics {
            flatness_horizontal,
            flatness_vertical,
            symmetry_horizontal,
            symmetry_vertical,
        })
    }

    fn horizontal_profile(&self, frame: &DetectorFrame) -> Vec<f64> {
        let rows = band(frame.height, self.band_half_width);
        (0..frame.width)
            .map(|x| mean(rows.clone().map(|y| frame.at(x, y) as f64)))
            .collect()
    }

    fn vertical_profile(&self, frame: &DetectorFrame) -> Vec<f64> {
        let cols = band(frame.width, self.band_half_width);
        (0..frame.height)
            .map(|y| mean(cols.clone().map(|x| frame.at(x, y) as f64)))
            .collect()
    }

    /// `(flatness, symmetry)` of one profile, percent
    fn evaluate(&self, profile: &[f64], axis: &'static str) -> Result<(f64, f64), ImageAnalysisError> {
        let no_field = || ImageAnalysisError::NoField { axis };

        let peak = profile.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !peak.is_finite() || peak <= 0.0 {
            return Err(no_field());
        }
        let threshold = peak * EDGE_THRESHOLD;
        let left = profile.iter().position(|&v| v >= threshold).ok_or_else(no_field)?;
        let right = profile.iter().rposition(|&v| v >= threshold).ok_or_else(no_field)?;
        if right <= left {
            return Err(no_field());
        }

        let center = (left + right) as f64 / 2.0;
        let half = (right - left) as f64 * self.in_field_ratio / 2.0;
        let lo = (center - half).ceil() as usize;
        let hi = (center + half).floor() as usize;
        if hi <= lo {
            return Err(no_field());
        }

        let region = &profile[lo..=hi];
        let max = region.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = region.iter().copied().fold(f64::INFINITY, f64::min);
        let flatness = if max + min > 0.0 {
            100.0 * (max - min) / (max + min)
        } else {
            0.0
        };

        let cax = sample(profile, center);
        if cax <= 0.0 {
            return Err(no_field());
        }
        let mut symmetry = 0.0_f64;
        let steps = half.floor() as usize;
        for d in 0..=steps {
            let offset = d as f64;
            let diff = 100.0 * (sample(profile, center - offset) - sample(profile, center + offset)) / cax;
            if diff.abs() > symmetry.abs() {
                symmetry = diff;
            }
        }

        Ok((flatness, symmetry))
    }
}

impl ImageMetricAnalyzer for FieldAnalyzer {
    fn analyze(
        &self,
        clinical: &Path,
        dark: &Path,
        flood: &Path,
    ) -> Result<ImageAnalysis, ImageAnalysisError> {
        let clinical = XimImage::read(clinical)?.to_frame();
        let dark = XimImage::read(dark)?.to_frame();
        let flood = XimImage::read(flood)?.to_frame();

        let corrected = correct(&clinical, &dark, &flood)?;
        let metrics = self.metrics(&corrected)?;
        Ok(ImageAnalysis {
            metrics,
            corrected: Some(corrected),
        })
    }
}

/// `(clinical - dark) / max(flood - dark, MIN_GAIN)`
pub fn correct(
    clinical: &DetectorFrame,
    dark: &DetectorFrame,
    flood: &DetectorFrame,
) -> Result<DetectorFrame, ImageAnalysisError> {
    if clinical.dimensions() != dark.dimensions() || clinical.dimensions() != flood.dimensions() {
        return Err(ImageAnalysisError::DimensionMismatch {
            clinical: clinical.dimensions(),
            dark: dark.dimensions(),
            flood: flood.dimensions(),
        });
    }

    let pixels = clinical
        .pixels
        .iter()
        .zip(&dark.pixels)
        .zip(&flood.pixels)
        .map(|((&c, &d), &f)| {
            let gain = (f as f64 - d as f64).max(MIN_GAIN);
            ((c as f64 - d as f64) / gain) as f32
        })
        .collect();

    Ok(DetectorFrame::new(clinical.width, clinical.height, pixels))
}

/// Indices within `half_width` of the centre line, clamped to the frame
fn band(len: usize, half_width: usize) -> std::ops::Range<usize> {
    let center = len / 2;
    center.saturating_sub(half_width)..(center + half_width + 1).min(len)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Linear interpolation at a fractional index, clamped to the profile
fn sample(profile: &[f64], position: f64) -> f64 {
    let last = profile.len().saturating_sub(1);
    let position = position.clamp(0.0, last as f64);
    let i = position.floor() as usize;
    let frac = position - i as f64;
    if i >= last {
        profile[last]
    } else {
        profile[i] * (1.0 - frac) + profile[i + 1] * frac
    }
}
