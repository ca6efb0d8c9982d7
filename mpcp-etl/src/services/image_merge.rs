//! Image metric merge pass
//!
//! Resolves the folder's image triple, runs the analyzer and copies the four field
//! metrics onto the beam record. Every beam family goes through this pass.

use std::path::Path;
use std::sync::Arc;

use crate::error::{ImageAnalysisError, IngestError, IngestResult};
use crate::models::{BeamRecord, DetectorFrame, FieldMetrics, ImageMerge, ImageRecord, SkipReason};

/// Analyzer output
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnalysis {
    pub metrics: FieldMetrics,
    /// Flood/dark-corrected clinical frame, if the analyzer produced one
    pub corrected: Option<DetectorFrame>,
}

/// Flatness/symmetry analysis of a (clinical, dark, flood) image triple
pub trait ImageMetricAnalyzer: Send + Sync {
    fn analyze(
        &self,
        clinical: &Path,
        dark: &Path,
        flood: &Path,
    ) -> Result<ImageAnalysis, ImageAnalysisError>;
}

/// Image merge service
#[derive(Clone)]
pub struct ImageMerger {
    analyzer: Arc<dyn ImageMetricAnalyzer>,
    enabled: bool,
}

impl ImageMerger {
    pub fn new(analyzer: Arc<dyn ImageMetricAnalyzer>, enabled: bool) -> Self {
        Self { analyzer, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Settle the record's image slot
    ///
    /// Disabled analysis and missing files are recorded skips, not errors. An
    /// analyzer failure leaves the slot `Failed` and is returned to the caller.
    pub fn merge(&self, record: &mut BeamRecord, folder: &Path) -> IngestResult<()> {
        if !self.enabled {
            record.set_image(ImageMerge::Skipped(SkipReason::AnalysisDisabled));
            return Ok(());
        }

        let header = record.header();
        let mut image = ImageRecord::for_folder(folder, header.beam_type, &header.metadata);

        let missing = image.missing_files();
        if !missing.is_empty() {
            let reason = SkipReason::MissingImages(missing);
            tracing::warn!(folder = %folder.display(), "Image merge skipped: {}", reason);
            record.set_image(ImageMerge::Skipped(reason));
            return Ok(());
        }

        match self.analyzer.analyze(
            &image.image_path,
            &image.dark_image_path,
            &image.flood_image_path,
        ) {
            Ok(analysis) => {
                tracing::debug!(
                    folder = %folder.display(),
                    flatness_h = analysis.metrics.flatness_horizontal,
                    flatness_v = analysis.metrics.flatness_vertical,
                    symmetry_h = analysis.metrics.symmetry_horizontal,
                    symmetry_v = analysis.metrics.symmetry_vertical,
                    "Image metrics merged"
                );
                image.metrics = Some(analysis.metrics);
                image.pixels = analysis.corrected;
                record.set_image(ImageMerge::Merged(image));
                Ok(())
            }
            Err(source) => {
                let path = image.image_path.clone();
                record.set_image(ImageMerge::Failed {
                    image,
                    reason: source.to_string(),
                });
                Err(IngestError::ImageAnalysis { path, source })
            }
        }
    }
}

impl std::fmt::Debug for ImageMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageMerger")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
