//! Per-folder pipeline
//!
//! classify → resolve metadata → construct record → numeric pass → image pass →
//! persist. Each folder owns its record and run; nothing is shared between calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::IngestSettings;
use crate::db::PersistenceGateway;
use crate::error::{IngestError, IngestResult};
use crate::models::{BeamRecord, PipelineRun, PipelineState};
use crate::services::beam_classifier::{BeamClassifier, Classification};
use crate::services::folder_scanner::{FolderScanner, ScanError};
use crate::services::image_merge::{ImageMerger, ImageMetricAnalyzer};
use crate::services::numeric_extractor::{ExportSource, NumericFieldExtractor};
use crate::services::path_metadata::PathMetadataResolver;

/// How one folder ended
#[derive(Debug)]
pub enum FolderOutcome {
    /// Record complete and handed to the gateway
    Persisted {
        record: Box<BeamRecord>,
        run: PipelineRun,
    },
    /// Exclusion marker matched; nothing was read or stored
    Excluded { marker: String, run: PipelineRun },
    /// Extraction or image analysis failed after the record existed
    Incomplete {
        record: Box<BeamRecord>,
        error: IngestError,
        /// Whether the degraded record was stored anyway
        persisted: bool,
        run: PipelineRun,
    },
}

impl FolderOutcome {
    pub fn run(&self) -> &PipelineRun {
        match self {
            FolderOutcome::Persisted { run, .. }
            | FolderOutcome::Excluded { run, .. }
            | FolderOutcome::Incomplete { run, .. } => run,
        }
    }

    pub fn record(&self) -> Option<&BeamRecord> {
        match self {
            FolderOutcome::Persisted { record, .. } | FolderOutcome::Incomplete { record, .. } => {
                Some(record.as_ref())
            }
            FolderOutcome::Excluded { .. } => None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.run().state
    }
}

/// Batch run counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub discovered: usize,
    pub persisted: usize,
    pub excluded: usize,
    pub incomplete: usize,
    /// Folders that ended in an error, with the diagnostic
    pub failed: Vec<(PathBuf, String)>,
}

/// Beam-type dispatcher service
pub struct BeamTypeDispatcher {
    settings: IngestSettings,
    classifier: BeamClassifier,
    resolver: PathMetadataResolver,
    extractor: NumericFieldExtractor,
    images: ImageMerger,
    gateway: Arc<dyn PersistenceGateway>,
}

impl BeamTypeDispatcher {
    pub fn new(
        settings: IngestSettings,
        analyzer: Arc<dyn ImageMetricAnalyzer>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            classifier: BeamClassifier::new(settings.clone()),
            resolver: PathMetadataResolver::new(),
            extractor: NumericFieldExtractor::new(),
            images: ImageMerger::new(analyzer, settings.analyze_images),
            settings,
            gateway,
        }
    }

    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Run one measurement folder to a terminal state
    ///
    /// Unrecognized beam types, metadata failures and persistence failures are
    /// errors. Extraction and image-analysis failures yield
    /// [`FolderOutcome::Incomplete`] so the partial record stays inspectable.
    pub async fn process_folder(&self, folder: &Path) -> IngestResult<FolderOutcome> {
        let mut run = PipelineRun::new(folder);
        tracing::info!(run_id = %run.run_id, folder = %folder.display(), "Processing measurement folder");

        let beam_type = match self.classifier.classify(folder) {
            Ok(Classification::Beam(beam_type)) => beam_type,
            Ok(Classification::Excluded { marker }) => {
                run.transition_to(PipelineState::Rejected)?;
                return Ok(FolderOutcome::Excluded { marker, run });
            }
            Err(e) => {
                run.transition_to(PipelineState::Rejected)?;
                return Err(e);
            }
        };
        run.transition_to(PipelineState::Classified)?;

        let metadata = match self.resolver.resolve(folder) {
            Ok(metadata) => metadata,
            Err(e) => {
                run.transition_to(PipelineState::Rejected)?;
                return Err(e.into());
            }
        };

        let mut record = BeamRecord::new(
            beam_type,
            folder,
            metadata,
            self.classifier.leaf_range(folder),
        );

        let extraction = ExportSource::locate(folder, self.settings.export_preference)
            .and_then(|source| self.extractor.extract(&mut record, &source));
        if let Err(e) = extraction {
            return self.finish_incomplete(record, e.into(), run).await;
        }
        run.transition_to(PipelineState::NumericsExtracted)?;

        if let Err(e) = self.images.merge(&mut record, folder) {
            return self.finish_incomplete(record, e, run).await;
        }
        run.transition_to(PipelineState::ImageMerged)?;

        if let Err(e) = self.persist(&record, folder).await {
            run.transition_to(PipelineState::Incomplete)?;
            return Err(e);
        }
        run.transition_to(PipelineState::Persisted)?;

        tracing::info!(
            run_id = %run.run_id,
            folder = %folder.display(),
            beam_type = %beam_type,
            table = %record.table_tag(),
            "Measurement folder persisted"
        );
        Ok(FolderOutcome::Persisted {
            record: Box::new(record),
            run,
        })
    }

    /// Discover measurement folders under `root` and process each one
    ///
    /// Folder failures are logged and counted; the batch continues.
    pub async fn process_tree(
        &self,
        root: &Path,
        scanner: &FolderScanner,
    ) -> Result<ScanSummary, ScanError> {
        let folders = scanner.scan(root)?;
        let mut summary = ScanSummary {
            discovered: folders.len(),
            ..Default::default()
        };

        for folder in folders {
            match self.process_folder(&folder).await {
                Ok(FolderOutcome::Persisted { .. }) => summary.persisted += 1,
                Ok(FolderOutcome::Excluded { .. }) => summary.excluded += 1,
                Ok(FolderOutcome::Incomplete { .. }) => summary.incomplete += 1,
                Err(e) => {
                    match &e {
                        IngestError::UnrecognizedBeamType { .. } => {
                            tracing::warn!("{}", e)
                        }
                        _ => tracing::error!(folder = %folder.display(), "{}", e),
                    }
                    summary.failed.push((folder, e.to_string()));
                }
            }
        }

        tracing::info!(
            root = %root.display(),
            discovered = summary.discovered,
            persisted = summary.persisted,
            excluded = summary.excluded,
            incomplete = summary.incomplete,
            failed = summary.failed.len(),
            "Batch complete"
        );
        Ok(summary)
    }

    async fn finish_incomplete(
        &self,
        mut record: BeamRecord,
        error: IngestError,
        mut run: PipelineRun,
    ) -> IngestResult<FolderOutcome> {
        run.transition_to(PipelineState::Incomplete)?;
        record.set_note(error.to_string());

        let persisted = if self.settings.persist_incomplete {
            self.persist(&record, &run.folder).await?;
            true
        } else {
            false
        };

        tracing::warn!(
            run_id = %run.run_id,
            folder = %run.folder.display(),
            persisted,
            "Incomplete record: {}",
            error
        );
        Ok(FolderOutcome::Incomplete {
            record: Box::new(record),
            error,
            persisted,
            run,
        })
    }

    async fn persist(&self, record: &BeamRecord, folder: &Path) -> IngestResult<()> {
        self.gateway
            .persist(&record.table_tag(), &record.flatten())
            .await
            .map_err(|source| IngestError::Persistence {
                path: folder.to_path_buf(),
                source,
            })
    }
}

impl std::fmt::Debug for BeamTypeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeamTypeDispatcher")
            .field("settings", &self.settings)
            .field("images", &self.images)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DryRunGateway;
    use crate::services::field_analyzer::FieldAnalyzer;
    use tempfile::TempDir;

    fn dispatcher(gateway: Arc<DryRunGateway>) -> BeamTypeDispatcher {
        let settings = IngestSettings {
            analyze_images: false,
            ..IngestSettings::default()
        };
        BeamTypeDispatcher::new(settings, Arc::new(FieldAnalyzer::new()), gateway)
    }

    fn measurement_folder(root: &Path, template: &str) -> PathBuf {
        let folder = root.join(format!("NDS-WKS-SN6543-2025-09-19-07-41-49-0004-{}", template));
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(
            folder.join("Check.xml"),
            "<Check><IsBaseline>false</IsBaseline></Check>",
        )
        .unwrap();
        folder
    }

    #[tokio::test]
    async fn test_electron_folder_persisted() {
        let root = TempDir::new().unwrap();
        let folder = measurement_folder(root.path(), "BeamCheckTemplate6e");
        std::fs::write(
            folder.join("Results.csv"),
            "Name [Unit], Value\nBeamOutputChange [%], 0.98\nBeamUniformityChange [%], 0.12\n",
        )
        .unwrap();

        let gateway = Arc::new(DryRunGateway::new());
        let outcome = dispatcher(gateway.clone())
            .process_folder(&folder)
            .await
            .unwrap();

        assert_eq!(outcome.state(), PipelineState::Persisted);
        assert_eq!(
            outcome.run().history(),
            vec![
                PipelineState::Received,
                PipelineState::Classified,
                PipelineState::NumericsExtracted,
                PipelineState::ImageMerged,
                PipelineState::Persisted,
            ]
        );
        let calls = gateway.persisted().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_str(), "beam_6e");
    }

    #[tokio::test]
    async fn test_missing_export_is_incomplete_and_held() {
        let root = TempDir::new().unwrap();
        let folder = measurement_folder(root.path(), "BeamCheckTemplate10x");

        let gateway = Arc::new(DryRunGateway::new());
        let outcome = dispatcher(gateway.clone())
            .process_folder(&folder)
            .await
            .unwrap();

        match &outcome {
            FolderOutcome::Incomplete {
                error, persisted, ..
            } => {
                assert!(matches!(error, IngestError::Extraction(_)));
                assert!(!persisted);
            }
            other => panic!("expected incomplete outcome, got {:?}", other),
        }
        assert_eq!(outcome.state(), PipelineState::Incomplete);
        assert!(outcome.record().unwrap().header().note.is_some());
        assert!(gateway.persisted().await.is_empty());
    }

    #[tokio::test]
    async fn test_excluded_folder_is_noop() {
        let root = TempDir::new().unwrap();
        let folder = measurement_folder(root.path(), "GeometryCheckTemplate6xEnhancedMLC");

        let gateway = Arc::new(DryRunGateway::new());
        let outcome = dispatcher(gateway.clone())
            .process_folder(&folder)
            .await
            .unwrap();

        assert!(matches!(outcome, FolderOutcome::Excluded { .. }));
        assert_eq!(outcome.state(), PipelineState::Rejected);
        assert!(gateway.persisted().await.is_empty());
    }
}
