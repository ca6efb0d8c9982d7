//! Pipeline services
//!
//! Classification and metadata resolution, the numeric and image passes, folder
//! discovery, and the dispatcher that runs them in order.

pub mod beam_classifier;
pub mod dispatcher;
pub mod field_analyzer;
pub mod folder_scanner;
pub mod image_merge;
pub mod numeric_extractor;
pub mod path_metadata;
pub mod xim_reader;

pub use beam_classifier::{BeamClassifier, Classification};
pub use dispatcher::{BeamTypeDispatcher, FolderOutcome, ScanSummary};
pub use field_analyzer::FieldAnalyzer;
pub use folder_scanner::{FolderScanner, ScanError};
pub use image_merge::{ImageAnalysis, ImageMerger, ImageMetricAnalyzer};
pub use numeric_extractor::{ExportEntry, ExportSource, ExtractionSummary, NumericFieldExtractor};
pub use path_metadata::PathMetadataResolver;
pub use xim_reader::{XimError, XimImage};
