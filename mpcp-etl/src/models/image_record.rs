//! Beam-profile image and its derived field metrics

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::beam_type::BeamType;
use super::metadata::PathMetadata;

/// Clinical profile image written by the console
pub const PROFILE_IMAGE_FILE: &str = "BeamProfileCheck.xim";
/// Open-field flood image acquired with the check
pub const FLOOD_IMAGE_FILE: &str = "Floodfield-Raw.xim";
/// Dark-field offset frame
pub const DARK_IMAGE_FILE: &str = "Offset.dat";

/// Decoded detector frame, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorFrame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<f32>,
}

impl DetectorFrame {
    pub fn new(width: usize, height: usize, pixels: Vec<f32>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.pixels[y * self.width + x]
    }
}

/// Flatness/symmetry of the corrected profile image, percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldMetrics {
    pub flatness_horizontal: f64,
    pub flatness_vertical: f64,
    pub symmetry_horizontal: f64,
    pub symmetry_vertical: f64,
}

/// The image triple for one measurement folder
///
/// Metrics stay `None` until an analyzer call has succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub image_path: PathBuf,
    pub flood_image_path: PathBuf,
    pub dark_image_path: PathBuf,
    pub generated_image_name: String,
    /// Corrected frame, when the analyzer exposes one
    pub pixels: Option<DetectorFrame>,
    pub metrics: Option<FieldMetrics>,
}

impl ImageRecord {
    /// Derive the flood and dark paths from the profile image by filename substitution
    pub fn from_profile_image(
        image_path: &Path,
        beam_type: BeamType,
        metadata: &PathMetadata,
    ) -> Self {
        Self {
            image_path: image_path.to_path_buf(),
            flood_image_path: image_path.with_file_name(FLOOD_IMAGE_FILE),
            dark_image_path: image_path.with_file_name(DARK_IMAGE_FILE),
            generated_image_name: format!(
                "{}_{}_{}.png",
                metadata.machine_serial,
                beam_type.token(),
                metadata.acquisition_time.format("%Y%m%d%H%M%S")
            ),
            pixels: None,
            metrics: None,
        }
    }

    /// The image triple of a measurement folder
    pub fn for_folder(folder: &Path, beam_type: BeamType, metadata: &PathMetadata) -> Self {
        Self::from_profile_image(&folder.join(PROFILE_IMAGE_FILE), beam_type, metadata)
    }

    /// Paths of the triple that do not exist on disk
    pub fn missing_files(&self) -> Vec<PathBuf> {
        [
            &self.image_path,
            &self.dark_image_path,
            &self.flood_image_path,
        ]
        .into_iter()
        .filter(|p| !p.is_file())
        .cloned()
        .collect()
    }
}

/// Why the image merge pass did not run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Image analysis disabled (test bench or `--skip-images`)
    AnalysisDisabled,
    MissingImages(Vec<PathBuf>),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AnalysisDisabled => f.write_str("image analysis disabled"),
            SkipReason::MissingImages(paths) => {
                let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                write!(f, "missing image files: {}", names.join(", "))
            }
        }
    }
}

/// Image pass state carried by every beam record
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ImageMerge {
    #[default]
    Pending,
    Merged(ImageRecord),
    Skipped(SkipReason),
    Failed { image: ImageRecord, reason: String },
}

impl ImageMerge {
    pub fn metrics(&self) -> Option<&FieldMetrics> {
        match self {
            ImageMerge::Merged(image) => image.metrics.as_ref(),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImageRecord> {
        match self {
            ImageMerge::Merged(image) | ImageMerge::Failed { image, .. } => Some(image),
            _ => None,
        }
    }

    /// The merge ran or was skipped for a recorded reason
    pub fn is_settled(&self) -> bool {
        matches!(self, ImageMerge::Merged(_) | ImageMerge::Skipped(_))
    }
}
