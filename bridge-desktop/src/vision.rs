//! Face detection using the SeetaFace frontal cascade (`rustface`).

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    vision::FaceDetector,
};
use bytes::Bytes;
use rustface::ImageData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Each pyramid level is the previous one shrunk by a 1.05 scale step.
const PYRAMID_SCALE_FACTOR: f32 = 1.0 / 1.05;

/// Smallest face region considered, in pixels.
const MIN_FACE_SIZE: u32 = 20;

/// Cascade score a window needs to count as a face. This is rustface's own
/// default. It is a classifier score, not a neighbour count: overlapping
/// windows are already merged by the detector, and raising it far above the
/// default suppresses most real faces.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 2.0;

const SLIDE_WINDOW_STEP: u32 = 4;

/// Frontal face detector backed by a SeetaFace model file.
///
/// The model is loaded per detection because the detector keeps mutable
/// scratch state and is not shareable across tasks.
pub struct CascadeFaceDetector {
    model_path: PathBuf,
    score_threshold: f64,
}

impl CascadeFaceDetector {
    /// Create a detector for the model at `model_path`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the model file does not exist.
    pub fn new(model_path: impl Into<PathBuf>) -> Result<Self> {
        let model_path = model_path.into();
        if !model_path.is_file() {
            return Err(BridgeError::NotFound(format!(
                "face model {}",
                model_path.display()
            )));
        }
        Ok(Self {
            model_path,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        })
    }

    /// Override the cascade score threshold.
    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn score_threshold(&self) -> f64 {
        self.score_threshold
    }

    fn detect_blocking(model_path: &Path, score_threshold: f64, image: &[u8]) -> Result<usize> {
        let gray = image::load_from_memory(image)
            .map_err(|e| BridgeError::Undecodable(e.to_string()))?
            .to_luma8();
        let (width, height) = gray.dimensions();

        let model = model_path.to_string_lossy();
        let mut detector = rustface::create_detector(&model).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to load face model: {}", e))
        })?;
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(score_threshold);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        detector.set_slide_window_step(SLIDE_WINDOW_STEP, SLIDE_WINDOW_STEP);

        let mut data = ImageData::new(gray.as_raw(), width, height);
        let faces = detector.detect(&mut data);

        debug!(width, height, faces = faces.len(), "Face detection finished");
        Ok(faces.len())
    }
}

#[async_trait]
impl FaceDetector for CascadeFaceDetector {
    async fn count_faces(&self, image: Bytes) -> Result<usize> {
        let model_path = self.model_path.clone();
        let score_threshold = self.score_threshold;
        tokio::task::spawn_blocking(move || {
            Self::detect_blocking(&model_path, score_threshold, &image)
        })
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Face detection task failed: {}", e)))?
    }
}
