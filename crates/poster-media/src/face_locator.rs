//! Primary face selection.
//!
//! Reduces a detector's output to the single dominant face: the one with
//! the largest bounding-box area. Detection is best-effort, so a missing
//! or failing detector is reported as "no face" rather than an error.

use std::sync::Arc;

use poster_models::{ConfidencePolicy, DetectedFace, FaceRegion};
use tracing::{debug, warn};

use crate::detection::FaceDetector;

/// Outcome of primary face selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceSelection {
    /// The largest face passed the confidence gate.
    Found(FaceRegion),
    /// Nothing detected, or detection unavailable.
    NoFace,
    /// The largest face was below the confidence threshold.
    LowConfidence(FaceRegion),
}

impl FaceSelection {
    /// The accepted face, if any. Low-confidence faces are not returned.
    pub fn face(&self) -> Option<FaceRegion> {
        match self {
            FaceSelection::Found(region) => Some(*region),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FaceSelection::Found(_))
    }
}

/// Pick the face with the largest bounding-box area.
///
/// Ties keep the first face encountered.
pub fn select_primary_face(faces: &[DetectedFace], policy: &ConfidencePolicy) -> FaceSelection {
    let mut best: Option<FaceRegion> = None;

    for face in faces {
        let region = face.region();
        let area = region.area();
        if !area.is_finite() {
            continue;
        }
        match best {
            Some(current) if area <= current.area() => {}
            _ => best = Some(region),
        }
    }

    match best {
        None => FaceSelection::NoFace,
        Some(region) if policy.accepts(region.confidence) => FaceSelection::Found(region),
        Some(region) => FaceSelection::LowConfidence(region),
    }
}

/// Runs an optional detector and selects the primary face.
#[derive(Clone, Default)]
pub struct FaceLocator {
    detector: Option<Arc<dyn FaceDetector>>,
    policy: ConfidencePolicy,
}

impl FaceLocator {
    pub fn new(detector: Option<Arc<dyn FaceDetector>>, policy: ConfidencePolicy) -> Self {
        Self { detector, policy }
    }

    /// A locator without a detector; always reports no face.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.detector.is_some()
    }

    pub fn policy(&self) -> &ConfidencePolicy {
        &self.policy
    }

    /// Detect faces in `image` and select the primary one.
    pub async fn locate(&self, image: &[u8]) -> FaceSelection {
        let Some(detector) = &self.detector else {
            debug!("No face detector configured");
            return FaceSelection::NoFace;
        };

        match detector.detect(image).await {
            Ok(faces) => {
                let selection = select_primary_face(&faces, &self.policy);
                debug!(
                    detector = detector.name(),
                    faces = faces.len(),
                    found = selection.is_found(),
                    "Face lookup complete"
                );
                selection
            }
            Err(e) => {
                warn!(detector = detector.name(), "Face detection error: {}", e);
                FaceSelection::NoFace
            }
        }
    }
}
