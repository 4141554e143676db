//! Tier and policy definitions for the compositing pipeline.
//!
//! - [`MaskStrategy`]: which mask tiers are attempted
//! - [`MaskTier`]: which tier produced a mask
//! - [`StoragePolicy`]: whether local storage may stand in for the remote store
//! - [`ConfidencePolicy`]: what to do with a low-confidence primary face

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {value}")]
pub struct PolicyParseError {
    kind: &'static str,
    value: String,
}

impl PolicyParseError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// How the inpainting mask is derived from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaskStrategy {
    /// Transparency, then face geometry, then the static center region.
    #[default]
    FaceGeometry,
    /// Transparency only, then the static center region.
    AlphaThreshold,
}

impl MaskStrategy {
    /// Tiers attempted by this strategy, in order.
    pub fn tiers(&self) -> &'static [MaskTier] {
        match self {
            MaskStrategy::FaceGeometry => &[MaskTier::Alpha, MaskTier::Face, MaskTier::Fallback],
            MaskStrategy::AlphaThreshold => &[MaskTier::Alpha, MaskTier::Fallback],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MaskStrategy::FaceGeometry => "face_geometry",
            MaskStrategy::AlphaThreshold => "alpha_threshold",
        }
    }

    /// Returns true if this strategy calls the face detector on the template.
    pub fn uses_detection(&self) -> bool {
        self.tiers().contains(&MaskTier::Face)
    }
}

impl fmt::Display for MaskStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MaskStrategy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "face_geometry" | "face" => Ok(MaskStrategy::FaceGeometry),
            "alpha_threshold" | "alpha" => Ok(MaskStrategy::AlphaThreshold),
            _ => Err(PolicyParseError::new("mask strategy", s)),
        }
    }
}

/// The mask tier that produced a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MaskTier {
    /// Thresholded template transparency.
    Alpha,
    /// Ellipse around the template's primary face.
    Face,
    /// Static centered ellipse.
    Fallback,
}

impl MaskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskTier::Alpha => "alpha",
            MaskTier::Face => "face",
            MaskTier::Fallback => "fallback",
        }
    }
}

impl fmt::Display for MaskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage tier policy for generated assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoragePolicy {
    /// Remote object store, falling back to the local upload directory.
    #[default]
    RemoteWithLocalFallback,
    /// Remote object store only; failures are surfaced.
    RemoteRequired,
}

impl StoragePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoragePolicy::RemoteWithLocalFallback => "remote_with_local_fallback",
            StoragePolicy::RemoteRequired => "remote_required",
        }
    }

    pub fn allows_local(&self) -> bool {
        matches!(self, StoragePolicy::RemoteWithLocalFallback)
    }
}

impl fmt::Display for StoragePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StoragePolicy {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote_with_local_fallback" | "fallback" | "local" => {
                Ok(StoragePolicy::RemoteWithLocalFallback)
            }
            "remote_required" | "remote" => Ok(StoragePolicy::RemoteRequired),
            _ => Err(PolicyParseError::new("storage policy", s)),
        }
    }
}

/// What happens when the largest face is below the confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum LowConfidenceAction {
    /// Treat it as "no face" and continue with the next fallback.
    #[default]
    Demote,
    /// Reject the request.
    Fail,
}

impl FromStr for LowConfidenceAction {
    type Err = PolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "demote" | "ignore" => Ok(LowConfidenceAction::Demote),
            "fail" | "reject" => Ok(LowConfidenceAction::Fail),
            _ => Err(PolicyParseError::new("low confidence action", s)),
        }
    }
}

/// Confidence gate applied to the primary face.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct ConfidencePolicy {
    /// Minimum confidence of the winning face. `None` accepts any face.
    pub threshold: Option<f64>,
    pub action: LowConfidenceAction,
}

impl ConfidencePolicy {
    /// Accept every face regardless of confidence.
    pub fn accept_all() -> Self {
        Self::default()
    }

    pub fn new(threshold: f64, action: LowConfidenceAction) -> Self {
        Self {
            threshold: Some(threshold),
            action,
        }
    }

    /// Returns true if a face with this confidence passes the gate.
    /// Faces without a reported confidence always pass.
    pub fn accepts(&self, confidence: Option<f64>) -> bool {
        match (self.threshold, confidence) {
            (Some(threshold), Some(confidence)) => confidence >= threshold,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse() {
        assert_eq!("face_geometry".parse::<MaskStrategy>().unwrap(), MaskStrategy::FaceGeometry);
        assert_eq!("alpha".parse::<MaskStrategy>().unwrap(), MaskStrategy::AlphaThreshold);
        assert!("random".parse::<MaskStrategy>().is_err());
    }

    #[test]
    fn test_strategy_tiers() {
        assert_eq!(
            MaskStrategy::FaceGeometry.tiers(),
            &[MaskTier::Alpha, MaskTier::Face, MaskTier::Fallback]
        );
        assert_eq!(MaskStrategy::AlphaThreshold.tiers(), &[MaskTier::Alpha, MaskTier::Fallback]);
        assert!(MaskStrategy::FaceGeometry.uses_detection());
        assert!(!MaskStrategy::AlphaThreshold.uses_detection());
    }

    #[test]
    fn test_storage_policy() {
        assert_eq!("remote".parse::<StoragePolicy>().unwrap(), StoragePolicy::RemoteRequired);
        assert!(StoragePolicy::default().allows_local());
        assert!(!StoragePolicy::RemoteRequired.allows_local());
        assert_eq!(StoragePolicy::RemoteRequired.to_string(), "remote_required");
    }

    #[test]
    fn test_confidence_policy() {
        let policy = ConfidencePolicy::new(0.7, LowConfidenceAction::Demote);
        assert!(policy.accepts(Some(0.7)));
        assert!(!policy.accepts(Some(0.69)));
        assert!(policy.accepts(None));
        assert!(ConfidencePolicy::accept_all().accepts(Some(0.01)));
    }

    #[test]
    fn test_parse_error_message() {
        let err = "sideways".parse::<LowConfidenceAction>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown low confidence action: sideways");
    }
}
