//! Shared data models for the poster compositing backend.
//!
//! This crate provides Serde-serializable types for:
//! - Poster templates and the registry seed data
//! - Face detections and primary face regions
//! - Credit tones
//! - Mask, storage and confidence policies
//! - Generated assets

pub mod asset;
pub mod face;
pub mod policy;
pub mod template;
pub mod tone;

// Re-export common types
pub use asset::{AssetTier, GeneratedAsset, GenerationOutput};
pub use face::{DetectedFace, FaceRegion, Point};
pub use policy::{
    ConfidencePolicy, LowConfidenceAction, MaskStrategy, MaskTier, PolicyParseError,
    StoragePolicy,
};
pub use template::{seed_templates, Template};
pub use tone::Tone;
