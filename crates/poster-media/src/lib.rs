//! Portrait-aware image processing for poster generation.
//!
//! This crate provides:
//! - Primary face selection from detector output
//! - Padded, bounds-clamped subject cropping
//! - Tiered soft-mask synthesis over templates
//! - Scrim, outlined text and credits compositing
//! - Image decode/encode helpers

pub mod compositor;
pub mod credits;
pub mod crop;
pub mod detection;
pub mod error;
pub mod face_locator;
pub mod image_io;
pub mod mask;
pub mod text;

pub use compositor::{Compositor, PosterLayout, PosterText};
pub use credits::{billing_line, pool_for, select_billing, BillingEntry, BillingRoles};
pub use crop::{crop_box, prepare_subject, CropBox, SubjectImage, SUBJECT_PADDING_RATIO};
pub use detection::FaceDetector;
pub use error::{MediaError, MediaResult};
pub use face_locator::{select_primary_face, FaceLocator, FaceSelection};
pub use image_io::{decode_oriented, encode_png, prepare_template, PreparedTemplate, MAX_TEMPLATE_DIMENSION};
pub use mask::{MaskConfig, MaskSynthesizer, SynthesizedMask, TierOutcome};
pub use text::{wrap_text, FontSet, Outline, TextStyle};
