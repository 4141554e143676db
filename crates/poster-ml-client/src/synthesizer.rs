//! Image editing and generation collaborator.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MlResult;

/// Editing mode understood by the editing service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EditMode {
    /// Insert new content into the masked region.
    #[default]
    #[serde(rename = "inpainting-insert")]
    InpaintingInsert,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::InpaintingInsert => "inpainting-insert",
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A masked edit of a base image.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// PNG bytes of the image to edit
    pub base_image: Vec<u8>,
    /// PNG bytes of the single-channel mask, same size as `base_image`
    pub mask: Vec<u8>,
    pub prompt: String,
    /// Subject the edit should portray
    pub reference_image: Option<Vec<u8>>,
    pub mode: EditMode,
    pub guidance: f32,
}

/// Performs pixel synthesis for the pipeline.
#[async_trait]
pub trait ImageSynthesizer: Send + Sync {
    /// Edit the masked region of `request.base_image`.
    async fn edit(&self, request: EditRequest) -> MlResult<Vec<u8>>;

    /// Generate a new image from a prompt.
    async fn generate(&self, prompt: &str, aspect_ratio: &str, guidance: f32) -> MlResult<Vec<u8>>;

    /// Get the synthesizer name for logging.
    fn name(&self) -> &'static str;
}
