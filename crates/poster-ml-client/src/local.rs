//! Offline stand-in for the editing service.

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use poster_media::{decode_oriented, encode_png, MediaResult};
use tracing::{info, warn};

use crate::error::{MlClientError, MlResult};
use crate::synthesizer::{EditRequest, ImageSynthesizer};

/// Side of the pasted subject thumbnail.
pub const SUBJECT_THUMBNAIL: u32 = 200;
/// Top-left corner of the pasted subject.
pub const SUBJECT_OFFSET: i64 = 100;

/// Pastes the subject onto the template instead of calling a model.
///
/// Used when no cloud project is configured so the rest of the pipeline
/// still runs end to end.
#[derive(Debug, Clone, Default)]
pub struct LocalCompositeEditor;

impl LocalCompositeEditor {
    pub fn new() -> Self {
        Self
    }

    fn composite(base: &[u8], subject: Option<&[u8]>) -> MediaResult<Vec<u8>> {
        let mut canvas = decode_oriented(base)?.to_rgba8();
        if let Some(subject) = subject {
            let thumbnail = decode_oriented(subject)?
                .resize_exact(SUBJECT_THUMBNAIL, SUBJECT_THUMBNAIL, FilterType::Triangle)
                .to_rgba8();
            imageops::overlay(&mut canvas, &thumbnail, SUBJECT_OFFSET, SUBJECT_OFFSET);
        }
        encode_png(&image::DynamicImage::ImageRgba8(canvas))
    }
}

#[async_trait]
impl ImageSynthesizer for LocalCompositeEditor {
    async fn edit(&self, request: EditRequest) -> MlResult<Vec<u8>> {
        warn!("Vertex AI not configured, using local composite");
        let EditRequest {
            base_image,
            reference_image,
            ..
        } = request;

        let output = tokio::task::spawn_blocking(move || {
            Self::composite(&base_image, reference_image.as_deref())
        })
        .await
        .map_err(|e| MlClientError::invalid_response(format!("Local composite task failed: {}", e)))??;

        info!(bytes = output.len(), "Local composite complete");
        Ok(output)
    }

    async fn generate(&self, _prompt: &str, _aspect_ratio: &str, _guidance: f32) -> MlResult<Vec<u8>> {
        Err(MlClientError::not_configured(
            "Vertex AI not configured (missing PROJECT_ID)",
        ))
    }

    fn name(&self) -> &'static str {
        "local_composite"
    }
}
