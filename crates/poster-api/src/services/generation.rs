//! Poster generation pipeline.

use std::sync::Arc;
use std::time::Instant;

use poster_media::{
    billing_line, pool_for, prepare_subject, prepare_template, select_billing, BillingRoles,
    Compositor, FaceDetector, FaceLocator, FaceSelection, FontSet, MaskConfig, MaskSynthesizer,
    MediaError, PosterLayout, PosterText, SubjectImage, MAX_TEMPLATE_DIMENSION,
};
use poster_ml_client::{EditMode, EditRequest, ImageSynthesizer};
use poster_models::{GeneratedAsset, LowConfidenceAction, Tone};
use poster_storage::{generated_poster_key, AssetKind, AssetStore};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::services::templates::TemplateFetcher;

pub const EDIT_GUIDANCE: f32 = 60.0;

/// Prompt sent with the masked edit.
pub fn edit_prompt(costume: &str) -> String {
    format!(
        "A cinematic movie poster. The main character is now portrayed by the person in the reference image. \
         Ensure the new face matches the dramatic lighting, shadows, skin texture, and color grading of the original movie poster exactly. \
         Seamless photorealistic integration. The character is wearing {}. \
         High budget Hollywood style, 8k resolution, highly detailed.",
        costume
    )
}

/// Where the template image comes from.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    /// Bytes uploaded with the request.
    Upload(Vec<u8>),
    /// URL to fetch.
    Url(String),
}

/// Everything needed to produce one poster.
#[derive(Debug, Clone)]
pub struct PosterRequest {
    pub user_photo: Vec<u8>,
    pub template: TemplateSource,
    pub user_name: String,
    pub movie_title: String,
    pub tagline: String,
    pub cover_text: String,
    pub tone: Tone,
    pub costume_description: String,
    /// Pre-rendered billing line, see [`PosterPipeline::billing_for`].
    pub credits: String,
}

/// Photo and template in, stored poster out.
#[derive(Clone)]
pub struct PosterPipeline {
    locator: FaceLocator,
    masks: MaskSynthesizer,
    synthesizer: Arc<dyn ImageSynthesizer>,
    compositor: Arc<Compositor>,
    assets: AssetStore,
    templates: TemplateFetcher,
    billing_roles: BillingRoles,
    subject_padding: f64,
}

impl PosterPipeline {
    /// Build the pipeline. One detector serves both the photo and the template.
    pub fn new(
        config: &PipelineConfig,
        detector: Option<Arc<dyn FaceDetector>>,
        synthesizer: Arc<dyn ImageSynthesizer>,
        assets: AssetStore,
        fonts: FontSet,
    ) -> ApiResult<Self> {
        let locator = FaceLocator::new(detector, config.confidence);
        let masks = MaskSynthesizer::new(MaskConfig::default(), config.mask_strategy, locator.clone());
        let templates = TemplateFetcher::new(config.template_fetch_timeout, assets.clone())?;

        info!(
            detector = locator.is_available(),
            synthesizer = synthesizer.name(),
            mask_strategy = %config.mask_strategy,
            storage_policy = config.storage_policy.as_str(),
            remote_storage = assets.has_remote(),
            fonts = !fonts.is_empty(),
            "Poster pipeline ready"
        );

        Ok(Self {
            locator,
            masks,
            synthesizer,
            compositor: Arc::new(Compositor::new(fonts, PosterLayout::default())),
            assets,
            templates,
            billing_roles: config.billing_roles,
            subject_padding: config.subject_padding,
        })
    }

    /// Billing line for `tone`.
    pub fn billing_for<R: Rng + ?Sized>(&self, tone: Tone, rng: &mut R) -> String {
        billing_line(&select_billing(pool_for(tone), self.billing_roles, rng))
    }

    /// Run the full pipeline and store the poster.
    pub async fn generate(&self, request: PosterRequest, base_url: &str) -> ApiResult<GeneratedAsset> {
        let start = Instant::now();
        let tone = request.tone;

        let result = self.run(request, base_url).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(ApiError::BadRequest(_)) | Err(ApiError::NotFound(_)) => "rejected",
            Err(_) => "failed",
        };
        metrics::record_generation(outcome, tone.as_str(), start.elapsed().as_secs_f64());

        result
    }

    async fn run(&self, request: PosterRequest, base_url: &str) -> ApiResult<GeneratedAsset> {
        let PosterRequest {
            user_photo,
            template,
            user_name,
            movie_title,
            tagline,
            cover_text,
            tone,
            costume_description,
            credits,
        } = request;

        let subject = self.prepare_subject(user_photo).await?;

        let template_bytes = match template {
            TemplateSource::Upload(bytes) if !bytes.is_empty() => Some(bytes),
            TemplateSource::Upload(_) => None,
            TemplateSource::Url(url) => self.templates.fetch(&url, base_url).await,
        }
        .ok_or_else(|| ApiError::bad_request("Could not load template image"))?;

        let template = tokio::task::spawn_blocking(move || {
            prepare_template(&template_bytes, MAX_TEMPLATE_DIMENSION)
        })
        .await
        .map_err(|e| ApiError::internal(format!("Template preparation task failed: {}", e)))?
        .map_err(|e| match e {
            MediaError::InvalidImage(_) => ApiError::bad_request("Could not load template image"),
            other => ApiError::from(other),
        })?;

        let mask = self.masks.synthesize(&template).await;
        debug!(tier = %mask.tier, "Template mask ready");

        let edit = EditRequest {
            base_image: template.png().to_vec(),
            mask: mask.to_png()?,
            prompt: edit_prompt(&costume_description),
            reference_image: Some(subject.png),
            mode: EditMode::InpaintingInsert,
            guidance: EDIT_GUIDANCE,
        };
        let edited = self.synthesizer.edit(edit).await.map_err(|e| {
            warn!(synthesizer = self.synthesizer.name(), "Image edit failed: {}", e);
            ApiError::generation(e.to_string())
        })?;

        let text = PosterText {
            name: user_name,
            tagline,
            title: movie_title,
            cover_text,
            credits,
        };
        let compositor = self.compositor.clone();
        let poster = tokio::task::spawn_blocking(move || compositor.compose(&edited, &text))
            .await
            .map_err(|e| ApiError::internal(format!("Compositing task failed: {}", e)))?
            .map_err(|e| match e {
                MediaError::InvalidImage(msg) => {
                    ApiError::generation(format!("edited image is unreadable: {}", msg))
                }
                other => ApiError::from(other),
            })?;

        let key = generated_poster_key();
        let asset = self
            .assets
            .put(AssetKind::Poster, &key, poster, "image/png", base_url)
            .await?;

        info!(key, tone = %tone, tier = %asset.tier(), "Poster generated");
        Ok(asset)
    }

    /// Decode the photo and crop it around the primary face.
    async fn prepare_subject(&self, photo: Vec<u8>) -> ApiResult<SubjectImage> {
        let face = match self.locator.locate(&photo).await {
            FaceSelection::LowConfidence(region)
                if self.locator.policy().action == LowConfidenceAction::Fail =>
            {
                return Err(ApiError::bad_request(format!(
                    "No clear face found in photo (confidence {:.2})",
                    region.confidence.unwrap_or_default()
                )));
            }
            selection => selection.face(),
        };

        let padding = self.subject_padding;
        tokio::task::spawn_blocking(move || prepare_subject(&photo, face.as_ref(), padding))
            .await
            .map_err(|e| ApiError::internal(format!("Photo preparation task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_edit_prompt_mentions_costume() {
        let prompt = edit_prompt("a long black leather trench coat");
        assert!(prompt.starts_with("A cinematic movie poster."));
        assert!(prompt.contains("The character is wearing a long black leather trench coat."));
        assert!(prompt.ends_with("highly detailed."));
    }

    #[test]
    fn test_billing_for_uses_tone_pool() {
        let dir = tempfile::TempDir::new().unwrap();
        let assets = AssetStore::new(
            None,
            poster_storage::LocalTier::new(dir.path()),
            poster_models::StoragePolicy::default(),
        );
        let pipeline = PosterPipeline::new(
            &PipelineConfig::default(),
            None,
            Arc::new(poster_ml_client::LocalCompositeEditor::new()),
            assets,
            FontSet::empty(),
        )
        .unwrap();

        let line = pipeline.billing_for(Tone::Horror, &mut StdRng::seed_from_u64(7));
        assert!(line.starts_with("DIRECTED BY "));
        assert!(line.contains("   PRODUCED BY "));

        let horror: Vec<String> = pool_for(Tone::Horror).iter().map(|n| n.to_uppercase()).collect();
        assert!(horror.iter().any(|name| line.contains(name.as_str())));
    }
}
