//! Template fetching and gallery mutations.

use std::sync::Arc;
use std::time::Duration;

use poster_ml_client::ImageSynthesizer;
use poster_models::Template;
use poster_storage::{template_background_key, template_upload_key, AssetKind, AssetStore, TemplateRegistry};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Style suffix appended to admin background prompts.
pub const BACKGROUND_STYLE: &str = "movie poster style, cinematic lighting, 8k resolution, photorealistic, masterpiece, highly detailed, vertical aspect ratio, no text";
pub const BACKGROUND_ASPECT_RATIO: &str = "3:4";
pub const BACKGROUND_GUIDANCE: f32 = 15.0;

pub fn background_prompt(prompt: &str) -> String {
    format!("{}, {}", prompt.trim(), BACKGROUND_STYLE)
}

/// Storage key of a URL served from this server's `/uploads` route.
pub fn local_upload_key<'a>(url: &'a str, base_url: &str) -> Option<&'a str> {
    let path = url
        .strip_prefix(base_url.trim_end_matches('/'))
        .unwrap_or(url);
    path.strip_prefix("/uploads/").filter(|key| !key.is_empty())
}

/// Loads template images referenced by URL.
#[derive(Clone)]
pub struct TemplateFetcher {
    http: reqwest::Client,
    assets: AssetStore,
}

impl TemplateFetcher {
    pub fn new(timeout: Duration, assets: AssetStore) -> ApiResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, assets })
    }

    /// Fetch template bytes. Any failure yields `None`.
    ///
    /// URLs pointing at our own uploads are read from the asset store.
    pub async fn fetch(&self, url: &str, base_url: &str) -> Option<Vec<u8>> {
        if let Some(key) = local_upload_key(url, base_url) {
            match self.assets.read(key).await {
                Ok(bytes) => return Some(bytes),
                Err(e) => debug!(key, "Template not in asset store, fetching over HTTP: {}", e),
            }
        }

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, "Template fetch failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(url, status = %response.status(), "Template fetch returned an error status");
            return None;
        }

        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                warn!(url, "Template body could not be read: {}", e);
                None
            }
        }
    }
}

/// Admin operations on the template gallery.
#[derive(Clone)]
pub struct TemplateService {
    registry: Arc<TemplateRegistry>,
    assets: AssetStore,
    synthesizer: Arc<dyn ImageSynthesizer>,
}

impl TemplateService {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        assets: AssetStore,
        synthesizer: Arc<dyn ImageSynthesizer>,
    ) -> Self {
        Self {
            registry,
            assets,
            synthesizer,
        }
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    pub async fn list(&self) -> Vec<Template> {
        self.registry.list().await
    }

    /// Store an uploaded image and make it the template's cover.
    pub async fn upload_image(
        &self,
        template_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
        base_url: &str,
    ) -> ApiResult<String> {
        self.ensure_exists(template_id).await?;

        let key = template_upload_key(template_id);
        let url = self.store(template_id, &key, bytes, content_type, base_url).await?;

        metrics::record_template_image("upload");
        Ok(url)
    }

    /// Generate a background from `prompt` and make it the template's cover.
    pub async fn generate_background(
        &self,
        template_id: &str,
        prompt: &str,
        base_url: &str,
    ) -> ApiResult<String> {
        self.ensure_exists(template_id).await?;

        let full_prompt = background_prompt(prompt);
        info!(template_id, synthesizer = self.synthesizer.name(), "Generating template background");
        let bytes = self
            .synthesizer
            .generate(&full_prompt, BACKGROUND_ASPECT_RATIO, BACKGROUND_GUIDANCE)
            .await?;

        let key = template_background_key(template_id);
        let url = self.store(template_id, &key, bytes, "image/png", base_url).await?;

        metrics::record_template_image("generated");
        Ok(url)
    }

    async fn ensure_exists(&self, template_id: &str) -> ApiResult<()> {
        if self.registry.contains(template_id).await {
            Ok(())
        } else {
            Err(ApiError::not_found("Template not found"))
        }
    }

    async fn store(
        &self,
        template_id: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        base_url: &str,
    ) -> ApiResult<String> {
        let asset = self
            .assets
            .put(AssetKind::TemplateImage, key, bytes, content_type, base_url)
            .await?;
        self.registry.push_image(template_id, asset.url()).await?;
        Ok(asset.url().to_string())
    }
}
