//! Application state.

use std::sync::Arc;

use poster_media::{FaceDetector, FontSet};
use poster_ml_client::{ImageSynthesizer, MlClients, VertexConfig};
use poster_storage::{AssetStore, LocalTier, ObjectStore, S3Client, S3Config, TemplateRegistry};
use tracing::info;

use crate::config::{ApiConfig, PipelineConfig};
use crate::error::{hide_internal_details, ApiResult};
use crate::services::{PosterPipeline, TemplateService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<PosterPipeline>,
    pub templates: TemplateService,
    pub project_id: Option<String>,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(
        config: ApiConfig,
        pipeline_config: PipelineConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let vertex = VertexConfig::from_env();
        let ml = MlClients::from_config(&vertex).await?;

        let remote: Option<Arc<dyn ObjectStore>> = match S3Config::from_env() {
            Ok(s3) => Some(Arc::new(S3Client::new(s3).await?)),
            Err(e) => {
                info!("Remote storage disabled: {}", e);
                None
            }
        };

        let fonts = FontSet::load(&pipeline_config.font_bold_path, &pipeline_config.font_regular_path);
        let detector = ml.detector.map(|d| d as Arc<dyn FaceDetector>);

        let state = Self::from_parts(
            config,
            pipeline_config,
            detector,
            ml.synthesizer,
            remote,
            fonts,
            vertex.project_id,
        )
        .await?;
        Ok(state)
    }

    /// Assemble state around explicit collaborators.
    pub async fn from_parts(
        config: ApiConfig,
        pipeline_config: PipelineConfig,
        detector: Option<Arc<dyn FaceDetector>>,
        synthesizer: Arc<dyn ImageSynthesizer>,
        remote: Option<Arc<dyn ObjectStore>>,
        fonts: FontSet,
        project_id: Option<String>,
    ) -> ApiResult<Self> {
        hide_internal_details(config.is_production());

        let local = LocalTier::new(&config.upload_dir);
        local.ensure_dirs().await?;

        let assets = AssetStore::new(remote, local, pipeline_config.storage_policy);
        let registry = Arc::new(TemplateRegistry::load(&config.templates_file).await);

        let pipeline = PosterPipeline::new(
            &pipeline_config,
            detector,
            synthesizer.clone(),
            assets.clone(),
            fonts,
        )?;
        let templates = TemplateService::new(registry, assets, synthesizer);

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            templates,
            project_id,
        })
    }
}
