//! Clients for the external ML collaborators.
//!
//! - [`VisionClient`]: face detection via Cloud Vision
//! - [`ImagenClient`]: masked edits and generation via Vertex AI Imagen
//! - [`LocalCompositeEditor`]: offline substitute when no project is configured

pub mod auth;
pub mod config;
pub mod error;
mod http;
pub mod imagen;
pub mod local;
pub mod synthesizer;
pub mod vision;

use std::sync::Arc;

use tracing::{info, warn};

pub use auth::{AccessTokenSource, StaticToken, TokenCache};
pub use config::VertexConfig;
pub use error::{MlClientError, MlResult};
pub use imagen::ImagenClient;
pub use local::LocalCompositeEditor;
pub use synthesizer::{EditMode, EditRequest, ImageSynthesizer};
pub use vision::VisionClient;

/// Collaborators built from configuration.
pub struct MlClients {
    /// Face detector, when credentials are available.
    pub detector: Option<Arc<VisionClient>>,
    pub synthesizer: Arc<dyn ImageSynthesizer>,
}

impl MlClients {
    /// Build the detector and editor.
    ///
    /// Without a project or credentials, detection is disabled and edits use
    /// the local composite.
    pub async fn from_config(config: &VertexConfig) -> MlResult<Self> {
        let tokens: Option<Arc<dyn AccessTokenSource>> = match &config.access_token {
            Some(token) => Some(Arc::new(StaticToken(token.clone()))),
            None => match TokenCache::from_default_credentials().await {
                Ok(cache) => Some(Arc::new(cache)),
                Err(e) => {
                    warn!("Google credentials unavailable: {}", e);
                    None
                }
            },
        };

        let Some(tokens) = tokens else {
            return Ok(Self::offline());
        };

        let detector = Some(Arc::new(VisionClient::new(config, tokens.clone())?));
        let synthesizer: Arc<dyn ImageSynthesizer> = if config.is_configured() {
            Arc::new(ImagenClient::new(config, tokens)?)
        } else {
            warn!("GOOGLE_CLOUD_PROJECT not set, using local composite editor");
            Arc::new(LocalCompositeEditor::new())
        };

        info!(
            detector = detector.is_some(),
            synthesizer = synthesizer.name(),
            "ML clients initialized"
        );
        Ok(Self {
            detector,
            synthesizer,
        })
    }

    /// No detector and the local composite editor.
    pub fn offline() -> Self {
        Self {
            detector: None,
            synthesizer: Arc::new(LocalCompositeEditor::new()),
        }
    }
}
