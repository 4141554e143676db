//! Google Cloud service configuration.

use std::time::Duration;

/// Vision and Vertex AI settings.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    /// GCP project. Without it the remote editor is disabled.
    pub project_id: Option<String>,
    /// Vertex AI region
    pub location: String,
    /// Imagen model used for edits and background generation
    pub model: String,
    /// Override for the Vision API base URL
    pub vision_base_url: String,
    /// Override for the Vertex AI base URL; defaults to the regional endpoint
    pub vertex_base_url: Option<String>,
    /// Static bearer token, bypassing credential discovery
    pub access_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            location: "us-central1".to_string(),
            model: "imagegeneration@006".to_string(),
            vision_base_url: "https://vision.googleapis.com".to_string(),
            vertex_base_url: None,
            access_token: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl VertexConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        Self {
            project_id: non_empty("GOOGLE_CLOUD_PROJECT").or_else(|| non_empty("PROJECT_ID")),
            location: non_empty("VERTEX_LOCATION").unwrap_or(defaults.location),
            model: non_empty("IMAGEN_MODEL").unwrap_or(defaults.model),
            vision_base_url: non_empty("VISION_API_URL").unwrap_or(defaults.vision_base_url),
            vertex_base_url: non_empty("VERTEX_API_URL"),
            access_token: non_empty("GOOGLE_ACCESS_TOKEN"),
            timeout: std::env::var("VERTEX_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.project_id.is_some()
    }

    /// Base URL for Vertex AI `:predict` calls.
    pub fn vertex_base_url(&self) -> String {
        self.vertex_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.location))
    }

    /// Full `:predict` URL for the configured model.
    pub fn predict_url(&self, project_id: &str) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.vertex_base_url().trim_end_matches('/'),
            project_id,
            self.location,
            self.model
        )
    }
}
