//! API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use poster_media::{BillingRoles, SUBJECT_PADDING_RATIO};
use poster_models::{ConfidencePolicy, LowConfidenceAction, MaskStrategy, StoragePolicy};
use tracing::warn;

const DEFAULT_FONT_BOLD: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";
const DEFAULT_FONT_REGULAR: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Fixed base URL for locally stored assets; derived per request when unset
    pub public_base_url: Option<String>,
    /// Root of the local asset tier, served under `/uploads`
    pub upload_dir: PathBuf,
    /// Template registry file
    pub templates_file: PathBuf,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            max_body_size: 20 * 1024 * 1024, // 20MB
            environment: "development".to_string(),
            public_base_url: None,
            upload_dir: PathBuf::from("uploads"),
            templates_file: PathBuf::from("templates.json"),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            templates_file: std::env::var("TEMPLATES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.templates_file),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|s| s != "false" && s != "0")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// Generation pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub mask_strategy: MaskStrategy,
    pub storage_policy: StoragePolicy,
    /// Gate applied to the primary face of the user's photo
    pub confidence: ConfidencePolicy,
    pub billing_roles: BillingRoles,
    pub font_bold_path: PathBuf,
    pub font_regular_path: PathBuf,
    /// Timeout for fetching a template by URL
    pub template_fetch_timeout: Duration,
    /// Padding around the face when cropping the subject
    pub subject_padding: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mask_strategy: MaskStrategy::default(),
            storage_policy: StoragePolicy::default(),
            confidence: ConfidencePolicy::accept_all(),
            billing_roles: BillingRoles::default(),
            font_bold_path: PathBuf::from(DEFAULT_FONT_BOLD),
            font_regular_path: PathBuf::from(DEFAULT_FONT_REGULAR),
            template_fetch_timeout: Duration::from_secs(10),
            subject_padding: SUBJECT_PADDING_RATIO,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Unparseable values are logged and replaced by their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let confidence = match env_parsed::<f64>("FACE_CONFIDENCE_THRESHOLD") {
            Some(threshold) => ConfidencePolicy::new(
                threshold,
                env_parsed::<LowConfidenceAction>("LOW_CONFIDENCE_ACTION").unwrap_or_default(),
            ),
            None => defaults.confidence,
        };

        Self {
            mask_strategy: env_parsed("MASK_STRATEGY").unwrap_or(defaults.mask_strategy),
            storage_policy: env_parsed("STORAGE_POLICY").unwrap_or(defaults.storage_policy),
            confidence,
            billing_roles: env_parsed("BILLING_ROLES").unwrap_or(defaults.billing_roles),
            font_bold_path: std::env::var("FONT_BOLD_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.font_bold_path),
            font_regular_path: std::env::var("FONT_REGULAR_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.font_regular_path),
            template_fetch_timeout: env_parsed::<u64>("TEMPLATE_FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.template_fetch_timeout),
            subject_padding: env_parsed::<f64>("SUBJECT_PADDING_RATIO")
                .filter(|ratio| *ratio >= 0.0)
                .unwrap_or(defaults.subject_padding),
        }
    }
}

fn env_parsed<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = raw, "Ignoring invalid setting: {}", e);
            None
        }
    }
}
