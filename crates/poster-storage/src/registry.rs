//! JSON-backed template registry.
//!
//! The registry file is the source of truth. Mutations run under a single
//! lock: the updated list is written to disk first and only then swapped in
//! memory, so a failed write leaves both copies unchanged.

use std::path::{Path, PathBuf};

use poster_models::{seed_templates, Template};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// Repository of poster templates.
#[derive(Debug)]
pub struct TemplateRegistry {
    path: PathBuf,
    templates: Mutex<Vec<Template>>,
}

impl TemplateRegistry {
    /// Load the registry from `path`.
    ///
    /// A missing or unreadable file yields the built-in seed templates.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let templates = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<Template>>(&bytes) {
                Ok(templates) => {
                    info!(path = %path.display(), count = templates.len(), "Loaded template registry");
                    templates
                }
                Err(e) => {
                    warn!(path = %path.display(), "Template registry is malformed, using seeds: {}", e);
                    seed_templates()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No template registry yet, using seeds");
                seed_templates()
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to read template registry, using seeds: {}", e);
                seed_templates()
            }
        };

        Self::with_templates(path, templates)
    }

    /// Registry over an explicit list.
    pub fn with_templates(path: impl Into<PathBuf>, templates: Vec<Template>) -> Self {
        Self {
            path: path.into(),
            templates: Mutex::new(templates),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Vec<Template> {
        self.templates.lock().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Template> {
        self.templates.lock().await.iter().find(|t| t.id == id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.templates.lock().await.iter().any(|t| t.id == id)
    }

    /// Make `url` the newest image and cover of template `id`, then persist.
    pub async fn push_image(&self, id: &str, url: &str) -> StorageResult<Template> {
        let mut templates = self.templates.lock().await;

        let mut updated = templates.clone();
        let template = updated
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StorageError::not_found(format!("template {}", id)))?;
        template.push_image(url);
        let result = template.clone();

        persist(&self.path, &updated).await?;
        *templates = updated;

        info!(template_id = id, images = result.images.len(), "Template image added");
        Ok(result)
    }
}

/// Write the registry through a temp file and rename it into place.
async fn persist(path: &Path, templates: &[Template]) -> StorageResult<()> {
    let json = serde_json::to_vec_pretty(templates)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &json).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = json.len(), "Persisted template registry");
    Ok(())
}
