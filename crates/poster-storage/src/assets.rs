//! Tiered asset persistence.
//!
//! Assets go to the remote object store when one is configured, and to the
//! local upload directory otherwise (or when the remote tier fails and the
//! [`StoragePolicy`] allows it).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use poster_models::{AssetTier, GeneratedAsset, StoragePolicy};
use tracing::{debug, info, warn};

use crate::client::ObjectStore;
use crate::error::{StorageError, StorageResult};
use crate::keys::{validate_key, GENERATED_PREFIX, TEMPLATES_PREFIX};

/// Longest TTL a SigV4 presigned URL supports.
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// What is being stored; decides the presigned URL lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// A finished poster returned to the user.
    Poster,
    /// An image added to a template's gallery.
    TemplateImage,
}

impl AssetKind {
    pub fn presign_ttl(&self) -> Duration {
        match self {
            AssetKind::Poster => Duration::from_secs(60 * 60),
            AssetKind::TemplateImage => MAX_PRESIGN_TTL,
        }
    }
}

// =============================================================================
// Tiers
// =============================================================================

/// Remote object store tier.
#[derive(Clone)]
pub struct RemoteTier {
    store: Arc<dyn ObjectStore>,
}

impl RemoteTier {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Upload and return a URL: public when possible, presigned otherwise.
    pub async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        kind: AssetKind,
    ) -> StorageResult<String> {
        self.store.upload(key, bytes, content_type).await?;

        match self.store.make_public(key).await {
            Ok(()) => Ok(self.store.public_url(key)),
            Err(e) => {
                warn!(key, "Could not make object public, using signed URL: {}", e);
                self.store.presign_get(key, kind.presign_ttl()).await
            }
        }
    }
}

/// Local filesystem tier served under `/uploads/`.
#[derive(Debug, Clone)]
pub struct LocalTier {
    root: PathBuf,
}

impl LocalTier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the upload root and its standard subdirectories.
    pub async fn ensure_dirs(&self) -> StorageResult<()> {
        for prefix in [GENERATED_PREFIX, TEMPLATES_PREFIX] {
            tokio::fs::create_dir_all(self.root.join(prefix)).await?;
        }
        Ok(())
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// `<base_url>/uploads/<key>`
    pub fn url_for(base_url: &str, key: &str) -> String {
        format!("{}/uploads/{}", base_url.trim_end_matches('/'), key)
    }

    pub async fn put(&self, key: &str, bytes: &[u8], base_url: &str) -> StorageResult<String> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), "Wrote local asset");
        Ok(Self::url_for(base_url, key))
    }

    pub async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Asset Store
// =============================================================================

/// Persists generated assets across the remote and local tiers.
#[derive(Clone)]
pub struct AssetStore {
    remote: Option<RemoteTier>,
    local: LocalTier,
    policy: StoragePolicy,
}

impl AssetStore {
    pub fn new(remote: Option<Arc<dyn ObjectStore>>, local: LocalTier, policy: StoragePolicy) -> Self {
        Self {
            remote: remote.map(RemoteTier::new),
            local,
            policy,
        }
    }

    pub fn policy(&self) -> StoragePolicy {
        self.policy
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Store `bytes` under `key` and return the persisted asset.
    pub async fn put(
        &self,
        kind: AssetKind,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        base_url: &str,
    ) -> StorageResult<GeneratedAsset> {
        validate_key(key)?;

        if let Some(remote) = &self.remote {
            match remote.put(key, bytes.clone(), content_type, kind).await {
                Ok(url) => return Ok(self.stored(bytes, key, url, AssetTier::Remote)),
                Err(e) if self.policy.allows_local() => {
                    warn!(key, store = remote.store().name(), "Remote upload failed, using local storage: {}", e);
                }
                Err(e) => return Err(e),
            }
        } else if !self.policy.allows_local() {
            return Err(StorageError::not_configured(
                "remote storage is required but no object store is configured",
            ));
        }

        let url = self.local.put(key, &bytes, base_url).await?;
        Ok(self.stored(bytes, key, url, AssetTier::Local))
    }

    /// Read a stored object, preferring the local copy.
    pub async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;

        match self.local.read(key).await {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::NotFound(_)) => match &self.remote {
                Some(remote) => remote.store().download(key).await,
                None => Err(StorageError::not_found(key)),
            },
            Err(e) => Err(e),
        }
    }

    fn stored(&self, bytes: Vec<u8>, key: &str, url: String, tier: AssetTier) -> GeneratedAsset {
        info!(key, tier = %tier, "Asset stored");
        counter!("poster_storage_tier_total", "tier" => tier.as_str()).increment(1);
        GeneratedAsset::new(bytes, key, url, tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeStore {
        fail_upload: bool,
        fail_acl: bool,
        uploaded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn upload(&self, key: &str, _data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
            if self.fail_upload {
                return Err(StorageError::upload_failed("bucket unreachable"));
            }
            self.uploaded.lock().unwrap().push(key.to_string());
            Ok(())
        }

        async fn make_public(&self, _key: &str) -> StorageResult<()> {
            if self.fail_acl {
                return Err(StorageError::AclFailed("uniform bucket-level access".to_string()));
            }
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://bucket.example/{}", key)
        }

        async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
            Ok(format!("https://bucket.example/{}?expires={}", key, expires_in.as_secs()))
        }

        async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
            if self.uploaded.lock().unwrap().iter().any(|k| k == key) {
                Ok(b"remote".to_vec())
            } else {
                Err(StorageError::not_found(key))
            }
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn store_with(remote: Option<FakeStore>, policy: StoragePolicy) -> (AssetStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let remote = remote.map(|s| Arc::new(s) as Arc<dyn ObjectStore>);
        (AssetStore::new(remote, LocalTier::new(dir.path()), policy), dir)
    }

    #[tokio::test]
    async fn test_remote_public_url() {
        let (store, _dir) = store_with(Some(FakeStore::default()), StoragePolicy::default());
        let asset = store
            .put(AssetKind::Poster, "generated/a.png", vec![1], "image/png", "http://localhost")
            .await
            .unwrap();
        assert_eq!(asset.tier(), AssetTier::Remote);
        assert_eq!(asset.url(), "https://bucket.example/generated/a.png");
    }

    #[tokio::test]
    async fn test_acl_failure_presigns_with_kind_ttl() {
        let remote = FakeStore {
            fail_acl: true,
            ..Default::default()
        };
        let (store, _dir) = store_with(Some(remote), StoragePolicy::default());

        let poster = store
            .put(AssetKind::Poster, "generated/a.png", vec![1], "image/png", "http://x")
            .await
            .unwrap();
        assert!(poster.url().ends_with("?expires=3600"));

        let template = store
            .put(AssetKind::TemplateImage, "templates/m_abc123.png", vec![1], "image/png", "http://x")
            .await
            .unwrap();
        assert!(template.url().ends_with("?expires=604800"));
        assert_eq!(template.tier(), AssetTier::Remote);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_local() {
        let remote = FakeStore {
            fail_upload: true,
            ..Default::default()
        };
        let (store, dir) = store_with(Some(remote), StoragePolicy::RemoteWithLocalFallback);

        let asset = store
            .put(AssetKind::Poster, "generated/b.png", vec![7, 8], "image/png", "http://localhost:8080/")
            .await
            .unwrap();

        assert_eq!(asset.tier(), AssetTier::Local);
        assert_eq!(asset.url(), "http://localhost:8080/uploads/generated/b.png");
        assert_eq!(std::fs::read(dir.path().join("generated/b.png")).unwrap(), vec![7, 8]);
    }

    #[tokio::test]
    async fn test_remote_required_surfaces_failure() {
        let remote = FakeStore {
            fail_upload: true,
            ..Default::default()
        };
        let (store, dir) = store_with(Some(remote), StoragePolicy::RemoteRequired);

        let err = store
            .put(AssetKind::Poster, "generated/c.png", vec![1], "image/png", "http://x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
        assert!(!dir.path().join("generated/c.png").exists());
    }

    #[tokio::test]
    async fn test_remote_required_without_store_is_config_error() {
        let (store, _dir) = store_with(None, StoragePolicy::RemoteRequired);
        let err = store
            .put(AssetKind::Poster, "generated/d.png", vec![1], "image/png", "http://x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_no_remote_writes_locally() {
        let (store, dir) = store_with(None, StoragePolicy::default());
        let asset = store
            .put(AssetKind::TemplateImage, "templates/x_000000.png", vec![3], "image/png", "https://api.example")
            .await
            .unwrap();
        assert_eq!(asset.url(), "https://api.example/uploads/templates/x_000000.png");
        assert!(dir.path().join("templates/x_000000.png").exists());
        assert_eq!(store.read("templates/x_000000.png").await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_write() {
        let (store, _dir) = store_with(None, StoragePolicy::default());
        let err = store
            .put(AssetKind::Poster, "../escape.png", vec![1], "image/png", "http://x")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_read_falls_back_to_remote() {
        let (store, _dir) = store_with(Some(FakeStore::default()), StoragePolicy::default());
        store
            .put(AssetKind::Poster, "generated/r.png", vec![1], "image/png", "http://x")
            .await
            .unwrap();
        assert_eq!(store.read("generated/r.png").await.unwrap(), b"remote".to_vec());
        assert!(matches!(
            store.read("generated/missing.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_dirs() {
        let dir = TempDir::new().unwrap();
        let local = LocalTier::new(dir.path().join("uploads"));
        local.ensure_dirs().await.unwrap();
        assert!(dir.path().join("uploads/generated").is_dir());
        assert!(dir.path().join("uploads/templates").is_dir());
    }
}
