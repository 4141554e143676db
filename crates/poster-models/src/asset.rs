//! Generated asset models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an asset ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssetTier {
    /// Remote object store.
    Remote,
    /// Local upload directory served under `/uploads/`.
    Local,
}

impl AssetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetTier::Remote => "remote",
            AssetTier::Local => "local",
        }
    }
}

impl fmt::Display for AssetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted asset. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedAsset {
    bytes: Vec<u8>,
    key: String,
    url: String,
    tier: AssetTier,
}

impl GeneratedAsset {
    pub fn new(bytes: Vec<u8>, key: impl Into<String>, url: impl Into<String>, tier: AssetTier) -> Self {
        Self {
            bytes,
            key: key.into(),
            url: url.into(),
            tier,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Logical storage key, e.g. `generated/<uuid>.png`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn tier(&self) -> AssetTier {
        self.tier
    }
}

/// Response body of a poster generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GenerationOutput {
    pub public_url: String,
    pub id: String,
}

impl From<&GeneratedAsset> for GenerationOutput {
    fn from(asset: &GeneratedAsset) -> Self {
        Self {
            public_url: asset.url().to_string(),
            id: asset.key().to_string(),
        }
    }
}
