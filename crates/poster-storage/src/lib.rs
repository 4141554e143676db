//! Asset storage for generated posters and template images.
//!
//! This crate provides:
//! - An S3-compatible object store client
//! - Remote and local storage tiers behind a single [`AssetStore`]
//! - Storage key helpers
//! - The JSON-backed [`TemplateRegistry`]

pub mod assets;
pub mod client;
pub mod error;
pub mod keys;
pub mod registry;

pub use assets::{AssetKind, AssetStore, LocalTier, RemoteTier, MAX_PRESIGN_TTL};
pub use client::{ObjectStore, S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use keys::{generated_poster_key, template_background_key, template_upload_key, validate_key};
pub use registry::TemplateRegistry;
