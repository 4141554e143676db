//! Axum HTTP API server for poster generation.
//!
//! This crate provides:
//! - The `/generate-meme` pipeline endpoint
//! - Template listing and admin gallery mutations
//! - Static serving of locally stored assets
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, PipelineConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{PosterPipeline, PosterRequest, TemplateService, TemplateSource};
pub use state::AppState;
