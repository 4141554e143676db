//! Business logic services.

pub mod generation;
pub mod templates;

pub use generation::{edit_prompt, PosterPipeline, PosterRequest, TemplateSource};
pub use templates::{background_prompt, TemplateFetcher, TemplateService};
