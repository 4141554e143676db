//! Request handlers.

pub mod admin;
pub mod form;
pub mod generate;
pub mod health;
pub mod templates;

pub use admin::{generate_template_background, upload_template_image};
pub use generate::generate_meme;
pub use health::health;
pub use templates::list_templates;
