//! Template gallery administration.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::handlers::form::{BaseUrl, MultipartForm};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TemplateImageResponse {
    pub success: bool,
    pub url: String,
}

/// `POST /admin/upload-template-image`
pub async fn upload_template_image(
    State(state): State<AppState>,
    BaseUrl(base_url): BaseUrl,
    multipart: Multipart,
) -> ApiResult<Json<TemplateImageResponse>> {
    let mut form = MultipartForm::read(multipart).await?;
    let template_id = form.required_text("template_id")?.trim().to_string();
    let file = form.required_file("file")?;
    let content_type = file.content_type.as_deref().unwrap_or("image/png").to_string();

    info!(template_id, bytes = file.bytes.len(), content_type, "Template image upload");

    let url = state
        .templates
        .upload_image(&template_id, file.bytes, &content_type, &base_url)
        .await?;

    Ok(Json(TemplateImageResponse { success: true, url }))
}

/// `POST /admin/generate-template-background`
pub async fn generate_template_background(
    State(state): State<AppState>,
    BaseUrl(base_url): BaseUrl,
    multipart: Multipart,
) -> ApiResult<Json<TemplateImageResponse>> {
    let form = MultipartForm::read(multipart).await?;
    let template_id = form.required_text("template_id")?.trim();
    let prompt = form.required_text("prompt")?;

    let url = state
        .templates
        .generate_background(template_id, prompt, &base_url)
        .await?;

    Ok(Json(TemplateImageResponse { success: true, url }))
}
