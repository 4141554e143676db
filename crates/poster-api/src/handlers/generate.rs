//! Poster generation endpoint.

use axum::extract::{Multipart, State};
use axum::Json;
use poster_models::{GenerationOutput, Tone};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::handlers::form::{BaseUrl, MultipartForm};
use crate::services::{PosterRequest, TemplateSource};
use crate::state::AppState;

/// `POST /generate-meme`
///
/// The template comes from the uploaded `template_photo`, else `template_url`,
/// else the cover of the registry template named by `template_id`.
/// An unknown `template_id` counts as no template and yields
/// 400 `Could not load template image`, not 404: the id only names a fallback
/// source, unlike the admin routes where it names the resource being changed.
pub async fn generate_meme(
    State(state): State<AppState>,
    BaseUrl(base_url): BaseUrl,
    multipart: Multipart,
) -> ApiResult<Json<GenerationOutput>> {
    let mut form = MultipartForm::read(multipart).await?;

    let user_photo = form.required_file("user_photo")?.bytes;
    let user_name = form.required_text("user_name")?.to_string();
    let movie_title = form.required_text("movie_title")?.to_string();
    let tagline = form.required_text("tagline")?.to_string();
    let cover_text = form.required_text("cover_text")?.to_string();
    let tone = form.text("tone").map(Tone::parse_lenient).unwrap_or_default();

    let registry_template = match form.text("template_id") {
        Some(id) => state.templates.registry().get(id).await,
        None => None,
    };

    let costume_description = match form.text("costume_description") {
        Some(costume) => costume.to_string(),
        None => registry_template
            .as_ref()
            .map(|t| t.costume.clone())
            .ok_or_else(|| ApiError::bad_request("Missing form field: costume_description"))?,
    };

    let template = match form.take_file("template_photo") {
        Some(file) => TemplateSource::Upload(file.bytes),
        None => match form.text("template_url") {
            Some(url) => TemplateSource::Url(url.to_string()),
            None => registry_template
                .as_ref()
                .map(|t| TemplateSource::Url(t.cover_image.clone()))
                .ok_or_else(|| ApiError::bad_request("Could not load template image"))?,
        },
    };

    let credits = state.pipeline.billing_for(tone, &mut rand::rng());

    info!(
        template_id = form.text("template_id").unwrap_or(""),
        tone = %tone,
        photo_bytes = user_photo.len(),
        "Poster generation requested"
    );

    let request = PosterRequest {
        user_photo,
        template,
        user_name,
        movie_title,
        tagline,
        cover_text,
        tone,
        costume_description,
        credits,
    };

    let asset = state.pipeline.generate(request, &base_url).await?;
    Ok(Json(GenerationOutput::from(&asset)))
}
