//! Template listing.

use axum::extract::State;
use axum::Json;
use poster_models::Template;

use crate::state::AppState;

pub async fn list_templates(State(state): State<AppState>) -> Json<Vec<Template>> {
    Json(state.templates.list().await)
}
