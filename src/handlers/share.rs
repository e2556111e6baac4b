use axum::{
    extract::{Path as AxumPath, State},
    Json,
};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::handlers::meme::validate_filename;
use crate::services::share::{ShareLinks, SocialLinks};
use crate::services::AppState;
use crate::utils::error::{AppError, Result};

#[derive(Serialize, ToSchema)]
pub struct ShareResponse {
    pub links: ShareLinks,
    pub social: SocialLinks,
}

/// Share links for a stored meme: a direct URL when running on a public
/// host, otherwise the local path, plus the fixed social redirects.
#[utoipa::path(
    get,
    path = "/memes/share/{filename}",
    tag = "sharing",
    params(("filename" = String, Path, description = "Meme filename")),
    responses(
        (status = 200, description = "Share links for the meme", body = ShareResponse),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "Meme not found")
    )
)]
pub async fn share_meme(
    State(state): State<Arc<AppState>>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Json<ShareResponse>> {
    validate_filename(&filename)?;

    let path = Path::new(&state.config.storage.memes_dir).join(&filename);
    if !path.is_file() {
        return Err(AppError::NotFound(format!("meme '{}' not found", filename)));
    }

    Ok(Json(ShareResponse {
        links: state.share.links_for(&filename),
        social: state.share.social_links(),
    }))
}
