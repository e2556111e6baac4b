use axum::{
    extract::{Multipart, Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::metrics::{Timer, GALLERY_SIZE, MEMES_GENERATED, RENDER_TIME, REQUEST_COUNTER, RESPONSE_TIME};
use crate::models::meme::{GalleryEntry, OverlayPosition, TextColor};
use crate::services::{gallery, render, AppState};
use crate::utils::error::{AppError, Result};

#[derive(Deserialize, ToSchema, utoipa::IntoParams)]
pub struct ListQuery {
    /// Number of display columns (1-5); omitted means a flat listing.
    #[schema(example = 3)]
    pub columns: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateResponse {
    #[schema(example = "my_pic__meme_1.png")]
    pub filename: String,
    #[schema(example = 800)]
    pub width: u32,
    #[schema(example = 600)]
    pub height: u32,
    /// True when the requested font could not be loaded and the built-in
    /// default was used instead.
    pub font_fallback: bool,
    pub share: crate::services::share::ShareLinks,
}

#[derive(Serialize, ToSchema)]
pub struct GalleryResponse {
    #[schema(example = 12)]
    pub count: usize,
    pub entries: Vec<GalleryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Vec<GalleryEntry>>>,
}

#[derive(Serialize, ToSchema)]
pub struct MemeCount {
    #[schema(example = 12)]
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct FontList {
    #[schema(example = 2)]
    pub count: usize,
    #[schema(example = json!(["impact.ttf"]))]
    pub fonts: Vec<String>,
}

/// Served filenames come straight from the URL; anything that could walk
/// out of the memes directory is refused.
pub(crate) fn validate_filename(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\'])
        || name.contains("..")
    {
        return Err(AppError::InvalidRequest(format!(
            "invalid filename '{}'",
            name
        )));
    }
    Ok(())
}

/// Render a caption onto an uploaded image and save it to the gallery.
#[utoipa::path(
    post,
    path = "/memes/generate",
    tag = "memes",
    request_body(
        content = Vec<u8>,
        content_type = "multipart/form-data",
        description = "Fields: image (file, required), text, position (top|bottom), font (.ttf name in the fonts dir), color (#RRGGBB)"
    ),
    responses(
        (status = 200, description = "Meme rendered and saved to the gallery", body = GenerateResponse),
        (status = 400, description = "Missing image or malformed parameters"),
        (status = 500, description = "Save failed")
    )
)]
pub async fn generate_meme(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>> {
    REQUEST_COUNTER.inc();
    let _timer = Timer::new(&RESPONSE_TIME);

    let mut image_bytes: Option<axum::body::Bytes> = None;
    let mut original_name = String::from("meme");
    let mut text = String::new();
    let mut position = OverlayPosition::Top;
    let mut font_name: Option<String> = None;
    let mut color = TextColor::WHITE;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                if let Some(file_name) = field.file_name() {
                    original_name = file_name.to_string();
                }
                image_bytes = Some(field.bytes().await?);
            }
            "text" => text = field.text().await?,
            "position" => position = OverlayPosition::parse(&field.text().await?)?,
            "font" => {
                let value = field.text().await?;
                if !value.is_empty() {
                    font_name = Some(value);
                }
            }
            "color" => color = TextColor::from_hex(&field.text().await?)?,
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let image_bytes =
        image_bytes.ok_or_else(|| AppError::InvalidRequest("missing 'image' field".to_string()))?;
    let source = image::load_from_memory(&image_bytes)?;

    let font_size = render::font_size_for_height(source.height());
    let (font, font_fallback) = state.renderer.resolve_font(font_name.as_deref())?;

    let meme = {
        let _render_timer = Timer::new(&RENDER_TIME);
        state
            .renderer
            .render(&source, &text, position, &font, font_size, color.to_rgba())
    };

    let memes_dir = Path::new(&state.config.storage.memes_dir);
    let filename = gallery::next_filename(&original_name, memes_dir)?;
    // Save failures (permissions, disk full) surface to the caller; no retry.
    meme.save(memes_dir.join(&filename))?;

    MEMES_GENERATED.inc();

    info!(
        filename = %filename,
        width = meme.width(),
        height = meme.height(),
        font_size,
        font_fallback,
        "meme generated"
    );

    Ok(Json(GenerateResponse {
        share: state.share.links_for(&filename),
        width: meme.width(),
        height: meme.height(),
        font_fallback,
        filename,
    }))
}

/// List the gallery, most recently modified first.
#[utoipa::path(
    get,
    path = "/memes/list",
    tag = "memes",
    params(ListQuery),
    responses(
        (status = 200, description = "Gallery entries, most recent first", body = GalleryResponse)
    )
)]
pub async fn list_memes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<GalleryResponse>> {
    REQUEST_COUNTER.inc();
    let _timer = Timer::new(&RESPONSE_TIME);

    let entries = gallery::list(Path::new(&state.config.storage.memes_dir))?;
    GALLERY_SIZE.set(entries.len() as f64);

    // same clamp the original UI slider had
    let columns = query
        .columns
        .map(|n| gallery::partition_columns(&entries, n.clamp(1, 5)));

    Ok(Json(GalleryResponse {
        count: entries.len(),
        entries,
        columns,
    }))
}

/// Serve a stored meme inline.
#[utoipa::path(
    get,
    path = "/memes/get/{filename}",
    tag = "memes",
    params(("filename" = String, Path, description = "Meme filename")),
    responses(
        (status = 200, description = "Meme image bytes", content_type = "image/*"),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "Meme not found")
    )
)]
pub async fn get_meme_by_name(
    State(state): State<Arc<AppState>>,
    AxumPath(filename): AxumPath<String>,
) -> Result<impl IntoResponse> {
    REQUEST_COUNTER.inc();
    let _timer = Timer::new(&RESPONSE_TIME);

    let content = read_meme(&state, &filename).await?;
    let mime_type = mime_guess::from_path(&filename)
        .first_or_octet_stream()
        .to_string();

    info!(filename = %filename, size = content.len(), "serving meme");
    Ok(([(header::CONTENT_TYPE, mime_type)], content))
}

/// Serve a stored meme as a download.
#[utoipa::path(
    get,
    path = "/memes/download/{filename}",
    tag = "memes",
    params(("filename" = String, Path, description = "Meme filename")),
    responses(
        (status = 200, description = "Meme as attachment", content_type = "image/png"),
        (status = 400, description = "Invalid filename"),
        (status = 404, description = "Meme not found")
    )
)]
pub async fn download_meme(
    State(state): State<Arc<AppState>>,
    AxumPath(filename): AxumPath<String>,
) -> Result<impl IntoResponse> {
    REQUEST_COUNTER.inc();
    let _timer = Timer::new(&RESPONSE_TIME);

    let content = read_meme(&state, &filename).await?;

    info!(filename = %filename, size = content.len(), "serving meme download");
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        content,
    ))
}

async fn read_meme(state: &AppState, filename: &str) -> Result<Vec<u8>> {
    validate_filename(filename)?;
    let path = Path::new(&state.config.storage.memes_dir).join(filename);
    match tokio::fs::read(&path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AppError::NotFound(format!("meme '{}' not found", filename)))
        }
        Err(e) => Err(e.into()),
    }
}

/// Count the memes in the gallery.
#[utoipa::path(
    get,
    path = "/memes/count",
    tag = "memes",
    responses(
        (status = 200, description = "Number of memes in the gallery", body = MemeCount)
    )
)]
pub async fn get_meme_count(State(state): State<Arc<AppState>>) -> Result<Json<MemeCount>> {
    let entries = gallery::list(Path::new(&state.config.storage.memes_dir))?;
    Ok(Json(MemeCount {
        count: entries.len(),
    }))
}

/// List the caption fonts.
#[utoipa::path(
    get,
    path = "/fonts/list",
    tag = "fonts",
    responses(
        (status = 200, description = "Caption fonts available in the fonts directory", body = FontList)
    )
)]
pub async fn list_fonts(State(state): State<Arc<AppState>>) -> Result<Json<FontList>> {
    let fonts = state.renderer.list_fonts()?;
    if fonts.is_empty() {
        tracing::warn!("no .ttf files in the fonts directory; captions will use the built-in font");
    }
    Ok(Json(FontList {
        count: fonts.len(),
        fonts,
    }))
}

/// Health check.
#[utoipa::path(
    get,
    path = "/memes/health",
    tag = "memes",
    responses(
        (status = 200, description = "Service healthy")
    )
)]
pub async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Prometheus metrics in text exposition format.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "monitoring",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain")
    )
)]
pub async fn get_metrics() -> impl IntoResponse {
    let metrics = crate::metrics::get_metrics();
    (StatusCode::OK, [("Content-Type", "text/plain; charset=utf-8")], metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_filenames_are_rejected() {
        assert!(validate_filename("../secret.png").is_err());
        assert!(validate_filename("a/b.png").is_err());
        assert!(validate_filename("a\\b.png").is_err());
        assert!(validate_filename(".hidden.png").is_err());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("cat_meme_1.png").is_ok());
    }
}
