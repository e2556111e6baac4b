use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::meme::generate_meme,
        crate::handlers::meme::list_memes,
        crate::handlers::meme::get_meme_by_name,
        crate::handlers::meme::download_meme,
        crate::handlers::meme::get_meme_count,
        crate::handlers::meme::list_fonts,
        crate::handlers::meme::health_check,
        crate::handlers::meme::get_metrics,
        crate::handlers::share::share_meme
    ),
    components(
        schemas(
            crate::models::meme::OverlayPosition,
            crate::models::meme::GalleryEntry,
            crate::handlers::meme::GenerateResponse,
            crate::handlers::meme::GalleryResponse,
            crate::handlers::meme::MemeCount,
            crate::handlers::meme::FontList,
            crate::handlers::share::ShareResponse,
            crate::services::share::ShareLinks,
            crate::services::share::SocialLinks
        )
    ),
    tags(
        (name = "memes", description = "Meme generation and gallery"),
        (name = "fonts", description = "Caption fonts"),
        (name = "sharing", description = "Share links"),
        (name = "monitoring", description = "Service metrics")
    ),
    info(
        title = "memesmith-server",
        description = "Meme generator and gallery over a flat image directory"
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
