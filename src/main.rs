use axum::{
    extract::ConnectInfo,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{OnResponse, TraceLayer},
};
use tracing::{info, Level, Span};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::utils::error::AppError;

#[derive(Clone)]
struct CustomOnResponse;

impl<B> OnResponse<B> for CustomOnResponse {
    fn on_response(self, response: &axum::response::Response<B>, latency: Duration, span: &Span) {
        let status = response.status();
        info!(parent: span,
            status = %status,
            latency = ?latency,
            "response completed"
        );
    }
}

mod config;
mod handlers;
mod metrics;
mod models;
mod openapi;
mod services;
mod utils;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    metrics::init_metrics();

    let config = config::Config::load_from_file("config.yml")?;

    std::fs::create_dir_all(&config.logging.directory)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.logging.file_prefix)
        .filename_suffix("log")
        .build(&config.logging.directory)
        .expect("failed to create log file appender");

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_target(false),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    tracing::info!("logging initialized");
    tracing::info!(
        memes_dir = %config.storage.memes_dir,
        fonts_dir = %config.storage.fonts_dir,
        "configuration loaded"
    );

    let state = Arc::new(services::AppState::new(Arc::clone(&config))?);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let config_clone = Arc::clone(&config);
    let app = Router::new()
        .route("/", get(|| async { axum::response::Redirect::to("/swagger-ui") }))
        .route("/memes/generate", post(handlers::meme::generate_meme))
        .route("/memes/list", get(handlers::meme::list_memes))
        .route("/memes/get/:filename", get(handlers::meme::get_meme_by_name))
        .route("/memes/download/:filename", get(handlers::meme::download_meme))
        .route("/memes/share/:filename", get(handlers::share::share_meme))
        .route("/memes/count", get(handlers::meme::get_meme_count))
        .route("/memes/health", get(handlers::meme::health_check))
        .route("/fonts/list", get(handlers::meme::list_fonts))
        .route("/metrics", get(handlers::meme::get_metrics))
        .merge(openapi::swagger_ui())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &axum::http::Request<_>| {
                    let remote_addr = if config_clone.server.proxy.enabled {
                        request
                            .headers()
                            .get(&config_clone.server.proxy.ip_header)
                            .and_then(|h| h.to_str().ok())
                            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
                            .unwrap_or_else(|| "unknown".to_string())
                    } else {
                        request
                            .extensions()
                            .get::<ConnectInfo<SocketAddr>>()
                            .map(|ci| ci.0.ip().to_string())
                            .unwrap_or_else(|| "unknown".to_string())
                    };

                    tracing::span!(
                        Level::INFO,
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        ip = %remote_addr,
                    )
                })
                .on_response(CustomOnResponse),
        )
        .layer(cors)
        // uploads are whole images, not form fields
        .layer(axum::extract::DefaultBodyLimit::max(20 * 1024 * 1024))
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| AppError::Internal(format!("invalid address: {}", e)))?;
    tracing::info!("server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
