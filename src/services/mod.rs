pub mod gallery;
pub mod render;
pub mod share;

use std::sync::Arc;

use crate::config::Config;
use crate::utils::error::Result;

/// Shared per-request context: configuration plus the stateless services.
/// The memes directory itself is the only mutable state and lives on disk.
pub struct AppState {
    pub config: Arc<Config>,
    pub renderer: render::MemeRenderer,
    pub share: share::ShareService,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let renderer = render::MemeRenderer::new(&config.storage.fonts_dir)?;
        let share = share::ShareService::new(&config);
        Ok(Self {
            config,
            renderer,
            share,
        })
    }
}
