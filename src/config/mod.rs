use crate::utils::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, sync::Arc};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub ip_header: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StorageConfig {
    pub memes_dir: String,
    pub fonts_dir: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SharingConfig {
    /// Environment variable that marks a public hosting environment and
    /// carries the public host name (e.g. HF Spaces sets SPACE_HOST).
    pub host_env: String,
    /// Pre-filled message for the social redirect URLs, stored URL-encoded.
    pub message: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_prefix: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub sharing: SharingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ip_header: "x-forwarded-for".to_string(),
        }
    }
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            host_env: "SPACE_HOST".to_string(),
            message: "Check%20out%20this%20meme!".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "memesmith".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
                proxy: ProxyConfig::default(),
            },
            storage: StorageConfig {
                memes_dir: "memes".to_string(),
                fonts_dir: "fonts".to_string(),
            },
            sharing: SharingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Arc<Self>> {
        let path = path.as_ref();

        // Missing config: prefer the shipped example, otherwise write defaults.
        if !path.exists() {
            let example_path = path.with_extension("yml.example");

            if example_path.exists() {
                tracing::info!("creating config file from example");
                fs::copy(&example_path, path)
                    .map_err(|e| AppError::Internal(format!("failed to copy example config: {}", e)))?;
            } else {
                tracing::info!("config file not found, writing defaults");
                let config = Config::default();
                let config_str = serde_yaml::to_string(&config)
                    .map_err(|e| AppError::Internal(format!("failed to serialize default config: {}", e)))?;

                if let Some(parent) = path.parent() {
                    if !parent.exists() {
                        fs::create_dir_all(parent).map_err(|e| {
                            AppError::Internal(format!("failed to create config directory: {}", e))
                        })?;
                    }
                }

                fs::write(path, config_str)
                    .map_err(|e| AppError::Internal(format!("failed to write default config: {}", e)))?;

                tracing::info!("default config written to {:?}", path);
            }
        }

        let config_str = fs::read_to_string(path)
            .map_err(|e| AppError::Internal(format!("failed to read config file: {}", e)))?;

        let config: Config = serde_yaml::from_str(&config_str)
            .map_err(|e| AppError::Internal(format!("failed to parse config file: {}", e)))?;

        config.validate()?;

        // The memes and fonts directories are the whole data model; make
        // sure both exist before the first request touches them.
        for dir in [&config.storage.memes_dir, &config.storage.fonts_dir] {
            if !Path::new(dir).exists() {
                fs::create_dir_all(dir)
                    .map_err(|e| AppError::Internal(format!("failed to create directory {}: {}", dir, e)))?;
                tracing::info!("created directory: {}", dir);
            }
        }

        Ok(Arc::new(config))
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Internal("server port must be greater than 0".to_string()));
        }

        if self.server.host.is_empty() {
            return Err(AppError::Internal("server host cannot be empty".to_string()));
        }

        if self.storage.memes_dir.is_empty() {
            return Err(AppError::Internal("memes directory path cannot be empty".to_string()));
        }

        if self.storage.fonts_dir.is_empty() {
            return Err(AppError::Internal("fonts directory path cannot be empty".to_string()));
        }

        if self.sharing.host_env.is_empty() {
            return Err(AppError::Internal("sharing host_env cannot be empty".to_string()));
        }

        Ok(())
    }
}
