use std::env;
use std::path::PathBuf;

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Config;

/// Fixed redirect URLs for the three supported platforms. They carry the
/// configured generic message, not the specific meme's URL; the Facebook
/// template still holds its placeholder. Preserved as-is.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SocialLinks {
    #[schema(example = "https://wa.me/?text=Check%20out%20this%20meme!")]
    pub whatsapp: String,
    #[schema(example = "https://twitter.com/intent/tweet?text=Check%20out%20this%20meme!")]
    pub twitter: String,
    #[schema(example = "https://www.facebook.com/sharer/sharer.php?u=YOUR_MEME_URL_HERE")]
    pub facebook: String,
}

/// Where a given meme can be reached. On a public host this is a direct
/// URL; locally it is an absolute filesystem path that cannot be shared
/// over the web, flagged accordingly.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShareLinks {
    #[schema(example = "my_pic__meme_1.png")]
    pub filename: String,
    #[schema(example = "https://example.hf.space/memes/my_pic__meme_1.png")]
    pub url: String,
    pub shareable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ShareService {
    memes_dir: PathBuf,
    memes_dir_name: String,
    host_env: String,
    message: String,
}

impl ShareService {
    pub fn new(config: &Config) -> Self {
        let memes_dir = PathBuf::from(&config.storage.memes_dir);
        let memes_dir_name = memes_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("memes")
            .to_string();
        Self {
            memes_dir,
            memes_dir_name,
            host_env: config.sharing.host_env.clone(),
            message: config.sharing.message.clone(),
        }
    }

    pub fn links_for(&self, filename: &str) -> ShareLinks {
        match env::var(&self.host_env) {
            Ok(host) if !host.is_empty() => ShareLinks {
                filename: filename.to_string(),
                url: format!("https://{}/{}/{}", host, self.memes_dir_name, filename),
                shareable: true,
                note: None,
            },
            _ => ShareLinks {
                filename: filename.to_string(),
                url: self.absolute_local_path(filename),
                shareable: false,
                note: Some(
                    "not hosted on a public host; this is a local path and cannot be shared over the web"
                        .to_string(),
                ),
            },
        }
    }

    pub fn social_links(&self) -> SocialLinks {
        SocialLinks {
            whatsapp: format!("https://wa.me/?text={}", self.message),
            twitter: format!("https://twitter.com/intent/tweet?text={}", self.message),
            facebook: "https://www.facebook.com/sharer/sharer.php?u=YOUR_MEME_URL_HERE".to_string(),
        }
    }

    fn absolute_local_path(&self, filename: &str) -> String {
        let path = self.memes_dir.join(filename);
        if path.is_absolute() {
            path.display().to_string()
        } else {
            env::current_dir()
                .map(|cwd| cwd.join(&path))
                .unwrap_or(path)
                .display()
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(memes_dir: &str, host_env: &str) -> ShareService {
        let mut config = Config::default();
        config.storage.memes_dir = memes_dir.to_string();
        config.sharing.host_env = host_env.to_string();
        ShareService::new(&config)
    }

    #[test]
    fn public_host_yields_direct_url() {
        // var name unique to this test so parallel tests cannot collide
        let service = service("/data/memes", "MEMESMITH_TEST_HOST_A");
        env::set_var("MEMESMITH_TEST_HOST_A", "demo.hf.space");

        let links = service.links_for("cat_meme_1.png");
        env::remove_var("MEMESMITH_TEST_HOST_A");

        assert!(links.shareable);
        assert_eq!(links.url, "https://demo.hf.space/memes/cat_meme_1.png");
        assert!(links.note.is_none());
    }

    #[test]
    fn missing_host_marker_yields_local_path() {
        let service = service("/data/memes", "MEMESMITH_TEST_HOST_B");

        let links = service.links_for("cat_meme_1.png");

        assert!(!links.shareable);
        assert_eq!(links.url, "/data/memes/cat_meme_1.png");
        assert!(links.note.is_some());
    }

    #[test]
    fn social_links_carry_the_generic_message() {
        let service = service("memes", "MEMESMITH_TEST_HOST_C");

        let social = service.social_links();
        assert_eq!(social.whatsapp, "https://wa.me/?text=Check%20out%20this%20meme!");
        assert!(social.twitter.starts_with("https://twitter.com/intent/tweet?text="));
        // deliberately still the placeholder, not the meme's URL
        assert!(social.facebook.ends_with("u=YOUR_MEME_URL_HERE"));
    }
}
