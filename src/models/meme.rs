use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::error::{AppError, Result};

/// Vertical anchor for the caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPosition {
    #[default]
    Top,
    Bottom,
}

impl OverlayPosition {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            other => Err(AppError::InvalidRequest(format!(
                "position must be 'top' or 'bottom', got '{}'",
                other
            ))),
        }
    }
}

/// Caption fill color, parsed from an HTML-style `#RRGGBB` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextColor(pub [u8; 3]);

impl TextColor {
    pub const WHITE: Self = Self([0xff, 0xff, 0xff]);

    pub fn from_hex(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::InvalidRequest(format!(
                "color must be '#RRGGBB', got '{}'",
                s
            )));
        }
        let r = u8::from_str_radix(&hex[0..2], 16).expect("validated hex");
        let g = u8::from_str_radix(&hex[2..4], 16).expect("validated hex");
        let b = u8::from_str_radix(&hex[4..6], 16).expect("validated hex");
        Ok(Self([r, g, b]))
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        let [r, g, b] = self.0;
        image::Rgba([r, g, b, 0xff])
    }
}

/// One file in the memes directory, as shown by the gallery.
///
/// `modified` is RFC 3339; entries whose metadata could not be read carry
/// an `error` instead and keep their slot in the listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GalleryEntry {
    #[schema(example = "my_pic__meme_1.png")]
    pub filename: String,
    #[schema(example = 10240)]
    pub size_bytes: u64,
    #[schema(example = "2025-07-01T12:00:00Z")]
    pub modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_parses_case_insensitively() {
        assert_eq!(OverlayPosition::parse("Top").unwrap(), OverlayPosition::Top);
        assert_eq!(
            OverlayPosition::parse("BOTTOM").unwrap(),
            OverlayPosition::Bottom
        );
        assert!(OverlayPosition::parse("middle").is_err());
    }

    #[test]
    fn color_parses_hex_with_and_without_hash() {
        assert_eq!(TextColor::from_hex("#FFFFFF").unwrap(), TextColor::WHITE);
        assert_eq!(
            TextColor::from_hex("00ff80").unwrap(),
            TextColor([0x00, 0xff, 0x80])
        );
    }

    #[test]
    fn color_rejects_malformed_input() {
        assert!(TextColor::from_hex("#fff").is_err());
        assert!(TextColor::from_hex("#gggggg").is_err());
        assert!(TextColor::from_hex("").is_err());
    }
}
