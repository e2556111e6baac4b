use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::warn;

use crate::models::meme::OverlayPosition;
use crate::utils::error::{AppError, Result};

/// Outline thickness drawn around the caption so it stays readable
/// against arbitrary backgrounds.
const STROKE_WIDTH: i32 = 2;

/// Gap between the caption and the top or bottom image edge.
const EDGE_MARGIN: i32 = 10;

static DEFAULT_FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

/// Caption size is a fixed fraction of the image height, never below 1px.
pub fn font_size_for_height(image_height: u32) -> u32 {
    ((image_height as f32) * 0.10).round().max(1.0) as u32
}

/// Where the caption's top-left corner goes: horizontally centered,
/// vertically pinned to the chosen edge with a fixed margin.
pub fn overlay_origin(
    image_width: u32,
    image_height: u32,
    text_width: u32,
    text_height: u32,
    position: OverlayPosition,
) -> (i32, i32) {
    let x = (image_width as i32 - text_width as i32) / 2;
    let y = match position {
        OverlayPosition::Top => EDGE_MARGIN,
        OverlayPosition::Bottom => image_height as i32 - text_height as i32 - EDGE_MARGIN,
    };
    (x, y)
}

/// Draws captions onto uploaded images. Fonts are read per request from the
/// fonts directory; a built-in font backs every failed load.
pub struct MemeRenderer {
    fonts_dir: PathBuf,
    default_font: FontArc,
}

impl MemeRenderer {
    pub fn new<P: AsRef<Path>>(fonts_dir: P) -> Result<Self> {
        let default_font = FontArc::try_from_slice(DEFAULT_FONT_BYTES)
            .map_err(|e| AppError::Font(format!("embedded default font is invalid: {}", e)))?;
        Ok(Self {
            fonts_dir: fonts_dir.as_ref().to_path_buf(),
            default_font,
        })
    }

    /// Loads the named font from the fonts directory. A missing or corrupt
    /// font falls back to the built-in default; the returned flag tells the
    /// caller a fallback happened so it can surface the warning.
    pub fn resolve_font(&self, name: Option<&str>) -> Result<(FontArc, bool)> {
        let Some(name) = name else {
            return Ok((self.default_font.clone(), false));
        };

        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(AppError::InvalidRequest(format!(
                "font name '{}' must not contain path components",
                name
            )));
        }

        let path = self.fonts_dir.join(name);
        match std::fs::read(&path) {
            Ok(bytes) => match FontArc::try_from_vec(bytes) {
                Ok(font) => Ok((font, false)),
                Err(e) => {
                    warn!(font = name, "invalid font file, using built-in default: {}", e);
                    Ok((self.default_font.clone(), true))
                }
            },
            Err(e) => {
                warn!(font = name, "failed to read font, using built-in default: {}", e);
                Ok((self.default_font.clone(), true))
            }
        }
    }

    /// The `.ttf` files available for captions, files only, sorted by name.
    pub fn list_fonts(&self) -> Result<Vec<String>> {
        let mut fonts = Vec::new();
        for entry in std::fs::read_dir(&self.fonts_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if Path::new(name)
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("ttf"))
                .unwrap_or(false)
            {
                fonts.push(name.to_string());
            }
        }
        fonts.sort();
        Ok(fonts)
    }

    /// Renders `text` onto a copy of `image`: measured, centered, anchored
    /// to the requested edge, with a black stroke outline under the fill.
    /// The source image is never touched. Empty text yields a plain copy.
    pub fn render(
        &self,
        image: &DynamicImage,
        text: &str,
        position: OverlayPosition,
        font: &FontArc,
        font_size: u32,
        color: Rgba<u8>,
    ) -> RgbaImage {
        let mut canvas = image.to_rgba8();
        if text.is_empty() {
            return canvas;
        }

        let scale = PxScale::from(font_size as f32);
        let (text_width, text_height) = text_size(scale, font, text);
        let (x, y) = overlay_origin(
            canvas.width(),
            canvas.height(),
            text_width as u32,
            text_height as u32,
            position,
        );

        let outline = Rgba([0u8, 0, 0, 0xff]);
        for dy in -STROKE_WIDTH..=STROKE_WIDTH {
            for dx in -STROKE_WIDTH..=STROKE_WIDTH {
                if dx == 0 && dy == 0 {
                    continue;
                }
                draw_text_mut(&mut canvas, outline, x + dx, y + dy, scale, font, text);
            }
        }
        draw_text_mut(&mut canvas, color, x, y, scale, font, text);

        canvas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn renderer() -> MemeRenderer {
        let dir = tempfile::TempDir::new().expect("temp fonts dir");
        MemeRenderer::new(dir.path()).expect("renderer")
    }

    fn red_image(width: u32, height: u32) -> DynamicImage {
        let buf = RgbaImage::from_pixel(width, height, Rgba([0xff, 0, 0, 0xff]));
        DynamicImage::ImageRgba8(buf)
    }

    #[test]
    fn font_size_is_ten_percent_of_height_rounded() {
        assert_eq!(font_size_for_height(100), 10);
        assert_eq!(font_size_for_height(80), 8);
        assert_eq!(font_size_for_height(1024), 102);
        assert_eq!(font_size_for_height(1), 1);
    }

    #[test]
    fn top_position_pins_text_ten_pixels_from_top() {
        for text_width in [5, 120, 799] {
            let (_, y) = overlay_origin(800, 600, text_width, 60, OverlayPosition::Top);
            assert_eq!(y, 10);
        }
    }

    #[test]
    fn bottom_position_pins_text_bottom_ten_pixels_from_edge() {
        let (_, y) = overlay_origin(800, 600, 200, 60, OverlayPosition::Bottom);
        assert_eq!(y + 60, 600 - 10);
    }

    #[test]
    fn text_is_horizontally_centered_within_one_pixel() {
        for (image_width, text_width) in [(800, 200), (801, 200), (640, 333), (101, 100)] {
            let (x, _) = overlay_origin(image_width, 600, text_width, 60, OverlayPosition::Top);
            let center = x + text_width as i32 / 2;
            assert!(
                (center - image_width as i32 / 2).abs() <= 1,
                "image_width={} text_width={} center={}",
                image_width,
                text_width,
                center
            );
        }
    }

    #[test]
    fn render_keeps_dimensions_and_source_untouched() {
        let renderer = renderer();
        let source = red_image(200, 100);
        let (font, _) = renderer.resolve_font(None).expect("font");

        let meme = renderer.render(
            &source,
            "HELLO",
            OverlayPosition::Bottom,
            &font,
            10,
            Rgba([0xff, 0xff, 0xff, 0xff]),
        );

        assert_eq!((meme.width(), meme.height()), source.dimensions());
        // the source stayed all red
        assert!(source.to_rgba8().pixels().all(|p| *p == Rgba([0xff, 0, 0, 0xff])));
        // the copy got ink on it
        assert!(meme.pixels().any(|p| *p != Rgba([0xff, 0, 0, 0xff])));
    }

    #[test]
    fn empty_text_returns_plain_copy() {
        let renderer = renderer();
        let source = red_image(64, 64);
        let (font, _) = renderer.resolve_font(None).expect("font");

        let meme = renderer.render(
            &source,
            "",
            OverlayPosition::Top,
            &font,
            6,
            Rgba([0, 0, 0, 0xff]),
        );

        assert_eq!(meme, source.to_rgba8());
    }

    #[test]
    fn missing_font_falls_back_to_default() {
        let renderer = renderer();
        let (_, fallback) = renderer.resolve_font(Some("nope.ttf")).expect("resolve");
        assert!(fallback);

        let (_, fallback) = renderer.resolve_font(None).expect("resolve");
        assert!(!fallback);
    }

    #[test]
    fn font_names_with_path_components_are_rejected() {
        let renderer = renderer();
        assert!(renderer.resolve_font(Some("../etc/passwd")).is_err());
        assert!(renderer.resolve_font(Some("a/b.ttf")).is_err());
    }

    #[test]
    fn list_fonts_filters_to_ttf_files() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("impact.ttf"), b"x").expect("write");
        std::fs::write(dir.path().join("Comic.TTF"), b"x").expect("write");
        std::fs::write(dir.path().join("notes.txt"), b"x").expect("write");
        let renderer = MemeRenderer::new(dir.path()).expect("renderer");

        let fonts = renderer.list_fonts().expect("list");
        assert_eq!(fonts, vec!["Comic.TTF".to_string(), "impact.ttf".to_string()]);
    }
}
