//! Knuckle Tattoo Renderer
//!
//! Draws up to eight letters onto a picture of two fists, one letter per
//! knuckle, and returns the result as PNG bytes.

use ab_glyph::{Font, FontVec, PxScale};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use serde::Deserialize;
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

/// Number of knuckles on the template
pub const LETTER_COUNT: usize = 8;

/// Top-left corner of each knuckle's letter, left hand first
pub const KNUCKLE_POSITIONS: [(i32, i32); LETTER_COUNT] = [
    (33, 130),
    (85, 114),
    (144, 101),
    (217, 87),
    (366, 88),
    (435, 96),
    (509, 112),
    (568, 123),
];

/// Height of a capital letter on the knuckle, in pixels
const LETTER_HEIGHT_PX: f32 = 40.0;

const INK: Rgba<u8> = Rgba([0x00, 0x40, 0x00, 0xff]);

/// Tattoo renderer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TattooConfig {
    #[serde(default = "default_template")]
    pub template: String,

    #[serde(default = "default_font")]
    pub font: String,

    /// Text rendered when the request has no `t` parameter
    #[serde(default = "default_text")]
    pub default_text: String,
}

fn default_template() -> String {
    "knuckles.png".to_string()
}

fn default_font() -> String {
    "xband-ro.ttf".to_string()
}

fn default_text() -> String {
    "KNUK TATS".to_string()
}

impl Default for TattooConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            font: default_font(),
            default_text: default_text(),
        }
    }
}

/// Spaces removed, then cut or padded with spaces to exactly eight letters
pub fn tattoo_letters(text: &str) -> [char; LETTER_COUNT] {
    let mut letters = [' '; LETTER_COUNT];
    for (slot, c) in letters
        .iter_mut()
        .zip(text.chars().filter(|c| *c != ' '))
    {
        *slot = c;
    }
    letters
}

/// Renders tattoo images from a template and a font
pub struct TattooRenderer {
    template: RgbaImage,
    font: FontVec,
    scale: PxScale,
}

impl TattooRenderer {
    /// Load the template image and font from disk
    pub fn load(config: &TattooConfig) -> Result<Self, TattooError> {
        let template = image::open(&config.template)
            .map_err(|e| TattooError::Template {
                path: config.template.clone(),
                error: e.to_string(),
            })?
            .to_rgba8();

        let font = load_font(Path::new(&config.font))?;
        Ok(Self::from_parts(template, font))
    }

    pub fn from_parts(template: RgbaImage, font: FontVec) -> Self {
        let scale = letter_scale(&font);
        Self {
            template,
            font,
            scale,
        }
    }

    /// Render `text` onto the template and encode it as PNG
    pub fn render(&self, text: &str) -> Result<Vec<u8>, TattooError> {
        let mut image = self.template.clone();

        for (letter, (x, y)) in tattoo_letters(text).iter().zip(KNUCKLE_POSITIONS) {
            if *letter == ' ' {
                continue;
            }
            draw_text_mut(
                &mut image,
                INK,
                x,
                y,
                self.scale,
                &self.font,
                letter.encode_utf8(&mut [0; 4]),
            );
        }

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        Ok(png.into_inner())
    }
}

fn load_font(path: &Path) -> Result<FontVec, TattooError> {
    let bytes = std::fs::read(path).map_err(|e| TattooError::Font {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    FontVec::try_from_vec(bytes).map_err(|e| TattooError::Font {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

/// Font scale at which a capital letter is [`LETTER_HEIGHT_PX`] tall
fn letter_scale(font: &FontVec) -> PxScale {
    let cap_height = font
        .outline(font.glyph_id('Y'))
        .map(|outline| outline.bounds.height())
        .filter(|h| *h > 0.0)
        .unwrap_or_else(|| font.ascent_unscaled());

    PxScale::from(LETTER_HEIGHT_PX * font.height_unscaled() / cap_height)
}

/// Tattoo rendering errors
#[derive(Debug, Error)]
pub enum TattooError {
    #[error("Failed to load template {path}: {error}")]
    Template { path: String, error: String },

    #[error("Failed to load font {path}: {error}")]
    Font { path: String, error: String },

    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use ab_glyph::ScaleFont;

    const FONT: &[u8] = include_bytes!("../fixtures/DejaVuSansMono.ttf");

    /// Renderer over a plain white 640x240 template
    pub(crate) fn test_renderer() -> TattooRenderer {
        let template = RgbaImage::from_pixel(640, 240, Rgba([0xff, 0xff, 0xff, 0xff]));
        let font = FontVec::try_from_vec(FONT.to_vec()).unwrap();
        TattooRenderer::from_parts(template, font)
    }

    fn decode(png: &[u8]) -> RgbaImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_rgba8()
    }

    #[test]
    fn test_render_draws_letters_on_template() {
        let renderer = test_renderer();
        let image = decode(&renderer.render("KNUK TATS").unwrap());

        assert_eq!(image.dimensions(), (640, 240));

        let inked: Vec<(u32, u32)> = image
            .enumerate_pixels()
            .filter(|(_, _, p)| p[0] < 0x80 && p[2] < 0x80)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!inked.is_empty());

        // Ink lands on both hands and nowhere above the knuckles
        let min_y = KNUCKLE_POSITIONS.iter().map(|(_, y)| *y).min().unwrap() as u32;
        assert!(inked.iter().any(|(x, _)| *x < 320));
        assert!(inked.iter().any(|(x, _)| *x >= 320));
        assert!(inked.iter().all(|(_, y)| *y + 1 >= min_y));
    }

    #[test]
    fn test_render_blank_text_is_template() {
        let renderer = test_renderer();
        let image = decode(&renderer.render("   ").unwrap());

        assert_eq!(image, renderer.template);
    }

    #[test]
    fn test_letter_scale_fits_knuckle() {
        let renderer = test_renderer();
        let scaled = renderer.font.as_scaled(renderer.scale);
        let glyph = scaled.scaled_glyph('Y');
        let bounds = renderer.font.outline_glyph(glyph).unwrap().px_bounds();

        assert!((bounds.height() - LETTER_HEIGHT_PX).abs() <= 2.0);
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("knuckles.png");
        RgbaImage::new(640, 240).save(&template).unwrap();
        let font = dir.path().join("font.ttf");
        std::fs::write(&font, FONT).unwrap();

        let renderer = TattooRenderer::load(&TattooConfig {
            template: template.display().to_string(),
            font: font.display().to_string(),
            ..TattooConfig::default()
        })
        .unwrap();
        assert!(!renderer.render("LOVE HATE").unwrap().is_empty());
    }

    #[test]
    fn test_letters_strip_spaces() {
        assert_eq!(
            tattoo_letters("KNUK TATS"),
            ['K', 'N', 'U', 'K', 'T', 'A', 'T', 'S']
        );
    }

    #[test]
    fn test_letters_pad_short_text() {
        assert_eq!(
            tattoo_letters("HI"),
            ['H', 'I', ' ', ' ', ' ', ' ', ' ', ' ']
        );
        assert_eq!(tattoo_letters(""), [' '; LETTER_COUNT]);
    }

    #[test]
    fn test_letters_truncate_long_text() {
        assert_eq!(
            tattoo_letters("ABCD EFGH IJKL"),
            ['A', 'B', 'C', 'D', 'E', 'F', 'G', 'H']
        );
    }

    #[test]
    fn test_positions_are_left_to_right() {
        assert!(KNUCKLE_POSITIONS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_load_missing_template() {
        let config = TattooConfig {
            template: "/nonexistent/knuckles.png".to_string(),
            ..TattooConfig::default()
        };
        assert!(matches!(
            TattooRenderer::load(&config),
            Err(TattooError::Template { .. })
        ));
    }

    #[test]
    fn test_load_invalid_font() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("knuckles.png");
        RgbaImage::new(640, 240).save(&template).unwrap();
        let font = dir.path().join("font.ttf");
        std::fs::write(&font, b"not a font").unwrap();

        let config = TattooConfig {
            template: template.display().to_string(),
            font: font.display().to_string(),
            ..TattooConfig::default()
        };
        assert!(matches!(
            TattooRenderer::load(&config),
            Err(TattooError::Font { .. })
        ));
    }
}
