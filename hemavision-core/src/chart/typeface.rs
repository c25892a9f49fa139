use std::path::Path;

use ab_glyph::FontArc;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};

/// DejaVu Sans, shipped with the crate so charts look the same on every host.
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// TrueType face used for chart text.
#[derive(Clone)]
pub struct Typeface(FontArc);

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Typeface")
    }
}

impl Typeface {
    pub fn bundled() -> Self {
        Self(FontArc::try_from_slice(BUNDLED_FONT).expect("Bundled chart font is invalid"))
    }

    /// `preferred` when it holds a usable font, the bundled face otherwise.
    pub fn discover(preferred: Option<&Path>) -> Self {
        let Some(path) = preferred else {
            return Self::bundled();
        };
        let font = std::fs::read(path)
            .map_err(|err| err.to_string())
            .and_then(|data| FontArc::try_from_vec(data).map_err(|err| err.to_string()));
        match font {
            Ok(font) => {
                tracing::debug!(path = %path.display(), "using chart font");
                Self(font)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unusable font, using bundled face");
                Self::bundled()
            }
        }
    }

    /// Width and height of `text` at `scale` pixels tall.
    pub fn measure(&self, text: &str, scale: f32) -> (u32, u32) {
        text_size(scale, &self.0, text)
    }

    pub fn draw(
        &self,
        canvas: &mut RgbImage,
        color: Rgb<u8>,
        x: i32,
        y: i32,
        scale: f32,
        text: &str,
    ) {
        draw_text_mut(canvas, color, x, y, scale, &self.0, text);
    }

    /// Draws `text` horizontally centered on `center_x`.
    pub fn draw_centered(
        &self,
        canvas: &mut RgbImage,
        color: Rgb<u8>,
        center_x: i32,
        y: i32,
        scale: f32,
        text: &str,
    ) {
        let (width, _) = self.measure(text, scale);
        self.draw(canvas, color, center_x - width as i32 / 2, y, scale, text);
    }
}

impl Default for Typeface {
    fn default() -> Self {
        Self::bundled()
    }
}
