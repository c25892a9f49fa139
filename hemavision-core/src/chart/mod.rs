use std::io::Cursor;

use base64::{prelude::BASE64_STANDARD, Engine};
use bon::bon;
use hemavision_types::{format_percent, prelude::*};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut},
    rect::Rect,
};
use strum::EnumCount;
use thiserror::Error;

pub use typeface::Typeface;

#[path = "html-export.rs"]
pub mod html_export;
pub mod typeface;

pub const CHART_TITLE: &str = "Blood Cell Classification Confidence";

/// One bar color per cell type, in label order.
pub const BAR_COLORS: [Rgb<u8>; CellType::COUNT] = [
    Rgb([0xFF, 0x6B, 0x6B]),
    Rgb([0x4E, 0xCD, 0xC4]),
    Rgb([0x45, 0xB7, 0xD1]),
    Rgb([0xFF, 0xA0, 0x7A]),
];

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([222, 222, 222]);
const BAR_ALPHA: f32 = 0.8;

const MARGIN_LEFT: u32 = 80;
const MARGIN_RIGHT: u32 = 30;
const MARGIN_TOP: u32 = 80;
const MARGIN_BOTTOM: u32 = 90;
const GRID_STEPS: u32 = 5;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("canvas {width}x{height} is too small for the chart")]
    CanvasTooSmall { width: u32, height: u32 },
    #[error("failed to encode chart")]
    Encode(#[from] image::ImageError),
}

/// Renders a probability distribution as a bar chart with the y axis fixed to `[0, 1]`.
#[derive(Debug)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    typeface: Typeface,
}

#[bon]
impl ChartRenderer {
    #[builder]
    pub fn new(width: Option<u32>, height: Option<u32>, typeface: Option<Typeface>) -> Self {
        Self {
            width: width.unwrap_or(800),
            height: height.unwrap_or(600),
            typeface: typeface.unwrap_or_default(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn render(&self, probabilities: &Probabilities) -> Result<RgbImage, ChartError> {
        let too_small = || ChartError::CanvasTooSmall {
            width: self.width,
            height: self.height,
        };
        let plot_width = self
            .width
            .checked_sub(MARGIN_LEFT + MARGIN_RIGHT)
            .filter(|w| *w >= 4 * CellType::COUNT as u32)
            .ok_or_else(too_small)?;
        let plot_height = self
            .height
            .checked_sub(MARGIN_TOP + MARGIN_BOTTOM)
            .filter(|h| *h >= GRID_STEPS * 4)
            .ok_or_else(too_small)?;

        let mut canvas = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let face = &self.typeface;
        let left = MARGIN_LEFT as f32;
        let right = (MARGIN_LEFT + plot_width) as f32;
        let bottom = (MARGIN_TOP + plot_height) as f32;
        let y_for = |value: f32| bottom - value * plot_height as f32;

        face.draw_centered(
            &mut canvas,
            INK,
            self.width as i32 / 2,
            24,
            18.0,
            CHART_TITLE,
        );
        face.draw(&mut canvas, INK, 12, MARGIN_TOP as i32 - 34, 12.0, "Confidence");

        for step in 0..=GRID_STEPS {
            let value = step as f32 / GRID_STEPS as f32;
            let y = y_for(value);
            draw_line_segment_mut(&mut canvas, (left, y), (right, y), GRID);
            let label = format!("{value:.1}");
            let (label_width, label_height) = face.measure(&label, 12.0);
            face.draw(
                &mut canvas,
                INK,
                MARGIN_LEFT as i32 - 10 - label_width as i32,
                y as i32 - label_height as i32 / 2,
                12.0,
                &label,
            );
        }

        let slot = plot_width / CellType::COUNT as u32;
        let bar_width = (slot * 3 / 5).max(1);
        for ((cell, score), color) in probabilities.iter().zip(BAR_COLORS) {
            let slot_left = MARGIN_LEFT + slot * cell.index() as u32;
            let center = (slot_left + slot / 2) as i32;
            let bar_height = (score.clamp(0.0, 1.0) * plot_height as f32).round() as u32;
            let top = bottom as i32 - bar_height as i32;

            if bar_height > 0 {
                let bar = Rect::at(slot_left as i32 + (slot - bar_width) as i32 / 2, top)
                    .of_size(bar_width, bar_height);
                draw_filled_rect_mut(&mut canvas, bar, blend(color));
                draw_hollow_rect_mut(&mut canvas, bar, INK);
                if bar_width > 2 && bar_height > 2 {
                    let inner = Rect::at(bar.left() + 1, bar.top() + 1)
                        .of_size(bar_width - 2, bar_height - 2);
                    draw_hollow_rect_mut(&mut canvas, inner, INK);
                }
            }

            let value_label = format_percent(score, 1);
            let (_, value_height) = face.measure(&value_label, 14.0);
            face.draw_centered(
                &mut canvas,
                INK,
                center,
                top - value_height as i32 - 6,
                14.0,
                &value_label,
            );
            face.draw_centered(
                &mut canvas,
                INK,
                center,
                bottom as i32 + 14,
                14.0,
                cell.as_ref(),
            );
        }

        draw_line_segment_mut(&mut canvas, (left, MARGIN_TOP as f32), (left, bottom), INK);
        draw_line_segment_mut(&mut canvas, (left, bottom), (right, bottom), INK);
        Ok(canvas)
    }

    pub fn render_png(&self, probabilities: &Probabilities) -> Result<Vec<u8>, ChartError> {
        let chart = self.render(probabilities)?;
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(chart).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// PNG chart as a `data:image/png;base64,...` URI ready to inline in HTML.
    pub fn render_data_uri(&self, probabilities: &Probabilities) -> Result<String, ChartError> {
        let png = self.render_png(probabilities)?;
        Ok(format!("data:image/png;base64,{}", BASE64_STANDARD.encode(png)))
    }
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Bar color over a white background at [`BAR_ALPHA`].
fn blend(color: Rgb<u8>) -> Rgb<u8> {
    Rgb(color
        .0
        .map(|c| (c as f32 * BAR_ALPHA + 255.0 * (1.0 - BAR_ALPHA)).round() as u8))
}
