//! Avatar render pipeline
//!
//! Fills a canvas with the background color, draws the label centered with
//! the shared font and encodes the result as PNG. Glyphs are rasterized with
//! swash and blended onto an `image::RgbaImage`.

use image::{ImageFormat, Pixel, Rgba, RgbaImage};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use swash::scale::image::{Content, Image as GlyphImage};
use swash::scale::{Render, ScaleContext, Source, StrikeWith};
use swash::zeno::{Format, Vector};

use super::font::AvatarFont;
use crate::config::defaults::{
    DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, DEFAULT_FONT_SIZE, DEFAULT_OFFSET_Y,
};
use crate::errors::{AppError, RenderError, RenderResult};

/// Largest accepted canvas side (and font size) in pixels
pub const MAX_CANVAS_DIMENSION: u32 = 4096;

/// Opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// A fresh pseudo-random opaque color
    pub fn random() -> Self {
        let mut rng = rand::rng();
        Self::rgb(rng.random(), rng.random(), rng.random())
    }

    fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parses `rrggbb` or `rgb`, with or without a leading `#`
impl FromStr for Color {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value.trim().trim_start_matches('#');
        let invalid = || AppError::validation(format!("Invalid hex color '{}'", value));

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());

        match hex.len() {
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

/// Parameters for a single avatar render
///
/// Unset (or zero) dimensions fall back to the defaults; unset colors are
/// picked at random on every render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderRequest {
    pub text: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub font_size: Option<u32>,
    pub text_color: Option<Color>,
    pub background_color: Option<Color>,
    pub offset_y: Option<i32>,
}

impl RenderRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn with_colors(mut self, text_color: Color, background_color: Color) -> Self {
        self.text_color = Some(text_color);
        self.background_color = Some(background_color);
        self
    }

    pub fn with_offset_y(mut self, offset_y: i32) -> Self {
        self.offset_y = Some(offset_y);
        self
    }
}

struct Resolved {
    width: u32,
    height: u32,
    font_size: u32,
    offset_y: i32,
    text_color: Color,
    background_color: Color,
}

impl Resolved {
    fn from_request(request: &RenderRequest) -> RenderResult<Self> {
        let positive = |value: Option<u32>, default: u32| value.filter(|v| *v > 0).unwrap_or(default);

        let resolved = Self {
            width: positive(request.width, DEFAULT_CANVAS_WIDTH),
            height: positive(request.height, DEFAULT_CANVAS_HEIGHT),
            font_size: positive(request.font_size, DEFAULT_FONT_SIZE),
            offset_y: request.offset_y.unwrap_or(DEFAULT_OFFSET_Y),
            text_color: request.text_color.unwrap_or_else(Color::random),
            background_color: request.background_color.unwrap_or_else(Color::random),
        };

        if resolved.width > MAX_CANVAS_DIMENSION
            || resolved.height > MAX_CANVAS_DIMENSION
            || resolved.font_size > MAX_CANVAS_DIMENSION
        {
            return Err(RenderError::InvalidCanvas {
                width: resolved.width,
                height: resolved.height,
                max: MAX_CANVAS_DIMENSION,
            });
        }

        if resolved.offset_y.unsigned_abs() > MAX_CANVAS_DIMENSION {
            return Err(RenderError::InvalidOffset {
                offset_y: resolved.offset_y,
                max: MAX_CANVAS_DIMENSION,
            });
        }

        Ok(resolved)
    }
}

/// Render `request` with `font` and return the PNG bytes
pub fn render(font: &AvatarFont, request: &RenderRequest) -> RenderResult<Vec<u8>> {
    let resolved = Resolved::from_request(request)?;

    let mut canvas = RgbaImage::from_pixel(
        resolved.width,
        resolved.height,
        resolved.background_color.to_rgba(),
    );
    draw_label(
        &mut canvas,
        font,
        &request.text,
        resolved.font_size,
        resolved.text_color,
        resolved.offset_y,
    );

    let mut png_bytes = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(png_bytes)
}

/// Width of `text` in pixels at `font_size`, summing glyph advances
pub fn measure_text(font: &AvatarFont, text: &str, font_size: f32) -> f32 {
    let font = font.font_ref();
    let charmap = font.charmap();
    let metrics = font.glyph_metrics(&[]).scale(font_size);
    text.chars()
        .map(|c| metrics.advance_width(charmap.map(c)))
        .sum()
}

/// Draw `text` horizontally centered, with its baseline box vertically
/// centered and shifted by `offset_y`
fn draw_label(
    canvas: &mut RgbaImage,
    font: &AvatarFont,
    text: &str,
    font_size: u32,
    color: Color,
    offset_y: i32,
) {
    let size = font_size as f32;
    let measured = measure_text(font, text, size).round() as i64;
    let font_size = i64::from(font_size);

    let x = (i64::from(canvas.width()) - measured) / 2;
    let y = (i64::from(canvas.height()) - font_size - i64::from(offset_y)) / 2;
    let baseline = y + font_size;

    let font = font.font_ref();
    let charmap = font.charmap();
    let metrics = font.glyph_metrics(&[]).scale(size);

    let mut context = ScaleContext::new();
    let mut scaler = context.builder(font).size(size).hint(true).build();

    let mut pen_x = x as f32;
    for ch in text.chars() {
        let glyph_id = charmap.map(ch);
        let origin = pen_x.floor();

        let glyph = Render::new(&[
            Source::ColorOutline(0),
            Source::ColorBitmap(StrikeWith::BestFit),
            Source::Outline,
        ])
        .format(Format::Alpha)
        .offset(Vector::new(pen_x - origin, 0.0))
        .render(&mut scaler, glyph_id);

        if let Some(glyph) = glyph {
            blit_glyph(canvas, &glyph, origin as i64, baseline, color);
        }

        pen_x += metrics.advance_width(glyph_id);
    }
}

/// Blend a rasterized glyph onto the canvas, clipping at the edges
fn blit_glyph(canvas: &mut RgbaImage, glyph: &GlyphImage, pen_x: i64, baseline: i64, color: Color) {
    let width = i64::from(glyph.placement.width);
    let height = i64::from(glyph.placement.height);
    let origin_x = pen_x + i64::from(glyph.placement.left);
    let origin_y = baseline - i64::from(glyph.placement.top);
    let (canvas_width, canvas_height) = (i64::from(canvas.width()), i64::from(canvas.height()));

    let bytes_per_pixel = match glyph.content {
        Content::Mask => 1,
        Content::Color => 4,
        Content::SubpixelMask => return,
    };

    for row in 0..height {
        let y = origin_y + row;
        if y < 0 || y >= canvas_height {
            continue;
        }
        for col in 0..width {
            let x = origin_x + col;
            if x < 0 || x >= canvas_width {
                continue;
            }

            let index = ((row * width + col) as usize) * bytes_per_pixel;
            let source = match glyph.content {
                Content::Mask => Rgba([color.r, color.g, color.b, glyph.data[index]]),
                _ => Rgba([
                    glyph.data[index],
                    glyph.data[index + 1],
                    glyph.data[index + 2],
                    glyph.data[index + 3],
                ]),
            };
            canvas.get_pixel_mut(x as u32, y as u32).blend(&source);
        }
    }
}
