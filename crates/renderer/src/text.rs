//! Text measurement and rasterisation with TrueType fonts.
//!
//! Fonts are loaded at runtime. A [`Typeface`] without fonts still answers
//! metric queries with estimates so layouts stay stable, but draws nothing.

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use tiny_skia::{ColorU8, Pixmap};

use crate::color::Color;
use crate::error::{RenderError, RenderResult};

/// Average advance of a glyph relative to the font size, used without a font.
const ESTIMATED_ADVANCE: f32 = 0.6;
/// Line height relative to the font size, used without a font.
const ESTIMATED_LINE_HEIGHT: f32 = 1.15;
/// Ascent relative to the font size, used without a font.
const ESTIMATED_ASCENT: f32 = 0.9;

/// Size, weight and colour of a run of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub colour: Color,
}

impl TextStyle {
    pub fn new(size: f32, colour: Color) -> Self {
        Self {
            size,
            bold: false,
            colour,
        }
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }
}

/// Regular and bold fonts.
#[derive(Clone, Default)]
pub struct Typeface {
    regular: Option<Font<'static>>,
    bold: Option<Font<'static>>,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface")
            .field("regular", &self.regular.is_some())
            .field("bold", &self.bold.is_some())
            .finish()
    }
}

impl Typeface {
    /// A typeface with no fonts: metrics are estimated, text is not drawn.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_bytes(regular: Vec<u8>, bold: Option<Vec<u8>>) -> RenderResult<Self> {
        let regular = Font::try_from_vec(regular)
            .ok_or_else(|| RenderError::InvalidFont("cannot parse regular font".into()))?;
        let bold = match bold {
            Some(bytes) => Some(
                Font::try_from_vec(bytes)
                    .ok_or_else(|| RenderError::InvalidFont("cannot parse bold font".into()))?,
            ),
            None => None,
        };
        Ok(Self {
            regular: Some(regular),
            bold,
        })
    }

    /// Load fonts from disk. Missing paths give a font-less typeface.
    pub fn load(regular: Option<&Path>, bold: Option<&Path>) -> RenderResult<Self> {
        let Some(regular) = regular else {
            tracing::warn!("No font configured, text will not be rendered");
            return Ok(Self::none());
        };
        let regular_bytes = std::fs::read(regular)?;
        let bold_bytes = match bold {
            Some(path) => Some(std::fs::read(path)?),
            None => None,
        };
        Self::from_bytes(regular_bytes, bold_bytes)
    }

    pub fn has_font(&self) -> bool {
        self.regular.is_some()
    }

    fn font(&self, bold: bool) -> Option<&Font<'static>> {
        if bold {
            self.bold.as_ref().or(self.regular.as_ref())
        } else {
            self.regular.as_ref()
        }
    }

    /// Distance between two baselines.
    pub fn line_height(&self, style: &TextStyle) -> i32 {
        match self.font(style.bold) {
            Some(font) => {
                let v = font.v_metrics(Scale::uniform(style.size));
                (v.ascent - v.descent + v.line_gap).ceil() as i32
            }
            None => (style.size * ESTIMATED_LINE_HEIGHT).round() as i32,
        }
    }

    pub fn ascent(&self, style: &TextStyle) -> f32 {
        match self.font(style.bold) {
            Some(font) => font.v_metrics(Scale::uniform(style.size)).ascent,
            None => style.size * ESTIMATED_ASCENT,
        }
    }

    /// Advance width of a single line.
    pub fn text_width(&self, text: &str, style: &TextStyle) -> i32 {
        match self.font(style.bold) {
            Some(font) => text_size(Scale::uniform(style.size), font, text).0,
            None => (text.chars().count() as f32 * style.size * ESTIMATED_ADVANCE).round() as i32,
        }
    }

    /// Rasterise one line into a tightly sized pixmap whose baseline sits at
    /// [`Typeface::ascent`]. Returns `None` without a font or for empty text.
    pub fn render_line(&self, text: &str, style: &TextStyle) -> Option<Pixmap> {
        let font = self.font(style.bold)?;
        let width = self.text_width(text, style).max(0) as u32 + 2;
        let height = self.line_height(style).max(1) as u32;
        if text.is_empty() {
            return None;
        }

        let c = style.colour;
        // Transparent pixels in the text colour, so coverage blending only
        // touches alpha.
        let mut image = RgbaImage::from_pixel(width, height, Rgba([c.r, c.g, c.b, 0]));
        draw_text_mut(
            &mut image,
            c.to_rgba(),
            0,
            0,
            Scale::uniform(style.size),
            font,
            text,
        );
        rgba_to_pixmap(&image)
    }
}

/// Convert a straight-alpha image to a premultiplied pixmap.
pub fn rgba_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}
