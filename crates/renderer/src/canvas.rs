//! Frame canvas: a raster surface with clipping, named layers and text.

use tiny_skia::{
    FillRule, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};
use tracing::debug;

use crate::color::Color;
use crate::error::{RenderError, RenderResult};
use crate::text::{TextStyle, Typeface};

/// Horizontal alignment of text relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Centre,
    Right,
}

/// Build a paint for a solid colour.
pub fn solid_paint(colour: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(colour.r, colour.g, colour.b, colour.a);
    paint.anti_alias = true;
    paint
}

/// The surface a frame is drawn on.
pub struct FrameCanvas {
    pixmap: Pixmap,
    clip: Option<Mask>,
    layers: Vec<String>,
}

impl FrameCanvas {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap =
            Pixmap::new(width, height).ok_or(RenderError::InvalidDimensions { width, height })?;
        Ok(Self {
            pixmap,
            clip: None,
            layers: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Start a named group of drawing operations.
    pub fn create_layer(&mut self, name: impl Into<String>) {
        let name = name.into();
        debug!(layer = %name, "Canvas layer");
        self.layers.push(name);
    }

    pub fn layer_names(&self) -> &[String] {
        &self.layers
    }

    /// Restrict drawing to a rectangle until [`FrameCanvas::clear_clip`].
    pub fn set_clip(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let mut mask = match Mask::new(self.width(), self.height()) {
            Some(mask) => mask,
            None => return,
        };
        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) {
            let path = PathBuilder::from_rect(rect);
            mask.fill_path(&path, FillRule::Winding, false, Transform::identity());
        }
        self.clip = Some(mask);
    }

    pub fn clear_clip(&mut self) {
        self.clip = None;
    }

    pub fn fill(&mut self, colour: Color) {
        if self.clip.is_none() {
            self.pixmap.fill(colour.to_skia());
        } else {
            let (w, h) = (self.width() as i32, self.height() as i32);
            self.fill_rect(0, 0, w, h, colour);
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, colour: Color) {
        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) {
            let mut paint = solid_paint(colour);
            paint.anti_alias = false;
            self.pixmap
                .fill_rect(rect, &paint, Transform::identity(), self.clip.as_ref());
        }
    }

    /// Outline a rectangle with a stroke centred on its edges.
    pub fn stroke_rect(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        colour: Color,
        line_width: f32,
    ) {
        if line_width <= 0.0 {
            return;
        }
        if let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) {
            let path = PathBuilder::from_rect(rect);
            self.stroke_path(&path, colour, line_width, Transform::identity());
        }
    }

    pub fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, colour: Color, width: f32) {
        let mut pb = PathBuilder::new();
        pb.move_to(x0, y0);
        pb.line_to(x1, y1);
        if let Some(path) = pb.finish() {
            self.stroke_path(&path, colour, width, Transform::identity());
        }
    }

    pub fn fill_path(&mut self, path: &Path, colour: Color, transform: Transform) {
        self.pixmap.fill_path(
            path,
            &solid_paint(colour),
            FillRule::Winding,
            transform,
            self.clip.as_ref(),
        );
    }

    pub fn stroke_path(&mut self, path: &Path, colour: Color, width: f32, transform: Transform) {
        let stroke = Stroke {
            width,
            ..Default::default()
        };
        self.pixmap.stroke_path(
            path,
            &solid_paint(colour),
            &stroke,
            transform,
            self.clip.as_ref(),
        );
    }

    /// Composite another image with its top-left corner at `(x, y)`.
    pub fn draw_pixmap(&mut self, x: i32, y: i32, image: &Pixmap) {
        self.pixmap.draw_pixmap(
            x,
            y,
            image.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            self.clip.as_ref(),
        );
    }

    /// Composite an image through an arbitrary transform.
    pub fn draw_pixmap_transformed(&mut self, image: &Pixmap, transform: Transform) {
        self.pixmap.draw_pixmap(
            0,
            0,
            image.as_ref(),
            &PixmapPaint::default(),
            transform,
            self.clip.as_ref(),
        );
    }

    /// Draw one line of text with its baseline at `y`.
    pub fn draw_text(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        style: &TextStyle,
        align: TextAlign,
        typeface: &Typeface,
    ) {
        let Some(line) = typeface.render_line(text, style) else {
            return;
        };
        let width = typeface.text_width(text, style);
        let left = match align {
            TextAlign::Left => x,
            TextAlign::Centre => x - width / 2,
            TextAlign::Right => x - width,
        };
        let top = y - typeface.ascent(style).round() as i32;
        self.draw_pixmap(left, top, &line);
    }

    /// Draw text rotated 90 degrees clockwise, reading top to bottom.
    ///
    /// `(x, y)` is where the baseline starts; glyph tops face right.
    pub fn draw_text_rotated(
        &mut self,
        text: &str,
        x: i32,
        y: i32,
        style: &TextStyle,
        typeface: &Typeface,
    ) {
        let Some(line) = typeface.render_line(text, style) else {
            return;
        };
        let ascent = typeface.ascent(style);
        let transform = Transform::from_rotate(90.0).post_translate(x as f32 + ascent, y as f32);
        self.draw_pixmap_transformed(&line, transform);
    }

    /// Straight-alpha colour of a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let px = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::new(px.red(), px.green(), px.blue(), px.alpha()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_rect() {
        let mut canvas = FrameCanvas::new(20, 10).unwrap();
        canvas.fill(Color::WHITE);
        canvas.fill_rect(5, 2, 4, 4, Color::rgb(255, 0, 0));

        assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
        assert_eq!(canvas.pixel(6, 3), Some(Color::rgb(255, 0, 0)));
        assert_eq!(canvas.pixel(9, 3), Some(Color::WHITE));
    }

    #[test]
    fn test_clip_restricts_drawing() {
        let mut canvas = FrameCanvas::new(20, 20).unwrap();
        canvas.set_clip(0, 0, 10, 20);
        canvas.fill(Color::BLACK);
        canvas.clear_clip();

        assert_eq!(canvas.pixel(5, 5), Some(Color::BLACK));
        assert_eq!(canvas.pixel(15, 5).map(|c| c.a), Some(0));
    }

    #[test]
    fn test_draw_pixmap_offset() {
        let mut canvas = FrameCanvas::new(10, 10).unwrap();
        let mut image = Pixmap::new(2, 2).unwrap();
        image.fill(Color::rgb(0, 0, 255).to_skia());
        canvas.draw_pixmap(3, 4, &image);

        assert_eq!(canvas.pixel(3, 4), Some(Color::rgb(0, 0, 255)));
        assert_eq!(canvas.pixel(2, 4).map(|c| c.a), Some(0));
    }

    #[test]
    fn test_zero_size_canvas_is_an_error() {
        assert!(FrameCanvas::new(0, 10).is_err());
    }

    #[test]
    fn test_text_without_font_is_noop() {
        let mut canvas = FrameCanvas::new(10, 10).unwrap();
        let style = TextStyle::new(12.0, Color::BLACK);
        canvas.draw_text("DATA", 5, 5, &style, TextAlign::Centre, &Typeface::none());
        assert_eq!(canvas.pixel(5, 4).map(|c| c.a), Some(0));
    }
}
