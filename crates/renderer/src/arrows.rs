//! Direction/magnitude arrow fields.
//!
//! Arrows are placed on a regular pixel lattice derived from the arrow size
//! and drawn from small vector glyphs. Glyphs point along +x in their own
//! coordinate space; they are turned to face north, rotated to the data
//! direction (clockwise, 0 = north), scaled and moved into place.

use std::f64::consts::PI;
use std::str::FromStr;

use tiny_skia::{Path, PathBuilder, Transform};
use tracing::warn;

use crate::canvas::FrameCanvas;
use crate::color::Color;
use crate::colour_scale::ColourScheme;
use crate::error::RenderResult;
use crate::raster::FieldGrid;

pub const DEFAULT_ARROW_SIZE: i32 = 20;

/// Length of the line, triangle and stump glyphs in glyph units.
const VECTOR_LENGTH: f32 = 11.0;
/// Reference size of the dynamic glyph.
const DYNAMIC_ARROW_REFERENCE: f32 = 20.0;
/// Shaft length of the dynamic glyph at full magnitude.
const DYNAMIC_ARROW_LENGTH: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowStyle {
    Upstream,
    ThinArrow,
    FatArrow,
    TriArrow,
    WindBarbs,
    DynaFatArrow,
}

impl FromStr for ArrowStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "UPSTREAM" => Ok(ArrowStyle::Upstream),
            "THIN_ARROW" => Ok(ArrowStyle::ThinArrow),
            "FAT_ARROW" => Ok(ArrowStyle::FatArrow),
            "TRI_ARROW" => Ok(ArrowStyle::TriArrow),
            "WIND_BARBS" => Ok(ArrowStyle::WindBarbs),
            "DYNA_FAT_ARROW" => Ok(ArrowStyle::DynaFatArrow),
            other => Err(format!("unknown arrow style '{}'", other)),
        }
    }
}

/// Range used to normalise magnitudes into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnitudeDomain {
    pub min: f32,
    pub max: f32,
}

/// Renders arrow glyphs for a direction field and an optional magnitude
/// field.
#[derive(Debug, Clone)]
pub struct ArrowFieldRenderer {
    style: ArrowStyle,
    arrow_size: i32,
    colour: Color,
    background: Color,
    colour_scheme: Option<ColourScheme>,
    magnitude_domain: Option<MagnitudeDomain>,
    direction_turns: Option<f32>,
    north_angle: Option<f32>,
    thresholds: Vec<f32>,
    scale_max: f32,
    scale: f32,
}

impl ArrowFieldRenderer {
    /// Sizes below 1 (or missing) fall back to [`DEFAULT_ARROW_SIZE`].
    pub fn new(style: ArrowStyle, arrow_size: Option<i32>) -> Self {
        let arrow_size = match arrow_size {
            Some(size) if size >= 1 => size,
            other => {
                warn!(
                    arrow_size = ?other,
                    default = DEFAULT_ARROW_SIZE,
                    "Invalid arrow size, must be > 0. Using default"
                );
                DEFAULT_ARROW_SIZE
            }
        };

        Self {
            style,
            arrow_size,
            colour: Color::BLACK,
            background: Color::TRANSPARENT,
            colour_scheme: None,
            magnitude_domain: None,
            direction_turns: None,
            north_angle: None,
            thresholds: Vec::new(),
            scale_max: crate::colour_scale::DEFAULT_SCALE_MAX,
            scale: 1.0,
        }
    }

    pub fn with_colour(mut self, colour: Color) -> Self {
        self.colour = colour;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_colour_scheme(mut self, scheme: Option<ColourScheme>) -> Self {
        self.colour_scheme = scheme;
        self
    }

    pub fn with_magnitude_domain(mut self, domain: Option<MagnitudeDomain>) -> Self {
        self.magnitude_domain = domain;
        self
    }

    /// Units per full turn of the direction values (360 for degrees).
    pub fn with_direction_turns(mut self, turns: Option<f32>) -> Self {
        self.direction_turns = turns;
        self
    }

    pub fn with_north_angle(mut self, north_angle: Option<f32>) -> Self {
        self.north_angle = north_angle;
        self
    }

    /// Magnitude thresholds shown by the arrow legend, and the upper scale
    /// bound that caps the synthetic overflow entry.
    pub fn with_thresholds(mut self, thresholds: Vec<f32>, scale_max: f32) -> Self {
        self.thresholds = thresholds;
        self.scale_max = scale_max;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn style(&self) -> ArrowStyle {
        self.style
    }

    pub fn arrow_size(&self) -> i32 {
        self.arrow_size
    }

    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    pub fn scale_max(&self) -> f32 {
        self.scale_max
    }

    /// Magnitude mapped into `[0, 1]`; 1 without a domain or a magnitude.
    pub fn normalised_magnitude(&self, magnitude: Option<f32>) -> f32 {
        match (magnitude, self.magnitude_domain) {
            (Some(mag), Some(domain)) => ((mag - domain.min) / domain.max).clamp(0.0, 1.0),
            _ => 1.0,
        }
    }

    pub fn arrow_length(&self, magnitude: f32) -> f32 {
        DYNAMIC_ARROW_LENGTH * self.normalised_magnitude(Some(magnitude))
    }

    /// Arrow length in output pixels.
    pub fn scaled_arrow_length(&self, magnitude: f32) -> f32 {
        self.arrow_length(magnitude) * self.scale
    }

    /// Direction value converted to radians clockwise from north.
    pub fn normalised_radian_angle(&self, angle: f64) -> f64 {
        let mut degrees = angle;
        if let Some(turns) = self.direction_turns {
            if turns != 360.0 && turns != 0.0 {
                degrees = degrees * 360.0 / f64::from(turns);
            }
        }
        if let Some(north) = self.north_angle {
            if north != 0.0 {
                degrees -= f64::from(north);
            }
        }
        degrees * PI / 180.0
    }

    fn arrow_colour(&self, magnitude: Option<f32>) -> Option<Color> {
        match (&self.colour_scheme, magnitude) {
            (None, _) => Some(self.colour),
            (Some(scheme), Some(mag)) => Some(scheme.color_for(mag)),
            (Some(_), None) => None,
        }
    }

    /// Draw arrows for every lattice cell of the direction field.
    ///
    /// # Arguments
    /// * `direction` - Direction values, one per output pixel
    /// * `magnitude` - Optional magnitude values on the same grid
    ///
    /// # Returns
    /// A canvas the size of the direction grid holding only the arrows
    pub fn render(&self, direction: &FieldGrid, magnitude: Option<&FieldGrid>) -> RenderResult<FrameCanvas> {
        let width = direction.width();
        let height = direction.height();
        let mut canvas = FrameCanvas::new(width, height)?;
        canvas.fill(self.background);

        let x_pixels_per_arrow = pixels_per_arrow(width, self.arrow_size);
        let y_pixels_per_arrow = pixels_per_arrow(height, self.arrow_size);

        let mut x_loc = x_pixels_per_arrow / 2.0;
        let mut y_loc = y_pixels_per_arrow / 2.0;

        for j in 0..height {
            if y_loc > y_pixels_per_arrow {
                y_loc -= y_pixels_per_arrow;
                for i in 0..width {
                    if x_loc > x_pixels_per_arrow {
                        x_loc -= x_pixels_per_arrow;

                        let angle = direction.get(i, j);
                        let mag = magnitude.map(|m| m.get(i, j));
                        if !angle.is_nan() && !mag.is_some_and(f32::is_nan) {
                            let radians = self.normalised_radian_angle(f64::from(angle));
                            self.draw_arrow(&mut canvas, mag, radians, i as f32, j as f32);
                        }
                    }
                    x_loc += 1.0;
                }
            }
            y_loc += 1.0;
        }

        Ok(canvas)
    }

    fn draw_arrow(&self, canvas: &mut FrameCanvas, magnitude: Option<f32>, radians: f64, i: f32, j: f32) {
        let mag_arrow_size = self.arrow_size as f32 * self.normalised_magnitude(magnitude);

        match self.style {
            ArrowStyle::DynaFatArrow => {
                self.render_dynamic_arrow(canvas, magnitude, radians, i, j);
            }
            ArrowStyle::Upstream => {
                let i_end = f64::from(i) + f64::from(mag_arrow_size) * radians.sin();
                let j_end = f64::from(j) - f64::from(mag_arrow_size) * radians.cos();
                if let Some(dot) = PathBuilder::from_circle(i, j, 2.0) {
                    canvas.fill_path(&dot, self.colour, Transform::identity());
                }
                canvas.draw_line(i, j, i_end.round() as f32, j_end.round() as f32, self.colour, 1.0);
            }
            ArrowStyle::FatArrow => {
                if let Some(path) = stump_vector() {
                    render_vector(canvas, &path, radians, i, j, mag_arrow_size / VECTOR_LENGTH, self.colour);
                }
            }
            ArrowStyle::TriArrow => {
                if let Some(path) = triangle_vector() {
                    render_vector(canvas, &path, radians, i, j, mag_arrow_size / VECTOR_LENGTH, self.colour);
                }
            }
            ArrowStyle::ThinArrow | ArrowStyle::WindBarbs => {
                if let Some(path) = line_vector() {
                    let transform = vector_transform(radians, i, j, mag_arrow_size / VECTOR_LENGTH);
                    canvas.stroke_path(&path, self.colour, 1.0, transform);
                }
            }
        }
    }

    /// Draw one magnitude-sized fat arrow centred on its tail at `(i, j)`.
    ///
    /// Nothing is drawn when a colour scheme is configured but the magnitude
    /// is missing.
    pub fn render_dynamic_arrow(
        &self,
        canvas: &mut FrameCanvas,
        magnitude: Option<f32>,
        radians: f64,
        i: f32,
        j: f32,
    ) {
        let Some(colour) = self.arrow_colour(magnitude) else {
            return;
        };
        let length = DYNAMIC_ARROW_LENGTH * self.normalised_magnitude(magnitude);
        if let Some(path) = dynamic_arrow_vector(length) {
            let scale = self.arrow_size as f32 / DYNAMIC_ARROW_REFERENCE;
            render_vector(canvas, &path, radians, i, j, scale, colour);
        }
    }
}

/// Spacing between arrows so that a whole number of arrows, each two arrow
/// sizes wide, fits across `extent` pixels.
pub fn pixels_per_arrow(extent: u32, arrow_size: i32) -> f64 {
    let stride = (arrow_size.max(1) * 2) as u32;
    let arrows = (extent / stride).max(1);
    f64::from(extent) / f64::from(arrows)
}

fn vector_transform(radians: f64, i: f32, j: f32, scale: f32) -> Transform {
    Transform::from_rotate(-90.0)
        .post_rotate(radians.to_degrees() as f32)
        .post_scale(scale, scale)
        .post_translate(i, j)
}

fn render_vector(
    canvas: &mut FrameCanvas,
    path: &Path,
    radians: f64,
    i: f32,
    j: f32,
    scale: f32,
    colour: Color,
) {
    if !(scale > 0.0) {
        return;
    }
    let transform = vector_transform(radians, i, j, scale);
    canvas.fill_path(path, colour, transform);
    // Outline stays one device pixel wide whatever the glyph scale.
    if let Some(outline) = path.clone().transform(transform) {
        canvas.stroke_path(&outline, colour, 1.0, Transform::identity());
    }
}

fn closed_polygon(points: &[(f32, f32)]) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.0, first.1);
    for (x, y) in rest {
        pb.line_to(*x, *y);
    }
    pb.close();
    pb.finish()
}

/// Fat arrow whose shaft grows with `length`.
pub fn dynamic_arrow_vector(length: f32) -> Option<Path> {
    closed_polygon(&[
        (0.0, 1.0),
        (0.0, -1.0),
        (6.0 + length, -1.0),
        (length, -8.0),
        (12.0 + length, 0.0),
        (length, 8.0),
        (6.0 + length, 1.0),
    ])
}

fn stump_vector() -> Option<Path> {
    closed_polygon(&[
        (0.0, -1.0),
        (0.0, 1.0),
        (5.0, 1.0),
        (5.0, 3.0),
        (VECTOR_LENGTH, 0.0),
        (5.0, -3.0),
        (5.0, -1.0),
    ])
}

fn triangle_vector() -> Option<Path> {
    closed_polygon(&[(0.0, -3.0), (0.0, 3.0), (VECTOR_LENGTH, 0.0)])
}

fn line_vector() -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(0.0, 0.0);
    pb.line_to(VECTOR_LENGTH, 0.0);
    pb.move_to(8.0, -3.0);
    pb.line_to(VECTOR_LENGTH, 0.0);
    pb.line_to(8.0, 3.0);
    pb.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_parsing() {
        assert_eq!("DYNA_FAT_ARROW".parse::<ArrowStyle>(), Ok(ArrowStyle::DynaFatArrow));
        assert_eq!("thin-arrow".parse::<ArrowStyle>(), Ok(ArrowStyle::ThinArrow));
        assert!("curly".parse::<ArrowStyle>().is_err());
    }

    #[test]
    fn test_invalid_size_uses_default() {
        assert_eq!(ArrowFieldRenderer::new(ArrowStyle::FatArrow, Some(0)).arrow_size(), 20);
        assert_eq!(ArrowFieldRenderer::new(ArrowStyle::FatArrow, None).arrow_size(), 20);
        assert_eq!(ArrowFieldRenderer::new(ArrowStyle::FatArrow, Some(7)).arrow_size(), 7);
    }

    #[test]
    fn test_transform_points_north_at_zero() {
        let mut points = [tiny_skia::Point::from_xy(VECTOR_LENGTH, 0.0)];
        vector_transform(0.0, 50.0, 50.0, 1.0).map_points(&mut points);
        let tip = points[0];
        assert!((tip.x - 50.0).abs() < 1e-4);
        assert!((tip.y - 39.0).abs() < 1e-4);
    }
}
