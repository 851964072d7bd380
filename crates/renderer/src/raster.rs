//! Rasterising gridded fields through colour schemes.

use tiny_skia::{ColorU8, Pixmap};

use crate::color::Color;
use crate::colour_scale::ColourScheme;
use crate::error::{RenderError, RenderResult};

/// Row-major grid of values already sampled onto the output pixels.
/// Row 0 is the top (northernmost) row; missing values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGrid {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl FieldGrid {
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> RenderResult<Self> {
        if width == 0 || height == 0 || values.len() != (width as usize) * (height as usize) {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// A grid where every cell holds `value`.
    pub fn filled(width: u32, height: u32, value: f32) -> RenderResult<Self> {
        Self::new(width, height, vec![value; (width as usize) * (height as usize)])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Value at column `i`, row `j`; NaN outside the grid.
    pub fn get(&self, i: u32, j: u32) -> f32 {
        if i >= self.width || j >= self.height {
            return f32::NAN;
        }
        self.values[(j as usize) * (self.width as usize) + i as usize]
    }

    /// Smallest and largest finite values, if any.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

fn new_pixmap(width: u32, height: u32) -> RenderResult<Pixmap> {
    Pixmap::new(width, height).ok_or(RenderError::InvalidDimensions { width, height })
}

fn premultiplied(colour: Color) -> tiny_skia::PremultipliedColorU8 {
    ColorU8::from_rgba(colour.r, colour.g, colour.b, colour.a).premultiply()
}

/// Colour every cell of `grid` with `scheme`.
pub fn render_field(grid: &FieldGrid, scheme: &ColourScheme) -> RenderResult<Pixmap> {
    let mut pixmap = new_pixmap(grid.width, grid.height)?;
    for (pixel, value) in pixmap.pixels_mut().iter_mut().zip(grid.values.iter()) {
        *pixel = premultiplied(scheme.color_for(*value));
    }
    Ok(pixmap)
}

/// Additive blend of several fields, each coloured by its own scheme.
///
/// Channel sums are rescaled so the brightest combination of every
/// variable at its scale maximum just reaches 255. Alpha is averaged.
#[derive(Debug, Clone, Default)]
pub struct TrueColourComposite {
    schemes: Vec<(String, ColourScheme)>,
}

impl TrueColourComposite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, variable_id: impl Into<String>, scheme: ColourScheme) {
        self.schemes.push((variable_id.into(), scheme));
    }

    pub fn is_empty(&self) -> bool {
        self.schemes.is_empty()
    }

    fn colour_scaling(&self) -> f32 {
        let (mut red, mut green, mut blue) = (0u32, 0u32, 0u32);
        for (_, scheme) in &self.schemes {
            let max = scheme.color_for(scheme.scale_max());
            red += u32::from(max.r);
            green += u32::from(max.g);
            blue += u32::from(max.b);
        }
        red.max(green).max(blue) as f32 / 255.0
    }

    /// Blend `grids`, given in the order variables were added.
    pub fn render(&self, grids: &[FieldGrid]) -> RenderResult<Pixmap> {
        let Some(first) = grids.first() else {
            return Err(RenderError::InvalidDimensions {
                width: 0,
                height: 0,
            });
        };
        let (width, height) = (first.width, first.height);
        if grids
            .iter()
            .any(|grid| grid.width != width || grid.height != height)
        {
            return Err(RenderError::InvalidDimensions { width, height });
        }

        let count = (width as usize) * (height as usize);
        let mut sums = vec![[0u32; 4]; count];
        for ((_, scheme), grid) in self.schemes.iter().zip(grids) {
            for (sum, value) in sums.iter_mut().zip(grid.values.iter()) {
                let colour = scheme.color_for(*value);
                sum[0] += u32::from(colour.r);
                sum[1] += u32::from(colour.g);
                sum[2] += u32::from(colour.b);
                sum[3] += u32::from(colour.a);
            }
        }

        let scaling = self.colour_scaling();
        let variables = self.schemes.len().min(grids.len()).max(1) as f32;
        let channel = |sum: u32, divisor: f32| -> u8 {
            if divisor <= 0.0 {
                0
            } else {
                (sum as f32 / divisor).min(255.0) as u8
            }
        };

        let mut pixmap = new_pixmap(width, height)?;
        for (pixel, sum) in pixmap.pixels_mut().iter_mut().zip(sums) {
            let colour = Color::new(
                channel(sum[0], scaling),
                channel(sum[1], scaling),
                channel(sum[2], scaling),
                channel(sum[3], variables),
            );
            *pixel = premultiplied(colour);
        }
        Ok(pixmap)
    }
}
