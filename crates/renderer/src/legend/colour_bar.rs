//! Colour bar graphics drawn next to legend labels.

use tiny_skia::Pixmap;

use crate::arrows::ArrowFieldRenderer;
use crate::canvas::FrameCanvas;
use crate::colour_scale::ColourScheme;
use crate::error::{RenderError, RenderResult};
use crate::raster::FieldGrid;

/// The graphic part of a legend.
#[derive(Debug, Clone)]
pub enum ColourBar {
    /// Continuous gradient over the scheme range, extended below and above
    /// by a fraction of the range to show the out-of-range colours.
    ScaleRange {
        scheme: ColourScheme,
        extra_low: f32,
        extra_high: f32,
    },
    /// One box per threshold interval.
    Threshold { scheme: ColourScheme },
    /// One arrow per magnitude threshold.
    ArrowThreshold { arrows: ArrowFieldRenderer },
}

impl ColourBar {
    pub fn create_image(&self, width: i32, height: i32) -> RenderResult<Pixmap> {
        if width <= 0 || height <= 0 {
            return Err(RenderError::InvalidDimensions {
                width: width.max(0) as u32,
                height: height.max(0) as u32,
            });
        }
        let (width, height) = (width as u32, height as u32);

        match self {
            ColourBar::ScaleRange {
                scheme,
                extra_low,
                extra_high,
            } => scale_range_image(scheme, *extra_low, *extra_high, width, height),
            ColourBar::Threshold { scheme } => threshold_image(scheme, width, height),
            ColourBar::ArrowThreshold { arrows } => arrow_threshold_image(arrows, width, height),
        }
    }
}

fn scale_range_image(
    scheme: &ColourScheme,
    extra_low: f32,
    extra_high: f32,
    width: u32,
    height: u32,
) -> RenderResult<Pixmap> {
    let low = scheme.scale_min();
    let high = scheme.scale_max();
    let range = high - low;
    let extended_low = low - extra_low * range;
    let extended_high = high + extra_high * range;

    let mut values = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let fraction = (height as f32 - y as f32 - 0.5) / height as f32;
        let value = extended_low + (extended_high - extended_low) * fraction;
        values.extend(std::iter::repeat(value).take(width as usize));
    }

    let grid = FieldGrid::new(width, height, values)?;
    crate::raster::render_field(&grid, scheme)
}

/// Entries of the threshold boxes, top to bottom.
pub fn threshold_bar_entries(thresholds: &[f32]) -> Vec<f32> {
    let mut sorted = thresholds.to_vec();
    sorted.sort_by(f32::total_cmp);

    let mut entries: Vec<f32> = sorted.iter().rev().copied().collect();
    if let Some(lowest) = sorted.first() {
        entries.push(lowest - 1.0);
    }
    entries
}

fn threshold_image(scheme: &ColourScheme, width: u32, height: u32) -> RenderResult<Pixmap> {
    let entries = threshold_bar_entries(scheme.thresholds().unwrap_or_default());
    if entries.is_empty() {
        return crate::raster::render_field(&FieldGrid::filled(width, height, f32::NAN)?, scheme);
    }

    let rows_per_threshold = height as f32 / entries.len() as f32;
    let mut values = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let index = ((y as f32 / rows_per_threshold) as usize).min(entries.len() - 1);
        values.extend(std::iter::repeat(entries[index]).take(width as usize));
    }

    let grid = FieldGrid::new(width, height, values)?;
    crate::raster::render_field(&grid, scheme)
}

/// Thresholds drawn by the arrow bar: the sorted thresholds plus one
/// overflow entry extrapolated from the last gap and capped at `scale_max`.
pub fn arrow_bar_thresholds(thresholds: &[f32], scale_max: f32) -> Vec<f32> {
    let mut sorted = thresholds.to_vec();
    sorted.sort_by(f32::total_cmp);

    let extra = match sorted.as_slice() {
        [.., second_last, last] => {
            let extrapolated = last + (last - second_last);
            if extrapolated > scale_max {
                scale_max
            } else {
                extrapolated
            }
        }
        _ => scale_max,
    };
    sorted.push(extra);
    sorted
}

fn arrow_threshold_image(arrows: &ArrowFieldRenderer, width: u32, height: u32) -> RenderResult<Pixmap> {
    let mut canvas = FrameCanvas::new(width, height)?;
    let thresholds = arrow_bar_thresholds(arrows.thresholds(), arrows.scale_max());

    let x = (width / 2) as f32;
    let box_height = height as i32 / thresholds.len() as i32;
    let mut y_pos = height as i32;
    for threshold in thresholds {
        let arrow_length = arrows.scaled_arrow_length(threshold);
        let y_offset = ((box_height as f32 - arrow_length) / 2.0).round() as i32;
        arrows.render_dynamic_arrow(&mut canvas, Some(threshold), 0.0, x, (y_pos - y_offset) as f32);
        y_pos -= box_height;
    }

    Ok(canvas.into_pixmap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_entries_descend_with_floor() {
        assert_eq!(threshold_bar_entries(&[10.0, 2.0, 5.0]), vec![10.0, 5.0, 2.0, 1.0]);
        assert!(threshold_bar_entries(&[]).is_empty());
    }

    #[test]
    fn test_arrow_overflow_threshold() {
        assert_eq!(arrow_bar_thresholds(&[0.5, 0.25], 2.0), vec![0.25, 0.5, 0.75]);
        assert_eq!(arrow_bar_thresholds(&[0.5, 1.5], 2.0), vec![0.5, 1.5, 2.0]);
        assert_eq!(arrow_bar_thresholds(&[0.5], 2.0), vec![0.5, 2.0]);
    }
}
