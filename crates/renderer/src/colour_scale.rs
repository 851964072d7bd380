//! Colour schemes mapping data values to colours.
//!
//! Two flavours exist: a continuous [`SegmentScheme`] that splits a value
//! range into evenly sized colour bands, and a [`ThresholdScheme`] that
//! assigns one colour per interval between sorted cut values.

use frame_common::VariableConfig;

use crate::color::{parse_or, Color};
use crate::palette::Palette;

pub const DEFAULT_SCALE_MIN: f32 = -50.0;
pub const DEFAULT_SCALE_MAX: f32 = 50.0;
pub const DEFAULT_BAND_COUNT: usize = 250;

/// Relative width under which a scale range is considered degenerate.
pub const FLOAT_MANTISSA: f32 = 1e-6;

/// Absolute part of the degenerate-range nudge.
pub const DATA_EPSILON: f32 = f32::MIN_POSITIVE * 100.0;

/// Ordered `(min, max)` scale range for a variable, widened when it has no
/// usable width.
pub fn scale_range(min: Option<f32>, max: Option<f32>) -> (f32, f32) {
    let raw_min = min.unwrap_or(DEFAULT_SCALE_MIN);
    let raw_max = max.unwrap_or(DEFAULT_SCALE_MAX);

    let lo = raw_min.min(raw_max);
    let mut hi = raw_min.max(raw_max);

    let range = hi - lo;
    let absolute_max = hi.abs().max(lo.abs());
    if range == 0.0 || range / absolute_max <= FLOAT_MANTISSA {
        hi += FLOAT_MANTISSA * absolute_max + DATA_EPSILON;
    }

    (lo, hi)
}

/// Continuous scheme over `[min, max]` split into `band_count` colours.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentScheme {
    pub min: f32,
    pub max: f32,
    pub logarithmic: bool,
    pub bands: Vec<Color>,
    pub below_min: Color,
    pub above_max: Color,
    pub no_data: Color,
}

impl SegmentScheme {
    pub fn new(min: f32, max: f32, logarithmic: bool, palette: &Palette, band_count: usize) -> Self {
        let bands = palette.sample_n(band_count.max(1));
        let below_min = bands[0];
        let above_max = bands[bands.len() - 1];
        Self {
            min,
            max,
            logarithmic,
            bands,
            below_min,
            above_max,
            no_data: Color::TRANSPARENT,
        }
    }

    fn fraction(&self, value: f32) -> f32 {
        if self.logarithmic {
            let lo = self.min.log10();
            let hi = self.max.log10();
            (value.log10() - lo) / (hi - lo)
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }

    pub fn color_for(&self, value: f32) -> Color {
        if value.is_nan() || (self.logarithmic && value <= 0.0) {
            return self.no_data;
        }
        if value < self.min {
            return self.below_min;
        }
        if value > self.max {
            return self.above_max;
        }

        let fraction = self.fraction(value);
        if !fraction.is_finite() {
            return self.no_data;
        }
        let last = self.bands.len() - 1;
        let index = ((fraction * self.bands.len() as f32).floor() as usize).min(last);
        self.bands[index]
    }
}

/// One colour per interval between sorted cut values.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdScheme {
    pub thresholds: Vec<f32>,
    pub bands: Vec<Color>,
    pub no_data: Color,
}

impl ThresholdScheme {
    /// Cuts are sorted ascending; `band_count` colours are sampled from the
    /// palette.
    pub fn new(thresholds: &[f32], palette: &Palette, band_count: usize) -> Self {
        let mut sorted = thresholds.to_vec();
        sorted.sort_by(f32::total_cmp);

        let bands = if band_count <= 1 {
            vec![palette.sample(0.0)]
        } else {
            let step = 1.0 / (band_count as f32 - 1.0);
            (0..band_count).map(|i| palette.sample(step * i as f32)).collect()
        };

        Self {
            thresholds: sorted,
            bands,
            no_data: Color::TRANSPARENT,
        }
    }

    /// Band `k` holds values between cut `k-1` and cut `k`; values below
    /// the first cut take band 0.
    pub fn color_for(&self, value: f32) -> Color {
        if value.is_nan() {
            return self.no_data;
        }
        let index = self.thresholds.partition_point(|cut| *cut <= value);
        self.bands[index.min(self.bands.len() - 1)]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColourScheme {
    Segment(SegmentScheme),
    Threshold(ThresholdScheme),
}

impl ColourScheme {
    /// Build the scheme described by a variable's styling.
    ///
    /// Thresholds are used only when both cut values and a colour band count
    /// are configured; everything else gets a continuous scheme.
    pub fn from_variable(variable: &VariableConfig, palette: &Palette) -> Self {
        if let (Some(thresholds), Some(band_count)) =
            (&variable.thresholds, variable.colour_band_colour_count)
        {
            return ColourScheme::Threshold(ThresholdScheme::new(thresholds, palette, band_count));
        }

        let (lo, hi) = scale_range(variable.scale_min, variable.scale_max);
        let band_count = variable
            .band_count
            .or(variable.colour_band_colour_count)
            .filter(|count| *count > 0)
            .unwrap_or(DEFAULT_BAND_COUNT);

        let mut scheme = SegmentScheme::new(lo, hi, variable.logarithmic, palette, band_count);
        scheme.below_min = parse_or(variable.below_min_colour.as_deref(), scheme.below_min);
        scheme.above_max = parse_or(variable.above_max_colour.as_deref(), scheme.above_max);
        scheme.no_data = parse_or(variable.no_data_colour.as_deref(), scheme.no_data);
        ColourScheme::Segment(scheme)
    }

    pub fn color_for(&self, value: f32) -> Color {
        match self {
            ColourScheme::Segment(scheme) => scheme.color_for(value),
            ColourScheme::Threshold(scheme) => scheme.color_for(value),
        }
    }

    /// The same scheme with logarithmic mapping switched off.
    pub fn to_linear(&self) -> ColourScheme {
        match self {
            ColourScheme::Segment(scheme) => ColourScheme::Segment(SegmentScheme {
                logarithmic: false,
                ..scheme.clone()
            }),
            threshold => threshold.clone(),
        }
    }

    pub fn is_logarithmic(&self) -> bool {
        matches!(self, ColourScheme::Segment(scheme) if scheme.logarithmic)
    }

    pub fn thresholds(&self) -> Option<&[f32]> {
        match self {
            ColourScheme::Threshold(scheme) => Some(&scheme.thresholds),
            ColourScheme::Segment(_) => None,
        }
    }

    /// Lower bound of the value range; the first cut for threshold schemes.
    pub fn scale_min(&self) -> f32 {
        match self {
            ColourScheme::Segment(scheme) => scheme.min,
            ColourScheme::Threshold(scheme) => scheme.thresholds.first().copied().unwrap_or(0.0),
        }
    }

    /// Upper bound of the value range; the last cut for threshold schemes.
    pub fn scale_max(&self) -> f32 {
        match self {
            ColourScheme::Segment(scheme) => scheme.max,
            ColourScheme::Threshold(scheme) => scheme.thresholds.last().copied().unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_range_defaults_and_swap() {
        assert_eq!(scale_range(None, None), (-50.0, 50.0));
        assert_eq!(scale_range(Some(10.0), Some(-2.0)), (-2.0, 10.0));
    }

    #[test]
    fn test_scale_range_nudges_zero_width() {
        let (lo, hi) = scale_range(Some(4.0), Some(4.0));
        assert_eq!(lo, 4.0);
        assert!(hi > lo);

        let (lo, hi) = scale_range(Some(0.0), Some(0.0));
        assert_eq!(lo, 0.0);
        assert_eq!(hi, DATA_EPSILON);
    }

    #[test]
    fn test_segment_edges() {
        let palette = Palette::from_hex_list(&["#000000", "#FFFFFF"]).unwrap();
        let scheme = SegmentScheme::new(0.0, 10.0, false, &palette, 10);
        assert_eq!(scheme.color_for(0.0), Color::rgb(0, 0, 0));
        assert_eq!(scheme.color_for(10.0), Color::rgb(255, 255, 255));
        assert_eq!(scheme.color_for(f32::NAN), Color::TRANSPARENT);
    }

    #[test]
    fn test_threshold_band_lookup() {
        let palette = Palette::from_hex_list(&["#FF0000", "#00FF00", "#0000FF"]).unwrap();
        let scheme = ThresholdScheme::new(&[5.0, 1.0], &palette, 3);
        assert_eq!(scheme.thresholds, vec![1.0, 5.0]);
        assert_eq!(scheme.color_for(0.0), Color::rgb(255, 0, 0));
        assert_eq!(scheme.color_for(1.0), Color::rgb(0, 255, 0));
        assert_eq!(scheme.color_for(4.9), Color::rgb(0, 255, 0));
        assert_eq!(scheme.color_for(5.0), Color::rgb(0, 0, 255));
        assert_eq!(scheme.color_for(99.0), Color::rgb(0, 0, 255));
    }
}
