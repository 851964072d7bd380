//! Legend tick values, label strings and label positions.
//!
//! All label arithmetic is single precision so that label strings are
//! stable for a given configuration. Positions are measured in pixels from
//! the top of the colour bar.

use crate::canvas::{FrameCanvas, TextAlign};
use crate::text::{TextStyle, Typeface};

pub const DEFAULT_STEPS: usize = 4;
pub const DEFAULT_MAJOR_TICK_MARK_LENGTH: i32 = 6;
pub const DEFAULT_MINOR_TICK_MARK_LENGTH: i32 = 3;

/// How the tick values of a legend are derived.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelScale {
    Linear { low: f32, high: f32 },
    Logarithmic { low: f32, high: f32 },
    /// Colour scale cut values, one label per cut.
    Threshold(Vec<f32>),
    /// Arrow magnitude thresholds.
    ArrowThreshold(Vec<f32>),
}

/// Knobs shared by every label scale.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelOptions {
    pub steps: Option<usize>,
    pub precision: Option<i32>,
    pub multiplier: Option<f32>,
    pub offset: Option<f32>,
    pub major_tick_mark_length: Option<i32>,
    pub minor_tick_mark_length: Option<i32>,
    /// Fraction of the range drawn below the lowest label.
    pub extra_low: f32,
    /// Fraction of the range drawn above the highest label.
    pub extra_high: f32,
    pub hide_lower_label: bool,
    pub hide_higher_label: bool,
    /// Render scale applied to tick lengths.
    pub scale: f32,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            steps: None,
            precision: None,
            multiplier: None,
            offset: None,
            major_tick_mark_length: None,
            minor_tick_mark_length: None,
            extra_low: 0.0,
            extra_high: 0.0,
            hide_lower_label: false,
            hide_higher_label: false,
            scale: 1.0,
        }
    }
}

/// Fonts and spacing used to lay out and draw labels.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelText {
    pub title: Option<String>,
    pub title_style: TextStyle,
    pub label_style: TextStyle,
    pub label_padding: i32,
}

/// Computed labels of one legend.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendLabelSet {
    pub steps: usize,
    pub values: Vec<f32>,
    pub labels: Vec<String>,
    pub precision: i32,
    pub multiplier: Option<f32>,
    pub offset: Option<f32>,
    pub extra_low: f32,
    pub extra_high: f32,
    pub hide_lower_label: bool,
    pub hide_higher_label: bool,
    pub major_tick_mark_length: i32,
    pub minor_tick_mark_length: i32,
    pub positions: Vec<i32>,
    pub minor_tick_positions: Vec<i32>,
    title_lines: Vec<String>,
    title_line_height: i32,
    label_line_height: i32,
    width: i32,
    text: Option<LabelText>,
}

impl LegendLabelSet {
    /// Compute values and label strings for `scale`.
    ///
    /// Threshold scales always hide their synthetic first and last entries,
    /// never extend past the bar and have no minor tick marks.
    pub fn new(scale: &LabelScale, options: &LabelOptions) -> Self {
        let steps = match options.steps {
            Some(steps) if steps >= 2 => steps,
            _ => DEFAULT_STEPS,
        };

        let mut extra_low = options.extra_low;
        let mut extra_high = options.extra_high;
        let mut hide_lower_label = options.hide_lower_label;
        let mut hide_higher_label = options.hide_higher_label;
        let mut minor_length = options
            .minor_tick_mark_length
            .unwrap_or(DEFAULT_MINOR_TICK_MARK_LENGTH);

        let values = match scale {
            LabelScale::Linear { low, high } => {
                let low = apply_multiplier_and_offset(*low, options);
                let high = apply_multiplier_and_offset(*high, options);
                linear_values(low, high, steps)
            }
            LabelScale::Logarithmic { low, high } => {
                let low = apply_multiplier_and_offset(*low, options);
                let high = apply_multiplier_and_offset(*high, options);
                logarithmic_values(low, high, steps)
            }
            LabelScale::Threshold(cuts) | LabelScale::ArrowThreshold(cuts) => {
                extra_low = 0.0;
                extra_high = 0.0;
                hide_lower_label = true;
                hide_higher_label = true;
                minor_length = 0;

                let mut sorted = cuts.clone();
                sorted.sort_by(f32::total_cmp);
                let apply = matches!(scale, LabelScale::Threshold(_));

                let mut values = Vec::with_capacity(sorted.len() + 2);
                values.push(0.0);
                values.extend(sorted.into_iter().map(|cut| {
                    if apply {
                        apply_multiplier_and_offset(cut, options)
                    } else {
                        cut
                    }
                }));
                values.push(0.0);
                values
            }
        };

        let precision = options.precision.unwrap_or_else(|| auto_precision(&values));
        let labels = values.iter().map(|v| round(*v, precision)).collect();
        let major_length = options
            .major_tick_mark_length
            .unwrap_or(DEFAULT_MAJOR_TICK_MARK_LENGTH);

        Self {
            steps,
            values,
            labels,
            precision,
            multiplier: options.multiplier,
            offset: options.offset,
            extra_low,
            extra_high,
            hide_lower_label,
            hide_higher_label,
            major_tick_mark_length: (major_length as f32 * options.scale).round() as i32,
            minor_tick_mark_length: (minor_length as f32 * options.scale).round() as i32,
            positions: Vec::new(),
            minor_tick_positions: Vec::new(),
            title_lines: Vec::new(),
            title_line_height: 0,
            label_line_height: 0,
            width: 0,
            text: None,
        }
    }

    /// Position labels along a bar of `height` pixels and measure the width
    /// needed by labels and title.
    pub fn layout(&mut self, height: i32, text: LabelText, typeface: &Typeface) {
        self.positions = label_positions(height, self.extra_low, self.extra_high, self.labels.len());
        self.minor_tick_positions = minor_tick_positions(&self.positions);

        self.title_lines = text
            .title
            .as_deref()
            .map(|title| title.split('\n').map(str::to_string).collect())
            .unwrap_or_default();
        self.title_line_height = typeface.line_height(&text.title_style);
        self.label_line_height = typeface.line_height(&text.label_style);

        let widest_label = self
            .labels
            .iter()
            .map(|label| typeface.text_width(label, &text.label_style))
            .max()
            .unwrap_or(0);

        self.width = widest_label
            + 2 * text.label_padding
            + self.title_line_height * self.title_lines.len() as i32;
        self.text = Some(text);
    }

    /// Width of labels plus title; 0 before [`layout`](Self::layout).
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn title_lines(&self) -> &[String] {
        &self.title_lines
    }

    /// Draw tick marks, label strings and the rotated title with the left
    /// edge of the ticks at `offset_x`.
    pub fn draw(&self, canvas: &mut FrameCanvas, offset_x: i32, offset_y: i32, typeface: &Typeface) {
        let Some(text) = &self.text else {
            return;
        };
        let colour = text.label_style.colour;
        let text_height_offset = self.label_line_height / 3;

        let first = usize::from(self.hide_lower_label);
        let last = self
            .labels
            .len()
            .saturating_sub(usize::from(self.hide_higher_label));

        for i in first..last {
            let y = self.positions[i] + offset_y;
            if self.major_tick_mark_length > 0 {
                canvas.draw_line(
                    offset_x as f32,
                    y as f32,
                    (offset_x + self.major_tick_mark_length) as f32,
                    y as f32,
                    colour,
                    1.0,
                );
            }
            canvas.draw_text(
                &self.labels[i],
                text.label_padding + offset_x,
                y + text_height_offset,
                &text.label_style,
                TextAlign::Left,
                typeface,
            );
        }

        if self.minor_tick_mark_length > 0 {
            let first = usize::from(self.hide_lower_label);
            let last = self
                .minor_tick_positions
                .len()
                .saturating_sub(usize::from(self.hide_higher_label));
            for position in self.minor_tick_positions.iter().take(last).skip(first) {
                let y = (position + offset_y) as f32;
                canvas.draw_line(
                    offset_x as f32,
                    y,
                    (offset_x + self.minor_tick_mark_length) as f32,
                    y,
                    colour,
                    1.0,
                );
            }
        }

        // Title reads top to bottom along the right edge.
        let mut offset = self.title_line_height * 2 / 3;
        for line in &self.title_lines {
            canvas.draw_text_rotated(
                line,
                offset_x + self.width - offset,
                offset_y,
                &text.title_style,
                typeface,
            );
            offset += self.title_line_height;
        }
    }
}

fn apply_multiplier_and_offset(value: f32, options: &LabelOptions) -> f32 {
    let mut value = value;
    if let Some(multiplier) = options.multiplier {
        value *= multiplier;
    }
    if let Some(offset) = options.offset {
        value += offset;
    }
    value
}

pub fn linear_values(low: f32, high: f32, steps: usize) -> Vec<f32> {
    (0..steps)
        .map(|i| low + i as f32 * (high - low) / (steps as f32 - 1.0))
        .collect()
}

pub fn logarithmic_values(low: f32, high: f32, steps: usize) -> Vec<f32> {
    let log_low = low.log10();
    let log_high = high.log10();
    (0..steps)
        .map(|i| {
            let log_value = log_low + i as f32 * (log_high - log_low) / (steps as f32 - 1.0);
            10f64.powf(f64::from(log_value)) as f32
        })
        .collect()
}

/// Number of decimals needed to tell the labels of `values` apart.
pub fn auto_precision(values: &[f32]) -> i32 {
    let low = values.iter().copied().fold(f32::INFINITY, f32::min);
    let high = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let raw = (-f64::from(high - low).log10() + 2.0).ceil() as i32;
    raw.max(0)
}

/// Pixel rows of each label, from the bottom of the bar (`pos[0]`) to the
/// top (`pos[n-1]`).
pub fn label_positions(height: i32, extra_low: f32, extra_high: f32, count: usize) -> Vec<i32> {
    if count == 0 {
        return Vec::new();
    }

    let denominator = 1.0 + extra_low + extra_high;
    let low_offset = (height as f32 * extra_low / denominator) as i32;
    let high_offset = (height as f32 * extra_high / denominator) as i32;

    let low_pos = height - low_offset;
    let high_pos = high_offset;

    let mut positions = vec![0; count];
    positions[0] = low_pos;
    positions[count - 1] = high_pos;

    let space = (low_pos - high_pos) as f32 / (count as f32 - 1.0);
    for (i, position) in positions.iter_mut().enumerate().take(count - 1).skip(1) {
        let factor = (count - (i + 1)) as f32;
        *position = high_pos + (factor * space) as i32;
    }
    positions
}

/// Midpoints between consecutive label positions.
pub fn minor_tick_positions(positions: &[i32]) -> Vec<i32> {
    if positions.len() <= 1 {
        return Vec::new();
    }
    positions.windows(2).map(|pair| (pair[0] + pair[1]) / 2).collect()
}

/// Round `number` to `precision` decimals and format it without trailing
/// zeros.
///
/// Values outside the `i32` range are formatted unrounded; very small or
/// very large results use scientific notation such as `5.0E-4`.
pub fn round(number: f32, precision: i32) -> String {
    if number >= i32::MAX as f32 || number <= i32::MIN as f32 {
        return trim_meaningless_digits(float_to_string(number));
    }

    if precision <= 0 {
        return trim_meaningless_digits(round_half_up(number).to_string());
    }

    let shift = 10f64.powi(precision) as f32;
    let shifted = number * shift;
    if shifted >= i32::MAX as f32 || shifted <= i32::MIN as f32 {
        return trim_meaningless_digits(float_to_string(number));
    }

    trim_meaningless_digits(float_to_string(round_half_up(shifted) as f32 / shift))
}

fn round_half_up(value: f32) -> i32 {
    (value + 0.5).floor() as i32
}

/// Decimal rendering of a float that switches to `d.dddE±n` outside
/// `[1e-3, 1e7)` and always carries a fractional part.
pub fn float_to_string(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude < 1e-3 || magnitude >= 1e7 {
        let formatted = format!("{:e}", value);
        let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
        if mantissa.contains('.') {
            format!("{}E{}", mantissa, exponent)
        } else {
            format!("{}.0E{}", mantissa, exponent)
        }
    } else {
        let formatted = value.to_string();
        if formatted.contains('.') {
            formatted
        } else {
            format!("{}.0", formatted)
        }
    }
}

/// Strip trailing zeros and a bare decimal point from plain decimals.
/// Anything else, such as scientific notation, is returned as is.
fn trim_meaningless_digits(number: String) -> String {
    if !is_plain_decimal(&number) {
        return number;
    }
    number.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn is_plain_decimal(number: &str) -> bool {
    let unsigned = number.strip_prefix('-').unwrap_or(number);
    let Some((integer, fraction)) = unsigned.split_once('.') else {
        return false;
    };
    !integer.is_empty()
        && integer.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}
