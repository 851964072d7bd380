//! Colour-scale legends: a colour bar with ticks, labels and a rotated
//! title, placed inside a panel.

pub mod colour_bar;
pub mod labels;

use frame_common::{scale_px, LegendConfig, PaddingConfig};
use tiny_skia::Pixmap;
use tracing::debug;

use crate::canvas::FrameCanvas;
use crate::color::{parse_or, Color};
use crate::colour_scale::ColourScheme;
use crate::error::RenderResult;
use crate::text::{TextStyle, Typeface};

pub use colour_bar::ColourBar;
pub use labels::{LabelOptions, LabelScale, LabelText, LegendLabelSet};

/// Fraction of the colour bar added below the minimum and above the maximum.
pub const EXTRA_AMOUNT_OUT_OF_RANGE: f32 = 0.1;

const DEFAULT_TEXT_COLOUR: Color = Color::BLACK;
const DEFAULT_BACKGROUND_COLOUR: Color = Color::WHITE;
const DEFAULT_TITLE_FONT_SIZE: i32 = 16;
const DEFAULT_LABEL_FONT_SIZE: i32 = 14;
const DEFAULT_LABEL_PADDING: i32 = 8;
const DEFAULT_COLOUR_BAND_WIDTH: i32 = 20;
const DEFAULT_COLOUR_BAND_HEIGHT: i32 = 300;
const DEFAULT_COLOUR_BAND_BORDER: f32 = 1.0;
const DEFAULT_PADDING: i32 = 5;

/// What a legend shows, before layout.
#[derive(Debug, Clone)]
pub struct LegendContent {
    pub colour_bar: ColourBar,
    pub label_scale: LabelScale,
    /// Title text, one line per `'\n'`.
    pub title: String,
}

impl LegendContent {
    /// Legend for a raster colour scheme.
    ///
    /// Logarithmic schemes keep logarithmic labels but the bar itself is
    /// drawn linearly.
    pub fn for_scheme(scheme: &ColourScheme, title: String) -> Self {
        match scheme {
            ColourScheme::Threshold(threshold) => Self {
                colour_bar: ColourBar::Threshold {
                    scheme: scheme.clone(),
                },
                label_scale: LabelScale::Threshold(threshold.thresholds.clone()),
                title,
            },
            ColourScheme::Segment(segment) => {
                let label_scale = if segment.logarithmic {
                    LabelScale::Logarithmic {
                        low: segment.min,
                        high: segment.max,
                    }
                } else {
                    LabelScale::Linear {
                        low: segment.min,
                        high: segment.max,
                    }
                };
                Self {
                    colour_bar: ColourBar::ScaleRange {
                        scheme: scheme.to_linear(),
                        extra_low: EXTRA_AMOUNT_OUT_OF_RANGE,
                        extra_high: EXTRA_AMOUNT_OUT_OF_RANGE,
                    },
                    label_scale,
                    title,
                }
            }
        }
    }
}

/// Title lines of a legend: configured lines first, then `label (units)`.
pub fn legend_title(configured: &[String], label: &str, units: Option<&str>) -> String {
    let mut lines: Vec<String> = configured.to_vec();
    let mut default_title = label.to_string();
    if let Some(units) = units.filter(|u| !u.is_empty()) {
        default_title.push_str(&format!(" ({})", units));
    }
    lines.push(default_title);
    lines.join("\n")
}

/// A laid-out legend ready to be drawn.
#[derive(Debug, Clone)]
pub struct LegendRenderer {
    colour_bar_image: Pixmap,
    labels: LegendLabelSet,
    background: Color,
    label_colour: Color,
    padding: PaddingConfig,
    colour_band_width: i32,
    border_width: f32,
    pos_x: i32,
    pos_y: i32,
    width: i32,
    height: i32,
}

impl LegendRenderer {
    /// Lay out a legend inside a panel.
    ///
    /// # Arguments
    /// * `content` - Colour bar, label scale and title
    /// * `config` - Legend styling; missing fields use the defaults
    /// * `scale` - Render scale applied to every size
    /// * `panel_size` - Panel width and height, for right/bottom placement
    /// * `panel_offset` - Top-left corner of the panel on the canvas
    pub fn prepare(
        content: LegendContent,
        config: &LegendConfig,
        scale: f32,
        panel_size: (i32, i32),
        panel_offset: (i32, i32),
        typeface: &Typeface,
    ) -> RenderResult<Self> {
        let raw_padding = config
            .padding
            .unwrap_or_else(|| PaddingConfig::uniform(DEFAULT_PADDING));
        let padding = PaddingConfig {
            top: scale_px(raw_padding.top, scale),
            bottom: scale_px(raw_padding.bottom, scale),
            left: scale_px(raw_padding.left, scale),
            right: scale_px(raw_padding.right, scale),
        };

        let colour_band_width = scale_px(
            config.colour_band_width.unwrap_or(DEFAULT_COLOUR_BAND_WIDTH),
            scale,
        );
        let colour_band_height = scale_px(
            config.colour_band_height.unwrap_or(DEFAULT_COLOUR_BAND_HEIGHT),
            scale,
        );

        let background = parse_or(config.background_colour.as_deref(), DEFAULT_BACKGROUND_COLOUR);
        let label_colour = parse_or(config.label_colour.as_deref(), DEFAULT_TEXT_COLOUR);

        let title_config = config.title.as_ref();
        let title_colour = parse_or(
            title_config.and_then(|t| t.font_colour.as_deref()),
            DEFAULT_TEXT_COLOUR,
        );
        let title_size = scale_px(
            title_config
                .and_then(|t| t.font_size)
                .unwrap_or(DEFAULT_TITLE_FONT_SIZE),
            scale,
        );
        let title_hidden = title_config.map(|t| t.hidden).unwrap_or(false);
        let label_size = scale_px(config.label_font_size.unwrap_or(DEFAULT_LABEL_FONT_SIZE), scale);
        let label_padding = scale_px(config.label_padding.unwrap_or(DEFAULT_LABEL_PADDING), scale);

        let colour_bar_image = content
            .colour_bar
            .create_image(colour_band_width, colour_band_height)?;

        let options = LabelOptions {
            steps: config.steps,
            precision: config.precision,
            multiplier: config.label_multiplier,
            offset: config.label_offset,
            major_tick_mark_length: config.major_tick_mark_length,
            minor_tick_mark_length: config.minor_tick_mark_length,
            extra_low: EXTRA_AMOUNT_OUT_OF_RANGE,
            extra_high: EXTRA_AMOUNT_OUT_OF_RANGE,
            hide_lower_label: config.hide_lower_label.unwrap_or(false),
            hide_higher_label: config.hide_higher_label.unwrap_or(false),
            scale,
        };
        let mut labels = LegendLabelSet::new(&content.label_scale, &options);
        labels.layout(
            colour_band_height,
            LabelText {
                title: (!title_hidden).then_some(content.title),
                title_style: TextStyle::new(title_size as f32, title_colour)
                    .bold(title_config.and_then(|t| t.bold).unwrap_or(false)),
                label_style: TextStyle::new(label_size as f32, label_colour),
                label_padding,
            },
            typeface,
        );

        let width = colour_band_width + labels.width() + padding.left + padding.right;
        let height = colour_band_height + padding.top + padding.bottom;

        let (panel_width, panel_height) = panel_size;
        let position = &config.position;
        let relative_x = match (position.left(), position.right()) {
            (Some(left), _) => scale_px(left, scale),
            (None, Some(right)) => panel_width - scale_px(right, scale) - width,
            (None, None) => 0,
        };
        let relative_y = match (position.top(), position.bottom()) {
            (Some(top), _) => scale_px(top, scale),
            (None, Some(bottom)) => panel_height - scale_px(bottom, scale) - height,
            (None, None) => 0,
        };

        let pos_x = panel_offset.0 + relative_x;
        let pos_y = panel_offset.1 + relative_y;
        debug!(x = pos_x, y = pos_y, width, height, "Prepared legend");

        Ok(Self {
            colour_bar_image,
            labels,
            background,
            label_colour,
            padding,
            colour_band_width,
            border_width: DEFAULT_COLOUR_BAND_BORDER * scale,
            pos_x,
            pos_y,
            width,
            height,
        })
    }

    /// `(x, y, width, height)` on the canvas.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (self.pos_x, self.pos_y, self.width, self.height)
    }

    pub fn labels(&self) -> &LegendLabelSet {
        &self.labels
    }

    pub fn draw(&self, canvas: &mut FrameCanvas, typeface: &Typeface) {
        canvas.create_layer("legend");
        canvas.fill_rect(self.pos_x, self.pos_y, self.width, self.height, self.background);

        let bar_x = self.pos_x + self.padding.left;
        let bar_y = self.pos_y + self.padding.top;
        canvas.draw_pixmap(bar_x, bar_y, &self.colour_bar_image);

        canvas.stroke_rect(
            bar_x,
            bar_y,
            self.colour_bar_image.width() as i32,
            self.colour_bar_image.height() as i32,
            self.label_colour,
            self.border_width,
        );

        self.labels.draw(
            canvas,
            self.colour_band_width + bar_x,
            bar_y,
            typeface,
        );
    }
}
