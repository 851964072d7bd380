//! Animation configuration model.
//!
//! Configuration documents are loaded from JSON or YAML. Structural
//! validation is limited to what serde enforces; unset optional values fall
//! back to the defaults used by the renderers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bbox::BoundingBox;
use crate::error::{FrameError, FrameResult};

/// Sentinel for an unset pixel position. Any value greater than this counts as set.
pub const NULL_VALUE: i32 = -1_000_000_000;

/// Root configuration for one animated product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimateConfig {
    /// Product identifier, used in output paths.
    pub id: String,

    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub panels: Vec<PanelConfig>,

    #[serde(default)]
    pub regions: Vec<RegionConfig>,

    /// Depths to render. An empty list renders a single depth-less pass.
    #[serde(default)]
    pub target_heights: Vec<f64>,

    #[serde(default)]
    pub render: RenderConfig,

    /// Product start date; frames starting earlier are skipped.
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    /// Product end date; frames ending later are skipped.
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

impl AnimateConfig {
    /// Load a configuration, choosing the parser from the file extension
    /// (`.yaml`/`.yml` for YAML, anything else JSON).
    pub fn from_file(path: impl AsRef<Path>) -> FrameResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FrameError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        debug!(path = %path.display(), yaml = is_yaml, "Loading animate config");

        if is_yaml {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn from_json(json: &str) -> FrameResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> FrameResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn region(&self, id: &str) -> Option<&RegionConfig> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Target heights to iterate; `[None]` when none are configured.
    pub fn target_heights_or_default(&self) -> Vec<Option<f64>> {
        if self.target_heights.is_empty() {
            vec![None]
        } else {
            self.target_heights.iter().copied().map(Some).collect()
        }
    }
}

/// Geographic region rendered into every panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub id: String,

    #[serde(default)]
    pub label: Option<String>,

    pub bbox: BoundingBox,

    /// Panel width in pixels, before render scaling.
    pub width: u32,

    /// Panel height in pixels, before render scaling.
    pub height: u32,
}

/// Whole-frame layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_background")]
    pub background_colour: String,

    #[serde(default)]
    pub padding: PaddingConfig,

    #[serde(default)]
    pub padding_between_panels: i32,

    #[serde(default)]
    pub texts: BTreeMap<String, TextConfig>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            background_colour: default_background(),
            padding: PaddingConfig::default(),
            padding_between_panels: 0,
            texts: BTreeMap::new(),
        }
    }
}

fn default_background() -> String {
    "#FFFFFF".to_string()
}

/// One panel of the frame, laid out left to right.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub id: String,

    #[serde(default)]
    pub title: Option<TextConfig>,

    #[serde(default)]
    pub background_colour: Option<String>,

    #[serde(default)]
    pub border_colour: Option<String>,

    /// Panel width in pixels, before render scaling. Defaults to the region
    /// width; the height keeps the region's aspect ratio.
    #[serde(default)]
    pub width: Option<u32>,

    /// Border width in pixels, before render scaling.
    #[serde(default = "default_border_width")]
    pub border_width: i32,

    /// Layers drawn bottom to top.
    #[serde(default)]
    pub layers: Vec<LayerConfig>,

    #[serde(default)]
    pub texts: BTreeMap<String, TextConfig>,
}

fn default_border_width() -> i32 {
    2
}

/// Kinds of data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayerType {
    Csv,
    GeoJson,
    Grib2,
    NetCdf,
    Wms,
}

impl LayerType {
    /// Gridded layers read a dataset per frame; the others are static overlays.
    pub fn is_gridded(&self) -> bool {
        matches!(self, LayerType::NetCdf | LayerType::Grib2)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Csv => "CSV",
            LayerType::GeoJson => "GEOJSON",
            LayerType::Grib2 => "GRIB2",
            LayerType::NetCdf => "NETCDF",
            LayerType::Wms => "WMS",
        }
    }
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One layer of a panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: String,

    #[serde(rename = "type")]
    pub layer_type: LayerType,

    /// Data source definition the layer reads from (gridded layers).
    #[serde(default)]
    pub input: Option<String>,

    /// Depth override for this layer.
    #[serde(default)]
    pub target_height: Option<f64>,

    /// Scalar variable rendered as a coloured field.
    #[serde(default)]
    pub variable: Option<VariableConfig>,

    /// Vector variable rendered as arrows.
    #[serde(default)]
    pub arrow_variable: Option<VariableConfig>,

    /// Variables composited into a true-colour image.
    #[serde(default)]
    pub true_colour_variables: BTreeMap<String, TrueColourVariable>,

    /// Vector data file (CSV, GeoJSON).
    #[serde(default)]
    pub datasource: Option<String>,

    /// Styling document for vector data.
    #[serde(default)]
    pub style: Option<String>,

    /// WMS server base URL.
    #[serde(default)]
    pub server: Option<String>,

    /// WMS layer name.
    #[serde(default)]
    pub layer_name: Option<String>,

    /// WMS STYLES parameter.
    #[serde(default)]
    pub styles: Option<String>,
}

impl LayerConfig {
    /// Stable JSON form of the layer, used in cache identities.
    pub fn to_json(&self) -> FrameResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Styling of one dataset variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableConfig {
    /// Variable id inside the dataset.
    pub id: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub units: Option<String>,

    #[serde(default)]
    pub scale_min: Option<f32>,

    #[serde(default)]
    pub scale_max: Option<f32>,

    #[serde(default)]
    pub logarithmic: bool,

    /// Palette name, palette file path/URI, or omitted for the default palette.
    #[serde(default)]
    pub colour_palette: Option<String>,

    /// Inline palette colours, taking precedence over `colour_palette`.
    #[serde(default)]
    pub colours: Vec<String>,

    /// Number of colours of a threshold scheme.
    #[serde(default)]
    pub colour_band_colour_count: Option<usize>,

    /// Number of bands of a continuous scheme.
    #[serde(default)]
    pub band_count: Option<usize>,

    #[serde(default)]
    pub thresholds: Option<Vec<f32>>,

    #[serde(default)]
    pub below_min_colour: Option<String>,

    #[serde(default)]
    pub above_max_colour: Option<String>,

    #[serde(default)]
    pub no_data_colour: Option<String>,

    #[serde(default)]
    pub legend: Option<LegendConfig>,

    // Arrow settings.
    #[serde(default)]
    pub arrow_size: Option<i32>,

    #[serde(default)]
    pub arrow_colour: Option<String>,

    /// UPSTREAM, THIN_ARROW, FAT_ARROW, TRI_ARROW, WIND_BARBS or DYNA_FAT_ARROW.
    #[serde(default)]
    pub arrow_style: Option<String>,

    /// Angle of north in the direction variable's frame, in degrees.
    #[serde(default)]
    pub north_angle: Option<f32>,

    /// Units of a full turn of the direction variable (360 for degrees).
    #[serde(default)]
    pub direction_turns: Option<f32>,
}

/// One channel of a true-colour composite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrueColourVariable {
    /// Variable id inside the dataset.
    pub id: String,

    pub hex_colours: Vec<String>,

    #[serde(default)]
    pub scale_min: Option<f32>,

    #[serde(default)]
    pub scale_max: Option<f32>,
}

/// Legend styling; every pixel value is scaled by the render scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegendConfig {
    #[serde(default)]
    pub hidden: bool,

    /// Title lines drawn before the automatic "label (units)" title.
    #[serde(default)]
    pub title: Option<TextConfig>,

    #[serde(default)]
    pub position: PositionConfig,

    #[serde(default)]
    pub padding: Option<PaddingConfig>,

    #[serde(default)]
    pub background_colour: Option<String>,

    #[serde(default)]
    pub label_colour: Option<String>,

    #[serde(default)]
    pub label_font_size: Option<i32>,

    #[serde(default)]
    pub label_padding: Option<i32>,

    #[serde(default)]
    pub colour_band_width: Option<i32>,

    #[serde(default)]
    pub colour_band_height: Option<i32>,

    #[serde(default)]
    pub major_tick_mark_length: Option<i32>,

    #[serde(default)]
    pub minor_tick_mark_length: Option<i32>,

    #[serde(default)]
    pub steps: Option<usize>,

    #[serde(default)]
    pub precision: Option<i32>,

    #[serde(default)]
    pub label_multiplier: Option<f32>,

    #[serde(default)]
    pub label_offset: Option<f32>,

    #[serde(default)]
    pub hide_lower_label: Option<bool>,

    #[serde(default)]
    pub hide_higher_label: Option<bool>,

    /// Render the arrow threshold legend instead of the colour legend.
    #[serde(default)]
    pub arrow_thresholds: Option<Vec<f32>>,
}

/// A block of text positioned inside a panel or the canvas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextConfig {
    /// Text lines; each line may contain `${...}` placeholders.
    #[serde(default)]
    pub text: Vec<String>,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub font_size: Option<i32>,

    /// Bold weight; panel titles default to bold, other texts to regular.
    #[serde(default)]
    pub bold: Option<bool>,

    #[serde(default)]
    pub font_colour: Option<String>,

    #[serde(default)]
    pub position: PositionConfig,
}

/// One-sided position offsets in unscaled pixels.
///
/// Legends let left win over right and top over bottom; texts and titles
/// let right and bottom win.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionConfig {
    #[serde(default = "null_value")]
    pub top: i32,
    #[serde(default = "null_value")]
    pub bottom: i32,
    #[serde(default = "null_value")]
    pub left: i32,
    #[serde(default = "null_value")]
    pub right: i32,
}

fn null_value() -> i32 {
    NULL_VALUE
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            top: NULL_VALUE,
            bottom: NULL_VALUE,
            left: NULL_VALUE,
            right: NULL_VALUE,
        }
    }
}

impl PositionConfig {
    pub fn is_set(value: i32) -> bool {
        value > NULL_VALUE
    }

    pub fn top(&self) -> Option<i32> {
        Self::is_set(self.top).then_some(self.top)
    }

    pub fn bottom(&self) -> Option<i32> {
        Self::is_set(self.bottom).then_some(self.bottom)
    }

    pub fn left(&self) -> Option<i32> {
        Self::is_set(self.left).then_some(self.left)
    }

    pub fn right(&self) -> Option<i32> {
        Self::is_set(self.right).then_some(self.right)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PaddingConfig {
    #[serde(default)]
    pub top: i32,
    #[serde(default)]
    pub bottom: i32,
    #[serde(default)]
    pub left: i32,
    #[serde(default)]
    pub right: i32,
}

impl PaddingConfig {
    pub fn uniform(value: i32) -> Self {
        Self {
            top: value,
            bottom: value,
            left: value,
            right: value,
        }
    }
}

/// Output image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapFormat {
    Png,
    Jpg,
    Gif,
    Svg,
}

impl MapFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            MapFormat::Png => "png",
            MapFormat::Jpg => "jpg",
            MapFormat::Gif => "gif",
            MapFormat::Svg => "svg",
        }
    }
}

/// Font files used for text; without them text is skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontConfig {
    #[serde(default)]
    pub regular: Option<PathBuf>,

    #[serde(default)]
    pub bold: Option<PathBuf>,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Root directory for rendered frames.
    #[serde(default = "default_frame_directory")]
    pub frame_directory: PathBuf,

    /// Root directory for downloaded inputs.
    #[serde(default = "default_download_directory")]
    pub download_directory: PathBuf,

    /// Multiplier applied to every pixel dimension.
    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default = "default_formats")]
    pub formats: Vec<MapFormat>,

    /// Format uploaded for video assembly, when videos are produced.
    #[serde(default)]
    pub video_frame_format: Option<MapFormat>,

    #[serde(default)]
    pub font: FontConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            frame_directory: default_frame_directory(),
            download_directory: default_download_directory(),
            scale: default_scale(),
            formats: default_formats(),
            video_frame_format: None,
            font: FontConfig::default(),
        }
    }
}

fn default_frame_directory() -> PathBuf {
    PathBuf::from("output/frame")
}

fn default_download_directory() -> PathBuf {
    PathBuf::from("input")
}

fn default_scale() -> f32 {
    1.0
}

fn default_formats() -> Vec<MapFormat> {
    vec![MapFormat::Png]
}

/// Scale a pixel length by the render scale, rounding to the nearest pixel.
pub fn scale_px(value: i32, scale: f32) -> i32 {
    (value as f32 * scale).round() as i32
}

/// Scale a floating-point length by the render scale.
pub fn scale_f32(value: f32, scale: f32) -> f32 {
    value * scale
}
