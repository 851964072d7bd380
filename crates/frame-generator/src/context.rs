//! Per-frame request and the context handed to layer generators.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use frame_common::{
    scale_px, AnimateConfig, FrameResult, FrameTimetable, LayerConfig, MapFormat, PanelConfig,
    RegionConfig, TimeRange, VariableMetadata,
};
use renderer::Typeface;

use crate::dataset::{DatasetOpener, JsonDatasetOpener};
use crate::fetch::{FrameUploader, HttpFetcher, InputFetcher, LocalFetcher, SchemeFetcher, TileFetcher};
use crate::template::{self, TemplateValues};

const FRAME_DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// One frame to render: a region, an optional depth and a time range.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub region: RegionConfig,
    pub target_depth: Option<f64>,
    pub time_range: TimeRange,
}

impl FrameRequest {
    pub fn new(region: RegionConfig, target_depth: Option<f64>, time_range: TimeRange) -> Self {
        Self {
            region,
            target_depth,
            time_range,
        }
    }

    /// `height_<depth>` or `noHeight`.
    pub fn height_dir(&self) -> String {
        match self.target_depth {
            Some(depth) => format!("height_{}", template::format_height(depth)),
            None => "noHeight".to_string(),
        }
    }

    /// `<frame_dir>/<product>/<region>/<height_dir>/frame_<start>.<ext>`
    pub fn frame_path(&self, frame_dir: &Path, product_id: &str, format: MapFormat) -> PathBuf {
        frame_dir
            .join(product_id)
            .join(&self.region.id)
            .join(self.height_dir())
            .join(format!(
                "frame_{}.{}",
                self.time_range.start.format(FRAME_DATE_FORMAT),
                format.extension()
            ))
    }
}

/// External collaborators used while rendering.
pub struct Services {
    pub fetcher: Box<dyn InputFetcher>,
    pub opener: Box<dyn DatasetOpener>,
    pub tiles: Box<dyn TileFetcher>,
    pub uploader: Option<Box<dyn FrameUploader>>,
}

impl Services {
    /// Local files only; tile requests read from disk.
    pub fn local() -> Self {
        Self {
            fetcher: Box::new(LocalFetcher),
            opener: Box::new(JsonDatasetOpener),
            tiles: Box::new(LocalFetcher),
            uploader: None,
        }
    }

    /// Local files plus HTTP downloads and WMS tiles.
    pub fn standard() -> FrameResult<Self> {
        Ok(Self {
            fetcher: Box::new(SchemeFetcher::new()?),
            opener: Box::new(JsonDatasetOpener),
            tiles: Box::new(HttpFetcher::new()?),
            uploader: None,
        })
    }

    pub fn with_uploader(mut self, uploader: Box<dyn FrameUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }
}

/// Everything a generator can see while rendering one frame.
pub struct FrameContext<'a> {
    pub config: &'a AnimateConfig,
    pub request: &'a FrameRequest,
    /// Inputs of this frame; `None` when the timetable has no entry.
    pub timetable: Option<&'a FrameTimetable>,
    pub services: &'a Services,
    pub typeface: &'a Typeface,
    /// Resolved depth of every gridded layer, by layer id.
    pub layer_heights: BTreeMap<String, f64>,
}

impl<'a> FrameContext<'a> {
    pub fn scale(&self) -> f32 {
        self.config.render.scale
    }

    /// Unscaled size of `panel` in this frame's region.
    pub fn panel_size(&self, panel: &PanelConfig) -> (u32, u32) {
        panel_dimensions(panel, &self.request.region)
    }

    pub fn scaled_panel_size(&self, panel: &PanelConfig) -> (i32, i32) {
        scaled_panel_dimensions(panel, &self.request.region, self.scale())
    }

    pub fn download_directory(&self) -> &Path {
        &self.config.render.download_directory
    }

    /// Expand `${...}` placeholders against this frame.
    pub fn expand(&self, text: &str) -> String {
        let values = TemplateValues {
            product_id: &self.config.id,
            region_id: &self.request.region.id,
            region_label: self.request.region.label.as_deref(),
            target_height: self.request.target_depth,
            frame_from: Some(self.request.time_range.start),
            frame_to: Some(self.request.time_range.end),
            layer_heights: Some(&self.layer_heights),
        };
        template::expand(text, &values)
    }
}

/// Depth to read a layer at: the layer override, else the frame depth,
/// snapped to the nearest height of the variable. Without metadata the
/// unsnapped depth is returned.
pub fn resolve_depth(
    layer: &LayerConfig,
    request_depth: Option<f64>,
    variable: Option<&VariableMetadata>,
) -> Option<f64> {
    let wanted = layer.target_height.or(request_depth);
    match variable {
        Some(variable) if !variable.heights.is_empty() => variable.closest_height(wanted),
        Some(_) => None,
        None => wanted,
    }
}

/// Unscaled panel size. A panel width replaces the region width and the
/// height follows the region's aspect ratio.
pub fn panel_dimensions(panel: &PanelConfig, region: &RegionConfig) -> (u32, u32) {
    match panel.width {
        Some(width) if width > 0 && width != region.width => {
            let height = f64::from(region.height) * f64::from(width) / f64::from(region.width.max(1));
            (width, (height.round() as u32).max(1))
        }
        _ => (region.width, region.height),
    }
}

fn scaled_panel_dimensions(panel: &PanelConfig, region: &RegionConfig, scale: f32) -> (i32, i32) {
    let (width, height) = panel_dimensions(panel, region);
    (scale_px(width as i32, scale), scale_px(height as i32, scale))
}

/// Pixel size of a whole frame: padding around panels laid out left to
/// right, as tall as the tallest panel.
pub fn canvas_size(config: &AnimateConfig, region: &RegionConfig) -> (u32, u32) {
    let scale = config.render.scale;
    let padding = &config.canvas.padding;

    let (panels_width, panels_height) = if config.panels.is_empty() {
        (scale_px(region.width as i32, scale), scale_px(region.height as i32, scale))
    } else {
        let sizes: Vec<(i32, i32)> = config
            .panels
            .iter()
            .map(|panel| scaled_panel_dimensions(panel, region, scale))
            .collect();
        let gaps = (sizes.len() as i32 - 1) * scale_px(config.canvas.padding_between_panels, scale);
        (
            sizes.iter().map(|(w, _)| w).sum::<i32>() + gaps,
            sizes.iter().map(|(_, h)| *h).max().unwrap_or(0),
        )
    };

    let width = scale_px(padding.left, scale) + scale_px(padding.right, scale) + panels_width;
    let height = scale_px(padding.top, scale) + scale_px(padding.bottom, scale) + panels_height;

    (width.max(1) as u32, height.max(1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use frame_common::{BoundingBox, LayerType, PaddingConfig};

    fn region() -> RegionConfig {
        RegionConfig {
            id: "qld".into(),
            label: Some("Queensland".into()),
            bbox: BoundingBox::new(142.0, -29.0, 155.0, -10.0),
            width: 300,
            height: 400,
        }
    }

    fn request(depth: Option<f64>) -> FrameRequest {
        let start = Utc.with_ymd_and_hms(2010, 9, 1, 6, 30, 0).unwrap();
        FrameRequest::new(
            region(),
            depth,
            TimeRange::new(start, start + chrono::Duration::hours(1)),
        )
    }

    #[test]
    fn test_frame_path_layout() {
        let path = request(Some(-1.5)).frame_path(Path::new("out"), "gbr4", MapFormat::Png);
        assert_eq!(
            path,
            PathBuf::from("out/gbr4/qld/height_-1.5/frame_2010-09-01_06-30-00.png")
        );

        let path = request(None).frame_path(Path::new("out"), "gbr4", MapFormat::Jpg);
        assert_eq!(
            path,
            PathBuf::from("out/gbr4/qld/noHeight/frame_2010-09-01_06-30-00.jpg")
        );
    }

    #[test]
    fn test_whole_depth_keeps_decimal() {
        assert_eq!(request(Some(-12.0)).height_dir(), "height_-12.0");
    }

    #[test]
    fn test_resolve_depth_prefers_layer_override() {
        let mut variable = VariableMetadata::new("temp");
        variable.heights = vec![-0.5, -1.5, -12.75];

        let mut layer: LayerConfig = serde_json::from_value(serde_json::json!({
            "id": "temp", "type": "NETCDF"
        }))
        .unwrap();
        assert_eq!(layer.layer_type, LayerType::NetCdf);

        assert_eq!(resolve_depth(&layer, Some(-2.0), Some(&variable)), Some(-1.5));
        layer.target_height = Some(-10.0);
        assert_eq!(resolve_depth(&layer, Some(-2.0), Some(&variable)), Some(-12.75));
        assert_eq!(resolve_depth(&layer, None, None), Some(-10.0));
        assert_eq!(
            resolve_depth(&layer, None, Some(&VariableMetadata::new("eta"))),
            None
        );
    }

    #[test]
    fn test_canvas_size_with_scale() {
        let mut config = AnimateConfig::from_json(r#"{"id": "p"}"#).unwrap();
        config.canvas.padding = PaddingConfig {
            top: 80,
            bottom: 40,
            left: 16,
            right: 16,
        };
        config.canvas.padding_between_panels = 8;
        let panel = serde_json::from_value(serde_json::json!({"id": "a"})).unwrap();
        config.panels = vec![panel, serde_json::from_value(serde_json::json!({"id": "b"})).unwrap()];

        assert_eq!(canvas_size(&config, &region()), (16 + 16 + 600 + 8, 520));

        config.render.scale = 0.5;
        assert_eq!(canvas_size(&config, &region()), (8 + 8 + 300 + 4, 260));
    }

    #[test]
    fn test_panel_width_keeps_region_aspect() {
        let narrow: PanelConfig = serde_json::from_value(serde_json::json!({"id": "a", "width": 150})).unwrap();
        let default: PanelConfig = serde_json::from_value(serde_json::json!({"id": "b"})).unwrap();
        assert_eq!(panel_dimensions(&narrow, &region()), (150, 200));
        assert_eq!(panel_dimensions(&default, &region()), (300, 400));

        let mut config = AnimateConfig::from_json(r#"{"id": "p"}"#).unwrap();
        config.canvas.padding = PaddingConfig {
            top: 10,
            bottom: 10,
            left: 10,
            right: 10,
        };
        config.canvas.padding_between_panels = 5;
        config.panels = vec![narrow, default];
        assert_eq!(canvas_size(&config, &region()), (10 + 150 + 5 + 300 + 10, 10 + 400 + 10));
    }
}
