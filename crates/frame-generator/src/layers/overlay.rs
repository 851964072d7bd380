//! Static vector overlays from CSV point tables and GeoJSON documents.

use frame_common::{scale_f32, FrameError, FrameResult, LayerConfig, LayerType, PanelConfig};
use renderer::shapes::{parse_csv_points, parse_geojson, render_shapes, Shape, ShapeStyle};
use renderer::FrameCanvas;
use tiny_skia::Pixmap;
use tracing::{debug, warn};

use crate::context::FrameContext;
use crate::fetch::fetch_to_directory;
use crate::layers::{DataLayerGenerator, LayerSetup};

const OVERLAY_DIRECTORY: &str = "overlays";

/// Draws a CSV or GeoJSON overlay. The overlay does not change between
/// frames, so it is drawn once and reused.
pub struct OverlayLayerGenerator {
    layer_type: LayerType,
    setup: Option<LayerSetup>,
    image: Option<Pixmap>,
}

impl OverlayLayerGenerator {
    pub fn new(layer_type: LayerType) -> Self {
        Self {
            layer_type,
            setup: None,
            image: None,
        }
    }

    fn read_document(uri: &str, ctx: &FrameContext<'_>) -> FrameResult<String> {
        let path = fetch_to_directory(
            ctx.services.fetcher.as_ref(),
            uri,
            &ctx.download_directory().join(OVERLAY_DIRECTORY),
        )?;
        std::fs::read_to_string(&path)
            .map_err(|e| FrameError::Dataset(format!("cannot read {}: {}", path.display(), e)))
    }

    fn load_shapes(&self, layer: &LayerConfig, ctx: &FrameContext<'_>) -> FrameResult<Vec<Shape>> {
        let datasource = layer
            .datasource
            .as_deref()
            .ok_or_else(|| FrameError::layer_config(&layer.id, "missing datasource"))?;
        let document = Self::read_document(&ctx.expand(datasource), ctx)?;

        let shapes = match self.layer_type {
            LayerType::Csv => parse_csv_points(&document)?,
            _ => parse_geojson(&document)?,
        };
        debug!(layer = %layer.id, shapes = shapes.len(), "Loaded overlay shapes");
        Ok(shapes)
    }

    /// Style document with pixel sizes scaled for output.
    fn load_style(layer: &LayerConfig, ctx: &FrameContext<'_>) -> FrameResult<ShapeStyle> {
        let mut style = match layer.style.as_deref() {
            Some(uri) => ShapeStyle::from_json(&Self::read_document(&ctx.expand(uri), ctx)?)
                .map_err(|e| FrameError::Style(format!("layer '{}': {}", layer.id, e)))?,
            None => {
                warn!(layer = %layer.id, "No style for overlay layer, using default style");
                ShapeStyle::default()
            }
        };
        style.stroke_width = scale_f32(style.stroke_width, ctx.scale());
        style.point_radius = scale_f32(style.point_radius, ctx.scale());
        Ok(style)
    }
}

impl DataLayerGenerator for OverlayLayerGenerator {
    fn initialize(&mut self, panel: &PanelConfig, layer: &LayerConfig, ctx: &FrameContext<'_>) {
        self.setup = Some(LayerSetup::new(panel, layer, ctx));
    }

    fn render(
        &mut self,
        canvas: &mut FrameCanvas,
        offset: (i32, i32),
        ctx: &FrameContext<'_>,
    ) -> FrameResult<()> {
        let setup = self
            .setup
            .as_ref()
            .ok_or_else(|| FrameError::Render("overlay rendered before initialize".into()))?;

        if self.image.is_none() {
            let shapes = self.load_shapes(&setup.layer, ctx)?;
            let style = Self::load_style(&setup.layer, ctx)?;
            let image = render_shapes(
                &shapes,
                &style,
                &setup.bbox,
                setup.panel_width(),
                setup.panel_height(),
            )?;
            self.image = Some(image);
        }

        if let Some(image) = &self.image {
            canvas.create_layer(setup.layer_title());
            canvas.draw_pixmap(offset.0, offset.1, image);
        }
        Ok(())
    }

    /// Overlays are decoration, never data.
    fn is_data_available(&self) -> bool {
        false
    }

    fn layer_type(&self) -> LayerType {
        self.layer_type
    }
}
