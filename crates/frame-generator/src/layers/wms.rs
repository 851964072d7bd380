//! Remote WMS layers, fetched once as a GetMap image.

use frame_common::{BoundingBox, FrameError, FrameResult, LayerConfig, LayerType, PanelConfig};
use renderer::FrameCanvas;
use reqwest::Url;
use tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::context::FrameContext;
use crate::layers::{DataLayerGenerator, LayerSetup};

/// Build a WMS 1.1.1 GetMap URL for a north-up EPSG:4326 image.
pub fn get_map_url(
    server: &str,
    layer_name: &str,
    styles: Option<&str>,
    bbox: &BoundingBox,
    width: u32,
    height: u32,
) -> FrameResult<String> {
    let mut url = Url::parse(server)
        .map_err(|e| FrameError::Config(format!("invalid WMS server '{}': {}", server, e)))?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("SERVICE", "WMS")
            .append_pair("LAYERS", layer_name)
            .append_pair("TRANSPARENT", "TRUE")
            .append_pair("VERSION", "1.1.1")
            .append_pair("REQUEST", "GetMap");
        if let Some(styles) = styles {
            query.append_pair("STYLES", styles);
        }
        query
            .append_pair("FORMAT", "image/png")
            .append_pair("SRS", "EPSG:4326")
            .append_pair("BBOX", &bbox.to_wms_string())
            .append_pair("WIDTH", &width.to_string())
            .append_pair("HEIGHT", &height.to_string());
    }

    Ok(url.into())
}

/// Draws a WMS tile covering the panel.
pub struct WmsLayerGenerator {
    setup: Option<LayerSetup>,
    tile: Option<Pixmap>,
}

impl WmsLayerGenerator {
    pub fn new() -> Self {
        Self {
            setup: None,
            tile: None,
        }
    }
}

impl Default for WmsLayerGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLayerGenerator for WmsLayerGenerator {
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
            .ok_or_else(|| FrameError::Render("WMS layer rendered before initialize".into()))?;
        let layer = &setup.layer;

        if self.tile.is_none() {
            let server = layer
                .server
                .as_deref()
                .ok_or_else(|| FrameError::layer_config(&layer.id, "missing WMS server"))?;
            let layer_name = layer
                .layer_name
                .as_deref()
                .ok_or_else(|| FrameError::layer_config(&layer.id, "missing WMS layer name"))?;

            let url = get_map_url(
                server,
                layer_name,
                layer.styles.as_deref(),
                &setup.bbox,
                setup.panel_width(),
                setup.panel_height(),
            )?;
            info!(layer = %layer.id, url = %url, "Fetching WMS tile");
            self.tile = Some(ctx.services.tiles.fetch_tile(&url)?);
        }

        if let Some(tile) = &self.tile {
            debug!(layer = %layer.id, width = tile.width(), height = tile.height(), "Drawing WMS tile");
            canvas.create_layer(setup.layer_title());
            canvas.draw_pixmap(offset.0, offset.1, tile);
        }
        Ok(())
    }

    fn is_data_available(&self) -> bool {
        false
    }

    fn layer_type(&self) -> LayerType {
        LayerType::Wms
    }
}
