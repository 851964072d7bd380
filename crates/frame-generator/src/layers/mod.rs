//! Data layer generators: one per layer type, cached across frames.

pub mod gridded;
pub mod no_data;
pub mod overlay;
pub mod wms;

use frame_common::{BoundingBox, FrameResult, LayerConfig, LayerType, PanelConfig};
use renderer::FrameCanvas;

use crate::context::FrameContext;

pub use gridded::{Grib2Preparation, GriddedLayerGenerator, InputPreparation, NetCdfPreparation};
pub use overlay::OverlayLayerGenerator;
pub use wms::WmsLayerGenerator;

const UNNAMED_PANEL: &str = "Unnamed panel";

/// Renders one configured layer into panel-sized regions of a frame.
///
/// A generator is created once per layer identity and reused for every
/// frame of a run. `initialize` runs before each frame, `render` draws the
/// layer and `post_render` runs after every layer of every panel is drawn.
pub trait DataLayerGenerator {
    /// Prepare for a new frame.
    fn initialize(&mut self, panel: &PanelConfig, layer: &LayerConfig, ctx: &FrameContext<'_>);

    /// Draw the layer with its top-left corner at `offset`.
    ///
    /// # Arguments
    /// * `canvas` - Whole-frame canvas, clipped to the panel
    /// * `offset` - Panel top-left on the canvas, in scaled pixels
    /// * `ctx` - The frame being rendered
    fn render(
        &mut self,
        canvas: &mut FrameCanvas,
        offset: (i32, i32),
        ctx: &FrameContext<'_>,
    ) -> FrameResult<()>;

    /// Draw anything deferred until all layers are done, such as legends.
    fn post_render(&mut self, _canvas: &mut FrameCanvas, _ctx: &FrameContext<'_>) -> FrameResult<()> {
        Ok(())
    }

    /// True when the last `render` drew data for the frame.
    fn is_data_available(&self) -> bool;

    fn layer_type(&self) -> LayerType;
}

/// Layer settings captured by `initialize`.
#[derive(Debug, Clone)]
pub struct LayerSetup {
    pub layer: LayerConfig,
    /// Expanded panel title, used to name canvas layers.
    pub title_prefix: String,
    /// Panel size in scaled pixels.
    pub panel_size: (i32, i32),
    pub bbox: BoundingBox,
    pub region_id: String,
}

impl LayerSetup {
    pub fn new(panel: &PanelConfig, layer: &LayerConfig, ctx: &FrameContext<'_>) -> Self {
        Self {
            layer: layer.clone(),
            title_prefix: panel_title_prefix(panel, ctx),
            panel_size: ctx.scaled_panel_size(panel),
            bbox: ctx.request.region.bbox,
            region_id: ctx.request.region.id.clone(),
        }
    }

    /// `"{prefix} {id} ({type} layer)"`
    pub fn layer_title(&self) -> String {
        format!(
            "{} {} ({} layer)",
            self.title_prefix, self.layer.id, self.layer.layer_type
        )
    }

    pub fn panel_width(&self) -> u32 {
        self.panel_size.0.max(1) as u32
    }

    pub fn panel_height(&self) -> u32 {
        self.panel_size.1.max(1) as u32
    }
}

/// Panel title lines joined by a space, or a placeholder for untitled panels.
pub fn panel_title_prefix(panel: &PanelConfig, ctx: &FrameContext<'_>) -> String {
    panel
        .title
        .as_ref()
        .filter(|title| !title.text.is_empty())
        .map(|title| {
            title
                .text
                .iter()
                .map(|line| ctx.expand(line))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_else(|| UNNAMED_PANEL.to_string())
}

/// Generator for any layer type.
pub enum LayerGenerator {
    Gridded(GriddedLayerGenerator),
    Overlay(OverlayLayerGenerator),
    Wms(WmsLayerGenerator),
}

impl LayerGenerator {
    pub fn for_type(layer_type: LayerType) -> Self {
        match layer_type {
            LayerType::NetCdf => {
                LayerGenerator::Gridded(GriddedLayerGenerator::new(Box::new(NetCdfPreparation)))
            }
            LayerType::Grib2 => {
                LayerGenerator::Gridded(GriddedLayerGenerator::new(Box::new(Grib2Preparation)))
            }
            LayerType::Csv | LayerType::GeoJson => {
                LayerGenerator::Overlay(OverlayLayerGenerator::new(layer_type))
            }
            LayerType::Wms => LayerGenerator::Wms(WmsLayerGenerator::new()),
        }
    }

    fn inner(&self) -> &dyn DataLayerGenerator {
        match self {
            LayerGenerator::Gridded(generator) => generator,
            LayerGenerator::Overlay(generator) => generator,
            LayerGenerator::Wms(generator) => generator,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DataLayerGenerator {
        match self {
            LayerGenerator::Gridded(generator) => generator,
            LayerGenerator::Overlay(generator) => generator,
            LayerGenerator::Wms(generator) => generator,
        }
    }
}

impl DataLayerGenerator for LayerGenerator {
    fn initialize(&mut self, panel: &PanelConfig, layer: &LayerConfig, ctx: &FrameContext<'_>) {
        self.inner_mut().initialize(panel, layer, ctx)
    }

    fn render(
        &mut self,
        canvas: &mut FrameCanvas,
        offset: (i32, i32),
        ctx: &FrameContext<'_>,
    ) -> FrameResult<()> {
        self.inner_mut().render(canvas, offset, ctx)
    }

    fn post_render(&mut self, canvas: &mut FrameCanvas, ctx: &FrameContext<'_>) -> FrameResult<()> {
        self.inner_mut().post_render(canvas, ctx)
    }

    fn is_data_available(&self) -> bool {
        self.inner().is_data_available()
    }

    fn layer_type(&self) -> LayerType {
        self.inner().layer_type()
    }
}
