//! Gridded (NetCDF, GRIB2) layers: coloured fields, arrow fields and
//! true-colour composites read from a downloaded dataset.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use frame_common::metadata::{safe_filename, ROLE_DIRECTION, ROLE_MAGNITUDE};
use frame_common::{
    scale_px, FrameError, FrameResult, InputFrame, InputMetadata, LayerConfig, LayerType,
    LegendConfig, PanelConfig, VariableConfig, VariableMetadata,
};
use renderer::arrows::DEFAULT_ARROW_SIZE;
use renderer::color::parse_or;
use renderer::colour_scale::{DEFAULT_SCALE_MAX, DEFAULT_SCALE_MIN};
use renderer::legend::{legend_title, ColourBar, LabelScale};
use renderer::raster::render_field;
use renderer::{
    ArrowFieldRenderer, ArrowStyle, Color, ColourScheme, FrameCanvas, LegendContent,
    LegendRenderer, MagnitudeDomain, Palette, TrueColourComposite,
};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::context::{resolve_depth, FrameContext};
use crate::dataset::{DatasetSlot, GridDataset, PlottingDomain};
use crate::fetch::fetch_to_directory;
use crate::layers::{DataLayerGenerator, LayerSetup};

/// Sub-directory of the download directory holding fetched palette files.
const PALETTE_DIRECTORY: &str = "palettes";
const TRUE_COLOUR_BAND_COUNT: usize = 250;
const GRIB2_INDEX_EXTENSIONS: [&str; 2] = ["gbx9", "ncx4"];

/// Format-specific handling of a downloaded input file.
pub trait InputPreparation {
    fn name(&self) -> &'static str;

    /// Runs once after a new copy of an input is downloaded.
    fn after_download(&self, _path: &Path) -> FrameResult<()> {
        Ok(())
    }

    /// Runs before every read of an input.
    fn prepare(&self, _path: &Path) -> FrameResult<()> {
        Ok(())
    }

    fn layer_type(&self) -> LayerType;
}

/// NetCDF files are read as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfPreparation;

impl InputPreparation for NetCdfPreparation {
    fn name(&self) -> &'static str {
        "NetCDF"
    }

    fn layer_type(&self) -> LayerType {
        LayerType::NetCdf
    }
}

/// GRIB2 files carry index files beside them that go stale when the file
/// is replaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grib2Preparation;

impl Grib2Preparation {
    pub fn index_paths(path: &Path) -> Vec<PathBuf> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        GRIB2_INDEX_EXTENSIONS
            .iter()
            .map(|ext| path.with_file_name(format!("{}.{}", name, ext)))
            .collect()
    }
}

impl InputPreparation for Grib2Preparation {
    fn name(&self) -> &'static str {
        "GRIB2"
    }

    fn after_download(&self, path: &Path) -> FrameResult<()> {
        for index in Self::index_paths(path) {
            if index.exists() {
                std::fs::remove_file(&index)?;
                info!(index = %index.display(), "Removed stale GRIB2 index");
            }
        }
        Ok(())
    }

    fn prepare(&self, path: &Path) -> FrameResult<()> {
        for index in Self::index_paths(path) {
            if !index.exists() {
                debug!(index = %index.display(), "GRIB2 index missing");
            }
        }
        Ok(())
    }

    fn layer_type(&self) -> LayerType {
        LayerType::Grib2
    }
}

/// Generator for gridded layers. Keeps the open dataset, loaded palettes
/// and the legends queued by every panel of the current frame.
pub struct GriddedLayerGenerator {
    preparation: Box<dyn InputPreparation>,
    slot: DatasetSlot,
    setup: Option<LayerSetup>,
    palettes: HashMap<String, Palette>,
    legends: Vec<LegendRenderer>,
    data_available: bool,
}

impl GriddedLayerGenerator {
    pub fn new(preparation: Box<dyn InputPreparation>) -> Self {
        Self {
            preparation,
            slot: DatasetSlot::new(),
            setup: None,
            palettes: HashMap::new(),
            legends: Vec::new(),
            data_available: false,
        }
    }

    pub fn dataset_slot(&self) -> &DatasetSlot {
        &self.slot
    }
}

impl DataLayerGenerator for GriddedLayerGenerator {
    fn initialize(&mut self, panel: &PanelConfig, layer: &LayerConfig, ctx: &FrameContext<'_>) {
        // Legends queue up across panels until `post_render`.
        self.setup = Some(LayerSetup::new(panel, layer, ctx));
        self.data_available = false;
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
            .ok_or_else(|| FrameError::Render("gridded layer rendered before initialize".into()))?;
        let layer_id = &setup.layer.id;

        let Some(input) = ctx.timetable.and_then(|t| t.input_for(layer_id)) else {
            debug!(layer = %layer_id, "No input for frame");
            return Ok(());
        };

        let path = local_copy(&input.metadata, self.preparation.as_ref(), ctx)?;
        let dataset = self.slot.get_or_open(&path, ctx.services.opener.as_ref())?;
        self.preparation.prepare(&path)?;

        let pass = Pass {
            dataset,
            setup,
            input,
            ctx,
            offset,
            title: setup.layer_title(),
        };

        let results = [
            ("raster", pass.raster(&mut self.palettes, &mut self.legends, canvas)),
            ("arrows", pass.arrows(&mut self.palettes, &mut self.legends, canvas)),
            ("true colour", pass.true_colour(canvas)),
        ];

        let mut drawn = false;
        for (name, result) in results {
            match result {
                Ok(done) => drawn |= done,
                Err(FrameError::IncorrectDomain(message)) => {
                    warn!(layer = %layer_id, pass = name, error = %message, "Requested domain not in dataset");
                }
                Err(e) => {
                    error!(layer = %layer_id, pass = name, error = %e, "Layer pass failed");
                }
            }
        }

        self.data_available = drawn;
        Ok(())
    }

    fn post_render(&mut self, canvas: &mut FrameCanvas, ctx: &FrameContext<'_>) -> FrameResult<()> {
        for legend in self.legends.drain(..) {
            legend.draw(canvas, ctx.typeface);
        }
        Ok(())
    }

    fn is_data_available(&self) -> bool {
        self.data_available
    }

    fn layer_type(&self) -> LayerType {
        self.preparation.layer_type()
    }
}

/// Local path of an input, downloading it when missing.
///
/// Inputs live under `<download dir>/<definition id>/`; other files in that
/// directory are superseded inputs and are deleted before a download.
fn local_copy(
    input: &InputMetadata,
    preparation: &dyn InputPreparation,
    ctx: &FrameContext<'_>,
) -> FrameResult<PathBuf> {
    let directory = ctx
        .download_directory()
        .join(safe_filename(&input.definition_id));
    std::fs::create_dir_all(&directory)?;

    let path = directory.join(input.filename());
    if !path.is_file() {
        remove_superseded(&directory, &path);
        info!(uri = %input.uri, path = %path.display(), format = preparation.name(), "Downloading input");
        ctx.services.fetcher.fetch(&input.uri, &path)?;
        preparation.after_download(&path)?;
    }
    Ok(path)
}

/// Delete every file of `directory` except `keep`.
pub fn remove_superseded(directory: &Path, keep: &Path) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path() != keep)
    {
        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                info!(path = %entry.path().display(), "Removed superseded input");
                removed += 1;
            }
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Cannot remove superseded input"),
        }
    }
    removed
}

/// Palette of a variable: inline colours, a built-in name, or a palette
/// file fetched into the download directory. Loaded palettes are kept.
pub fn load_palette(
    variable: &VariableConfig,
    palettes: &mut HashMap<String, Palette>,
    ctx: &FrameContext<'_>,
) -> FrameResult<Palette> {
    if !variable.colours.is_empty() {
        return Ok(Palette::from_hex_list(&variable.colours)?);
    }
    let Some(name) = variable.colour_palette.as_deref() else {
        return Ok(Palette::default_palette());
    };
    if let Some(palette) = palettes.get(name) {
        return Ok(palette.clone());
    }

    let palette = match Palette::named(name) {
        Some(palette) => palette,
        None => {
            let (source, inverted) = match name.strip_suffix("-inv") {
                Some(base) => (base, true),
                None => (name, false),
            };
            let path = fetch_to_directory(
                ctx.services.fetcher.as_ref(),
                source,
                &ctx.download_directory().join(PALETTE_DIRECTORY),
            )?;
            let text = std::fs::read_to_string(&path).map_err(|e| {
                FrameError::Style(format!("cannot read palette {}: {}", path.display(), e))
            })?;
            let palette = Palette::parse(&text)?;
            if inverted {
                palette.reversed()
            } else {
                palette
            }
        }
    };

    debug!(palette = %name, colours = palette.len(), "Loaded palette");
    palettes.insert(name.to_string(), palette.clone());
    Ok(palette)
}

/// Dataset variables drawn as arrows.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowVariables<'a> {
    pub config: &'a VariableConfig,
    pub direction: String,
    pub magnitude: Option<String>,
    pub metadata: &'a VariableMetadata,
}

/// Work out which variables feed the arrow field.
///
/// An `arrow_variable` is used when configured. Otherwise a vector
/// `variable` (two or more children) contributes its direction child. A
/// vector variable supplies direction and magnitude from its children; any
/// other variable is the direction itself. Variables missing from the input
/// draw no arrows.
pub fn arrow_variables<'a>(
    layer: &'a LayerConfig,
    input: &'a InputMetadata,
) -> Option<ArrowVariables<'a>> {
    let (config, metadata) = match (&layer.arrow_variable, &layer.variable) {
        (Some(config), _) => (config, input.variable(&config.id)?),
        (None, Some(config)) => {
            let vector = input
                .variable(&config.id)
                .filter(|m| m.children.len() >= 2)?;
            (config, vector.child_with_role(ROLE_DIRECTION)?)
        }
        (None, None) => return None,
    };

    let (direction, magnitude) = if metadata.children.len() >= 2 {
        (
            metadata
                .child_with_role(ROLE_DIRECTION)
                .map_or_else(|| metadata.id.clone(), |d| d.id.clone()),
            metadata.child_with_role(ROLE_MAGNITUDE).map(|mag| mag.id.clone()),
        )
    } else {
        (metadata.id.clone(), None)
    };

    Some(ArrowVariables {
        config,
        direction,
        magnitude,
        metadata,
    })
}

/// Arrow renderer for a variable's arrow settings.
///
/// The style defaults to dynamic fat arrows when a magnitude is drawn and
/// plain fat arrows otherwise.
pub fn arrow_renderer(config: &VariableConfig, has_magnitude: bool, scale: f32) -> ArrowFieldRenderer {
    let default_style = if has_magnitude {
        ArrowStyle::DynaFatArrow
    } else {
        ArrowStyle::FatArrow
    };
    let style = match config.arrow_style.as_deref().map(str::parse::<ArrowStyle>) {
        Some(Ok(style)) => style,
        Some(Err(e)) => {
            warn!(variable = %config.id, error = %e, "Invalid arrow style, using default");
            default_style
        }
        None => default_style,
    };

    ArrowFieldRenderer::new(
        style,
        Some(scale_px(config.arrow_size.unwrap_or(DEFAULT_ARROW_SIZE), scale)),
    )
    .with_colour(parse_or(config.arrow_colour.as_deref(), Color::BLACK))
    .with_background(Color::TRANSPARENT)
    .with_magnitude_domain(Some(MagnitudeDomain {
        min: config.scale_min.unwrap_or(DEFAULT_SCALE_MIN),
        max: config.scale_max.unwrap_or(DEFAULT_SCALE_MAX),
    }))
    .with_direction_turns(config.direction_turns)
    .with_north_angle(config.north_angle)
    .with_scale(scale)
}

fn visible_legend(variable: &VariableConfig) -> Option<&LegendConfig> {
    variable.legend.as_ref().filter(|legend| !legend.hidden)
}

/// One frame's reads from an open dataset.
struct Pass<'a, 'f> {
    dataset: &'a dyn GridDataset,
    setup: &'a LayerSetup,
    input: &'a InputFrame,
    ctx: &'a FrameContext<'f>,
    offset: (i32, i32),
    title: String,
}

impl<'a, 'f> Pass<'a, 'f> {
    fn domain(&self, metadata: Option<&VariableMetadata>) -> PlottingDomain {
        PlottingDomain {
            bbox: self.setup.bbox,
            width: self.setup.panel_width(),
            height: self.setup.panel_height(),
            height_value: resolve_depth(&self.setup.layer, self.ctx.request.target_depth, metadata),
            time: Some(
                self.input
                    .frame_time
                    .unwrap_or(self.ctx.request.time_range.start),
            ),
        }
    }

    fn legend_title(&self, legend: &LegendConfig, label: &str, units: Option<&str>) -> String {
        let configured: Vec<String> = legend
            .title
            .as_ref()
            .map(|t| t.text.iter().map(|line| self.ctx.expand(line)).collect())
            .unwrap_or_default();
        legend_title(&configured, label, units)
    }

    fn queue_legend(
        &self,
        content: LegendContent,
        legend: &LegendConfig,
        legends: &mut Vec<LegendRenderer>,
    ) -> FrameResult<()> {
        legends.push(LegendRenderer::prepare(
            content,
            legend,
            self.ctx.scale(),
            self.setup.panel_size,
            self.offset,
            self.ctx.typeface,
        )?);
        Ok(())
    }

    /// Coloured field of `variable`; vector variables draw their magnitude.
    fn raster(
        &self,
        palettes: &mut HashMap<String, Palette>,
        legends: &mut Vec<LegendRenderer>,
        canvas: &mut FrameCanvas,
    ) -> FrameResult<bool> {
        let Some(variable) = &self.setup.layer.variable else {
            return Ok(false);
        };

        let Some(metadata) = self.input.metadata.variable(&variable.id) else {
            debug!(variable = %variable.id, "Variable not in input, no raster");
            return Ok(false);
        };
        let metadata = if metadata.children.len() >= 2 {
            metadata.child_with_role(ROLE_MAGNITUDE).unwrap_or(metadata)
        } else {
            metadata
        };
        let read_id = metadata.id.as_str();

        let field = self.dataset.read_field(read_id, &self.domain(Some(metadata)))?;
        let palette = load_palette(variable, palettes, self.ctx)?;
        let scheme = ColourScheme::from_variable(variable, &palette);
        let image = render_field(&field, &scheme)?;

        canvas.create_layer(format!("{} (raster {})", self.title, variable.id));
        canvas.draw_pixmap(self.offset.0, self.offset.1, &image);

        if let Some(legend) = visible_legend(variable) {
            let label = variable.label.as_deref().unwrap_or(read_id);
            let units = variable
                .units
                .as_deref()
                .or(metadata.units.as_deref());
            let title = self.legend_title(legend, label, units);
            self.queue_legend(LegendContent::for_scheme(&scheme, title), legend, legends)?;
        }
        Ok(true)
    }

    fn arrows(
        &self,
        palettes: &mut HashMap<String, Palette>,
        legends: &mut Vec<LegendRenderer>,
        canvas: &mut FrameCanvas,
    ) -> FrameResult<bool> {
        let Some(arrows) = arrow_variables(&self.setup.layer, &self.input.metadata) else {
            return Ok(false);
        };
        let config = arrows.config;

        let domain = self.domain(Some(arrows.metadata));
        let direction = self.dataset.read_field(&arrows.direction, &domain)?;
        let magnitude = match &arrows.magnitude {
            Some(id) => Some(self.dataset.read_field(id, &domain)?),
            None => None,
        };

        let coloured = magnitude.is_some()
            && (!config.colours.is_empty() || config.colour_palette.is_some());
        let scheme = if coloured {
            Some(ColourScheme::from_variable(config, &load_palette(config, palettes, self.ctx)?))
        } else {
            None
        };

        let legend = visible_legend(config);
        let thresholds = legend.and_then(|l| l.arrow_thresholds.clone());
        let mut arrow_field = arrow_renderer(config, magnitude.is_some(), self.ctx.scale())
            .with_colour_scheme(scheme);
        if let Some(thresholds) = &thresholds {
            arrow_field = arrow_field.with_thresholds(
                thresholds.clone(),
                config.scale_max.unwrap_or(DEFAULT_SCALE_MAX),
            );
        }

        let image = arrow_field.render(&direction, magnitude.as_ref())?;
        canvas.create_layer(format!("{} (arrows {})", self.title, config.id));
        canvas.draw_pixmap(self.offset.0, self.offset.1, image.pixmap());

        if let (Some(legend), Some(thresholds)) = (legend, thresholds) {
            let label = config.label.as_deref().unwrap_or(&config.id);
            let units = config
                .units
                .as_deref()
                .or(arrows.metadata.units.as_deref());
            let content = LegendContent {
                colour_bar: ColourBar::ArrowThreshold { arrows: arrow_field },
                label_scale: LabelScale::ArrowThreshold(thresholds),
                title: self.legend_title(legend, label, units),
            };
            self.queue_legend(content, legend, legends)?;
        }
        Ok(true)
    }

    /// Additive blend of every true-colour variable.
    fn true_colour(&self, canvas: &mut FrameCanvas) -> FrameResult<bool> {
        let variables = &self.setup.layer.true_colour_variables;
        if variables.is_empty() {
            return Ok(false);
        }

        let mut composite = TrueColourComposite::new();
        let mut grids = Vec::with_capacity(variables.len());
        for variable in variables.values() {
            let palette = Palette::from_hex_list(&variable.hex_colours)?;
            let config = VariableConfig {
                id: variable.id.clone(),
                scale_min: variable.scale_min,
                scale_max: variable.scale_max,
                band_count: Some(TRUE_COLOUR_BAND_COUNT),
                ..Default::default()
            };
            composite.add_variable(&variable.id, ColourScheme::from_variable(&config, &palette));

            let metadata = self.input.metadata.variable(&variable.id);
            grids.push(self.dataset.read_field(&variable.id, &self.domain(metadata))?);
        }

        let image = composite.render(&grids)?;
        canvas.create_layer(format!("{} (true colour)", self.title));
        canvas.draw_pixmap(self.offset.0, self.offset.1, &image);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap as Map;

    fn metadata(variables: Vec<VariableMetadata>) -> InputMetadata {
        InputMetadata {
            definition_id: "downloads/gbr4".into(),
            dataset_id: "gbr4_2010-09".into(),
            uri: "file:///data/gbr4_2010-09.json".into(),
            last_modified: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            variables: variables.into_iter().map(|v| (v.id.clone(), v)).collect::<Map<_, _>>(),
        }
    }

    fn wind() -> VariableMetadata {
        let mut wind = VariableMetadata::new("wind");
        wind.children.insert("magnitude".into(), VariableMetadata::new("wspeed"));
        wind.children.insert("direction".into(), VariableMetadata::new("wdir"));
        wind
    }

    fn layer(json: serde_json::Value) -> LayerConfig {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_arrow_variable_with_children() {
        let input = metadata(vec![wind()]);
        let layer = layer(serde_json::json!({
            "id": "wind", "type": "NETCDF", "arrow_variable": { "id": "wind" }
        }));
        let arrows = arrow_variables(&layer, &input).unwrap();
        assert_eq!(arrows.direction, "wdir");
        assert_eq!(arrows.magnitude.as_deref(), Some("wspeed"));
    }

    #[test]
    fn test_vector_variable_without_arrow_config_uses_direction_only() {
        let input = metadata(vec![wind()]);
        let layer = layer(serde_json::json!({
            "id": "wind", "type": "NETCDF", "variable": { "id": "wind" }
        }));
        let arrows = arrow_variables(&layer, &input).unwrap();
        assert_eq!(arrows.direction, "wdir");
        assert_eq!(arrows.magnitude, None);
    }

    #[test]
    fn test_arrow_variable_missing_from_input_has_no_arrows() {
        let input = metadata(vec![VariableMetadata::new("temp")]);
        let layer = layer(serde_json::json!({
            "id": "wind", "type": "NETCDF", "arrow_variable": { "id": "wind" }
        }));
        assert!(arrow_variables(&layer, &input).is_none());
    }

    #[test]
    fn test_scalar_variable_has_no_arrows() {
        let input = metadata(vec![VariableMetadata::new("temp")]);
        let layer = layer(serde_json::json!({
            "id": "temp", "type": "NETCDF", "variable": { "id": "temp" }
        }));
        assert!(arrow_variables(&layer, &input).is_none());
    }

    #[test]
    fn test_arrow_style_defaults() {
        let config = VariableConfig {
            id: "wind".into(),
            ..Default::default()
        };
        assert_eq!(arrow_renderer(&config, true, 1.0).style(), ArrowStyle::DynaFatArrow);
        assert_eq!(arrow_renderer(&config, false, 1.0).style(), ArrowStyle::FatArrow);
        assert_eq!(arrow_renderer(&config, false, 2.0).arrow_size(), 40);

        let config = VariableConfig {
            id: "wind".into(),
            arrow_style: Some("tri_arrow".into()),
            ..Default::default()
        };
        assert_eq!(arrow_renderer(&config, true, 1.0).style(), ArrowStyle::TriArrow);
    }

    #[test]
    fn test_remove_superseded_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("gbr4_2010-10.json");
        std::fs::write(dir.path().join("gbr4_2010-09.json"), b"old").unwrap();
        std::fs::write(dir.path().join("gbr4_2010-08.json"), b"older").unwrap();
        std::fs::write(&keep, b"new").unwrap();

        assert_eq!(remove_superseded(dir.path(), &keep), 2);
        assert!(keep.is_file());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_grib2_after_download_drops_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("gfs.grb2");
        std::fs::write(&input, b"grib").unwrap();
        for index in Grib2Preparation::index_paths(&input) {
            std::fs::write(index, b"idx").unwrap();
        }

        Grib2Preparation.after_download(&input).unwrap();
        assert!(input.is_file());
        assert!(!dir.path().join("gfs.grb2.gbx9").exists());
        assert!(!dir.path().join("gfs.grb2.ncx4").exists());
    }
}
