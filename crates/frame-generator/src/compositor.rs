//! Composes one frame: background, panels of layers, borders, titles,
//! texts and legends, then writes every configured output format.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use frame_common::{
    scale_f32, scale_px, AnimateConfig, FrameError, FrameResult, FrameTimetable, MapFormat,
    PanelConfig, PositionConfig, TextConfig,
};
use renderer::color::parse_or;
use renderer::encode::encode_to_file;
use renderer::{Color, FrameCanvas, TextAlign, TextStyle, Typeface};
use tracing::{debug, error, info, warn};

use crate::cache::{LayerGeneratorCache, LayerIdentity};
use crate::context::{canvas_size, resolve_depth, FrameContext, FrameRequest, Services};
use crate::layers::no_data::draw_no_data;
use crate::layers::{panel_title_prefix, DataLayerGenerator, LayerGenerator};

const DEFAULT_TITLE_FONT_SIZE: i32 = 30;
const DEFAULT_TEXT_FONT_SIZE: i32 = 20;
const DEFAULT_TEXT_COLOUR: Color = Color::BLACK;
const DEFAULT_PANEL_BACKGROUND: Color = Color::WHITE;
const DEFAULT_BORDER_COLOUR: Color = Color::BLACK;

/// What happened to a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Every output was already newer than the frame's inputs.
    Skipped,
    Rendered { files: Vec<PathBuf> },
}

/// Anchor and alignment of a text block inside an area of `width` x
/// `height` pixels.
///
/// Unset positions centre the text. Right wins over left and bottom over
/// top.
pub fn text_anchor(position: &PositionConfig, width: i32, height: i32, scale: f32) -> (i32, i32, TextAlign) {
    let (x, align) = match (position.right(), position.left()) {
        (Some(right), _) => (width - scale_px(right, scale), TextAlign::Right),
        (None, Some(left)) => (scale_px(left, scale), TextAlign::Left),
        (None, None) => (width / 2, TextAlign::Centre),
    };
    let y = match (position.bottom(), position.top()) {
        (Some(bottom), _) => height - scale_px(bottom, scale),
        (None, Some(top)) => scale_px(top, scale),
        (None, None) => height / 2,
    };
    (x, y, align)
}

/// Anchor of a panel title relative to the panel's top-left corner.
///
/// Titles default to centred on the panel's top edge. `top` lifts the title
/// above the panel and `bottom` moves it below.
pub fn title_anchor(position: &PositionConfig, width: i32, height: i32, scale: f32) -> (i32, i32, TextAlign) {
    let (x, align) = match (position.right(), position.left()) {
        (Some(right), _) => (width - scale_px(right, scale), TextAlign::Right),
        (None, Some(left)) => (scale_px(left, scale), TextAlign::Left),
        (None, None) => (width / 2, TextAlign::Centre),
    };
    let y = match (position.bottom(), position.top()) {
        (Some(bottom), _) => height + scale_px(bottom, scale),
        (None, Some(top)) => -scale_px(top, scale),
        (None, None) => 0,
    };
    (x, y, align)
}

/// Renders frames for one product.
pub struct FrameCompositor<'a> {
    config: &'a AnimateConfig,
    services: &'a Services,
    typeface: &'a Typeface,
}

impl<'a> FrameCompositor<'a> {
    pub fn new(config: &'a AnimateConfig, services: &'a Services, typeface: &'a Typeface) -> Self {
        Self {
            config,
            services,
            typeface,
        }
    }

    /// Output file of every raster format. SVG cannot be rendered and is
    /// left out.
    pub fn frame_paths(&self, request: &FrameRequest) -> Vec<(MapFormat, PathBuf)> {
        self.config
            .render
            .formats
            .iter()
            .filter(|format| {
                if **format == MapFormat::Svg {
                    warn!(format = format.extension(), "Unsupported frame format, skipping");
                    false
                } else {
                    true
                }
            })
            .map(|format| {
                let path = request.frame_path(
                    &self.config.render.frame_directory,
                    &self.config.id,
                    *format,
                );
                (*format, path)
            })
            .collect()
    }

    /// True when every output exists and is no older than the newest input.
    pub fn is_fresh(paths: &[(MapFormat, PathBuf)], timetable: Option<&FrameTimetable>) -> bool {
        let newest_input = timetable.and_then(|t| t.max_last_modified());

        paths.iter().all(|(_, path)| {
            let modified = std::fs::metadata(path).and_then(|m| m.modified());
            match (modified, newest_input) {
                (Ok(modified), Some(newest)) => DateTime::<Utc>::from(modified) >= newest,
                (Ok(_), None) => true,
                (Err(_), _) => false,
            }
        })
    }

    /// Render one frame unless its outputs are up to date.
    ///
    /// # Arguments
    /// * `request` - Region, depth and time of the frame
    /// * `timetable` - Inputs of the frame, if any
    /// * `cache` - Generators shared across the run
    ///
    /// # Returns
    /// The outcome, or an error when the frame could not be written. Layer
    /// failures are logged and never returned.
    pub fn render_frame(
        &self,
        request: &FrameRequest,
        timetable: Option<&FrameTimetable>,
        cache: &mut LayerGeneratorCache,
    ) -> FrameResult<FrameOutcome> {
        let paths = self.frame_paths(request);
        if Self::is_fresh(&paths, timetable) {
            info!(
                region = %request.region.id,
                start = %request.time_range.start,
                "Frame up to date, skipping"
            );
            return Ok(FrameOutcome::Skipped);
        }

        for (_, path) in &paths {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| FrameError::OutputDirectory {
                    path: parent.display().to_string(),
                    message: e.to_string(),
                })?;
            }
        }

        let ctx = FrameContext {
            config: self.config,
            request,
            timetable,
            services: self.services,
            typeface: self.typeface,
            layer_heights: self.layer_heights(request, timetable),
        };

        let canvas = self.compose(&ctx, cache)?;
        let pixmap = canvas.into_pixmap();

        let mut files = Vec::with_capacity(paths.len());
        for (format, path) in &paths {
            encode_to_file(&pixmap, *format, path)?;
            files.push(path.clone());
        }
        info!(
            region = %request.region.id,
            start = %request.time_range.start,
            files = files.len(),
            "Rendered frame"
        );

        self.upload_video_frame(&paths)?;
        Ok(FrameOutcome::Rendered { files })
    }

    /// Resolved depth of every gridded layer with an input for this frame.
    fn layer_heights(
        &self,
        request: &FrameRequest,
        timetable: Option<&FrameTimetable>,
    ) -> std::collections::BTreeMap<String, f64> {
        let mut heights = std::collections::BTreeMap::new();
        let Some(timetable) = timetable else {
            return heights;
        };

        for layer in self.config.panels.iter().flat_map(|p| &p.layers) {
            if !layer.layer_type.is_gridded() {
                continue;
            }
            let Some(input) = timetable.input_for(&layer.id) else {
                continue;
            };
            let variable = layer
                .variable
                .as_ref()
                .or(layer.arrow_variable.as_ref())
                .and_then(|v| input.metadata.variable(&v.id));
            if let Some(depth) = resolve_depth(layer, request.target_depth, variable) {
                heights.insert(layer.id.clone(), depth);
            }
        }
        heights
    }

    fn compose(&self, ctx: &FrameContext<'_>, cache: &mut LayerGeneratorCache) -> FrameResult<FrameCanvas> {
        let scale = ctx.scale();
        let (width, height) = canvas_size(self.config, &ctx.request.region);
        let mut canvas = FrameCanvas::new(width, height)?;

        canvas.create_layer("Background");
        canvas.fill(parse_or(
            Some(self.config.canvas.background_colour.as_str()),
            DEFAULT_PANEL_BACKGROUND,
        ));

        let between = scale_px(self.config.canvas.padding_between_panels, scale);
        let top = scale_px(self.config.canvas.padding.top, scale);
        let mut left = scale_px(self.config.canvas.padding.left, scale);
        let mut offsets = Vec::with_capacity(self.config.panels.len());
        for panel in &self.config.panels {
            offsets.push((left, top));
            left += ctx.scaled_panel_size(panel).0 + between;
        }

        let mut used: Vec<LayerIdentity> = Vec::new();
        for (panel, offset) in self.config.panels.iter().zip(&offsets) {
            self.render_panel(&mut canvas, panel, *offset, ctx, cache, &mut used);
        }

        for (panel, offset) in self.config.panels.iter().zip(&offsets) {
            let size = ctx.scaled_panel_size(panel);
            for text in panel.texts.values() {
                self.draw_text_block(&mut canvas, text, *offset, size, ctx);
            }
        }

        for text in self.config.canvas.texts.values() {
            self.draw_text_block(&mut canvas, text, (0, 0), (width as i32, height as i32), ctx);
        }

        // Generators shared by several panels hold the legends of each.
        for identity in &used {
            if let Some(generator) = cache.get_mut(identity) {
                if let Err(e) = generator.post_render(&mut canvas, ctx) {
                    error!(identity = %identity, error = %e, "Deferred layer drawing failed");
                }
            }
        }

        Ok(canvas)
    }

    fn render_panel(
        &self,
        canvas: &mut FrameCanvas,
        panel: &PanelConfig,
        offset: (i32, i32),
        ctx: &FrameContext<'_>,
        cache: &mut LayerGeneratorCache,
        used: &mut Vec<LayerIdentity>,
    ) {
        let scale = ctx.scale();
        let (width, height) = ctx.scaled_panel_size(panel);
        let prefix = panel_title_prefix(panel, ctx);

        canvas.create_layer(format!("{} background", prefix));
        canvas.fill_rect(
            offset.0,
            offset.1,
            width,
            height,
            parse_or(panel.background_colour.as_deref(), DEFAULT_PANEL_BACKGROUND),
        );
        canvas.set_clip(offset.0, offset.1, width, height);

        let mut data_available = false;
        for layer in &panel.layers {
            let identity = match LayerIdentity::for_layer(layer, &ctx.request.region, ctx.panel_size(panel)) {
                Ok(identity) => identity,
                Err(e) => {
                    error!(panel = %panel.id, layer = %layer.id, error = %e, "Cannot identify layer");
                    continue;
                }
            };

            let generator =
                cache.get_or_create(&identity, || LayerGenerator::for_type(layer.layer_type));
            generator.initialize(panel, layer, ctx);
            if let Err(e) = generator.render(canvas, offset, ctx) {
                error!(panel = %panel.id, layer = %layer.id, error = %e, "Layer not rendered");
            }
            data_available |= generator.is_data_available();

            if !used.contains(&identity) {
                used.push(identity);
            }
        }

        if !data_available {
            debug!(panel = %panel.id, "No data in panel");
            draw_no_data(canvas, &prefix, offset, (width, height), scale, ctx.typeface);
        }
        canvas.clear_clip();

        if panel.border_width > 0 {
            canvas.create_layer(format!("{} border", prefix));
            canvas.stroke_rect(
                offset.0,
                offset.1,
                width,
                height,
                parse_or(panel.border_colour.as_deref(), DEFAULT_BORDER_COLOUR),
                scale_f32(panel.border_width as f32, scale),
            );
        }

        if let Some(title) = panel.title.as_ref().filter(|t| !t.hidden) {
            let (x, y, align) = title_anchor(&title.position, width, height, scale);
            let style = text_style(title, DEFAULT_TITLE_FONT_SIZE, true, scale);
            canvas.create_layer(format!("{} title", prefix));
            self.draw_lines(canvas, title, (offset.0 + x, offset.1 + y), align, &style, ctx);
        }
    }

    fn draw_text_block(
        &self,
        canvas: &mut FrameCanvas,
        text: &TextConfig,
        offset: (i32, i32),
        area: (i32, i32),
        ctx: &FrameContext<'_>,
    ) {
        if text.hidden {
            return;
        }
        let (x, y, align) = text_anchor(&text.position, area.0, area.1, ctx.scale());
        let style = text_style(text, DEFAULT_TEXT_FONT_SIZE, false, ctx.scale());
        self.draw_lines(canvas, text, (offset.0 + x, offset.1 + y), align, &style, ctx);
    }

    /// Draw each line below the previous one, the first with its baseline at
    /// `anchor`.
    fn draw_lines(
        &self,
        canvas: &mut FrameCanvas,
        text: &TextConfig,
        anchor: (i32, i32),
        align: TextAlign,
        style: &TextStyle,
        ctx: &FrameContext<'_>,
    ) {
        let line_height = self.typeface.line_height(style);
        for (index, line) in text.text.iter().enumerate() {
            canvas.draw_text(
                &ctx.expand(line),
                anchor.0,
                anchor.1 + index as i32 * line_height,
                style,
                align,
                self.typeface,
            );
        }
    }

    fn upload_video_frame(&self, paths: &[(MapFormat, PathBuf)]) -> FrameResult<()> {
        let (Some(format), Some(uploader)) = (
            self.config.render.video_frame_format,
            self.services.uploader.as_deref(),
        ) else {
            return Ok(());
        };

        let Some((_, path)) = paths.iter().find(|(f, _)| *f == format) else {
            warn!(format = format.extension(), "Video frame format is not rendered");
            return Ok(());
        };
        let key = path
            .strip_prefix(&self.config.render.frame_directory)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        uploader.upload(path, &key)
    }
}

fn text_style(text: &TextConfig, default_size: i32, default_bold: bool, scale: f32) -> TextStyle {
    TextStyle::new(
        scale_px(text.font_size.unwrap_or(default_size), scale) as f32,
        parse_or(text.font_colour.as_deref(), DEFAULT_TEXT_COLOUR),
    )
    .bold(text.bold.unwrap_or(default_bold))
}
