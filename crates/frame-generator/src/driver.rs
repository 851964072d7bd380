//! Batch orchestration: every region, depth and time of a product.

use chrono::{DateTime, Utc};
use frame_common::{AnimateConfig, FrameError, FrameResult, FrameTimetableMap, RegionConfig};
use renderer::Typeface;
use tracing::{error, info, warn};

use crate::cache::LayerGeneratorCache;
use crate::compositor::{FrameCompositor, FrameOutcome};
use crate::context::{FrameRequest, Services};

/// Frame counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.rendered + self.skipped + self.failed
    }
}

/// Renders the frames of one product in timetable order.
///
/// The driver owns the layer generator cache; it is cleared when a run
/// starts so nothing leaks between invocations.
pub struct FrameSequenceDriver {
    config: AnimateConfig,
    timetables: FrameTimetableMap,
    services: Services,
    typeface: Typeface,
    cache: LayerGeneratorCache,
    region_filter: Option<String>,
    date_from: Option<DateTime<Utc>>,
    date_to: Option<DateTime<Utc>>,
}

impl FrameSequenceDriver {
    pub fn new(config: AnimateConfig, timetables: FrameTimetableMap, services: Services) -> Self {
        let date_from = config.start_date;
        let date_to = config.end_date;
        Self {
            config,
            timetables,
            services,
            typeface: Typeface::none(),
            cache: LayerGeneratorCache::new(),
            region_filter: None,
            date_from,
            date_to,
        }
    }

    pub fn with_typeface(mut self, typeface: Typeface) -> Self {
        self.typeface = typeface;
        self
    }

    /// Render a single region instead of all of them.
    pub fn with_region(mut self, region_id: Option<String>) -> Self {
        self.region_filter = region_id;
        self
    }

    /// Restrict frames to `[from, to]`. Bounds given here replace the ones
    /// in the configuration.
    pub fn with_date_range(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        if from.is_some() {
            self.date_from = from;
        }
        if to.is_some() {
            self.date_to = to;
        }
        self
    }

    pub fn cache(&self) -> &LayerGeneratorCache {
        &self.cache
    }

    /// Regions to render. An explicitly requested region must exist.
    pub fn regions(&self) -> FrameResult<Vec<RegionConfig>> {
        match &self.region_filter {
            Some(id) => self
                .config
                .region(id)
                .cloned()
                .map(|region| vec![region])
                .ok_or_else(|| FrameError::InvalidRegion(id.clone())),
            None => Ok(self.config.regions.clone()),
        }
    }

    /// Render every frame. Fatal errors end the run; any other frame
    /// failure is logged and counted.
    pub fn run(&mut self) -> FrameResult<RunSummary> {
        self.cache.clear();
        let regions = self.regions()?;
        let depths = self.config.target_heights_or_default();
        let mut summary = RunSummary::default();

        info!(
            product = %self.config.id,
            regions = regions.len(),
            depths = depths.len(),
            frames = self.timetables.len(),
            "Starting frame run"
        );

        if self.timetables.is_empty() {
            warn!(product = %self.config.id, "Frame timetable is empty, nothing to render");
        }

        let compositor = FrameCompositor::new(&self.config, &self.services, &self.typeface);

        for region in &regions {
            for depth in &depths {
                for (range, timetable) in self.timetables.iter() {
                    if !range.is_within(self.date_from, self.date_to) {
                        continue;
                    }

                    let request = FrameRequest::new(region.clone(), *depth, *range);
                    match compositor.render_frame(&request, Some(timetable), &mut self.cache) {
                        Ok(FrameOutcome::Rendered { .. }) => summary.rendered += 1,
                        Ok(FrameOutcome::Skipped) => summary.skipped += 1,
                        Err(e) if e.is_fatal() => {
                            error!(region = %region.id, start = %range.start, error = %e, "Aborting frame run");
                            return Err(e);
                        }
                        Err(e) => {
                            error!(region = %region.id, start = %range.start, error = %e, "Frame failed");
                            summary.failed += 1;
                        }
                    }
                }
            }
        }

        let stats = self.cache.stats();
        info!(
            product = %self.config.id,
            rendered = summary.rendered,
            skipped = summary.skipped,
            failed = summary.failed,
            cache_hits = stats.hits,
            cache_misses = stats.misses,
            "Frame run complete"
        );
        Ok(summary)
    }
}
