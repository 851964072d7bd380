//! Gridded dataset access.
//!
//! A [`GridDataset`] turns a variable plus a [`PlottingDomain`] into a
//! [`FieldGrid`] of raw values, one per output pixel. The built-in
//! [`JsonGridDataset`] reads a small JSON document holding lon/lat axes,
//! times, heights and flat value arrays.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use frame_common::{BoundingBox, FrameError, FrameResult};
use renderer::FieldGrid;
use serde::Deserialize;
use tracing::debug;

const HEIGHT_TOLERANCE: f64 = 1e-6;

/// Where and when to sample a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct PlottingDomain {
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
    /// Depth to read; `None` reads the first (or only) level.
    pub height_value: Option<f64>,
    /// Time to read; `None` reads the first time step.
    pub time: Option<DateTime<Utc>>,
}

/// An opened gridded dataset.
pub trait GridDataset {
    /// File the dataset was opened from.
    fn path(&self) -> &Path;

    /// Sample `variable` over `domain`.
    ///
    /// # Returns
    /// A grid of `domain.width` x `domain.height` values, NaN where the
    /// dataset has no value. `FrameError::IncorrectDomain` when the time or
    /// depth is not part of the dataset.
    fn read_field(&self, variable: &str, domain: &PlottingDomain) -> FrameResult<FieldGrid>;
}

/// Opens dataset files.
pub trait DatasetOpener {
    fn open(&self, path: &Path) -> FrameResult<Box<dyn GridDataset>>;
}

#[derive(Debug, Deserialize)]
struct GridDocument {
    lon: Vec<f64>,
    lat: Vec<f64>,
    #[serde(default)]
    times: Vec<DateTime<Utc>>,
    #[serde(default)]
    heights: Vec<f64>,
    variables: HashMap<String, GridVariable>,
}

#[derive(Debug, Deserialize)]
struct GridVariable {
    /// Values ordered `[time][height][lat][lon]`; `null` is missing data.
    values: Vec<Option<f32>>,
}

/// A gridded dataset stored as JSON.
#[derive(Debug)]
pub struct JsonGridDataset {
    path: PathBuf,
    document: GridDocument,
}

impl JsonGridDataset {
    pub fn from_json(path: impl Into<PathBuf>, json: &str) -> FrameResult<Self> {
        let path = path.into();
        let document: GridDocument = serde_json::from_str(json)
            .map_err(|e| FrameError::Dataset(format!("{}: {}", path.display(), e)))?;

        let expected = document.times.len().max(1)
            * document.heights.len().max(1)
            * document.lat.len()
            * document.lon.len();
        for (id, variable) in &document.variables {
            if variable.values.len() != expected {
                return Err(FrameError::Dataset(format!(
                    "{}: variable '{}' has {} values, expected {}",
                    path.display(),
                    id,
                    variable.values.len(),
                    expected
                )));
            }
        }

        Ok(Self { path, document })
    }

    pub fn open(path: &Path) -> FrameResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| FrameError::Dataset(format!("{}: {}", path.display(), e)))?;
        Self::from_json(path, &json)
    }

    fn time_index(&self, time: Option<DateTime<Utc>>) -> FrameResult<usize> {
        match time {
            Some(time) if !self.document.times.is_empty() => self
                .document
                .times
                .iter()
                .position(|t| *t == time)
                .ok_or_else(|| FrameError::IncorrectDomain(format!("time {} not in dataset", time))),
            _ => Ok(0),
        }
    }

    fn height_index(&self, height: Option<f64>) -> FrameResult<usize> {
        match height {
            Some(height) if !self.document.heights.is_empty() => self
                .document
                .heights
                .iter()
                .position(|h| (h - height).abs() < HEIGHT_TOLERANCE)
                .ok_or_else(|| {
                    FrameError::IncorrectDomain(format!("height {} not in dataset", height))
                }),
            _ => Ok(0),
        }
    }
}

/// Index of the axis value closest to `value`, or `None` outside the axis
/// extent (plus half a cell on each side).
fn nearest_index(axis: &[f64], value: f64) -> Option<usize> {
    let (first, last) = (*axis.first()?, *axis.last()?);
    let half_cell = if axis.len() > 1 {
        ((last - first) / (axis.len() - 1) as f64).abs() / 2.0
    } else {
        0.5
    };
    let (low, high) = if first <= last { (first, last) } else { (last, first) };
    if value < low - half_cell || value > high + half_cell {
        return None;
    }

    axis.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - value).abs().total_cmp(&(*b - value).abs()))
        .map(|(index, _)| index)
}

impl GridDataset for JsonGridDataset {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_field(&self, variable: &str, domain: &PlottingDomain) -> FrameResult<FieldGrid> {
        let values = &self
            .document
            .variables
            .get(variable)
            .ok_or_else(|| FrameError::VariableNotFound(variable.to_string()))?
            .values;

        let t = self.time_index(domain.time)?;
        let h = self.height_index(domain.height_value)?;
        let (nlon, nlat) = (self.document.lon.len(), self.document.lat.len());
        let level_offset = (t * self.document.heights.len().max(1) + h) * nlat * nlon;

        let columns: Vec<Option<usize>> = (0..domain.width)
            .map(|i| {
                let (lon, _) = domain.bbox.pixel_centre(i, 0, domain.width, domain.height);
                nearest_index(&self.document.lon, lon)
            })
            .collect();
        let rows: Vec<Option<usize>> = (0..domain.height)
            .map(|j| {
                let (_, lat) = domain.bbox.pixel_centre(0, j, domain.width, domain.height);
                nearest_index(&self.document.lat, lat)
            })
            .collect();

        let mut field = Vec::with_capacity((domain.width * domain.height) as usize);
        for row in &rows {
            for column in &columns {
                let value = match (row, column) {
                    (Some(r), Some(c)) => values[level_offset + r * nlon + c].unwrap_or(f32::NAN),
                    _ => f32::NAN,
                };
                field.push(value);
            }
        }

        debug!(
            variable = %variable,
            time_index = t,
            height_index = h,
            width = domain.width,
            height = domain.height,
            "Sampled field"
        );
        Ok(FieldGrid::new(domain.width, domain.height, field)?)
    }
}

/// Opens [`JsonGridDataset`] files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDatasetOpener;

impl DatasetOpener for JsonDatasetOpener {
    fn open(&self, path: &Path) -> FrameResult<Box<dyn GridDataset>> {
        Ok(Box::new(JsonGridDataset::open(path)?))
    }
}

/// Holds at most one open dataset, replaced when a different file is needed.
#[derive(Default)]
pub struct DatasetSlot {
    current: Option<Box<dyn GridDataset>>,
    opens: usize,
}

impl DatasetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dataset for `path`, opening it when the slot holds another file.
    pub fn get_or_open(
        &mut self,
        path: &Path,
        opener: &dyn DatasetOpener,
    ) -> FrameResult<&dyn GridDataset> {
        let stale = self
            .current
            .as_ref()
            .map_or(true, |dataset| dataset.path() != path);

        if stale {
            // Close the previous dataset before opening the next.
            self.current = None;
            debug!(path = %path.display(), "Opening dataset");
            self.current = Some(opener.open(path)?);
            self.opens += 1;
        }

        self.current
            .as_deref()
            .ok_or_else(|| FrameError::Dataset(format!("{} not open", path.display())))
    }

    /// Number of times a dataset was opened into this slot.
    pub fn opens(&self) -> usize {
        self.opens
    }
}
