//! Geographic bounding boxes for regions and panels.

use serde::{Deserialize, Serialize};

/// A lon/lat bounding box (EPSG:4326, degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(alias = "west")]
    pub min_x: f64,
    #[serde(alias = "south")]
    pub min_y: f64,
    #[serde(alias = "east")]
    pub max_x: f64,
    #[serde(alias = "north")]
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Format as a WMS 1.1.1 BBOX parameter.
    pub fn to_wms_string(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Lon/lat of the centre of pixel `(i, j)` of a `width` x `height`
    /// north-up image covering this box.
    pub fn pixel_centre(&self, i: u32, j: u32, width: u32, height: u32) -> (f64, f64) {
        let lon = self.min_x + (i as f64 + 0.5) / width as f64 * self.width();
        let lat = self.max_y - (j as f64 + 0.5) / height as f64 * self.height();
        (lon, lat)
    }
}
