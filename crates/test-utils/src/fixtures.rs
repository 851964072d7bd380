//! Common test fixtures for frame rendering tests.
//!
//! This module provides pre-defined regions, times, input metadata and
//! gridded dataset documents.

/// Common bounding box definitions for testing.
pub mod bbox {
    use frame_common::BoundingBox;

    /// Four by four degree box matching [`super::datasets::unit_axes`]
    pub const UNIT: (f64, f64, f64, f64) = (0.0, 0.0, 4.0, 4.0);

    pub fn to_bbox(extent: (f64, f64, f64, f64)) -> BoundingBox {
        BoundingBox::new(extent.0, extent.1, extent.2, extent.3)
    }
}

/// Common time values for testing.
pub mod time {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use frame_common::TimeRange;

    pub fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2010, 9, 1, 0, 0, 0).unwrap()
    }

    /// Reference time plus `hours`.
    pub fn at_hour(hours: i64) -> DateTime<Utc> {
        reference_time() + Duration::hours(hours)
    }

    /// One-hour frame starting `hours` after the reference time.
    pub fn hourly_frame(hours: i64) -> TimeRange {
        TimeRange::new(at_hour(hours), at_hour(hours + 1))
    }
}

/// Region configurations.
pub mod regions {
    use frame_common::RegionConfig;

    use super::bbox;

    pub fn region(id: &str, extent: (f64, f64, f64, f64), width: u32, height: u32) -> RegionConfig {
        RegionConfig {
            id: id.to_string(),
            label: None,
            bbox: bbox::to_bbox(extent),
            width,
            height,
        }
    }

    /// 8x8 pixel panel over [`bbox::UNIT`].
    pub fn unit_region() -> RegionConfig {
        region("unit", bbox::UNIT, 8, 8)
    }
}

/// Gridded dataset documents readable by the JSON dataset opener.
pub mod datasets {
    use std::path::{Path, PathBuf};

    use chrono::{DateTime, Utc};
    use serde_json::json;

    /// Cell centres of a four by four one-degree grid.
    pub fn unit_axes() -> (Vec<f64>, Vec<f64>) {
        (vec![0.5, 1.5, 2.5, 3.5], vec![0.5, 1.5, 2.5, 3.5])
    }

    /// Serialize a dataset document. Values are ordered
    /// `[time][height][lat][lon]`.
    pub fn grid_document(
        lon: &[f64],
        lat: &[f64],
        times: &[DateTime<Utc>],
        heights: &[f64],
        variables: &[(&str, Vec<Option<f32>>)],
    ) -> String {
        let variables: serde_json::Map<String, serde_json::Value> = variables
            .iter()
            .map(|(id, values)| (id.to_string(), json!({ "values": values })))
            .collect();
        json!({
            "lon": lon,
            "lat": lat,
            "times": times,
            "heights": heights,
            "variables": variables,
        })
        .to_string()
    }

    /// Write a document into `dir` and return its path.
    pub fn write_document(dir: &Path, name: &str, document: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, document).expect("Failed to write dataset document");
        path
    }
}

/// Input metadata and frame timetables.
pub mod timetables {
    use std::collections::HashMap;

    use chrono::{DateTime, Utc};
    use frame_common::{FrameTimetable, InputFrame, InputMetadata, VariableMetadata};

    pub fn input_metadata(
        uri: &str,
        last_modified: DateTime<Utc>,
        variables: Vec<VariableMetadata>,
    ) -> InputMetadata {
        InputMetadata {
            definition_id: "test-source".to_string(),
            dataset_id: uri.rsplit('/').next().unwrap_or(uri).to_string(),
            uri: uri.to_string(),
            last_modified,
            variables: variables.into_iter().map(|v| (v.id.clone(), v)).collect(),
        }
    }

    /// Variable with a vertical domain.
    pub fn variable_with_heights(id: &str, heights: &[f64]) -> VariableMetadata {
        VariableMetadata {
            heights: heights.to_vec(),
            ..VariableMetadata::new(id)
        }
    }

    /// Timetable serving one layer from one input.
    pub fn single_layer(
        layer_id: &str,
        metadata: InputMetadata,
        frame_time: Option<DateTime<Utc>>,
    ) -> FrameTimetable {
        let mut layers = HashMap::new();
        layers.insert(
            layer_id.to_string(),
            vec![InputFrame {
                metadata,
                frame_time,
            }],
        );
        FrameTimetable { layers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_frame() {
        let range = time::hourly_frame(3);
        assert_eq!(range.start.to_rfc3339(), "2010-09-01T03:00:00+00:00");
        assert_eq!((range.end - range.start).num_hours(), 1);
    }

    #[test]
    fn test_grid_document_shape() {
        let (lon, lat) = datasets::unit_axes();
        let document = datasets::grid_document(&lon, &lat, &[], &[], &[("eta", vec![Some(1.0); 16])]);
        let value: serde_json::Value = serde_json::from_str(&document).unwrap();
        assert_eq!(value["variables"]["eta"]["values"].as_array().unwrap().len(), 16);
    }

    #[test]
    fn test_single_layer_timetable() {
        let metadata = timetables::input_metadata(
            "file:///data/gbr4_2010-09.json",
            time::reference_time(),
            vec![timetables::variable_with_heights("temp", &[-1.5, -12.0])],
        );
        let timetable = timetables::single_layer("temp", metadata, None);
        let input = timetable.input_for("temp").unwrap();
        assert_eq!(input.metadata.dataset_id, "gbr4_2010-09.json");
        assert_eq!(timetable.max_last_modified(), Some(time::reference_time()));
    }
}
