//! Tests for configuration and timetable loading from files.

use chrono::{TimeZone, Utc};
use frame_common::{
    AnimateConfig, FrameError, FrameTimetable, FrameTimetableMap, LayerType, MapFormat, TimeRange,
};

// ============================================================================
// AnimateConfig file loading
// ============================================================================

const YAML_CONFIG: &str = r##"
id: gbr4_v2_salt
start_date: 2010-09-01T00:00:00Z
canvas:
  background_colour: "#000000"
  texts:
    copyright:
      text: ["AIMS"]
      position: { right: 5, bottom: 5 }
regions:
  - id: qld
    label: Queensland
    bbox: { west: 142.0, south: -29.0, east: 155.0, north: -10.0 }
    width: 300
    height: 400
panels:
  - id: salt
    title:
      text: ["Salinity ${ctx.targetHeight}"]
    layers:
      - id: salt
        type: NETCDF
        input: downloads/gbr4_v2
        variable:
          id: salt
          scale_min: 32
          scale_max: 36
          legend:
            position: { top: 10, left: 10 }
      - id: reefs
        type: GEOJSON
        datasource: reefs.geojson
render:
  formats: [png, svg]
  video_frame_format: png
"##;

#[test]
fn test_load_yaml_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("salt.yml");
    std::fs::write(&path, YAML_CONFIG).unwrap();

    let config = AnimateConfig::from_file(&path).unwrap();
    assert_eq!(config.id, "gbr4_v2_salt");
    assert_eq!(config.canvas.background_colour, "#000000");
    assert_eq!(
        config.start_date,
        Some(Utc.with_ymd_and_hms(2010, 9, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(config.end_date, None);

    let region = config.region("qld").unwrap();
    assert_eq!(region.bbox.min_x, 142.0);
    assert_eq!(region.bbox.max_y, -10.0);

    let copyright = &config.canvas.texts["copyright"];
    assert_eq!(copyright.position.right(), Some(5));
    assert_eq!(copyright.position.left(), None);

    let layers = &config.panels[0].layers;
    assert_eq!(layers[0].layer_type, LayerType::NetCdf);
    assert_eq!(layers[1].layer_type, LayerType::GeoJson);
    let legend = layers[0].variable.as_ref().unwrap().legend.as_ref().unwrap();
    assert_eq!(legend.position.top(), Some(10));
    assert!(!legend.hidden);

    assert_eq!(config.render.formats, vec![MapFormat::Png, MapFormat::Svg]);
    assert_eq!(config.render.video_frame_format, Some(MapFormat::Png));
}

#[test]
fn test_load_json_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("product.config");
    std::fs::write(&path, r#"{ "id": "plain" }"#).unwrap();

    let config = AnimateConfig::from_file(&path).unwrap();
    assert_eq!(config.id, "plain");
    assert!(config.panels.is_empty());
    assert_eq!(config.render.scale, 1.0);
}

#[test]
fn test_missing_config_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AnimateConfig::from_file(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, FrameError::Config(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_unknown_layer_type_rejected() {
    let json = r#"{ "id": "p", "panels": [ { "id": "a", "layers": [ { "id": "x", "type": "SHAPEFILE" } ] } ] }"#;
    assert!(matches!(
        AnimateConfig::from_json(json),
        Err(FrameError::Config(_))
    ));
}

// ============================================================================
// Timetable file loading
// ============================================================================

const TIMETABLE_JSON: &str = r#"[
    {
        "range": { "start": "2010-09-01T01:00:00Z", "end": "2010-09-01T02:00:00Z" },
        "layers": {
            "salt": [
                {
                    "metadata": {
                        "definition_id": "downloads/gbr4_v2",
                        "dataset_id": "gbr4_2010-09",
                        "uri": "file:///data/gbr4_2010-09.nc",
                        "last_modified": "2020-01-01T00:00:00Z",
                        "variables": { "salt": { "id": "salt", "units": "PSU", "heights": [-1.5, -12.75] } }
                    }
                }
            ]
        }
    },
    {
        "range": { "start": "2010-09-01T00:00:00Z", "end": "2010-09-01T01:00:00Z" },
        "layers": {}
    }
]"#;

#[test]
fn test_load_timetable_file_in_time_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timetable.json");
    std::fs::write(&path, TIMETABLE_JSON).unwrap();

    let map = FrameTimetableMap::from_file(&path).unwrap();
    assert_eq!(map.len(), 2);

    let ranges: Vec<TimeRange> = map.iter().map(|(range, _)| *range).collect();
    assert!(ranges[0].start < ranges[1].start);

    let first: &FrameTimetable = map.get(&ranges[0]).unwrap();
    assert!(first.layers.is_empty());
    assert_eq!(first.max_last_modified(), None);

    let second = map.get(&ranges[1]).unwrap();
    let input = second.input_for("salt").unwrap();
    assert_eq!(input.metadata.filename(), "gbr4_2010-09.nc");
    let salt = input.metadata.variable("salt").unwrap();
    assert_eq!(salt.units.as_deref(), Some("PSU"));
    assert_eq!(salt.closest_height(Some(-10.0)), Some(-12.75));
}

#[test]
fn test_malformed_timetable_rejected() {
    assert!(FrameTimetableMap::from_json("{ \"range\": 1 }").is_err());
}
