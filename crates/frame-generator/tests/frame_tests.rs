//! End-to-end frame rendering through the driver and compositor.

use std::path::{Path, PathBuf};

use frame_common::{
    AnimateConfig, FrameError, FrameTimetable, FrameTimetableMap, LayerConfig, TimeRange,
};
use frame_generator::layers::LayerGenerator;
use frame_generator::{
    FrameCompositor, FrameOutcome, FrameRequest, FrameSequenceDriver, LayerGeneratorCache,
    LayerIdentity, RunSummary, Services,
};
use renderer::Typeface;
use test_utils::{datasets, dataset_values, regions, time, timetables};

const PRODUCT: &str = "gbr4_eta";

fn config(root: &Path, regions_json: &str, layers_json: &str) -> AnimateConfig {
    let json = format!(
        r##"{{
            "id": "{product}",
            "canvas": {{ "background_colour": "#00ff00", "padding": {{}}, "padding_between_panels": 0 }},
            "regions": {regions},
            "panels": [
                {{ "id": "eta", "background_colour": "#000000", "border_width": 0, "layers": {layers} }}
            ],
            "render": {{
                "frame_directory": "{frames}",
                "download_directory": "{downloads}",
                "formats": ["png"]
            }}
        }}"##,
        product = PRODUCT,
        regions = regions_json,
        layers = layers_json,
        frames = root.join("frames").display(),
        downloads = root.join("downloads").display(),
    );
    AnimateConfig::from_json(&json).unwrap()
}

const UNIT_REGION: &str = r#"[{ "id": "unit", "bbox": { "min_x": 0.0, "min_y": 0.0, "max_x": 4.0, "max_y": 4.0 }, "width": 8, "height": 8 }]"#;

const ETA_LAYER: &str = r##"[{
    "id": "eta",
    "type": "NETCDF",
    "variable": { "id": "eta", "scale_min": 0, "scale_max": 31, "colours": ["#ff0000", "#0000ff"] }
}]"##;

/// Dataset with hourly `eta` fields at hours 0 and 1.
fn write_dataset(root: &Path) -> PathBuf {
    let (lon, lat) = datasets::unit_axes();
    let document = datasets::grid_document(
        &lon,
        &lat,
        &[time::at_hour(0), time::at_hour(1)],
        &[],
        &[("eta", dataset_values(16, 2, 0.0, 31.0, &[]))],
    );
    std::fs::create_dir_all(root.join("source")).unwrap();
    datasets::write_document(&root.join("source"), "gbr4_2010-09.json", &document)
}

fn eta_timetables(dataset: &Path, hours: &[i64]) -> FrameTimetableMap {
    let mut map = FrameTimetableMap::new();
    for hour in hours {
        let metadata = timetables::input_metadata(
            &dataset.display().to_string(),
            time::reference_time(),
            vec![frame_common::VariableMetadata::new("eta")],
        );
        map.insert(
            time::hourly_frame(*hour),
            timetables::single_layer("eta", metadata, None),
        );
    }
    map
}

fn frame_file(root: &Path, region: &str, range: &TimeRange) -> PathBuf {
    root.join("frames")
        .join(PRODUCT)
        .join(region)
        .join("noHeight")
        .join(format!("frame_{}.png", range.start.format("%Y-%m-%d_%H-%M-%S")))
}

fn centre_pixel(path: &Path) -> [u8; 4] {
    let image = image::open(path).unwrap().to_rgba8();
    image.get_pixel(image.width() / 2, image.height() / 2).0
}

fn is_banner_grey(pixel: [u8; 4]) -> bool {
    pixel[0] > 150 && pixel[0] == pixel[1] && pixel[1] == pixel[2]
}

// ============================================================================
// Driver runs
// ============================================================================

#[test]
fn test_renders_data_frames() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);

    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[0, 1]), Services::local());
    let summary = driver.run().unwrap();
    assert_eq!(
        summary,
        RunSummary {
            rendered: 2,
            skipped: 0,
            failed: 0
        }
    );

    let frame = frame_file(dir.path(), "unit", &time::hourly_frame(0));
    assert!(frame.is_file());
    let pixel = centre_pixel(&frame);
    assert_eq!(pixel[3], 255);
    assert!(pixel[1] < 60, "expected a red-blue data colour, got {:?}", pixel);
    assert!(!is_banner_grey(pixel));

    // Input copied under the download directory, keyed by source.
    assert!(dir
        .path()
        .join("downloads/test-source/gbr4_2010-09.json")
        .is_file());
}

#[test]
fn test_generator_and_dataset_reused_across_frames() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);

    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[0, 1]), Services::local());
    driver.run().unwrap();

    let stats = driver.cache().stats();
    assert_eq!((stats.misses, stats.hits, stats.entries), (1, 1, 1));

    let layers: Vec<LayerConfig> = serde_json::from_str(ETA_LAYER).unwrap();
    let identity = LayerIdentity::for_layer(&layers[0], &regions::unit_region(), (8, 8)).unwrap();
    match driver.cache().get(&identity) {
        Some(LayerGenerator::Gridded(generator)) => {
            assert_eq!(generator.dataset_slot().opens(), 1);
        }
        _ => panic!("expected a cached gridded generator"),
    }
}

#[test]
fn test_second_run_skips_fresh_frames() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);

    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[0]), Services::local());
    assert_eq!(driver.run().unwrap().rendered, 1);

    let frame = frame_file(dir.path(), "unit", &time::hourly_frame(0));
    let written = std::fs::metadata(&frame).unwrap().modified().unwrap();

    let summary = driver.run().unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.rendered, 0);
    assert_eq!(std::fs::metadata(&frame).unwrap().modified().unwrap(), written);
}

#[test]
fn test_date_bounds_filter_frames() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);

    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[0, 1]), Services::local())
            .with_date_range(Some(time::at_hour(1)), None);
    assert_eq!(driver.run().unwrap().total(), 1);
    assert!(!frame_file(dir.path(), "unit", &time::hourly_frame(0)).exists());
    assert!(frame_file(dir.path(), "unit", &time::hourly_frame(1)).exists());
}

#[test]
fn test_invalid_region_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);

    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[0]), Services::local())
            .with_region(Some("wa".into()));
    assert!(matches!(driver.run(), Err(FrameError::InvalidRegion(_))));
    assert!(!dir.path().join("frames").exists());
}

// ============================================================================
// No-data banner
// ============================================================================

#[test]
fn test_banner_when_layer_has_no_input() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);

    let mut map = FrameTimetableMap::new();
    map.insert(time::hourly_frame(0), FrameTimetable::default());

    let mut driver = FrameSequenceDriver::new(config, map, Services::local());
    assert_eq!(driver.run().unwrap().rendered, 1);

    let pixel = centre_pixel(&frame_file(dir.path(), "unit", &time::hourly_frame(0)));
    assert!(is_banner_grey(pixel), "expected the banner, got {:?}", pixel);
}

#[test]
fn test_banner_when_time_not_in_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);

    // Hour 5 is outside the dataset's time axis.
    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[5]), Services::local());
    let summary = driver.run().unwrap();
    assert_eq!((summary.rendered, summary.failed), (1, 0));

    let pixel = centre_pixel(&frame_file(dir.path(), "unit", &time::hourly_frame(5)));
    assert!(is_banner_grey(pixel), "expected the banner, got {:?}", pixel);
}

#[test]
fn test_banner_when_variable_not_in_input() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let layers = r##"[{ "id": "eta", "type": "NETCDF", "variable": { "id": "salt", "colours": ["#ff0000", "#0000ff"] } }]"##;
    let config = config(dir.path(), UNIT_REGION, layers);

    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[0]), Services::local());
    let summary = driver.run().unwrap();
    assert_eq!((summary.rendered, summary.failed), (1, 0));

    let pixel = centre_pixel(&frame_file(dir.path(), "unit", &time::hourly_frame(0)));
    assert!(is_banner_grey(pixel), "expected the banner, got {:?}", pixel);
}

#[test]
fn test_broken_layer_does_not_fail_frame() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let layers = r##"[
        { "id": "missing", "type": "NETCDF", "variable": { "id": "salt" } },
        { "id": "eta", "type": "NETCDF", "variable": { "id": "eta", "colours": ["#ff0000", "#0000ff"] } }
    ]"##;
    let config = config(dir.path(), UNIT_REGION, layers);

    let mut map = eta_timetables(&dataset, &[0]);
    // Point the "missing" layer at a file that does not exist.
    let mut timetable = map.get(&time::hourly_frame(0)).cloned().unwrap();
    let mut broken = timetable.layers["eta"].clone();
    broken[0].metadata.uri = dir.path().join("nowhere.json").display().to_string();
    broken[0].metadata.definition_id = "other-source".into();
    timetable.layers.insert("missing".into(), broken);
    map.insert(time::hourly_frame(0), timetable);

    let mut driver = FrameSequenceDriver::new(config, map, Services::local());
    assert_eq!(driver.run().unwrap().rendered, 1);

    let pixel = centre_pixel(&frame_file(dir.path(), "unit", &time::hourly_frame(0)));
    assert!(!is_banner_grey(pixel));
}

// ============================================================================
// Overlays
// ============================================================================

#[test]
fn test_overlay_cached_per_region_and_never_data() {
    let dir = tempfile::tempdir().unwrap();
    let sites = dir.path().join("sites.csv");
    std::fs::write(&sites, "name,lon,lat\nA,2.0,2.0\n").unwrap();

    let regions_json = r#"[
        { "id": "a", "bbox": { "min_x": 0.0, "min_y": 0.0, "max_x": 4.0, "max_y": 4.0 }, "width": 8, "height": 8 },
        { "id": "b", "bbox": { "min_x": 0.0, "min_y": 0.0, "max_x": 4.0, "max_y": 4.0 }, "width": 8, "height": 8 }
    ]"#;
    let layers = format!(
        r#"[{{ "id": "sites", "type": "CSV", "datasource": "{}" }}]"#,
        sites.display()
    );
    let config = config(dir.path(), regions_json, &layers);

    let mut map = FrameTimetableMap::new();
    map.insert(time::hourly_frame(0), FrameTimetable::default());
    map.insert(time::hourly_frame(1), FrameTimetable::default());

    let mut driver = FrameSequenceDriver::new(config, map, Services::local());
    assert_eq!(driver.run().unwrap().rendered, 4);

    let stats = driver.cache().stats();
    assert_eq!((stats.entries, stats.misses, stats.hits), (2, 2, 2));

    // Overlays are not data: the banner still covers the panel.
    let pixel = centre_pixel(&frame_file(dir.path(), "a", &time::hourly_frame(0)));
    assert_eq!(pixel[3], 255);
}

// ============================================================================
// Panels
// ============================================================================

fn two_panel_config(root: &Path, panels_json: &str) -> AnimateConfig {
    let json = format!(
        r##"{{
            "id": "{product}",
            "canvas": {{ "background_colour": "#00ff00", "padding": {{}}, "padding_between_panels": 0 }},
            "regions": {regions},
            "panels": {panels},
            "render": {{
                "frame_directory": "{frames}",
                "download_directory": "{downloads}",
                "formats": ["png"]
            }}
        }}"##,
        product = PRODUCT,
        regions = UNIT_REGION,
        panels = panels_json,
        frames = root.join("frames").display(),
        downloads = root.join("downloads").display(),
    );
    AnimateConfig::from_json(&json).unwrap()
}

fn pixel_at(path: &Path, x: u32, y: u32) -> [u8; 4] {
    image::open(path).unwrap().to_rgba8().get_pixel(x, y).0
}

const ETA_WITH_LEGEND: &str = r##"[{
    "id": "eta",
    "type": "NETCDF",
    "variable": {
        "id": "eta", "scale_min": 0, "scale_max": 31,
        "colours": ["#ff0000", "#0000ff"],
        "legend": {}
    }
}]"##;

#[test]
fn test_shared_layer_draws_legend_in_every_panel() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let panels = format!(
        r#"[
            {{ "id": "left", "border_width": 0, "layers": {layers} }},
            {{ "id": "right", "border_width": 0, "layers": {layers} }}
        ]"#,
        layers = ETA_WITH_LEGEND
    );
    let config = two_panel_config(dir.path(), &panels);

    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[0]), Services::local());
    assert_eq!(driver.run().unwrap().rendered, 1);
    assert_eq!(driver.cache().stats().entries, 1);

    // Legends sit at each panel's top-left corner on a white background.
    let frame = frame_file(dir.path(), "unit", &time::hourly_frame(0));
    assert_eq!(pixel_at(&frame, 1, 1), [255, 255, 255, 255]);
    assert_eq!(pixel_at(&frame, 9, 1), [255, 255, 255, 255]);
}

#[test]
fn test_panel_width_overrides_region_width() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let panels = format!(
        r#"[
            {{ "id": "small", "width": 4, "border_width": 0, "layers": {layers} }},
            {{ "id": "full", "border_width": 0, "layers": {layers} }}
        ]"#,
        layers = ETA_LAYER
    );
    let config = two_panel_config(dir.path(), &panels);

    let mut driver =
        FrameSequenceDriver::new(config, eta_timetables(&dataset, &[0]), Services::local());
    assert_eq!(driver.run().unwrap().rendered, 1);

    let frame = frame_file(dir.path(), "unit", &time::hourly_frame(0));
    let image = image::open(&frame).unwrap();
    assert_eq!((image.width(), image.height()), (12, 8));

    // The small panel is half height; the canvas shows below it.
    assert_eq!(pixel_at(&frame, 1, 6), [0, 255, 0, 255]);
    assert_ne!(pixel_at(&frame, 6, 6), [0, 255, 0, 255]);
}

// ============================================================================
// Compositor freshness
// ============================================================================

#[test]
fn test_fresh_output_is_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);
    let services = Services::local();
    let typeface = Typeface::none();
    let compositor = FrameCompositor::new(&config, &services, &typeface);

    let range = time::hourly_frame(0);
    let frame = frame_file(dir.path(), "unit", &range);
    std::fs::create_dir_all(frame.parent().unwrap()).unwrap();
    std::fs::write(&frame, b"existing").unwrap();

    let map = eta_timetables(&dataset, &[0]);
    let request = FrameRequest::new(regions::unit_region(), None, range);
    let mut cache = LayerGeneratorCache::new();

    let outcome = compositor
        .render_frame(&request, map.get(&range), &mut cache)
        .unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped);
    assert_eq!(std::fs::read(&frame).unwrap(), b"existing");
    assert!(cache.is_empty());
}

#[test]
fn test_output_older_than_input_is_rendered() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = write_dataset(dir.path());
    let config = config(dir.path(), UNIT_REGION, ETA_LAYER);
    let services = Services::local();
    let typeface = Typeface::none();
    let compositor = FrameCompositor::new(&config, &services, &typeface);

    let range = time::hourly_frame(0);
    let frame = frame_file(dir.path(), "unit", &range);
    std::fs::create_dir_all(frame.parent().unwrap()).unwrap();
    std::fs::write(&frame, b"existing").unwrap();

    let mut map = eta_timetables(&dataset, &[0]);
    let mut timetable = map.get(&range).cloned().unwrap();
    for inputs in timetable.layers.values_mut() {
        inputs[0].metadata.last_modified = chrono::Utc::now() + chrono::Duration::days(1);
    }
    map.insert(range, timetable);

    let request = FrameRequest::new(regions::unit_region(), None, range);
    let outcome = compositor
        .render_frame(&request, map.get(&range), &mut LayerGeneratorCache::new())
        .unwrap();
    assert_eq!(outcome, FrameOutcome::Rendered { files: vec![frame.clone()] });
    assert_ne!(std::fs::read(&frame).unwrap(), b"existing");
}

#[test]
fn test_svg_format_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), UNIT_REGION, ETA_LAYER);
    config.render.formats = vec![frame_common::MapFormat::Svg, frame_common::MapFormat::Png];
    let services = Services::local();
    let typeface = Typeface::none();
    let compositor = FrameCompositor::new(&config, &services, &typeface);

    let request = FrameRequest::new(regions::unit_region(), None, time::hourly_frame(0));
    let paths = compositor.frame_paths(&request);
    assert_eq!(paths.len(), 1);
    assert!(paths[0].1.extension().is_some_and(|e| e == "png"));
}
