//! Vector overlays: points from CSV tables and GeoJSON geometries.

use frame_common::BoundingBox;
use serde::{Deserialize, Serialize};
use tiny_skia::{Path, PathBuilder, Pixmap, Transform};
use tracing::debug;

use crate::canvas::FrameCanvas;
use crate::color::{parse_or, Color};
use crate::error::{RenderError, RenderResult};

/// Stroke and fill of an overlay, read from a JSON style document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    #[serde(default)]
    pub stroke_colour: Option<String>,

    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,

    #[serde(default)]
    pub fill_colour: Option<String>,

    /// Radius of point markers in pixels.
    #[serde(default = "default_point_radius")]
    pub point_radius: f32,
}

fn default_stroke_width() -> f32 {
    1.0
}

fn default_point_radius() -> f32 {
    3.0
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_colour: None,
            stroke_width: default_stroke_width(),
            fill_colour: None,
            point_radius: default_point_radius(),
        }
    }
}

impl ShapeStyle {
    pub fn from_json(json: &str) -> RenderResult<Self> {
        serde_json::from_str(json).map_err(|e| RenderError::InvalidGeometry(format!("style: {}", e)))
    }

    fn stroke(&self) -> Color {
        parse_or(self.stroke_colour.as_deref(), Color::BLACK)
    }

    fn fill(&self) -> Option<Color> {
        self.fill_colour.as_deref().and_then(Color::from_hex)
    }
}

/// A geometry in lon/lat degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Point(f64, f64),
    Line(Vec<(f64, f64)>),
    /// Outer ring followed by holes.
    Polygon(Vec<Vec<(f64, f64)>>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { coordinates: Vec<Vec<f64>> },
    MultiLineString { coordinates: Vec<Vec<Vec<f64>>> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum GeoJsonDocument {
    FeatureCollection { features: Vec<Feature> },
    Feature { geometry: Option<Geometry> },
}

fn position(coordinates: &[f64]) -> RenderResult<(f64, f64)> {
    match coordinates {
        [lon, lat, ..] => Ok((*lon, *lat)),
        _ => Err(RenderError::InvalidGeometry(format!(
            "position needs 2 coordinates, got {}",
            coordinates.len()
        ))),
    }
}

fn positions(coordinates: &[Vec<f64>]) -> RenderResult<Vec<(f64, f64)>> {
    coordinates.iter().map(|c| position(c)).collect()
}

fn rings(coordinates: &[Vec<Vec<f64>>]) -> RenderResult<Vec<Vec<(f64, f64)>>> {
    coordinates.iter().map(|ring| positions(ring)).collect()
}

fn collect_geometry(geometry: &Geometry, shapes: &mut Vec<Shape>) -> RenderResult<()> {
    match geometry {
        Geometry::Point { coordinates } => {
            let (lon, lat) = position(coordinates)?;
            shapes.push(Shape::Point(lon, lat));
        }
        Geometry::MultiPoint { coordinates } => {
            for (lon, lat) in positions(coordinates)? {
                shapes.push(Shape::Point(lon, lat));
            }
        }
        Geometry::LineString { coordinates } => shapes.push(Shape::Line(positions(coordinates)?)),
        Geometry::MultiLineString { coordinates } => {
            for line in coordinates {
                shapes.push(Shape::Line(positions(line)?));
            }
        }
        Geometry::Polygon { coordinates } => shapes.push(Shape::Polygon(rings(coordinates)?)),
        Geometry::MultiPolygon { coordinates } => {
            for polygon in coordinates {
                shapes.push(Shape::Polygon(rings(polygon)?));
            }
        }
        Geometry::GeometryCollection { geometries } => {
            for inner in geometries {
                collect_geometry(inner, shapes)?;
            }
        }
    }
    Ok(())
}

/// Parse a GeoJSON feature collection, feature or bare geometry.
pub fn parse_geojson(json: &str) -> RenderResult<Vec<Shape>> {
    let mut shapes = Vec::new();
    let invalid = |e: serde_json::Error| RenderError::InvalidGeometry(e.to_string());

    if let Ok(document) = serde_json::from_str::<GeoJsonDocument>(json) {
        match document {
            GeoJsonDocument::FeatureCollection { features } => {
                for feature in features {
                    if let Some(geometry) = feature.geometry {
                        collect_geometry(&geometry, &mut shapes)?;
                    }
                }
            }
            GeoJsonDocument::Feature {
                geometry: Some(geometry),
            } => collect_geometry(&geometry, &mut shapes)?,
            GeoJsonDocument::Feature { geometry: None } => {}
        }
    } else {
        let geometry: Geometry = serde_json::from_str(json).map_err(invalid)?;
        collect_geometry(&geometry, &mut shapes)?;
    }

    Ok(shapes)
}

const LONGITUDE_COLUMNS: &[&str] = &["longitude", "lon", "lng", "long", "x"];
const LATITUDE_COLUMNS: &[&str] = &["latitude", "lat", "y"];

fn split_csv_line(line: &str) -> Vec<String> {
    line.split(',')
        .map(|cell| cell.trim().trim_matches('"').to_string())
        .collect()
}

/// Parse point locations from a CSV table with a header row.
///
/// Longitude and latitude columns are found by name, ignoring case. Rows
/// with unparsable coordinates are skipped.
pub fn parse_csv_points(csv: &str) -> RenderResult<Vec<Shape>> {
    let mut lines = csv.lines().filter(|line| !line.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| RenderError::InvalidGeometry("empty CSV document".into()))?;
    let columns: Vec<String> = split_csv_line(header)
        .into_iter()
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let find = |names: &[&str]| columns.iter().position(|c| names.contains(&c.as_str()));
    let lon_index = find(LONGITUDE_COLUMNS)
        .ok_or_else(|| RenderError::InvalidGeometry("CSV has no longitude column".into()))?;
    let lat_index = find(LATITUDE_COLUMNS)
        .ok_or_else(|| RenderError::InvalidGeometry("CSV has no latitude column".into()))?;

    let mut shapes = Vec::new();
    for (row, line) in lines.enumerate() {
        let cells = split_csv_line(line);
        let lon = cells.get(lon_index).and_then(|c| c.parse::<f64>().ok());
        let lat = cells.get(lat_index).and_then(|c| c.parse::<f64>().ok());
        match (lon, lat) {
            (Some(lon), Some(lat)) => shapes.push(Shape::Point(lon, lat)),
            _ => debug!(row = row + 1, "Skipping CSV row without coordinates"),
        }
    }
    Ok(shapes)
}

/// Map lon/lat onto the pixels of a `width` x `height` north-up image of
/// `bbox`.
pub fn geographic_transform(bbox: &BoundingBox, width: u32, height: u32) -> Transform {
    let sx = width as f64 / bbox.width();
    let sy = height as f64 / bbox.height();
    Transform::from_translate(-bbox.min_x as f32, -bbox.max_y as f32).post_scale(sx as f32, -sy as f32)
}

fn ring_path(points: &[(f64, f64)], close: bool, pb: &mut PathBuilder) {
    let mut iter = points.iter();
    if let Some((x, y)) = iter.next() {
        pb.move_to(*x as f32, *y as f32);
        for (x, y) in iter {
            pb.line_to(*x as f32, *y as f32);
        }
        if close {
            pb.close();
        }
    }
}

fn project(path: Path, transform: Transform) -> Option<Path> {
    path.transform(transform)
}

/// Draw `shapes` onto a transparent image covering `bbox`.
pub fn render_shapes(
    shapes: &[Shape],
    style: &ShapeStyle,
    bbox: &BoundingBox,
    width: u32,
    height: u32,
) -> RenderResult<Pixmap> {
    let mut canvas = FrameCanvas::new(width, height)?;
    let transform = geographic_transform(bbox, width, height);
    let stroke = style.stroke();
    let fill = style.fill();

    for shape in shapes {
        match shape {
            Shape::Point(lon, lat) => {
                let mut point = [tiny_skia::Point::from_xy(*lon as f32, *lat as f32)];
                transform.map_points(&mut point);
                if let Some(marker) = PathBuilder::from_circle(point[0].x, point[0].y, style.point_radius) {
                    canvas.fill_path(&marker, fill.unwrap_or(stroke), Transform::identity());
                    canvas.stroke_path(&marker, stroke, style.stroke_width, Transform::identity());
                }
            }
            Shape::Line(points) => {
                let mut pb = PathBuilder::new();
                ring_path(points, false, &mut pb);
                if let Some(path) = pb.finish().and_then(|p| project(p, transform)) {
                    canvas.stroke_path(&path, stroke, style.stroke_width, Transform::identity());
                }
            }
            Shape::Polygon(polygon_rings) => {
                let mut pb = PathBuilder::new();
                for ring in polygon_rings {
                    ring_path(ring, true, &mut pb);
                }
                if let Some(path) = pb.finish().and_then(|p| project(p, transform)) {
                    if let Some(fill) = fill {
                        canvas.fill_path(&path, fill, Transform::identity());
                    }
                    canvas.stroke_path(&path, stroke, style.stroke_width, Transform::identity());
                }
            }
        }
    }

    Ok(canvas.into_pixmap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geographic_transform_corners() {
        let bbox = BoundingBox::new(140.0, -30.0, 150.0, -20.0);
        let transform = geographic_transform(&bbox, 100, 200);
        let mut points = [
            tiny_skia::Point::from_xy(140.0, -20.0),
            tiny_skia::Point::from_xy(150.0, -30.0),
        ];
        transform.map_points(&mut points);
        assert!((points[0].x - 0.0).abs() < 1e-3 && (points[0].y - 0.0).abs() < 1e-3);
        assert!((points[1].x - 100.0).abs() < 1e-3 && (points[1].y - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_csv_header_case_insensitive() {
        let csv = "Name,LATITUDE,Longitude\nA,-19.25,146.8\nB,bad,147\n";
        let shapes = parse_csv_points(csv).unwrap();
        assert_eq!(shapes, vec![Shape::Point(146.8, -19.25)]);
    }

    #[test]
    fn test_geojson_feature_collection() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [146.0, -19.0]}, "properties": {}},
                {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[145, -18], [146, -17]]}},
                {"type": "Feature", "geometry": null}
            ]
        }"#;
        let shapes = parse_geojson(json).unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0], Shape::Point(146.0, -19.0));
    }
}
