//! SVG rendering of a boundary layer.

use geo::{LineString, Rect};
use std::path::Path as FilePath;
use svg::node::element::path::Data;
use svg::node::element::{Group, Path, Title};
use svg::Document;
use tracing::info;

use crate::error::Result;
use crate::ibge::{BoundaryLayer, BoundaryUnit};

/// Drawing options passed straight into the SVG attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: f64,
    /// Units drawn with `highlight_fill` instead of `fill`
    pub highlight: Vec<i64>,
    pub highlight_fill: String,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            fill: "#e8e8e8".to_string(),
            stroke: "#333333".to_string(),
            stroke_width: 0.5,
            highlight: Vec::new(),
            highlight_fill: "#d62728".to_string(),
        }
    }
}

/// Maps lon/lat onto the canvas, equal scale on both axes, centred.
struct Canvas {
    min_lon: f64,
    max_lat: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Canvas {
    fn fit(rect: Rect<f64>, width: f64, height: f64) -> Self {
        let span_lon = rect.width().max(f64::EPSILON);
        let span_lat = rect.height().max(f64::EPSILON);
        let scale = (width / span_lon).min(height / span_lat);
        Self {
            min_lon: rect.min().x,
            max_lat: rect.max().y,
            scale,
            offset_x: (width - span_lon * scale) / 2.0,
            offset_y: (height - span_lat * scale) / 2.0,
        }
    }

    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            self.offset_x + (lon - self.min_lon) * self.scale,
            self.offset_y + (self.max_lat - lat) * self.scale,
        )
    }
}

/// Build the document: one `<path>` per unit, titled with its name.
pub fn render_document(layer: &BoundaryLayer, style: &PlotStyle) -> Document {
    let document = Document::new()
        .set("width", style.width)
        .set("height", style.height)
        .set("viewBox", (0, 0, style.width, style.height));

    let Some(rect) = layer.bounding_rect() else {
        return document;
    };
    let canvas = Canvas::fit(rect, f64::from(style.width), f64::from(style.height));

    let group = layer
        .units()
        .iter()
        .filter_map(|unit| unit_path(unit, &canvas, style))
        .fold(
            Group::new()
                .set("stroke", style.stroke.as_str())
                .set("stroke-width", style.stroke_width)
                .set("fill-rule", "evenodd"),
            |group, path| group.add(path),
        );

    document.add(group)
}

pub fn render_svg(layer: &BoundaryLayer, style: &PlotStyle) -> String {
    render_document(layer, style).to_string()
}

/// Render and write to `path`
pub fn save_svg<P: AsRef<FilePath>>(
    layer: &BoundaryLayer,
    style: &PlotStyle,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    svg::save(path, &render_document(layer, style))?;
    info!("Wrote {} {} units to {}", layer.len(), layer.level, path.display());
    Ok(())
}

fn unit_path(unit: &BoundaryUnit, canvas: &Canvas, style: &PlotStyle) -> Option<Path> {
    let mut data = Data::new();
    for polygon in &unit.geometry {
        data = append_ring(data, polygon.exterior(), canvas);
        for interior in polygon.interiors() {
            data = append_ring(data, interior, canvas);
        }
    }
    if data.is_empty() {
        return None;
    }

    let fill = if style.highlight.contains(&unit.id) {
        &style.highlight_fill
    } else {
        &style.fill
    };
    let title = unit.name.clone().unwrap_or_else(|| unit.id.to_string());

    Some(
        Path::new()
            .set("data-id", unit.id)
            .set("fill", fill.as_str())
            .set("d", data)
            .add(Title::new(title)),
    )
}

fn append_ring(mut data: Data, ring: &LineString<f64>, canvas: &Canvas) -> Data {
    for (i, coord) in ring.coords().enumerate() {
        let point = canvas.project(coord.x, coord.y);
        data = if i == 0 {
            data.move_to(point)
        } else {
            data.line_to(point)
        };
    }
    if ring.0.len() > 1 {
        data = data.close();
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibge::{MetadataRow, PolygonRecord};
    use crate::models::{GeoLevel, Quality};
    use geo::{polygon, MultiPolygon};
    use std::collections::BTreeMap;

    fn layer() -> BoundaryLayer {
        let polygons = vec![
            PolygonRecord {
                id: 52,
                geometry: MultiPolygon::new(vec![polygon![
                    (x: -53.0, y: -19.0),
                    (x: -46.0, y: -19.0),
                    (x: -46.0, y: -13.0),
                    (x: -53.0, y: -13.0),
                ]]),
            },
            PolygonRecord {
                id: 53,
                geometry: MultiPolygon::new(vec![polygon![
                    (x: -48.3, y: -16.1),
                    (x: -47.3, y: -16.1),
                    (x: -47.3, y: -15.5),
                ]]),
            },
        ];
        let metadata = vec![MetadataRow {
            id: 53,
            name: Some("Distrito <Federal>".to_string()),
            abbreviation: Some("DF".to_string()),
            parents: BTreeMap::new(),
        }];
        BoundaryLayer::join(GeoLevel::State, Quality::Low, polygons, metadata).unwrap()
    }

    #[test]
    fn test_one_path_per_unit() {
        let svg = render_svg(&layer(), &PlotStyle::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<path").count(), 2);
        assert!(svg.contains(r#"xmlns="http://www.w3.org/2000/svg""#));
        assert!(svg.contains("<title>Distrito &lt;Federal&gt;</title>"));
        // Unit without metadata falls back to its id
        assert!(svg.contains("<title>52</title>"));
    }

    #[test]
    fn test_highlight_and_style() {
        let style = PlotStyle {
            width: 400,
            height: 300,
            stroke_width: 2.0,
            highlight: vec![53],
            ..PlotStyle::default()
        };
        let svg = render_svg(&layer(), &style);
        assert!(svg.contains(r#"height="300" viewBox="0 0 400 300" width="400""#));
        assert!(svg.contains(r#"stroke-width="2""#));
        assert!(svg.contains(r##"data-id="53" fill="#d62728""##));
        assert!(svg.contains(r##"data-id="52" fill="#e8e8e8""##));
    }

    #[test]
    fn test_layer_without_geometry_has_no_group() {
        let polygons = vec![PolygonRecord {
            id: 11,
            geometry: MultiPolygon::new(Vec::new()),
        }];
        let layer = BoundaryLayer::join(GeoLevel::State, Quality::Low, polygons, Vec::new()).unwrap();
        let svg = render_svg(&layer, &PlotStyle::default());
        assert!(svg.starts_with("<svg"));
        assert!(!svg.contains("<g"));
        assert!(!svg.contains("<path"));
    }

    #[test]
    fn test_projection_keeps_north_up() {
        let rect = Rect::new(
            geo::coord! { x: -10.0, y: -10.0 },
            geo::coord! { x: 10.0, y: 10.0 },
        );
        let canvas = Canvas::fit(rect, 200.0, 100.0);
        let (x_nw, y_nw) = canvas.project(-10.0, 10.0);
        let (x_se, y_se) = canvas.project(10.0, -10.0);
        assert!((x_nw - 50.0).abs() < 1e-9);
        assert!(y_nw.abs() < 1e-9);
        assert!((x_se - 150.0).abs() < 1e-9);
        assert!((y_se - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_save_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("states.svg");
        save_svg(&layer(), &PlotStyle::default(), &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_svg(&layer(), &PlotStyle::default()));
    }
}
