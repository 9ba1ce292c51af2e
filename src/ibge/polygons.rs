//! Parsing of mesh API GeoJSON responses.

use geo::{Geometry, MultiPolygon};
use geojson::feature::Id;
use geojson::{Feature, GeoJson};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::GeoLevel;

/// Id given to the single country polygon (the API labels it "BR")
pub const COUNTRY_ID: i64 = 1;

/// One polygon record from the mesh API
#[derive(Debug, Clone)]
pub struct PolygonRecord {
    pub id: i64,
    pub geometry: MultiPolygon<f64>,
}

/// Parse a FeatureCollection body into polygon records, keeping response order.
///
/// Features without geometry, or with non-areal geometry, are skipped.
pub fn parse_feature_collection(body: &str, level: GeoLevel, url: &str) -> Result<Vec<PolygonRecord>> {
    let geojson: GeoJson = body.parse().map_err(|e| Error::decode(url, e))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(Error::decode(url, "expected a FeatureCollection")),
    };

    let mut records = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let id = if level == GeoLevel::Country {
            COUNTRY_ID
        } else {
            match feature_id(&feature) {
                Some(id) => id,
                None => {
                    return Err(Error::decode(url, "feature without a numeric codarea"));
                }
            }
        };

        let geometry = match feature.geometry {
            Some(g) => g,
            None => {
                warn!("Skipping {} feature {} without geometry", level, id);
                continue;
            }
        };

        let geometry: Geometry<f64> = geometry.try_into().map_err(|e| Error::decode(url, e))?;

        match to_multipolygon(geometry) {
            Some(geometry) => records.push(PolygonRecord { id, geometry }),
            None => debug!("Skipping non-areal geometry for {} feature {}", level, id),
        }
    }

    Ok(records)
}

/// Area code from the `codarea` property, falling back to the feature id.
fn feature_id(feature: &Feature) -> Option<i64> {
    if let Some(value) = feature.property("codarea") {
        return json_to_id(value);
    }
    match feature.id.as_ref()? {
        Id::String(s) => s.trim().parse().ok(),
        Id::Number(n) => n.as_i64(),
    }
}

pub(crate) fn json_to_id(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_multipolygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::MultiPolygon(mp) => Some(mp),
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
        Geometry::GeometryCollection(gc) => {
            let polygons: Vec<_> = gc
                .into_iter()
                .filter_map(to_multipolygon)
                .flat_map(|mp| mp.0)
                .collect();
            if polygons.is_empty() {
                None
            } else {
                Some(MultiPolygon::new(polygons))
            }
        }
        _ => None,
    }
}
