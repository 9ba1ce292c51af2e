//! Geometry + metadata join for one level.

use geo::{BoundingRect, MultiPolygon, Rect};
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use hashbrown::HashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::metadata::MetadataRow;
use super::polygons::PolygonRecord;
use crate::error::{Error, Result};
use crate::models::{GeoLevel, Quality};

/// A single administrative unit: polygon plus its attributes.
///
/// Attributes are `None` when the metadata service had no row for the id.
#[derive(Debug, Clone)]
pub struct BoundaryUnit {
    pub id: i64,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub parents: BTreeMap<String, String>,
    pub geometry: MultiPolygon<f64>,
}

impl BoundaryUnit {
    /// Bounding box as `(min_lon, min_lat, max_lon, max_lat)`
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    fn to_feature(&self) -> Feature {
        let mut properties = JsonObject::new();
        properties.insert("id".to_string(), Value::from(self.id));
        properties.insert(
            "name".to_string(),
            self.name.clone().map(Value::String).unwrap_or(Value::Null),
        );
        if let Some(abbr) = &self.abbreviation {
            properties.insert("abbreviation".to_string(), Value::String(abbr.clone()));
        }
        for (parent, name) in &self.parents {
            properties.insert(parent.clone(), Value::String(name.clone()));
        }

        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: Some(geojson::feature::Id::Number(self.id.into())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// All units of one level at one quality, in mesh response order.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    pub level: GeoLevel,
    pub quality: Quality,
    units: Vec<BoundaryUnit>,
}

impl BoundaryLayer {
    /// Left-join polygons with metadata by id.
    ///
    /// Every polygon yields one unit; metadata rows without a polygon are
    /// dropped. Fails with `EmptyResult` when there are no polygons.
    pub fn join(
        level: GeoLevel,
        quality: Quality,
        polygons: Vec<PolygonRecord>,
        metadata: Vec<MetadataRow>,
    ) -> Result<Self> {
        if polygons.is_empty() {
            return Err(Error::EmptyResult { level, quality });
        }

        let mut by_id: HashMap<i64, MetadataRow> = HashMap::with_capacity(metadata.len());
        for row in metadata {
            if by_id.contains_key(&row.id) {
                warn!("Duplicate {} metadata row for id {}", level, row.id);
                continue;
            }
            by_id.insert(row.id, row);
        }

        let mut missing = 0usize;
        let units: Vec<BoundaryUnit> = polygons
            .into_iter()
            .map(|record| match by_id.get(&record.id) {
                Some(row) => BoundaryUnit {
                    id: record.id,
                    name: row.name.clone(),
                    abbreviation: row.abbreviation.clone(),
                    parents: row.parents.clone(),
                    geometry: record.geometry,
                },
                None => {
                    missing += 1;
                    BoundaryUnit {
                        id: record.id,
                        name: None,
                        abbreviation: None,
                        parents: BTreeMap::new(),
                        geometry: record.geometry,
                    }
                }
            })
            .collect();

        if missing > 0 {
            warn!("{} {} polygons have no metadata row", missing, level);
        }
        debug!("Joined {} {} units ({} quality)", units.len(), level, quality);

        Ok(Self {
            level,
            quality,
            units,
        })
    }

    pub fn units(&self) -> &[BoundaryUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// First unit with the given id
    pub fn get(&self, id: i64) -> Option<&BoundaryUnit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    /// Bounding box of the whole layer
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.units
            .iter()
            .filter_map(|unit| unit.geometry.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
    }

    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.units.iter().map(BoundaryUnit::to_feature).collect(),
            foreign_members: None,
        }
    }

    pub fn to_geojson_string(&self) -> String {
        GeoJson::from(self.to_feature_collection()).to_string()
    }

    pub fn into_units(self) -> Vec<BoundaryUnit> {
        self.units
    }
}
