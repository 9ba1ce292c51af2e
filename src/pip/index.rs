//! Spatial index over the units of one boundary layer.

use geo::{Intersects, Point};
use rstar::{RTree, RTreeObject, AABB};
use tracing::{debug, info};

use crate::ibge::{BoundaryLayer, BoundaryUnit};
use crate::models::{GeoLevel, Quality};

/// R-tree entry pointing back at a unit by its position in the layer
#[derive(Debug, Clone)]
pub struct IndexedUnit {
    pub position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedUnit {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedUnit {
    fn new(position: usize, unit: &BoundaryUnit) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = unit.bbox()?;
        Some(Self {
            position,
            envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
        })
    }
}

/// A layer plus the R-tree built over its unit bounding boxes.
#[derive(Debug)]
pub struct LayerIndex {
    layer: BoundaryLayer,
    tree: RTree<IndexedUnit>,
}

impl LayerIndex {
    /// Build the index once. Units with empty geometry are never matched.
    pub fn build(layer: BoundaryLayer) -> Self {
        let indexed: Vec<IndexedUnit> = layer
            .units()
            .iter()
            .enumerate()
            .filter_map(|(position, unit)| IndexedUnit::new(position, unit))
            .collect();

        let skipped = layer.len() - indexed.len();
        if skipped > 0 {
            debug!("Skipped {} {} units with empty geometry", skipped, layer.level);
        }

        let tree = RTree::bulk_load(indexed);
        info!(
            "Indexed {} {} boundaries ({} quality)",
            tree.size(),
            layer.level,
            layer.quality
        );

        Self { layer, tree }
    }

    /// Unit covering `point` (x = longitude, y = latitude).
    ///
    /// Points on a shared border match both neighbours; the one that comes
    /// first in the layer wins.
    pub fn lookup(&self, point: Point<f64>) -> Option<&BoundaryUnit> {
        self.candidates(point)
            .min()
            .map(|position| &self.layer.units()[position])
    }

    /// Every unit covering `point`, in layer order
    pub fn lookup_all(&self, point: Point<f64>) -> Vec<&BoundaryUnit> {
        let mut positions: Vec<usize> = self.candidates(point).collect();
        positions.sort_unstable();
        positions
            .into_iter()
            .map(|position| &self.layer.units()[position])
            .collect()
    }

    fn candidates(&self, point: Point<f64>) -> impl Iterator<Item = usize> + '_ {
        let query_envelope = AABB::from_point([point.x(), point.y()]);
        let units = self.layer.units();

        // Envelope hits first, then the exact (border-inclusive) test
        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(move |iu| units[iu.position].geometry.intersects(&point))
            .map(|iu| iu.position)
    }

    pub fn layer(&self) -> &BoundaryLayer {
        &self.layer
    }

    pub fn level(&self) -> GeoLevel {
        self.layer.level
    }

    pub fn quality(&self) -> Quality {
        self.layer.quality
    }

    /// Number of indexed units
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibge::{MetadataRow, PolygonRecord};
    use geo::{polygon, MultiPolygon};
    use std::collections::BTreeMap;

    fn square(id: i64, x: f64, y: f64, size: f64) -> PolygonRecord {
        PolygonRecord {
            id,
            geometry: MultiPolygon::new(vec![polygon![
                (x: x, y: y),
                (x: x + size, y: y),
                (x: x + size, y: y + size),
                (x: x, y: y + size),
                (x: x, y: y),
            ]]),
        }
    }

    fn named(id: i64, name: &str) -> MetadataRow {
        MetadataRow {
            id,
            name: Some(name.to_string()),
            abbreviation: None,
            parents: BTreeMap::new(),
        }
    }

    fn index(polygons: Vec<PolygonRecord>) -> LayerIndex {
        let metadata = polygons
            .iter()
            .map(|p| named(p.id, &format!("unit {}", p.id)))
            .collect();
        let layer = BoundaryLayer::join(GeoLevel::State, Quality::Low, polygons, metadata).unwrap();
        LayerIndex::build(layer)
    }

    #[test]
    fn test_lookup_inside_and_outside() {
        let index = index(vec![square(11, 0.0, 0.0, 1.0), square(12, 2.0, 0.0, 1.0)]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup(Point::new(0.5, 0.5)).map(|u| u.id), Some(11));
        assert_eq!(index.lookup(Point::new(2.5, 0.5)).map(|u| u.id), Some(12));
        assert!(index.lookup(Point::new(1.5, 0.5)).is_none());
        assert!(index.lookup(Point::new(-10.0, -10.0)).is_none());
    }

    #[test]
    fn test_lookup_is_lon_lat_ordered() {
        // Roughly the Distrito Federal area: lon -48.3..-47.3, lat -16.1..-15.1
        let index = index(vec![square(53, -48.3, -16.1, 1.0)]);
        assert_eq!(index.lookup(Point::new(-47.93, -15.78)).map(|u| u.id), Some(53));
        assert!(index.lookup(Point::new(-15.78, -47.93)).is_none());
    }

    #[test]
    fn test_border_point_is_covered() {
        let index = index(vec![square(11, 0.0, 0.0, 1.0)]);
        assert_eq!(index.lookup(Point::new(1.0, 0.5)).map(|u| u.id), Some(11));
        assert_eq!(index.lookup(Point::new(0.0, 0.0)).map(|u| u.id), Some(11));
    }

    #[test]
    fn test_overlap_prefers_layer_order() {
        let index = index(vec![
            square(30, 0.0, 0.0, 2.0),
            square(20, 1.0, 1.0, 2.0),
            square(10, 0.5, 0.5, 2.0),
        ]);
        assert_eq!(index.lookup(Point::new(1.5, 1.5)).map(|u| u.id), Some(30));

        let all: Vec<i64> = index
            .lookup_all(Point::new(1.5, 1.5))
            .iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(all, vec![30, 20, 10]);
    }

    #[test]
    fn test_shared_border_picks_first() {
        let index = index(vec![square(12, 1.0, 0.0, 1.0), square(11, 0.0, 0.0, 1.0)]);
        assert_eq!(index.lookup(Point::new(1.0, 0.5)).map(|u| u.id), Some(12));
    }

    #[test]
    fn test_empty_geometry_is_skipped() {
        let empty = PolygonRecord {
            id: 99,
            geometry: MultiPolygon::new(vec![]),
        };
        let index = index(vec![empty, square(11, 0.0, 0.0, 1.0)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.layer().len(), 2);
        assert_eq!(index.lookup(Point::new(0.5, 0.5)).map(|u| u.id), Some(11));
    }
}
