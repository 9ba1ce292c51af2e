//! Point locators over the six IBGE levels.

use chrono::{DateTime, Utc};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::LayerIndex;
use crate::coords::GeoCoords;
use crate::error::{Error, Result};
use crate::ibge::{BoundaryLayer, BoundarySource, BoundaryUnit, FetchRequest, IbgeClient};
use crate::models::{GeoLevel, LocatedUnit, Location, Quality};

/// Eager locator: every level is downloaded and indexed up front.
///
/// Read-only after construction, so it can be shared across threads
/// behind an `Arc`.
#[derive(Debug)]
pub struct GeoLocator {
    quality: Quality,
    indexes: BTreeMap<GeoLevel, LayerIndex>,
    loaded_at: DateTime<Utc>,
}

impl GeoLocator {
    /// Load all six levels from the public IBGE endpoints.
    pub fn new(quality: Quality) -> Result<Self> {
        Self::with_source(IbgeClient::new()?, quality)
    }

    pub fn with_source<S: BoundarySource>(source: S, quality: Quality) -> Result<Self> {
        Self::load_with(source, quality, |_, _| {})
    }

    /// Load every level in hierarchical order, calling `on_layer` after each
    /// one. The first failing level aborts construction.
    pub fn load_with<S, F>(source: S, quality: Quality, mut on_layer: F) -> Result<Self>
    where
        S: BoundarySource,
        F: FnMut(GeoLevel, &BoundaryLayer),
    {
        info!("Loading {} levels at {} quality", GeoLevel::ALL.len(), quality);

        let mut layers = Vec::with_capacity(GeoLevel::ALL.len());
        for level in GeoLevel::ALL {
            let layer = source.fetch_layer(&FetchRequest::new(level, quality))?;
            on_layer(level, &layer);
            layers.push(layer);
        }

        Self::from_layers(layers)
    }

    /// Build from already fetched layers. Every level must be present.
    pub fn from_layers<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = BoundaryLayer>,
    {
        let mut indexes = BTreeMap::new();
        let mut quality = None;

        for layer in layers {
            let level = layer.level;
            match quality {
                None => quality = Some(layer.quality),
                Some(q) if q != layer.quality => {
                    warn!("{} layer is {} quality, expected {}", level, layer.quality, q);
                }
                Some(_) => {}
            }
            if indexes.insert(level, LayerIndex::build(layer)).is_some() {
                warn!("Duplicate {} layer, keeping the last one", level);
            }
        }

        let quality = quality.unwrap_or_default();
        if let Some(level) = GeoLevel::ALL.into_iter().find(|l| !indexes.contains_key(l)) {
            return Err(Error::EmptyResult { level, quality });
        }

        Ok(Self {
            quality,
            indexes,
            loaded_at: Utc::now(),
        })
    }

    /// Unit containing `coords` at `level`, or `None` when no polygon covers it.
    pub fn locate(&self, coords: &GeoCoords, level: GeoLevel) -> Option<&BoundaryUnit> {
        self.indexes.get(&level)?.lookup(coords.to_point())
    }

    /// Containing unit at every level. Levels are resolved independently.
    pub fn locate_all(&self, coords: &GeoCoords) -> Location {
        let point = coords.to_point();
        let mut location = Location::default();
        for (level, index) in &self.indexes {
            if let Some(unit) = index.lookup(point) {
                location.set(*level, LocatedUnit::from_unit(unit));
            }
        }
        debug!("Located {}: {} levels matched", coords, location.matched_levels());
        location
    }

    pub fn layer(&self, level: GeoLevel) -> Option<&BoundaryLayer> {
        self.indexes.get(&level).map(LayerIndex::layer)
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Total number of indexed units across all levels
    pub fn unit_count(&self) -> usize {
        self.indexes.values().map(LayerIndex::len).sum()
    }
}

/// Lazy locator: a level is fetched and indexed the first time it is queried.
///
/// The cache belongs to this instance only.
#[derive(Debug)]
pub struct LazyLocator<S> {
    source: S,
    quality: Quality,
    cache: BTreeMap<GeoLevel, LayerIndex>,
}

impl<S: BoundarySource> LazyLocator<S> {
    pub fn new(source: S, quality: Quality) -> Self {
        Self {
            source,
            quality,
            cache: BTreeMap::new(),
        }
    }

    pub fn locate(&mut self, coords: &GeoCoords, level: GeoLevel) -> Result<Option<&BoundaryUnit>> {
        let index = self.index(level)?;
        Ok(index.lookup(coords.to_point()))
    }

    pub fn locate_all(&mut self, coords: &GeoCoords) -> Result<Location> {
        let point = coords.to_point();
        let mut location = Location::default();
        for level in GeoLevel::ALL {
            if let Some(unit) = self.index(level)?.lookup(point) {
                location.set(level, LocatedUnit::from_unit(unit));
            }
        }
        Ok(location)
    }

    /// Levels already loaded into the cache
    pub fn loaded_levels(&self) -> Vec<GeoLevel> {
        self.cache.keys().copied().collect()
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    fn index(&mut self, level: GeoLevel) -> Result<&LayerIndex> {
        match self.cache.entry(level) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                debug!("Loading {} layer on first use", level);
                let layer = self
                    .source
                    .fetch_layer(&FetchRequest::new(level, self.quality))?;
                Ok(entry.insert(LayerIndex::build(layer)))
            }
        }
    }
}

/// One-shot lookup of a single point at every level.
pub fn locate_point<S: BoundarySource>(
    source: S,
    coords: &GeoCoords,
    quality: Quality,
) -> Result<Location> {
    LazyLocator::new(source, quality).locate_all(coords)
}
