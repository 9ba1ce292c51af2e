//! Result of a cross-level point lookup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::GeoLevel;
use crate::ibge::BoundaryUnit;

/// The unit containing a point at one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatedUnit {
    /// IBGE code of the unit
    pub id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// State abbreviation (e.g. "DF"), only present for states and the country
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<String>,
}

impl LocatedUnit {
    pub fn from_unit(unit: &BoundaryUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name.clone(),
            abbreviation: unit.abbreviation.clone(),
        }
    }
}

/// Containing unit at each of the six levels.
///
/// A `None` field means no polygon at that level contains the point:
/// open ocean, outside Brazil, or a gap between coarse polygons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub country: Option<LocatedUnit>,
    pub region: Option<LocatedUnit>,
    pub intermediate_region: Option<LocatedUnit>,
    pub immediate_region: Option<LocatedUnit>,
    pub state: Option<LocatedUnit>,
    pub municipality: Option<LocatedUnit>,
}

impl Location {
    /// Set the entry for a given level
    pub fn set(&mut self, level: GeoLevel, entry: LocatedUnit) {
        *self.slot_mut(level) = Some(entry);
    }

    /// Get the entry for a given level
    pub fn get(&self, level: GeoLevel) -> Option<&LocatedUnit> {
        match level {
            GeoLevel::Country => self.country.as_ref(),
            GeoLevel::Region => self.region.as_ref(),
            GeoLevel::IntermediateRegion => self.intermediate_region.as_ref(),
            GeoLevel::ImmediateRegion => self.immediate_region.as_ref(),
            GeoLevel::State => self.state.as_ref(),
            GeoLevel::Municipality => self.municipality.as_ref(),
        }
    }

    fn slot_mut(&mut self, level: GeoLevel) -> &mut Option<LocatedUnit> {
        match level {
            GeoLevel::Country => &mut self.country,
            GeoLevel::Region => &mut self.region,
            GeoLevel::IntermediateRegion => &mut self.intermediate_region,
            GeoLevel::ImmediateRegion => &mut self.immediate_region,
            GeoLevel::State => &mut self.state,
            GeoLevel::Municipality => &mut self.municipality,
        }
    }

    pub fn name(&self, level: GeoLevel) -> Option<&str> {
        self.get(level).and_then(|unit| unit.name.as_deref())
    }

    /// True when no level contains the point
    pub fn is_empty(&self) -> bool {
        GeoLevel::ALL.iter().all(|level| self.get(*level).is_none())
    }

    /// Number of levels with a containing unit
    pub fn matched_levels(&self) -> usize {
        GeoLevel::ALL
            .iter()
            .filter(|level| self.get(**level).is_some())
            .count()
    }

    /// Flatten to `field name -> unit name`, keeping misses as `None`.
    pub fn to_map(&self) -> BTreeMap<&'static str, Option<String>> {
        GeoLevel::ALL
            .iter()
            .map(|level| (level.field_name(), self.name(*level).map(str::to_string)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: i64, name: &str) -> LocatedUnit {
        LocatedUnit {
            id,
            name: Some(name.to_string()),
            abbreviation: None,
        }
    }

    #[test]
    fn test_empty_location() {
        let location = Location::default();
        assert!(location.is_empty());
        let map = location.to_map();
        assert_eq!(map.len(), 6);
        assert!(map.values().all(Option::is_none));
    }

    #[test]
    fn test_set_and_get_are_per_level() {
        let mut location = Location::default();
        location.set(GeoLevel::State, unit(53, "Distrito Federal"));
        assert_eq!(location.name(GeoLevel::State), Some("Distrito Federal"));
        assert!(location.get(GeoLevel::Municipality).is_none());
        assert!(!location.is_empty());
        assert_eq!(location.matched_levels(), 1);
    }

    #[test]
    fn test_to_map_uses_field_names() {
        let mut location = Location::default();
        location.set(GeoLevel::Region, unit(5, "Centro-Oeste"));
        let map = location.to_map();
        assert_eq!(map["region"].as_deref(), Some("Centro-Oeste"));
        assert_eq!(map["immediate_region"], None);
    }

    #[test]
    fn test_serializes_misses_as_null() {
        let mut location = Location::default();
        location.set(GeoLevel::Country, unit(1, "Brasil"));
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["country"]["name"], "Brasil");
        assert!(json["municipality"].is_null());
    }
}
