//! Validated WGS-84 coordinates.
//!
//! [`GeoCoords`] is the input of every locator query. It converts to and
//! from tuples, `lat`/`lon` maps and UTM pairs, and offers great-circle
//! distance and initial bearing.

pub mod projection;

pub use projection::{normalize_lon, Ellipsoid, Hemisphere, UtmZone};

use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Error, Result};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// A latitude/longitude pair in decimal degrees.
///
/// Both components are always in range; NaN is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoords", into = "RawCoords")]
pub struct GeoCoords {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Deserialize)]
struct RawCoords {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoords> for GeoCoords {
    type Error = Error;

    fn try_from(raw: RawCoords) -> Result<Self> {
        GeoCoords::new(raw.lat, raw.lon)
    }
}

impl From<GeoCoords> for RawCoords {
    fn from(coords: GeoCoords) -> Self {
        RawCoords {
            lat: coords.lat,
            lon: coords.lon,
        }
    }
}

impl GeoCoords {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(Error::out_of_range("latitude", lat, MIN_LAT, MAX_LAT));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(Error::out_of_range("longitude", lon, MIN_LON, MAX_LON));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn from_tuple((lat, lon): (f64, f64)) -> Result<Self> {
        Self::new(lat, lon)
    }

    /// `(lat, lon)`, the field order of this type
    pub fn to_tuple(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// Build from a map with `lat` and `lon` keys.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self> {
        let lat = *map.get("lat").ok_or(Error::MissingKey("lat"))?;
        let lon = *map.get("lon").ok_or(Error::MissingKey("lon"))?;
        Self::new(lat, lon)
    }

    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([("lat".to_string(), self.lat), ("lon".to_string(), self.lon)])
    }

    /// Point for polygon tests. Note the `(lon, lat)` = `(x, y)` order.
    pub fn to_point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_to(&self, other: &GeoCoords) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    /// Initial bearing in degrees `[0, 360)`, clockwise from true north.
    ///
    /// The bearing to the same point is `atan2(0, 0) = 0`.
    pub fn bearing_to(&self, other: &GeoCoords) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let x = dlon.sin() * lat2.cos();
        let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

        (x.atan2(y).to_degrees() + 360.0) % 360.0
    }

    /// Project to `(easting, northing)` in the UTM system named by `crs`.
    ///
    /// Fails with [`Error::Projection`] when the point is 90° or more from
    /// the zone's central meridian.
    pub fn to_utm(&self, crs: &str) -> Result<(f64, f64)> {
        UtmZone::from_epsg(crs)?.forward(self.lat, self.lon)
    }

    /// Longitudes just past the antimeridian (zones 1 and 60) wrap into
    /// `[-180, 180]`.
    pub fn from_utm(easting: f64, northing: f64, crs: &str) -> Result<Self> {
        let (lat, lon) = UtmZone::from_epsg(crs)?.inverse(easting, northing)?;
        Self::new(lat, lon)
    }
}

impl TryFrom<(f64, f64)> for GeoCoords {
    type Error = Error;

    fn try_from(value: (f64, f64)) -> Result<Self> {
        Self::from_tuple(value)
    }
}

impl TryFrom<(i32, i32)> for GeoCoords {
    type Error = Error;

    fn try_from((lat, lon): (i32, i32)) -> Result<Self> {
        Self::new(f64::from(lat), f64::from(lon))
    }
}

impl From<GeoCoords> for (f64, f64) {
    fn from(coords: GeoCoords) -> Self {
        coords.to_tuple()
    }
}

impl From<GeoCoords> for Point<f64> {
    fn from(coords: GeoCoords) -> Self {
        coords.to_point()
    }
}

impl fmt::Display for GeoCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.6}°{}, {:.6}°{}",
            self.lat.abs(),
            ns,
            self.lon.abs(),
            ew
        )
    }
}
