//! UTM projection for the EPSG systems used around Brazil.
//!
//! EPSG codes are resolved to a zone here; the transverse Mercator math
//! itself is done by `proj4rs`.

use proj4rs::transform::transform;
use proj4rs::Proj;
use std::fmt;

use crate::error::{Error, Result};

/// Largest distance from the central meridian, in degrees, that still has
/// a meaningful transverse Mercator image.
pub const MAX_MERIDIAN_OFFSET: f64 = 90.0;

/// Reference ellipsoid of a projected system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ellipsoid {
    Wgs84,
    /// GRS 80, the ellipsoid of SIRGAS 2000
    Grs80,
}

impl Ellipsoid {
    const fn proj_name(&self) -> &'static str {
        match self {
            Ellipsoid::Wgs84 => "WGS84",
            Ellipsoid::Grs80 => "GRS80",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
}

/// A UTM zone resolved from an EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub epsg: u32,
    pub zone: u8,
    pub hemisphere: Hemisphere,
    pub ellipsoid: Ellipsoid,
}

impl UtmZone {
    /// Parse an identifier like `EPSG:31983` or `epsg:32723`.
    ///
    /// Supported: WGS 84 / UTM (326zz north, 327zz south) and
    /// SIRGAS 2000 / UTM (31965-31976 = 11N-22N, 31977-31985 = 17S-25S).
    pub fn from_epsg(crs: &str) -> Result<Self> {
        let invalid = || Error::InvalidCrs(crs.to_string());

        let (authority, code) = crs.trim().split_once(':').ok_or_else(invalid)?;
        if !authority.eq_ignore_ascii_case("epsg") {
            return Err(invalid());
        }
        let epsg: u32 = code.trim().parse().map_err(|_| invalid())?;

        let (zone, hemisphere, ellipsoid) = match epsg {
            32601..=32660 => (epsg - 32600, Hemisphere::North, Ellipsoid::Wgs84),
            32701..=32760 => (epsg - 32700, Hemisphere::South, Ellipsoid::Wgs84),
            31965..=31976 => (epsg - 31954, Hemisphere::North, Ellipsoid::Grs80),
            31977..=31985 => (epsg - 31960, Hemisphere::South, Ellipsoid::Grs80),
            _ => return Err(invalid()),
        };

        Ok(Self {
            epsg,
            zone: zone as u8,
            hemisphere,
            ellipsoid,
        })
    }

    /// Longitude of the zone's central meridian in degrees
    pub fn central_meridian(&self) -> f64 {
        f64::from(self.zone) * 6.0 - 183.0
    }

    /// Angular distance of `lon` from the central meridian, in `[0, 180]`
    pub fn meridian_offset(&self, lon: f64) -> f64 {
        normalize_lon(lon - self.central_meridian()).abs()
    }

    /// PROJ definition of this zone
    pub fn proj_string(&self) -> String {
        let south = match self.hemisphere {
            Hemisphere::North => "",
            Hemisphere::South => " +south",
        };
        format!(
            "+proj=utm +zone={}{} +ellps={} +units=m +no_defs",
            self.zone,
            south,
            self.ellipsoid.proj_name()
        )
    }

    /// Project geographic degrees to `(easting, northing)` in metres.
    ///
    /// Points at or beyond [`MAX_MERIDIAN_OFFSET`] from the central meridian
    /// are rejected.
    pub fn forward(&self, lat: f64, lon: f64) -> Result<(f64, f64)> {
        let offset = self.meridian_offset(lon);
        if offset >= MAX_MERIDIAN_OFFSET {
            return Err(self.error(format!(
                "longitude {lon} is {offset:.1}° from the central meridian {}",
                self.central_meridian()
            )));
        }

        let (geographic, projected) = self.definitions()?;
        let mut point = (lon.to_radians(), lat.to_radians());
        transform(&geographic, &projected, &mut point).map_err(|e| self.error(e))?;

        self.finite(point)
    }

    /// Inverse projection to `(lat, lon)` in degrees, longitude in `[-180, 180]`.
    pub fn inverse(&self, easting: f64, northing: f64) -> Result<(f64, f64)> {
        if !easting.is_finite() || !northing.is_finite() {
            return Err(self.error("easting and northing must be finite"));
        }

        let (geographic, projected) = self.definitions()?;
        let mut point = (easting, northing);
        transform(&projected, &geographic, &mut point).map_err(|e| self.error(e))?;

        let (lon, lat) = self.finite(point)?;
        Ok((lat.to_degrees(), normalize_lon(lon.to_degrees())))
    }

    fn definitions(&self) -> Result<(Proj, Proj)> {
        let geographic = Proj::from_proj_string(&format!(
            "+proj=latlong +ellps={} +no_defs",
            self.ellipsoid.proj_name()
        ))
        .map_err(|e| self.error(e))?;
        let projected = Proj::from_proj_string(&self.proj_string()).map_err(|e| self.error(e))?;
        Ok((geographic, projected))
    }

    fn finite(&self, (x, y): (f64, f64)) -> Result<(f64, f64)> {
        if x.is_finite() && y.is_finite() {
            Ok((x, y))
        } else {
            Err(self.error("projection produced a non-finite result"))
        }
    }

    fn error(&self, reason: impl ToString) -> Error {
        Error::Projection {
            crs: format!("EPSG:{}", self.epsg),
            reason: reason.to_string(),
        }
    }
}

/// Wrap a longitude into `[-180, 180]`.
pub fn normalize_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid maps +180 onto -180; keep the sign of the input there
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = match self.hemisphere {
            Hemisphere::North => 'N',
            Hemisphere::South => 'S',
        };
        write!(f, "EPSG:{} (UTM {}{})", self.epsg, self.zone, h)
    }
}
