//! geodata - IBGE administrative boundaries and point lookups for Brazil
//!
//! This library provides the boundary fetcher, the coordinate type and the
//! point-in-polygon locators shared by the `geodata` and `geodata-server`
//! binaries.

pub mod config;
pub mod coords;
pub mod error;
pub mod ibge;
pub mod models;
pub mod pip;
pub mod plot;

pub use coords::GeoCoords;
pub use error::{Error, Result};
pub use ibge::{BoundaryLayer, BoundarySource, BoundaryUnit, FetchRequest, IbgeClient, Scope};
pub use models::{GeoLevel, LocatedUnit, Location, Quality};
pub use pip::{locate_point, GeoLocator, LazyLocator};
