//! Core data models: level catalog and lookup results.

pub mod level;
pub mod location;

pub use level::{GeoLevel, Quality};
pub use location::{LocatedUnit, Location};
