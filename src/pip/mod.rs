//! Point-in-polygon lookups against IBGE boundary layers.
//!
//! Each level gets its own R-tree over unit bounding boxes; candidates are
//! confirmed with an exact geometry test.

mod index;
mod locator;

pub use index::{IndexedUnit, LayerIndex};
pub use locator::{locate_point, GeoLocator, LazyLocator};
