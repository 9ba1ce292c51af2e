//! Boundary fetcher for the IBGE APIs.
//!
//! Downloads polygons from the mesh service and attribute rows from the
//! localidades service, then joins them by IBGE code into a
//! [`BoundaryLayer`].

mod client;
mod layer;
mod metadata;
mod polygons;
mod request;

pub use client::IbgeClient;
pub use layer::{BoundaryLayer, BoundaryUnit};
pub use metadata::{parse_metadata, MetadataRow};
pub use polygons::{parse_feature_collection, PolygonRecord, COUNTRY_ID};
pub use request::{FetchRequest, Scope};

use crate::error::Result;

/// Anything that can produce a joined boundary layer.
pub trait BoundarySource {
    fn fetch_layer(&self, request: &FetchRequest) -> Result<BoundaryLayer>;
}

impl<S: BoundarySource + ?Sized> BoundarySource for &S {
    fn fetch_layer(&self, request: &FetchRequest) -> Result<BoundaryLayer> {
        (**self).fetch_layer(request)
    }
}
