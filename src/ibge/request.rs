use serde::{Deserialize, Serialize};

use crate::models::{GeoLevel, Quality};

/// Area whose subdivisions are requested from the mesh API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The whole country (`/paises/BR`)
    #[default]
    Brazil,
    /// One macro region by IBGE code, e.g. 5 = Centro-Oeste
    Region(u32),
    /// One state by IBGE code, e.g. 53 = Distrito Federal
    State(u32),
}

impl Scope {
    pub fn path_segments(&self) -> [String; 2] {
        match self {
            Scope::Brazil => ["paises".to_string(), "BR".to_string()],
            Scope::Region(id) => ["regioes".to_string(), id.to_string()],
            Scope::State(id) => ["estados".to_string(), id.to_string()],
        }
    }
}

/// What to download: one level at one quality, optionally within a sub-region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub level: GeoLevel,
    pub quality: Quality,
    pub scope: Scope,
}

impl FetchRequest {
    pub fn new(level: GeoLevel, quality: Quality) -> Self {
        Self {
            level,
            quality,
            scope: Scope::Brazil,
        }
    }

    pub fn within(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}
