//! Territorial levels and mesh quality used by the IBGE APIs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// IBGE territorial division, ordered from country down to municipality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GeoLevel {
    /// Brazil as a whole
    Country,
    /// Macro region (Norte, Nordeste, ...)
    Region,
    /// Intermediate geographic region
    IntermediateRegion,
    /// Immediate geographic region
    ImmediateRegion,
    /// State / federal district (UF)
    State,
    /// Municipality
    Municipality,
}

impl GeoLevel {
    /// All levels in hierarchical order (country first)
    pub const ALL: [GeoLevel; 6] = [
        GeoLevel::Country,
        GeoLevel::Region,
        GeoLevel::IntermediateRegion,
        GeoLevel::ImmediateRegion,
        GeoLevel::State,
        GeoLevel::Municipality,
    ];

    /// Value of the `intrarregiao` parameter on the mesh API
    pub const fn spatial_key(&self) -> &'static str {
        match self {
            GeoLevel::Country => "pais",
            GeoLevel::Region => "regiao",
            GeoLevel::IntermediateRegion => "regiao-intermediaria",
            GeoLevel::ImmediateRegion => "regiao-imediata",
            GeoLevel::State => "UF",
            GeoLevel::Municipality => "municipio",
        }
    }

    /// Path segment on the localidades API
    pub const fn metadata_path(&self) -> &'static str {
        match self {
            GeoLevel::Country => "paises",
            GeoLevel::Region => "regioes",
            GeoLevel::IntermediateRegion => "regioes-intermediarias",
            GeoLevel::ImmediateRegion => "regioes-imediatas",
            GeoLevel::State => "estados",
            GeoLevel::Municipality => "municipios",
        }
    }

    /// Column prefix of this level in `view=nivelado` metadata rows,
    /// e.g. `UF-id`, `UF-sigla`, `UF-nome`.
    pub const fn metadata_prefix(&self) -> &'static str {
        match self {
            GeoLevel::Country => "pais",
            GeoLevel::Region => "regiao",
            GeoLevel::IntermediateRegion => "regiao-intermediaria",
            GeoLevel::ImmediateRegion => "regiao-imediata",
            GeoLevel::State => "UF",
            GeoLevel::Municipality => "municipio",
        }
    }

    /// Field name used in serialized results
    pub const fn field_name(&self) -> &'static str {
        match self {
            GeoLevel::Country => "country",
            GeoLevel::Region => "region",
            GeoLevel::IntermediateRegion => "intermediate_region",
            GeoLevel::ImmediateRegion => "immediate_region",
            GeoLevel::State => "state",
            GeoLevel::Municipality => "municipality",
        }
    }
}

impl fmt::Display for GeoLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for GeoLevel {
    type Err = Error;

    /// Accepts snake_case or kebab-case field names and the IBGE keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let level = match normalized.as_str() {
            "country" | "pais" | "paises" => GeoLevel::Country,
            "region" | "regiao" | "regioes" => GeoLevel::Region,
            "intermediate_region" | "regiao_intermediaria" | "regioes_intermediarias" => {
                GeoLevel::IntermediateRegion
            }
            "immediate_region" | "regiao_imediata" | "regioes_imediatas" => {
                GeoLevel::ImmediateRegion
            }
            "state" | "uf" | "estado" | "estados" => GeoLevel::State,
            "municipality" | "municipio" | "municipios" => GeoLevel::Municipality,
            _ => return Err(Error::UnknownLevel(s.to_string())),
        };
        Ok(level)
    }
}

/// Polygon resolution requested from the mesh API.
///
/// Lower quality means smaller downloads but coarser borders, so points
/// close to a border may fall in a gap between neighbouring polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    #[default]
    Low,
    Medium,
    High,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Low, Quality::Medium, Quality::High];

    /// Value of the `qualidade` parameter on the mesh API
    pub const fn api_value(&self) -> &'static str {
        match self {
            Quality::Low => "minima",
            Quality::Medium => "intermediaria",
            Quality::High => "maxima",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "minima" => Ok(Quality::Low),
            "medium" | "intermediaria" => Ok(Quality::Medium),
            "high" | "maxima" => Ok(Quality::High),
            _ => Err(Error::UnknownQuality(s.to_string())),
        }
    }
}
