//! Error types for fetching boundaries and building coordinates.

use thiserror::Error;

use crate::models::{GeoLevel, Quality};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A coordinate component fell outside its valid range (or was NaN).
    #[error("{field} must be between {min} and {max} degrees, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("missing required key in coordinate map: {0}")]
    MissingKey(&'static str),

    /// The reference system is not a supported UTM projection.
    #[error("unsupported coordinate reference system '{0}'")]
    InvalidCrs(String),

    /// The point has no image in the requested projection.
    #[error("cannot project in {crs}: {reason}")]
    Projection { crs: String, reason: String },

    #[error("unknown territorial level '{0}'")]
    UnknownLevel(String),

    #[error("unknown quality '{0}'")]
    UnknownQuality(String),

    /// Network failure or non-success status from a remote service.
    #[error("remote service unavailable at {url}: {reason}")]
    RemoteUnavailable { url: String, reason: String },

    /// The mesh service returned no geometry for a level.
    #[error("no boundaries returned for {level} at {quality} quality")]
    EmptyResult { level: GeoLevel, quality: Quality },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn out_of_range(field: &'static str, value: f64, min: f64, max: f64) -> Self {
        Error::OutOfRange {
            field,
            value,
            min,
            max,
        }
    }

    pub(crate) fn remote(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::RemoteUnavailable {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::Decode {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
