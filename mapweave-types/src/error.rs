//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error, PartialEq)]
pub enum TypesError {
    /// Coordinate is not finite or latitude is out of `[-90, 90]`.
    #[error("invalid coordinate: lng {lng}, lat {lat}")]
    InvalidCoordinate {
        /// Longitude given.
        lng: f64,
        /// Latitude given.
        lat: f64,
    },
    /// Theme name is not `light` or `dark`.
    #[error("unknown theme: {0}")]
    UnknownTheme(String),
    /// Color string cannot be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),
}
