//! Plain data types used by `mapweave`: coordinates, camera descriptions, map styles and
//! colors. Nothing in this crate talks to a map engine.

pub mod color;
pub mod error;
mod lnglat;
pub mod style;
mod viewport;

pub use color::Color;
pub use error::TypesError;
pub use lnglat::LngLat;
pub use style::{MapStyles, StyleRef, Theme};
pub use viewport::{CameraTarget, Viewport, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MAX_PITCH};

// Reexport geojson, declarative sources carry its types.
pub use geojson;
