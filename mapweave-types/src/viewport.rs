use serde::{Deserialize, Serialize};

use crate::LngLat;

/// Minimum zoom level supported by web map engines.
pub const DEFAULT_MIN_ZOOM: f64 = 0.0;
/// Maximum zoom level supported by web map engines.
pub const DEFAULT_MAX_ZOOM: f64 = 24.0;
/// Maximum camera tilt in degrees.
pub const MAX_PITCH: f64 = 85.0;

/// Camera of the map view.
///
/// `bearing` and `pitch` are in degrees. Values produced by an engine are already normalized,
/// values coming from the host can be brought into the engine ranges with
/// [`Viewport::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Center of the view.
    pub center: LngLat,
    /// Zoom level.
    pub zoom: f64,
    /// Rotation clockwise from north, in degrees.
    pub bearing: f64,
    /// Tilt from nadir, in degrees.
    pub pitch: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: LngLat::default(),
            zoom: 1.0,
            bearing: 0.0,
            pitch: 0.0,
        }
    }
}

impl Viewport {
    /// Creates a flat, north-up viewport.
    pub fn new(center: LngLat, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            ..Default::default()
        }
    }

    /// Returns a copy with the given bearing.
    pub fn with_bearing(&self, bearing: f64) -> Self {
        Self { bearing, ..*self }
    }

    /// Returns a copy with the given pitch.
    pub fn with_pitch(&self, pitch: f64) -> Self {
        Self { pitch, ..*self }
    }

    /// Returns a copy with zoom clamped into `[min_zoom, max_zoom]`, bearing wrapped into
    /// `(-180, 180]` and pitch clamped into `[0, MAX_PITCH]`.
    pub fn normalized(&self, min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            center: self.center,
            zoom: self.zoom.clamp(min_zoom, max_zoom),
            bearing: wrap_bearing(self.bearing),
            pitch: self.pitch.clamp(0.0, MAX_PITCH),
        }
    }
}

fn wrap_bearing(bearing: f64) -> f64 {
    let wrapped = (bearing + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

/// Partial camera description. Fields left as `None` keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraTarget {
    /// New center.
    pub center: Option<LngLat>,
    /// New zoom level.
    pub zoom: Option<f64>,
    /// New bearing.
    pub bearing: Option<f64>,
    /// New pitch.
    pub pitch: Option<f64>,
}

impl CameraTarget {
    /// Target with only the center set.
    pub fn center(center: LngLat) -> Self {
        Self {
            center: Some(center),
            ..Default::default()
        }
    }

    /// Sets the zoom.
    pub fn with_zoom(self, zoom: f64) -> Self {
        Self {
            zoom: Some(zoom),
            ..self
        }
    }

    /// Sets the bearing.
    pub fn with_bearing(self, bearing: f64) -> Self {
        Self {
            bearing: Some(bearing),
            ..self
        }
    }

    /// Sets the pitch.
    pub fn with_pitch(self, pitch: f64) -> Self {
        Self {
            pitch: Some(pitch),
            ..self
        }
    }

    /// Resolves the target against the given camera.
    pub fn apply_to(&self, current: &Viewport) -> Viewport {
        Viewport {
            center: self.center.unwrap_or(current.center),
            zoom: self.zoom.unwrap_or(current.zoom),
            bearing: self.bearing.unwrap_or(current.bearing),
            pitch: self.pitch.unwrap_or(current.pitch),
        }
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.center.is_none() && self.zoom.is_none() && self.bearing.is_none() && self.pitch.is_none()
    }
}

impl From<Viewport> for CameraTarget {
    fn from(value: Viewport) -> Self {
        Self {
            center: Some(value.center),
            zoom: Some(value.zoom),
            bearing: Some(value.bearing),
            pitch: Some(value.pitch),
        }
    }
}
