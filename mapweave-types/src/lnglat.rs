use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Geographic position in degrees, longitude first as map engines expect it.
///
/// Serializes into a `[lng, lat]` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    lng: f64,
    lat: f64,
}

impl LngLat {
    /// Creates a new position without validation.
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Creates a new position, rejecting non-finite values and latitudes outside `[-90, 90]`.
    pub fn try_new(lng: f64, lat: f64) -> Result<Self, TypesError> {
        if !lng.is_finite() || !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(TypesError::InvalidCoordinate { lng, lat });
        }

        Ok(Self { lng, lat })
    }

    /// Longitude in degrees.
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Position as a GeoJSON position (`[lng, lat]`).
    pub fn to_position(&self) -> geojson::Position {
        vec![self.lng, self.lat]
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        Self { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

impl From<(f64, f64)> for LngLat {
    fn from((lng, lat): (f64, f64)) -> Self {
        Self { lng, lat }
    }
}

/// Creates a new [`LngLat`] from longitude and latitude values (in degrees).
///
/// ```
/// use mapweave_types::lnglat;
///
/// let nyc = lnglat!(-74.006, 40.7128);
/// assert_eq!(nyc.lat(), 40.7128);
/// ```
#[macro_export]
macro_rules! lnglat {
    ($lng:expr, $lat:expr) => {
        $crate::LngLat::new($lng, $lat)
    };
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn rejects_out_of_range_latitude() {
        assert_matches!(
            LngLat::try_new(10.0, 91.0),
            Err(TypesError::InvalidCoordinate { .. })
        );
        assert_matches!(
            LngLat::try_new(f64::NAN, 0.0),
            Err(TypesError::InvalidCoordinate { .. })
        );
        assert!(LngLat::try_new(-181.0, 90.0).is_ok());
    }

    #[test]
    fn serializes_as_pair() {
        let point = lnglat!(-0.1276, 51.5074);
        let json = serde_json::to_string(&point).expect("serializable");
        assert_eq!(json, "[-0.1276,51.5074]");

        let parsed: LngLat = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(parsed, point);
    }
}
