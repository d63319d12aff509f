use std::time::Duration;

use mapweave_types::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use serde::{Deserialize, Serialize};

use crate::engine::AnimationOptions;
use crate::error::ConfigError;
use crate::view::ViewportTransition;

/// How the camera is put back after the style is replaced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RestylePolicy {
    /// Restore the camera instantly. A recreated instance is constructed directly at the
    /// preserved camera.
    #[default]
    Snap,
    /// Animate back to the preserved camera. A recreated instance is constructed at the
    /// preserved camera as well, so there is nothing to animate.
    Animate {
        /// Transition duration.
        #[serde(with = "crate::engine::duration_millis")]
        duration: Duration,
    },
}

/// Map configuration that is not part of the viewport, styles or callbacks.
///
/// Can be loaded from the application configuration:
///
/// ```ignore
/// let options: MapOptions = serde_json::from_str(r#"{"max_zoom": 18}"#)?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Minimum zoom level.
    pub min_zoom: f64,
    /// Maximum zoom level.
    pub max_zoom: f64,
    /// How changes of a controlled viewport are applied.
    pub viewport_transition: ViewportTransition,
    /// How the camera is restored after a style change.
    pub restyle_policy: RestylePolicy,
    /// Animation used for camera moves requested by the map itself, e.g. zooming into a cluster.
    pub default_animation: AnimationOptions,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            viewport_transition: ViewportTransition::default(),
            restyle_policy: RestylePolicy::default(),
            default_animation: AnimationOptions::default(),
        }
    }
}

impl MapOptions {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.min_zoom > self.max_zoom || !self.min_zoom.is_finite() || !self.max_zoom.is_finite() {
            return Err(ConfigError::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn loads_partial_configuration() {
        let options: MapOptions = serde_json::from_str(
            r#"{
                "max_zoom": 18,
                "viewport_transition": {"type": "jump"},
                "restyle_policy": {"type": "animate", "duration": 250}
            }"#,
        )
        .expect("valid options");

        assert_eq!(options.max_zoom, 18.0);
        assert_eq!(options.min_zoom, DEFAULT_MIN_ZOOM);
        assert_eq!(options.viewport_transition, ViewportTransition::Jump);
        assert_eq!(
            options.restyle_policy,
            RestylePolicy::Animate {
                duration: Duration::from_millis(250)
            }
        );
    }

    #[test]
    fn oversized_duration_saturates() {
        let options = MapOptions {
            restyle_policy: RestylePolicy::Animate { duration: Duration::MAX },
            ..Default::default()
        };

        let value = serde_json::to_value(options).expect("serializable");
        assert_eq!(value["restyle_policy"]["duration"], serde_json::json!(u64::MAX));

        let restored: MapOptions = serde_json::from_value(value).expect("valid options");
        assert_eq!(
            restored.restyle_policy,
            RestylePolicy::Animate {
                duration: Duration::from_millis(u64::MAX)
            }
        );
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let options = MapOptions {
            min_zoom: 10.0,
            max_zoom: 2.0,
            ..Default::default()
        };
        assert_matches!(options.validate(), Err(ConfigError::InvalidZoomRange { .. }));
        assert!(MapOptions::default().validate().is_ok());
    }
}
