//! Capability interface of the map rendering engine.
//!
//! `mapweave` does not render anything. A binding adapter implements [`Engine`] on top of the
//! real engine (e.g. MapLibre GL through `wasm-bindgen`) and [`EngineFactory`] to construct it.
//! Events the engine emits are delivered back by calling
//! [`MapComponent::dispatch`](crate::MapComponent::dispatch).

use std::any::Any;
use std::time::Duration;

use mapweave_types::geojson::GeoJson;
use mapweave_types::{CameraTarget, LngLat, StyleRef, Viewport};
use maybe_sync::{MaybeSend, MaybeSync};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

mod event;
mod spec;

pub use event::{EngineEvent, LayerEvent, PointerEventKind, Subscription};
pub use spec::{
    ClusterOptions, ControlKind, ControlPosition, ControlSpec, LayerKind, LayerSpec, MarkerSpec,
    SourceSpec,
};

/// Id of a programmatic camera animation, assigned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimationId(pub u64);

/// Id of an event listener, assigned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Parameters of an animated camera transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationOptions {
    /// Duration of the transition.
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    /// Respect the user's reduced motion setting.
    pub essential: bool,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(500),
            essential: false,
        }
    }
}

impl AnimationOptions {
    /// Animation with the given duration.
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }
}

/// Element the engine attaches its canvas to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    id: String,
}

impl Container {
    /// Container identified by the DOM element id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// DOM element id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Constructs engine instances.
pub trait EngineFactory {
    /// Creates an engine attached to `container`, loading `style` with the initial `camera`.
    ///
    /// The instance is not ready until it emits [`EngineEvent::Load`].
    fn create(
        &self,
        container: &Container,
        style: &StyleRef,
        camera: &Viewport,
    ) -> Result<Box<dyn Engine>, EngineError>;
}

impl<T: EngineFactory + ?Sized> EngineFactory for Box<T> {
    fn create(
        &self,
        container: &Container,
        style: &StyleRef,
        camera: &Viewport,
    ) -> Result<Box<dyn Engine>, EngineError> {
        (**self).create(container, style, camera)
    }
}

/// Live map engine instance.
///
/// Only the [`MapComponent`](crate::MapComponent) that created the instance calls mutating
/// methods, except for the explicit trapdoor [`MapHandle::with_instance`](crate::MapHandle::with_instance).
pub trait Engine: MaybeSend + MaybeSync {
    /// Current camera.
    fn camera(&self) -> Viewport;
    /// Moves the camera instantly.
    fn jump_to(&mut self, target: &CameraTarget);
    /// Starts an eased camera transition.
    fn ease_to(&mut self, target: &CameraTarget, options: &AnimationOptions) -> AnimationId;
    /// Starts a flight-arc camera transition.
    fn fly_to(&mut self, target: &CameraTarget, options: &AnimationOptions) -> AnimationId;
    /// Stops the running camera animation, if any.
    fn stop(&mut self);

    /// Whether [`Engine::set_style`] can replace the style without recreating the instance.
    fn supports_style_swap(&self) -> bool;
    /// Replaces the style. Completion is signalled with [`EngineEvent::StyleLoad`].
    fn set_style(&mut self, style: &StyleRef) -> Result<(), EngineError>;

    /// Whether a source with the given id exists.
    fn has_source(&self, id: &str) -> bool;
    /// Registers a source.
    fn add_source(&mut self, id: &str, spec: &SourceSpec) -> Result<(), EngineError>;
    /// Replaces the data of a GeoJSON source.
    fn set_source_data(&mut self, id: &str, data: &GeoJson) -> Result<(), EngineError>;
    /// Removes a source. Layers using it must be removed first.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;

    /// Whether a layer with the given id exists.
    fn has_layer(&self, id: &str) -> bool;
    /// Adds a layer, optionally below the `before` layer.
    fn add_layer(&mut self, spec: &LayerSpec, before: Option<&str>) -> Result<(), EngineError>;
    /// Removes a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;
    /// Sets a paint property. `Value::Null` resets it to the default.
    fn set_paint_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), EngineError>;
    /// Sets a layout property. `Value::Null` resets it to the default.
    fn set_layout_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), EngineError>;
    /// Sets or clears the layer filter.
    fn set_filter(&mut self, layer: &str, filter: Option<&Value>) -> Result<(), EngineError>;

    /// Adds a DOM marker.
    fn add_marker(&mut self, id: &str, spec: &MarkerSpec) -> Result<(), EngineError>;
    /// Moves a DOM marker.
    fn set_marker_lnglat(&mut self, id: &str, lnglat: LngLat) -> Result<(), EngineError>;
    /// Sets or removes the popup of a DOM marker.
    fn set_marker_popup(&mut self, id: &str, popup: Option<&str>) -> Result<(), EngineError>;
    /// Removes a DOM marker.
    fn remove_marker(&mut self, id: &str) -> Result<(), EngineError>;

    /// Adds a built-in control.
    fn add_control(&mut self, id: &str, spec: &ControlSpec) -> Result<(), EngineError>;
    /// Removes a built-in control.
    fn remove_control(&mut self, id: &str) -> Result<(), EngineError>;

    /// Zoom level at which the given cluster of a clustered source breaks apart.
    fn cluster_expansion_zoom(&self, source: &str, cluster_id: u64) -> Option<f64>;

    /// Starts delivering events of the given type.
    fn on(&mut self, subscription: Subscription) -> ListenerId;
    /// Stops delivering events for the listener.
    fn off(&mut self, listener: ListenerId);

    /// Destroys the instance and releases its resources.
    fn remove(&mut self);

    /// Access to the concrete engine type for advanced callers.
    fn as_any(&self) -> &dyn Any;
    /// Access to the concrete engine type for advanced callers.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Durations longer than `u64::MAX` milliseconds are written as `u64::MAX`.
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
