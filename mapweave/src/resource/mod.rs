//! Declarative resources placed on the map: GeoJSON layers, routes, clusters, markers,
//! controls and map click listeners.
//!
//! A resource describes what it wants to exist in the engine. The map component attaches it
//! once the engine is ready, calls [`MapResource::update`] with the previous declaration of the
//! same key when props change, and removes everything it registered when it is no longer
//! declared. All engine access of a resource goes through a [`ResourceScope`], which tracks
//! the engine ids the resource owns and refuses ids owned by another resource.

use std::any::Any;

use mapweave_types::{CameraTarget, LngLat};
use maybe_sync::{MaybeSend, MaybeSync};
use serde_json::{Map as JsonMap, Value};

use crate::callback::SharedHandler;
use crate::engine::{Engine, LayerEvent};
use crate::error::ResourceError;

mod cluster;
mod controls;
mod geojson_layer;
mod listener;
mod marker;
mod registry;
mod route;
mod scope;

pub use cluster::{ClusterClick, ClusterLayer, ClusterStyle};
pub use controls::MapControls;
pub use geojson_layer::GeoJsonLayer;
pub use listener::{MapClick, MapClickListener};
pub use marker::{Marker, MarkerClick, MarkerLayer, MarkerPoint};
pub(crate) use registry::ResourceRegistry;
pub use registry::ResourceStatus;
pub use route::RouteLine;
pub use scope::ResourceScope;

/// Declarative child of a map.
pub trait MapResource: MaybeSend + MaybeSync {
    /// Identity of the resource. Engine ids of the resource are derived from it.
    fn key(&self) -> &str;

    /// Registers the resource in the engine.
    ///
    /// Can be called again for the same key after the engine lost its state (style change or
    /// instance recreation), so it must not assume anything is left from a previous attach.
    fn attach(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError>;

    /// Brings the engine from the state of `previous` to the state of `self`. Both have the
    /// same key and concrete type. Must not touch the engine when nothing changed.
    fn update(&self, previous: &dyn MapResource, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError>;

    /// Handles a pointer event on a layer the resource listens to.
    fn on_layer_event(&self, _event: &LayerEvent, _engine: &dyn Engine) -> Vec<Reaction> {
        vec![]
    }

    /// Handles a click on a DOM marker the resource listens to.
    fn on_marker_click(&self, _marker_id: &str, _engine: &dyn Engine) -> Vec<Reaction> {
        vec![]
    }

    /// Handles a click on the map. Called for every resource listening to
    /// [`Subscription::Click`](crate::engine::Subscription::Click), in declaration order.
    fn on_map_click(&self, _lnglat: LngLat, _engine: &dyn Engine) -> Vec<Reaction> {
        vec![]
    }

    /// Access to the concrete type, used by [`downcast_previous`].
    fn as_any(&self) -> &dyn Any;
}

/// Returns the previous declaration as the concrete type of the resource.
pub fn downcast_previous<T: 'static>(previous: &dyn MapResource) -> Option<&T> {
    previous.as_any().downcast_ref()
}

/// What the map does in response to an interaction with a resource.
///
/// Reactions run after the map has released its internal state, so handlers can use the
/// [`MapHandle`](crate::MapHandle).
pub enum Reaction {
    /// Call a handler of the host application.
    Notify(Box<dyn FnOnce()>),
    /// Animate the camera with the default animation of the map.
    EaseTo(CameraTarget),
}

impl Reaction {
    /// Calls `handler` with `event`.
    pub fn notify<E: 'static>(handler: &SharedHandler<E>, event: E) -> Self {
        let handler = handler.clone();
        Self::Notify(Box::new(move || handler(&event)))
    }
}

impl std::fmt::Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reaction::Notify(_) => write!(f, "Notify"),
            Reaction::EaseTo(target) => f.debug_tuple("EaseTo").field(target).finish(),
        }
    }
}

/// Properties that differ between two property maps. Removed properties are reported with
/// `Value::Null`, which resets them to the engine default.
pub fn diff_properties(old: &JsonMap<String, Value>, new: &JsonMap<String, Value>) -> Vec<(String, Value)> {
    let mut changed: Vec<_> = new
        .iter()
        .filter(|(name, value)| old.get(*name) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    changed.extend(
        old.keys()
            .filter(|name| !new.contains_key(*name))
            .map(|name| (name.clone(), Value::Null)),
    );

    changed
}
