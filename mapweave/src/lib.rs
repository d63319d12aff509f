//! Mapweave turns an imperative WebGL map engine (MapLibre GL and the like) into a declarative
//! map view. The host describes what the map should show on every render, and the
//! [`MapComponent`] issues the minimal set of engine calls to get there.
//!
//! # Quick start
//!
//! ```ignore
//! use mapweave::{MapComponent, MapProps};
//! use mapweave::engine::Container;
//! use mapweave::resource::{Marker, RouteLine};
//! use mapweave::mapweave_types::lnglat;
//!
//! let props = MapProps::builder()
//!     .with_center(lnglat!(-74.006, 40.7128))
//!     .with_zoom(8.0)
//!     .on_load(|| log::info!("map is ready"))
//!     .build()?;
//!
//! let mut map = MapComponent::new(props, MapLibreFactory::new());
//! map.set_children(vec![
//!     Box::new(RouteLine::new("route", route_coordinates)),
//!     Box::new(Marker::new("office", lnglat!(-73.9857, 40.7484)).with_popup("Office")),
//! ]);
//! map.mount(Some(Container::new("map")));
//! ```
//!
//! # Main parts
//!
//! * [`MapComponent`] owns the engine instance for its whole life: creates it once on mount,
//!   keeps the camera across style changes and removes it on unmount.
//! * [`resources`](resource) are the declarative children of the map: GeoJSON layers, routes,
//!   clusters, markers and controls. Each one adds its engine objects once and afterwards only
//!   updates them in place.
//! * [`MapHandle`] and [`MapRef`] give imperative camera commands (`fly_to`, `ease_to`,
//!   `jump_to`) to the code outside of the declarative tree.
//! * [`engine`] is the capability interface a binding adapter implements for a concrete
//!   engine.
//!
//! Whether the camera is owned by the host or by the map is decided by [`ViewportProps`]: a
//! controlled viewport is mirrored to the host through `on_viewport_change`, while an
//! uncontrolled one only seeds the camera on mount.

mod callback;
pub mod context;
pub mod engine;
pub mod error;
mod handle;
mod map;
pub mod resource;
mod view;

#[cfg(test)]
mod tests;

pub use callback::{Handler, SharedHandler};
pub use context::{InstanceId, MapContextReceiver, MapContextState};
pub use engine::{Engine, EngineEvent, EngineFactory};
pub use error::{ConfigError, EngineError, MapError, ResourceError};
pub use handle::{MapHandle, MapRef};
pub use map::{
    LifecycleState, MapComponent, MapOptions, MapProps, MapPropsBuilder, RenderState,
    RestylePolicy,
};
pub use resource::{MapResource, ResourceStatus};
pub use view::{ViewportMode, ViewportProps, ViewportTransition};

// Reexport mapweave_types
pub use mapweave_types;
