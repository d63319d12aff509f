//! Callback types given by the host application.

use std::sync::Arc;

use mapweave_types::Viewport;
use maybe_sync::{MaybeSend, MaybeSync};

use crate::error::MapError;

/// Handler of an interaction event of a declarative resource.
///
/// Implemented for every `Fn(&E)` closure, so handlers are usually given as closures:
///
/// ```ignore
/// GeoJsonLayer::new("parks", data, LayerKind::Fill).on_click(|event: &LayerEvent| {
///     log::info!("clicked {:?}", event.feature());
/// });
/// ```
pub trait Handler<E>: Fn(&E) + MaybeSend + MaybeSync {}

impl<E, T: Fn(&E)> Handler<E> for T where T: MaybeSend + MaybeSync {}

/// Shared handler stored by resources. Cloned out of the resource before it is called, so the
/// handler can freely use the [`MapHandle`](crate::MapHandle).
pub type SharedHandler<E> = Arc<dyn Handler<E>>;

pub(crate) type ViewportCallback = Box<dyn FnMut(&Viewport)>;
pub(crate) type LoadCallback = Box<dyn FnMut()>;
pub(crate) type ErrorCallback = Box<dyn FnMut(&MapError)>;

/// Host callbacks of a map component.
#[derive(Default)]
pub(crate) struct MapCallbacks {
    pub(crate) on_viewport_change: Option<ViewportCallback>,
    pub(crate) on_move_end: Option<ViewportCallback>,
    pub(crate) on_load: Option<LoadCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

