use std::any::Any;
use std::sync::Arc;

use mapweave_types::LngLat;

use super::{downcast_previous, MapResource, Reaction, ResourceScope};
use crate::callback::{Handler, SharedHandler};
use crate::engine::{Engine, Subscription};
use crate::error::ResourceError;

/// Click anywhere on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapClick {
    /// Geographic position of the click.
    pub lnglat: LngLat,
}

/// Child of a map that reacts to clicks anywhere on the map, e.g. to drop a pin or to pick a
/// location.
///
/// The engine listener is bound while the child is declared and the handler is set, and
/// unbound when the child is removed.
///
/// ```ignore
/// map.add_child(Box::new(MapClickListener::new("picker").on_click(move |click: &MapClick| {
///     picked.set(click.lnglat);
/// })));
/// ```
#[derive(Clone)]
pub struct MapClickListener {
    key: String,
    on_click: Option<SharedHandler<MapClick>>,
}

impl MapClickListener {
    /// Creates a listener without a handler.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            on_click: None,
        }
    }

    /// Called on every click on the map.
    pub fn on_click(mut self, handler: impl Handler<MapClick> + 'static) -> Self {
        self.on_click = Some(Arc::new(handler));
        self
    }
}

impl MapResource for MapClickListener {
    fn key(&self) -> &str {
        &self.key
    }

    fn attach(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        scope.set_listening(Subscription::Click, self.on_click.is_some())
    }

    fn update(&self, previous: &dyn MapResource, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        let Some(previous) = downcast_previous::<MapClickListener>(previous) else {
            return self.attach(scope);
        };

        if previous.on_click.is_some() != self.on_click.is_some() {
            scope.set_listening(Subscription::Click, self.on_click.is_some())?;
        }
        Ok(())
    }

    fn on_map_click(&self, lnglat: LngLat, _engine: &dyn Engine) -> Vec<Reaction> {
        self.on_click
            .as_ref()
            .map(|handler| vec![Reaction::notify(handler, MapClick { lnglat })])
            .unwrap_or_default()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::scope::{Ledger, OwnedIds};
    use crate::tests::{recording, Call};

    #[test]
    fn binds_listener_only_with_handler() {
        let (mut engine, log) = recording().engine();
        let mut ledger = Ledger::default();
        let mut owned = OwnedIds::default();
        let silent = MapClickListener::new("picker");
        let active = MapClickListener::new("picker").on_click(|_: &MapClick| {});

        let mut scope = ResourceScope::new("picker", &mut *engine, &mut ledger, &mut owned, None);
        silent.attach(&mut scope).expect("attached");
        assert!(log.lock().take_calls().is_empty());

        active.update(&silent, &mut scope).expect("updated");
        assert_eq!(log.lock().take_calls(), vec![Call::On(Subscription::Click)]);

        active.clone().update(&active, &mut scope).expect("updated");
        assert!(log.lock().take_calls().is_empty());

        silent.update(&active, &mut scope).expect("updated");
        assert_eq!(log.lock().listener_count(), 0);
    }
}
