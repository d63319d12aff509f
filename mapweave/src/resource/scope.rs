use ahash::HashMap;
use mapweave_types::geojson::GeoJson;
use mapweave_types::LngLat;
use serde_json::Value;

use crate::engine::{ControlSpec, Engine, LayerSpec, ListenerId, MarkerSpec, SourceSpec, Subscription};
use crate::error::ResourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ElementKind {
    Source,
    Layer,
    Marker,
    Control,
}

/// Engine id -> key of the resource that registered it.
pub(crate) type Ledger = HashMap<(ElementKind, String), String>;

/// Engine ids registered by one resource, in registration order.
#[derive(Debug, Default)]
pub(crate) struct OwnedIds {
    pub(crate) sources: Vec<String>,
    pub(crate) layers: Vec<String>,
    pub(crate) markers: Vec<String>,
    pub(crate) controls: Vec<String>,
    pub(crate) listeners: Vec<(Subscription, ListenerId)>,
}

impl OwnedIds {
    pub(crate) fn is_empty(&self) -> bool {
        self.sources.is_empty()
            && self.layers.is_empty()
            && self.markers.is_empty()
            && self.controls.is_empty()
            && self.listeners.is_empty()
    }

    pub(crate) fn listens_to(&self, subscription: &Subscription) -> bool {
        self.listeners.iter().any(|(s, _)| s == subscription)
    }

    fn list_mut(&mut self, kind: ElementKind) -> &mut Vec<String> {
        match kind {
            ElementKind::Source => &mut self.sources,
            ElementKind::Layer => &mut self.layers,
            ElementKind::Marker => &mut self.markers,
            ElementKind::Control => &mut self.controls,
        }
    }
}

/// Engine access of a single resource.
///
/// Every id registered through the scope is recorded as owned by the resource. Operations on
/// ids registered by another resource fail with [`ResourceError::NotOwned`], operations on ids
/// the resource never registered with [`ResourceError::NotRegistered`].
pub struct ResourceScope<'a> {
    owner: &'a str,
    engine: &'a mut dyn Engine,
    ledger: &'a mut Ledger,
    owned: &'a mut OwnedIds,
    before: Option<&'a str>,
}

impl<'a> ResourceScope<'a> {
    pub(crate) fn new(
        owner: &'a str,
        engine: &'a mut dyn Engine,
        ledger: &'a mut Ledger,
        owned: &'a mut OwnedIds,
        before: Option<&'a str>,
    ) -> Self {
        Self {
            owner,
            engine,
            ledger,
            owned,
            before,
        }
    }

    /// Key of the resource the scope belongs to.
    pub fn key(&self) -> &str {
        self.owner
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &dyn Engine {
        &*self.engine
    }

    /// Registers a source. If the source already exists in the engine, only its data is
    /// replaced.
    pub fn add_source(&mut self, id: &str, spec: &SourceSpec) -> Result<(), ResourceError> {
        self.claim(ElementKind::Source, id)?;
        if self.engine.has_source(id) {
            self.engine.set_source_data(id, &spec.data)?;
        } else {
            self.engine.add_source(id, spec)?;
        }

        Ok(())
    }

    /// Replaces the data of an owned source.
    pub fn set_source_data(&mut self, id: &str, data: &GeoJson) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Source, id)?;
        Ok(self.engine.set_source_data(id, data)?)
    }

    /// Removes an owned source. Its layers must be removed first.
    pub fn remove_source(&mut self, id: &str) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Source, id)?;
        self.engine.remove_source(id)?;
        self.forget(ElementKind::Source, id);
        Ok(())
    }

    /// Adds a layer below the layers of the resources declared after this one. Does nothing
    /// if the layer already exists.
    pub fn add_layer(&mut self, spec: &LayerSpec) -> Result<(), ResourceError> {
        self.claim(ElementKind::Layer, &spec.id)?;
        if !self.engine.has_layer(&spec.id) {
            self.engine.add_layer(spec, self.before)?;
        }

        Ok(())
    }

    /// Removes an owned layer together with the listeners bound to it.
    pub fn remove_layer(&mut self, id: &str) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Layer, id)?;
        self.unbind_layer_listeners(id);
        self.engine.remove_layer(id)?;
        self.forget(ElementKind::Layer, id);
        Ok(())
    }

    /// Sets a paint property of an owned layer.
    pub fn set_paint_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Layer, layer)?;
        Ok(self.engine.set_paint_property(layer, name, value)?)
    }

    /// Sets a layout property of an owned layer.
    pub fn set_layout_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Layer, layer)?;
        Ok(self.engine.set_layout_property(layer, name, value)?)
    }

    /// Sets or clears the filter of an owned layer.
    pub fn set_filter(&mut self, layer: &str, filter: Option<&Value>) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Layer, layer)?;
        Ok(self.engine.set_filter(layer, filter)?)
    }

    /// Adds a DOM marker.
    pub fn add_marker(&mut self, id: &str, spec: &MarkerSpec) -> Result<(), ResourceError> {
        self.claim(ElementKind::Marker, id)?;
        Ok(self.engine.add_marker(id, spec)?)
    }

    /// Moves an owned marker.
    pub fn set_marker_lnglat(&mut self, id: &str, lnglat: LngLat) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Marker, id)?;
        Ok(self.engine.set_marker_lnglat(id, lnglat)?)
    }

    /// Sets or removes the popup of an owned marker.
    pub fn set_marker_popup(&mut self, id: &str, popup: Option<&str>) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Marker, id)?;
        Ok(self.engine.set_marker_popup(id, popup)?)
    }

    /// Removes an owned marker together with its click listener.
    pub fn remove_marker(&mut self, id: &str) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Marker, id)?;
        self.unlisten(&Subscription::Marker {
            marker_id: id.to_string(),
        });
        self.engine.remove_marker(id)?;
        self.forget(ElementKind::Marker, id);
        Ok(())
    }

    /// Adds a control.
    pub fn add_control(&mut self, id: &str, spec: &ControlSpec) -> Result<(), ResourceError> {
        self.claim(ElementKind::Control, id)?;
        Ok(self.engine.add_control(id, spec)?)
    }

    /// Removes an owned control.
    pub fn remove_control(&mut self, id: &str) -> Result<(), ResourceError> {
        self.ensure_owned(ElementKind::Control, id)?;
        self.engine.remove_control(id)?;
        self.forget(ElementKind::Control, id);
        Ok(())
    }

    /// Starts listening to pointer events of an owned layer, clicks of an owned marker or
    /// clicks anywhere on the map. Does nothing if the resource already listens.
    ///
    /// Camera, style and lifecycle events belong to the map component and cannot be listened
    /// to.
    pub fn listen(&mut self, subscription: Subscription) -> Result<(), ResourceError> {
        match &subscription {
            Subscription::Layer { layer_id, .. } => self.ensure_owned(ElementKind::Layer, layer_id)?,
            Subscription::Marker { marker_id } => self.ensure_owned(ElementKind::Marker, marker_id)?,
            Subscription::Click => {}
            other => {
                return Err(ResourceError::InvalidData(format!(
                    "resources cannot listen to map-level {other:?} events"
                )))
            }
        }

        if !self.owned.listens_to(&subscription) {
            let listener = self.engine.on(subscription.clone());
            self.owned.listeners.push((subscription, listener));
        }

        Ok(())
    }

    /// Stops listening. Does nothing if the resource does not listen.
    pub fn unlisten(&mut self, subscription: &Subscription) {
        let engine = &mut *self.engine;
        self.owned.listeners.retain(|(s, listener)| {
            if s == subscription {
                engine.off(*listener);
                false
            } else {
                true
            }
        });
    }

    /// Listens or stops listening depending on whether the resource has a handler for the
    /// events.
    pub fn set_listening(&mut self, subscription: Subscription, wanted: bool) -> Result<(), ResourceError> {
        if wanted {
            self.listen(subscription)
        } else {
            self.unlisten(&subscription);
            Ok(())
        }
    }

    /// Removes everything the resource registered: listeners first, then layers, markers,
    /// controls and finally sources. Failures are logged, the ids are released anyway.
    pub(crate) fn release(&mut self) {
        let owned = self.unbind_all();
        for layer in owned.layers.iter().rev() {
            if let Err(err) = self.engine.remove_layer(layer) {
                log::debug!("Failed to remove layer {layer} of {}: {err}", self.owner);
            }
        }
        self.remove_dom_elements(&owned);
        for source in owned.sources.iter().rev() {
            if let Err(err) = self.engine.remove_source(source) {
                log::debug!("Failed to remove source {source} of {}: {err}", self.owner);
            }
        }
    }

    /// Forgets everything the resource registered before the style is replaced. Sources and
    /// layers go away with the old style, listeners, markers and controls are removed here so
    /// the next attach starts from an empty engine.
    pub(crate) fn invalidate(&mut self) {
        let owned = self.unbind_all();
        self.remove_dom_elements(&owned);
    }

    fn unbind_all(&mut self) -> OwnedIds {
        for (_, listener) in self.owned.listeners.drain(..) {
            self.engine.off(listener);
        }

        self.ledger.retain(|_, owner| owner.as_str() != self.owner);
        std::mem::take(self.owned)
    }

    fn remove_dom_elements(&mut self, owned: &OwnedIds) {
        for marker in &owned.markers {
            if let Err(err) = self.engine.remove_marker(marker) {
                log::debug!("Failed to remove marker {marker} of {}: {err}", self.owner);
            }
        }
        for control in &owned.controls {
            if let Err(err) = self.engine.remove_control(control) {
                log::debug!("Failed to remove control {control} of {}: {err}", self.owner);
            }
        }
    }

    fn claim(&mut self, kind: ElementKind, id: &str) -> Result<(), ResourceError> {
        match self.ledger.get(&(kind, id.to_string())) {
            Some(owner) if owner != self.owner => Err(ResourceError::NotOwned {
                id: id.to_string(),
                owner: owner.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                self.ledger.insert((kind, id.to_string()), self.owner.to_string());
                self.owned.list_mut(kind).push(id.to_string());
                Ok(())
            }
        }
    }

    fn ensure_owned(&self, kind: ElementKind, id: &str) -> Result<(), ResourceError> {
        match self.ledger.get(&(kind, id.to_string())) {
            Some(owner) if owner == self.owner => Ok(()),
            Some(owner) => Err(ResourceError::NotOwned {
                id: id.to_string(),
                owner: owner.clone(),
            }),
            None => Err(ResourceError::NotRegistered(id.to_string())),
        }
    }

    fn forget(&mut self, kind: ElementKind, id: &str) {
        self.ledger.remove(&(kind, id.to_string()));
        self.owned.list_mut(kind).retain(|owned| owned != id);
    }

    fn unbind_layer_listeners(&mut self, layer: &str) {
        let engine = &mut *self.engine;
        self.owned.listeners.retain(|(subscription, listener)| match subscription {
            Subscription::Layer { layer_id, .. } if layer_id == layer => {
                engine.off(*listener);
                false
            }
            _ => true,
        });
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use mapweave_types::geojson::{FeatureCollection, GeoJson};

    use super::*;
    use crate::engine::{LayerKind, PointerEventKind};
    use crate::tests::{recording, Call};

    fn empty() -> GeoJson {
        GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features: vec![],
            foreign_members: None,
        })
    }

    #[test]
    fn refuses_ids_of_other_resources() {
        let (mut engine, _log) = recording().engine();
        let mut ledger = Ledger::default();
        let mut parks = OwnedIds::default();
        let mut lakes = OwnedIds::default();

        ResourceScope::new("parks", &mut *engine, &mut ledger, &mut parks, None)
            .add_source("shared", &SourceSpec::geojson(empty()))
            .expect("first registration");

        let mut scope = ResourceScope::new("lakes", &mut *engine, &mut ledger, &mut lakes, None);
        assert_matches!(
            scope.add_source("shared", &SourceSpec::geojson(empty())),
            Err(ResourceError::NotOwned { owner, .. }) if owner == "parks"
        );
        assert_matches!(
            scope.remove_layer("lakes-layer"),
            Err(ResourceError::NotRegistered(_))
        );
    }

    #[test]
    fn release_removes_layers_before_sources() {
        let (mut engine, log) = recording().engine();
        let mut ledger = Ledger::default();
        let mut owned = OwnedIds::default();

        let mut scope = ResourceScope::new("parks", &mut *engine, &mut ledger, &mut owned, None);
        scope
            .add_source("parks-source", &SourceSpec::geojson(empty()))
            .expect("source");
        scope
            .add_layer(&LayerSpec::new("parks-layer", "parks-source", LayerKind::Fill))
            .expect("layer");
        scope
            .listen(Subscription::Layer {
                kind: PointerEventKind::Click,
                layer_id: "parks-layer".to_string(),
            })
            .expect("listener");
        log.lock().take_calls();

        scope.release();

        assert_matches!(
            log.lock().take_calls().as_slice(),
            [Call::Off(_), Call::RemoveLayer(layer), Call::RemoveSource(source)]
                if layer == "parks-layer" && source == "parks-source"
        );
        assert!(owned.is_empty());
        assert!(ledger.is_empty());
        assert_eq!(log.lock().listener_count(), 0);
    }

    #[test]
    fn repeated_listen_binds_once() {
        let (mut engine, log) = recording().engine();
        let mut ledger = Ledger::default();
        let mut owned = OwnedIds::default();
        let click = Subscription::Marker {
            marker_id: "home".to_string(),
        };

        let mut scope = ResourceScope::new("home", &mut *engine, &mut ledger, &mut owned, None);
        scope
            .add_marker(
                "home",
                &MarkerSpec {
                    lnglat: LngLat::new(13.4, 52.52),
                    popup: None,
                },
            )
            .expect("marker");
        scope.listen(click.clone()).expect("listener");
        scope.listen(click.clone()).expect("listener");

        assert_eq!(log.lock().listener_count(), 1);

        scope.remove_marker("home").expect("removed");
        assert_eq!(log.lock().listener_count(), 0);
    }

    #[test]
    fn map_clicks_can_be_listened_to() {
        let (mut engine, log) = recording().engine();
        let mut ledger = Ledger::default();
        let mut owned = OwnedIds::default();

        let mut scope = ResourceScope::new("picker", &mut *engine, &mut ledger, &mut owned, None);
        scope.listen(Subscription::Click).expect("map click listener");
        scope.listen(Subscription::Click).expect("map click listener");
        assert_matches!(scope.listen(Subscription::Move), Err(ResourceError::InvalidData(_)));
        assert_eq!(log.lock().listener_count(), 1);

        scope.release();

        assert_matches!(log.lock().calls.as_slice(), [Call::On(Subscription::Click), Call::Off(_)]);
        assert_eq!(log.lock().listener_count(), 0);
    }
}
