//! In-memory engine that records every call, used by the unit tests of the crate.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use mapweave_types::geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value as GeometryValue};
use mapweave_types::{CameraTarget, LngLat, StyleRef, Viewport};
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;

use crate::engine::{
    AnimationId, AnimationOptions, Container, ControlSpec, Engine, EngineFactory, LayerSpec, ListenerId, MarkerSpec,
    SourceSpec, Subscription,
};
use crate::error::EngineError;

pub(crate) type SharedLog = Arc<Mutex<EngineLog>>;

/// Mutating engine call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    JumpTo(CameraTarget),
    EaseTo(CameraTarget),
    FlyTo(CameraTarget),
    Stop,
    SetStyle(StyleRef),
    AddSource(String),
    SetSourceData(String),
    RemoveSource(String),
    AddLayer { id: String, before: Option<String> },
    RemoveLayer(String),
    SetPaint { layer: String, name: String, value: Value },
    SetLayout { layer: String, name: String, value: Value },
    SetFilter { layer: String, filter: Option<Value> },
    AddMarker(String),
    SetMarkerLngLat(String, LngLat),
    SetMarkerPopup(String, Option<String>),
    RemoveMarker(String),
    AddControl(String),
    RemoveControl(String),
    On(Subscription),
    Off(ListenerId),
    Remove,
}

/// State of the recorded engine, shared by the factory, the engine instances and the test.
#[derive(Debug, Default)]
pub(crate) struct EngineLog {
    pub(crate) calls: Vec<Call>,
    pub(crate) created: Vec<(Container, StyleRef, Viewport)>,
    pub(crate) camera: Viewport,
    pub(crate) sources: BTreeMap<String, SourceSpec>,
    pub(crate) layers: Vec<String>,
    pub(crate) layer_specs: BTreeMap<String, LayerSpec>,
    pub(crate) markers: BTreeMap<String, MarkerSpec>,
    pub(crate) controls: BTreeMap<String, ControlSpec>,
    pub(crate) listeners: BTreeMap<ListenerId, Subscription>,
    pub(crate) calls_after_remove: usize,
    pub(crate) supports_swap: bool,
    /// Camera set by the engine when a new style is loaded.
    pub(crate) style_camera: Option<Viewport>,
    pub(crate) cluster_zoom: Option<f64>,
    pub(crate) reject_filters: bool,
    pub(crate) fail_next_create: Option<EngineError>,
    next_id: u64,
}

impl EngineLog {
    pub(crate) fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn source_feature_count(&self, id: &str) -> Option<usize> {
        match &self.sources.get(id)?.data {
            GeoJson::FeatureCollection(collection) => Some(collection.features.len()),
            GeoJson::Feature(_) | GeoJson::Geometry(_) => Some(1),
        }
    }

    /// Sources and layers disappear with the style.
    pub(crate) fn drop_style(&mut self) {
        self.sources.clear();
        self.layers.clear();
        self.layer_specs.clear();
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn reset_instance(&mut self, camera: Viewport) {
        self.drop_style();
        self.markers.clear();
        self.controls.clear();
        self.listeners.clear();
        self.camera = camera;
    }
}

#[derive(Clone)]
pub(crate) struct RecordingFactory {
    log: SharedLog,
}

pub(crate) fn recording() -> RecordingFactory {
    RecordingFactory {
        log: Arc::new(Mutex::new(EngineLog {
            supports_swap: true,
            ..Default::default()
        })),
    }
}

impl RecordingFactory {
    pub(crate) fn log(&self) -> SharedLog {
        self.log.clone()
    }

    /// Engine instance created without going through the factory interface.
    pub(crate) fn engine(&self) -> (Box<dyn Engine>, SharedLog) {
        (
            Box::new(RecordingEngine {
                log: self.log.clone(),
                removed: false,
            }),
            self.log.clone(),
        )
    }
}

impl EngineFactory for RecordingFactory {
    fn create(&self, container: &Container, style: &StyleRef, camera: &Viewport) -> Result<Box<dyn Engine>, EngineError> {
        let mut log = self.log.lock();
        if let Some(err) = log.fail_next_create.take() {
            return Err(err);
        }

        log.created.push((container.clone(), style.clone(), *camera));
        log.reset_instance(*camera);
        drop(log);

        Ok(self.engine().0)
    }
}

pub(crate) struct RecordingEngine {
    log: SharedLog,
    removed: bool,
}

impl RecordingEngine {
    fn log(&self) -> MutexGuard<'_, EngineLog> {
        let mut log = self.log.lock();
        if self.removed {
            log.calls_after_remove += 1;
        }
        log
    }
}

fn layer_error(id: &str, reason: &str) -> EngineError {
    EngineError::Layer {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn source_error(id: &str, reason: &str) -> EngineError {
    EngineError::Source {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn element_error(id: &str, reason: &str) -> EngineError {
    EngineError::Element {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn set_property(properties: &mut serde_json::Map<String, Value>, name: &str, value: &Value) {
    if value.is_null() {
        properties.remove(name);
    } else {
        properties.insert(name.to_string(), value.clone());
    }
}

impl Engine for RecordingEngine {
    fn camera(&self) -> Viewport {
        self.log().camera
    }

    fn jump_to(&mut self, target: &CameraTarget) {
        let mut log = self.log();
        log.calls.push(Call::JumpTo(*target));
        log.camera = target.apply_to(&log.camera);
    }

    fn ease_to(&mut self, target: &CameraTarget, _options: &AnimationOptions) -> AnimationId {
        let mut log = self.log();
        log.calls.push(Call::EaseTo(*target));
        log.camera = target.apply_to(&log.camera);
        AnimationId(log.next_id())
    }

    fn fly_to(&mut self, target: &CameraTarget, _options: &AnimationOptions) -> AnimationId {
        let mut log = self.log();
        log.calls.push(Call::FlyTo(*target));
        log.camera = target.apply_to(&log.camera);
        AnimationId(log.next_id())
    }

    fn stop(&mut self) {
        self.log().calls.push(Call::Stop);
    }

    fn supports_style_swap(&self) -> bool {
        self.log().supports_swap
    }

    fn set_style(&mut self, style: &StyleRef) -> Result<(), EngineError> {
        let mut log = self.log();
        log.calls.push(Call::SetStyle(style.clone()));
        log.drop_style();
        if let Some(camera) = log.style_camera {
            log.camera = camera;
        }
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.log().sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, spec: &SourceSpec) -> Result<(), EngineError> {
        let mut log = self.log();
        if log.sources.contains_key(id) {
            return Err(source_error(id, "already exists"));
        }
        log.calls.push(Call::AddSource(id.to_string()));
        log.sources.insert(id.to_string(), spec.clone());
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: &GeoJson) -> Result<(), EngineError> {
        let mut log = self.log();
        let Some(source) = log.sources.get_mut(id) else {
            return Err(source_error(id, "does not exist"));
        };
        source.data = data.clone();
        log.calls.push(Call::SetSourceData(id.to_string()));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        let mut log = self.log();
        if log.layer_specs.values().any(|layer| layer.source == id) {
            return Err(source_error(id, "is used by a layer"));
        }
        if log.sources.remove(id).is_none() {
            return Err(source_error(id, "does not exist"));
        }
        log.calls.push(Call::RemoveSource(id.to_string()));
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.log().layer_specs.contains_key(id)
    }

    fn add_layer(&mut self, spec: &LayerSpec, before: Option<&str>) -> Result<(), EngineError> {
        let mut log = self.log();
        if !log.sources.contains_key(&spec.source) {
            return Err(layer_error(&spec.id, "source does not exist"));
        }
        if log.layer_specs.contains_key(&spec.id) {
            return Err(layer_error(&spec.id, "already exists"));
        }
        if log.reject_filters && spec.filter.is_some() {
            return Err(layer_error(&spec.id, "invalid filter"));
        }

        let index = before
            .and_then(|before| log.layers.iter().position(|layer| layer == before))
            .unwrap_or(log.layers.len());
        log.layers.insert(index, spec.id.clone());
        log.layer_specs.insert(spec.id.clone(), spec.clone());
        log.calls.push(Call::AddLayer {
            id: spec.id.clone(),
            before: before.map(str::to_string),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let mut log = self.log();
        if log.layer_specs.remove(id).is_none() {
            return Err(layer_error(id, "does not exist"));
        }
        log.layers.retain(|layer| layer != id);
        log.calls.push(Call::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn set_paint_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), EngineError> {
        let mut log = self.log();
        let Some(spec) = log.layer_specs.get_mut(layer) else {
            return Err(layer_error(layer, "does not exist"));
        };
        set_property(&mut spec.paint, name, value);
        log.calls.push(Call::SetPaint {
            layer: layer.to_string(),
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn set_layout_property(&mut self, layer: &str, name: &str, value: &Value) -> Result<(), EngineError> {
        let mut log = self.log();
        let Some(spec) = log.layer_specs.get_mut(layer) else {
            return Err(layer_error(layer, "does not exist"));
        };
        set_property(&mut spec.layout, name, value);
        log.calls.push(Call::SetLayout {
            layer: layer.to_string(),
            name: name.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn set_filter(&mut self, layer: &str, filter: Option<&Value>) -> Result<(), EngineError> {
        let mut log = self.log();
        if log.reject_filters && filter.is_some() {
            return Err(layer_error(layer, "invalid filter"));
        }
        let Some(spec) = log.layer_specs.get_mut(layer) else {
            return Err(layer_error(layer, "does not exist"));
        };
        spec.filter = filter.cloned();
        log.calls.push(Call::SetFilter {
            layer: layer.to_string(),
            filter: filter.cloned(),
        });
        Ok(())
    }

    fn add_marker(&mut self, id: &str, spec: &MarkerSpec) -> Result<(), EngineError> {
        let mut log = self.log();
        if log.markers.contains_key(id) {
            return Err(element_error(id, "already exists"));
        }
        log.markers.insert(id.to_string(), spec.clone());
        log.calls.push(Call::AddMarker(id.to_string()));
        Ok(())
    }

    fn set_marker_lnglat(&mut self, id: &str, lnglat: LngLat) -> Result<(), EngineError> {
        let mut log = self.log();
        let Some(marker) = log.markers.get_mut(id) else {
            return Err(element_error(id, "does not exist"));
        };
        marker.lnglat = lnglat;
        log.calls.push(Call::SetMarkerLngLat(id.to_string(), lnglat));
        Ok(())
    }

    fn set_marker_popup(&mut self, id: &str, popup: Option<&str>) -> Result<(), EngineError> {
        let mut log = self.log();
        let Some(marker) = log.markers.get_mut(id) else {
            return Err(element_error(id, "does not exist"));
        };
        marker.popup = popup.map(str::to_string);
        log.calls
            .push(Call::SetMarkerPopup(id.to_string(), popup.map(str::to_string)));
        Ok(())
    }

    fn remove_marker(&mut self, id: &str) -> Result<(), EngineError> {
        let mut log = self.log();
        if log.markers.remove(id).is_none() {
            return Err(element_error(id, "does not exist"));
        }
        log.calls.push(Call::RemoveMarker(id.to_string()));
        Ok(())
    }

    fn add_control(&mut self, id: &str, spec: &ControlSpec) -> Result<(), EngineError> {
        let mut log = self.log();
        if log.controls.contains_key(id) {
            return Err(element_error(id, "already exists"));
        }
        log.controls.insert(id.to_string(), *spec);
        log.calls.push(Call::AddControl(id.to_string()));
        Ok(())
    }

    fn remove_control(&mut self, id: &str) -> Result<(), EngineError> {
        let mut log = self.log();
        if log.controls.remove(id).is_none() {
            return Err(element_error(id, "does not exist"));
        }
        log.calls.push(Call::RemoveControl(id.to_string()));
        Ok(())
    }

    fn cluster_expansion_zoom(&self, _source: &str, _cluster_id: u64) -> Option<f64> {
        self.log().cluster_zoom
    }

    fn on(&mut self, subscription: Subscription) -> ListenerId {
        let mut log = self.log();
        let id = ListenerId(log.next_id());
        log.listeners.insert(id, subscription.clone());
        log.calls.push(Call::On(subscription));
        id
    }

    fn off(&mut self, listener: ListenerId) {
        let mut log = self.log();
        log.listeners.remove(&listener);
        log.calls.push(Call::Off(listener));
    }

    fn remove(&mut self) {
        self.log().calls.push(Call::Remove);
        self.removed = true;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Feature collection of `count` points along the equator.
pub(crate) fn points(count: usize) -> GeoJson {
    let features = (0..count)
        .map(|i| Feature {
            bbox: None,
            geometry: Some(Geometry::new(GeometryValue::Point(vec![i as f64, 0.0]))),
            id: None,
            properties: None,
            foreign_members: None,
        })
        .collect();

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
