use std::any::Any;
use std::sync::Arc;

use mapweave_types::geojson::GeoJson;
use serde_json::{Map as JsonMap, Value};

use super::{diff_properties, downcast_previous, MapResource, Reaction, ResourceScope};
use crate::callback::{Handler, SharedHandler};
use crate::engine::{Engine, LayerEvent, LayerKind, LayerSpec, PointerEventKind, SourceSpec, Subscription};
use crate::error::ResourceError;

/// GeoJSON data drawn with a single layer.
///
/// The source is registered as `{key}-source` and the layer as `{key}-layer`. When the data
/// changes, the source data is replaced in place. Changing the layer kind is the only change
/// that removes and adds the layer again.
#[derive(Clone)]
pub struct GeoJsonLayer {
    key: String,
    data: GeoJson,
    kind: LayerKind,
    paint: JsonMap<String, Value>,
    layout: JsonMap<String, Value>,
    filter: Option<Value>,
    on_click: Option<SharedHandler<LayerEvent>>,
    on_hover: Option<SharedHandler<LayerEvent>>,
    capture_clicks: bool,
}

impl GeoJsonLayer {
    /// Creates a layer without paint or layout properties.
    pub fn new(key: impl Into<String>, data: impl Into<GeoJson>, kind: LayerKind) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            kind,
            paint: JsonMap::new(),
            layout: JsonMap::new(),
            filter: None,
            on_click: None,
            on_hover: None,
            capture_clicks: false,
        }
    }

    /// Sets a paint property, e.g. `fill-color`.
    pub fn with_paint(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.paint.insert(name.to_string(), value.into());
        self
    }

    /// Sets a layout property, e.g. `line-cap`.
    pub fn with_layout(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.layout.insert(name.to_string(), value.into());
        self
    }

    /// Sets the filter expression.
    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Called when a feature of the layer is clicked.
    pub fn on_click(mut self, handler: impl Handler<LayerEvent> + 'static) -> Self {
        self.on_click = Some(Arc::new(handler));
        self
    }

    /// Called when the pointer enters or leaves the features of the layer.
    pub fn on_hover(mut self, handler: impl Handler<LayerEvent> + 'static) -> Self {
        self.on_hover = Some(Arc::new(handler));
        self
    }

    pub(crate) fn with_click_handler(mut self, handler: Option<SharedHandler<LayerEvent>>) -> Self {
        self.on_click = handler;
        self
    }

    /// Listen to clicks even without a click handler. Used by resources that interpret the
    /// clicks themselves.
    pub(crate) fn capturing_clicks(mut self, capture: bool) -> Self {
        self.capture_clicks = capture;
        self
    }

    /// Key of the layer.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Engine id of the source.
    pub fn source_id(&self) -> String {
        format!("{}-source", self.key)
    }

    /// Engine id of the layer.
    pub fn layer_id(&self) -> String {
        format!("{}-layer", self.key)
    }

    /// Declared data.
    pub fn data(&self) -> &GeoJson {
        &self.data
    }

    fn layer_spec(&self) -> LayerSpec {
        LayerSpec {
            id: self.layer_id(),
            source: self.source_id(),
            kind: self.kind,
            paint: self.paint.clone(),
            layout: self.layout.clone(),
            filter: self.filter.clone(),
        }
    }

    fn sync_listeners(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        let layer_id = self.layer_id();
        scope.set_listening(
            Subscription::Layer {
                kind: PointerEventKind::Click,
                layer_id: layer_id.clone(),
            },
            self.on_click.is_some() || self.capture_clicks,
        )?;
        for kind in [PointerEventKind::MouseEnter, PointerEventKind::MouseLeave] {
            scope.set_listening(
                Subscription::Layer {
                    kind,
                    layer_id: layer_id.clone(),
                },
                self.on_hover.is_some(),
            )?;
        }

        Ok(())
    }

    fn update_layer(&self, previous: &GeoJsonLayer, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        let layer_id = self.layer_id();
        if previous.kind != self.kind {
            log::debug!("Layer {layer_id} changed from {:?} to {:?}", previous.kind, self.kind);
            scope.remove_layer(&layer_id)?;
            return scope.add_layer(&self.layer_spec());
        }

        for (name, value) in diff_properties(&previous.paint, &self.paint) {
            scope.set_paint_property(&layer_id, &name, &value)?;
        }
        for (name, value) in diff_properties(&previous.layout, &self.layout) {
            scope.set_layout_property(&layer_id, &name, &value)?;
        }
        if previous.filter != self.filter {
            scope.set_filter(&layer_id, self.filter.as_ref())?;
        }

        Ok(())
    }
}

impl MapResource for GeoJsonLayer {
    fn key(&self) -> &str {
        &self.key
    }

    fn attach(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        scope.add_source(&self.source_id(), &SourceSpec::geojson(self.data.clone()))?;
        scope.add_layer(&self.layer_spec())?;
        self.sync_listeners(scope)
    }

    fn update(&self, previous: &dyn MapResource, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        let Some(previous) = downcast_previous::<GeoJsonLayer>(previous) else {
            return self.attach(scope);
        };

        if previous.data != self.data {
            scope.set_source_data(&self.source_id(), &self.data)?;
        }
        self.update_layer(previous, scope)?;
        self.sync_listeners(scope)
    }

    fn on_layer_event(&self, event: &LayerEvent, _engine: &dyn Engine) -> Vec<Reaction> {
        let handler = match event.kind {
            PointerEventKind::Click => self.on_click.as_ref(),
            PointerEventKind::MouseEnter | PointerEventKind::MouseLeave => self.on_hover.as_ref(),
            PointerEventKind::MouseMove => None,
        };

        handler
            .map(|handler| vec![Reaction::notify(handler, event.clone())])
            .unwrap_or_default()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
