use std::any::Any;
use std::sync::Arc;

use mapweave_types::geojson::{Feature, GeoJson, Geometry, Value as GeometryValue};
use mapweave_types::{Color, LngLat};
use serde_json::json;

use super::{downcast_previous, GeoJsonLayer, MapResource, Reaction, ResourceScope};
use crate::callback::{Handler, SharedHandler};
use crate::engine::{Engine, LayerEvent, LayerKind};
use crate::error::ResourceError;

/// Route geometry drawn as a line.
///
/// The geometry is computed by the host (e.g. by a routing service) and given as a list of
/// coordinates. Uses the same ids as a [`GeoJsonLayer`] with the same key.
#[derive(Clone)]
pub struct RouteLine {
    key: String,
    coordinates: Vec<LngLat>,
    color: Color,
    width: f64,
    opacity: f64,
    dash: Option<Vec<f64>>,
    on_click: Option<SharedHandler<LayerEvent>>,
}

impl RouteLine {
    /// Creates a route through the given coordinates.
    pub fn new(key: impl Into<String>, coordinates: impl IntoIterator<Item = LngLat>) -> Self {
        Self {
            key: key.into(),
            coordinates: coordinates.into_iter().collect(),
            color: Color::ROUTE_BLUE,
            width: 3.0,
            opacity: 0.8,
            dash: None,
            on_click: None,
        }
    }

    /// Sets the line color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the line width in pixels.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// Sets the line opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Draws a dashed line. Dash and gap lengths are in line widths.
    pub fn with_dash(mut self, dash: Vec<f64>) -> Self {
        self.dash = Some(dash);
        self
    }

    /// Called when the route is clicked, e.g. to select one of alternative routes.
    pub fn on_click(mut self, handler: impl Handler<LayerEvent> + 'static) -> Self {
        self.on_click = Some(Arc::new(handler));
        self
    }

    fn layer(&self) -> Result<GeoJsonLayer, ResourceError> {
        if self.coordinates.len() < 2 {
            return Err(ResourceError::InvalidData(format!(
                "route `{}` needs at least 2 coordinates, got {}",
                self.key,
                self.coordinates.len()
            )));
        }

        let geometry = Geometry::new(GeometryValue::LineString(
            self.coordinates.iter().map(LngLat::to_position).collect(),
        ));
        let feature = Feature {
            bbox: None,
            geometry: Some(geometry),
            id: None,
            properties: None,
            foreign_members: None,
        };

        let mut layer = GeoJsonLayer::new(self.key.clone(), GeoJson::Feature(feature), LayerKind::Line)
            .with_paint("line-color", self.color.to_css())
            .with_paint("line-width", self.width)
            .with_paint("line-opacity", self.opacity)
            .with_layout("line-join", "round")
            .with_layout("line-cap", "round")
            .with_click_handler(self.on_click.clone());

        if let Some(dash) = &self.dash {
            layer = layer.with_paint("line-dasharray", json!(dash));
        }

        Ok(layer)
    }
}

impl MapResource for RouteLine {
    fn key(&self) -> &str {
        &self.key
    }

    fn attach(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        self.layer()?.attach(scope)
    }

    fn update(&self, previous: &dyn MapResource, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        match downcast_previous::<RouteLine>(previous) {
            Some(previous) => self.layer()?.update(&previous.layer()?, scope),
            None => self.attach(scope),
        }
    }

    fn on_layer_event(&self, event: &LayerEvent, engine: &dyn Engine) -> Vec<Reaction> {
        match self.layer() {
            Ok(layer) => layer.on_layer_event(event, engine),
            Err(_) => vec![],
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
