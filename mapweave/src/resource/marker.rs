use std::any::Any;
use std::sync::Arc;

use mapweave_types::geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value as GeometryValue};
use mapweave_types::{Color, LngLat};
use serde_json::Value;

use super::{downcast_previous, GeoJsonLayer, MapResource, Reaction, ResourceScope};
use crate::callback::{Handler, SharedHandler};
use crate::engine::{Engine, LayerEvent, LayerKind, MarkerSpec, PointerEventKind, Subscription};
use crate::error::ResourceError;

const MARKER_ID_PROPERTY: &str = "marker_id";

/// Marker clicked by the user.
///
/// A [`Marker`] and a [`MarkerPoint`] of a [`MarkerLayer`] with the same id at the same
/// position produce equal clicks.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerClick {
    /// Id of the marker.
    pub marker_id: String,
    /// Position of the marker.
    pub lnglat: LngLat,
}

/// Marker rendered by the engine as a DOM element. The key is the marker id.
#[derive(Clone)]
pub struct Marker {
    key: String,
    lnglat: LngLat,
    popup: Option<String>,
    on_click: Option<SharedHandler<MarkerClick>>,
}

impl Marker {
    /// Creates a marker at the given position.
    pub fn new(key: impl Into<String>, lnglat: LngLat) -> Self {
        Self {
            key: key.into(),
            lnglat,
            popup: None,
            on_click: None,
        }
    }

    /// Text shown in a popup when the marker is clicked.
    pub fn with_popup(mut self, text: impl Into<String>) -> Self {
        self.popup = Some(text.into());
        self
    }

    /// Called when the marker is clicked.
    pub fn on_click(mut self, handler: impl Handler<MarkerClick> + 'static) -> Self {
        self.on_click = Some(Arc::new(handler));
        self
    }

    fn subscription(&self) -> Subscription {
        Subscription::Marker {
            marker_id: self.key.clone(),
        }
    }
}

impl MapResource for Marker {
    fn key(&self) -> &str {
        &self.key
    }

    fn attach(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        scope.add_marker(
            &self.key,
            &MarkerSpec {
                lnglat: self.lnglat,
                popup: self.popup.clone(),
            },
        )?;
        scope.set_listening(self.subscription(), self.on_click.is_some())
    }

    fn update(&self, previous: &dyn MapResource, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        let Some(previous) = downcast_previous::<Marker>(previous) else {
            return self.attach(scope);
        };

        if previous.lnglat != self.lnglat {
            scope.set_marker_lnglat(&self.key, self.lnglat)?;
        }
        if previous.popup != self.popup {
            scope.set_marker_popup(&self.key, self.popup.as_deref())?;
        }
        scope.set_listening(self.subscription(), self.on_click.is_some())
    }

    fn on_marker_click(&self, marker_id: &str, _engine: &dyn Engine) -> Vec<Reaction> {
        self.on_click
            .as_ref()
            .map(|handler| {
                vec![Reaction::notify(
                    handler,
                    MarkerClick {
                        marker_id: marker_id.to_string(),
                        lnglat: self.lnglat,
                    },
                )]
            })
            .unwrap_or_default()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Marker of a [`MarkerLayer`].
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPoint {
    /// Marker id reported on click.
    pub id: String,
    /// Marker position.
    pub lnglat: LngLat,
}

impl MarkerPoint {
    /// Creates a marker point.
    pub fn new(id: impl Into<String>, lnglat: LngLat) -> Self {
        Self { id: id.into(), lnglat }
    }
}

/// Many markers drawn by a single circle layer instead of a DOM element each.
///
/// Use it when there are too many markers for DOM elements. Clicks resolve to the same
/// [`MarkerClick`] a [`Marker`] with the same id would produce.
#[derive(Clone)]
pub struct MarkerLayer {
    key: String,
    markers: Vec<MarkerPoint>,
    color: Color,
    radius: f64,
    on_click: Option<SharedHandler<MarkerClick>>,
}

impl MarkerLayer {
    /// Creates a marker layer.
    pub fn new(key: impl Into<String>, markers: impl IntoIterator<Item = MarkerPoint>) -> Self {
        Self {
            key: key.into(),
            markers: markers.into_iter().collect(),
            color: Color::ROUTE_BLUE,
            radius: 6.0,
            on_click: None,
        }
    }

    /// Sets the marker color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sets the marker radius in pixels.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Called when a marker is clicked.
    pub fn on_click(mut self, handler: impl Handler<MarkerClick> + 'static) -> Self {
        self.on_click = Some(Arc::new(handler));
        self
    }

    fn layer(&self) -> GeoJsonLayer {
        let features = self
            .markers
            .iter()
            .map(|marker| {
                let mut properties = JsonObject::new();
                properties.insert(MARKER_ID_PROPERTY.to_string(), Value::String(marker.id.clone()));
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(GeometryValue::Point(marker.lnglat.to_position()))),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let data = GeoJson::FeatureCollection(FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        });

        GeoJsonLayer::new(self.key.clone(), data, LayerKind::Circle)
            .with_paint("circle-color", self.color.to_css())
            .with_paint("circle-radius", self.radius)
            .capturing_clicks(self.on_click.is_some())
    }
}

impl MapResource for MarkerLayer {
    fn key(&self) -> &str {
        &self.key
    }

    fn attach(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        self.layer().attach(scope)
    }

    fn update(&self, previous: &dyn MapResource, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        match downcast_previous::<MarkerLayer>(previous) {
            Some(previous) => self.layer().update(&previous.layer(), scope),
            None => self.attach(scope),
        }
    }

    fn on_layer_event(&self, event: &LayerEvent, _engine: &dyn Engine) -> Vec<Reaction> {
        let Some(handler) = &self.on_click else {
            return vec![];
        };
        if event.kind != PointerEventKind::Click {
            return vec![];
        }

        let marker = event
            .feature()
            .and_then(|feature| feature.property(MARKER_ID_PROPERTY))
            .and_then(Value::as_str)
            .and_then(|id| self.markers.iter().find(|marker| marker.id == id));

        match marker {
            Some(marker) => vec![Reaction::notify(
                handler,
                MarkerClick {
                    marker_id: marker.id.clone(),
                    lnglat: marker.lnglat,
                },
            )],
            None => {
                log::debug!("Click on {} did not hit a known marker", event.layer_id);
                vec![]
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
