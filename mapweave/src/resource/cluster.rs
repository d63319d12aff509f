use std::any::Any;
use std::sync::Arc;

use mapweave_types::geojson::{GeoJson, Value as GeometryValue};
use mapweave_types::{CameraTarget, Color, LngLat};
use serde_json::{json, Value};

use super::{diff_properties, downcast_previous, MapResource, Reaction, ResourceScope};
use crate::callback::{Handler, SharedHandler};
use crate::engine::{
    ClusterOptions, Engine, LayerEvent, LayerKind, LayerSpec, PointerEventKind, SourceSpec, Subscription,
};
use crate::error::ResourceError;

/// Maps the number of points in a cluster to its appearance.
///
/// Clusters with fewer points than the first threshold use the first color and radius,
/// clusters with fewer points than the second threshold the second ones, and all larger
/// clusters the last ones.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStyle {
    /// Cluster colors, from small to large.
    pub colors: [Color; 3],
    /// Point counts at which the next color and radius start.
    pub thresholds: [u64; 2],
    /// Cluster circle radii in pixels, from small to large.
    pub radii: [f64; 3],
    /// Color of single points.
    pub point_color: Color,
    /// Radius of single points in pixels.
    pub point_radius: f64,
}

impl Default for ClusterStyle {
    fn default() -> Self {
        Self {
            colors: [Color::CLUSTER_SMALL, Color::CLUSTER_MEDIUM, Color::CLUSTER_LARGE],
            thresholds: [100, 750],
            radii: [20.0, 30.0, 40.0],
            point_color: Color::CLUSTER_SMALL,
            point_radius: 6.0,
        }
    }
}

impl ClusterStyle {
    fn step(&self, count: u64) -> usize {
        self.thresholds.iter().take_while(|t| count >= **t).count()
    }

    /// Color of a cluster with `count` points.
    pub fn color_for(&self, count: u64) -> Color {
        self.colors[self.step(count)]
    }

    /// Radius of a cluster with `count` points.
    pub fn radius_for(&self, count: u64) -> f64 {
        self.radii[self.step(count)]
    }

    /// Label of a cluster with `count` points, abbreviated the same way as the
    /// `point_count_abbreviated` property of clustered sources.
    pub fn label_for(count: u64) -> String {
        if count >= 10_000 {
            format!("{}k", (count as f64 / 1000.0).round())
        } else if count >= 1000 {
            format!("{}k", (count as f64 / 100.0).round() / 10.0)
        } else {
            count.to_string()
        }
    }

    fn color_expression(&self) -> Value {
        json!([
            "step",
            ["get", "point_count"],
            self.colors[0].to_css(),
            self.thresholds[0],
            self.colors[1].to_css(),
            self.thresholds[1],
            self.colors[2].to_css(),
        ])
    }

    fn radius_expression(&self) -> Value {
        json!([
            "step",
            ["get", "point_count"],
            self.radii[0],
            self.thresholds[0],
            self.radii[1],
            self.thresholds[1],
            self.radii[2],
        ])
    }
}

/// Cluster clicked by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterClick {
    /// Cluster id assigned by the engine.
    pub cluster_id: u64,
    /// Number of points in the cluster.
    pub point_count: u64,
    /// Position of the cluster.
    pub lnglat: LngLat,
    /// Zoom at which the cluster breaks apart, if the engine knows it.
    pub expansion_zoom: Option<f64>,
}

/// Point data aggregated into clusters by the engine.
///
/// Registers a clustered source `{key}-source` and three layers: cluster circles
/// (`{key}-clusters`), cluster labels (`{key}-cluster-count`) and unclustered points
/// (`{key}-points`).
#[derive(Clone)]
pub struct ClusterLayer {
    key: String,
    data: GeoJson,
    options: ClusterOptions,
    style: ClusterStyle,
    zoom_on_click: bool,
    on_point_click: Option<SharedHandler<LayerEvent>>,
    on_cluster_click: Option<SharedHandler<ClusterClick>>,
}

impl ClusterLayer {
    /// Creates a cluster layer with default options. Clicking a cluster zooms into it.
    pub fn new(key: impl Into<String>, data: impl Into<GeoJson>) -> Self {
        Self {
            key: key.into(),
            data: data.into(),
            options: ClusterOptions::default(),
            style: ClusterStyle::default(),
            zoom_on_click: true,
            on_point_click: None,
            on_cluster_click: None,
        }
    }

    /// Sets the clustering parameters.
    pub fn with_options(mut self, options: ClusterOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the cluster appearance.
    pub fn with_style(mut self, style: ClusterStyle) -> Self {
        self.style = style;
        self
    }

    /// Whether clicking a cluster zooms the map to where the cluster breaks apart.
    pub fn with_zoom_on_click(mut self, zoom_on_click: bool) -> Self {
        self.zoom_on_click = zoom_on_click;
        self
    }

    /// Called when an unclustered point is clicked.
    pub fn on_point_click(mut self, handler: impl Handler<LayerEvent> + 'static) -> Self {
        self.on_point_click = Some(Arc::new(handler));
        self
    }

    /// Called when a cluster is clicked.
    pub fn on_cluster_click(mut self, handler: impl Handler<ClusterClick> + 'static) -> Self {
        self.on_cluster_click = Some(Arc::new(handler));
        self
    }

    fn source_id(&self) -> String {
        format!("{}-source", self.key)
    }

    fn clusters_id(&self) -> String {
        format!("{}-clusters", self.key)
    }

    fn count_id(&self) -> String {
        format!("{}-cluster-count", self.key)
    }

    fn points_id(&self) -> String {
        format!("{}-points", self.key)
    }

    fn layer_specs(&self) -> [LayerSpec; 3] {
        let source = self.source_id();
        [
            LayerSpec::new(self.clusters_id(), &source, LayerKind::Circle)
                .with_paint("circle-color", self.style.color_expression())
                .with_paint("circle-radius", self.style.radius_expression())
                .with_filter(Some(json!(["has", "point_count"]))),
            LayerSpec::new(self.count_id(), &source, LayerKind::Symbol)
                .with_layout("text-field", "{point_count_abbreviated}")
                .with_layout("text-size", 12)
                .with_filter(Some(json!(["has", "point_count"]))),
            LayerSpec::new(self.points_id(), source, LayerKind::Circle)
                .with_paint("circle-color", self.style.point_color.to_css())
                .with_paint("circle-radius", self.style.point_radius)
                .with_filter(Some(json!(["!", ["has", "point_count"]]))),
        ]
    }

    fn add_all(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        scope.add_source(
            &self.source_id(),
            &SourceSpec {
                data: self.data.clone(),
                cluster: Some(self.options),
            },
        )?;
        for spec in self.layer_specs() {
            scope.add_layer(&spec)?;
        }

        Ok(())
    }

    fn remove_all(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        for spec in self.layer_specs().iter().rev() {
            scope.remove_layer(&spec.id)?;
        }
        scope.remove_source(&self.source_id())
    }

    fn sync_listeners(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        scope.set_listening(
            Subscription::Layer {
                kind: PointerEventKind::Click,
                layer_id: self.clusters_id(),
            },
            self.zoom_on_click || self.on_cluster_click.is_some(),
        )?;
        scope.set_listening(
            Subscription::Layer {
                kind: PointerEventKind::Click,
                layer_id: self.points_id(),
            },
            self.on_point_click.is_some(),
        )
    }

    fn cluster_clicked(&self, event: &LayerEvent, engine: &dyn Engine) -> Vec<Reaction> {
        let Some(feature) = event.feature() else {
            return vec![];
        };
        let Some(cluster_id) = feature.property("cluster_id").and_then(Value::as_u64) else {
            log::debug!("Clicked feature of {} is not a cluster", self.clusters_id());
            return vec![];
        };
        let point_count = feature.property("point_count").and_then(Value::as_u64).unwrap_or(0);
        let lnglat = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(GeometryValue::Point(position)) if position.len() >= 2 => LngLat::new(position[0], position[1]),
            _ => event.lnglat,
        };

        let expansion_zoom = engine.cluster_expansion_zoom(&self.source_id(), cluster_id);

        let mut reactions = vec![];
        if self.zoom_on_click {
            match expansion_zoom {
                Some(zoom) => reactions.push(Reaction::EaseTo(CameraTarget::center(lnglat).with_zoom(zoom))),
                None => log::debug!("Engine does not know the expansion zoom of cluster {cluster_id}"),
            }
        }
        if let Some(handler) = &self.on_cluster_click {
            reactions.push(Reaction::notify(
                handler,
                ClusterClick {
                    cluster_id,
                    point_count,
                    lnglat,
                    expansion_zoom,
                },
            ));
        }

        reactions
    }
}

impl MapResource for ClusterLayer {
    fn key(&self) -> &str {
        &self.key
    }

    fn attach(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        self.add_all(scope)?;
        self.sync_listeners(scope)
    }

    fn update(&self, previous: &dyn MapResource, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        let Some(previous) = downcast_previous::<ClusterLayer>(previous) else {
            return self.attach(scope);
        };

        if previous.options != self.options {
            // clustering parameters are fixed when the source is created
            previous.remove_all(scope)?;
            return self.attach(scope);
        }

        if previous.data != self.data {
            scope.set_source_data(&self.source_id(), &self.data)?;
        }

        for (old, new) in previous.layer_specs().iter().zip(self.layer_specs().iter()) {
            for (name, value) in diff_properties(&old.paint, &new.paint) {
                scope.set_paint_property(&new.id, &name, &value)?;
            }
            for (name, value) in diff_properties(&old.layout, &new.layout) {
                scope.set_layout_property(&new.id, &name, &value)?;
            }
        }

        self.sync_listeners(scope)
    }

    fn on_layer_event(&self, event: &LayerEvent, engine: &dyn Engine) -> Vec<Reaction> {
        if event.kind != PointerEventKind::Click {
            return vec![];
        }

        if event.layer_id == self.clusters_id() {
            self.cluster_clicked(event, engine)
        } else if event.layer_id == self.points_id() {
            self.on_point_click
                .as_ref()
                .map(|handler| vec![Reaction::notify(handler, event.clone())])
                .unwrap_or_default()
        } else {
            vec![]
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
