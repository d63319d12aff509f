use mapweave_types::geojson::GeoJson;
use mapweave_types::LngLat;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};

/// Description of a GeoJSON source registered in the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Source data.
    pub data: GeoJson,
    /// Clustering parameters. Engine aggregates points into clusters when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterOptions>,
}

impl SourceSpec {
    /// Plain GeoJSON source.
    pub fn geojson(data: GeoJson) -> Self {
        Self {
            data,
            cluster: None,
        }
    }
}

/// Clustering parameters of a source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterOptions {
    /// Radius of each cluster in pixels.
    pub radius: u32,
    /// Max zoom level at which points are still clustered.
    pub max_zoom: u32,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: 50,
            max_zoom: 14,
        }
    }
}

/// Rendering type of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Filled polygons.
    Fill,
    /// Lines and polygon outlines.
    Line,
    /// Points drawn as circles.
    Circle,
    /// Icons and text labels.
    Symbol,
}

/// Description of a style layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Unique layer id.
    pub id: String,
    /// Id of the source the layer draws.
    pub source: String,
    /// Layer type.
    #[serde(rename = "type")]
    pub kind: LayerKind,
    /// Paint properties.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub paint: JsonMap<String, Value>,
    /// Layout properties.
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub layout: JsonMap<String, Value>,
    /// Feature filter expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

impl LayerSpec {
    /// Creates a layer without paint, layout or filter.
    pub fn new(id: impl Into<String>, source: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            kind,
            paint: JsonMap::new(),
            layout: JsonMap::new(),
            filter: None,
        }
    }

    /// Sets a paint property.
    pub fn with_paint(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.paint.insert(name.to_string(), value.into());
        self
    }

    /// Sets a layout property.
    pub fn with_layout(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.layout.insert(name.to_string(), value.into());
        self
    }

    /// Sets the filter expression.
    pub fn with_filter(mut self, filter: Option<Value>) -> Self {
        self.filter = filter;
        self
    }
}

/// Engine-side DOM marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    /// Marker position.
    pub lnglat: LngLat,
    /// Text of the popup opened on click.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
}

/// Built-in map control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    /// Zoom in/out buttons.
    Zoom,
    /// Compass, resets bearing and pitch.
    Compass,
    /// Centers the map on the user location.
    Locate,
    /// Toggles fullscreen.
    Fullscreen,
}

/// Corner of the map the controls are placed in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlPosition {
    /// Top left corner.
    TopLeft,
    /// Top right corner.
    TopRight,
    /// Bottom left corner.
    BottomLeft,
    /// Bottom right corner.
    #[default]
    BottomRight,
}

/// A control placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSpec {
    /// Control type.
    pub kind: ControlKind,
    /// Placement.
    pub position: ControlPosition,
}
