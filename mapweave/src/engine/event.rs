use mapweave_types::geojson::Feature;
use mapweave_types::{LngLat, Viewport};

use crate::engine::AnimationId;
use crate::error::EngineError;

/// Event emitted by the engine. The binding adapter gives these to
/// [`MapComponent::dispatch`](crate::MapComponent::dispatch) in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The instance finished its first style load and is ready for use.
    Load,
    /// A style finished loading after [`Engine::set_style`](crate::Engine::set_style).
    StyleLoad {
        /// The style that was loaded.
        style: mapweave_types::StyleRef,
    },
    /// Camera moved. Emitted for every frame of gestures and animations.
    Move {
        /// Camera after the move.
        viewport: Viewport,
        /// Programmatic animation causing the move, if any.
        animation: Option<AnimationId>,
    },
    /// Camera stopped moving, either because the movement completed or because it was stopped.
    MoveEnd {
        /// Camera at the end of the movement.
        viewport: Viewport,
        /// Programmatic animation that ended, if any.
        animation: Option<AnimationId>,
    },
    /// Pointer interaction with a layer.
    Layer(LayerEvent),
    /// The map was clicked. Delivered once per click while at least one
    /// [`Subscription::Click`] listener is bound.
    Click {
        /// Geographic position of the click.
        lnglat: LngLat,
    },
    /// A DOM marker was clicked.
    MarkerClick {
        /// Engine id of the marker.
        marker_id: String,
    },
    /// Engine failure.
    Error(EngineError),
}

/// Kind of pointer interaction with a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// Click on a feature of the layer.
    Click,
    /// Pointer entered a feature of the layer.
    MouseEnter,
    /// Pointer left the layer's features.
    MouseLeave,
    /// Pointer moved over a feature of the layer.
    MouseMove,
}

/// Pointer interaction with a specific layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEvent {
    /// Interaction kind.
    pub kind: PointerEventKind,
    /// Layer id the interaction is bound to.
    pub layer_id: String,
    /// Geographic position of the pointer.
    pub lnglat: LngLat,
    /// Features under the pointer, topmost first. Empty for [`PointerEventKind::MouseLeave`].
    pub features: Vec<Feature>,
}

impl LayerEvent {
    /// The topmost feature under the pointer.
    pub fn feature(&self) -> Option<&Feature> {
        self.features.first()
    }
}

/// Engine event types a listener can subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Instance ready.
    Load,
    /// Style loaded.
    StyleLoad,
    /// Camera moves.
    Move,
    /// Camera movement end.
    MoveEnd,
    /// Engine errors.
    Error,
    /// Clicks anywhere on the map.
    Click,
    /// Pointer interaction with the given layer.
    Layer {
        /// Interaction kind.
        kind: PointerEventKind,
        /// Layer id.
        layer_id: String,
    },
    /// Clicks on the given DOM marker.
    Marker {
        /// Marker id.
        marker_id: String,
    },
}
