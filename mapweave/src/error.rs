//! Error types used by the crate.

use thiserror::Error;

/// Failure reported by the engine binding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The container element is not available to the engine.
    #[error("map container is not available")]
    ContainerUnavailable,
    /// The style could not be downloaded or parsed.
    #[error("failed to load style {0}")]
    StyleUnreachable(String),
    /// A source operation was rejected.
    #[error("source {id}: {reason}")]
    Source {
        /// Source id.
        id: String,
        /// Engine message.
        reason: String,
    },
    /// A layer operation was rejected.
    #[error("layer {id}: {reason}")]
    Layer {
        /// Layer id.
        id: String,
        /// Engine message.
        reason: String,
    },
    /// A marker or control operation was rejected.
    #[error("element {id}: {reason}")]
    Element {
        /// Marker or control id.
        id: String,
        /// Engine message.
        reason: String,
    },
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}

/// Invalid combination of map props.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Both a controlled `viewport` and uncontrolled initial camera values were given.
    #[error("`viewport` cannot be combined with `center`, `zoom`, `bearing` or `pitch`")]
    MixedViewportModes,
    /// A controlled `viewport` was given without `on_viewport_change`.
    #[error("controlled `viewport` requires an `on_viewport_change` callback")]
    MissingViewportCallback,
    /// `min_zoom` is greater than `max_zoom`.
    #[error("min zoom {min} is greater than max zoom {max}")]
    InvalidZoomRange {
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },
}

/// Failure of a single declarative resource. It never affects other resources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceError {
    /// The engine rejected an operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The engine id is registered by another resource.
    #[error("`{id}` is owned by resource `{owner}`")]
    NotOwned {
        /// Engine id of the source, layer, marker or control.
        id: String,
        /// Key of the owning resource.
        owner: String,
    },
    /// The engine id was never registered by the resource.
    #[error("`{0}` is not registered")]
    NotRegistered(String),
    /// The declared data cannot be turned into engine objects.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

/// Map component error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// Props are inconsistent.
    #[error("invalid map configuration: {0}")]
    Config(#[from] ConfigError),
    /// Mount was called without a container element.
    #[error("map container is missing")]
    ContainerMissing,
    /// Engine construction or loading failed.
    #[error("map engine failed: {0}")]
    Engine(#[from] EngineError),
    /// A declarative resource failed.
    #[error("resource `{key}` failed: {source}")]
    Resource {
        /// Resource key.
        key: String,
        /// Failure.
        source: ResourceError,
    },
}
