//! Reconciliation of the declarative viewport props with the engine camera.

use std::time::Duration;

use mapweave_types::{CameraTarget, Viewport};
use serde::{Deserialize, Serialize};

/// Viewport props of a map component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportProps {
    /// The host owns the viewport and mirrors every camera change through
    /// `on_viewport_change`.
    Controlled(Viewport),
    /// The component owns the viewport. The values only seed the camera on mount.
    Uncontrolled(CameraTarget),
}

impl Default for ViewportProps {
    fn default() -> Self {
        Self::Uncontrolled(CameraTarget::default())
    }
}

impl ViewportProps {
    /// Ownership mode of the props.
    pub fn mode(&self) -> ViewportMode {
        match self {
            ViewportProps::Controlled(_) => ViewportMode::Controlled,
            ViewportProps::Uncontrolled(_) => ViewportMode::Uncontrolled,
        }
    }

    /// Camera the engine is created with.
    pub fn seed(&self) -> Viewport {
        match self {
            ViewportProps::Controlled(viewport) => *viewport,
            ViewportProps::Uncontrolled(initial) => initial.apply_to(&Viewport::default()),
        }
    }
}

/// Who owns the viewport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportMode {
    /// Host owns the viewport.
    Controlled,
    /// Component owns the viewport.
    Uncontrolled,
}

/// How a changed controlled viewport is applied to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ViewportTransition {
    /// Move instantly.
    Jump,
    /// Animate with an eased transition.
    Ease {
        /// Transition duration.
        #[serde(with = "crate::engine::duration_millis")]
        duration: Duration,
    },
}

impl Default for ViewportTransition {
    fn default() -> Self {
        Self::Ease {
            duration: Duration::from_millis(300),
        }
    }
}

/// Decides which viewport props turn into engine camera calls.
///
/// The engine is the source of truth for the camera. The reconciler remembers the last camera
/// reported by the engine and the last camera it asked for, and a controlled viewport equal
/// to either of them is an echo that produces no call.
#[derive(Debug)]
pub(crate) struct ViewportReconciler {
    mode: ViewportMode,
    initial: ViewportProps,
    last_reported: Option<Viewport>,
    last_applied: Option<Viewport>,
    pending: Option<Viewport>,
    conflict_reported: bool,
}

impl ViewportReconciler {
    pub(crate) fn new(props: &ViewportProps) -> Self {
        Self {
            mode: props.mode(),
            initial: *props,
            last_reported: None,
            last_applied: None,
            pending: None,
            conflict_reported: false,
        }
    }

    pub(crate) fn mode(&self) -> ViewportMode {
        self.mode
    }

    /// Returns the camera to apply for the new props, if any.
    ///
    /// Before the instance is loaded a changed controlled viewport is kept and returned by
    /// [`ViewportReconciler::take_pending`] once it is.
    pub(crate) fn update(&mut self, props: &ViewportProps, loaded: bool) -> Option<Viewport> {
        if props.mode() != self.mode {
            if !self.conflict_reported {
                log::warn!(
                    "Map viewport mode cannot change from {:?} to {:?} after mount, the new props are ignored",
                    self.mode,
                    props.mode()
                );
                self.conflict_reported = true;
            }
            return None;
        }

        match props {
            ViewportProps::Uncontrolled(_) => {
                if *props != self.initial {
                    log::debug!("Initial camera props changed after mount, ignoring");
                }
                None
            }
            ViewportProps::Controlled(viewport) => {
                if self.is_echo(viewport) {
                    return None;
                }

                if !loaded {
                    self.pending = Some(*viewport);
                    return None;
                }

                self.last_applied = Some(*viewport);
                Some(*viewport)
            }
        }
    }

    fn is_echo(&self, viewport: &Viewport) -> bool {
        self.last_reported.as_ref() == Some(viewport)
            || self.last_applied.as_ref() == Some(viewport)
            || self.pending.as_ref() == Some(viewport)
            || (self.last_reported.is_none() && self.initial.seed() == *viewport)
    }

    pub(crate) fn take_pending(&mut self) -> Option<Viewport> {
        let pending = self.pending.take()?;
        self.last_applied = Some(pending);
        Some(pending)
    }

    /// Records a camera reported by the engine.
    pub(crate) fn camera_moved(&mut self, viewport: Viewport) {
        self.last_reported = Some(viewport);
    }

    /// The engine finished a movement, a repeated host request for the same camera is a new
    /// command from now on.
    pub(crate) fn camera_settled(&mut self, viewport: Viewport) {
        self.last_reported = Some(viewport);
        self.last_applied = None;
    }
}
