use ahash::{HashSet, HashSetExt};
use mapweave_types::{CameraTarget, StyleRef, Viewport};

use super::options::MapOptions;
use super::LifecycleState;
use crate::context::InstanceId;
use crate::engine::{AnimationId, AnimationOptions, Engine};
use crate::view::ViewportTransition;

/// Kind of an animated camera transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Fly,
    Ease,
}

/// Keeps track of programmatic camera animations.
///
/// Starting a new animation while another one runs supersedes the running one. The engine
/// still reports the end of a superseded animation, and that report must not be taken as the
/// final camera position.
#[derive(Debug, Default)]
pub(crate) struct AnimationTracker {
    active: Option<AnimationId>,
    superseded: HashSet<AnimationId>,
}

impl AnimationTracker {
    /// Marks the running animation as superseded. Returns true if there was one.
    pub(crate) fn interrupt(&mut self) -> bool {
        match self.active.take() {
            Some(id) => {
                self.superseded.insert(id);
                true
            }
            None => false,
        }
    }

    pub(crate) fn begin(&mut self, id: AnimationId) {
        self.active = Some(id);
    }

    /// Registers the end of a movement. Returns false if the movement was a superseded
    /// animation.
    pub(crate) fn finish(&mut self, animation: Option<AnimationId>) -> bool {
        let Some(id) = animation else {
            return true;
        };

        if self.superseded.remove(&id) {
            return false;
        }

        if self.active == Some(id) {
            self.active = None;
        }
        true
    }

    pub(crate) fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.active = None;
        self.superseded = HashSet::new();
    }
}

/// Style replacement in progress.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Restyle {
    /// Camera to restore once the new style is loaded.
    pub(crate) snapshot: Viewport,
    /// Requested style.
    pub(crate) style: StyleRef,
}

/// State shared by the map component and its command handles.
pub(crate) struct MapCore {
    pub(crate) state: LifecycleState,
    pub(crate) engine: Option<Box<dyn Engine>>,
    pub(crate) instance: Option<InstanceId>,
    pub(crate) animations: AnimationTracker,
    pub(crate) options: MapOptions,
    pub(crate) restyle: Option<Restyle>,
    /// Style loaded or being loaded by the engine.
    pub(crate) style: Option<StyleRef>,
}

impl MapCore {
    pub(crate) fn new(options: MapOptions) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            engine: None,
            instance: None,
            animations: AnimationTracker::default(),
            options,
            restyle: None,
            style: None,
        }
    }

    /// Engine of a loaded instance. The camera can be used while the style is replaced.
    pub(crate) fn live_engine(&mut self) -> Option<&mut (dyn Engine + 'static)> {
        if self.state.is_loaded() {
            self.engine.as_deref_mut()
        } else {
            None
        }
    }

    pub(crate) fn camera(&self) -> Option<Viewport> {
        match self.state {
            LifecycleState::Creating | LifecycleState::Loaded | LifecycleState::Restyling => {
                self.engine.as_ref().map(|engine| engine.camera())
            }
            _ => None,
        }
    }

    /// Starts an animated transition, superseding the running one.
    pub(crate) fn animate(
        &mut self,
        transition: Transition,
        target: &CameraTarget,
        options: &AnimationOptions,
    ) -> Option<AnimationId> {
        if !self.state.is_loaded() {
            log::warn!("Map is not loaded, {transition:?} to {target:?} is ignored");
            return None;
        }
        let engine = self.engine.as_deref_mut()?;

        if self.animations.interrupt() {
            log::debug!("Stopping running camera animation");
            engine.stop();
        }

        let id = match transition {
            Transition::Fly => engine.fly_to(target, options),
            Transition::Ease => engine.ease_to(target, options),
        };
        self.animations.begin(id);
        self.retarget_restyle(target);

        Some(id)
    }

    /// Moves the camera instantly.
    pub(crate) fn jump(&mut self, target: &CameraTarget) -> bool {
        if !self.state.is_loaded() {
            log::warn!("Map is not loaded, jump to {target:?} is ignored");
            return false;
        }
        let Some(engine) = self.engine.as_deref_mut() else {
            return false;
        };

        if self.animations.interrupt() {
            engine.stop();
        }
        engine.jump_to(target);
        self.retarget_restyle(target);

        true
    }

    /// Moves the camera to a viewport requested by the host.
    pub(crate) fn apply_viewport(&mut self, viewport: &Viewport) {
        let target = CameraTarget::from(viewport.normalized(self.options.min_zoom, self.options.max_zoom));
        match self.options.viewport_transition {
            ViewportTransition::Jump => {
                self.jump(&target);
            }
            ViewportTransition::Ease { duration } => {
                self.animate(Transition::Ease, &target, &AnimationOptions::with_duration(duration));
            }
        }
    }

    /// The camera moved by the user while the style is replaced is the camera restored after
    /// the replacement. A running animation keeps its target as the restored camera.
    pub(crate) fn follow_camera(&mut self, viewport: Viewport) {
        if self.animations.is_animating() {
            return;
        }
        if let Some(restyle) = &mut self.restyle {
            restyle.snapshot = viewport;
        }
    }

    /// A camera command given while the style is replaced also changes the camera restored
    /// after the replacement.
    fn retarget_restyle(&mut self, target: &CameraTarget) {
        if let Some(restyle) = &mut self.restyle {
            restyle.snapshot = target.apply_to(&restyle.snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superseded_animation_end_is_not_final() {
        let mut tracker = AnimationTracker::default();
        tracker.begin(AnimationId(1));

        assert!(tracker.interrupt());
        tracker.begin(AnimationId(2));

        assert!(!tracker.finish(Some(AnimationId(1))));
        assert!(tracker.is_animating());
        assert!(tracker.finish(Some(AnimationId(2))));
        assert!(!tracker.is_animating());
    }

    #[test]
    fn restored_camera_follows_gestures_but_not_animation_frames() {
        let start = Viewport::default();
        let panned = start.with_bearing(45.0);
        let mut core = MapCore::new(MapOptions::default());
        core.restyle = Some(Restyle {
            snapshot: start,
            style: StyleRef::from("https://example.com/dark.json"),
        });

        core.follow_camera(panned);
        assert_eq!(core.restyle.as_ref().map(|r| r.snapshot), Some(panned));

        core.animations.begin(AnimationId(1));
        core.follow_camera(start);
        assert_eq!(core.restyle.as_ref().map(|r| r.snapshot), Some(panned));
    }

    #[test]
    fn gestures_always_finish() {
        let mut tracker = AnimationTracker::default();
        assert!(tracker.finish(None));
        assert!(!tracker.interrupt());
    }
}
