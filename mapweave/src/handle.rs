//! Imperative commands given to the map from outside of the declarative tree.

use std::sync::{Arc, Weak};

use mapweave_types::{CameraTarget, Viewport};
use parking_lot::RwLock;

use crate::engine::{AnimationId, AnimationOptions, Engine};
use crate::map::{MapCore, Transition};

/// Command handle of a mounted map.
///
/// The handle does not keep the map alive. Once the map is unmounted every command is a no-op.
#[derive(Debug, Clone)]
pub struct MapHandle {
    core: Weak<RwLock<MapCore>>,
}

impl MapHandle {
    pub(crate) fn new(core: Weak<RwLock<MapCore>>) -> Self {
        Self { core }
    }

    /// Flies the camera along a zoom-out, zoom-in arc to the target.
    ///
    /// Stops the running programmatic animation. Returns `None` and logs a warning if the map
    /// is not loaded.
    pub fn fly_to(&self, target: CameraTarget, options: AnimationOptions) -> Option<AnimationId> {
        self.animate(Transition::Fly, target, options)
    }

    /// Animates the camera to the target with an eased transition.
    ///
    /// Stops the running programmatic animation. Returns `None` and logs a warning if the map
    /// is not loaded.
    pub fn ease_to(&self, target: CameraTarget, options: AnimationOptions) -> Option<AnimationId> {
        self.animate(Transition::Ease, target, options)
    }

    /// Moves the camera to the target instantly. Returns false if the map is not loaded.
    pub fn jump_to(&self, target: CameraTarget) -> bool {
        let Some(core) = self.core.upgrade() else {
            log::warn!("Map is unmounted, jump is ignored");
            return false;
        };
        let mut core = core.write();
        core.jump(&target)
    }

    /// Gives direct access to the engine instance of a loaded map.
    ///
    /// Use it for engine features not covered by the crate. The closure must not use the map
    /// handle, and objects added to the engine here are not managed by the map.
    pub fn with_instance<R>(&self, f: impl FnOnce(&mut dyn Engine) -> R) -> Option<R> {
        let core = self.core.upgrade()?;
        let mut core = core.write();
        let engine = core.live_engine()?;
        Some(f(engine))
    }

    /// Whether the engine instance is ready.
    pub fn is_loaded(&self) -> bool {
        self.core
            .upgrade()
            .map(|core| core.read().state.is_loaded())
            .unwrap_or(false)
    }

    /// Current camera of the engine.
    pub fn viewport(&self) -> Option<Viewport> {
        self.core.upgrade()?.read().camera()
    }

    fn animate(&self, transition: Transition, target: CameraTarget, options: AnimationOptions) -> Option<AnimationId> {
        let Some(core) = self.core.upgrade() else {
            log::warn!("Map is unmounted, {transition:?} is ignored");
            return None;
        };
        let mut core = core.write();
        core.animate(transition, &target, &options)
    }
}

/// External reference to a map, created by the host before the map exists.
///
/// Attach it with [`MapComponent::attach`](crate::MapComponent::attach). All commands are
/// no-ops while the reference is not attached to a map.
#[derive(Debug, Clone, Default)]
pub struct MapRef {
    inner: Arc<RwLock<Option<MapHandle>>>,
}

impl MapRef {
    /// Creates an empty reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the attached map.
    pub fn handle(&self) -> Option<MapHandle> {
        self.inner.read().clone()
    }

    /// Whether a map is attached.
    pub fn is_attached(&self) -> bool {
        self.inner.read().is_some()
    }

    /// See [`MapHandle::fly_to`].
    pub fn fly_to(&self, target: CameraTarget, options: AnimationOptions) -> Option<AnimationId> {
        self.handle()?.fly_to(target, options)
    }

    /// See [`MapHandle::ease_to`].
    pub fn ease_to(&self, target: CameraTarget, options: AnimationOptions) -> Option<AnimationId> {
        self.handle()?.ease_to(target, options)
    }

    /// See [`MapHandle::jump_to`].
    pub fn jump_to(&self, target: CameraTarget) -> bool {
        self.handle().map(|handle| handle.jump_to(target)).unwrap_or(false)
    }

    /// See [`MapHandle::with_instance`].
    pub fn with_instance<R>(&self, f: impl FnOnce(&mut dyn Engine) -> R) -> Option<R> {
        self.handle()?.with_instance(f)
    }

    /// See [`MapHandle::is_loaded`].
    pub fn is_loaded(&self) -> bool {
        self.handle().map(|handle| handle.is_loaded()).unwrap_or(false)
    }

    /// See [`MapHandle::viewport`].
    pub fn viewport(&self) -> Option<Viewport> {
        self.handle()?.viewport()
    }

    pub(crate) fn attach(&self, handle: MapHandle) {
        *self.inner.write() = Some(handle);
    }

    pub(crate) fn detach(&self) {
        *self.inner.write() = None;
    }
}
