//! Map component: owns the engine instance and drives its lifecycle.

use std::sync::Arc;

use mapweave_types::{CameraTarget, LngLat, MapStyles, StyleRef, Theme, Viewport};
use parking_lot::RwLock;

use crate::callback::MapCallbacks;
use crate::context::{InstanceId, MapContext, MapContextReceiver};
use crate::engine::{AnimationId, AnimationOptions, Container, EngineEvent, EngineFactory, LayerEvent, ListenerId, Subscription};
use crate::error::MapError;
use crate::handle::{MapHandle, MapRef};
use crate::resource::{MapResource, Reaction, ResourceRegistry, ResourceStatus};
use crate::view::{ViewportProps, ViewportReconciler};

mod builder;
mod options;
mod shared;

pub use builder::{MapProps, MapPropsBuilder};
pub use options::{MapOptions, RestylePolicy};
pub(crate) use shared::{MapCore, Restyle, Transition};

/// Lifecycle state of the engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not mounted yet.
    Uninitialized,
    /// The engine is constructed and loads its first style.
    Creating,
    /// The engine is ready.
    Loaded,
    /// The engine is ready and replaces its style.
    Restyling,
    /// Unmounted. Final state.
    Destroyed,
    /// The engine could not be created. The map shows a placeholder.
    Failed,
}

impl LifecycleState {
    /// Whether the instance accepts camera commands.
    pub fn is_loaded(&self) -> bool {
        matches!(self, LifecycleState::Loaded | LifecycleState::Restyling)
    }
}

/// What the host should render for the map.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    /// Nothing is mounted.
    Empty,
    /// The engine canvas is mounted but not ready yet.
    Loading,
    /// The engine is ready.
    Ready,
    /// The engine failed, a placeholder is shown instead of the map.
    Placeholder(MapError),
}

/// Host callback to call once the internal state is released.
enum Notice {
    Load,
    ViewportChange(Viewport),
    MoveEnd(Viewport),
    Error(MapError),
    Reaction(Reaction),
}

/// Declarative map view.
///
/// The component owns the engine instance. The host drives it by:
/// * mounting it into a container with [`MapComponent::mount`],
/// * giving it new props on every render with [`MapComponent::update`] and
///   [`MapComponent::set_children`],
/// * forwarding the events of the engine with [`MapComponent::dispatch`], in emission order,
/// * unmounting it with [`MapComponent::unmount`] (or dropping it).
///
/// Engine events must not be dispatched from inside a host callback of the same map; the
/// binding adapter queues them and dispatches them after the callback returns.
///
/// ```ignore
/// let mut map = MapComponent::new(
///     MapProps::builder()
///         .with_center(lnglat!(-74.006, 40.7128))
///         .with_zoom(8.0)
///         .build()?,
///     MapLibreFactory::new(),
/// );
/// map.set_children(vec![Box::new(RouteLine::new("route", coordinates))]);
/// map.mount(Some(Container::new("map")));
/// ```
pub struct MapComponent {
    core: Arc<RwLock<MapCore>>,
    factory: Box<dyn EngineFactory>,
    container: Option<Container>,
    viewport: ViewportProps,
    styles: MapStyles,
    theme: Theme,
    reconciler: ViewportReconciler,
    callbacks: MapCallbacks,
    resources: ResourceRegistry,
    context: MapContext,
    next_instance: u64,
    map_listeners: Vec<ListenerId>,
    failure: Option<MapError>,
    refs: Vec<MapRef>,
}

impl MapComponent {
    /// Creates an unmounted map component.
    pub fn new(props: MapProps, factory: impl EngineFactory + 'static) -> Self {
        let MapProps {
            viewport,
            styles,
            options,
            callbacks,
        } = props;

        Self {
            core: Arc::new(RwLock::new(MapCore::new(options))),
            factory: Box::new(factory),
            container: None,
            reconciler: ViewportReconciler::new(&viewport),
            viewport,
            styles,
            theme: Theme::default(),
            callbacks,
            resources: ResourceRegistry::default(),
            context: MapContext::new(),
            next_instance: 0,
            map_listeners: vec![],
            failure: None,
            refs: vec![],
        }
    }

    /// Sets the theme used before mount without triggering a style change.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Creates the engine instance in the container.
    ///
    /// `None` means the host could not provide the container element, the map fails with
    /// [`MapError::ContainerMissing`].
    pub fn mount(&mut self, container: Option<Container>) {
        let state = self.state();
        if state != LifecycleState::Uninitialized {
            log::warn!("Map is already mounted ({state:?}), mount is ignored");
            return;
        }

        let notices = match container {
            Some(container) => {
                self.container = Some(container);
                self.create_instance(self.viewport.seed())
            }
            None => self.fail(MapError::ContainerMissing),
        };

        self.notify(notices);
    }

    /// Handles an event emitted by the engine.
    pub fn dispatch(&mut self, event: EngineEvent) {
        let state = self.state();
        if !matches!(
            state,
            LifecycleState::Creating | LifecycleState::Loaded | LifecycleState::Restyling
        ) {
            log::debug!("Engine event {event:?} received in state {state:?}, ignoring");
            return;
        }

        let notices = match event {
            EngineEvent::Load => self.on_load(),
            EngineEvent::StyleLoad { style } => self.on_style_load(style),
            EngineEvent::Move { viewport, .. } => self.on_move(viewport),
            EngineEvent::MoveEnd { viewport, animation } => self.on_move_end(viewport, animation),
            EngineEvent::Layer(event) => self.on_layer_event(event),
            EngineEvent::Click { lnglat } => self.on_map_click(lnglat),
            EngineEvent::MarkerClick { marker_id } => self.on_marker_click(&marker_id),
            EngineEvent::Error(error) => self.on_engine_error(error.into()),
        };

        self.notify(notices);
    }

    /// Applies new props.
    ///
    /// A changed controlled viewport moves the camera, changed styles replace the style of
    /// the instance. Callbacks and options of the new props replace the old ones.
    pub fn update(&mut self, props: MapProps) {
        if self.state() == LifecycleState::Destroyed {
            log::debug!("Map is unmounted, props update is ignored");
            return;
        }

        let MapProps {
            viewport,
            styles,
            options,
            callbacks,
        } = props;

        self.callbacks = callbacks;

        let loaded = self.is_loaded();
        let target = self.reconciler.update(&viewport, loaded);
        if viewport.mode() == self.reconciler.mode() {
            self.viewport = viewport;
        }

        {
            let mut core = self.core.write();
            core.options = options;
            if let Some(target) = target {
                log::debug!("Applying controlled viewport {target:?}");
                core.apply_viewport(&target);
            }
        }

        let notices = if styles != self.styles {
            self.styles = styles;
            self.restyle()
        } else {
            vec![]
        };

        self.notify(notices);
    }

    /// Switches between the light and the dark style.
    pub fn set_theme(&mut self, theme: Theme) {
        if theme == self.theme {
            return;
        }

        log::debug!("Theme changed to {theme:?}");
        self.theme = theme;
        let notices = self.restyle();
        self.notify(notices);
    }

    /// Current theme.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Replaces the declared children of the map.
    ///
    /// Children are matched to the previous declaration by key. A key declared more than once
    /// uses the last declaration.
    pub fn set_children(&mut self, children: Vec<Box<dyn MapResource>>) {
        if self.state() == LifecycleState::Destroyed {
            log::debug!("Map is unmounted, children are ignored");
            return;
        }

        self.resources.declare(children);
        let notices = self.sync_resources();
        self.notify(notices);
    }

    /// Declares a child, or replaces the declaration with the same key.
    pub fn add_child(&mut self, child: Box<dyn MapResource>) {
        if self.state() == LifecycleState::Destroyed {
            log::debug!("Map is unmounted, child `{}` is ignored", child.key());
            return;
        }

        self.resources.upsert(child);
        let notices = self.sync_resources();
        self.notify(notices);
    }

    /// Removes the child with the given key from the map.
    pub fn remove_child(&mut self, key: &str) {
        if !self.resources.remove(key) {
            log::debug!("No child `{key}` to remove");
            return;
        }

        let notices = self.sync_resources();
        self.notify(notices);
    }

    /// State of a declared child.
    pub fn resource_status(&self, key: &str) -> Option<ResourceStatus> {
        self.resources.status(key)
    }

    /// Attaches an external reference. The reference is detached on unmount.
    pub fn attach(&mut self, map_ref: &MapRef) {
        if self.state() == LifecycleState::Destroyed {
            log::debug!("Map is unmounted, reference is not attached");
            return;
        }

        map_ref.attach(self.handle());
        self.refs.push(map_ref.clone());
    }

    /// Command handle of the map.
    pub fn handle(&self) -> MapHandle {
        MapHandle::new(Arc::downgrade(&self.core))
    }

    /// Subscribes to the instance lifecycle of the map.
    pub fn context(&self) -> MapContextReceiver {
        self.context.subscribe()
    }

    /// Lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.core.read().state
    }

    /// Whether the engine instance is ready.
    pub fn is_loaded(&self) -> bool {
        self.state().is_loaded()
    }

    /// What the host should render.
    pub fn render_state(&self) -> RenderState {
        match self.state() {
            LifecycleState::Uninitialized | LifecycleState::Destroyed => RenderState::Empty,
            LifecycleState::Creating => RenderState::Loading,
            LifecycleState::Loaded | LifecycleState::Restyling => RenderState::Ready,
            LifecycleState::Failed => match &self.failure {
                Some(failure) => RenderState::Placeholder(failure.clone()),
                None => RenderState::Empty,
            },
        }
    }

    /// Destroys the engine instance. Every later call to the component is a no-op.
    pub fn unmount(&mut self) {
        if self.state() == LifecycleState::Destroyed {
            return;
        }

        log::debug!("Unmounting map");
        self.teardown();
        self.core.write().state = LifecycleState::Destroyed;
        for map_ref in self.refs.drain(..) {
            map_ref.detach();
        }
    }

    fn create_instance(&mut self, camera: Viewport) -> Vec<Notice> {
        let Some(container) = &self.container else {
            return self.fail(MapError::ContainerMissing);
        };

        let style = self.styles.resolve(self.theme).clone();
        let mut core = self.core.write();
        let camera = camera.normalized(core.options.min_zoom, core.options.max_zoom);
        log::debug!("Creating map in `{}` with style {style} at {camera:?}", container.id());

        match self.factory.create(container, &style, &camera) {
            Ok(mut engine) => {
                self.map_listeners = [
                    Subscription::Load,
                    Subscription::StyleLoad,
                    Subscription::Move,
                    Subscription::MoveEnd,
                    Subscription::Error,
                ]
                .into_iter()
                .map(|subscription| engine.on(subscription))
                .collect();

                self.next_instance += 1;
                let instance = InstanceId::new(self.next_instance);
                core.engine = Some(engine);
                core.instance = Some(instance);
                core.style = Some(style);
                core.state = LifecycleState::Creating;
                drop(core);

                self.context.publish(Some(instance), false);
                vec![]
            }
            Err(error) => {
                drop(core);
                self.fail(error.into())
            }
        }
    }

    fn fail(&mut self, error: MapError) -> Vec<Notice> {
        log::debug!("Map failed: {error}");
        self.teardown();
        self.core.write().state = LifecycleState::Failed;
        self.failure = Some(error.clone());
        vec![Notice::Error(error)]
    }

    /// Removes the engine instance, leaving the declared children pending.
    fn teardown(&mut self) {
        let mut core = self.core.write();
        if let Some(mut engine) = core.engine.take() {
            if core.animations.is_animating() {
                engine.stop();
            }
            self.resources.detach_all(&mut *engine);
            for listener in self.map_listeners.drain(..) {
                engine.off(listener);
            }
            engine.remove();
            log::debug!("Map instance {:?} removed", core.instance);
        }

        core.animations.clear();
        core.instance = None;
        core.restyle = None;
        core.style = None;
        core.state = LifecycleState::Uninitialized;
        drop(core);

        self.context.publish(None, false);
    }

    fn on_load(&mut self) -> Vec<Notice> {
        let mut core = self.core.write();
        if core.state != LifecycleState::Creating {
            log::debug!("Instance is already loaded, repeated load event is ignored");
            return vec![];
        }

        log::debug!("Map instance {:?} loaded", core.instance);
        core.state = LifecycleState::Loaded;
        let instance = core.instance;

        if let Some(pending) = self.reconciler.take_pending() {
            core.apply_viewport(&pending);
        }
        drop(core);

        let mut notices = self.restyle();
        notices.extend(self.sync_resources());

        self.context.publish(instance, true);
        notices.push(Notice::Load);
        notices
    }

    fn on_style_load(&mut self, style: StyleRef) -> Vec<Notice> {
        let mut core = self.core.write();
        let requested = match &core.restyle {
            Some(restyle) if core.state == LifecycleState::Restyling => restyle.style == style,
            _ => false,
        };
        if !requested {
            log::debug!("Style {style} loaded, but it is not the requested one");
            return vec![];
        }

        let Some(Restyle { snapshot, .. }) = core.restyle.take() else {
            return vec![];
        };
        core.state = LifecycleState::Loaded;
        log::debug!("Style {style} loaded, restoring camera {snapshot:?}");

        let policy = core.options.restyle_policy;
        if core.camera() != Some(snapshot) {
            match policy {
                RestylePolicy::Snap => {
                    core.jump(&CameraTarget::from(snapshot));
                }
                RestylePolicy::Animate { duration } => {
                    core.animate(
                        Transition::Ease,
                        &CameraTarget::from(snapshot),
                        &AnimationOptions::with_duration(duration),
                    );
                }
            }
        }
        drop(core);

        self.sync_resources()
    }

    fn on_move(&mut self, viewport: Viewport) -> Vec<Notice> {
        {
            let mut core = self.core.write();
            if !core.state.is_loaded() {
                return vec![];
            }
            core.follow_camera(viewport);
        }

        self.reconciler.camera_moved(viewport);
        vec![Notice::ViewportChange(viewport)]
    }

    fn on_move_end(&mut self, viewport: Viewport, animation: Option<AnimationId>) -> Vec<Notice> {
        let mut core = self.core.write();
        if !core.animations.finish(animation) {
            drop(core);
            log::debug!("Superseded animation {animation:?} ended");
            self.reconciler.camera_moved(viewport);
            return vec![];
        }

        if !core.state.is_loaded() {
            return vec![];
        }
        core.follow_camera(viewport);
        drop(core);

        self.reconciler.camera_settled(viewport);
        vec![Notice::MoveEnd(viewport)]
    }

    fn on_map_click(&mut self, lnglat: LngLat) -> Vec<Notice> {
        let core = self.core.read();
        if core.state != LifecycleState::Loaded {
            return vec![];
        }
        let Some(engine) = core.engine.as_deref() else {
            return vec![];
        };

        self.resources
            .route_map_click(lnglat, engine)
            .into_iter()
            .map(Notice::Reaction)
            .collect()
    }

    fn on_layer_event(&mut self, event: LayerEvent) -> Vec<Notice> {
        let core = self.core.read();
        if core.state != LifecycleState::Loaded {
            return vec![];
        }
        let Some(engine) = core.engine.as_deref() else {
            return vec![];
        };

        self.resources
            .route_layer_event(&event, engine)
            .into_iter()
            .map(Notice::Reaction)
            .collect()
    }

    fn on_marker_click(&mut self, marker_id: &str) -> Vec<Notice> {
        let core = self.core.read();
        if core.state != LifecycleState::Loaded {
            return vec![];
        }
        let Some(engine) = core.engine.as_deref() else {
            return vec![];
        };

        self.resources
            .route_marker_click(marker_id, engine)
            .into_iter()
            .map(Notice::Reaction)
            .collect()
    }

    fn on_engine_error(&mut self, error: MapError) -> Vec<Notice> {
        if self.state() == LifecycleState::Creating {
            return self.fail(error);
        }

        vec![Notice::Error(error)]
    }

    /// Replaces the style if the theme or the styles resolve to a different one.
    fn restyle(&mut self) -> Vec<Notice> {
        let style = self.styles.resolve(self.theme).clone();
        let mut core = self.core.write();

        match core.state {
            LifecycleState::Loaded | LifecycleState::Restyling => {}
            LifecycleState::Creating => {
                log::debug!("Style changes to {style} once the instance is loaded");
                return vec![];
            }
            _ => return vec![],
        }

        if core.style.as_ref() == Some(&style) {
            return vec![];
        }

        let snapshot = match (&core.restyle, core.camera()) {
            (Some(restyle), _) => restyle.snapshot,
            (None, Some(camera)) => camera,
            (None, None) => return vec![],
        };

        let swapped = match core.engine.as_deref_mut() {
            Some(engine) if engine.supports_style_swap() => {
                self.resources.invalidate(engine);
                Some(engine.set_style(&style))
            }
            _ => None,
        };

        match swapped {
            Some(Ok(())) => {
                log::debug!("Replacing style with {style}");
                core.state = LifecycleState::Restyling;
                core.style = Some(style.clone());
                core.restyle = Some(Restyle { snapshot, style });
                vec![]
            }
            Some(Err(error)) => {
                log::warn!("Failed to replace style with {style}: {error}");
                drop(core);
                let mut notices = vec![Notice::Error(error.into())];
                notices.extend(self.sync_resources());
                notices
            }
            None => {
                log::debug!("Engine cannot replace the style, recreating the instance with {style}");
                drop(core);

                self.teardown();
                self.create_instance(snapshot)
            }
        }
    }

    /// Attaches or updates the declared children if the instance is ready for them.
    fn sync_resources(&mut self) -> Vec<Notice> {
        let mut core = self.core.write();
        if core.state != LifecycleState::Loaded {
            return vec![];
        }
        let Some(engine) = core.engine.as_deref_mut() else {
            return vec![];
        };

        self.resources
            .sync(engine)
            .into_iter()
            .map(|(key, source)| Notice::Error(MapError::Resource { key, source }))
            .collect()
    }

    /// Runs host callbacks. Internal state is not borrowed at this point, so callbacks can
    /// use the map handle.
    fn notify(&mut self, notices: Vec<Notice>) {
        for notice in notices {
            match notice {
                Notice::Load => {
                    if let Some(on_load) = &mut self.callbacks.on_load {
                        on_load();
                    }
                }
                Notice::ViewportChange(viewport) => {
                    if let Some(on_viewport_change) = &mut self.callbacks.on_viewport_change {
                        on_viewport_change(&viewport);
                    }
                }
                Notice::MoveEnd(viewport) => {
                    if let Some(on_move_end) = &mut self.callbacks.on_move_end {
                        on_move_end(&viewport);
                    }
                }
                Notice::Error(error) => match &mut self.callbacks.on_error {
                    Some(on_error) => on_error(&error),
                    None => log::error!("Map error: {error}"),
                },
                Notice::Reaction(Reaction::Notify(handler)) => handler(),
                Notice::Reaction(Reaction::EaseTo(target)) => {
                    let mut core = self.core.write();
                    let options = core.options.default_animation;
                    core.animate(Transition::Ease, &target, &options);
                }
            }
        }
    }
}

impl Drop for MapComponent {
    fn drop(&mut self) {
        self.unmount();
    }
}
