use mapweave_types::{CameraTarget, LngLat, MapStyles, Viewport};

use super::options::MapOptions;
use crate::callback::MapCallbacks;
use crate::error::{ConfigError, MapError};
use crate::view::ViewportProps;

/// Props of a [`MapComponent`](super::MapComponent) for one render.
///
/// Created with [`MapProps::builder`]. Construction fails when the props mix the controlled
/// and uncontrolled viewport modes.
#[derive(Default)]
pub struct MapProps {
    pub(crate) viewport: ViewportProps,
    pub(crate) styles: MapStyles,
    pub(crate) options: MapOptions,
    pub(crate) callbacks: MapCallbacks,
}

impl std::fmt::Debug for MapProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapProps")
            .field("viewport", &self.viewport)
            .field("styles", &self.styles)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl MapProps {
    /// Starts building props.
    pub fn builder() -> MapPropsBuilder {
        MapPropsBuilder::default()
    }

    /// Viewport part of the props.
    pub fn viewport(&self) -> &ViewportProps {
        &self.viewport
    }

    /// Styles used for the light and dark themes.
    pub fn styles(&self) -> &MapStyles {
        &self.styles
    }

    /// Map options.
    pub fn options(&self) -> &MapOptions {
        &self.options
    }
}

/// Convenience type to create [`MapProps`].
///
/// ```ignore
/// use mapweave::MapProps;
/// use mapweave::mapweave_types::lnglat;
///
/// // uncontrolled: the values only seed the camera
/// let props = MapProps::builder()
///     .with_center(lnglat!(-74.006, 40.7128))
///     .with_zoom(8.0)
///     .build()?;
///
/// // controlled: the host mirrors the camera
/// let props = MapProps::builder()
///     .with_viewport(viewport)
///     .on_viewport_change(move |viewport| store.set(*viewport))
///     .build()?;
/// ```
#[derive(Default)]
pub struct MapPropsBuilder {
    viewport: Option<Viewport>,
    initial: CameraTarget,
    styles: Option<MapStyles>,
    options: MapOptions,
    callbacks: MapCallbacks,
}

impl MapPropsBuilder {
    /// Sets the initial center of an uncontrolled map.
    ///
    /// Defaults to `[0, 0]`.
    pub fn with_center(mut self, center: LngLat) -> Self {
        self.initial.center = Some(center);
        self
    }

    /// Sets the initial zoom of an uncontrolled map.
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.initial.zoom = Some(zoom);
        self
    }

    /// Sets the initial bearing of an uncontrolled map.
    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.initial.bearing = Some(bearing);
        self
    }

    /// Sets the initial pitch of an uncontrolled map.
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.initial.pitch = Some(pitch);
        self
    }

    /// Makes the map controlled by the given viewport. Requires
    /// [`MapPropsBuilder::on_viewport_change`] and cannot be combined with the initial camera
    /// setters.
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Sets the light and dark styles.
    ///
    /// Defaults to the Carto positron and dark matter styles.
    pub fn with_styles(mut self, styles: MapStyles) -> Self {
        self.styles = Some(styles);
        self
    }

    /// Sets the map options.
    pub fn with_options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    /// Called once for every camera move of the loaded map.
    pub fn on_viewport_change(mut self, callback: impl FnMut(&Viewport) + 'static) -> Self {
        self.callbacks.on_viewport_change = Some(Box::new(callback));
        self
    }

    /// Called when a camera movement settles. Not called for animations that were superseded by
    /// a newer command.
    pub fn on_move_end(mut self, callback: impl FnMut(&Viewport) + 'static) -> Self {
        self.callbacks.on_move_end = Some(Box::new(callback));
        self
    }

    /// Called when the engine instance becomes ready.
    pub fn on_load(mut self, callback: impl FnMut() + 'static) -> Self {
        self.callbacks.on_load = Some(Box::new(callback));
        self
    }

    /// Called on map failures. Without this callback failures are logged.
    pub fn on_error(mut self, callback: impl FnMut(&MapError) + 'static) -> Self {
        self.callbacks.on_error = Some(Box::new(callback));
        self
    }

    /// Validates and creates the props.
    pub fn build(self) -> Result<MapProps, ConfigError> {
        let Self {
            viewport,
            initial,
            styles,
            options,
            callbacks,
        } = self;

        options.validate()?;

        let viewport = match viewport {
            Some(_) if !initial.is_empty() => return Err(ConfigError::MixedViewportModes),
            Some(_) if callbacks.on_viewport_change.is_none() => {
                return Err(ConfigError::MissingViewportCallback)
            }
            Some(viewport) => ViewportProps::Controlled(viewport),
            None => ViewportProps::Uncontrolled(initial),
        };

        Ok(MapProps {
            viewport,
            styles: styles.unwrap_or_default(),
            options,
            callbacks,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use mapweave_types::{lnglat, StyleRef, Theme};

    use super::*;
    use crate::view::ViewportMode;

    #[test]
    fn constructs_uncontrolled_props_by_default() {
        let props = MapProps::builder().build().expect("valid props");

        assert_eq!(props.viewport().mode(), ViewportMode::Uncontrolled);
        assert_eq!(props.viewport().seed(), Viewport::default());
        assert_eq!(props.styles(), &MapStyles::default());
    }

    #[test]
    fn initial_values_seed_the_camera() {
        let props = MapProps::builder()
            .with_center(lnglat!(-0.1276, 51.5074))
            .with_zoom(15.0)
            .with_pitch(60.0)
            .build()
            .expect("valid props");

        let seed = props.viewport().seed();
        assert_eq!(seed.center, lnglat!(-0.1276, 51.5074));
        assert_eq!(seed.zoom, 15.0);
        assert_eq!(seed.pitch, 60.0);
        assert_eq!(seed.bearing, 0.0);
    }

    #[test]
    fn controlled_viewport_requires_callback() {
        let viewport = Viewport::new(lnglat!(-74.006, 40.7128), 8.0);
        assert_matches!(
            MapProps::builder().with_viewport(viewport).build(),
            Err(ConfigError::MissingViewportCallback)
        );

        let props = MapProps::builder()
            .with_viewport(viewport)
            .on_viewport_change(|_| {})
            .build()
            .expect("valid props");
        assert_eq!(props.viewport(), &ViewportProps::Controlled(viewport));
    }

    #[test]
    fn mixing_modes_is_rejected() {
        let result = MapProps::builder()
            .with_viewport(Viewport::default())
            .with_zoom(3.0)
            .on_viewport_change(|_| {})
            .build();

        assert_matches!(result, Err(ConfigError::MixedViewportModes));
    }

    #[test]
    fn shared_style_is_used_for_both_themes() {
        let props = MapProps::builder()
            .with_styles(MapStyles::shared("https://tiles.openfreemap.org/styles/liberty"))
            .build()
            .expect("valid props");

        assert_eq!(
            props.styles().resolve(Theme::Dark),
            &StyleRef::from("https://tiles.openfreemap.org/styles/liberty")
        );
    }
}
