use std::any::Any;

use super::{downcast_previous, MapResource, ResourceScope};
use crate::engine::{ControlKind, ControlPosition, ControlSpec};
use crate::error::ResourceError;

/// Built-in engine controls placed in one corner of the map.
///
/// Shows only the zoom buttons in the bottom right corner by default.
#[derive(Debug, Clone, PartialEq)]
pub struct MapControls {
    key: String,
    position: ControlPosition,
    kinds: Vec<ControlKind>,
}

impl MapControls {
    /// Creates zoom controls.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            position: ControlPosition::default(),
            kinds: vec![ControlKind::Zoom],
        }
    }

    /// Moves the controls to another corner.
    pub fn with_position(mut self, position: ControlPosition) -> Self {
        self.position = position;
        self
    }

    /// Adds a control.
    pub fn with_control(mut self, kind: ControlKind) -> Self {
        if !self.kinds.contains(&kind) {
            self.kinds.push(kind);
        }
        self
    }

    /// Replaces the set of shown controls.
    pub fn with_controls(mut self, kinds: impl IntoIterator<Item = ControlKind>) -> Self {
        self.kinds.clear();
        for kind in kinds {
            self = self.with_control(kind);
        }
        self
    }

    fn control_id(&self, kind: ControlKind) -> String {
        let name = match kind {
            ControlKind::Zoom => "zoom",
            ControlKind::Compass => "compass",
            ControlKind::Locate => "locate",
            ControlKind::Fullscreen => "fullscreen",
        };
        format!("{}-{name}", self.key)
    }

    fn add(&self, kind: ControlKind, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        scope.add_control(
            &self.control_id(kind),
            &ControlSpec {
                kind,
                position: self.position,
            },
        )
    }
}

impl MapResource for MapControls {
    fn key(&self) -> &str {
        &self.key
    }

    fn attach(&self, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        for kind in &self.kinds {
            self.add(*kind, scope)?;
        }
        Ok(())
    }

    fn update(&self, previous: &dyn MapResource, scope: &mut ResourceScope<'_>) -> Result<(), ResourceError> {
        let Some(previous) = downcast_previous::<MapControls>(previous) else {
            return self.attach(scope);
        };

        let moved = previous.position != self.position;
        for kind in &previous.kinds {
            if moved || !self.kinds.contains(kind) {
                scope.remove_control(&previous.control_id(*kind))?;
            }
        }
        for kind in &self.kinds {
            if moved || !previous.kinds.contains(kind) {
                self.add(*kind, scope)?;
            }
        }

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::scope::{Ledger, OwnedIds};
    use crate::tests::{recording, Call};

    #[test]
    fn adds_and_removes_changed_controls() {
        let (mut engine, log) = recording().engine();
        let mut ledger = Ledger::default();
        let mut owned = OwnedIds::default();
        let before = MapControls::new("nav").with_control(ControlKind::Compass);
        let after = MapControls::new("nav").with_controls([ControlKind::Zoom, ControlKind::Fullscreen]);

        let mut scope = ResourceScope::new("nav", &mut *engine, &mut ledger, &mut owned, None);
        before.attach(&mut scope).expect("attached");
        assert_eq!(
            log.lock().take_calls(),
            vec![
                Call::AddControl("nav-zoom".to_string()),
                Call::AddControl("nav-compass".to_string())
            ]
        );

        after.update(&before, &mut scope).expect("updated");
        assert_eq!(
            log.lock().take_calls(),
            vec![
                Call::RemoveControl("nav-compass".to_string()),
                Call::AddControl("nav-fullscreen".to_string())
            ]
        );
    }

    #[test]
    fn moving_controls_adds_them_again() {
        let (mut engine, log) = recording().engine();
        let mut ledger = Ledger::default();
        let mut owned = OwnedIds::default();
        let before = MapControls::new("nav");
        let after = MapControls::new("nav").with_position(ControlPosition::TopLeft);

        let mut scope = ResourceScope::new("nav", &mut *engine, &mut ledger, &mut owned, None);
        before.attach(&mut scope).expect("attached");
        log.lock().take_calls();
        after.update(&before, &mut scope).expect("updated");

        assert_eq!(
            log.lock().take_calls(),
            vec![
                Call::RemoveControl("nav-zoom".to_string()),
                Call::AddControl("nav-zoom".to_string())
            ]
        );
        assert_eq!(
            log.lock().controls.get("nav-zoom").map(|spec| spec.position),
            Some(ControlPosition::TopLeft)
        );
    }
}
