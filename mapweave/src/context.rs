//! Read-only channel through which descendants of a map follow its instance lifecycle.

use tokio::sync::watch;

/// Identity of an engine instance. A new id is assigned every time the instance is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Numeric value of the id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// What descendants see of the map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapContextState {
    /// The live instance, if any.
    pub instance: Option<InstanceId>,
    /// Whether the instance can be used. Always `false` when `instance` is `None`.
    pub loaded: bool,
}

/// Receiving end of the context channel.
///
/// Use [`watch::Receiver::changed`] to wait for the loaded flag instead of polling.
pub type MapContextReceiver = watch::Receiver<MapContextState>;

/// Publisher of [`MapContextState`], owned by the map component.
#[derive(Debug)]
pub(crate) struct MapContext {
    sender: watch::Sender<MapContextState>,
}

impl MapContext {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(MapContextState::default());
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> MapContextReceiver {
        self.sender.subscribe()
    }

    pub(crate) fn current(&self) -> MapContextState {
        *self.sender.borrow()
    }

    /// Publishes a new state. A different instance is only published after the old one has been
    /// withdrawn, so two instances are never visible at the same time.
    pub(crate) fn publish(&self, instance: Option<InstanceId>, loaded: bool) {
        let current = self.current();
        if let (Some(old), Some(new)) = (current.instance, instance) {
            if old != new {
                log::debug!("Withdrawing instance {} before publishing {}", old.get(), new.get());
                self.set(MapContextState::default());
            }
        }

        self.set(MapContextState {
            instance,
            loaded: loaded && instance.is_some(),
        });
    }

    fn set(&self, state: MapContextState) {
        self.sender.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_replacement_goes_through_empty_state() {
        let context = MapContext::new();
        let mut receiver = context.subscribe();

        context.publish(Some(InstanceId::new(1)), true);
        assert!(receiver.has_changed().expect("sender is alive"));
        assert_eq!(receiver.borrow_and_update().instance, Some(InstanceId::new(1)));

        context.publish(Some(InstanceId::new(2)), false);
        let state = *receiver.borrow_and_update();
        assert_eq!(state.instance, Some(InstanceId::new(2)));
        assert!(!state.loaded);
    }

    #[test]
    fn unchanged_state_does_not_notify() {
        let context = MapContext::new();
        let mut receiver = context.subscribe();

        context.publish(None, false);
        assert!(!receiver.has_changed().expect("sender is alive"));

        context.publish(None, true);
        assert!(!receiver.has_changed().expect("sender is alive"));
        assert!(!context.current().loaded);
    }
}
