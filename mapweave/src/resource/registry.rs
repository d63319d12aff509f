use std::any::Any;

use ahash::{HashSet, HashSetExt};
use mapweave_types::LngLat;

use super::scope::{ElementKind, Ledger, OwnedIds, ResourceScope};
use super::{MapResource, Reaction};
use crate::engine::{Engine, LayerEvent, Subscription};
use crate::error::ResourceError;

/// State of a declared resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceStatus {
    /// Declared, waits for the engine to be ready.
    Pending,
    /// Present in the engine.
    Attached,
    /// Attaching or updating failed. The resource does not render until it is declared again.
    Failed(ResourceError),
}

struct ResourceEntry {
    resource: Box<dyn MapResource>,
    /// Declaration currently reflected in the engine, if it differs from `resource`.
    previous: Option<Box<dyn MapResource>>,
    status: ResourceStatus,
    owned: OwnedIds,
}

impl ResourceEntry {
    fn new(resource: Box<dyn MapResource>) -> Self {
        Self {
            resource,
            previous: None,
            status: ResourceStatus::Pending,
            owned: OwnedIds::default(),
        }
    }
}

/// Declared children of a map, kept in declaration order.
///
/// Declaring only records what should exist. Engine calls are made by [`ResourceRegistry::sync`]
/// once the engine is ready, so children declared before the instance is loaded are attached
/// exactly once, in declaration order.
#[derive(Default)]
pub(crate) struct ResourceRegistry {
    entries: Vec<ResourceEntry>,
    /// Ids of resources that are no longer declared but still present in the engine.
    retired: Vec<(String, OwnedIds)>,
    ledger: Ledger,
}

impl ResourceRegistry {
    /// Replaces the declared children. Later declarations of a key win over earlier ones.
    pub(crate) fn declare(&mut self, children: Vec<Box<dyn MapResource>>) {
        let mut declared: Vec<Box<dyn MapResource>> = Vec::with_capacity(children.len());
        for child in children {
            if let Some(index) = declared.iter().position(|c| c.key() == child.key()) {
                log::warn!(
                    "Resource key `{}` is declared more than once, the last declaration is used",
                    child.key()
                );
                declared.remove(index);
            }
            declared.push(child);
        }

        let mut keys = HashSet::with_capacity(declared.len());
        for child in &declared {
            keys.insert(child.key().to_string());
        }

        let (mut existing, undeclared): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| keys.contains(e.resource.key()));
        for entry in undeclared {
            log::debug!("Resource `{}` is no longer declared", entry.resource.key());
            self.retire(entry);
        }

        let mut entries = Vec::with_capacity(declared.len());
        for resource in declared {
            let entry = match existing.iter().position(|e| e.resource.key() == resource.key()) {
                Some(index) => {
                    let entry = existing.swap_remove(index);
                    self.redeclare(entry, resource)
                }
                None => ResourceEntry::new(resource),
            };
            entries.push(entry);
        }

        self.entries = entries;
    }

    /// Declares or redeclares a single child, keeping the position of an existing key.
    pub(crate) fn upsert(&mut self, resource: Box<dyn MapResource>) {
        match self.entries.iter().position(|e| e.resource.key() == resource.key()) {
            Some(index) => {
                let entry = self.entries.remove(index);
                let entry = self.redeclare(entry, resource);
                self.entries.insert(index, entry);
            }
            None => self.entries.push(ResourceEntry::new(resource)),
        }
    }

    /// Stops declaring the child with the given key. Returns false if there is no such child.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        match self.entries.iter().position(|e| e.resource.key() == key) {
            Some(index) => {
                let entry = self.entries.remove(index);
                self.retire(entry);
                true
            }
            None => false,
        }
    }

    pub(crate) fn status(&self, key: &str) -> Option<ResourceStatus> {
        self.entries
            .iter()
            .find(|e| e.resource.key() == key)
            .map(|e| e.status.clone())
    }

    fn redeclare(&mut self, mut entry: ResourceEntry, resource: Box<dyn MapResource>) -> ResourceEntry {
        match entry.status {
            ResourceStatus::Attached if same_type(entry.resource.as_any(), resource.as_any()) => {
                let shown = std::mem::replace(&mut entry.resource, resource);
                if entry.previous.is_none() {
                    entry.previous = Some(shown);
                }
                entry
            }
            ResourceStatus::Attached => {
                log::debug!(
                    "Resource `{}` changed its type and is attached again",
                    resource.key()
                );
                self.retire(entry);
                ResourceEntry::new(resource)
            }
            ResourceStatus::Pending | ResourceStatus::Failed(_) => ResourceEntry::new(resource),
        }
    }

    fn retire(&mut self, entry: ResourceEntry) {
        if !entry.owned.is_empty() {
            self.retired.push((entry.resource.key().to_string(), entry.owned));
        }
    }

    /// Brings the engine in line with the declared children. Returns the failed resources.
    pub(crate) fn sync(&mut self, engine: &mut dyn Engine) -> Vec<(String, ResourceError)> {
        for (key, mut owned) in std::mem::take(&mut self.retired) {
            ResourceScope::new(&key, engine, &mut self.ledger, &mut owned, None).release();
        }

        let mut failures = vec![];
        for index in 0..self.entries.len() {
            let needs_work = {
                let entry = &self.entries[index];
                entry.status == ResourceStatus::Pending || entry.previous.is_some()
            };
            if !needs_work {
                continue;
            }

            let anchor = self.anchor_after(index);
            let entry = &mut self.entries[index];
            let key = entry.resource.key().to_string();
            let previous = entry.previous.take();

            let mut scope = ResourceScope::new(&key, engine, &mut self.ledger, &mut entry.owned, anchor.as_deref());
            let result = match &previous {
                Some(previous) if entry.status == ResourceStatus::Attached => {
                    entry.resource.update(previous.as_ref(), &mut scope)
                }
                _ => entry.resource.attach(&mut scope),
            };

            match result {
                Ok(()) => entry.status = ResourceStatus::Attached,
                Err(err) => {
                    log::warn!("Resource `{key}` failed and is not displayed: {err}");
                    scope.release();
                    entry.status = ResourceStatus::Failed(err.clone());
                    failures.push((key, err));
                }
            }
        }

        failures
    }

    /// First layer of the attached resources declared after `index`.
    fn anchor_after(&self, index: usize) -> Option<String> {
        self.entries[index + 1..]
            .iter()
            .filter(|e| e.status == ResourceStatus::Attached)
            .find_map(|e| e.owned.layers.first().cloned())
    }

    /// Forgets the engine state of all resources before the style is replaced. They are
    /// attached again by the next [`ResourceRegistry::sync`].
    pub(crate) fn invalidate(&mut self, engine: &mut dyn Engine) {
        for (key, mut owned) in std::mem::take(&mut self.retired) {
            ResourceScope::new(&key, engine, &mut self.ledger, &mut owned, None).invalidate();
        }

        for entry in &mut self.entries {
            let key = entry.resource.key().to_string();
            ResourceScope::new(&key, engine, &mut self.ledger, &mut entry.owned, None).invalidate();
            entry.previous = None;
            entry.status = ResourceStatus::Pending;
        }

        self.ledger.clear();
    }

    /// Removes all resources from the engine, last declared first. The declarations are kept
    /// and attached again to the next instance.
    pub(crate) fn detach_all(&mut self, engine: &mut dyn Engine) {
        for (key, mut owned) in std::mem::take(&mut self.retired) {
            ResourceScope::new(&key, engine, &mut self.ledger, &mut owned, None).release();
        }

        for entry in self.entries.iter_mut().rev() {
            let key = entry.resource.key().to_string();
            ResourceScope::new(&key, engine, &mut self.ledger, &mut entry.owned, None).release();
            entry.previous = None;
            entry.status = ResourceStatus::Pending;
        }

        self.ledger.clear();
    }

    /// Forwards a pointer event to the resource listening to it.
    pub(crate) fn route_layer_event(&self, event: &LayerEvent, engine: &dyn Engine) -> Vec<Reaction> {
        let subscription = Subscription::Layer {
            kind: event.kind,
            layer_id: event.layer_id.clone(),
        };

        match self.listener_of(ElementKind::Layer, &event.layer_id, &subscription) {
            Some(entry) => entry.resource.on_layer_event(event, engine),
            None => {
                log::debug!("No resource listens to {:?} on layer {}", event.kind, event.layer_id);
                vec![]
            }
        }
    }

    /// Forwards a DOM marker click to the resource that owns the marker.
    pub(crate) fn route_marker_click(&self, marker_id: &str, engine: &dyn Engine) -> Vec<Reaction> {
        let subscription = Subscription::Marker {
            marker_id: marker_id.to_string(),
        };

        match self.listener_of(ElementKind::Marker, marker_id, &subscription) {
            Some(entry) => entry.resource.on_marker_click(marker_id, engine),
            None => {
                log::debug!("No resource listens to clicks on marker {marker_id}");
                vec![]
            }
        }
    }

    /// Forwards a map click to every resource listening to map clicks, in declaration order.
    pub(crate) fn route_map_click(&self, lnglat: LngLat, engine: &dyn Engine) -> Vec<Reaction> {
        self.entries
            .iter()
            .filter(|e| e.status == ResourceStatus::Attached && e.owned.listens_to(&Subscription::Click))
            .flat_map(|e| e.resource.on_map_click(lnglat, engine))
            .collect()
    }

    fn listener_of(&self, kind: ElementKind, id: &str, subscription: &Subscription) -> Option<&ResourceEntry> {
        let owner = self.ledger.get(&(kind, id.to_string()))?;
        self.entries.iter().find(|e| {
            e.resource.key() == owner && e.status == ResourceStatus::Attached && e.owned.listens_to(subscription)
        })
    }
}

fn same_type(a: &dyn Any, b: &dyn Any) -> bool {
    a.type_id() == b.type_id()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::engine::LayerKind;
    use crate::resource::GeoJsonLayer;
    use crate::tests::{points, recording, Call};

    fn layer(key: &str, count: usize) -> Box<dyn MapResource> {
        Box::new(GeoJsonLayer::new(key, points(count), LayerKind::Circle))
    }

    #[test]
    fn pending_children_attach_in_declaration_order() {
        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();

        registry.declare(vec![layer("a", 1), layer("b", 1), layer("c", 1)]);
        assert!(log.lock().take_calls().is_empty());

        assert!(registry.sync(&mut *engine).is_empty());
        let sources: Vec<_> = log
            .lock()
            .take_calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::AddSource(id) => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(sources, vec!["a-source", "b-source", "c-source"]);

        assert!(registry.sync(&mut *engine).is_empty());
        assert!(log.lock().take_calls().is_empty());
    }

    #[test]
    fn redeclaring_unchanged_children_makes_no_engine_calls() {
        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();
        registry.declare(vec![layer("parks", 3)]);
        registry.sync(&mut *engine);
        log.lock().take_calls();

        registry.declare(vec![layer("parks", 3)]);
        registry.sync(&mut *engine);

        assert!(log.lock().take_calls().is_empty());
        assert_eq!(registry.status("parks"), Some(ResourceStatus::Attached));
    }

    #[test]
    fn duplicate_keys_keep_the_last_declaration() {
        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();

        registry.declare(vec![layer("parks", 1), layer("lakes", 1), layer("parks", 4)]);
        registry.sync(&mut *engine);

        assert_eq!(registry.entries.len(), 2);
        assert_eq!(registry.entries[0].resource.key(), "lakes");
        assert_eq!(log.lock().source_feature_count("parks-source"), Some(4));
    }

    #[test]
    fn removed_children_are_detached_layers_first() {
        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();
        registry.declare(vec![layer("parks", 1), layer("lakes", 1)]);
        registry.sync(&mut *engine);
        log.lock().take_calls();

        registry.declare(vec![layer("lakes", 1)]);
        registry.sync(&mut *engine);

        assert_eq!(
            log.lock().take_calls(),
            vec![
                Call::RemoveLayer("parks-layer".to_string()),
                Call::RemoveSource("parks-source".to_string())
            ]
        );
        assert_eq!(registry.status("parks"), None);
    }

    #[test]
    fn child_inserted_between_siblings_is_drawn_below_the_next_one() {
        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();
        registry.declare(vec![layer("a", 1), layer("c", 1)]);
        registry.sync(&mut *engine);

        registry.declare(vec![layer("a", 1), layer("b", 1), layer("c", 1)]);
        registry.sync(&mut *engine);

        assert_eq!(log.lock().layers, vec!["a-layer", "b-layer", "c-layer"]);
    }

    #[test]
    fn failed_child_does_not_affect_siblings() {
        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();
        let broken = GeoJsonLayer::new("broken", points(1), LayerKind::Fill).with_filter(json!(["bad"]));
        log.lock().reject_filters = true;

        registry.declare(vec![layer("a", 1), Box::new(broken), layer("c", 1)]);
        let failures = registry.sync(&mut *engine);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "broken");
        assert_matches!(registry.status("broken"), Some(ResourceStatus::Failed(ResourceError::Engine(_))));
        assert_eq!(registry.status("a"), Some(ResourceStatus::Attached));
        assert_eq!(registry.status("c"), Some(ResourceStatus::Attached));

        let log = log.lock();
        assert!(!log.sources.contains_key("broken-source"));
        assert_eq!(log.layers, vec!["a-layer", "c-layer"]);
    }

    #[test]
    fn type_change_replaces_the_resource() {
        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();
        registry.declare(vec![layer("stops", 2)]);
        registry.sync(&mut *engine);
        log.lock().take_calls();

        let marker = crate::resource::Marker::new("stops", mapweave_types::LngLat::new(2.35, 48.85));
        registry.declare(vec![Box::new(marker)]);
        registry.sync(&mut *engine);

        let calls = log.lock().take_calls();
        assert_eq!(calls.first(), Some(&Call::RemoveLayer("stops-layer".to_string())));
        assert_eq!(calls.last(), Some(&Call::AddMarker("stops".to_string())));
    }

    #[test]
    fn invalidated_children_attach_again() {
        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();
        registry.declare(vec![layer("parks", 3)]);
        registry.sync(&mut *engine);

        registry.invalidate(&mut *engine);
        log.lock().drop_style();
        assert_eq!(registry.status("parks"), Some(ResourceStatus::Pending));

        registry.sync(&mut *engine);
        let log = log.lock();
        assert_eq!(log.layers, vec!["parks-layer"]);
        assert_eq!(log.source_feature_count("parks-source"), Some(3));
    }

    #[test]
    fn map_clicks_reach_every_listening_child() {
        use std::sync::Arc;

        use parking_lot::Mutex;

        use crate::resource::{MapClick, MapClickListener};

        let (mut engine, log) = recording().engine();
        let mut registry = ResourceRegistry::default();
        let clicks = Arc::new(Mutex::new(vec![]));
        let listener = |key: &'static str| -> Box<dyn MapResource> {
            let clicks = clicks.clone();
            Box::new(MapClickListener::new(key).on_click(move |_: &MapClick| clicks.lock().push(key)))
        };

        registry.declare(vec![listener("pin"), layer("a", 1), listener("picker")]);
        assert!(registry.sync(&mut *engine).is_empty());

        let lnglat = LngLat::new(2.3522, 48.8566);
        for reaction in registry.route_map_click(lnglat, &*engine) {
            if let Reaction::Notify(notify) = reaction {
                notify();
            }
        }
        assert_eq!(*clicks.lock(), vec!["pin", "picker"]);

        assert!(registry.remove("pin"));
        assert!(registry.sync(&mut *engine).is_empty());
        assert_eq!(log.lock().listener_count(), 1);
        assert_eq!(registry.route_map_click(lnglat, &*engine).len(), 1);
    }
}
