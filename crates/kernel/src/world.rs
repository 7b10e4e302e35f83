use glam::Vec3;
use handspace_common::{EntityId, EntityProperties};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An event record produced by every mutation to the world.
///
/// `MethodCalled` is the observable trace of entity methods invoked by
/// dispatch modules (`startFarTrigger`, `releaseGrab`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Object was spawned with the given properties.
    Spawned { id: EntityId, name: String },
    /// Object was removed.
    Despawned { id: EntityId, name: String },
    /// Object position was updated.
    Moved { id: EntityId, old: Vec3, new: Vec3 },
    /// An entity method was invoked on the object.
    MethodCalled {
        id: EntityId,
        method: String,
        args: Vec<String>,
    },
    /// The world advanced one frame.
    Stepped { tick: u64 },
}

/// The authoritative table of entities and overlays.
///
/// Uses BTreeMap for deterministic iteration order, so picks and proximity
/// queries resolve ties the same way on every run.
#[derive(Debug, Clone, Default)]
pub struct World {
    objects: BTreeMap<EntityId, EntityProperties>,
    tick: u64,
    /// Append-only event log of all mutations.
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an empty world at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current frame tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of objects in the world.
    pub fn entity_count(&self) -> usize {
        self.objects.len()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Read-only access to all objects.
    pub fn objects(&self) -> &BTreeMap<EntityId, EntityProperties> {
        &self.objects
    }

    /// Spawn a new object. Returns its id.
    pub fn spawn(&mut self, props: EntityProperties) -> EntityId {
        let id = EntityId::new();
        self.spawn_with_id(id, props);
        id
    }

    /// Spawn an object with a specific id.
    pub fn spawn_with_id(&mut self, id: EntityId, props: EntityProperties) {
        tracing::debug!(id = %id.short(), name = %props.name, "spawn");
        self.event_log.push(WorldEvent::Spawned {
            id,
            name: props.name.clone(),
        });
        self.objects.insert(id, props);
    }

    /// Remove an object. Returns its properties if it existed.
    pub fn despawn(&mut self, id: EntityId) -> Option<EntityProperties> {
        let props = self.objects.remove(&id);
        if let Some(p) = &props {
            tracing::debug!(id = %id.short(), name = %p.name, "despawn");
            self.event_log.push(WorldEvent::Despawned {
                id,
                name: p.name.clone(),
            });
        }
        props
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityProperties> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityProperties> {
        self.objects.get_mut(&id)
    }

    /// First object carrying the given name, in id order.
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.objects
            .iter()
            .find(|(_, p)| p.name == name)
            .map(|(id, _)| *id)
    }

    /// Move an object and log the change. Returns false if it does not exist.
    pub fn set_position(&mut self, id: EntityId, new: Vec3) -> bool {
        if let Some(props) = self.objects.get_mut(&id) {
            let old = props.transform.position;
            props.transform.position = new;
            self.event_log.push(WorldEvent::Moved { id, old, new });
            true
        } else {
            false
        }
    }

    /// Record an entity method invocation. Calls on missing objects are
    /// dropped and report false.
    pub fn record_call(&mut self, id: EntityId, method: &str, args: &[&str]) -> bool {
        if !self.objects.contains_key(&id) {
            return false;
        }
        tracing::trace!(id = %id.short(), method, "entity method");
        self.event_log.push(WorldEvent::MethodCalled {
            id,
            method: method.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        true
    }

    /// Method names invoked on `id`, in call order.
    pub fn calls_on(&self, id: EntityId) -> Vec<&str> {
        self.event_log
            .iter()
            .filter_map(|e| match e {
                WorldEvent::MethodCalled { id: target, method, .. } if *target == id => {
                    Some(method.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Advance the world by one frame.
    pub fn step(&mut self) {
        self.tick += 1;
        self.event_log.push(WorldEvent::Stepped { tick: self.tick });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handspace_common::Marker;

    #[test]
    fn world_starts_empty() {
        let w = World::new();
        assert_eq!(w.tick(), 0);
        assert_eq!(w.entity_count(), 0);
    }

    #[test]
    fn spawn_and_despawn() {
        let mut w = World::new();
        let id = w.spawn(EntityProperties::named("cube"));
        assert_eq!(w.entity_count(), 1);
        assert!(w.get(id).is_some());
        assert_eq!(w.find_by_name("cube"), Some(id));

        let props = w.despawn(id);
        assert!(props.is_some());
        assert_eq!(w.entity_count(), 0);
        assert!(w.despawn(id).is_none());
    }

    #[test]
    fn step_increments_tick() {
        let mut w = World::new();
        w.step();
        w.step();
        w.step();
        assert_eq!(w.tick(), 3);
    }

    #[test]
    fn events_are_recorded() {
        let mut w = World::new();
        let id = w.spawn(EntityProperties::default());
        w.step();
        w.despawn(id);
        assert_eq!(w.events().len(), 3); // spawn + step + despawn
    }

    #[test]
    fn drain_events_clears_log() {
        let mut w = World::new();
        w.spawn(EntityProperties::default());
        let events = w.drain_events();
        assert_eq!(events.len(), 1);
        assert!(w.events().is_empty());
    }

    #[test]
    fn set_position_logs_event() {
        let mut w = World::new();
        let id = w.spawn(EntityProperties::default());
        assert!(w.set_position(id, Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(w.get(id).unwrap().position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(w.events().len(), 2);
        assert!(!w.set_position(EntityId::new(), Vec3::ZERO));
    }

    #[test]
    fn method_calls_on_missing_objects_are_dropped() {
        let mut w = World::new();
        let id = w.spawn(EntityProperties::named("lever").with_marker(Marker::Triggerable));
        assert!(w.record_call(id, "startFarTrigger", &["right"]));
        assert!(w.record_call(id, "stopFarTrigger", &["right"]));
        assert_eq!(w.calls_on(id), vec!["startFarTrigger", "stopFarTrigger"]);

        w.despawn(id);
        assert!(!w.record_call(id, "continueFarTrigger", &["right"]));
        assert_eq!(w.calls_on(id).len(), 2);
    }

    #[test]
    fn btreemap_gives_deterministic_iteration() {
        let mut w = World::new();
        for _ in 0..50 {
            w.spawn(EntityProperties::default());
        }
        let keys: Vec<EntityId> = w.objects().keys().copied().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }
}
