//! Derived lookups kept current by component change events.

use crate::ecs::{
    ChangeKind, Component, ComponentEvent, ComponentSlot, EntityGroup, EntityKey, GroupId,
};
use std::any::Any;
use std::collections::HashMap;

/// Read-only view of the store handed to indices while an event is routed.
pub struct StoreView<'a> {
    components: &'a [Box<dyn Component>],
    groups: &'a [EntityGroup],
}

impl<'a> StoreView<'a> {
    pub(crate) fn new(components: &'a [Box<dyn Component>], groups: &'a [EntityGroup]) -> Self {
        Self { components, groups }
    }

    /// Key of the entity currently at `index` of `group`.
    pub fn key(&self, group: GroupId, index: usize) -> Option<EntityKey> {
        let page = self.groups.get(group.index())?;
        if page.is_disposed() || index >= page.len() {
            return None;
        }
        Some(EntityKey::new(group, index, page.generation(index)))
    }

    pub fn value<T: Any>(&self, slot: ComponentSlot, group: GroupId, index: usize) -> Option<&'a T> {
        let page = self.groups.get(group.index())?;
        let component = self.components.get(slot.index())?;
        let offset = page.entity_offset(slot, index, component.stores_per_slot())?;
        component.get(offset).ok()?.downcast_ref::<T>()
    }
}

/// A secondary index fed by the store.
///
/// The store routes every event of a watched component to `on_event`,
/// including `Moved` events for entities relocated by swap-with-last or by
/// float/unfloat.
pub trait StoreIndex: Any {
    /// Names of the components this index listens to.
    fn watches(&self) -> &[String];

    fn on_event(&mut self, view: &StoreView<'_>, slot: ComponentSlot, event: &ComponentEvent);

    fn as_any(&self) -> &dyn Any;
}

/// Maps the value of a `u64` id component to the entity holding it.
#[derive(Debug, Default)]
pub struct IdIndex {
    watches: Vec<String>,
    by_id: HashMap<u64, EntityKey>,
    by_key: HashMap<EntityKey, u64>,
}

impl IdIndex {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            watches: vec![component.into()],
            by_id: HashMap::new(),
            by_key: HashMap::new(),
        }
    }

    pub fn get(&self, id: u64) -> Option<EntityKey> {
        self.by_id.get(&id).copied()
    }

    pub fn id_of(&self, key: EntityKey) -> Option<u64> {
        self.by_key.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, EntityKey)> + '_ {
        self.by_id.iter().map(|(&id, &key)| (id, key))
    }

    /// Point `id` at `key`, dropping the key's previous id and the id's
    /// previous key.
    fn link(&mut self, id: u64, key: EntityKey) {
        if let Some(previous) = self.by_id.insert(id, key) {
            if previous != key {
                self.by_key.remove(&previous);
            }
        }
        if let Some(stale) = self.by_key.insert(key, id) {
            if stale != id && self.by_id.get(&stale) == Some(&key) {
                self.by_id.remove(&stale);
            }
        }
    }

    fn unlink(&mut self, id: u64, key: EntityKey) {
        if self.by_id.get(&id) == Some(&key) {
            self.by_id.remove(&id);
        }
        if self.by_key.get(&key) == Some(&id) {
            self.by_key.remove(&key);
        }
    }
}

impl StoreIndex for IdIndex {
    fn watches(&self) -> &[String] {
        &self.watches
    }

    fn on_event(&mut self, view: &StoreView<'_>, slot: ComponentSlot, event: &ComponentEvent) {
        for index in event.start..event.start + event.size {
            let Some(key) = view.key(event.group, index) else {
                continue;
            };
            let Some(&id) = view.value::<u64>(slot, event.group, index) else {
                continue;
            };
            match event.kind {
                ChangeKind::Removed => self.unlink(id, key),
                ChangeKind::Added | ChangeKind::Set | ChangeKind::Moved | ChangeKind::Marked => {
                    self.link(id, key)
                }
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
