//! Entity keys and handles.
//!
//! A key names a slot: `(group, index, generation)`. Releasing or moving a
//! slot bumps its generation, so a key held across a structural change is
//! detected as stale instead of silently naming another entity. Re-resolve
//! through an index such as [`IdIndex`](crate::ecs::IdIndex) instead.

use crate::ecs::{ComponentLookup, EntityIdMap, EntityStore, GroupId, StoreError};
use serde_json::Value;
use std::any::{type_name, Any};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityKey {
    group: GroupId,
    index: u32,
    generation: u32,
}

impl EntityKey {
    pub(crate) const fn new(group: GroupId, index: usize, generation: u32) -> Self {
        Self {
            group,
            index: index as u32,
            generation,
        }
    }

    #[inline]
    pub fn group(&self) -> GroupId {
        self.group
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]v{}", self.group, self.index, self.generation)
    }
}

/// Short-lived handle borrowing the store.
///
/// Structural operations (`set` of a new component, `remove`, `float`,
/// `unfloat`) move the entity and update the handle's key in place.
pub struct Entity<'s> {
    store: &'s mut EntityStore,
    key: EntityKey,
}

impl<'s> Entity<'s> {
    pub(crate) fn new(store: &'s mut EntityStore, key: EntityKey) -> Self {
        Self { store, key }
    }

    #[inline]
    pub fn key(&self) -> EntityKey {
        self.key
    }

    pub fn is_floating(&self) -> bool {
        self.store
            .group(self.key.group())
            .is_some_and(|group| group.is_floating())
    }

    pub fn has(&self, component: impl ComponentLookup) -> Result<bool, StoreError> {
        let slot = component.resolve(&*self.store)?;
        self.store.has_component(self.key, slot)
    }

    pub fn get<T: Any>(&self, component: impl ComponentLookup) -> Result<&T, StoreError> {
        let slot = component.resolve(&*self.store)?;
        self.store
            .component_value(self.key, slot)?
            .downcast_ref::<T>()
            .ok_or_else(|| StoreError::TypeMismatch {
                component: self.store.components[slot.index()].name().to_string(),
                expected: type_name::<T>(),
            })
    }

    pub fn get_dyn(&self, component: impl ComponentLookup) -> Result<&dyn Any, StoreError> {
        let slot = component.resolve(&*self.store)?;
        self.store.component_value(self.key, slot)
    }

    /// Write a value, attaching the component if the entity lacks it.
    pub fn set<T: Any>(&mut self, component: impl ComponentLookup, value: T) -> Result<(), StoreError> {
        self.set_dyn(component, &value)
    }

    pub fn set_dyn(&mut self, component: impl ComponentLookup, value: &dyn Any) -> Result<(), StoreError> {
        let slot = component.resolve(&*self.store)?;
        self.store.set_component(&mut self.key, slot, value)
    }

    /// Detach a component. Returns `false` if the entity did not have it.
    pub fn remove(&mut self, component: impl ComponentLookup) -> Result<bool, StoreError> {
        let slot = component.resolve(&*self.store)?;
        self.store.remove_component(&mut self.key, slot)
    }

    pub fn mark_changed(&mut self, component: impl ComponentLookup) -> Result<(), StoreError> {
        let slot = component.resolve(&*self.store)?;
        self.store.mark_component_changed(self.key, slot)
    }

    /// Move into a floating group of its own. No-op if already floating.
    pub fn float(&mut self) -> Result<(), StoreError> {
        self.key = self.store.float(self.key)?;
        Ok(())
    }

    /// Move back into the archetype matching the current signature. No-op
    /// unless floating.
    pub fn unfloat(&mut self) -> Result<(), StoreError> {
        self.key = self.store.unfloat(self.key)?;
        Ok(())
    }

    pub fn destroy(self) -> Result<(), StoreError> {
        self.store.destroy_entity(self.key)
    }

    pub fn to_json(&self, map_id: Option<EntityIdMap<'_>>) -> Result<Value, StoreError> {
        self.store.entity_json(self.key, map_id)
    }
}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity").field("key", &self.key).finish()
    }
}
