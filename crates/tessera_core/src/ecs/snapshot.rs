//! JSON snapshots of a store's entities.
//!
//! A snapshot is an array with one object per entity, keyed by component
//! name. Entity ids held in component values are passed through the caller's
//! id map in both directions.

use crate::ecs::{EntityGroup, EntityIdMap, EntityKey, EntityStore, StoreError};
use serde_json::{Map, Value};

impl EntityStore {
    /// Every live entity: archetype pages in creation order, then floating
    /// entities.
    pub fn to_json(&self, map_id: Option<EntityIdMap<'_>>) -> Result<Value, StoreError> {
        let mut entities = Vec::with_capacity(self.entity_count());
        for group in self.live_groups() {
            let page = &self.groups[group.index()];
            for index in 0..page.len() {
                entities.push(Value::Object(self.encode_entity(page, index, map_id)?));
            }
        }
        Ok(Value::Array(entities))
    }

    pub fn entity_json(&self, key: EntityKey, map_id: Option<EntityIdMap<'_>>) -> Result<Value, StoreError> {
        let page = self.validate(key)?;
        Ok(Value::Object(self.encode_entity(page, key.index(), map_id)?))
    }

    fn encode_entity(
        &self,
        page: &EntityGroup,
        index: usize,
        map_id: Option<EntityIdMap<'_>>,
    ) -> Result<Map<String, Value>, StoreError> {
        let mut fields = Map::new();
        for slot in page.offsets.slots() {
            let component = &self.components[slot.index()];
            let Some(offset) = page.entity_offset(slot, index, component.stores_per_slot()) else {
                continue;
            };
            fields.insert(component.name().to_string(), component.to_json(offset, map_id)?);
        }
        Ok(fields)
    }

    /// Load every element of a snapshot as a new entity.
    ///
    /// Each element is built as a floating entity, one field at a time, and
    /// then batched into its archetype. An element that fails is destroyed
    /// and its error returned; elements loaded before it stay in the store.
    pub fn from_json(
        &mut self,
        snapshot: &Value,
        map_id: Option<EntityIdMap<'_>>,
    ) -> Result<Vec<EntityKey>, StoreError> {
        let elements = snapshot.as_array().ok_or_else(|| StoreError::MalformedSnapshot {
            reason: "expected an array of entities".to_string(),
        })?;

        let mut keys = Vec::with_capacity(elements.len());
        for (position, element) in elements.iter().enumerate() {
            let fields = element.as_object().ok_or_else(|| StoreError::MalformedSnapshot {
                reason: format!("entity {position} is not an object"),
            })?;
            keys.push(self.load_entity(fields, map_id)?);
        }
        Ok(keys)
    }

    fn load_entity(
        &mut self,
        fields: &Map<String, Value>,
        map_id: Option<EntityIdMap<'_>>,
    ) -> Result<EntityKey, StoreError> {
        let mut key = self.create_floating_entity_slot();
        match self.replay_fields(&mut key, fields, map_id) {
            Ok(()) => self.unfloat(key),
            Err(err) => {
                if self.contains(key) {
                    self.destroy_entity(key)?;
                }
                Err(err)
            }
        }
    }

    fn replay_fields(
        &mut self,
        key: &mut EntityKey,
        fields: &Map<String, Value>,
        map_id: Option<EntityIdMap<'_>>,
    ) -> Result<(), StoreError> {
        for (name, value) in fields {
            let slot = self.component_slot(name)?;
            let decoded = self.components[slot.index()].from_json(value, map_id)?;
            self.set_component(key, slot, &*decoded)?;
        }
        Ok(())
    }
}
