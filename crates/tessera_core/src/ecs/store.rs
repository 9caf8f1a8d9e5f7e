//! The entity store: component registry, archetypes, pages and indices.

use crate::config::StoreConfig;
use crate::ecs::{
    Archetype, ArchetypeId, ChangeKind, Component, ComponentEvent, ComponentLookup,
    ComponentSlot, Entity, EntityBuilder, EntityGroup, EntityKey, GroupId, Query, Signature,
    StoreError, StoreIndex, StoreView, SubscriptionId,
};
use std::any::{type_name, Any};
use std::collections::HashMap;
use tessera_metrics::{StructuralCounters, StructuralEvent};
use tracing::{debug, trace, warn};

struct RegisteredIndex {
    name: String,
    slots: Vec<ComponentSlot>,
    index: Box<dyn StoreIndex>,
}

/// Owns every component, archetype, page and index of one world.
///
/// Groups live in an arena addressed by [`GroupId`]. Pages whose last entity
/// leaves are detached from their archetype and parked in a dead-group pool
/// that any archetype, or a floating entity, may draw from next.
pub struct EntityStore {
    config: StoreConfig,
    pub(crate) components: Vec<Box<dyn Component>>,
    component_names: HashMap<String, ComponentSlot>,
    pub(crate) archetypes: Vec<Archetype>,
    pub(crate) groups: Vec<EntityGroup>,
    pub(crate) floating: Vec<GroupId>,
    dead_groups: Vec<GroupId>,
    indices: Vec<RegisteredIndex>,
    index_names: HashMap<String, usize>,
    counters: StructuralCounters,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::from_valid_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: StoreConfig) -> Self {
        Self {
            config,
            components: Vec::new(),
            component_names: HashMap::new(),
            archetypes: Vec::new(),
            groups: Vec::new(),
            floating: Vec::new(),
            dead_groups: Vec::new(),
            indices: Vec::new(),
            index_names: HashMap::new(),
            counters: StructuralCounters::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn counters(&self) -> &StructuralCounters {
        &self.counters
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    pub fn add_component<C: Component>(
        &mut self,
        name: &str,
        component: C,
    ) -> Result<ComponentSlot, StoreError> {
        self.add_boxed_component(name, Box::new(component))
    }

    pub fn add_boxed_component(
        &mut self,
        name: &str,
        mut component: Box<dyn Component>,
    ) -> Result<ComponentSlot, StoreError> {
        if self.component_names.contains_key(name) {
            return Err(StoreError::DuplicateComponent {
                name: name.to_string(),
            });
        }
        let index = u16::try_from(self.components.len()).map_err(|_| StoreError::ComponentLimit {
            limit: u16::MAX as usize,
        })?;
        if let Some(limit) = component.max_allocation() {
            let page = self.config.max_capacity();
            if page > limit {
                return Err(StoreError::PageTooLarge {
                    component: name.to_string(),
                    page,
                    limit,
                });
            }
        }
        let slot = ComponentSlot::new(index);
        component.register(name, slot)?;

        debug!(component = name, slot = %slot, kind = ?component.kind(), "registered component");
        self.components.push(component);
        self.component_names.insert(name.to_string(), slot);
        Ok(slot)
    }

    pub fn component_slot(&self, name: &str) -> Result<ComponentSlot, StoreError> {
        self.component_names
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownComponent {
                name: name.to_string(),
            })
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn get_component(&self, component: impl ComponentLookup) -> Result<&dyn Component, StoreError> {
        let slot = component.resolve(self)?;
        Ok(&*self.components[slot.index()])
    }

    pub fn get_component_mut(
        &mut self,
        component: impl ComponentLookup,
    ) -> Result<&mut dyn Component, StoreError> {
        let slot = component.resolve(self)?;
        Ok(&mut *self.components[slot.index()])
    }

    /// Typed access to a registered component.
    pub fn component<C: Component>(&self, component: impl ComponentLookup) -> Result<&C, StoreError> {
        let registered = self.get_component(component)?;
        registered
            .as_any()
            .downcast_ref::<C>()
            .ok_or_else(|| StoreError::TypeMismatch {
                component: registered.name().to_string(),
                expected: type_name::<C>(),
            })
    }

    pub fn component_mut<C: Component>(
        &mut self,
        component: impl ComponentLookup,
    ) -> Result<&mut C, StoreError> {
        let registered = self.get_component_mut(component)?;
        let name = registered.name().to_string();
        registered
            .as_any_mut()
            .downcast_mut::<C>()
            .ok_or(StoreError::TypeMismatch {
                component: name,
                expected: type_name::<C>(),
            })
    }

    pub fn subscribe(
        &mut self,
        component: impl ComponentLookup,
        listener: impl FnMut(&ComponentEvent) + 'static,
    ) -> Result<SubscriptionId, StoreError> {
        let slot = component.resolve(self)?;
        Ok(self.components[slot.index()].subscribe(Box::new(listener)))
    }

    pub fn unsubscribe(
        &mut self,
        component: impl ComponentLookup,
        id: SubscriptionId,
    ) -> Result<bool, StoreError> {
        let slot = component.resolve(self)?;
        Ok(self.components[slot.index()].unsubscribe(id))
    }

    // ------------------------------------------------------------------
    // Indices
    // ------------------------------------------------------------------

    /// Register an index and replay an `Added` event for every live entity
    /// holding one of its watched components.
    pub fn add_index<I: StoreIndex>(&mut self, name: &str, index: I) -> Result<(), StoreError> {
        if self.index_names.contains_key(name) {
            return Err(StoreError::DuplicateIndex {
                name: name.to_string(),
            });
        }
        let slots = index
            .watches()
            .iter()
            .map(|component| self.component_slot(component))
            .collect::<Result<Vec<_>, _>>()?;

        let mut index: Box<dyn StoreIndex> = Box::new(index);
        let view = StoreView::new(&self.components, &self.groups);
        for page in self.groups.iter().filter(|g| !g.is_disposed() && !g.is_empty()) {
            for &slot in &slots {
                if page.offsets.contains(slot) {
                    let event = ComponentEvent {
                        group: page.id,
                        start: 0,
                        size: page.len(),
                        kind: ChangeKind::Added,
                    };
                    index.on_event(&view, slot, &event);
                }
            }
        }

        debug!(index = name, watched = slots.len(), "registered index");
        self.index_names.insert(name.to_string(), self.indices.len());
        self.indices.push(RegisteredIndex {
            name: name.to_string(),
            slots,
            index,
        });
        Ok(())
    }

    pub fn get_index(&self, name: &str) -> Result<&dyn StoreIndex, StoreError> {
        let position = self
            .index_names
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownIndex {
                name: name.to_string(),
            })?;
        Ok(&*self.indices[position].index)
    }

    pub fn index<I: StoreIndex>(&self, name: &str) -> Result<&I, StoreError> {
        self.get_index(name)?
            .as_any()
            .downcast_ref::<I>()
            .ok_or_else(|| StoreError::IndexTypeMismatch {
                name: name.to_string(),
                expected: type_name::<I>(),
            })
    }

    pub fn index_names(&self) -> impl Iterator<Item = &str> {
        self.indices.iter().map(|registered| registered.name.as_str())
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Create an entity directly in the archetype matching the builder's
    /// component set.
    pub fn create(&mut self, builder: EntityBuilder) -> Result<EntityKey, StoreError> {
        let mut signature = Signature::new();
        let mut values = Vec::with_capacity(builder.len());
        for (name, value) in builder.into_parts() {
            let slot = self.component_slot(&name)?;
            let component = &mut self.components[slot.index()];
            if !component.accepts(&*value) {
                return Err(StoreError::TypeMismatch {
                    component: name,
                    expected: component.value_type(),
                });
            }
            if component.stores_per_slot() {
                signature.set(slot, Some(0));
                values.push((slot, value));
            } else {
                let interned = component.allocate_offset(Some(&*value), 1)?;
                signature.set(slot, Some(interned));
            }
        }

        let archetype = self.get_or_create_archetype(&signature);
        let (group, index) = self.acquire_slot(archetype)?;
        if let Err(err) = self.write_initial(group, index, &values) {
            self.release_slot(group, index)?;
            return Err(err);
        }

        self.notify_all(group, index, ChangeKind::Added);
        self.counters.record(StructuralEvent::EntityCreated);
        Ok(self.key_at(group, index))
    }

    fn write_initial(
        &mut self,
        group: GroupId,
        index: usize,
        values: &[(ComponentSlot, Box<dyn Any>)],
    ) -> Result<(), StoreError> {
        let page = &self.groups[group.index()];
        for (slot, value) in values {
            let component = &mut self.components[slot.index()];
            let offset = page.entity_offset(*slot, index, true).ok_or_else(|| {
                StoreError::MissingComponent {
                    component: component.name().to_string(),
                }
            })?;
            component.set(offset, &**value)?;
        }
        Ok(())
    }

    /// A fresh floating entity with no components.
    pub fn create_floating_entity_slot(&mut self) -> EntityKey {
        let group = self.spawn_floating(Signature::new());
        self.counters.record(StructuralEvent::EntityCreated);
        self.key_at(group, 0)
    }

    /// Release an entity's slot without announcing its removal to
    /// listeners. [`EntityStore::destroy_entity`] is the announcing variant.
    pub fn release_entity_slot(&mut self, key: EntityKey) -> Result<(), StoreError> {
        self.validate(key)?;
        self.release_slot(key.group(), key.index())?;
        self.counters.record(StructuralEvent::EntityDestroyed);
        Ok(())
    }

    pub fn destroy_entity(&mut self, key: EntityKey) -> Result<(), StoreError> {
        self.validate(key)?;
        self.notify_all(key.group(), key.index(), ChangeKind::Removed);
        self.release_slot(key.group(), key.index())?;
        self.counters.record(StructuralEvent::EntityDestroyed);
        trace!(entity = %key, "destroyed entity");
        Ok(())
    }

    pub fn entity(&mut self, key: EntityKey) -> Result<Entity<'_>, StoreError> {
        self.validate(key)?;
        Ok(Entity::new(self, key))
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.validate(key).is_ok()
    }

    pub fn entity_count(&self) -> usize {
        self.groups
            .iter()
            .filter(|group| !group.is_disposed())
            .map(EntityGroup::len)
            .sum()
    }

    /// Keys of every live entity: archetype pages in creation order, then
    /// floating entities.
    pub fn entity_keys(&self) -> Vec<EntityKey> {
        self.live_groups()
            .flat_map(|group| {
                let page = &self.groups[group.index()];
                (0..page.len()).map(move |index| EntityKey::new(group, index, page.generation(index)))
            })
            .collect()
    }

    pub(crate) fn live_groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.archetypes
            .iter()
            .flat_map(|archetype| archetype.pages.iter().copied())
            .chain(self.floating.iter().copied())
    }

    pub fn query(&mut self) -> Query<'_> {
        Query::new(self)
    }

    // ------------------------------------------------------------------
    // Archetypes and groups
    // ------------------------------------------------------------------

    /// Archetype for `signature`, created on first request.
    ///
    /// A hash match is only reused when the stored signature is compatible;
    /// a genuine collision is logged and gets an archetype of its own.
    pub fn get_or_create_archetype(&mut self, signature: &Signature) -> ArchetypeId {
        let hash = signature.archetype_hash(&self.components);
        for archetype in &self.archetypes {
            if archetype.hash != hash {
                continue;
            }
            if archetype.signature.is_compatible(signature, &self.components) {
                return archetype.id;
            }
            warn!(hash, existing = %archetype.id, "archetype hash collision between incompatible signatures");
        }

        let id = ArchetypeId::new(self.archetypes.len() as u32);
        self.archetypes.push(Archetype::new(id, signature.clone(), hash));
        self.counters.record(StructuralEvent::ArchetypeCreated);
        debug!(archetype = %id, hash, components = signature.len(), "created archetype");
        id
    }

    pub fn archetype(&self, id: ArchetypeId) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    /// Live entities in an archetype: the sum of its page sizes.
    pub fn archetype_len(&self, id: ArchetypeId) -> usize {
        self.archetype(id).map_or(0, |archetype| {
            archetype
                .pages
                .iter()
                .map(|group| self.groups[group.index()].len())
                .sum()
        })
    }

    pub fn group(&self, id: GroupId) -> Option<&EntityGroup> {
        self.groups.get(id.index())
    }

    pub fn floating_groups(&self) -> &[GroupId] {
        &self.floating
    }

    pub fn dead_group_count(&self) -> usize {
        self.dead_groups.len()
    }

    fn allocate_group(&mut self, max_size: usize, offsets: Signature, hash: u32) -> GroupId {
        let id = match self.dead_groups.pop() {
            Some(id) => {
                trace!(group = %id, "reusing dead group");
                id
            }
            None => {
                let id = GroupId::new(self.groups.len() as u32);
                self.groups.push(EntityGroup::new(id));
                id
            }
        };
        self.groups[id.index()].revive(max_size, offsets, hash);
        id
    }

    fn spawn_floating(&mut self, offsets: Signature) -> GroupId {
        let hash = offsets.archetype_hash(&self.components);
        let group = self.allocate_group(1, offsets, hash);
        let page = &mut self.groups[group.index()];
        page.size = 1;
        page.parent_index = self.floating.len();
        self.floating.push(group);
        group
    }

    fn create_page(&mut self, archetype: ArchetypeId) -> Result<GroupId, StoreError> {
        let (template, hash, page_count) = {
            let owner = &self.archetypes[archetype.index()];
            (owner.signature.clone(), owner.hash, owner.pages.len())
        };
        let capacity = self.config.capacity_for(page_count);
        let offsets = self.allocate_storage(&template, capacity)?;
        let group = self.allocate_group(capacity, offsets, hash);

        let page = &mut self.groups[group.index()];
        page.parent = Some(archetype);
        page.parent_index = page_count;
        let owner = &mut self.archetypes[archetype.index()];
        owner.pages.push(group);
        owner.free_pages.push(group);

        self.counters.record(StructuralEvent::PageCreated);
        debug!(archetype = %archetype, group = %group, capacity, "created page");
        Ok(group)
    }

    /// Fresh storage for `size` entities shaped like `template`. Unison
    /// offsets are shared, not allocated.
    fn allocate_storage(&mut self, template: &Signature, size: usize) -> Result<Signature, StoreError> {
        let mut offsets = Signature::new();
        for (slot, offset) in template.iter() {
            let component = &mut self.components[slot.index()];
            if !component.stores_per_slot() {
                offsets.set(slot, Some(offset));
                continue;
            }
            match component.allocate_offset(None, size) {
                Ok(base) => offsets.set(slot, Some(base)),
                Err(err) => {
                    self.release_storage(&offsets, size)?;
                    return Err(err);
                }
            }
        }
        Ok(offsets)
    }

    fn release_storage(&mut self, offsets: &Signature, size: usize) -> Result<(), StoreError> {
        for (slot, base) in offsets.iter() {
            let component = &mut self.components[slot.index()];
            if component.stores_per_slot() {
                component.delete_offset(base, size)?;
            }
        }
        Ok(())
    }

    fn acquire_slot(&mut self, archetype: ArchetypeId) -> Result<(GroupId, usize), StoreError> {
        let group = match self.archetypes[archetype.index()].free_pages.last() {
            Some(&group) => group,
            None => self.create_page(archetype)?,
        };
        let page = &mut self.groups[group.index()];
        let index = page.size;
        page.size += 1;
        if page.is_full() {
            self.archetypes[archetype.index()].free_pages.pop();
        }
        Ok((group, index))
    }

    /// Swap-with-last removal of slot `index`. The entity moved out of the
    /// last slot gets a `Moved` event at its new position.
    fn release_slot(&mut self, group: GroupId, index: usize) -> Result<(), StoreError> {
        let page = &self.groups[group.index()];
        if page.is_disposed() || index >= page.size {
            return Err(StoreError::StaleEntity {
                key: EntityKey::new(group, index, page.generation(index)),
            });
        }
        let (parent, was_full, last) = (page.parent, page.is_full(), page.size - 1);

        if let (Some(archetype), true) = (parent, was_full) {
            self.archetypes[archetype.index()].free_pages.push(group);
        }
        if index != last {
            self.move_slot_data(group, last, group, index)?;
        }

        let page = &mut self.groups[group.index()];
        page.size -= 1;
        page.bump_generation(index);
        if index != last {
            page.bump_generation(last);
            self.notify_all(group, index, ChangeKind::Moved);
        }
        trace!(group = %group, index, "released slot");

        if self.groups[group.index()].is_empty() {
            self.retire_group(group)?;
        }
        Ok(())
    }

    /// Detach an empty group from its owner and park it in the dead pool.
    fn retire_group(&mut self, group: GroupId) -> Result<(), StoreError> {
        let page = &mut self.groups[group.index()];
        let parent = page.parent.take();
        let parent_index = page.parent_index;
        let max_size = page.max_size;
        let offsets = std::mem::take(&mut page.offsets);
        page.disposed = true;

        match parent {
            Some(archetype) => {
                let owner = &mut self.archetypes[archetype.index()];
                if owner.pages.get(parent_index) == Some(&group) {
                    owner.pages.remove(parent_index);
                }
                owner.free_pages.retain(|&free| free != group);
                for (position, &sibling) in owner.pages.iter().enumerate().skip(parent_index) {
                    self.groups[sibling.index()].parent_index = position;
                }
                self.counters.record(StructuralEvent::PageRecycled);
                debug!(archetype = %archetype, group = %group, "recycled empty page");
            }
            None => {
                if self.floating.get(parent_index) == Some(&group) {
                    self.floating.swap_remove(parent_index);
                    if let Some(&moved) = self.floating.get(parent_index) {
                        self.groups[moved.index()].parent_index = parent_index;
                    }
                }
            }
        }

        self.release_storage(&offsets, max_size)?;
        self.dead_groups.push(group);
        Ok(())
    }

    /// Relocate every per-slot value present in both groups.
    fn move_slot_data(
        &mut self,
        from: GroupId,
        from_index: usize,
        to: GroupId,
        to_index: usize,
    ) -> Result<(), StoreError> {
        let source = self.groups[from.index()].offsets.clone();
        for (slot, base) in source.iter() {
            let component = &mut self.components[slot.index()];
            if !component.stores_per_slot() {
                continue;
            }
            let Some(dest_base) = self.groups[to.index()].offsets.get(slot) else {
                continue;
            };
            component.relocate(base + from_index, dest_base + to_index)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural-change protocol
    // ------------------------------------------------------------------

    /// Move an entity into a floating group of its own. No-op when it
    /// already floats.
    pub fn float(&mut self, key: EntityKey) -> Result<EntityKey, StoreError> {
        let page = self.validate(key)?;
        if page.is_floating() {
            return Ok(key);
        }
        let template = page.offsets.clone();
        let offsets = self.allocate_storage(&template, 1)?;
        let target = self.spawn_floating(offsets);

        self.move_slot_data(key.group(), key.index(), target, 0)?;
        self.notify_all(target, 0, ChangeKind::Moved);
        self.release_slot(key.group(), key.index())?;

        self.counters.record(StructuralEvent::Floated);
        let floating = self.key_at(target, 0);
        trace!(from = %key, to = %floating, "floated entity");
        Ok(floating)
    }

    /// Move a floating entity into the archetype matching its signature.
    /// No-op unless it floats.
    pub fn unfloat(&mut self, key: EntityKey) -> Result<EntityKey, StoreError> {
        let page = self.validate(key)?;
        if !page.is_floating() {
            return Ok(key);
        }
        let signature = page.offsets.clone();
        let archetype = self.get_or_create_archetype(&signature);
        let (target, index) = self.acquire_slot(archetype)?;

        self.move_slot_data(key.group(), key.index(), target, index)?;
        self.notify_all(target, index, ChangeKind::Moved);
        self.release_slot(key.group(), key.index())?;

        self.counters.record(StructuralEvent::Unfloated);
        let batched = self.key_at(target, index);
        trace!(from = %key, to = %batched, "unfloated entity");
        Ok(batched)
    }

    /// Float, apply `change` to the floating entity, then return a batched
    /// entity to its archetype. A floating entity stays floating.
    ///
    /// `key` is updated at every move, so it names the entity even when an
    /// error is returned. If the final unfloat fails the entity is left
    /// floating.
    fn restructure<F>(&mut self, key: &mut EntityKey, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Self, EntityKey) -> Result<(), StoreError>,
    {
        let was_floating = self.validate(*key)?.is_floating();
        *key = self.float(*key)?;
        let result = change(self, *key);
        if !was_floating {
            *key = self.unfloat(*key)?;
        }
        result
    }

    fn attach(&mut self, floating: EntityKey, slot: ComponentSlot, offset: usize, kind: ChangeKind) {
        let page = &mut self.groups[floating.group().index()];
        page.offsets.set(slot, Some(offset));
        page.hash = page.offsets.archetype_hash(&self.components);
        self.notify(slot, floating.group(), floating.index(), 1, kind);
    }

    /// Write `value`, restructuring when the entity lacks the component or a
    /// unison value changes. `key` follows the entity through any move.
    pub(crate) fn set_component(
        &mut self,
        key: &mut EntityKey,
        slot: ComponentSlot,
        value: &dyn Any,
    ) -> Result<(), StoreError> {
        let component = &self.components[slot.index()];
        if !component.accepts(value) {
            return Err(StoreError::TypeMismatch {
                component: component.name().to_string(),
                expected: component.value_type(),
            });
        }
        let per_slot = component.stores_per_slot();
        let current = self.validate(*key)?.offsets.get(slot);

        if per_slot {
            if let Some(base) = current {
                self.components[slot.index()].set(base + key.index(), value)?;
                self.notify(slot, key.group(), key.index(), 1, ChangeKind::Set);
                return Ok(());
            }
            return self.restructure(key, |store, floating| {
                let offset = store.components[slot.index()].allocate_offset(Some(value), 1)?;
                store.attach(floating, slot, offset, ChangeKind::Added);
                Ok(())
            });
        }

        let interned = self.components[slot.index()].allocate_offset(Some(value), 1)?;
        match current {
            Some(offset) if offset == interned => {
                self.notify(slot, key.group(), key.index(), 1, ChangeKind::Set);
                Ok(())
            }
            _ => {
                let kind = if current.is_some() {
                    ChangeKind::Set
                } else {
                    ChangeKind::Added
                };
                self.restructure(key, |store, floating| {
                    store.attach(floating, slot, interned, kind);
                    Ok(())
                })
            }
        }
    }

    /// Detach a component. Returns `false` if the entity did not have it.
    pub(crate) fn remove_component(
        &mut self,
        key: &mut EntityKey,
        slot: ComponentSlot,
    ) -> Result<bool, StoreError> {
        if !self.validate(*key)?.offsets.contains(slot) {
            return Ok(false);
        }
        self.restructure(key, |store, floating| {
            store.notify(slot, floating.group(), floating.index(), 1, ChangeKind::Removed);
            let page = &mut store.groups[floating.group().index()];
            let base = page.offsets.get(slot);
            page.offsets.set(slot, None);
            page.hash = page.offsets.archetype_hash(&store.components);

            let component = &mut store.components[slot.index()];
            match base {
                Some(base) if component.stores_per_slot() => component.delete_offset(base, 1),
                _ => Ok(()),
            }
        })?;
        Ok(true)
    }

    pub(crate) fn mark_component_changed(
        &mut self,
        key: EntityKey,
        slot: ComponentSlot,
    ) -> Result<(), StoreError> {
        if !self.validate(key)?.offsets.contains(slot) {
            return Err(self.missing(slot));
        }
        self.notify(slot, key.group(), key.index(), 1, ChangeKind::Marked);
        Ok(())
    }

    pub(crate) fn has_component(&self, key: EntityKey, slot: ComponentSlot) -> Result<bool, StoreError> {
        Ok(self.validate(key)?.offsets.contains(slot))
    }

    pub(crate) fn component_value(
        &self,
        key: EntityKey,
        slot: ComponentSlot,
    ) -> Result<&dyn Any, StoreError> {
        let page = self.validate(key)?;
        let component = &self.components[slot.index()];
        let offset = page
            .entity_offset(slot, key.index(), component.stores_per_slot())
            .ok_or_else(|| self.missing(slot))?;
        component.get(offset)
    }

    // ------------------------------------------------------------------
    // Notification
    // ------------------------------------------------------------------

    /// Fire the component's signal, then feed every index watching it.
    pub(crate) fn notify(
        &mut self,
        slot: ComponentSlot,
        group: GroupId,
        start: usize,
        size: usize,
        kind: ChangeKind,
    ) {
        self.components[slot.index()].mark_changed(group, start, size, kind);
        if self.indices.is_empty() {
            return;
        }
        let event = ComponentEvent {
            group,
            start,
            size,
            kind,
        };
        let view = StoreView::new(&self.components, &self.groups);
        for registered in &mut self.indices {
            if registered.slots.contains(&slot) {
                registered.index.on_event(&view, slot, &event);
            }
        }
    }

    fn notify_all(&mut self, group: GroupId, index: usize, kind: ChangeKind) {
        for slot in self.groups[group.index()].offsets.slots() {
            self.notify(slot, group, index, 1, kind);
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    pub(crate) fn validate(&self, key: EntityKey) -> Result<&EntityGroup, StoreError> {
        match self.groups.get(key.group().index()) {
            Some(page)
                if !page.is_disposed()
                    && key.index() < page.len()
                    && page.generation(key.index()) == key.generation() =>
            {
                Ok(page)
            }
            _ => Err(StoreError::StaleEntity { key }),
        }
    }

    fn key_at(&self, group: GroupId, index: usize) -> EntityKey {
        EntityKey::new(group, index, self.groups[group.index()].generation(index))
    }

    pub(crate) fn missing(&self, slot: ComponentSlot) -> StoreError {
        StoreError::MissingComponent {
            component: self.components[slot.index()].name().to_string(),
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
