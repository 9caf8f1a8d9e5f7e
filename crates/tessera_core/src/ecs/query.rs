//! Entity-by-entity and page-by-page iteration over matching entities.

use crate::ecs::{
    ArchetypeId, ChangeKind, Component, ComponentKind, ComponentLookup, ComponentSlot,
    ComponentValue, Entity, EntityKey, EntityStore, GroupId, ImmutableComponent,
    MutableComponent, StoreError,
};
use std::any::{type_name, Any};
use std::convert::Infallible;
use std::ops::Range;

/// Required-component filter over a store.
///
/// Iteration takes no snapshot. The page list is fixed when iteration starts,
/// but page sizes and keys are re-read at every step, so destroying or
/// restructuring entities from the callback may skip or revisit entities.
pub struct Query<'s> {
    store: &'s mut EntityStore,
    required: Vec<ComponentSlot>,
}

impl<'s> Query<'s> {
    pub(crate) fn new(store: &'s mut EntityStore) -> Self {
        Self {
            store,
            required: Vec::new(),
        }
    }

    pub fn with_components(mut self, names: &[&str]) -> Result<Self, StoreError> {
        for name in names {
            let slot = self.store.component_slot(name)?;
            if !self.required.contains(&slot) {
                self.required.push(slot);
            }
        }
        Ok(self)
    }

    pub fn with_slots(mut self, slots: &[ComponentSlot]) -> Self {
        for &slot in slots {
            if !self.required.contains(&slot) {
                self.required.push(slot);
            }
        }
        self
    }

    pub fn required(&self) -> &[ComponentSlot] {
        &self.required
    }

    /// Matching groups: pages of matching archetypes in creation order, then
    /// matching floating groups.
    pub fn groups(&self) -> Vec<GroupId> {
        let store = &*self.store;
        let mut groups: Vec<GroupId> = store
            .archetypes
            .iter()
            .filter(|archetype| archetype.signature.contains_all(&self.required))
            .flat_map(|archetype| archetype.pages.iter().copied())
            .collect();
        groups.extend(
            store
                .floating
                .iter()
                .copied()
                .filter(|group| store.groups[group.index()].offsets.contains_all(&self.required)),
        );
        groups
    }

    pub fn count(&self) -> usize {
        self.groups()
            .into_iter()
            .map(|group| self.store.groups[group.index()].len())
            .sum()
    }

    pub fn keys(&self) -> Vec<EntityKey> {
        let mut keys = Vec::new();
        for group in self.groups() {
            let page = &self.store.groups[group.index()];
            keys.extend((0..page.len()).map(|index| EntityKey::new(group, index, page.generation(index))));
        }
        keys
    }

    fn still_matches(&self, group: GroupId) -> bool {
        let page = &self.store.groups[group.index()];
        !page.is_disposed() && page.offsets.contains_all(&self.required)
    }

    fn live_key(&self, group: GroupId, index: usize) -> Option<EntityKey> {
        if !self.still_matches(group) {
            return None;
        }
        let page = &self.store.groups[group.index()];
        (index < page.len()).then(|| EntityKey::new(group, index, page.generation(index)))
    }

    /// Visit every matching entity, stopping at the first error.
    pub fn try_for_each<E, F>(&mut self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&mut Entity<'_>) -> Result<(), E>,
    {
        for group in self.groups() {
            let mut index = 0;
            while let Some(key) = self.live_key(group, index) {
                let mut entity = Entity::new(&mut *self.store, key);
                visit(&mut entity)?;
                index += 1;
            }
        }
        Ok(())
    }

    pub fn for_each<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut Entity<'_>),
    {
        let result = self.try_for_each(|entity| {
            visit(entity);
            Ok::<(), Infallible>(())
        });
        if let Err(never) = result {
            match never {}
        }
    }

    pub fn try_for_each_page<E, F>(&mut self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&mut PageView<'_>) -> Result<(), E>,
    {
        for group in self.groups() {
            if !self.still_matches(group) || self.store.groups[group.index()].is_empty() {
                continue;
            }
            let mut page = PageView {
                store: &mut *self.store,
                group,
            };
            visit(&mut page)?;
        }
        Ok(())
    }

    pub fn for_each_page<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut PageView<'_>),
    {
        let result = self.try_for_each_page(|page| {
            visit(page);
            Ok::<(), Infallible>(())
        });
        if let Err(never) = result {
            match never {}
        }
    }
}

/// One page of a query, with its component columns as slices.
pub struct PageView<'s> {
    store: &'s mut EntityStore,
    group: GroupId,
}

impl PageView<'_> {
    pub fn id(&self) -> GroupId {
        self.group
    }

    pub fn len(&self) -> usize {
        self.store.groups[self.group.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_floating(&self) -> bool {
        self.store.groups[self.group.index()].is_floating()
    }

    pub fn archetype(&self) -> Option<ArchetypeId> {
        self.store.groups[self.group.index()].parent()
    }

    fn range(&self, slot: ComponentSlot) -> Result<Range<usize>, StoreError> {
        let page = &self.store.groups[self.group.index()];
        let base = page.offsets.get(slot).ok_or_else(|| self.store.missing(slot))?;
        Ok(base..base + page.len())
    }

    /// Values of a per-slot component for every entity of the page, in slot
    /// order.
    pub fn column<T: ComponentValue>(&self, component: impl ComponentLookup) -> Result<&[T], StoreError> {
        let slot = component.resolve(&*self.store)?;
        let range = self.range(slot)?;
        typed_slice(&*self.store.components[slot.index()], range)
    }

    pub fn column_mut<T: ComponentValue>(
        &mut self,
        component: impl ComponentLookup,
    ) -> Result<&mut [T], StoreError> {
        let slot = component.resolve(&*self.store)?;
        let range = self.range(slot)?;
        typed_slice_mut(&mut *self.store.components[slot.index()], range)
    }

    /// A writable column alongside a read-only one.
    pub fn columns_mut<A: ComponentValue, B: ComponentValue>(
        &mut self,
        write: impl ComponentLookup,
        read: impl ComponentLookup,
    ) -> Result<(&mut [A], &[B]), StoreError> {
        let write = write.resolve(&*self.store)?;
        let read = read.resolve(&*self.store)?;
        if write == read {
            return Err(StoreError::Unsupported {
                component: self.store.components[write.index()].name().to_string(),
                operation: "columns_mut on a single component",
            });
        }
        let write_range = self.range(write)?;
        let read_range = self.range(read)?;

        let components = &mut self.store.components;
        let (w, r) = (write.index(), read.index());
        let (writer, reader) = if w < r {
            let (head, tail) = components.split_at_mut(r);
            (&mut head[w], &tail[0])
        } else {
            let (head, tail) = components.split_at_mut(w);
            (&mut tail[0], &head[r])
        };
        Ok((
            typed_slice_mut(&mut **writer, write_range)?,
            typed_slice(&**reader, read_range)?,
        ))
    }

    /// The interned value a unison component holds for this whole page.
    pub fn shared<T: Any>(&self, component: impl ComponentLookup) -> Result<&T, StoreError> {
        let slot = component.resolve(&*self.store)?;
        let registered = &self.store.components[slot.index()];
        if registered.kind() != ComponentKind::Unison {
            return Err(StoreError::Unsupported {
                component: registered.name().to_string(),
                operation: "shared",
            });
        }
        let offset = self.store.groups[self.group.index()]
            .offsets
            .get(slot)
            .ok_or_else(|| self.store.missing(slot))?;
        registered
            .get(offset)?
            .downcast_ref::<T>()
            .ok_or_else(|| StoreError::TypeMismatch {
                component: registered.name().to_string(),
                expected: type_name::<T>(),
            })
    }

    /// Announce a `Marked` change for every entity of the page.
    pub fn mark_changed(&mut self, component: impl ComponentLookup) -> Result<(), StoreError> {
        let slot = component.resolve(&*self.store)?;
        let len = self.range(slot)?.len();
        self.store.notify(slot, self.group, 0, len, ChangeKind::Marked);
        Ok(())
    }

    pub fn entity(&mut self, index: usize) -> Result<Entity<'_>, StoreError> {
        let generation = self.store.groups[self.group.index()].generation(index);
        self.store.entity(EntityKey::new(self.group, index, generation))
    }

    pub fn keys(&self) -> Vec<EntityKey> {
        let page = &self.store.groups[self.group.index()];
        (0..page.len())
            .map(|index| EntityKey::new(self.group, index, page.generation(index)))
            .collect()
    }
}

fn typed_slice<T: ComponentValue>(component: &dyn Component, range: Range<usize>) -> Result<&[T], StoreError> {
    let any = component.as_any();
    let typed = match component.kind() {
        ComponentKind::Mutable => any
            .downcast_ref::<MutableComponent<T>>()
            .map(|typed| (typed.values(range.clone()), typed.backing_len())),
        ComponentKind::Immutable => any
            .downcast_ref::<ImmutableComponent<T>>()
            .map(|typed| (typed.values(range.clone()), typed.backing_len())),
        ComponentKind::Unison => {
            return Err(StoreError::Unsupported {
                component: component.name().to_string(),
                operation: "column",
            })
        }
    };
    match typed {
        Some((Some(slice), _)) => Ok(slice),
        Some((None, len)) => Err(component.header().overflow(range.end, len)),
        None => Err(mismatch::<T>(component)),
    }
}

fn typed_slice_mut<T: ComponentValue>(
    component: &mut dyn Component,
    range: Range<usize>,
) -> Result<&mut [T], StoreError> {
    match component.kind() {
        ComponentKind::Mutable => {}
        ComponentKind::Immutable => {
            return Err(StoreError::Unsupported {
                component: component.name().to_string(),
                operation: "column_mut",
            })
        }
        ComponentKind::Unison => {
            return Err(StoreError::Unsupported {
                component: component.name().to_string(),
                operation: "column",
            })
        }
    }
    let mismatch = mismatch::<T>(component);
    let Some(typed) = component.as_any_mut().downcast_mut::<MutableComponent<T>>() else {
        return Err(mismatch);
    };
    let overflow = typed.header().overflow(range.end, typed.backing_len());
    typed.values_mut(range).ok_or(overflow)
}

fn mismatch<T>(component: &dyn Component) -> StoreError {
    StoreError::TypeMismatch {
        component: component.name().to_string(),
        expected: type_name::<T>(),
    }
}
