//! The contract every component variant implements.
//!
//! The store, archetypes and entity handles only ever see `dyn Component`.
//! Values cross that boundary as `&dyn Any` and are downcast by the variant
//! that owns them.

use crate::ecs::{EntityStore, GroupId, Signal, StoreError, SubscriptionId};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;

/// Offset into a component's backing store, or the interned value index for
/// a unison component.
pub type Offset = usize;

/// Remaps entity ids stored inside component values during serialization.
pub type EntityIdMap<'a> = &'a dyn Fn(u64) -> Option<u64>;

const UNREGISTERED: &str = "<unregistered>";

/// Position assigned to a component when it is registered with a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentSlot(u16);

impl ComponentSlot {
    pub(crate) const fn new(index: u16) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Mutable,
    Immutable,
    Unison,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Component attached to the entity.
    Added,
    /// Value written through `set`.
    Set,
    /// About to be detached; the value is still readable.
    Removed,
    /// Entity data now lives at this slot.
    Moved,
    /// Explicit `mark_changed`.
    Marked,
}

/// Payload of a component's change signal: `size` slots of `group`
/// starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentEvent {
    pub group: GroupId,
    pub start: usize,
    pub size: usize,
    pub kind: ChangeKind,
}

/// Registration state and change signal shared by every variant.
#[derive(Debug, Default)]
pub struct ComponentHeader {
    name: Option<String>,
    slot: Option<ComponentSlot>,
    signal: Signal<ComponentEvent>,
}

impl ComponentHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn slot(&self) -> Option<ComponentSlot> {
        self.slot
    }

    pub fn signal(&self) -> &Signal<ComponentEvent> {
        &self.signal
    }

    pub fn signal_mut(&mut self) -> &mut Signal<ComponentEvent> {
        &mut self.signal
    }

    pub(crate) fn label(&self) -> String {
        self.name().unwrap_or(UNREGISTERED).to_string()
    }

    pub(crate) fn register(&mut self, name: &str, slot: ComponentSlot) -> Result<(), StoreError> {
        if let Some(existing) = &self.name {
            return Err(StoreError::AlreadyRegistered {
                existing: existing.clone(),
                requested: name.to_string(),
            });
        }
        self.name = Some(name.to_string());
        self.slot = Some(slot);
        Ok(())
    }

    pub(crate) fn overflow(&self, offset: Offset, len: usize) -> StoreError {
        StoreError::Overflow {
            component: self.label(),
            offset,
            len,
        }
    }

    pub(crate) fn unsupported(&self, operation: &'static str) -> StoreError {
        StoreError::Unsupported {
            component: self.label(),
            operation,
        }
    }

    pub(crate) fn mismatch(&self, expected: &'static str) -> StoreError {
        StoreError::TypeMismatch {
            component: self.label(),
            expected,
        }
    }

    pub(crate) fn serialization(&self, source: serde_json::Error) -> StoreError {
        StoreError::Serialization {
            component: self.label(),
            source,
        }
    }
}

/// Values a typed component can hold.
pub trait ComponentValue: Clone + Serialize + DeserializeOwned + 'static {}

impl<T> ComponentValue for T where T: Clone + Serialize + DeserializeOwned + 'static {}

pub trait Component: Any {
    fn header(&self) -> &ComponentHeader;
    fn header_mut(&mut self) -> &mut ComponentHeader;
    fn kind(&self) -> ComponentKind;

    /// Rust type name of the stored values.
    fn value_type(&self) -> &'static str;

    /// Whether `value` has the stored value type.
    fn accepts(&self, value: &dyn Any) -> bool;

    fn name(&self) -> &str {
        self.header().name().unwrap_or(UNREGISTERED)
    }

    fn slot(&self) -> Option<ComponentSlot> {
        self.header().slot()
    }

    /// Fails if this instance was already registered, with any store.
    fn register(&mut self, name: &str, slot: ComponentSlot) -> Result<(), StoreError> {
        self.header_mut().register(name, slot)
    }

    /// Reserve `size` slots, filled with `value` or the default value. Unison
    /// components intern the value instead and ignore `size`.
    fn allocate_offset(&mut self, value: Option<&dyn Any>, size: usize)
        -> Result<Offset, StoreError>;

    fn delete_offset(&mut self, offset: Offset, size: usize) -> Result<(), StoreError>;

    /// Largest `size` that `allocate_offset` can serve, if bounded.
    fn max_allocation(&self) -> Option<usize> {
        None
    }

    fn get(&self, offset: Offset) -> Result<&dyn Any, StoreError>;

    fn set(&mut self, offset: Offset, value: &dyn Any) -> Result<(), StoreError>;

    /// Copy the value at `offset` into `target`.
    fn copy_to(&self, offset: Offset, target: &mut dyn Any) -> Result<(), StoreError>;

    fn copy_between(&mut self, src: Offset, dest: Offset) -> Result<(), StoreError>;

    /// Structural move of a slot's value, used when entities change pages.
    /// Unlike `copy_between` every variant supports it.
    fn relocate(&mut self, src: Offset, dest: Offset) -> Result<(), StoreError>;

    /// `false` when offsets name shared values rather than per-entity slots.
    fn stores_per_slot(&self) -> bool {
        true
    }

    fn offset_hash(&self, offset: Option<Offset>) -> u32 {
        match offset {
            Some(_) => 1,
            None => 0,
        }
    }

    fn is_offset_compatible(&self, _a: Offset, _b: Offset) -> bool {
        true
    }

    fn mark_changed(&mut self, group: GroupId, start: usize, size: usize, kind: ChangeKind) {
        let event = ComponentEvent {
            group,
            start,
            size,
            kind,
        };
        self.header_mut().signal_mut().emit(&event);
    }

    fn subscribe(&mut self, listener: Box<dyn FnMut(&ComponentEvent)>) -> SubscriptionId {
        self.header_mut().signal_mut().subscribe_boxed(listener)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.header_mut().signal_mut().unsubscribe(id)
    }

    fn to_json(&self, offset: Offset, map_id: Option<EntityIdMap<'_>>)
        -> Result<Value, StoreError>;

    fn from_json(&self, value: &Value, map_id: Option<EntityIdMap<'_>>)
        -> Result<Box<dyn Any>, StoreError>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Anything that names a registered component: its name or its slot.
pub trait ComponentLookup {
    fn resolve(&self, store: &EntityStore) -> Result<ComponentSlot, StoreError>;
}

impl ComponentLookup for &str {
    fn resolve(&self, store: &EntityStore) -> Result<ComponentSlot, StoreError> {
        store.component_slot(self)
    }
}

impl ComponentLookup for String {
    fn resolve(&self, store: &EntityStore) -> Result<ComponentSlot, StoreError> {
        store.component_slot(self)
    }
}

impl ComponentLookup for &String {
    fn resolve(&self, store: &EntityStore) -> Result<ComponentSlot, StoreError> {
        store.component_slot(self)
    }
}

impl ComponentLookup for ComponentSlot {
    fn resolve(&self, store: &EntityStore) -> Result<ComponentSlot, StoreError> {
        if self.index() < store.component_count() {
            Ok(*self)
        } else {
            Err(StoreError::UnknownComponent {
                name: self.to_string(),
            })
        }
    }
}
