use super::column::{decode, encode, SlotColumn};
use super::RemapFn;
use crate::ecs::{
    Component, ComponentHeader, ComponentKind, ComponentValue, EntityIdMap, Offset, StoreError,
};
use crate::pool::AllocatorKind;
use serde_json::Value;
use std::any::{type_name, Any};
use std::ops::Range;

/// Per-slot component for write-once values such as an entity id.
///
/// `set` replaces the slot. Copies between slots are refused; the store
/// still moves values across pages through [`Component::relocate`].
pub struct ImmutableComponent<T: ComponentValue> {
    header: ComponentHeader,
    column: SlotColumn<T>,
    remap: Option<RemapFn<T>>,
}

impl<T: ComponentValue> ImmutableComponent<T> {
    pub fn new(default: T) -> Self {
        Self::with_allocator(default, AllocatorKind::default())
    }

    pub fn with_allocator(default: T, allocator: AllocatorKind) -> Self {
        Self {
            header: ComponentHeader::new(),
            column: SlotColumn::new(default, allocator.build()),
            remap: None,
        }
    }

    pub fn with_entity_refs(mut self, remap: RemapFn<T>) -> Self {
        self.remap = Some(remap);
        self
    }

    pub fn value(&self, offset: Offset) -> Option<&T> {
        self.column.get(offset)
    }

    pub fn values(&self, range: Range<Offset>) -> Option<&[T]> {
        self.column.slice(range)
    }

    pub fn backing_len(&self) -> usize {
        self.column.len()
    }

    fn typed<'a>(&self, value: &'a dyn Any) -> Result<&'a T, StoreError> {
        value
            .downcast_ref::<T>()
            .ok_or_else(|| self.header.mismatch(type_name::<T>()))
    }
}

impl ImmutableComponent<u64> {
    /// Numeric entity id, remapped through the id map on save and load.
    /// Ids the map does not know are kept as they are.
    pub fn entity_id() -> Self {
        Self::new(0).with_entity_refs(|id, map| {
            if let Some(mapped) = map(*id) {
                *id = mapped;
            }
        })
    }
}

impl<T: ComponentValue> Component for ImmutableComponent<T> {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Immutable
    }

    fn value_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn accepts(&self, value: &dyn Any) -> bool {
        value.is::<T>()
    }

    fn allocate_offset(
        &mut self,
        value: Option<&dyn Any>,
        size: usize,
    ) -> Result<Offset, StoreError> {
        let value = value.map(|v| self.typed(v)).transpose()?;
        Ok(self.column.allocate(size, value)?)
    }

    fn delete_offset(&mut self, offset: Offset, size: usize) -> Result<(), StoreError> {
        Ok(self.column.release(offset, size)?)
    }

    fn max_allocation(&self) -> Option<usize> {
        self.column.max_allocation()
    }

    fn get(&self, offset: Offset) -> Result<&dyn Any, StoreError> {
        self.column
            .get(offset)
            .map(|v| v as &dyn Any)
            .ok_or_else(|| self.header.overflow(offset, self.column.len()))
    }

    fn set(&mut self, offset: Offset, value: &dyn Any) -> Result<(), StoreError> {
        let value = self.typed(value)?.clone();
        let len = self.column.len();
        match self.column.get_mut(offset) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(self.header.overflow(offset, len)),
        }
    }

    fn copy_to(&self, _offset: Offset, _target: &mut dyn Any) -> Result<(), StoreError> {
        Err(self.header.unsupported("copy_to"))
    }

    fn copy_between(&mut self, _src: Offset, _dest: Offset) -> Result<(), StoreError> {
        Err(self.header.unsupported("copy_between"))
    }

    fn relocate(&mut self, src: Offset, dest: Offset) -> Result<(), StoreError> {
        if src == dest {
            return Ok(());
        }
        let len = self.column.len();
        match self.column.pair_mut(src, dest) {
            Some((from, to)) => {
                *to = from.clone();
                Ok(())
            }
            None => Err(self.header.overflow(src.max(dest), len)),
        }
    }

    fn to_json(&self, offset: Offset, map_id: Option<EntityIdMap<'_>>) -> Result<Value, StoreError> {
        let value = self
            .column
            .get(offset)
            .ok_or_else(|| self.header.overflow(offset, self.column.len()))?;
        encode(&self.header, value, self.remap, map_id)
    }

    fn from_json(
        &self,
        value: &Value,
        map_id: Option<EntityIdMap<'_>>,
    ) -> Result<Box<dyn Any>, StoreError> {
        let decoded: T = decode(&self.header, value, self.remap, map_id)?;
        Ok(Box::new(decoded))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
