use super::column::{decode, encode, SlotColumn};
use crate::ecs::{
    Component, ComponentHeader, ComponentKind, ComponentValue, EntityIdMap, Offset, StoreError,
};
use crate::pool::AllocatorKind;
use serde_json::Value;
use std::any::{type_name, Any};
use std::ops::Range;

/// In-place copy used by `set` and `copy_between`.
pub type CopyFn<T> = fn(&T, &mut T);

/// Rewrites entity ids held inside a value.
pub type RemapFn<T> = fn(&mut T, &dyn Fn(u64) -> Option<u64>);

fn clone_into<T: Clone>(src: &T, dest: &mut T) {
    dest.clone_from(src);
}

/// Per-slot component whose slots are updated in place.
///
/// Writes go through the copy function instead of replacing the value, so
/// anything that owns heap storage (a `Vec`, a `String`) keeps its buffer.
pub struct MutableComponent<T: ComponentValue> {
    header: ComponentHeader,
    column: SlotColumn<T>,
    copy: CopyFn<T>,
    remap: Option<RemapFn<T>>,
}

impl<T: ComponentValue> MutableComponent<T> {
    pub fn new(default: T) -> Self {
        Self::with_allocator(default, AllocatorKind::default())
    }

    pub fn with_allocator(default: T, allocator: AllocatorKind) -> Self {
        Self {
            header: ComponentHeader::new(),
            column: SlotColumn::new(default, allocator.build()),
            copy: clone_into::<T>,
            remap: None,
        }
    }

    pub fn with_copy(mut self, copy: CopyFn<T>) -> Self {
        self.copy = copy;
        self
    }

    pub fn with_entity_refs(mut self, remap: RemapFn<T>) -> Self {
        self.remap = Some(remap);
        self
    }

    pub fn default_value(&self) -> &T {
        self.column.default_value()
    }

    pub fn value(&self, offset: Offset) -> Option<&T> {
        self.column.get(offset)
    }

    pub fn value_mut(&mut self, offset: Offset) -> Option<&mut T> {
        self.column.get_mut(offset)
    }

    pub fn values(&self, range: Range<Offset>) -> Option<&[T]> {
        self.column.slice(range)
    }

    pub fn values_mut(&mut self, range: Range<Offset>) -> Option<&mut [T]> {
        self.column.slice_mut(range)
    }

    /// Backing store length, including slots not currently handed out.
    pub fn backing_len(&self) -> usize {
        self.column.len()
    }

    fn typed<'a>(&self, value: &'a dyn Any) -> Result<&'a T, StoreError> {
        value
            .downcast_ref::<T>()
            .ok_or_else(|| self.header.mismatch(type_name::<T>()))
    }
}

impl<T: ComponentValue> Component for MutableComponent<T> {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Mutable
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
        let value = self.typed(value)?;
        let len = self.column.len();
        match self.column.get_mut(offset) {
            Some(slot) => {
                (self.copy)(value, slot);
                Ok(())
            }
            None => Err(self.header.overflow(offset, len)),
        }
    }

    fn copy_to(&self, offset: Offset, target: &mut dyn Any) -> Result<(), StoreError> {
        let target = target
            .downcast_mut::<T>()
            .ok_or_else(|| self.header.mismatch(type_name::<T>()))?;
        let src = self
            .column
            .get(offset)
            .ok_or_else(|| self.header.overflow(offset, self.column.len()))?;
        (self.copy)(src, target);
        Ok(())
    }

    fn copy_between(&mut self, src: Offset, dest: Offset) -> Result<(), StoreError> {
        if src == dest {
            return Ok(());
        }
        let len = self.column.len();
        match self.column.pair_mut(src, dest) {
            Some((from, to)) => {
                (self.copy)(from, to);
                Ok(())
            }
            None => Err(self.header.overflow(src.max(dest), len)),
        }
    }

    fn relocate(&mut self, src: Offset, dest: Offset) -> Result<(), StoreError> {
        self.copy_between(src, dest)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentSlot;

    fn position() -> MutableComponent<[f32; 3]> {
        let mut component = MutableComponent::new([0.0; 3]);
        component.register("position", ComponentSlot::new(0)).unwrap();
        component
    }

    #[test]
    fn set_get_and_copy() {
        let mut component = position();
        let offset = component.allocate_offset(None, 4).unwrap();
        component.set(offset + 1, &[1.0f32, 2.0, 3.0]).unwrap();

        let read = component.get(offset + 1).unwrap().downcast_ref::<[f32; 3]>();
        assert_eq!(read, Some(&[1.0, 2.0, 3.0]));

        component.copy_between(offset + 1, offset + 3).unwrap();
        assert_eq!(component.value(offset + 3), Some(&[1.0, 2.0, 3.0]));

        let mut out = [0.0f32; 3];
        component.copy_to(offset + 3, &mut out).unwrap();
        assert_eq!(out, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn custom_copy_function_is_used() {
        let mut component = MutableComponent::new(vec![0u8; 2])
            .with_copy(|src: &Vec<u8>, dest: &mut Vec<u8>| {
                dest.clear();
                dest.extend(src.iter().map(|b| b + 1));
            });
        let offset = component.allocate_offset(None, 1).unwrap();
        component.set(offset, &vec![1u8, 2]).unwrap();
        assert_eq!(component.value(offset), Some(&vec![2, 3]));
    }

    #[test]
    fn errors_carry_the_component_name() {
        let mut component = position();
        component.allocate_offset(None, 1).unwrap();

        match component.get(10) {
            Err(StoreError::Overflow { component, offset, .. }) => {
                assert_eq!(component, "position");
                assert_eq!(offset, 10);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
        assert!(matches!(
            component.set(0, &5u32),
            Err(StoreError::TypeMismatch { .. })
        ));
        assert!(matches!(
            component.register("again", ComponentSlot::new(1)),
            Err(StoreError::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn json_round_trip_with_remapping() {
        let mut component = MutableComponent::new(0u64)
            .with_entity_refs(|target: &mut u64, map| {
                if let Some(mapped) = map(*target) {
                    *target = mapped;
                }
            });
        let offset = component.allocate_offset(Some(&7u64), 1).unwrap();

        let shift = |id: u64| Some(id + 100);
        let json = component.to_json(offset, Some(&shift)).unwrap();
        assert_eq!(json, serde_json::json!(107));

        let back = component.from_json(&json, None).unwrap();
        assert_eq!(back.downcast_ref::<u64>(), Some(&107));
    }
}
