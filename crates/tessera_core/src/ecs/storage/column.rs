use super::RemapFn;
use crate::ecs::{ComponentHeader, EntityIdMap, Offset, StoreError};
use crate::pool::{AllocError, SlabAllocator};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::ops::Range;

/// Backing store of a per-slot component: a value array that grows lazily
/// to cover whatever its allocator hands out.
pub(crate) struct SlotColumn<T> {
    values: Vec<T>,
    allocator: Box<dyn SlabAllocator>,
    default: T,
}

impl<T: Clone> SlotColumn<T> {
    pub fn new(default: T, allocator: Box<dyn SlabAllocator>) -> Self {
        Self {
            values: Vec::new(),
            allocator,
            default,
        }
    }

    pub fn allocate(&mut self, size: usize, value: Option<&T>) -> Result<Offset, AllocError> {
        let offset = self.allocator.allocate(size)?;
        let end = offset + size;
        if self.values.len() < end {
            self.values.resize(end, self.default.clone());
        }
        let fill = value.unwrap_or(&self.default);
        for slot in &mut self.values[offset..end] {
            slot.clone_from(fill);
        }
        Ok(offset)
    }

    pub fn release(&mut self, offset: Offset, size: usize) -> Result<(), AllocError> {
        self.allocator.unallocate(offset, size)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn max_allocation(&self) -> Option<usize> {
        self.allocator.max_size()
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    #[inline]
    pub fn get(&self, offset: Offset) -> Option<&T> {
        self.values.get(offset)
    }

    #[inline]
    pub fn get_mut(&mut self, offset: Offset) -> Option<&mut T> {
        self.values.get_mut(offset)
    }

    pub fn slice(&self, range: Range<Offset>) -> Option<&[T]> {
        self.values.get(range)
    }

    pub fn slice_mut(&mut self, range: Range<Offset>) -> Option<&mut [T]> {
        self.values.get_mut(range)
    }

    /// Disjoint borrows of two distinct slots.
    pub fn pair_mut(&mut self, src: Offset, dest: Offset) -> Option<(&T, &mut T)> {
        if src == dest || src.max(dest) >= self.values.len() {
            return None;
        }
        if src < dest {
            let (lo, hi) = self.values.split_at_mut(dest);
            Some((&lo[src], &mut hi[0]))
        } else {
            let (lo, hi) = self.values.split_at_mut(src);
            Some((&hi[0], &mut lo[dest]))
        }
    }
}

pub(crate) fn encode<T: Serialize + Clone>(
    header: &ComponentHeader,
    value: &T,
    remap: Option<RemapFn<T>>,
    map_id: Option<EntityIdMap<'_>>,
) -> Result<Value, StoreError> {
    let encoded = match (remap, map_id) {
        (Some(remap), Some(map)) => {
            let mut mapped = value.clone();
            remap(&mut mapped, map);
            serde_json::to_value(&mapped)
        }
        _ => serde_json::to_value(value),
    };
    encoded.map_err(|source| header.serialization(source))
}

pub(crate) fn decode<T: DeserializeOwned>(
    header: &ComponentHeader,
    value: &Value,
    remap: Option<RemapFn<T>>,
    map_id: Option<EntityIdMap<'_>>,
) -> Result<T, StoreError> {
    let mut decoded = T::deserialize(value).map_err(|source| header.serialization(source))?;
    if let (Some(remap), Some(map)) = (remap, map_id) {
        remap(&mut decoded, map);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::ChunkAllocator;

    #[test]
    fn grows_lazily_and_fills() {
        let mut column = SlotColumn::new(0u32, Box::new(ChunkAllocator::with_page_size(64)));
        assert_eq!(column.len(), 0);

        let a = column.allocate(4, Some(&9)).unwrap();
        assert_eq!(column.len(), 4);
        assert_eq!(column.slice(a..a + 4).unwrap(), &[9, 9, 9, 9]);

        let b = column.allocate(2, None).unwrap();
        assert_eq!(column.len(), 6);
        assert_eq!(column.slice(b..b + 2).unwrap(), &[0, 0]);
    }

    #[test]
    fn pair_mut_borrows_both_directions() {
        let mut column = SlotColumn::new(0u32, Box::new(ChunkAllocator::with_page_size(8)));
        column.allocate(3, None).unwrap();
        *column.get_mut(0).unwrap() = 1;
        *column.get_mut(2).unwrap() = 3;

        let (src, dest) = column.pair_mut(2, 0).unwrap();
        *dest = *src;
        assert_eq!(column.get(0), Some(&3));
        assert!(column.pair_mut(1, 1).is_none());
        assert!(column.pair_mut(0, 5).is_none());
    }
}
