//! Entity groups (pages).

use crate::ecs::{ArchetypeId, ComponentSlot, Offset, Signature};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(u32);

impl GroupId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// A block of up to `max_size` entity slots sharing one signature.
///
/// Occupied slots are always `0..size`. `offsets` holds the start of this
/// page's run in each per-slot component, or the interned value for unison
/// components. A group with no parent archetype is floating: one slot, one
/// entity, reshaped in place.
#[derive(Debug)]
pub struct EntityGroup {
    pub(crate) id: GroupId,
    pub(crate) parent: Option<ArchetypeId>,
    pub(crate) parent_index: usize,
    pub(crate) size: usize,
    pub(crate) max_size: usize,
    pub(crate) offsets: Signature,
    pub(crate) hash: u32,
    pub(crate) disposed: bool,
    // Never truncated, so keys into a recycled group stay stale.
    generations: Vec<u32>,
}

impl EntityGroup {
    pub(crate) fn new(id: GroupId) -> Self {
        Self {
            id,
            parent: None,
            parent_index: 0,
            size: 0,
            max_size: 0,
            offsets: Signature::new(),
            hash: 0,
            disposed: false,
            generations: Vec::new(),
        }
    }

    /// Reset for reuse out of the dead-group pool.
    pub(crate) fn revive(&mut self, max_size: usize, offsets: Signature, hash: u32) {
        self.parent = None;
        self.parent_index = 0;
        self.size = 0;
        self.max_size = max_size;
        self.offsets = offsets;
        self.hash = hash;
        self.disposed = false;
        if self.generations.len() < max_size {
            self.generations.resize(max_size, 0);
        }
    }

    #[inline]
    pub fn id(&self) -> GroupId {
        self.id
    }

    #[inline]
    pub fn parent(&self) -> Option<ArchetypeId> {
        self.parent
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.size == self.max_size
    }

    #[inline]
    pub fn is_floating(&self) -> bool {
        self.parent.is_none() && !self.disposed
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn offsets(&self) -> &Signature {
        &self.offsets
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn generation(&self, index: usize) -> u32 {
        self.generations.get(index).copied().unwrap_or(0)
    }

    /// Backing-store offset of entity `index` for `slot`.
    pub fn entity_offset(&self, slot: ComponentSlot, index: usize, per_slot: bool) -> Option<Offset> {
        let base = self.offsets.get(slot)?;
        Some(if per_slot { base + index } else { base })
    }

    pub(crate) fn bump_generation(&mut self, index: usize) {
        if self.generations.len() <= index {
            self.generations.resize(index + 1, 0);
        }
        self.generations[index] = self.generations[index].wrapping_add(1);
    }
}
