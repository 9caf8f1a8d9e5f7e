//! Component signatures and the archetype hash.

use crate::ecs::{Component, ComponentSlot, Offset};

const HASH_SEED: u32 = 7;
const HASH_FACTOR: u32 = 31;

/// Per-slot presence and offset.
///
/// Indexed by [`ComponentSlot`]. Entries past the end are absent, and the
/// vector never ends in an absent entry, so two signatures with the same
/// presence pattern always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    offsets: Vec<Option<Offset>>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signature with every listed slot present at offset `0`.
    pub fn with_slots(slots: &[ComponentSlot]) -> Self {
        let mut signature = Self::new();
        for &slot in slots {
            signature.set(slot, Some(0));
        }
        signature
    }

    #[inline]
    pub fn get(&self, slot: ComponentSlot) -> Option<Offset> {
        self.offsets.get(slot.index()).copied().flatten()
    }

    #[inline]
    pub fn contains(&self, slot: ComponentSlot) -> bool {
        self.get(slot).is_some()
    }

    pub fn contains_all(&self, slots: &[ComponentSlot]) -> bool {
        slots.iter().all(|&slot| self.contains(slot))
    }

    pub fn set(&mut self, slot: ComponentSlot, offset: Option<Offset>) {
        let index = slot.index();
        match offset {
            Some(_) => {
                if self.offsets.len() <= index {
                    self.offsets.resize(index + 1, None);
                }
                self.offsets[index] = offset;
            }
            None => {
                if index < self.offsets.len() {
                    self.offsets[index] = None;
                    while matches!(self.offsets.last(), Some(None)) {
                        self.offsets.pop();
                    }
                }
            }
        }
    }

    /// Present slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentSlot, Offset)> + '_ {
        self.offsets.iter().enumerate().filter_map(|(i, entry)| {
            entry.map(|offset| (ComponentSlot::new(i as u16), offset))
        })
    }

    pub fn slots(&self) -> Vec<ComponentSlot> {
        self.iter().map(|(slot, _)| slot).collect()
    }

    pub fn len(&self) -> usize {
        self.offsets.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    /// Rolling hash over the presence pattern: start at 7, multiply by 31 once
    /// per absent slot skipped, then fold in each present slot as
    /// `hash * 31 + offset_hash`. Trailing absent slots do not contribute.
    pub fn archetype_hash(&self, components: &[Box<dyn Component>]) -> u32 {
        let mut hash = HASH_SEED;
        let mut skipped = 0u32;
        for (i, entry) in self.offsets.iter().enumerate() {
            let Some(offset) = entry else {
                skipped += 1;
                continue;
            };
            for _ in 0..skipped {
                hash = hash.wrapping_mul(HASH_FACTOR);
            }
            skipped = 0;
            let part = components
                .get(i)
                .map_or(1, |component| component.offset_hash(Some(*offset)));
            hash = hash.wrapping_mul(HASH_FACTOR).wrapping_add(part);
        }
        hash
    }

    /// Same presence pattern, and every component agrees the offsets name
    /// interchangeable values.
    pub fn is_compatible(&self, other: &Signature, components: &[Box<dyn Component>]) -> bool {
        if self.offsets.len() != other.offsets.len() {
            return false;
        }
        self.offsets
            .iter()
            .zip(&other.offsets)
            .enumerate()
            .all(|(i, pair)| match pair {
                (None, None) => true,
                (Some(a), Some(b)) => components
                    .get(i)
                    .map_or(a == b, |component| component.is_offset_compatible(*a, *b)),
                _ => false,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{MutableComponent, UnisonComponent};

    fn slot(i: u16) -> ComponentSlot {
        ComponentSlot::new(i)
    }

    fn plain_components(n: usize) -> Vec<Box<dyn Component>> {
        (0..n)
            .map(|_| Box::new(MutableComponent::new(0u32)) as Box<dyn Component>)
            .collect()
    }

    #[test]
    fn hash_follows_the_rolling_formula() {
        let components = plain_components(4);
        let empty = Signature::new();
        assert_eq!(empty.archetype_hash(&components), 7);

        // Slot 0 present: 7 * 31 + 1.
        let first = Signature::with_slots(&[slot(0)]);
        assert_eq!(first.archetype_hash(&components), 7 * 31 + 1);

        // Slots 1 and 3 present: skip one, fold, skip one, fold.
        let sparse = Signature::with_slots(&[slot(1), slot(3)]);
        let expected = ((7u32 * 31) * 31 + 1) * 31 * 31 + 1;
        assert_eq!(sparse.archetype_hash(&components), expected);
    }

    #[test]
    fn per_slot_offsets_do_not_affect_the_hash() {
        let components = plain_components(2);
        let mut a = Signature::new();
        a.set(slot(0), Some(0));
        a.set(slot(1), Some(64));
        let mut b = Signature::new();
        b.set(slot(0), Some(4096));
        b.set(slot(1), Some(3));

        assert_eq!(a.archetype_hash(&components), b.archetype_hash(&components));
        assert!(a.is_compatible(&b, &components));
    }

    #[test]
    fn unison_content_changes_the_hash() {
        let mut team = UnisonComponent::hashed(0u8);
        let red = team.get_unison_offset(&1);
        let blue = team.get_unison_offset(&2);
        let components: Vec<Box<dyn Component>> = vec![Box::new(team)];

        let mut a = Signature::new();
        a.set(slot(0), Some(red));
        let mut b = Signature::new();
        b.set(slot(0), Some(blue));

        assert_ne!(a.archetype_hash(&components), b.archetype_hash(&components));
        assert!(!a.is_compatible(&b, &components));
    }

    #[test]
    fn trailing_absent_slots_are_trimmed() {
        let mut signature = Signature::with_slots(&[slot(0), slot(5)]);
        signature.set(slot(5), None);
        assert_eq!(signature, Signature::with_slots(&[slot(0)]));
        assert_eq!(signature.len(), 1);

        signature.set(slot(0), None);
        assert!(signature.is_empty());
        signature.set(slot(9), None);
        assert!(signature.is_empty());
    }
}
