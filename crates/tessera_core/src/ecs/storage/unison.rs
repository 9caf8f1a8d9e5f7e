use super::column::{decode, encode};
use crate::ecs::{
    Component, ComponentHeader, ComponentKind, ComponentValue, EntityIdMap, Offset, StoreError,
};
use serde_json::Value;
use std::any::{type_name, Any};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub type EqFn<T> = fn(&T, &T) -> bool;
pub type HashFn<T> = fn(&T) -> u32;

/// Value-interned component.
///
/// Holds no per-entity storage. An offset is the index of a distinct value,
/// every entity of a page shares it, and the value's hash feeds the
/// archetype hash so equal values land in the same archetype. Interned
/// values are never released.
pub struct UnisonComponent<T: ComponentValue> {
    header: ComponentHeader,
    values: Vec<T>,
    default: T,
    eq: EqFn<T>,
    hash: HashFn<T>,
}

impl<T: ComponentValue> UnisonComponent<T> {
    pub fn new(default: T, eq: EqFn<T>, hash: HashFn<T>) -> Self {
        Self {
            header: ComponentHeader::new(),
            values: Vec::new(),
            default,
            eq,
            hash,
        }
    }

    /// Index of the interned value equal to `value`, interning it if needed.
    pub fn get_unison_offset(&mut self, value: &T) -> Offset {
        let eq = self.eq;
        match self.values.iter().position(|v| eq(v, value)) {
            Some(offset) => offset,
            None => {
                self.values.push(value.clone());
                self.values.len() - 1
            }
        }
    }

    pub fn value(&self, offset: Offset) -> Option<&T> {
        self.values.get(offset)
    }

    pub fn interned(&self) -> &[T] {
        &self.values
    }

    fn typed<'a>(&self, value: &'a dyn Any) -> Result<&'a T, StoreError> {
        value
            .downcast_ref::<T>()
            .ok_or_else(|| self.header.mismatch(type_name::<T>()))
    }
}

impl<T: ComponentValue + Eq + Hash> UnisonComponent<T> {
    /// Equality and hashing taken from the value type.
    pub fn hashed(default: T) -> Self {
        Self::new(default, |a, b| a == b, hash_value::<T>)
    }
}

fn hash_value<T: Hash>(value: &T) -> u32 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let bits = hasher.finish();
    (bits ^ (bits >> 32)) as u32
}

impl<T: ComponentValue> Component for UnisonComponent<T> {
    fn header(&self) -> &ComponentHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ComponentHeader {
        &mut self.header
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Unison
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
        _size: usize,
    ) -> Result<Offset, StoreError> {
        let value = match value {
            Some(v) => self.typed(v)?.clone(),
            None => self.default.clone(),
        };
        Ok(self.get_unison_offset(&value))
    }

    fn delete_offset(&mut self, _offset: Offset, _size: usize) -> Result<(), StoreError> {
        Ok(())
    }

    fn get(&self, offset: Offset) -> Result<&dyn Any, StoreError> {
        self.values
            .get(offset)
            .map(|v| v as &dyn Any)
            .ok_or_else(|| self.header.overflow(offset, self.values.len()))
    }

    fn set(&mut self, _offset: Offset, _value: &dyn Any) -> Result<(), StoreError> {
        Err(self.header.unsupported("set"))
    }

    fn copy_to(&self, _offset: Offset, _target: &mut dyn Any) -> Result<(), StoreError> {
        Err(self.header.unsupported("copy_to"))
    }

    fn copy_between(&mut self, _src: Offset, _dest: Offset) -> Result<(), StoreError> {
        Err(self.header.unsupported("copy_between"))
    }

    fn relocate(&mut self, _src: Offset, _dest: Offset) -> Result<(), StoreError> {
        Ok(())
    }

    fn stores_per_slot(&self) -> bool {
        false
    }

    fn offset_hash(&self, offset: Option<Offset>) -> u32 {
        match offset {
            None => 0,
            Some(offset) => self.values.get(offset).map_or(1, |v| (self.hash)(v)),
        }
    }

    fn is_offset_compatible(&self, a: Offset, b: Offset) -> bool {
        if a == b {
            return true;
        }
        match (self.values.get(a), self.values.get(b)) {
            (Some(x), Some(y)) => (self.eq)(x, y),
            _ => false,
        }
    }

    fn to_json(&self, offset: Offset, map_id: Option<EntityIdMap<'_>>) -> Result<Value, StoreError> {
        let value = self
            .values
            .get(offset)
            .ok_or_else(|| self.header.overflow(offset, self.values.len()))?;
        encode(&self.header, value, None, map_id)
    }

    fn from_json(
        &self,
        value: &Value,
        map_id: Option<EntityIdMap<'_>>,
    ) -> Result<Box<dyn Any>, StoreError> {
        let decoded: T = decode(&self.header, value, None, map_id)?;
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

    #[test]
    fn equal_values_share_an_offset() {
        let mut team = UnisonComponent::hashed(String::from("none"));
        let red = team.allocate_offset(Some(&String::from("red")), 1).unwrap();
        let blue = team.get_unison_offset(&String::from("blue"));
        let red_again = team.get_unison_offset(&String::from("red"));

        assert_eq!(red, red_again);
        assert_ne!(red, blue);
        assert_eq!(team.interned().len(), 2);
        assert_eq!(team.offset_hash(Some(red)), team.offset_hash(Some(red_again)));
        assert_eq!(team.offset_hash(None), 0);
    }

    #[test]
    fn content_equality_with_custom_functions() {
        // Case-insensitive labels: different offsets, same archetype.
        let mut label = UnisonComponent::new(
            String::new(),
            |a: &String, b: &String| a.eq_ignore_ascii_case(b),
            |v: &String| v.len() as u32,
        );
        let upper = label.get_unison_offset(&"RED".to_string());
        label.values.push("red".to_string());
        let lower = label.values.len() - 1;

        assert_ne!(upper, lower);
        assert!(label.is_offset_compatible(upper, lower));
        assert_eq!(label.offset_hash(Some(upper)), label.offset_hash(Some(lower)));
    }

    #[test]
    fn mutation_is_refused() {
        let mut team = UnisonComponent::hashed(0u8);
        let offset = team.allocate_offset(None, 1).unwrap();
        assert!(matches!(
            team.set(offset, &1u8),
            Err(StoreError::Unsupported { operation: "set", .. })
        ));
        assert!(matches!(
            team.copy_between(offset, offset),
            Err(StoreError::Unsupported { .. })
        ));
        assert!(matches!(team.get(5), Err(StoreError::Overflow { .. })));
        assert!(!team.stores_per_slot());
    }
}
