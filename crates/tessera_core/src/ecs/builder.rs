use std::any::Any;

/// Initial component values for [`EntityStore::create`](crate::ecs::EntityStore::create).
#[derive(Debug, Default)]
pub struct EntityBuilder {
    components: Vec<(String, Box<dyn Any>)>,
}

impl EntityBuilder {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Add a component value by name. A later value for the same name wins.
    pub fn with<T: Any>(self, name: impl Into<String>, value: T) -> Self {
        self.with_boxed(name, Box::new(value))
    }

    pub fn with_boxed(mut self, name: impl Into<String>, value: Box<dyn Any>) -> Self {
        let name = name.into();
        match self.components.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.components.push((name, value)),
        }
        self
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn into_parts(self) -> Vec<(String, Box<dyn Any>)> {
        self.components
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_values_replace_earlier_ones() {
        let builder = EntityBuilder::new()
            .with("health", 10u32)
            .with("name", String::from("crate"))
            .with("health", 20u32);

        assert_eq!(builder.len(), 2);
        assert_eq!(builder.names().collect::<Vec<_>>(), vec!["health", "name"]);

        let parts = builder.into_parts();
        assert_eq!(parts[0].1.downcast_ref::<u32>(), Some(&20));
    }
}
