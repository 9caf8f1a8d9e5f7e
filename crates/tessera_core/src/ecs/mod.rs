//! Entity-component storage.
//!
//! Components are registered once into an [`EntityStore`] and receive a
//! [`ComponentSlot`]. Entities live in pages ([`EntityGroup`]) owned by an
//! [`Archetype`], or alone in a floating group while their component set is
//! being reshaped. Every mutation is announced through the owning
//! component's [`Signal`], which is how secondary indices stay current.

mod archetype;
mod builder;
mod component;
mod entity;
mod group;
mod index;
mod query;
mod signal;
mod signature;
mod snapshot;
pub mod storage;
mod store;
mod store_error;

pub use archetype::{Archetype, ArchetypeId};
pub use builder::EntityBuilder;
pub use component::{
    ChangeKind, Component, ComponentEvent, ComponentHeader, ComponentKind, ComponentLookup,
    ComponentSlot, ComponentValue, EntityIdMap, Offset,
};
pub use entity::{Entity, EntityKey};
pub use group::{EntityGroup, GroupId};
pub use index::{IdIndex, StoreIndex, StoreView};
pub use query::{PageView, Query};
pub use signal::{Signal, SubscriptionId};
pub use signature::Signature;
pub use storage::{ImmutableComponent, MutableComponent, UnisonComponent};
pub use store::EntityStore;
pub use store_error::StoreError;

/// Create an entity from `name => value` pairs.
///
/// Expands to `store.create(builder)` and returns its `Result`.
#[macro_export]
macro_rules! spawn {
    ($store:expr $(, $name:expr => $value:expr)* $(,)?) => {{
        let builder = $crate::ecs::EntityBuilder::new()
            $(.with($name, $value))*;
        $store.create(builder)
    }};
}
