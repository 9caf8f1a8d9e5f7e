//! Tessera Core
//!
//! In-process entity-component storage:
//! - Slab allocators over component backing stores
//! - Mutable, immutable and value-interned ("unison") components
//! - Archetype pages with swap-with-last slot recycling
//! - Entity handles with the float/unfloat structural-change protocol
//! - Signal-driven secondary indices, queries and JSON snapshots
//!
//! Everything here is single-threaded and synchronous.

pub mod config;
pub mod ecs;
pub mod pool;

pub use config::{ConfigError, StoreConfig};
pub use ecs::{EntityKey, EntityStore, StoreError};
pub use tessera_metrics::{StructuralCounters, StructuralEvent};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
