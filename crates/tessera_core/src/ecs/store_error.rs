use crate::config::ConfigError;
use crate::ecs::EntityKey;
use crate::pool::AllocError;
use thiserror::Error;

/// Errors raised by the entity store and its components.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("component '{name}' is already registered")]
    DuplicateComponent { name: String },

    #[error("component '{name}' is not registered")]
    UnknownComponent { name: String },

    #[error("index '{name}' is already registered")]
    DuplicateIndex { name: String },

    #[error("index '{name}' is not registered")]
    UnknownIndex { name: String },

    #[error("index '{name}' is not a {expected}")]
    IndexTypeMismatch {
        name: String,
        expected: &'static str,
    },

    #[error("component instance is already registered as '{existing}', cannot register it as '{requested}'")]
    AlreadyRegistered { existing: String, requested: String },

    #[error("component '{component}' allocates at most {limit} slots at once, but pages hold up to {page}")]
    PageTooLarge {
        component: String,
        page: usize,
        limit: usize,
    },

    #[error("a store holds at most {limit} components")]
    ComponentLimit { limit: usize },

    #[error("offset {offset} is beyond the backing store of '{component}' (len {len})")]
    Overflow {
        component: String,
        offset: usize,
        len: usize,
    },

    #[error("component '{component}' does not support {operation}")]
    Unsupported {
        component: String,
        operation: &'static str,
    },

    #[error("value for component '{component}' is not a {expected}")]
    TypeMismatch {
        component: String,
        expected: &'static str,
    },

    #[error("entity {key} is stale or was never created")]
    StaleEntity { key: EntityKey },

    #[error("entity does not have component '{component}'")]
    MissingComponent { component: String },

    #[error("failed to (de)serialize component '{component}': {source}")]
    Serialization {
        component: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
