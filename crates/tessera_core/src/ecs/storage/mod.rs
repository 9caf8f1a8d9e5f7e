//! Component variants.
//!
//! - [`MutableComponent`]: per-slot values updated in place by a copy function
//! - [`ImmutableComponent`]: per-slot values replaced wholesale on `set`
//! - [`UnisonComponent`]: interned values shared by every entity in a page

mod column;
mod immutable;
mod mutable;
mod unison;

pub use immutable::ImmutableComponent;
pub use mutable::{CopyFn, MutableComponent, RemapFn};
pub use unison::{EqFn, HashFn, UnisonComponent};
