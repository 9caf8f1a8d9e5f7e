//! Slab allocators over component backing stores.
//!
//! An allocator never touches values. It only tracks which slot ranges of a
//! single backing store are free, and reports the extent (one past the
//! highest slot it ever handed out) so the owning column can grow to match.

mod chunk;
mod fixed;

pub use chunk::{ChunkAllocator, FreeRange, DEFAULT_PAGE_SIZE};
pub use fixed::{FixedSlabAllocator, DEFAULT_GROUP_SIZE};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("allocation size must be non-zero")]
    ZeroSize,

    #[error("size {size} is not supported by a fixed slab allocator with group size {group}")]
    UnsupportedSize { size: usize, group: usize },

    #[error("range {start}..{end} is already free")]
    DoubleFree { start: usize, end: usize },

    #[error("range {start}..{end} was not allocated with this size")]
    SizeMismatch { start: usize, end: usize },

    #[error("range {start}..{end} lies beyond the allocated extent {extent}")]
    OutOfRange {
        start: usize,
        end: usize,
        extent: usize,
    },
}

/// Free-list bookkeeping for one component's backing store.
pub trait SlabAllocator {
    /// Reserve `size` contiguous slots and return the first offset.
    fn allocate(&mut self, size: usize) -> Result<usize, AllocError>;

    /// Return a range previously obtained from [`SlabAllocator::allocate`]
    /// with the same `size`.
    fn unallocate(&mut self, offset: usize, size: usize) -> Result<(), AllocError>;

    /// One past the highest slot ever handed out.
    fn extent(&self) -> usize;

    /// Largest `size` [`SlabAllocator::allocate`] accepts, if bounded.
    fn max_size(&self) -> Option<usize> {
        None
    }
}

/// Serializable selection of an allocator strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocatorKind {
    Fixed { group: usize },
    Chunked { page_size: usize },
}

impl Default for AllocatorKind {
    fn default() -> Self {
        AllocatorKind::Chunked {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl AllocatorKind {
    pub fn build(self) -> Box<dyn SlabAllocator> {
        match self {
            AllocatorKind::Fixed { group } => Box::new(FixedSlabAllocator::with_group_size(group)),
            AllocatorKind::Chunked { page_size } => {
                Box::new(ChunkAllocator::with_page_size(page_size))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_kind_json_shape() {
        let fixed: AllocatorKind = serde_json::from_str(r#"{"kind":"fixed","group":8}"#).unwrap();
        assert_eq!(fixed, AllocatorKind::Fixed { group: 8 });

        let json = serde_json::to_string(&AllocatorKind::default()).unwrap();
        assert_eq!(json, r#"{"kind":"chunked","page_size":65536}"#);
    }

    #[test]
    fn built_allocators_start_empty() {
        let mut fixed = AllocatorKind::Fixed { group: 4 }.build();
        assert_eq!(fixed.extent(), 0);
        assert_eq!(fixed.allocate(1).unwrap(), 0);
        assert_eq!(fixed.extent(), 4);

        let mut chunked = AllocatorKind::Chunked { page_size: 16 }.build();
        assert_eq!(chunked.allocate(3).unwrap(), 0);
        assert_eq!(chunked.extent(), 16);
    }
}
