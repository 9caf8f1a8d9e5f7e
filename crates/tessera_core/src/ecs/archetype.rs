//! Archetypes: every page sharing one signature.

use crate::ecs::{GroupId, Signature};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// Pages are kept in creation order. `free_pages` is a stack of pages with
/// spare capacity, consulted before a new page is created. Archetypes are
/// never destroyed; their page list may become empty.
#[derive(Debug)]
pub struct Archetype {
    pub(crate) id: ArchetypeId,
    pub(crate) signature: Signature,
    pub(crate) hash: u32,
    pub(crate) pages: Vec<GroupId>,
    pub(crate) free_pages: Vec<GroupId>,
}

impl Archetype {
    pub(crate) fn new(id: ArchetypeId, signature: Signature, hash: u32) -> Self {
        Self {
            id,
            signature,
            hash,
            pages: Vec::new(),
            free_pages: Vec::new(),
        }
    }

    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Canonical offsets copied onto every page this archetype creates.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn pages(&self) -> &[GroupId] {
        &self.pages
    }

    pub fn free_pages(&self) -> &[GroupId] {
        &self.free_pages
    }
}
