use super::{AllocError, SlabAllocator};

pub const DEFAULT_GROUP_SIZE: usize = 32;

/// Two-stack allocator serving single slots and `G`-slot groups in O(1).
///
/// Single slots are carved out of borrowed groups: the first slot is handed
/// out and the remaining `G - 1` go onto the single stack. Requests between
/// `2` and `G` slots are served with a whole group. A carved group never
/// returns to the group stack.
///
/// Every slot carries a free flag and every group a split flag, so a free of
/// a range that is already free, or with a size it was not allocated with,
/// is rejected instead of corrupting the stacks.
#[derive(Debug, Clone)]
pub struct FixedSlabAllocator {
    group: usize,
    singles: Vec<usize>,
    groups: Vec<usize>,
    extent: usize,
    free: Vec<bool>,
    split: Vec<bool>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SizeClass {
    Single,
    Group,
}

impl FixedSlabAllocator {
    pub fn new() -> Self {
        Self::with_group_size(DEFAULT_GROUP_SIZE)
    }

    pub fn with_group_size(group: usize) -> Self {
        Self {
            group: group.max(1),
            singles: Vec::new(),
            groups: Vec::new(),
            extent: 0,
            free: Vec::new(),
            split: Vec::new(),
        }
    }

    #[inline]
    pub fn group_size(&self) -> usize {
        self.group
    }

    #[inline]
    pub fn free_singles(&self) -> usize {
        self.singles.len()
    }

    #[inline]
    pub fn free_groups(&self) -> usize {
        self.groups.len()
    }

    fn class_of(&self, size: usize) -> Result<SizeClass, AllocError> {
        match size {
            0 => Err(AllocError::ZeroSize),
            1 => Ok(SizeClass::Single),
            s if s <= self.group => Ok(SizeClass::Group),
            s => Err(AllocError::UnsupportedSize {
                size: s,
                group: self.group,
            }),
        }
    }

    /// Pop or carve a group and mark all of its slots taken.
    fn take_group(&mut self) -> usize {
        let start = match self.groups.pop() {
            Some(start) => start,
            None => {
                let start = self.extent;
                self.extent += self.group;
                self.free.resize(self.extent, false);
                self.split.push(false);
                start
            }
        };
        self.free[start..start + self.group].fill(false);
        start
    }
}

impl Default for FixedSlabAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SlabAllocator for FixedSlabAllocator {
    fn allocate(&mut self, size: usize) -> Result<usize, AllocError> {
        match self.class_of(size)? {
            SizeClass::Single => {
                if let Some(offset) = self.singles.pop() {
                    self.free[offset] = false;
                    return Ok(offset);
                }
                let start = self.take_group();
                self.split[start / self.group] = true;
                self.free[start + 1..start + self.group].fill(true);
                // Reversed so the lowest slot is popped first.
                self.singles.extend((start + 1..start + self.group).rev());
                Ok(start)
            }
            SizeClass::Group => {
                let start = self.take_group();
                self.split[start / self.group] = false;
                Ok(start)
            }
        }
    }

    fn unallocate(&mut self, offset: usize, size: usize) -> Result<(), AllocError> {
        let class = self.class_of(size)?;
        let span = if class == SizeClass::Single { 1 } else { self.group };
        let end = offset + span;
        if end > self.extent {
            return Err(AllocError::OutOfRange {
                start: offset,
                end,
                extent: self.extent,
            });
        }
        if self.free[offset..end].iter().any(|&free| free) {
            return Err(AllocError::DoubleFree { start: offset, end });
        }
        let split = self.split[offset / self.group];
        match class {
            SizeClass::Single if split => self.singles.push(offset),
            SizeClass::Group if !split && offset % self.group == 0 => self.groups.push(offset),
            _ => return Err(AllocError::SizeMismatch { start: offset, end }),
        }
        self.free[offset..end].fill(true);
        Ok(())
    }

    fn extent(&self) -> usize {
        self.extent
    }

    fn max_size(&self) -> Option<usize> {
        Some(self.group)
    }
}
