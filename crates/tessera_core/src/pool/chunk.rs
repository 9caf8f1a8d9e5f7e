use super::{AllocError, SlabAllocator};

pub const DEFAULT_PAGE_SIZE: usize = 65536;

/// Half-open free range `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeRange {
    pub start: usize,
    pub end: usize,
}

impl FreeRange {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// First-fit allocator over a sorted, coalesced list of free ranges.
///
/// The extent grows in multiples of `page_size`; whatever a growth step does
/// not hand out immediately is returned to the free list.
#[derive(Debug, Clone)]
pub struct ChunkAllocator {
    page_size: usize,
    free: Vec<FreeRange>,
    extent: usize,
}

impl ChunkAllocator {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            free: Vec::new(),
            extent: 0,
        }
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Free ranges, sorted by start, never adjacent to one another.
    pub fn free_ranges(&self) -> &[FreeRange] {
        &self.free
    }

    fn insert_free(&mut self, start: usize, end: usize) -> Result<(), AllocError> {
        let pos = match self.free.binary_search_by(|range| range.start.cmp(&start)) {
            Ok(_) => return Err(AllocError::DoubleFree { start, end }),
            Err(pos) => pos,
        };

        let overlaps_prev = pos > 0 && self.free[pos - 1].end > start;
        let overlaps_next = pos < self.free.len() && self.free[pos].start < end;
        if overlaps_prev || overlaps_next {
            return Err(AllocError::DoubleFree { start, end });
        }

        let merge_prev = pos > 0 && self.free[pos - 1].end == start;
        let merge_next = pos < self.free.len() && self.free[pos].start == end;
        match (merge_prev, merge_next) {
            (true, true) => {
                self.free[pos - 1].end = self.free[pos].end;
                self.free.remove(pos);
            }
            (true, false) => self.free[pos - 1].end = end,
            (false, true) => self.free[pos].start = start,
            (false, false) => self.free.insert(pos, FreeRange { start, end }),
        }
        Ok(())
    }
}

impl Default for ChunkAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl SlabAllocator for ChunkAllocator {
    fn allocate(&mut self, size: usize) -> Result<usize, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }

        if let Some(pos) = self.free.iter().position(|range| range.len() >= size) {
            let range = &mut self.free[pos];
            let start = range.start;
            range.start += size;
            if range.is_empty() {
                self.free.remove(pos);
            }
            return Ok(start);
        }

        let start = self.extent;
        self.extent += size.div_ceil(self.page_size) * self.page_size;
        if start + size < self.extent {
            self.insert_free(start + size, self.extent)?;
        }
        Ok(start)
    }

    fn unallocate(&mut self, offset: usize, size: usize) -> Result<(), AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        let end = offset + size;
        if end > self.extent {
            return Err(AllocError::OutOfRange {
                start: offset,
                end,
                extent: self.extent,
            });
        }
        self.insert_free(offset, end)
    }

    fn extent(&self) -> usize {
        self.extent
    }
}
