//! Arena allocator
//!
//! Each arena is a fixed-size byte buffer tiled by blocks:
//! ```text
//! +--------+---------+--------+-------------+--------+---------+
//! | header | payload | header |   payload   | header | payload |  ...
//! +--------+---------+--------+-------------+--------+---------+
//! 0                                                       capacity
//! ```
//!
//! Free blocks are tracked by a free list of header offsets kept in
//! ascending address order. Allocation searches that list first-fit or
//! best-fit and splits the chosen block. Release inserts the block back
//! in address order without coalescing; adjacent free blocks are only
//! merged by the major collector.

use std::fmt;

use super::header::{BlockHeader, HEADER_SIZE};
use crate::config::{Strategy, align_up};
use crate::error::HeapError;

/// Identifies one of the three arenas of a heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpaceId {
    /// First young semi-space
    Young0,
    /// Second young semi-space
    Young1,
    /// Old generation
    Old,
}

impl SpaceId {
    pub const ALL: [SpaceId; 3] = [SpaceId::Young0, SpaceId::Young1, SpaceId::Old];

    /// Position of this space in a heap's arena array
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            SpaceId::Young0 => 0,
            SpaceId::Young1 => 1,
            SpaceId::Old => 2,
        }
    }

    #[inline]
    pub const fn is_young(self) -> bool {
        !matches!(self, SpaceId::Old)
    }

    /// The other young semi-space. The old space maps to itself.
    #[inline]
    pub const fn other_young(self) -> SpaceId {
        match self {
            SpaceId::Young0 => SpaceId::Young1,
            SpaceId::Young1 => SpaceId::Young0,
            SpaceId::Old => SpaceId::Old,
        }
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceId::Young0 => write!(f, "young0"),
            SpaceId::Young1 => write!(f, "young1"),
            SpaceId::Old => write!(f, "old"),
        }
    }
}

/// Location of an object's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub space: SpaceId,
    /// Byte offset of the payload (just past the header) within the arena
    pub offset: usize,
}

impl Address {
    #[inline]
    pub const fn new(space: SpaceId, offset: usize) -> Self {
        Address { space, offset }
    }

    /// Offset of the block header preceding the payload
    #[inline]
    pub const fn header_offset(&self) -> usize {
        self.offset - HEADER_SIZE
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{:#06x}", self.space, self.offset)
    }
}

/// One arena with its address-ordered free list
#[derive(Clone)]
pub struct Arena {
    space: SpaceId,
    /// Raw arena memory
    bytes: Vec<u8>,
    /// Header offsets of free blocks, strictly ascending
    free_list: Vec<usize>,
}

impl Arena {
    /// Create an arena holding a single free block
    pub fn new(space: SpaceId, capacity: usize) -> Self {
        debug_assert!(capacity >= HEADER_SIZE);
        let mut arena = Arena {
            space,
            bytes: vec![0u8; capacity],
            free_list: Vec::new(),
        };
        arena.reset();
        arena
    }

    /// Zero the arena and make it one free block again
    pub fn reset(&mut self) {
        self.bytes.fill(0);
        self.free_list.clear();
        self.set_free_tail(0);
    }

    /// Total size in bytes, headers included
    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Header offsets of free blocks in ascending order
    #[inline]
    pub fn free_list(&self) -> &[usize] {
        &self.free_list
    }

    /// Raw arena contents
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Decode the header at `offset`
    #[inline]
    pub fn header(&self, offset: usize) -> BlockHeader {
        BlockHeader::read(&self.bytes, offset)
    }

    #[inline]
    pub(crate) fn set_header(&mut self, offset: usize, header: &BlockHeader) {
        header.write(&mut self.bytes, offset);
    }

    /// Payload bytes of the block whose payload starts at `offset`
    pub fn payload(&self, offset: usize) -> &[u8] {
        let size = self.header(offset - HEADER_SIZE).size;
        &self.bytes[offset..offset + size]
    }

    pub(crate) fn payload_mut(&mut self, offset: usize) -> &mut [u8] {
        let size = self.header(offset - HEADER_SIZE).size;
        &mut self.bytes[offset..offset + size]
    }

    /// Total payload bytes available on the free list
    pub fn free_bytes(&self) -> usize {
        self.free_list
            .iter()
            .map(|&offset| self.header(offset).size)
            .sum()
    }

    /// Iterate over all blocks in address order
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            arena: self,
            offset: 0,
        }
    }

    /// Turn everything from `offset` to the end into the arena's only free
    /// block. With nothing left over the free list ends up empty.
    pub(crate) fn set_free_tail(&mut self, offset: usize) {
        self.free_list.clear();
        let remaining = self.capacity() - offset;
        if remaining == 0 {
            return;
        }
        debug_assert!(remaining >= HEADER_SIZE, "tail too small for a header");
        self.set_header(offset, &BlockHeader::free(remaining - HEADER_SIZE));
        self.free_list.push(offset);
    }

    /// Find the free list position of a block with at least `needed` payload
    /// bytes
    ///
    /// Best-fit keeps the first of several equally small candidates, which is
    /// the lowest-addressed one.
    pub fn find_fit(&self, strategy: Strategy, needed: usize) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;

        for (index, &offset) in self.free_list.iter().enumerate() {
            let size = self.header(offset).size;
            if size < needed {
                continue;
            }
            match strategy {
                Strategy::FirstFit => return Some(index),
                Strategy::BestFit => {
                    if best.is_none_or(|(_, best_size)| size < best_size) {
                        best = Some((index, size));
                    }
                }
            }
        }

        best.map(|(index, _)| index)
    }

    /// Allocate a block with room for `size` payload bytes
    ///
    /// Returns the payload offset. The new block has no handle and a zero
    /// survival count.
    pub fn allocate(&mut self, size: usize, strategy: Strategy) -> Result<usize, HeapError> {
        let fit = align_up(size).and_then(|aligned| {
            let needed = aligned.checked_add(HEADER_SIZE)?;
            let index = self.find_fit(strategy, needed)?;
            Some((aligned, needed, index))
        });
        let Some((aligned, needed, index)) = fit else {
            log::warn!("{}: out of memory for {} bytes", self.space, size);
            return Err(HeapError::OutOfMemory {
                space: self.space,
                requested: size,
            });
        };

        let offset = self.free_list[index];
        let block = self.header(offset);
        let remainder = block.size - needed;

        if remainder < HEADER_SIZE {
            // The leftover could never satisfy a request; hand it out too
            self.free_list.remove(index);
            self.set_header(offset, &BlockHeader::used(block.size));
        } else {
            let rest = offset + needed;
            self.set_header(rest, &BlockHeader::free(remainder));
            self.free_list[index] = rest;
            self.set_header(offset, &BlockHeader::used(aligned));
        }

        log::trace!(
            "{}: allocated {} bytes at {:#x} ({})",
            self.space,
            size,
            offset,
            strategy
        );
        Ok(offset + HEADER_SIZE)
    }

    /// Return the block whose payload starts at `payload` to the free list
    pub fn free(&mut self, payload: usize) -> Result<(), HeapError> {
        let not_allocated = HeapError::NotAllocated {
            space: self.space,
            offset: payload,
        };
        let Some(offset) = payload.checked_sub(HEADER_SIZE) else {
            return Err(not_allocated);
        };
        // Must start a block, not point into someone's payload
        let is_block = self
            .blocks()
            .take_while(|&(start, _)| start <= offset)
            .any(|(start, _)| start == offset);
        if !is_block {
            return Err(not_allocated);
        }

        let mut header = self.header(offset);
        if header.free {
            return Err(not_allocated);
        }
        header.free = true;
        header.survival = 0;
        header.handle = None;
        self.set_header(offset, &header);

        let position = self
            .free_list
            .iter()
            .position(|&node| node > offset)
            .unwrap_or(self.free_list.len());
        self.free_list.insert(position, offset);

        log::trace!("{}: freed {} bytes at {:#x}", self.space, header.size, offset);
        Ok(())
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("space", &self.space)
            .field("capacity", &self.capacity())
            .field("free_list", &self.free_list)
            .finish()
    }
}

/// Iterator over the blocks of an arena
pub struct Blocks<'a> {
    arena: &'a Arena,
    offset: usize,
}

impl Iterator for Blocks<'_> {
    /// Header offset and decoded header
    type Item = (usize, BlockHeader);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset + HEADER_SIZE > self.arena.capacity() {
            return None;
        }

        let offset = self.offset;
        let header = self.arena.header(offset);
        self.offset += header.total_size();

        Some((offset, header))
    }
}
