//! Memory dumps
//!
//! Renders the current young space, the old space and the handle table for
//! humans. Each space gets a block list, a map with one character per
//! 8 bytes (lowercase letters for free blocks, uppercase for used ones,
//! advancing per block) and its free list.

use std::fmt;

use crate::config::ALIGNMENT;
use crate::gc::{HEADER_SIZE, Heap, SpaceId};

/// Displayable snapshot of a heap, see [`Heap::dump`]
pub struct HeapDump<'a> {
    heap: &'a Heap,
}

impl Heap {
    /// Human-readable dump of the heap contents
    pub fn dump(&self) -> HeapDump<'_> {
        HeapDump { heap: self }
    }
}

impl HeapDump<'_> {
    fn fmt_space(&self, f: &mut fmt::Formatter<'_>, space: SpaceId) -> fmt::Result {
        writeln!(f, "Memory blocks")?;
        let arena = self.heap.arena(space);
        let mut map = vec![b'.'; arena.capacity() / ALIGNMENT];
        let mut free_count = 0usize;
        let mut used_count = 0usize;

        for block in self.heap.blocks(space) {
            let letter = if block.free {
                writeln!(f, "Free at {:#06x}, size {}", block.offset, block.size)?;
                free_count += 1;
                b'a' + ((free_count - 1) % 26) as u8
            } else {
                let handle = block
                    .handle
                    .map_or_else(|| "-".to_string(), |h| h.to_string());
                writeln!(
                    f,
                    "Used at {:#06x}, size {}, handle {}, survival {}",
                    block.offset, block.size, handle, block.survival
                )?;
                used_count += 1;
                b'A' + ((used_count - 1) % 26) as u8
            };

            let start = block.offset / ALIGNMENT;
            let end = (start + (block.size + HEADER_SIZE) / ALIGNMENT).min(map.len());
            map[start..end].fill(letter);
        }
        writeln!(f, "{}", String::from_utf8_lossy(&map))?;

        writeln!(f, "Free list")?;
        for &offset in arena.free_list() {
            writeln!(f, "Block at {:#06x}, size {}", offset, arena.header(offset).size)?;
        }
        Ok(())
    }
}

impl fmt::Display for HeapDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.heap.current_young();
        writeln!(f, "MEMORY DUMP")?;
        writeln!(f, "Current young space: {}", current)?;
        writeln!(f, "Young space ({})", current)?;
        self.fmt_space(f, current)?;

        writeln!(f, "Old space")?;
        self.fmt_space(f, SpaceId::Old)?;

        writeln!(f, "Handle table")?;
        for (handle, slot) in self.heap.handles().iter() {
            match slot {
                Some(address) => writeln!(f, "{} = {}", handle, address)?,
                None => writeln!(f, "{} = null", handle)?,
            }
        }
        Ok(())
    }
}
