//! Heap integrity checks
//!
//! Walks every arena and the handle table and reports the first broken
//! invariant. The young space that is not current holds garbage after a
//! minor collection, so only its layout and free list are checked.

use std::collections::HashSet;

use super::allocator::{Address, SpaceId};
use super::handles::Handle;
use super::header::HEADER_SIZE;
use super::heap::Heap;
use crate::config::ALIGNMENT;
use crate::error::IntegrityError;

pub(crate) fn verify(heap: &Heap) -> Result<(), IntegrityError> {
    for space in SpaceId::ALL {
        check_layout(heap, space)?;
    }
    check_handles(heap)
}

/// Partition and free-list invariants of one arena
fn check_layout(heap: &Heap, space: SpaceId) -> Result<(), IntegrityError> {
    let arena = heap.arena(space);
    let capacity = arena.capacity();
    let mut free_blocks = HashSet::new();
    let mut offset = 0;

    while offset < capacity {
        if offset + HEADER_SIZE > capacity {
            return Err(IntegrityError::Partition { space, offset });
        }
        let header = arena.header(offset);
        if header.size % ALIGNMENT != 0 {
            return Err(IntegrityError::Misaligned {
                space,
                offset,
                size: header.size,
            });
        }
        if header.free {
            free_blocks.insert(offset);
        }
        offset += header.total_size();
    }
    if offset != capacity {
        return Err(IntegrityError::Partition { space, offset });
    }

    let mut previous = None;
    for &node in arena.free_list() {
        if previous.is_some_and(|prev| prev >= node) {
            return Err(IntegrityError::FreeListOrder {
                space,
                offset: node,
            });
        }
        if !free_blocks.remove(&node) {
            return Err(IntegrityError::FreeListEntry {
                space,
                offset: node,
            });
        }
        previous = Some(node);
    }
    if let Some(&offset) = free_blocks.iter().min() {
        return Err(IntegrityError::FreeListMissing { space, offset });
    }

    Ok(())
}

/// Every live handle resolves to its own used block, and every used block
/// in a live space is owned by a live handle
fn check_handles(heap: &Heap) -> Result<(), IntegrityError> {
    let live_spaces = [heap.current_young(), SpaceId::Old];

    for (handle, address) in heap.handles().live() {
        if !live_spaces.contains(&address.space) || address.offset < HEADER_SIZE {
            return Err(IntegrityError::DanglingHandle(handle));
        }
        let header = heap.arena(address.space).header(address.header_offset());
        if header.free || header.handle != Some(handle.raw()) {
            return Err(IntegrityError::DanglingHandle(handle));
        }
    }

    for space in live_spaces {
        for block in heap.blocks(space).filter(|block| !block.free) {
            let owned = block.handle.is_some_and(|handle: Handle| {
                heap.dereference(handle)
                    .is_ok_and(|address| address == Address::new(space, block.offset + HEADER_SIZE))
            });
            if !owned {
                return Err(IntegrityError::OrphanBlock {
                    space,
                    offset: block.offset,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::{HeapConfig, Strategy};
    use crate::error::IntegrityError;
    use crate::gc::{BlockHeader, Heap, SpaceId};

    #[test]
    fn test_fresh_heap_is_consistent() {
        let heap = Heap::new(HeapConfig::default()).unwrap();
        assert_eq!(heap.verify(), Ok(()));
    }

    #[test]
    fn test_detects_missing_free_list_entry() {
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        let h = heap.allocate(8).unwrap();
        let offset = heap.dereference(h).unwrap().header_offset();
        heap.arena_mut(SpaceId::Young0)
            .set_header(offset, &BlockHeader::free(8));
        // Handle now points at a free block too; layout is reported first
        assert_eq!(
            heap.verify(),
            Err(IntegrityError::FreeListMissing {
                space: SpaceId::Young0,
                offset: 0
            })
        );
    }

    #[test]
    fn test_detects_broken_partition() {
        let mut heap = Heap::new(HeapConfig::default()).unwrap();
        heap.arena_mut(SpaceId::Old)
            .set_header(0, &BlockHeader::free(2048));
        assert!(matches!(
            heap.verify(),
            Err(IntegrityError::Partition {
                space: SpaceId::Old,
                ..
            })
        ));
    }

    #[test]
    fn test_mixed_workload_stays_consistent() {
        for strategy in [Strategy::FirstFit, Strategy::BestFit] {
            let mut heap = Heap::new(HeapConfig::new(strategy)).unwrap();
            let mut live = Vec::new();

            for round in 0..12usize {
                for size in [8, 40, 16, 72] {
                    let size = size + round % 3;
                    if let Ok(h) = heap.allocate(size) {
                        live.push(h);
                    }
                }
                // Drop every third object
                let mut i = 0;
                live.retain(|&h| {
                    i += 1;
                    if i % 3 == 0 {
                        heap.release(h).unwrap();
                        false
                    } else {
                        true
                    }
                });
                heap.verify().unwrap();

                if round % 2 == 1 {
                    let _ = heap.minor_collection();
                    heap.verify().unwrap();
                }
                if round % 4 == 3 {
                    heap.major_collection();
                    heap.verify().unwrap();
                }
            }
        }
    }
}
